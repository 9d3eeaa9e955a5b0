use std::error::Error;
use std::path::PathBuf;

use common::store::{BlockStoreError, FsBlockStore};
use common::vault::{Vault, VaultError};

use crate::state::{AppState, StateError};

/// Failures shared by every command that opens the vault
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("no signature given; pass --signature or set SIGVAULT_SIGNATURE")]
    MissingSignature,
    #[error("no vault here yet; run 'sigvault init' or 'sigvault recover <cid>'")]
    NoRoot,
    #[error("block store error: {0}")]
    Store(#[from] BlockStoreError),
    #[error("{0}")]
    Vault(#[from] VaultError),
}

#[derive(Clone)]
pub struct OpContext {
    /// Optional custom state path (defaults to ~/.sigvault)
    pub config_path: Option<PathBuf>,
    signature: Option<String>,
}

impl OpContext {
    pub fn new(config_path: Option<PathBuf>, signature: Option<String>) -> Self {
        Self {
            config_path,
            signature,
        }
    }

    pub fn signature(&self) -> Result<&str, SessionError> {
        self.signature
            .as_deref()
            .ok_or(SessionError::MissingSignature)
    }

    pub fn state(&self) -> Result<AppState, SessionError> {
        Ok(AppState::load(self.config_path.clone())?)
    }

    pub async fn store(&self, state: &AppState) -> Result<FsBlockStore, SessionError> {
        Ok(FsBlockStore::open(&state.blocks_path).await?)
    }

    /// Recover the vault from the recorded forest root
    pub async fn open_vault(&self) -> Result<(AppState, Vault<FsBlockStore>), SessionError> {
        let signature = self.signature()?;
        let state = self.state()?;
        let root = state.read_root()?.ok_or(SessionError::NoRoot)?;
        let store = self.store(&state).await?;
        let scan = state.config.scan_min..state.config.scan_max;
        let vault = Vault::reload_within(signature, store, &root, scan).await?;
        Ok((state, vault))
    }

    /// Persist the vault's forest and record it as the current root
    pub async fn commit(
        &self,
        state: &AppState,
        vault: &Vault<FsBlockStore>,
    ) -> Result<String, SessionError> {
        let cid = vault.commit().await?;
        state.write_root(&cid)?;
        Ok(common::linked_data::cid_to_string(&cid))
    }
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Send + Sync + 'static;
    type Output;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$type as $crate::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::op::Op for Command {
            type Output = OpOutput;
            type Error = OpError;

            async fn execute(&self, ctx: &$crate::op::OpContext) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => {
                            op.execute(ctx).await
                                .map(OpOutput::$variant)
                                .map_err(OpError::$variant)
                        },
                    )*
                }
            }
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        OpOutput::$variant(output) => write!(f, "{}", output),
                    )*
                }
            }
        }
    };
}
