use clap::Args;

use common::linked_data::{cid_from_str, CodecError};
use common::vault::{Vault, VaultError};

use crate::op::SessionError;
use crate::state::{AppState, StateError};

/// Recover a vault from a forest root and the owner's signature
#[derive(Args, Debug, Clone)]
pub struct Recover {
    /// CID of the forest root to recover from
    pub forest: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RecoverError {
    #[error("recover failed: {0}")]
    Session(#[from] SessionError),
    #[error("recover failed: {0}")]
    State(#[from] StateError),
    #[error("invalid forest CID: {0}")]
    Cid(#[from] CodecError),
    #[error("recover failed: {0}")]
    Vault(#[from] VaultError),
}

#[async_trait::async_trait]
impl crate::op::Op for Recover {
    type Error = RecoverError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let forest = cid_from_str(&self.forest)?;
        let signature = ctx.signature()?;

        let state = match AppState::load(ctx.config_path.clone()) {
            Err(StateError::NotInitialized) => AppState::init(ctx.config_path.clone(), None)?,
            other => other?,
        };
        let store = ctx.store(&state).await?;
        let scan = state.config.scan_min..state.config.scan_max;
        let vault = Vault::reload_within(signature, store, &forest, scan).await?;
        state.write_root(&forest)?;

        let mut out = format!(
            "Recovered vault for {} at root revision {}",
            vault.identity(),
            vault.root().header().ratchet().counter()
        );
        for (name, metadata) in vault.ls(&[] as &[&str], false).await? {
            let suffix = if metadata.is_dir() { "/" } else { "" };
            out.push_str(&format!("\n  {}{}", name, suffix));
        }
        Ok(out)
    }
}
