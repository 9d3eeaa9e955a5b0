use clap::Args;

use common::linked_data::cid_to_string;
use common::store::FsBlockStore;
use common::vault::Vault;

use crate::op::SessionError;
use crate::state::{AppConfig, AppState};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Label this device's exchange key is published under
    #[arg(long)]
    pub device_label: Option<String>,

    /// Highest share counter (exclusive) probed on recovery
    #[arg(long)]
    pub scan_max: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    Session(#[from] SessionError),
    #[error("init failed: {0}")]
    State(#[from] crate::state::StateError),
}

#[async_trait::async_trait]
impl crate::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let signature = ctx.signature()?;

        let mut config = AppConfig::default();
        if let Some(label) = &self.device_label {
            config.device_label = label.clone();
        }
        if let Some(max) = self.scan_max {
            config.scan_max = max;
        }

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;
        let store = FsBlockStore::open(&state.blocks_path)
            .await
            .map_err(SessionError::from)?;
        let (vault, forest_cid) = Vault::init(signature, &state.config.device_label, store)
            .await
            .map_err(SessionError::from)?;
        state.write_root(&forest_cid)?;

        Ok(format!(
            "Initialized sigvault directory at: {}\n\
             - Blocks: {}\n\
             - Config: {}\n\
             - Identity: {}\n\
             - Exchange key: {}\n\
             - Forest root: {}",
            state.dir.display(),
            state.blocks_path.display(),
            state.config_path.display(),
            vault.identity(),
            vault.exchange_key().to_hex(),
            cid_to_string(&forest_cid)
        ))
    }
}

