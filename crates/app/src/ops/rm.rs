use clap::Args;

use common::vault::VaultError;

use super::split_path;
use crate::op::SessionError;

#[derive(Args, Debug, Clone)]
pub struct Rm {
    /// File or directory to remove
    pub path: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RmError {
    #[error("rm failed: {0}")]
    Session(#[from] SessionError),
    #[error("rm failed: {0}")]
    Vault(#[from] VaultError),
}

#[async_trait::async_trait]
impl crate::op::Op for Rm {
    type Error = RmError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (state, mut vault) = ctx.open_vault().await?;
        vault.rm(&split_path(&self.path)).await?;
        let root = ctx.commit(&state, &vault).await?;
        Ok(format!("Removed {} (forest root {})", self.path, root))
    }
}
