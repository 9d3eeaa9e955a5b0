use clap::Args;

use common::vault::VaultError;

use super::split_path;
use crate::op::SessionError;

#[derive(Args, Debug, Clone)]
pub struct Mkdir {
    /// Directory to create, e.g. /pictures/cats
    pub path: String,

    /// Create missing parent directories
    #[arg(short, long)]
    pub parents: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum MkdirError {
    #[error("mkdir failed: {0}")]
    Session(#[from] SessionError),
    #[error("mkdir failed: {0}")]
    Vault(#[from] VaultError),
}

#[async_trait::async_trait]
impl crate::op::Op for Mkdir {
    type Error = MkdirError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (state, mut vault) = ctx.open_vault().await?;
        vault.mkdir(&split_path(&self.path), self.parents).await?;
        let root = ctx.commit(&state, &vault).await?;
        Ok(format!("Created {} (forest root {})", self.path, root))
    }
}
