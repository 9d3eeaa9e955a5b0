use clap::Args;

use common::vault::VaultError;

use super::split_path;
use crate::op::SessionError;

#[derive(Args, Debug, Clone)]
pub struct Cat {
    /// File to print
    pub path: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CatError {
    #[error("cat failed: {0}")]
    Session(#[from] SessionError),
    #[error("cat failed: {0}")]
    Vault(#[from] VaultError),
}

#[async_trait::async_trait]
impl crate::op::Op for Cat {
    type Error = CatError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (_, vault) = ctx.open_vault().await?;
        let data = vault.read(&split_path(&self.path)).await?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }
}
