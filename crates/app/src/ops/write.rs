use std::path::PathBuf;

use clap::Args;

use common::vault::VaultError;

use super::split_path;
use crate::op::SessionError;

#[derive(Args, Debug, Clone)]
pub struct Write {
    /// Destination path inside the vault
    pub path: String,

    /// Local file to read the content from
    #[arg(long, conflicts_with = "content")]
    pub file: Option<PathBuf>,

    /// Literal content to write
    #[arg(long)]
    pub content: Option<String>,

    /// Create missing parent directories
    #[arg(short, long)]
    pub parents: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("write failed: {0}")]
    Session(#[from] SessionError),
    #[error("write failed: {0}")]
    Vault(#[from] VaultError),
    #[error("failed to read {0}: {1}")]
    Source(PathBuf, std::io::Error),
}

impl Write {
    async fn content(&self) -> Result<Vec<u8>, WriteError> {
        match (&self.file, &self.content) {
            (Some(path), _) => tokio::fs::read(path)
                .await
                .map_err(|e| WriteError::Source(path.clone(), e)),
            (None, Some(content)) => Ok(content.clone().into_bytes()),
            (None, None) => Ok(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl crate::op::Op for Write {
    type Error = WriteError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let content = self.content().await?;
        let size = content.len();
        let (state, mut vault) = ctx.open_vault().await?;
        vault
            .write(&split_path(&self.path), self.parents, content)
            .await?;
        let root = ctx.commit(&state, &vault).await?;
        Ok(format!(
            "Wrote {} bytes to {} (forest root {})",
            size, self.path, root
        ))
    }
}
