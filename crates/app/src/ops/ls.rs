use clap::Args;

use common::private::NodeKind;
use common::vault::VaultError;

use super::split_path;
use crate::op::SessionError;

#[derive(Args, Debug, Clone)]
pub struct Ls {
    /// Directory to list
    #[arg(default_value = "/")]
    pub path: String,

    /// Include everything below the directory
    #[arg(short, long)]
    pub recursive: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum LsError {
    #[error("ls failed: {0}")]
    Session(#[from] SessionError),
    #[error("ls failed: {0}")]
    Vault(#[from] VaultError),
}

#[async_trait::async_trait]
impl crate::op::Op for Ls {
    type Error = LsError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (_, vault) = ctx.open_vault().await?;
        let items = vault.ls(&split_path(&self.path), self.recursive).await?;
        if items.is_empty() {
            return Ok(format!("{} is empty", self.path));
        }

        let lines: Vec<String> = items
            .iter()
            .map(|(name, metadata)| {
                let (kind, name) = match metadata.kind {
                    NodeKind::Directory => ("d", format!("{}/", name)),
                    NodeKind::File => ("-", name.clone()),
                };
                format!(
                    "{} {:>10} {} {}",
                    kind,
                    metadata.size,
                    metadata.modified.format("%Y-%m-%d %H:%M"),
                    name
                )
            })
            .collect();
        Ok(lines.join("\n"))
    }
}
