use clap::Args;

use common::linked_data::{cid_from_str, CodecError};
use common::vault::VaultError;

use crate::op::SessionError;

#[derive(Args, Debug, Clone)]
pub struct Share {
    /// CID of the exchange root listing the recipients' exchange keys
    #[arg(long)]
    pub exchange_root: String,

    /// Root identity of the recipient (defaults to this vault's own)
    #[arg(long)]
    pub recipient: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error("share failed: {0}")]
    Session(#[from] SessionError),
    #[error("share failed: {0}")]
    Vault(#[from] VaultError),
    #[error("invalid exchange root CID: {0}")]
    Cid(#[from] CodecError),
}

#[async_trait::async_trait]
impl crate::op::Op for Share {
    type Error = ShareError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let exchange_root = cid_from_str(&self.exchange_root)?;
        let (state, mut vault) = ctx.open_vault().await?;
        let recipient = self
            .recipient
            .clone()
            .unwrap_or_else(|| vault.identity().to_string());
        let counter = vault.share_root_with(&exchange_root, &recipient).await?;
        let root = ctx.commit(&state, &vault).await?;
        Ok(format!(
            "Shared root at counter {} (forest root {})",
            counter, root
        ))
    }
}
