use clap::Args;

use common::crypto::{derive_seed, KeyError, KeyPair};
use common::linked_data::cid_to_string;
use common::share::{ExchangeRoot, ShareError};

use crate::op::SessionError;

/// Publish this signature's exchange key so others can share with it
#[derive(Args, Debug, Clone)]
pub struct ExchangeKey {
    /// Device label to publish under (defaults to the configured label)
    #[arg(long)]
    pub label: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExchangeKeyError {
    #[error("exchange-key failed: {0}")]
    Session(#[from] SessionError),
    #[error("exchange-key failed: {0}")]
    Key(#[from] KeyError),
    #[error("exchange-key failed: {0}")]
    Share(#[from] ShareError),
}

#[async_trait::async_trait]
impl crate::op::Op for ExchangeKey {
    type Error = ExchangeKeyError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let seed = derive_seed(ctx.signature()?)?;
        let keys = KeyPair::derive(&seed);
        let state = ctx.state()?;
        let store = ctx.store(&state).await?;
        let label = self
            .label
            .clone()
            .unwrap_or_else(|| state.config.device_label.clone());

        let cid = ExchangeRoot::publish(&label, keys.exchange_key(), &store).await?;
        Ok(format!(
            "Identity: {}\nExchange key: {}\nExchange root ({}): {}",
            seed.root_identity(),
            keys.exchange_key().to_hex(),
            label,
            cid_to_string(&cid)
        ))
    }
}
