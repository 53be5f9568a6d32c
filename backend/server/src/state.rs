use std::sync::Arc;

use tracing::info;

use super::{
    config::Config,
    ledger::VoteLedger,
    rate_limit::RateLimiter,
    store::Store,
};

pub struct AppState {
    pub config: Config,
    pub ledger: VoteLedger,
    pub limiter: RateLimiter,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Arc<Self>> {
        let store = Store::new(config.data_path.clone());
        info!("Loading ledger from {}", store.path().display());

        let ledger = VoteLedger::open(store).await?;

        Ok(Self::with_ledger(config, ledger))
    }

    pub fn with_ledger(config: Config, ledger: VoteLedger) -> Arc<Self> {
        let limiter = RateLimiter::new(config.rate_limit.clone());

        Arc::new(Self {
            config,
            ledger,
            limiter,
        })
    }
}
