//! Fetch → persist orchestration.

use async_trait::async_trait;

use crate::error::Result;
use crate::exchange::DepthSource;
use crate::repository::RateSink;
use crate::types::Rate;

/// What the RPC layer needs from the pipeline.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RatesProvider: Send + Sync {
    /// Fetch the current top of book, persist it, and return it.
    async fn get_and_store_rates(&self) -> Result<Rate>;
}

/// Stateless pipeline over a depth source and a rate sink.
///
/// Strictly sequential: one fetch, then one insert. Errors from either step
/// are returned unchanged. A rate that failed to persist is never returned.
pub struct RateService<D, S> {
    source: D,
    sink: S,
}

impl<D: DepthSource, S: RateSink> RateService<D, S> {
    pub fn new(source: D, sink: S) -> Self {
        Self { source, sink }
    }
}

#[async_trait]
impl<D: DepthSource, S: RateSink> RatesProvider for RateService<D, S> {
    async fn get_and_store_rates(&self) -> Result<Rate> {
        let rate = self.source.get_depth().await?;
        self.sink.save_rate(&rate).await?;
        Ok(rate)
    }
}
