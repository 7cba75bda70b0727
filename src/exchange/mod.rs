//! Market data adapters.
//!
//! Each adapter fetches a depth snapshot from an exchange's REST API and
//! reduces it to a top-of-book [`Rate`].

pub mod grinex;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Rate;

/// Source of top-of-book quotes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DepthSource: Send + Sync {
    /// Fetch one depth snapshot and return its best ask and bid.
    ///
    /// Exactly one upstream request per call, no retries.
    async fn get_depth(&self) -> Result<Rate>;
}

/// Shared HTTP client for REST adapters. Cheap to clone (pooled connections),
/// no request timeout beyond the transport defaults.
pub fn http_client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("usdt-rates/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}
