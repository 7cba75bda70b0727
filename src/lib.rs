//! USDT/RUB rates service library.
//!
//! Fetches the Grinex order book on demand, keeps the best ask and bid,
//! appends them to PostgreSQL and returns them via gRPC.

pub mod config;
pub mod error;
pub mod exchange;
pub mod metrics;
pub mod repository;
pub mod server;
pub mod service;
pub mod types;

#[cfg(test)]
pub(crate) mod testutil;
