//! Unified error types for the rates service.
//!
//! Pipeline errors (everything the client and repository can return) travel
//! unchanged through the service and handler layers. The remaining variants
//! only occur during startup.

use thiserror::Error;

/// Side of the book a price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Ask,
    Bid,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Side::Ask => "ask",
            Side::Bid => "bid",
        })
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("market data request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed depth response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("empty depth")]
    EmptyDepth,

    #[error("invalid best {side} price {value:?}")]
    PriceParse { side: Side, value: String },

    #[error("failed to save rate: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("database migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("malformed config file: {0}")]
    ConfigFile(#[from] serde_yaml::Error),

    #[error("gRPC transport error: {0}")]
    Server(#[from] tonic::transport::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable, low-cardinality label for metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Transport(_) => "transport",
            Error::Decode(_) => "decode",
            Error::EmptyDepth => "empty_depth",
            Error::PriceParse { .. } => "price_parse",
            Error::Persistence(_) => "persistence",
            Error::Migrate(_) => "migrate",
            Error::Config(_) | Error::ConfigFile(_) => "config",
            Error::Server(_) => "server",
            Error::Io(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
