//! Layered configuration: YAML file < environment < command-line flag.
//!
//! clap resolves the upper two layers (`env = ...` on each flag). The file
//! layer is read separately and only fills values neither of them set.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;

use crate::error::{Error, Result};

pub const DEFAULT_PORT: u16 = 50051;
pub const DEFAULT_METRICS_PORT: u16 = 9090;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Parser, Debug, Clone)]
#[command(name = "usdt-rates")]
#[command(about = "Fetches the USDT/RUB top of book, stores it in PostgreSQL and serves it via gRPC")]
pub struct Cli {
    /// YAML config file (lowest precedence, optional)
    #[arg(short, long, default_value = "config.yml")]
    pub config: PathBuf,

    /// PostgreSQL connection URL
    #[arg(long, env = "DB_URL")]
    pub db_url: Option<String>,

    /// Market data depth endpoint
    #[arg(long, env = "API_URL")]
    pub api_url: Option<String>,

    /// gRPC server port
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Metrics/health HTTP port
    #[arg(long, env = "METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Database pool size
    #[arg(long, env = "DB_MAX_CONNECTIONS")]
    pub max_connections: Option<u32>,
}

/// Contents of the config file. Every key is optional.
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct FileConfig {
    pub db_url: Option<String>,
    #[serde(alias = "grinex_api_url")]
    pub api_url: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub max_connections: Option<u32>,
}

impl FileConfig {
    /// Read `path`. A missing file is an empty layer, not an error.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_yaml(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_url: String,
    pub api_url: String,
    pub port: u16,
    pub metrics_port: u16,
    pub max_connections: u32,
}

impl Config {
    /// Read the file named by `cli.config` and layer `cli` on top of it.
    pub fn load(cli: Cli) -> Result<Self> {
        let file = FileConfig::load(&cli.config)?;
        Self::resolve(file, cli)
    }

    /// Last writer wins. Empty strings count as unset.
    pub fn resolve(file: FileConfig, cli: Cli) -> Result<Self> {
        let db_url = pick(cli.db_url, file.db_url)
            .ok_or_else(|| Error::Config("db_url is not set (--db-url, DB_URL or config file)".into()))?;
        let api_url = pick(cli.api_url, file.api_url)
            .ok_or_else(|| Error::Config("api_url is not set (--api-url, API_URL or config file)".into()))?;

        let max_connections = cli
            .max_connections
            .or(file.max_connections)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        if max_connections == 0 {
            return Err(Error::Config("max_connections must be at least 1".into()));
        }

        Ok(Self {
            db_url,
            api_url,
            port: cli.port.or(file.port).unwrap_or(DEFAULT_PORT),
            metrics_port: cli
                .metrics_port
                .or(file.metrics_port)
                .unwrap_or(DEFAULT_METRICS_PORT),
            max_connections,
        })
    }
}

fn pick(upper: Option<String>, lower: Option<String>) -> Option<String> {
    upper
        .filter(|s| !s.is_empty())
        .or(lower.filter(|s| !s.is_empty()))
}
