//! Configuration for the ledger

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Protocol configuration
    #[serde(default)]
    pub protocol: ProtocolConfig,

    /// RocksDB configuration
    #[serde(default)]
    pub rocksdb: RocksDBConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/ledger"),
            service_name: "ledger-ops".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            protocol: ProtocolConfig::default(),
            rocksdb: RocksDBConfig::default(),
        }
    }
}

/// Protocol configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Protocol version the ledger runs at
    pub ledger_version: u32,

    /// Ledger number used when the store has no header yet
    pub initial_ledger_seq: u32,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            ledger_version: 10,
            initial_ledger_seq: 1,
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksDBConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for RocksDBConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_write_buffer_number: 4,
            max_background_jobs: 2,
            enable_statistics: false,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("LEDGER_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(version) = std::env::var("LEDGER_PROTOCOL_VERSION") {
            config.protocol.ledger_version = version.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid LEDGER_PROTOCOL_VERSION {}: {}", version, e))
            })?;
        }

        Ok(config)
    }
}
