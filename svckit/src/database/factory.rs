// svckit/src/database/factory.rs
//
// Factory Pattern for runtime database driver selection
// Supports: ScyllaDB, Cassandra 4.x, in-memory
//

use std::fmt;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::DatabaseConfig;
use super::memory::MemoryCluster;
use super::scylla::ScyllaConnector;
use super::session::SessionConnector;

/// Supported database drivers
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    #[default]
    Scylla,
    Cassandra,
    Memory,
}

impl DatabaseDriver {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseDriver::Scylla => "scylla",
            DatabaseDriver::Cassandra => "cassandra",
            DatabaseDriver::Memory => "memory",
        }
    }
}

impl fmt::Display for DatabaseDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for DatabaseDriver {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "cassandra" | "cassandra4" | "cass" => DatabaseDriver::Cassandra,
            "memory" | "in-memory" | "mem" => DatabaseDriver::Memory,
            "scylla" | "scylladb" => DatabaseDriver::Scylla,
            _ => DatabaseDriver::Scylla, // Default to Scylla
        }
    }
}

impl From<String> for DatabaseDriver {
    fn from(s: String) -> Self {
        DatabaseDriver::from(s.as_str())
    }
}

/// Database connector factory
pub struct DatabaseFactory;

impl DatabaseFactory {
    /// Create a session connector for the configured driver
    pub fn create_connector(config: &DatabaseConfig) -> Arc<dyn SessionConnector> {
        info!("Creating database connector with driver: {}", config.driver);

        match config.driver {
            DatabaseDriver::Scylla => Arc::new(ScyllaConnector::new(config, "scylla")),
            DatabaseDriver::Cassandra => {
                // Scylla driver is CQL-compatible with Cassandra 4.x
                info!("Using Scylla driver for Cassandra 4.x compatibility");
                Arc::new(ScyllaConnector::new(config, "cassandra"))
            }
            DatabaseDriver::Memory => Arc::new(MemoryCluster::new().connector()),
        }
    }
}
