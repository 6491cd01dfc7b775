use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::database::factory::DatabaseDriver;
use crate::errors::DataError;
use crate::types::ConsistencyLevel;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub driver: DatabaseDriver,
    pub hosts: Vec<String>,
    pub port: u16,
    pub keyspace: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub consistency: ConsistencyLevel,
    pub replication_factor: u32,
    pub connection_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Whether the schema carries the likes counter
    pub likes_enabled: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            hosts: vec!["localhost".to_string()],
            port: 9042,
            keyspace: "babbly_posts".to_string(),
            username: None,
            password: None,
            consistency: ConsistencyLevel::LocalQuorum,
            replication_factor: 1,
            connection_timeout_secs: 5,
            request_timeout_secs: 10,
            likes_enabled: true,
        }
    }
}

impl DatabaseConfig {
    /// Reject configurations the connection manager cannot start from
    pub fn validate(&self) -> Result<(), DataError> {
        let hosts: Vec<&String> = self.hosts.iter().filter(|h| !h.trim().is_empty()).collect();
        if hosts.is_empty() {
            return Err(DataError::ConfigError("at least one contact host is required".to_string()));
        }
        if self.keyspace.trim().is_empty() {
            return Err(DataError::ConfigError("keyspace name is required".to_string()));
        }
        if !self.keyspace.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(DataError::ConfigError(format!(
                "keyspace name '{}' must be alphanumeric or underscore",
                self.keyspace
            )));
        }
        if self.replication_factor == 0 {
            return Err(DataError::ConfigError("replication_factor must be at least 1".to_string()));
        }
        Ok(())
    }

    /// host:port pairs; hosts that already carry a port are kept as-is
    pub fn contact_points(&self) -> Vec<String> {
        self.hosts
            .iter()
            .map(|h| h.trim())
            .filter(|h| !h.is_empty())
            .map(|h| {
                if h.contains(':') {
                    h.to_string()
                } else {
                    format!("{}:{}", h, self.port)
                }
            })
            .collect()
    }

    /// Credentials are applied only as a complete, non-blank pair
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_hosts_is_config_error() {
        let config = DatabaseConfig {
            hosts: vec!["  ".to_string()],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(DataError::ConfigError(_))));
    }

    #[test]
    fn test_missing_keyspace_is_config_error() {
        let config = DatabaseConfig {
            keyspace: String::new(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(DataError::ConfigError(_))));
    }

    #[test]
    fn test_contact_points_append_port() {
        let config = DatabaseConfig {
            hosts: vec!["10.0.0.1".to_string(), "10.0.0.2:19042".to_string()],
            ..Default::default()
        };
        assert_eq!(config.contact_points(), vec!["10.0.0.1:9042", "10.0.0.2:19042"]);
    }

    #[test]
    fn test_credentials_need_both_parts() {
        let mut config = DatabaseConfig {
            username: Some("cassandra".to_string()),
            ..Default::default()
        };
        assert!(config.credentials().is_none());

        config.password = Some(String::new());
        assert!(config.credentials().is_none());

        config.password = Some("secret".to_string());
        assert_eq!(config.credentials(), Some(("cassandra", "secret")));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: DatabaseConfig = serde_yaml::from_str("keyspace: posts_test\nhosts: [db1]\n").unwrap();
        assert_eq!(config.keyspace, "posts_test");
        assert_eq!(config.port, 9042);
        assert_eq!(config.consistency, ConsistencyLevel::LocalQuorum);
        assert!(config.likes_enabled);
        assert!(config.validate().is_ok());
    }
}
