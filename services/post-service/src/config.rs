use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use svckit::config::{DatabaseConfig, ObservabilityConfig};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostServiceConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Load the YAML file at `path`, then apply `POST_SERVICE__SECTION__KEY`
/// environment overrides (e.g. `POST_SERVICE__DATABASE__KEYSPACE`).
pub fn load_config(path: &str) -> Result<PostServiceConfig> {
    let config = Config::builder()
        .add_source(File::with_name(path))
        .add_source(
            Environment::with_prefix("POST_SERVICE")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("database.hosts")
                .try_parsing(true),
        )
        .build()?;

    let config: PostServiceConfig = config.try_deserialize()?;
    config.database.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use svckit::database::DatabaseDriver;

    fn write_yaml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_config_from_yaml() {
        let file = write_yaml(
            r#"
database:
  driver: memory
  hosts: ["db1", "db2:19042"]
  keyspace: babbly_posts_test
  username: cassandra
  password: cassandra
  likes_enabled: false
observability:
  log_level: debug
"#,
        );

        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.database.driver, DatabaseDriver::Memory);
        assert_eq!(config.database.keyspace, "babbly_posts_test");
        assert_eq!(config.database.contact_points(), vec!["db1:9042", "db2:19042"]);
        assert!(config.database.credentials().is_some());
        assert!(!config.database.likes_enabled);
        assert_eq!(config.observability.log_level, "debug");
    }

    #[test]
    fn test_missing_sections_fall_back_to_defaults() {
        let file = write_yaml("database:\n  keyspace: only_keyspace\n");
        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.database.hosts, vec!["localhost".to_string()]);
        assert_eq!(config.database.port, 9042);
        assert!(config.database.likes_enabled);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_invalid_keyspace_is_rejected() {
        let file = write_yaml("database:\n  keyspace: \"bad-name\"\n");
        assert!(load_config(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(load_config("/nonexistent/post-service.yaml").is_err());
    }
}
