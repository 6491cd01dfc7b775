use std::sync::Arc;
use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::config::DatabaseConfig;
use crate::errors::DataError;
use crate::metrics;
use super::factory::DatabaseFactory;
use super::retry::StartupRetry;
use super::schema::{SchemaBootstrapper, TableDefinition};
use super::session::{CqlSession, SessionConnector};

/// Owns the process-wide session bound to the service keyspace.
///
/// Built once at startup and handed to repositories by reference; the lock
/// only guards the lifecycle (hand-out and release), never statement execution.
pub struct ConnectionManager {
    session: Mutex<Option<Arc<dyn CqlSession>>>,
    keyspace: String,
    driver_name: String,
}

impl ConnectionManager {
    /// Connect with the driver named in the configuration and the default
    /// startup retry (5 attempts, 5 seconds apart)
    pub async fn connect(config: &DatabaseConfig, tables: Vec<TableDefinition>) -> Result<Self, DataError> {
        config.validate()?;
        let connector = DatabaseFactory::create_connector(config);
        Self::connect_with(connector, config, tables, StartupRetry::default()).await
    }

    /// Connect through an explicit connector and retry policy.
    ///
    /// 1. connect without a keyspace and ensure the keyspace exists (single attempt)
    /// 2. connect bound to the keyspace and ensure tables exist, retried per `retry`
    pub async fn connect_with(
        connector: Arc<dyn SessionConnector>,
        config: &DatabaseConfig,
        tables: Vec<TableDefinition>,
        retry: StartupRetry,
    ) -> Result<Self, DataError> {
        config.validate()?;
        let driver_name = connector.driver_name().to_string();
        let keyspace = config.keyspace.as_str();
        let bootstrapper = SchemaBootstrapper::new(keyspace, config.replication_factor, tables);

        let bootstrap_session = connector.connect(None).await.map_err(|e| {
            metrics::record_connection_attempt(&driver_name, false);
            error!("Failed to initialize {} connection: {}", driver_name, e);
            DataError::ConnectionError(format!("cluster unreachable: {}", e))
        })?;
        metrics::record_connection_attempt(&driver_name, true);

        let keyspace_ready = bootstrapper.ensure_keyspace(bootstrap_session.as_ref()).await;
        bootstrap_session.close().await;
        keyspace_ready?;

        let connector_ref = connector.as_ref();
        let bootstrapper_ref = &bootstrapper;
        let driver_ref = driver_name.as_str();
        let session = retry
            .run(&format!("connect to keyspace {}", keyspace), |attempt| async move {
                debug!("Keyspace connection attempt {}", attempt);
                let session = match connector_ref.connect(Some(keyspace)).await {
                    Ok(session) => session,
                    Err(e) => {
                        metrics::record_connection_attempt(driver_ref, false);
                        return Err(e);
                    }
                };
                if let Err(e) = bootstrapper_ref.ensure_tables(session.as_ref()).await {
                    metrics::record_connection_attempt(driver_ref, false);
                    session.close().await;
                    return Err(e);
                }
                metrics::record_connection_attempt(driver_ref, true);
                Ok(session)
            })
            .await?;

        metrics::ACTIVE_SESSIONS.with_label_values(&[driver_name.as_str()]).inc();
        info!("Successfully connected to {} keyspace: {}", driver_name, keyspace);

        Ok(Self {
            session: Mutex::new(Some(session)),
            keyspace: keyspace.to_string(),
            driver_name,
        })
    }

    /// Shared session handle; `AlreadyClosed` after shutdown
    pub fn session(&self) -> Result<Arc<dyn CqlSession>, DataError> {
        self.session.lock().clone().ok_or(DataError::AlreadyClosed)
    }

    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    pub fn driver_name(&self) -> &str {
        &self.driver_name
    }

    pub fn is_closed(&self) -> bool {
        self.session.lock().is_none()
    }

    /// Close the session and release the cluster handle. Handles already given
    /// to repositories stay valid objects but fail with `AlreadyClosed`; they
    /// do not keep the driver's connection pool alive. A second call fails with
    /// `AlreadyClosed`.
    pub async fn shutdown(&self) -> Result<(), DataError> {
        let session = self.session.lock().take();
        match session {
            Some(session) => {
                session.close().await;
                metrics::ACTIVE_SESSIONS.with_label_values(&[self.driver_name.as_str()]).dec();
                info!("Released {} session for keyspace {}", self.driver_name, self.keyspace);
                Ok(())
            }
            None => Err(DataError::AlreadyClosed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use async_trait::async_trait;
    use crate::database::memory::{MemoryCluster, MemoryConnector};
    use crate::database::retry::{STARTUP_MAX_ATTEMPTS, STARTUP_RETRY_DELAY};
    use crate::database::schema::TableDefinition;
    use crate::types::{ColumnValue, Row};

    /// Fails the first `bound_failures` keyspace-bound connects
    struct FlakyConnector {
        inner: MemoryConnector,
        bound_failures: u32,
        unbound_attempts: AtomicU32,
        bound_attempts: AtomicU32,
    }

    impl FlakyConnector {
        fn new(cluster: &MemoryCluster, bound_failures: u32) -> Arc<Self> {
            Arc::new(Self {
                inner: cluster.connector(),
                bound_failures,
                unbound_attempts: AtomicU32::new(0),
                bound_attempts: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl SessionConnector for FlakyConnector {
        async fn connect(&self, keyspace: Option<&str>) -> Result<Arc<dyn CqlSession>, DataError> {
            if keyspace.is_none() {
                self.unbound_attempts.fetch_add(1, Ordering::SeqCst);
                return self.inner.connect(None).await;
            }
            let attempt = self.bound_attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= self.bound_failures {
                return Err(DataError::ConnectionError("node bootstrapping".to_string()));
            }
            self.inner.connect(keyspace).await
        }

        fn driver_name(&self) -> &str {
            "flaky"
        }
    }

    fn config() -> DatabaseConfig {
        DatabaseConfig {
            keyspace: "conn_test".to_string(),
            ..Default::default()
        }
    }

    fn tables() -> Vec<TableDefinition> {
        vec![TableDefinition::new("items", "id").column("id", "uuid").column("name", "text")]
    }

    #[tokio::test]
    async fn test_connect_bootstraps_empty_cluster() {
        let cluster = MemoryCluster::new();
        let connector = FlakyConnector::new(&cluster, 0);

        let manager = ConnectionManager::connect_with(connector.clone(), &config(), tables(), StartupRetry::default())
            .await
            .unwrap();

        assert!(cluster.has_keyspace("conn_test"));
        let replication = cluster.keyspace_replication("conn_test").unwrap();
        assert!(replication.contains("'SimpleStrategy'"));
        assert!(replication.contains("'replication_factor' : 1"));
        assert_eq!(cluster.schema_snapshot("conn_test").len(), 1);
        assert_eq!(connector.unbound_attempts.load(Ordering::SeqCst), 1);
        assert_eq!(connector.bound_attempts.load(Ordering::SeqCst), 1);

        let session = manager.session().unwrap();
        let rows = session.query("SELECT id FROM items", vec![]).await.unwrap();
        assert!(rows.is_empty());
    }

    /// Cluster where keyspace creation is refused and the keyspace never shows up
    struct NoKeyspaceSession;

    #[async_trait]
    impl CqlSession for NoKeyspaceSession {
        async fn execute(&self, _cql: &str, _values: Vec<ColumnValue>) -> Result<(), DataError> {
            Err(DataError::DatabaseError("Unauthorized: no CREATE permission".to_string()))
        }

        async fn query(&self, _cql: &str, _values: Vec<ColumnValue>) -> Result<Vec<Row>, DataError> {
            Ok(vec![])
        }

        async fn keyspace_exists(&self, _keyspace: &str) -> Result<bool, DataError> {
            Ok(false)
        }

        async fn close(&self) {}

        fn driver_name(&self) -> &str {
            "no-keyspace"
        }
    }

    struct NoKeyspaceConnector {
        bound_attempts: AtomicU32,
    }

    #[async_trait]
    impl SessionConnector for NoKeyspaceConnector {
        async fn connect(&self, keyspace: Option<&str>) -> Result<Arc<dyn CqlSession>, DataError> {
            if keyspace.is_some() {
                self.bound_attempts.fetch_add(1, Ordering::SeqCst);
            }
            Ok(Arc::new(NoKeyspaceSession))
        }

        fn driver_name(&self) -> &str {
            "no-keyspace"
        }
    }

    #[tokio::test]
    async fn test_keyspace_creation_failure_aborts_startup() {
        let connector = Arc::new(NoKeyspaceConnector {
            bound_attempts: AtomicU32::new(0),
        });

        let result = ConnectionManager::connect_with(connector.clone(), &config(), tables(), StartupRetry::default()).await;

        assert!(matches!(result, Err(DataError::ConnectionError(_))));
        assert_eq!(connector.bound_attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_settings_fail_before_connecting() {
        let cluster = MemoryCluster::new();
        let connector = FlakyConnector::new(&cluster, 0);
        let config = DatabaseConfig {
            hosts: vec![],
            ..config()
        };

        let result = ConnectionManager::connect_with(connector.clone(), &config, tables(), StartupRetry::default()).await;
        assert!(matches!(result, Err(DataError::ConfigError(_))));
        assert_eq!(connector.unbound_attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_five_attempts() {
        let cluster = MemoryCluster::new();
        let connector = FlakyConnector::new(&cluster, u32::MAX);
        let start = tokio::time::Instant::now();

        let result = ConnectionManager::connect_with(connector.clone(), &config(), tables(), StartupRetry::default()).await;

        assert!(matches!(result, Err(DataError::ConnectionError(_))));
        assert_eq!(connector.bound_attempts.load(Ordering::SeqCst), STARTUP_MAX_ATTEMPTS);
        // The delay sits between attempts, none after the last one: 4 x 5s
        assert!(start.elapsed() >= STARTUP_RETRY_DELAY * (STARTUP_MAX_ATTEMPTS - 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_from_transient_failures() {
        let cluster = MemoryCluster::new();
        let connector = FlakyConnector::new(&cluster, 3);

        let manager = ConnectionManager::connect_with(
            connector.clone(),
            &config(),
            tables(),
            StartupRetry::new(5, Duration::from_millis(50)),
        )
        .await
        .unwrap();

        assert_eq!(connector.bound_attempts.load(Ordering::SeqCst), 4);
        assert!(!manager.is_closed());
    }

    #[tokio::test]
    async fn test_shutdown_releases_once() {
        let cluster = MemoryCluster::new();
        let manager = ConnectionManager::connect_with(
            Arc::new(cluster.connector()),
            &config(),
            tables(),
            StartupRetry::default(),
        )
        .await
        .unwrap();
        let held = manager.session().unwrap();

        manager.shutdown().await.unwrap();
        assert!(manager.is_closed());
        assert!(matches!(manager.session(), Err(DataError::AlreadyClosed)));
        assert!(matches!(manager.shutdown().await, Err(DataError::AlreadyClosed)));

        let err = held.query("SELECT id FROM items", vec![]).await.unwrap_err();
        assert!(matches!(err, DataError::AlreadyClosed));
    }
}
