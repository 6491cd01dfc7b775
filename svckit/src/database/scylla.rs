use std::sync::Arc;
use async_trait::async_trait;
use parking_lot::RwLock;
use scylla::frame::response::result::CqlValue;
use scylla::frame::value::CqlTimestamp;
use scylla::statement::Consistency;
use scylla::transport::execution_profile::ExecutionProfile;
use scylla::{Session, SessionBuilder};
use tracing::{debug, error, info};

use crate::config::DatabaseConfig;
use crate::errors::DataError;
use crate::types::{ColumnValue, ConsistencyLevel, Row};
use super::session::{CqlSession, SessionConnector};

/// Builds driver sessions for ScyllaDB and Cassandra 4.x (same CQL binary protocol)
pub struct ScyllaConnector {
    config: DatabaseConfig,
    driver_name: &'static str,
}

impl ScyllaConnector {
    pub fn new(config: &DatabaseConfig, driver_name: &'static str) -> Self {
        Self {
            config: config.clone(),
            driver_name,
        }
    }

    fn session_builder(&self) -> SessionBuilder {
        // Reads and writes default to the configured level (LOCAL_QUORUM unless overridden).
        // Reconnection backoff stays with the driver's own policy.
        let profile = ExecutionProfile::builder()
            .consistency(to_consistency(self.config.consistency))
            .request_timeout(Some(self.config.request_timeout()))
            .build();

        let mut builder = SessionBuilder::new()
            .known_nodes(self.config.contact_points())
            .connection_timeout(self.config.connection_timeout())
            .default_execution_profile_handle(profile.into_handle());

        if let Some((username, password)) = self.config.credentials() {
            builder = builder.user(username, password);
        }

        builder
    }
}

#[async_trait]
impl SessionConnector for ScyllaConnector {
    async fn connect(&self, keyspace: Option<&str>) -> Result<Arc<dyn CqlSession>, DataError> {
        info!(
            "Connecting to {} cluster: {:?} (keyspace: {})",
            self.driver_name,
            self.config.contact_points(),
            keyspace.unwrap_or("<none>")
        );

        let mut builder = self.session_builder();
        if let Some(keyspace) = keyspace {
            builder = builder.use_keyspace(keyspace, false);
        }

        let session = builder.build().await.map_err(|e| {
            error!("Failed to connect to {} cluster: {}", self.driver_name, e);
            DataError::ConnectionError(format!("Connection failed: {}", e))
        })?;

        info!("Successfully connected to {} cluster", self.driver_name);
        Ok(Arc::new(ScyllaSession::new(session, self.driver_name)))
    }

    fn driver_name(&self) -> &str {
        self.driver_name
    }
}

/// Driver session wrapper. The driver session is internally pooled and
/// thread-safe; the lock only guards its release.
///
/// Repositories hold clones of the wrapper, never of the driver session, so
/// `close` drops the driver session (and its connection pool) as soon as
/// in-flight statements finish, however many wrapper handles remain.
pub struct ScyllaSession {
    session: RwLock<Option<Arc<Session>>>,
    driver_name: &'static str,
}

impl ScyllaSession {
    pub fn new(session: Session, driver_name: &'static str) -> Self {
        Self {
            session: RwLock::new(Some(Arc::new(session))),
            driver_name,
        }
    }

    fn driver_session(&self) -> Result<Arc<Session>, DataError> {
        self.session.read().clone().ok_or(DataError::AlreadyClosed)
    }
}

#[async_trait]
impl CqlSession for ScyllaSession {
    async fn execute(&self, cql: &str, values: Vec<ColumnValue>) -> Result<(), DataError> {
        let session = self.driver_session()?;
        debug!("Executing: {}", cql);
        session
            .query_unpaged(cql, bind_values(values))
            .await
            .map_err(|e| DataError::DatabaseError(format!("Query execution failed: {}", e)))?;
        Ok(())
    }

    async fn query(&self, cql: &str, values: Vec<ColumnValue>) -> Result<Vec<Row>, DataError> {
        let session = self.driver_session()?;
        debug!("Querying: {}", cql);
        let result = session
            .query_unpaged(cql, bind_values(values))
            .await
            .map_err(|e| DataError::DatabaseError(format!("Query execution failed: {}", e)))?;

        result
            .rows
            .unwrap_or_default()
            .into_iter()
            .map(|row| {
                row.columns
                    .into_iter()
                    .map(|cell| cell.map(from_cql).unwrap_or(Ok(ColumnValue::Null)))
                    .collect()
            })
            .collect()
    }

    async fn keyspace_exists(&self, keyspace: &str) -> Result<bool, DataError> {
        let session = self.driver_session()?;
        session.refresh_metadata().await?;
        let cluster_data = session.get_cluster_data();
        Ok(cluster_data.get_keyspace_info().contains_key(keyspace))
    }

    async fn close(&self) {
        let released = self.session.write().take();
        if released.is_some() {
            info!("Closed {} session", self.driver_name);
        }
    }

    fn driver_name(&self) -> &str {
        self.driver_name
    }
}

fn to_consistency(level: ConsistencyLevel) -> Consistency {
    match level {
        ConsistencyLevel::Any => Consistency::Any,
        ConsistencyLevel::One => Consistency::One,
        ConsistencyLevel::Two => Consistency::Two,
        ConsistencyLevel::Three => Consistency::Three,
        ConsistencyLevel::Quorum => Consistency::Quorum,
        ConsistencyLevel::All => Consistency::All,
        ConsistencyLevel::LocalQuorum => Consistency::LocalQuorum,
        ConsistencyLevel::EachQuorum => Consistency::EachQuorum,
        ConsistencyLevel::LocalOne => Consistency::LocalOne,
    }
}

fn bind_values(values: Vec<ColumnValue>) -> Vec<Option<CqlValue>> {
    values.into_iter().map(to_cql).collect()
}

/// Convert a bound value to the driver representation; `Null` binds as an unset cell
fn to_cql(value: ColumnValue) -> Option<CqlValue> {
    let cql = match value {
        ColumnValue::Text(s) => CqlValue::Text(s),
        ColumnValue::Int(v) => CqlValue::Int(v),
        ColumnValue::BigInt(v) => CqlValue::BigInt(v),
        ColumnValue::Float(v) => CqlValue::Float(v),
        ColumnValue::Double(v) => CqlValue::Double(v),
        ColumnValue::Boolean(v) => CqlValue::Boolean(v),
        ColumnValue::Blob(b) => CqlValue::Blob(b),
        ColumnValue::Uuid(id) => CqlValue::Uuid(id),
        ColumnValue::Timestamp(ms) => CqlValue::Timestamp(CqlTimestamp(ms)),
        ColumnValue::List(items) => {
            CqlValue::List(items.into_iter().filter_map(to_cql).collect())
        }
        ColumnValue::Map(entries) => CqlValue::Map(
            entries
                .into_iter()
                .filter_map(|(k, v)| to_cql(v).map(|v| (CqlValue::Text(k), v)))
                .collect(),
        ),
        ColumnValue::Null => return None,
    };
    Some(cql)
}

fn from_cql(value: CqlValue) -> Result<ColumnValue, DataError> {
    let converted = match value {
        CqlValue::Ascii(s) | CqlValue::Text(s) => ColumnValue::Text(s),
        CqlValue::Boolean(v) => ColumnValue::Boolean(v),
        CqlValue::Blob(b) => ColumnValue::Blob(b),
        CqlValue::Counter(c) => ColumnValue::BigInt(c.0),
        CqlValue::Double(v) => ColumnValue::Double(v),
        CqlValue::Float(v) => ColumnValue::Float(v),
        CqlValue::Int(v) => ColumnValue::Int(v),
        CqlValue::BigInt(v) => ColumnValue::BigInt(v),
        CqlValue::SmallInt(v) => ColumnValue::Int(i32::from(v)),
        CqlValue::TinyInt(v) => ColumnValue::Int(i32::from(v)),
        CqlValue::Timestamp(ts) => ColumnValue::Timestamp(ts.0),
        CqlValue::Uuid(id) => ColumnValue::Uuid(id),
        CqlValue::Empty => ColumnValue::Null,
        CqlValue::List(items) | CqlValue::Set(items) => ColumnValue::List(
            items.into_iter().map(from_cql).collect::<Result<Vec<_>, _>>()?,
        ),
        CqlValue::Map(entries) => {
            let mut map = std::collections::HashMap::with_capacity(entries.len());
            for (key, value) in entries {
                let key = match key {
                    CqlValue::Ascii(s) | CqlValue::Text(s) => s,
                    other => {
                        return Err(DataError::DecodeError(format!(
                            "unsupported map key type: {:?}",
                            other
                        )))
                    }
                };
                map.insert(key, from_cql(value)?);
            }
            ColumnValue::Map(map)
        }
        other => {
            return Err(DataError::DecodeError(format!(
                "unsupported column type: {:?}",
                other
            )))
        }
    };
    Ok(converted)
}
