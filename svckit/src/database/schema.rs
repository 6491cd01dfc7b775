// svckit/src/database/schema.rs
//
// SchemaBootstrapper - self-provisioning of keyspace, tables and secondary
// indexes so the service can start against an empty cluster.
//

use serde::{Deserialize, Serialize};
use tracing::{info, warn, error};

use crate::errors::DataError;
use super::session::CqlSession;

/// Secondary index on a single column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub index_name: String,
    pub column_name: String,
}

/// Table shape: ordered columns with CQL types, single-column partition key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<(String, String)>,
    pub primary_key: String,
    pub indexes: Vec<IndexDefinition>,
}

impl TableDefinition {
    pub fn new(name: &str, primary_key: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            primary_key: primary_key.to_string(),
            indexes: Vec::new(),
        }
    }

    pub fn column(mut self, name: &str, cql_type: &str) -> Self {
        self.columns.push((name.to_string(), cql_type.to_string()));
        self
    }

    pub fn index(mut self, index_name: &str, column_name: &str) -> Self {
        self.indexes.push(IndexDefinition {
            index_name: index_name.to_string(),
            column_name: column_name.to_string(),
        });
        self
    }

    pub fn create_statement(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|(name, cql_type)| {
                if *name == self.primary_key {
                    format!("{} {} PRIMARY KEY", name, cql_type)
                } else {
                    format!("{} {}", name, cql_type)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE IF NOT EXISTS {} ({})", self.name, columns)
    }

    pub fn index_statements(&self) -> Vec<String> {
        self.indexes
            .iter()
            .map(|index| {
                format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                    index.index_name, self.name, index.column_name
                )
            })
            .collect()
    }
}

/// Ensures keyspace and tables exist before the first query is served
#[derive(Debug, Clone)]
pub struct SchemaBootstrapper {
    keyspace: String,
    replication_factor: u32,
    tables: Vec<TableDefinition>,
}

impl SchemaBootstrapper {
    pub fn new(keyspace: &str, replication_factor: u32, tables: Vec<TableDefinition>) -> Self {
        info!(
            "SchemaBootstrapper initialized for keyspace {} with {} tables",
            keyspace,
            tables.len()
        );
        Self {
            keyspace: keyspace.to_string(),
            replication_factor,
            tables,
        }
    }

    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    pub fn create_keyspace_statement(&self) -> String {
        format!(
            "CREATE KEYSPACE {} WITH REPLICATION = {{ 'class' : 'SimpleStrategy', 'replication_factor' : {} }}",
            self.keyspace, self.replication_factor
        )
    }

    /// Create the keyspace if cluster metadata does not know it.
    ///
    /// Creation is not atomic against other processes doing the same. A failed
    /// CREATE is swallowed only when a fresh metadata lookup now finds the
    /// keyspace (another process won the race).
    pub async fn ensure_keyspace(&self, session: &dyn CqlSession) -> Result<(), DataError> {
        let exists = session.keyspace_exists(&self.keyspace).await.map_err(|e| {
            error!("Error checking keyspace {}: {}", self.keyspace, e);
            DataError::ConnectionError(format!("keyspace lookup failed: {}", e))
        })?;
        if exists {
            info!("Keyspace {} already exists", self.keyspace);
            return Ok(());
        }

        info!("Keyspace {} does not exist, creating it...", self.keyspace);
        match session.execute(&self.create_keyspace_statement(), vec![]).await {
            Ok(()) => {
                info!("Keyspace {} created successfully", self.keyspace);
                Ok(())
            }
            Err(create_err) => match session.keyspace_exists(&self.keyspace).await {
                Ok(true) => {
                    warn!(
                        "Keyspace {} creation failed but it now exists (concurrent creator): {}",
                        self.keyspace, create_err
                    );
                    Ok(())
                }
                _ => {
                    error!("Error creating keyspace {}: {}", self.keyspace, create_err);
                    Err(DataError::ConnectionError(format!(
                        "failed to create keyspace {}: {}",
                        self.keyspace, create_err
                    )))
                }
            },
        }
    }

    /// Create every table and index with IF NOT EXISTS. Safe on every startup.
    pub async fn ensure_tables(&self, session: &dyn CqlSession) -> Result<(), DataError> {
        for table in &self.tables {
            session
                .execute(&table.create_statement(), vec![])
                .await
                .map_err(|e| {
                    error!("Error ensuring table {} exists: {}", table.name, e);
                    DataError::ConnectionError(format!("failed to create table {}: {}", table.name, e))
                })?;

            for statement in table.index_statements() {
                session.execute(&statement, vec![]).await.map_err(|e| {
                    error!("Error ensuring index on {} exists: {}", table.name, e);
                    DataError::ConnectionError(format!("failed to create index on {}: {}", table.name, e))
                })?;
            }
            info!("Table {}.{} ready", self.keyspace, table.name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use async_trait::async_trait;
    use crate::database::memory::MemoryCluster;
    use crate::database::session::SessionConnector;
    use crate::types::{ColumnValue, Row};

    fn items_table() -> TableDefinition {
        TableDefinition::new("items", "id")
            .column("id", "uuid")
            .column("owner", "text")
            .index("items_owner_idx", "owner")
    }

    #[test]
    fn test_create_statement() {
        assert_eq!(
            items_table().create_statement(),
            "CREATE TABLE IF NOT EXISTS items (id uuid PRIMARY KEY, owner text)"
        );
        assert_eq!(
            items_table().index_statements(),
            vec!["CREATE INDEX IF NOT EXISTS items_owner_idx ON items (owner)"]
        );
    }

    #[test]
    fn test_keyspace_statement_uses_simple_strategy() {
        let bootstrapper = SchemaBootstrapper::new("posts_ks", 1, vec![]);
        let statement = bootstrapper.create_keyspace_statement();
        assert!(statement.contains("'class' : 'SimpleStrategy'"));
        assert!(statement.contains("'replication_factor' : 1"));
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let cluster = MemoryCluster::new();
        let bootstrapper = SchemaBootstrapper::new("test_ks", 1, vec![items_table()]);

        for _ in 0..2 {
            let root = cluster.connector().connect(None).await.unwrap();
            bootstrapper.ensure_keyspace(root.as_ref()).await.unwrap();
            let session = cluster.connector().connect(Some("test_ks")).await.unwrap();
            bootstrapper.ensure_tables(session.as_ref()).await.unwrap();
        }
        let first = cluster.schema_snapshot("test_ks");

        let session = cluster.connector().connect(Some("test_ks")).await.unwrap();
        bootstrapper.ensure_tables(session.as_ref()).await.unwrap();
        assert_eq!(cluster.schema_snapshot("test_ks"), first);
        assert_eq!(first.len(), 1);
        assert!(first[0].contains("items_owner_idx(owner)"));
    }

    /// Reports the keyspace missing on the first lookup, as a process that
    /// loses the creation race would observe it
    struct RacingSession {
        inner: Arc<dyn CqlSession>,
        first_lookup: AtomicBool,
    }

    #[async_trait]
    impl CqlSession for RacingSession {
        async fn execute(&self, cql: &str, values: Vec<ColumnValue>) -> Result<(), DataError> {
            self.inner.execute(cql, values).await
        }

        async fn query(&self, cql: &str, values: Vec<ColumnValue>) -> Result<Vec<Row>, DataError> {
            self.inner.query(cql, values).await
        }

        async fn keyspace_exists(&self, keyspace: &str) -> Result<bool, DataError> {
            if self.first_lookup.swap(false, Ordering::SeqCst) {
                return Ok(false);
            }
            self.inner.keyspace_exists(keyspace).await
        }

        async fn close(&self) {
            self.inner.close().await
        }

        fn driver_name(&self) -> &str {
            "racing"
        }
    }

    #[tokio::test]
    async fn test_lost_keyspace_race_is_swallowed() {
        let cluster = MemoryCluster::new();
        let bootstrapper = SchemaBootstrapper::new("test_ks", 1, vec![]);
        let root = cluster.connector().connect(None).await.unwrap();
        bootstrapper.ensure_keyspace(root.as_ref()).await.unwrap();

        let racing = RacingSession {
            inner: cluster.connector().connect(None).await.unwrap(),
            first_lookup: AtomicBool::new(true),
        };
        bootstrapper.ensure_keyspace(&racing).await.unwrap();
    }

    /// Cluster that never has the keyspace and rejects every statement
    struct RejectingSession;

    #[async_trait]
    impl CqlSession for RejectingSession {
        async fn execute(&self, _cql: &str, _values: Vec<ColumnValue>) -> Result<(), DataError> {
            Err(DataError::DatabaseError("Unauthorized: no CREATE permission".to_string()))
        }

        async fn query(&self, _cql: &str, _values: Vec<ColumnValue>) -> Result<Vec<Row>, DataError> {
            Err(DataError::DatabaseError("Unauthorized".to_string()))
        }

        async fn keyspace_exists(&self, _keyspace: &str) -> Result<bool, DataError> {
            Ok(false)
        }

        async fn close(&self) {}

        fn driver_name(&self) -> &str {
            "rejecting"
        }
    }

    #[tokio::test]
    async fn test_failed_create_with_keyspace_still_missing_is_connection_error() {
        let bootstrapper = SchemaBootstrapper::new("test_ks", 1, vec![]);

        let err = bootstrapper.ensure_keyspace(&RejectingSession).await.unwrap_err();
        match err {
            DataError::ConnectionError(message) => {
                assert!(message.contains("test_ks"));
                assert!(message.contains("no CREATE permission"));
            }
            other => panic!("expected connection error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_keyspace_lookup_failure_is_connection_error() {
        let cluster = MemoryCluster::new();
        let bootstrapper = SchemaBootstrapper::new("test_ks", 1, vec![]);
        let root = cluster.connector().connect(None).await.unwrap();
        root.close().await;

        let result = bootstrapper.ensure_keyspace(root.as_ref()).await;
        assert!(matches!(result, Err(DataError::ConnectionError(_))));
        assert!(!cluster.has_keyspace("test_ks"));
    }
}
