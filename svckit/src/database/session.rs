// svckit/src/database/session.rs
//
// Driver-independent session seam. Repositories, the schema bootstrapper and
// the health probe only ever see these traits, so the Scylla driver and the
// in-memory cluster are interchangeable.
//

use std::sync::Arc;
use async_trait::async_trait;

use crate::errors::DataError;
use crate::types::{ColumnValue, Row};

/// A live CQL session. Implementations must be safe for concurrent use;
/// callers share one instance without additional locking.
#[async_trait]
pub trait CqlSession: Send + Sync {
    /// Execute a statement that returns no rows. Values bind to `?` markers in order.
    async fn execute(&self, cql: &str, values: Vec<ColumnValue>) -> Result<(), DataError>;

    /// Execute a statement and return its rows, one value per selected column.
    async fn query(&self, cql: &str, values: Vec<ColumnValue>) -> Result<Vec<Row>, DataError>;

    /// Look the keyspace up in cluster metadata (refreshed first).
    async fn keyspace_exists(&self, keyspace: &str) -> Result<bool, DataError>;

    /// Release the session. Statements issued afterwards fail with `AlreadyClosed`.
    async fn close(&self);

    fn driver_name(&self) -> &str;
}

/// Builds sessions against one cluster, optionally bound to a keyspace
#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn connect(&self, keyspace: Option<&str>) -> Result<Arc<dyn CqlSession>, DataError>;

    fn driver_name(&self) -> &str;
}
