pub mod connection;
pub mod factory;
pub mod memory;
pub mod query_builder;
pub mod retry;
pub mod schema;
pub mod scylla;
pub mod session;

pub use connection::ConnectionManager;
pub use factory::{DatabaseDriver, DatabaseFactory};
pub use memory::{MemoryCluster, MemoryConnector};
pub use query_builder::QueryBuilder;
pub use retry::StartupRetry;
pub use schema::{IndexDefinition, SchemaBootstrapper, TableDefinition};
pub use scylla::{ScyllaConnector, ScyllaSession};
pub use session::{CqlSession, SessionConnector};
