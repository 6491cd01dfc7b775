use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;
use async_trait::async_trait;
use tracing::{error, warn};

use crate::database::{CqlSession, QueryBuilder};
use crate::errors::DataError;
use crate::metrics;
use crate::types::{ColumnValue, Row};
use super::entity::Entity;

/// Entity-agnostic CRUD and raw statement access.
///
/// Failures are logged with the table and operation and returned to the
/// caller. Nothing here retries.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// Single-partition lookup. `Ok(None)` means no such row.
    async fn get_by_id(&self, id: E::Key) -> Result<Option<E>, DataError>;

    /// Unrestricted scan; only reasonable for small tables. Rows that do not
    /// decode are logged and skipped.
    async fn get_all(&self) -> Result<Vec<E>, DataError>;

    /// Insert-or-overwrite. The key must already be assigned.
    async fn create(&self, entity: E) -> Result<E, DataError>;

    /// Full-row replace by key. Like every CQL write this is an upsert, so the
    /// whole row is written and a missing key ends up as a complete row.
    /// Last writer wins; there is no version check.
    async fn update(&self, entity: E) -> Result<E, DataError>;

    /// Unconditional delete; deleting a missing key succeeds.
    async fn delete(&self, id: E::Key) -> Result<(), DataError>;

    /// Run a parameterized SELECT whose projection is `E::COLUMNS`. Rows
    /// that do not decode are logged and skipped.
    async fn query(&self, cql: &str, values: Vec<ColumnValue>) -> Result<Vec<E>, DataError>;

    /// Run a parameterized statement returning no rows.
    async fn execute(&self, cql: &str, values: Vec<ColumnValue>) -> Result<(), DataError>;
}

/// [`Repository`] over a shared CQL session
pub struct CqlRepository<E: Entity> {
    session: Arc<dyn CqlSession>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for CqlRepository<E> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> CqlRepository<E> {
    pub fn new(session: Arc<dyn CqlSession>) -> Self {
        Self {
            session,
            _entity: PhantomData,
        }
    }

    pub fn session(&self) -> &Arc<dyn CqlSession> {
        &self.session
    }

    /// Run a SELECT and decode its rows. Single-key lookups fail on a row that
    /// does not decode; scans skip it so one bad row cannot hide the rest.
    async fn fetch(
        &self,
        operation: &'static str,
        key: Option<&E::Key>,
        cql: &str,
        values: Vec<ColumnValue>,
    ) -> Result<Vec<E>, DataError> {
        let start = Instant::now();
        let result = match self.session.query(cql, values).await {
            Ok(rows) if key.is_some() => rows.into_iter().map(E::from_row).collect::<Result<Vec<_>, _>>(),
            Ok(rows) => Ok(Self::decode_scan(operation, rows)),
            Err(e) => Err(e),
        };
        metrics::record_operation(operation, E::TABLE, result.is_ok(), start.elapsed().as_secs_f64());
        result.map_err(|e| {
            error!(
                table = E::TABLE,
                operation,
                key = ?key.map(ToString::to_string),
                "Error reading from {}: {} ({})",
                E::TABLE,
                e,
                cql
            );
            DataError::read(E::TABLE, operation, e)
        })
    }

    fn decode_scan(operation: &'static str, rows: Vec<Row>) -> Vec<E> {
        rows.into_iter()
            .filter_map(|row| match E::from_row(row) {
                Ok(entity) => Some(entity),
                Err(e) => {
                    warn!(table = E::TABLE, operation, "Skipping undecodable row: {}", e);
                    None
                }
            })
            .collect()
    }

    async fn write(
        &self,
        operation: &'static str,
        key: Option<&E::Key>,
        cql: &str,
        values: Vec<ColumnValue>,
    ) -> Result<(), DataError> {
        let start = Instant::now();
        let result = self.session.execute(cql, values).await;
        metrics::record_operation(operation, E::TABLE, result.is_ok(), start.elapsed().as_secs_f64());
        result.map_err(|e| {
            error!(
                table = E::TABLE,
                operation,
                key = ?key.map(ToString::to_string),
                "Error writing to {}: {} ({})",
                E::TABLE,
                e,
                cql
            );
            DataError::write(E::TABLE, operation, e)
        })
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for CqlRepository<E> {
    async fn get_by_id(&self, id: E::Key) -> Result<Option<E>, DataError> {
        let query = QueryBuilder::build_select_by_key_query::<E>();
        let rows = self
            .fetch("get_by_id", Some(&id), &query, vec![id.clone().into()])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn get_all(&self) -> Result<Vec<E>, DataError> {
        let query = QueryBuilder::build_select_query::<E>();
        self.fetch("get_all", None, &query, vec![]).await
    }

    async fn create(&self, entity: E) -> Result<E, DataError> {
        let query = QueryBuilder::build_insert_query::<E>();
        let key = entity.key();
        self.write("create", Some(&key), &query, entity.to_row()).await?;
        Ok(entity)
    }

    async fn update(&self, entity: E) -> Result<E, DataError> {
        let query = QueryBuilder::build_update_query::<E>();
        let key = entity.key();
        let mut values: Vec<ColumnValue> = E::COLUMNS
            .iter()
            .zip(entity.to_row())
            .filter(|(column, _)| **column != E::KEY_COLUMN)
            .map(|(_, value)| value)
            .collect();
        values.push(key.clone().into());
        self.write("update", Some(&key), &query, values).await?;
        Ok(entity)
    }

    async fn delete(&self, id: E::Key) -> Result<(), DataError> {
        let query = QueryBuilder::build_delete_query::<E>();
        self.write("delete", Some(&id), &query, vec![id.clone().into()]).await
    }

    async fn query(&self, cql: &str, values: Vec<ColumnValue>) -> Result<Vec<E>, DataError> {
        self.fetch("query", None, cql, values).await
    }

    async fn execute(&self, cql: &str, values: Vec<ColumnValue>) -> Result<(), DataError> {
        self.write("execute", None, cql, values).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use crate::database::{MemoryCluster, SchemaBootstrapper, SessionConnector};
    use crate::model::{NewPost, Post, PostSchema};

    async fn repository() -> CqlRepository<Post> {
        let cluster = MemoryCluster::new();
        let connector = cluster.connector();
        let bootstrapper = SchemaBootstrapper::new(
            "generic_test",
            1,
            PostSchema { likes_enabled: false }.table_definitions(),
        );
        let root = connector.connect(None).await.unwrap();
        bootstrapper.ensure_keyspace(root.as_ref()).await.unwrap();
        let session = connector.connect(Some("generic_test")).await.unwrap();
        bootstrapper.ensure_tables(session.as_ref()).await.unwrap();
        CqlRepository::new(session)
    }

    #[tokio::test]
    async fn test_get_by_id_missing_is_none() {
        let repo = repository().await;
        assert!(repo.get_by_id(Uuid::new_v4()).await.unwrap().is_none());
        assert!(repo.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_update_delete() {
        let repo = repository().await;
        let mut post = repo.create(Post::from_new(NewPost::new("u1", "first"))).await.unwrap();
        assert_eq!(repo.get_by_id(post.id).await.unwrap(), Some(post.clone()));

        post.content = "second".to_string();
        post.location = Some("Tilburg".to_string());
        repo.update(post.clone()).await.unwrap();
        assert_eq!(repo.get_by_id(post.id).await.unwrap(), Some(post.clone()));

        // Clearing an optional column writes a null
        post.location = None;
        repo.update(post.clone()).await.unwrap();
        let stored = repo.get_by_id(post.id).await.unwrap().unwrap();
        assert!(stored.location.is_none());

        repo.delete(post.id).await.unwrap();
        assert!(repo.get_by_id(post.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_query_and_execute_bind_values() {
        let repo = repository().await;
        repo.create(Post::from_new(NewPost::new("u1", "a"))).await.unwrap();
        repo.create(Post::from_new(NewPost::new("u2", "b"))).await.unwrap();

        let query = QueryBuilder::build_select_where_query::<Post>("user_id", false);
        let found = repo.query(&query, vec!["u2".into()]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].content, "b");

        let delete = QueryBuilder::build_delete_query::<Post>();
        repo.execute(&delete, vec![found[0].id.into()]).await.unwrap();
        assert_eq!(repo.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_of_missing_key_writes_complete_row() {
        let repo = repository().await;
        let kept = repo.create(Post::from_new(NewPost::new("u1", "kept"))).await.unwrap();
        let never_created = Post::from_new(NewPost::new("u2", "upserted"));

        repo.update(never_created.clone()).await.unwrap();

        let stored = repo.get_by_id(never_created.id).await.unwrap().unwrap();
        assert_eq!(stored, never_created);
        let all = repo.get_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|p| p.id == kept.id));
    }

    #[tokio::test]
    async fn test_scan_skips_undecodable_rows() {
        let repo = repository().await;
        let good = repo.create(Post::from_new(NewPost::new("u1", "good"))).await.unwrap();
        let partial_id = Uuid::new_v4();
        // No created_at: the row cannot become a Post
        repo.execute(
            "UPDATE posts SET content = ? WHERE id = ?",
            vec!["partial".into(), partial_id.into()],
        )
        .await
        .unwrap();

        let all = repo.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, good.id);

        let query = QueryBuilder::build_select_query::<Post>();
        assert_eq!(repo.query(&query, vec![]).await.unwrap().len(), 1);

        let err = repo.get_by_id(partial_id).await.unwrap_err();
        assert!(matches!(err, DataError::ReadError { operation: "get_by_id", .. }));
    }

    #[tokio::test]
    async fn test_statement_failures_are_classified() {
        let repo = repository().await;

        // content is neither key nor indexed
        let query = QueryBuilder::build_select_where_query::<Post>("content", false);
        let err = repo.query(&query, vec!["a".into()]).await.unwrap_err();
        match err {
            DataError::ReadError { table, operation, message } => {
                assert_eq!(table, "posts");
                assert_eq!(operation, "query");
                assert!(message.contains("ALLOW FILTERING"));
            }
            other => panic!("expected read error, got {:?}", other),
        }

        let err = repo
            .execute("UPDATE posts SET likes = likes + 1 WHERE id = ?", vec![Uuid::new_v4().into()])
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::WriteError { .. }));
    }
}
