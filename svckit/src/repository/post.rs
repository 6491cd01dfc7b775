use std::cmp::Reverse;
use std::sync::Arc;
use futures::future::try_join_all;
use tracing::{error, info};
use uuid::Uuid;

use crate::database::{CqlSession, QueryBuilder};
use crate::errors::DataError;
use crate::model::post::{LIKES_COLUMN, LIKES_KEY_COLUMN, LIKES_TABLE};
use crate::model::{NewPost, Post, PostSchema};
use super::entity::Entity;
use super::generic::{CqlRepository, Repository};

/// Default row limit for bounded reads
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Post-specific reads and writes on top of [`CqlRepository`].
///
/// Likes are kept in a companion counter table and attached to every post
/// read when the schema carries them.
#[derive(Clone)]
pub struct PostRepository {
    posts: CqlRepository<Post>,
    session: Arc<dyn CqlSession>,
    schema: PostSchema,
}

impl PostRepository {
    pub fn new(session: Arc<dyn CqlSession>, schema: PostSchema) -> Self {
        Self {
            posts: CqlRepository::new(session.clone()),
            session,
            schema,
        }
    }

    /// Store a new post. Id and creation time are assigned here; the caller
    /// cannot supply them.
    pub async fn create(&self, new_post: NewPost) -> Result<Post, DataError> {
        let mut post = self.posts.create(Post::from_new(new_post)).await?;
        if self.schema.likes_enabled {
            post.likes = Some(0);
        }
        info!(post_id = %post.id, user_id = %post.user_id, "Created post");
        Ok(post)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Post>, DataError> {
        match self.posts.get_by_id(id).await? {
            Some(post) => Ok(Some(self.with_likes(post).await?)),
            None => Ok(None),
        }
    }

    /// Every post, newest first. Full table scan.
    pub async fn get_all(&self) -> Result<Vec<Post>, DataError> {
        let mut posts = self.attach_likes(self.posts.get_all().await?).await?;
        sort_newest_first(&mut posts);
        Ok(posts)
    }

    /// Posts of one author, newest first.
    ///
    /// `user_id` is a secondary index, not the partition key: the read fans out
    /// to every node and gets expensive as the table grows.
    pub async fn get_by_user(&self, user_id: &str) -> Result<Vec<Post>, DataError> {
        let query = QueryBuilder::build_select_where_query::<Post>("user_id", false);
        let posts = self.posts.query(&query, vec![user_id.into()]).await?;
        let mut posts = self.attach_likes(posts).await?;
        sort_newest_first(&mut posts);
        Ok(posts)
    }

    /// Most recent posts, newest first.
    ///
    /// `created_at` is not a clustering column, so the cluster cannot order by
    /// it; ordering happens here over a full scan. A time-bucketed companion
    /// table is the infrastructure fix once the table outgrows that.
    pub async fn get_latest(&self, limit: usize) -> Result<Vec<Post>, DataError> {
        let mut posts = self.posts.get_all().await?;
        sort_newest_first(&mut posts);
        posts.truncate(limit);
        self.attach_likes(posts).await
    }

    /// Most liked posts, ties broken by recency. Same full-scan caveat as
    /// [`get_latest`](Self::get_latest).
    pub async fn get_popular(&self, limit: usize) -> Result<Vec<Post>, DataError> {
        self.require_likes("get_popular")?;
        let mut posts = self.attach_likes(self.posts.get_all().await?).await?;
        posts.sort_by_key(|p| (Reverse(p.likes.unwrap_or(0)), Reverse(p.created_at)));
        posts.truncate(limit);
        Ok(posts)
    }

    /// Rewrite content, location and image of an existing post.
    ///
    /// Id, author, creation time and likes always keep their stored values,
    /// whatever the caller passes. Returns `None` if the post does not exist.
    /// The merged post is written as a full row, so a delete landing between
    /// the read and the write brings back a complete post, never a partial
    /// one. Concurrent updates to one post are last-writer-wins.
    pub async fn update(&self, post: Post) -> Result<Option<Post>, DataError> {
        let existing = match self.posts.get_by_id(post.id).await? {
            Some(existing) => existing,
            None => return Ok(None),
        };
        let updated = self.posts.update(existing.merge_changes(&post)).await?;
        Ok(Some(self.with_likes(updated).await?))
    }

    /// Hard delete of the post and its likes counter. Missing ids are fine.
    pub async fn delete(&self, id: Uuid) -> Result<(), DataError> {
        self.posts.delete(id).await?;
        if self.schema.likes_enabled {
            let query = QueryBuilder::build_delete_by_column_query(LIKES_TABLE, LIKES_KEY_COLUMN);
            self.session.execute(&query, vec![id.into()]).await.map_err(|e| {
                error!(table = LIKES_TABLE, post_id = %id, "Error deleting likes counter: {}", e);
                DataError::write(LIKES_TABLE, "delete", e)
            })?;
        }
        Ok(())
    }

    /// Add one like with a single server-side counter increment. No read
    /// happens first, so concurrent likes never overwrite each other.
    pub async fn increment_likes(&self, id: Uuid) -> Result<(), DataError> {
        self.require_likes("increment_likes")?;
        let query = QueryBuilder::build_increment_query(LIKES_TABLE, LIKES_COLUMN, LIKES_KEY_COLUMN);
        self.session.execute(&query, vec![id.into()]).await.map_err(|e| {
            error!(table = LIKES_TABLE, post_id = %id, "Error incrementing likes: {}", e);
            DataError::write(LIKES_TABLE, "increment_likes", e)
        })
    }

    fn require_likes(&self, operation: &str) -> Result<(), DataError> {
        if self.schema.likes_enabled {
            Ok(())
        } else {
            Err(DataError::Unsupported(format!(
                "{} requires the likes counter, which is disabled for {}",
                operation,
                Post::TABLE
            )))
        }
    }

    async fn likes_for(&self, id: Uuid) -> Result<i64, DataError> {
        let query = QueryBuilder::build_select_column_query(LIKES_TABLE, LIKES_COLUMN, LIKES_KEY_COLUMN);
        let rows = self.session.query(&query, vec![id.into()]).await.map_err(|e| {
            error!(table = LIKES_TABLE, post_id = %id, "Error reading likes: {}", e);
            DataError::read(LIKES_TABLE, "get_likes", e)
        })?;
        // No counter row yet means nobody liked the post
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .and_then(|cell| cell.as_i64())
            .unwrap_or(0))
    }

    async fn with_likes(&self, mut post: Post) -> Result<Post, DataError> {
        if self.schema.likes_enabled {
            post.likes = Some(self.likes_for(post.id).await?);
        }
        Ok(post)
    }

    async fn attach_likes(&self, posts: Vec<Post>) -> Result<Vec<Post>, DataError> {
        if !self.schema.likes_enabled {
            return Ok(posts);
        }
        try_join_all(posts.into_iter().map(|post| self.with_likes(post))).await
    }
}

fn sort_newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
