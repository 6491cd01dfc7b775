use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::database::TableDefinition;
use crate::errors::DataError;
use crate::repository::{Entity, RowReader};
use crate::types::{ColumnValue, Row};

pub const POSTS_TABLE: &str = "posts";
pub const POSTS_USER_INDEX: &str = "posts_user_id_idx";
pub const LIKES_TABLE: &str = "post_likes";
pub const LIKES_KEY_COLUMN: &str = "post_id";
pub const LIKES_COLUMN: &str = "likes";

/// A persisted post. `id` and `created_at` are assigned by the repository
/// and never change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub user_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    /// `None` when the schema carries no likes counter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<i64>,
}

/// Caller-supplied fields of a post about to be created
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewPost {
    pub user_id: String,
    pub content: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl NewPost {
    pub fn new(user_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            content: content.into(),
            ..Default::default()
        }
    }
}

impl Post {
    /// Assign a fresh id and the current time (millisecond precision, as stored)
    pub fn from_new(new: NewPost) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            content: new.content,
            created_at: Utc::now().trunc_subsecs(3),
            location: new.location,
            image: new.image,
            likes: None,
        }
    }

    /// Copy the mutable attributes of `changes` onto this post. Identity,
    /// authorship, creation time and likes are kept.
    pub fn merge_changes(mut self, changes: &Post) -> Self {
        self.content = changes.content.clone();
        self.location = changes.location.clone();
        self.image = changes.image.clone();
        self
    }
}

impl Entity for Post {
    type Key = Uuid;

    const TABLE: &'static str = POSTS_TABLE;
    const KEY_COLUMN: &'static str = "id";
    const COLUMNS: &'static [&'static str] =
        &["id", "user_id", "content", "created_at", "location", "image"];

    fn key(&self) -> Uuid {
        self.id
    }

    fn to_row(&self) -> Row {
        vec![
            ColumnValue::Uuid(self.id),
            ColumnValue::Text(self.user_id.clone()),
            ColumnValue::Text(self.content.clone()),
            ColumnValue::from(self.created_at),
            ColumnValue::from(self.location.clone()),
            ColumnValue::from(self.image.clone()),
        ]
    }

    fn from_row(row: Row) -> Result<Self, DataError> {
        let mut reader = RowReader::new(Self::TABLE, Self::COLUMNS, row)?;
        Ok(Self {
            id: reader.uuid()?,
            // An empty text cell can come back unset
            user_id: reader.optional_text()?.unwrap_or_default(),
            content: reader.optional_text()?.unwrap_or_default(),
            created_at: reader.timestamp()?,
            location: reader.optional_text()?,
            image: reader.optional_text()?,
            likes: None,
        })
    }
}

/// Schema capabilities of the post store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostSchema {
    pub likes_enabled: bool,
}

impl Default for PostSchema {
    fn default() -> Self {
        Self { likes_enabled: true }
    }
}

impl From<&DatabaseConfig> for PostSchema {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            likes_enabled: config.likes_enabled,
        }
    }
}

impl PostSchema {
    /// Tables the bootstrapper provisions.
    ///
    /// Likes live in a companion counter table: CQL does not allow a counter
    /// column beside regular columns.
    pub fn table_definitions(&self) -> Vec<TableDefinition> {
        let posts = TableDefinition::new(POSTS_TABLE, "id")
            .column("id", "uuid")
            .column("user_id", "text")
            .column("content", "text")
            .column("created_at", "timestamp")
            .column("location", "text")
            .column("image", "text")
            .index(POSTS_USER_INDEX, "user_id");

        let mut tables = vec![posts];
        if self.likes_enabled {
            tables.push(
                TableDefinition::new(LIKES_TABLE, LIKES_KEY_COLUMN)
                    .column(LIKES_KEY_COLUMN, "uuid")
                    .column(LIKES_COLUMN, "counter"),
            );
        }
        tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_roundtrip_keeps_optional_fields_unset() {
        let post = Post::from_new(NewPost::new("u1", "hello world"));
        let decoded = Post::from_row(post.to_row()).unwrap();
        assert_eq!(decoded, post);
        assert!(decoded.location.is_none());
        assert!(decoded.image.is_none());
    }

    #[test]
    fn test_from_row_rejects_wrong_shape() {
        let err = Post::from_row(vec![ColumnValue::Text("x".into())]).unwrap_err();
        assert!(matches!(err, DataError::DecodeError(_)));

        let mut row = Post::from_new(NewPost::new("u1", "hi")).to_row();
        row[0] = ColumnValue::Text("not-a-uuid".into());
        let err = Post::from_row(row).unwrap_err();
        assert!(err.to_string().contains("posts.id"));
    }

    #[test]
    fn test_merge_changes_keeps_identity() {
        let original = Post::from_new(NewPost::new("u1", "first"));
        let mut changes = Post::from_new(NewPost::new("intruder", "second"));
        changes.location = Some("Eindhoven".to_string());

        let merged = original.clone().merge_changes(&changes);
        assert_eq!(merged.id, original.id);
        assert_eq!(merged.user_id, "u1");
        assert_eq!(merged.created_at, original.created_at);
        assert_eq!(merged.content, "second");
        assert_eq!(merged.location.as_deref(), Some("Eindhoven"));
    }

    #[test]
    fn test_likes_table_only_when_enabled() {
        let with = PostSchema { likes_enabled: true }.table_definitions();
        let without = PostSchema { likes_enabled: false }.table_definitions();
        assert_eq!(with.len(), 2);
        assert_eq!(with[1].name, LIKES_TABLE);
        assert_eq!(without.len(), 1);
        assert!(with[0].create_statement().contains("created_at timestamp"));
    }

    #[test]
    fn test_content_is_not_truncated() {
        let long = "x".repeat(1000);
        let post = Post::from_new(NewPost::new("u1", long.clone()));
        assert_eq!(Post::from_row(post.to_row()).unwrap().content, long);
    }

    #[test]
    fn test_serialization_omits_absent_likes() {
        let post = Post::from_new(NewPost::new("u1", "hi"));
        let json = serde_json::to_string(&post).unwrap();
        assert!(!json.contains("likes"));
    }
}
