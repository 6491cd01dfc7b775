use crate::repository::Entity;

/// CQL text for the statements the repositories issue.
///
/// Only identifiers are formatted into the text; every value travels as a
/// bound `?` marker.
pub struct QueryBuilder;

impl QueryBuilder {
    /// Build an INSERT covering every column of the entity
    pub fn build_insert_query<E: Entity>() -> String {
        let markers = vec!["?"; E::COLUMNS.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            E::TABLE,
            E::COLUMNS.join(", "),
            markers
        )
    }

    /// Build an unrestricted SELECT of every entity column
    pub fn build_select_query<E: Entity>() -> String {
        format!("SELECT {} FROM {}", E::COLUMNS.join(", "), E::TABLE)
    }

    /// Build a single-partition SELECT by key
    pub fn build_select_by_key_query<E: Entity>() -> String {
        Self::build_select_where_query::<E>(E::KEY_COLUMN, false)
    }

    /// Build a SELECT filtered on one column. `allow_filtering` is needed when
    /// the column is neither the key nor indexed.
    pub fn build_select_where_query<E: Entity>(column: &str, allow_filtering: bool) -> String {
        let mut query = format!("{} WHERE {} = ?", Self::build_select_query::<E>(), column);
        if allow_filtering {
            query.push_str(" ALLOW FILTERING");
        }
        query
    }

    /// Build a full-row UPDATE of every non-key column, keyed on the
    /// partition key. Values bind in `COLUMNS` order without the key, then
    /// the key.
    pub fn build_update_query<E: Entity>() -> String {
        let set_clause = E::COLUMNS
            .iter()
            .filter(|c| **c != E::KEY_COLUMN)
            .map(|c| format!("{} = ?", c))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "UPDATE {} SET {} WHERE {} = ?",
            E::TABLE,
            set_clause,
            E::KEY_COLUMN
        )
    }

    /// Build a DELETE by key
    pub fn build_delete_query<E: Entity>() -> String {
        format!("DELETE FROM {} WHERE {} = ?", E::TABLE, E::KEY_COLUMN)
    }

    /// Build a server-side counter increment
    pub fn build_increment_query(table: &str, counter_column: &str, key_column: &str) -> String {
        format!(
            "UPDATE {} SET {} = {} + 1 WHERE {} = ?",
            table, counter_column, counter_column, key_column
        )
    }

    /// Build a SELECT of one column by key from a companion table
    pub fn build_select_column_query(table: &str, column: &str, key_column: &str) -> String {
        format!("SELECT {} FROM {} WHERE {} = ?", column, table, key_column)
    }

    /// Build a DELETE by key for a companion table
    pub fn build_delete_by_column_query(table: &str, key_column: &str) -> String {
        format!("DELETE FROM {} WHERE {} = ?", table, key_column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Post;

    #[test]
    fn test_build_insert_query() {
        let query = QueryBuilder::build_insert_query::<Post>();
        assert_eq!(
            query,
            "INSERT INTO posts (id, user_id, content, created_at, location, image) VALUES (?, ?, ?, ?, ?, ?)"
        );
    }

    #[test]
    fn test_build_update_query_writes_full_row() {
        let query = QueryBuilder::build_update_query::<Post>();
        assert_eq!(
            query,
            "UPDATE posts SET user_id = ?, content = ?, created_at = ?, location = ?, image = ? WHERE id = ?"
        );
    }

    #[test]
    fn test_build_select_where_query() {
        let query = QueryBuilder::build_select_where_query::<Post>("user_id", true);
        assert!(query.starts_with("SELECT id, user_id"));
        assert!(query.ends_with("WHERE user_id = ? ALLOW FILTERING"));
    }

    #[test]
    fn test_build_increment_query() {
        let query = QueryBuilder::build_increment_query("post_likes", "likes", "post_id");
        assert_eq!(query, "UPDATE post_likes SET likes = likes + 1 WHERE post_id = ?");
    }
}
