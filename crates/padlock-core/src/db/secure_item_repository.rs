//! Secure item repository implementation

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::models::{SecureItem, SecureItemType};

/// Trait for secure item storage operations
pub trait SecureItemRepository {
    /// Insert an item, assigning a fresh id (any incoming id is ignored).
    ///
    /// `created_at`/`updated_at` are stored as given so restored records
    /// keep their original timestamps.
    fn insert(&self, item: &SecureItem) -> Result<SecureItem>;

    /// Get an item by id
    fn get(&self, id: i64) -> Result<Option<SecureItem>>;

    /// List all items, favorites first, then newest first
    fn list(&self) -> Result<Vec<SecureItem>>;

    /// Find an item matching the `(item_type, title)` dedup key
    fn find_duplicate(&self, item_type: SecureItemType, title: &str)
        -> Result<Option<SecureItem>>;

    /// Count all items
    fn count(&self) -> Result<usize>;

    /// Delete an item by id
    fn delete(&self, id: i64) -> Result<()>;
}

/// `SQLite` implementation of `SecureItemRepository`
pub struct SqliteSecureItemRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteSecureItemRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse an item from a database row
    fn parse_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<SecureItem> {
        let tag: String = row.get(1)?;
        let item_type = tag.parse::<SecureItemType>().map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Text,
                Box::new(error),
            )
        })?;

        let image_paths: String = row.get(6)?;

        Ok(SecureItem {
            id: row.get(0)?,
            item_type,
            title: row.get(2)?,
            item_data: row.get(3)?,
            notes: row.get(4)?,
            is_favorite: row.get::<_, i64>(5)? != 0,
            image_paths: serde_json::from_str(&image_paths).unwrap_or_default(),
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

const SELECT_COLUMNS: &str =
    "id, item_type, title, item_data, notes, is_favorite, image_paths, created_at, updated_at";

impl SecureItemRepository for SqliteSecureItemRepository<'_> {
    fn insert(&self, item: &SecureItem) -> Result<SecureItem> {
        let image_paths = serde_json::to_string(&item.image_paths)?;

        self.conn.execute(
            "INSERT INTO secure_items
                 (item_type, title, item_data, notes, is_favorite, image_paths, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                item.item_type.as_str(),
                item.title,
                item.item_data,
                item.notes,
                i64::from(item.is_favorite),
                image_paths,
                item.created_at,
                item.updated_at
            ],
        )?;

        let mut inserted = item.clone();
        inserted.id = self.conn.last_insert_rowid();
        Ok(inserted)
    }

    fn get(&self, id: i64) -> Result<Option<SecureItem>> {
        let item = self
            .conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM secure_items WHERE id = ?"),
                params![id],
                Self::parse_item,
            )
            .optional()?;

        Ok(item)
    }

    fn list(&self) -> Result<Vec<SecureItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM secure_items
             ORDER BY is_favorite DESC, updated_at DESC, id ASC"
        ))?;

        let items = stmt
            .query_map([], Self::parse_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(items)
    }

    fn find_duplicate(
        &self,
        item_type: SecureItemType,
        title: &str,
    ) -> Result<Option<SecureItem>> {
        let item = self
            .conn
            .query_row(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM secure_items
                     WHERE item_type = ? AND title = ?
                     LIMIT 1"
                ),
                params![item_type.as_str(), title],
                Self::parse_item,
            )
            .optional()?;

        Ok(item)
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM secure_items", [], |row| row.get(0))?;

        usize::try_from(count).map_err(|_| Error::Database("negative row count".to_string()))
    }

    fn delete(&self, id: i64) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM secure_items WHERE id = ?", params![id])?;

        if rows == 0 {
            return Err(Error::NotFound(format!("secure item {id}")));
        }

        Ok(())
    }
}
