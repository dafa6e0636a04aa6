//! Settings repository implementation

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;

/// Trait for key/value settings storage operations
pub trait SettingsRepository {
    /// Read a setting, `None` when unset
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a setting, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a setting (removing an unset key is not an error)
    fn delete(&self, key: &str) -> Result<()>;
}

/// `SQLite` implementation of `SettingsRepository`
pub struct SqliteSettingsRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteSettingsRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl SettingsRepository for SqliteSettingsRepository<'_> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)",
            params![key, value],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM settings WHERE key = ?", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[test]
    fn get_returns_none_for_unset_keys() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock().unwrap();
        let repo = SqliteSettingsRepository::new(&conn);

        assert_eq!(repo.get("missing").unwrap(), None);
    }

    #[test]
    fn set_overwrites_previous_values() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock().unwrap();
        let repo = SqliteSettingsRepository::new(&conn);

        repo.set("webdav.server_url", "https://a.example.com").unwrap();
        repo.set("webdav.server_url", "https://b.example.com").unwrap();

        assert_eq!(
            repo.get("webdav.server_url").unwrap().as_deref(),
            Some("https://b.example.com")
        );
    }

    #[test]
    fn delete_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock().unwrap();
        let repo = SqliteSettingsRepository::new(&conn);

        repo.set("flag", "true").unwrap();
        repo.delete("flag").unwrap();
        repo.delete("flag").unwrap();

        assert_eq!(repo.get("flag").unwrap(), None);
    }
}
