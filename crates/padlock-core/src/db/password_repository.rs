//! Password entry repository implementation

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::models::PasswordEntry;

/// Trait for password entry storage operations
pub trait PasswordRepository {
    /// Insert an entry, assigning a fresh id (any incoming id is ignored)
    fn insert(&self, entry: &PasswordEntry) -> Result<PasswordEntry>;

    /// Get an entry by id
    fn get(&self, id: i64) -> Result<Option<PasswordEntry>>;

    /// List all entries, favorites first, then by title
    fn list(&self) -> Result<Vec<PasswordEntry>>;

    /// Find an entry matching the `(title, username, website)` dedup key
    fn find_duplicate(
        &self,
        title: &str,
        username: &str,
        website: &str,
    ) -> Result<Option<PasswordEntry>>;

    /// Count all entries
    fn count(&self) -> Result<usize>;

    /// Delete an entry by id
    fn delete(&self, id: i64) -> Result<()>;
}

/// `SQLite` implementation of `PasswordRepository`
pub struct SqlitePasswordRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqlitePasswordRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse an entry from a database row
    fn parse_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<PasswordEntry> {
        Ok(PasswordEntry {
            id: row.get(0)?,
            title: row.get(1)?,
            website: row.get(2)?,
            username: row.get(3)?,
            password: row.get(4)?,
            notes: row.get(5)?,
            is_favorite: row.get::<_, i64>(6)? != 0,
        })
    }
}

const SELECT_COLUMNS: &str = "id, title, website, username, password, notes, is_favorite";

impl PasswordRepository for SqlitePasswordRepository<'_> {
    fn insert(&self, entry: &PasswordEntry) -> Result<PasswordEntry> {
        self.conn.execute(
            "INSERT INTO passwords (title, website, username, password, notes, is_favorite)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                entry.title,
                entry.website,
                entry.username,
                entry.password,
                entry.notes,
                i64::from(entry.is_favorite)
            ],
        )?;

        let mut inserted = entry.clone();
        inserted.id = self.conn.last_insert_rowid();
        Ok(inserted)
    }

    fn get(&self, id: i64) -> Result<Option<PasswordEntry>> {
        let entry = self
            .conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM passwords WHERE id = ?"),
                params![id],
                Self::parse_entry,
            )
            .optional()?;

        Ok(entry)
    }

    fn list(&self) -> Result<Vec<PasswordEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM passwords
             ORDER BY is_favorite DESC, title COLLATE NOCASE ASC, id ASC"
        ))?;

        let entries = stmt
            .query_map([], Self::parse_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }

    fn find_duplicate(
        &self,
        title: &str,
        username: &str,
        website: &str,
    ) -> Result<Option<PasswordEntry>> {
        let entry = self
            .conn
            .query_row(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM passwords
                     WHERE title = ? AND username = ? AND website = ?
                     LIMIT 1"
                ),
                params![title, username, website],
                Self::parse_entry,
            )
            .optional()?;

        Ok(entry)
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM passwords", [], |row| row.get(0))?;

        usize::try_from(count).map_err(|_| Error::Database("negative row count".to_string()))
    }

    fn delete(&self, id: i64) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM passwords WHERE id = ?", params![id])?;

        if rows == 0 {
            return Err(Error::NotFound(format!("password entry {id}")));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::db::Database;
    use crate::models::UNASSIGNED_ID;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn insert_assigns_fresh_ids() {
        let db = setup();
        let conn = db.lock().unwrap();
        let repo = SqlitePasswordRepository::new(&conn);

        let first = repo
            .insert(&PasswordEntry::new("Bank", "bank.com", "alice", "pw1"))
            .unwrap();
        let second = repo
            .insert(&PasswordEntry::new("Mail", "mail.com", "alice", "pw2"))
            .unwrap();

        assert_ne!(first.id, UNASSIGNED_ID);
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn insert_ignores_incoming_id() {
        let db = setup();
        let conn = db.lock().unwrap();
        let repo = SqlitePasswordRepository::new(&conn);

        let mut entry = PasswordEntry::new("Bank", "bank.com", "alice", "pw");
        entry.id = 999;

        let inserted = repo.insert(&entry).unwrap();
        assert_ne!(inserted.id, 999);
        assert!(repo.get(999).unwrap().is_none());
        assert!(repo.get(inserted.id).unwrap().is_some());
    }

    #[test]
    fn find_duplicate_matches_the_full_triple() {
        let db = setup();
        let conn = db.lock().unwrap();
        let repo = SqlitePasswordRepository::new(&conn);

        repo.insert(&PasswordEntry::new("Bank", "bank.com", "alice", "pw"))
            .unwrap();

        assert!(repo
            .find_duplicate("Bank", "alice", "bank.com")
            .unwrap()
            .is_some());
        assert!(repo
            .find_duplicate("Bank", "bob", "bank.com")
            .unwrap()
            .is_none());
        assert!(repo
            .find_duplicate("Bank", "alice", "other.com")
            .unwrap()
            .is_none());
    }

    #[test]
    fn list_orders_favorites_first() {
        let db = setup();
        let conn = db.lock().unwrap();
        let repo = SqlitePasswordRepository::new(&conn);

        repo.insert(&PasswordEntry::new("Zoo", "zoo.com", "alice", "pw"))
            .unwrap();
        let mut favorite = PasswordEntry::new("Mail", "mail.com", "alice", "pw");
        favorite.is_favorite = true;
        repo.insert(&favorite).unwrap();

        let entries = repo.list().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "Mail");
        assert!(entries[0].is_favorite);
    }

    #[test]
    fn count_and_delete() {
        let db = setup();
        let conn = db.lock().unwrap();
        let repo = SqlitePasswordRepository::new(&conn);

        let entry = repo
            .insert(&PasswordEntry::new("Bank", "bank.com", "alice", "pw"))
            .unwrap();
        assert_eq!(repo.count().unwrap(), 1);

        repo.delete(entry.id).unwrap();
        assert_eq!(repo.count().unwrap(), 0);

        assert!(matches!(
            repo.delete(entry.id).unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[test]
    fn roundtrip_preserves_notes_and_favorite() {
        let db = setup();
        let conn = db.lock().unwrap();
        let repo = SqlitePasswordRepository::new(&conn);

        let mut entry = PasswordEntry::new("Bank", "bank.com", "alice", "pw");
        entry.notes = "2FA via app".to_string();
        entry.is_favorite = true;

        let inserted = repo.insert(&entry).unwrap();
        let fetched = repo.get(inserted.id).unwrap().unwrap();

        assert_eq!(fetched.notes, "2FA via app");
        assert!(fetched.is_favorite);
        assert_eq!(fetched.password, "pw");
    }
}
