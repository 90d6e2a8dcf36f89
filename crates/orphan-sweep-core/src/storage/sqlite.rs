use super::UuidSource;
use rusqlite::{params, Connection, OpenFlags, Result};
use std::ops::ControlFlow;
use std::time::Duration;
use tracing::debug;

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open an existing archive database read-only. A missing file is an
    /// error, never a freshly created empty database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(Duration::from_secs(5))?;
        debug!("Opened database {}", path);
        Ok(Database { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.create_schema()?;
        Ok(db)
    }

    /// Create the `files` table if it is missing. Used for fixtures and tests.
    pub fn create_schema(&self) -> Result<()> {
        self.conn.execute_batch(include_str!("schema.sql"))?;
        debug!("files schema initialized");
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Insert a file record, optionally soft-deleted. Returns the new row id.
    pub fn insert_file(&self, uuid: &str, filename: &str, deleted: bool) -> Result<i64> {
        let now = chrono::Utc::now().to_rfc3339();
        let deleted_at = deleted.then(|| now.clone());
        self.conn.execute(
            "INSERT INTO files (uuid, filename, createdat, deletedat) VALUES (?1, ?2, ?3, ?4)",
            params![uuid, filename, now, deleted_at],
        )?;
        Ok(self.conn.last_insert_rowid())
    }
}

impl UuidSource for Database {
    fn count_files(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))
    }

    fn for_each_uuid(&self, f: &mut dyn FnMut(&str) -> ControlFlow<()>) -> Result<()> {
        let mut stmt = self.conn.prepare("SELECT id, uuid FROM files")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let id: i64 = row.get(0)?;
            let uuid: Option<String> = row.get(1)?;
            match uuid {
                Some(uuid) => {
                    if f(&uuid).is_break() {
                        break;
                    }
                }
                None => debug!("files row {} has no uuid", id),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_includes_soft_deleted() {
        let db = Database::open_in_memory().unwrap();
        db.insert_file("11111111-1111-1111-1111-111111111111", "a.zip", false)
            .unwrap();
        db.insert_file("22222222-2222-2222-2222-222222222222", "b.zip", true)
            .unwrap();
        assert_eq!(db.count_files().unwrap(), 2);

        let mut seen = Vec::new();
        db.for_each_uuid(&mut |uuid| {
            seen.push(uuid.to_string());
            ControlFlow::Continue(())
        })
        .unwrap();
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_null_uuid_skipped() {
        let db = Database::open_in_memory().unwrap();
        db.connection()
            .execute("INSERT INTO files (uuid, filename) VALUES (NULL, 'x.zip')", [])
            .unwrap();
        db.insert_file("33333333-3333-3333-3333-333333333333", "c.zip", false)
            .unwrap();

        let mut seen = Vec::new();
        db.for_each_uuid(&mut |uuid| {
            seen.push(uuid.to_string());
            ControlFlow::Continue(())
        })
        .unwrap();
        assert_eq!(seen, vec!["33333333-3333-3333-3333-333333333333".to_string()]);
    }

    #[test]
    fn test_missing_table_is_an_error() {
        let conn = Connection::open_in_memory().unwrap();
        let db = Database { conn };
        assert!(db.count_files().is_err());
        assert!(db.for_each_uuid(&mut |_| ControlFlow::Continue(())).is_err());
    }

    #[test]
    fn test_open_missing_path_does_not_create_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("typo.sqlite");
        assert!(Database::open(path.to_str().unwrap()).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_open_is_read_only() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("files.sqlite");
        let writer = Database {
            conn: Connection::open(&path).unwrap(),
        };
        writer.create_schema().unwrap();
        writer
            .insert_file("11111111-1111-1111-1111-111111111111", "a.zip", false)
            .unwrap();
        drop(writer);

        let db = Database::open(path.to_str().unwrap()).unwrap();
        assert_eq!(db.count_files().unwrap(), 1);
        assert!(db
            .insert_file("22222222-2222-2222-2222-222222222222", "b.zip", false)
            .is_err());
    }
}
