use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

use crate::error::{IntakeError, Result};
use crate::types::DocumentRecord;

/// Insert-only store for accepted documents.
pub struct Db {
    conn: Mutex<Connection>,
}

impl Db {
    pub fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        let db = Db {
            conn: Mutex::new(conn),
        };
        db.ensure_schema()?;
        info!("Database ready at {}", db_path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Db {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        db.ensure_schema()?;
        Ok(db)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| IntakeError::Task(format!("database lock poisoned: {}", e)))
    }

    /// Create the `docs` table if it does not exist yet.
    pub fn ensure_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS docs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filename TEXT NOT NULL,
                document_type TEXT NOT NULL,
                content_b64 TEXT NOT NULL,
                result TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Append a record and return the id SQLite assigned. `record.id` is not written.
    pub fn insert(&self, record: &DocumentRecord) -> Result<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO docs (filename, document_type, content_b64, result) VALUES (?1, ?2, ?3, ?4)",
            params![
                record.filename,
                record.document_type,
                record.content_b64,
                record.result
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn count(&self) -> Result<i64> {
        let conn = self.lock()?;
        let n = conn.query_row("SELECT COUNT(*) FROM docs", [], |r| r.get(0))?;
        Ok(n)
    }

    pub fn get(&self, id: i64) -> Result<Option<DocumentRecord>> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                "SELECT id, filename, document_type, content_b64, result FROM docs WHERE id = ?1",
                params![id],
                |row| {
                    Ok(DocumentRecord {
                        id: row.get(0)?,
                        filename: row.get(1)?,
                        document_type: row.get(2)?,
                        content_b64: row.get(3)?,
                        result: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }
}
