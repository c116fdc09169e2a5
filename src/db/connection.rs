use std::sync::Mutex;
use std::time::Duration;

use rusqlite::Connection;

use super::schema::{self, SchemaError, MIGRATIONS};

/// The journal database. One connection, shared behind a mutex.
pub struct Database {
    pub conn: Mutex<Connection>,
}

impl Database {
    /// Opens or creates the file and brings its schema up to date.
    pub fn open(path: &str) -> Result<Self, SchemaError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        log::info!("Opened journal database at {}", path);
        Self::with_schema(conn)
    }

    pub fn open_in_memory() -> Result<Self, SchemaError> {
        Self::with_schema(Connection::open_in_memory()?)
    }

    fn with_schema(mut conn: Connection) -> Result<Self, SchemaError> {
        match schema::migrate(&mut conn, MIGRATIONS)? {
            0 => log::debug!("Journal schema is up to date"),
            n => log::info!("Applied {} journal migration(s)", n),
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}
