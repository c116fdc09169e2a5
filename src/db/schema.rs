use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Migration {version} ({name}) was changed after it was applied")]
    ChecksumMismatch { version: u32, name: String },

    #[error("Database is at schema version {found}, this build only knows up to {known}")]
    UnknownVersion { found: u32, known: u32 },
}

/// One forward-only schema step. Versions start at 1 and have no gaps.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

impl Migration {
    pub fn checksum(&self) -> String {
        format!("{:x}", Sha256::digest(self.sql.as_bytes()))
    }
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "trades",
        sql: include_str!("migrations/001_trades.sql"),
    },
    Migration {
        version: 2,
        name: "strategies",
        sql: include_str!("migrations/002_strategies.sql"),
    },
];

const LEDGER_DDL: &str = "CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    checksum TEXT NOT NULL,
    applied_at TEXT NOT NULL
)";

/// Applied-migration ledger row.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedMigration {
    pub version: u32,
    pub name: String,
    pub checksum: String,
}

pub fn applied_migrations(conn: &Connection) -> Result<Vec<AppliedMigration>, SchemaError> {
    conn.execute(LEDGER_DDL, [])?;
    let mut stmt =
        conn.prepare("SELECT version, name, checksum FROM schema_version ORDER BY version")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(AppliedMigration {
                version: row.get(0)?,
                name: row.get(1)?,
                checksum: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn current_version(conn: &Connection) -> Result<Option<u32>, SchemaError> {
    conn.execute(LEDGER_DDL, [])?;
    let version = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<u32>>(0)
        })
        .optional()?
        .flatten();
    Ok(version)
}

/// Checks every applied migration against the SQL compiled into this build.
pub fn verify(conn: &Connection, migrations: &[Migration]) -> Result<(), SchemaError> {
    let known = migrations.last().map(|m| m.version).unwrap_or(0);
    for applied in applied_migrations(conn)? {
        let Some(migration) = migrations.iter().find(|m| m.version == applied.version) else {
            return Err(SchemaError::UnknownVersion {
                found: applied.version,
                known,
            });
        };
        if migration.checksum() != applied.checksum {
            log::error!(
                "Checksum mismatch for migration {} ({})",
                applied.version,
                applied.name
            );
            return Err(SchemaError::ChecksumMismatch {
                version: applied.version,
                name: applied.name,
            });
        }
    }
    Ok(())
}

/// Verifies the ledger, then applies the missing migrations in order, each in
/// its own transaction. Returns how many were applied.
pub fn migrate(conn: &mut Connection, migrations: &[Migration]) -> Result<usize, SchemaError> {
    verify(conn, migrations)?;
    let current = current_version(conn)?.unwrap_or(0);

    let mut applied = 0;
    for migration in migrations.iter().filter(|m| m.version > current) {
        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_version (version, name, checksum, applied_at) VALUES (?, ?, ?, ?)",
            params![
                migration.version,
                migration.name,
                migration.checksum(),
                Utc::now().to_rfc3339()
            ],
        )?;
        tx.commit()?;

        log::info!("Applied migration {}: {}", migration.version, migration.name);
        applied += 1;
    }

    Ok(applied)
}
