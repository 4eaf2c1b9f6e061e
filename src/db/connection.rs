use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::info;
use rusqlite::{Connection, Transaction};

/// Schema version recorded in `PRAGMA user_version`.
const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Version 1: the single `tastings` table plus the secondary indexes used by
/// list and filter queries. `mash_bill` holds a JSON object.
const SCHEMA_V1: &str = "
    CREATE TABLE IF NOT EXISTS tastings (
        id TEXT PRIMARY KEY NOT NULL,
        type TEXT NOT NULL CHECK (type IN ('wine', 'whisky')),
        name TEXT NOT NULL,
        image_base64 TEXT,
        nose_notes TEXT NOT NULL,
        palate_notes TEXT NOT NULL,
        finish_notes TEXT NOT NULL,
        color_notes TEXT NOT NULL,
        pairing_suggestions TEXT NOT NULL,
        aroma_score INTEGER NOT NULL,
        palate_score INTEGER NOT NULL,
        finish_score INTEGER NOT NULL,
        overall_score REAL NOT NULL,
        vintage INTEGER,
        varietal TEXT,
        region TEXT,
        distillery TEXT,
        age_statement INTEGER,
        mash_bill TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_tastings_type ON tastings(type);
    CREATE INDEX IF NOT EXISTS idx_tastings_name ON tastings(name);
    CREATE INDEX IF NOT EXISTS idx_tastings_overall_score ON tastings(overall_score);
    CREATE INDEX IF NOT EXISTS idx_tastings_created_at ON tastings(created_at);
";

/// Ensure the database file exists, run lazy migrations, and return a live
/// connection.
pub fn open_database(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent).context("failed to create data directory")?;
    }

    let mut conn = Connection::open(db_path).context("failed to open SQLite database")?;
    run_migrations(&mut conn)?;

    info!("Database ready at {}", db_path.display());
    Ok(conn)
}

/// Fresh in-memory database with the current schema. Nothing is persisted;
/// handy for tests and dry runs.
pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    run_migrations(&mut conn)?;
    Ok(conn)
}

fn run_migrations(conn: &mut Connection) -> Result<()> {
    let mut version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version pragma")?;

    if version > CURRENT_SCHEMA_VERSION {
        bail!(
            "database version ({}) is newer than supported schema ({})",
            version,
            CURRENT_SCHEMA_VERSION
        );
    }

    if version == CURRENT_SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn
        .transaction()
        .context("failed to open migration transaction")?;

    while version < CURRENT_SCHEMA_VERSION {
        let next_version = version + 1;
        apply_migration(&tx, next_version)
            .with_context(|| format!("migration to version {next_version} failed"))?;
        version = next_version;
    }

    tx.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)
        .context("failed to update user_version pragma")?;
    tx.commit().context("failed to commit migrations")?;

    Ok(())
}

fn apply_migration(tx: &Transaction<'_>, version: i32) -> Result<()> {
    match version {
        1 => tx
            .execute_batch(SCHEMA_V1)
            .context("failed to create tastings table"),
        _ => bail!("unknown migration target version: {version}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_record_the_schema_version() {
        let conn = open_in_memory().unwrap();
        let version: i32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn reopening_a_file_database_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("tastings.sqlite");
        drop(open_database(&path).unwrap());
        let conn = open_database(&path).unwrap();

        let indexes: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND tbl_name = 'tastings' AND name LIKE 'idx_%'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(indexes, 4);
    }

    #[test]
    fn rejects_databases_from_a_newer_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tastings.sqlite");
        {
            let conn = Connection::open(&path).unwrap();
            conn.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION + 1)
                .unwrap();
        }
        let err = open_database(&path).unwrap_err();
        assert!(err.to_string().contains("newer than supported"));
    }
}
