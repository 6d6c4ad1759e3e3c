//! Database handles, migrations, and the sea-query execution bridge.
//!
//! The registry connection lives in [`crate::tenancy::TenantRegistry`]; this
//! module owns the per-tenant handle, the `_migrations` ledger, and the
//! on-disk blob store for asset bytes and generated sites.

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use jolli_api::db::migrations::Migration;

/// Handle to one tenant's database plus its data directory.
#[derive(Clone)]
pub struct TenantDb {
    conn: Arc<Mutex<Connection>>,
    data_dir: PathBuf,
}

impl TenantDb {
    pub fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Asset blob directory for this tenant.
    pub fn assets_dir(&self) -> PathBuf {
        self.data_dir.join("assets")
    }

    /// Generated-site output directory for this tenant.
    pub fn sites_dir(&self) -> PathBuf {
        self.data_dir.join("sites")
    }

    /// Write an asset blob to disk, return the storage key.
    pub fn write_blob(&self, asset_id: &str, bytes: &[u8]) -> Result<String> {
        let dir = self.assets_dir();
        std::fs::create_dir_all(&dir)?;
        let key = format!("{asset_id}.bin");
        let path = dir.join(&key);
        std::fs::write(&path, bytes).context("writing asset blob")?;
        Ok(key)
    }

    /// Read an asset blob from disk.
    pub fn read_blob(&self, storage_key: &str) -> Result<Vec<u8>> {
        let path = self.assets_dir().join(storage_key);
        std::fs::read(&path).context("reading asset blob")
    }

    /// Remove an asset blob. Missing files are not an error.
    pub fn remove_blob(&self, storage_key: &str) -> Result<()> {
        let path = self.assets_dir().join(storage_key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("removing asset blob"),
        }
    }
}

/// Open (or create) a SQLite database and bring its schema up to date.
pub fn open_database(db_path: &Path, migrations: &[Migration]) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(db_path).context("opening SQLite database")?;

    // WAL for concurrent readers
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;

    run_migrations(&conn, migrations)?;
    Ok(conn)
}

/// Wrap an open tenant connection into a cloneable handle.
pub fn tenant_db(conn: Connection, data_dir: PathBuf) -> TenantDb {
    TenantDb {
        conn: Arc::new(Mutex::new(conn)),
        data_dir,
    }
}

/// Apply any migrations not yet recorded in the `_migrations` ledger.
pub fn run_migrations(conn: &Connection, migrations: &[Migration]) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for (name, sql) in migrations {
        let already_applied: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .unwrap_or(false);

        if !already_applied {
            conn.execute_batch(sql)
                .with_context(|| format!("running migration {name}"))?;
            conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])?;
            tracing::info!("applied migration: {name}");
        }
    }

    Ok(())
}

// ── sea-query execution bridge ────────────────────────────────────────────

type Built = (String, sea_query::Values);

fn to_sql_value(value: sea_query::Value) -> rusqlite::types::Value {
    use rusqlite::types::Value as Sql;
    use sea_query::Value as Sq;
    match value {
        Sq::Bool(v) => v.map_or(Sql::Null, |b| Sql::Integer(b.into())),
        Sq::TinyInt(v) => v.map_or(Sql::Null, |n| Sql::Integer(n.into())),
        Sq::SmallInt(v) => v.map_or(Sql::Null, |n| Sql::Integer(n.into())),
        Sq::Int(v) => v.map_or(Sql::Null, |n| Sql::Integer(n.into())),
        Sq::BigInt(v) => v.map_or(Sql::Null, Sql::Integer),
        Sq::TinyUnsigned(v) => v.map_or(Sql::Null, |n| Sql::Integer(n.into())),
        Sq::SmallUnsigned(v) => v.map_or(Sql::Null, |n| Sql::Integer(n.into())),
        Sq::Unsigned(v) => v.map_or(Sql::Null, |n| Sql::Integer(n.into())),
        Sq::BigUnsigned(v) => v.map_or(Sql::Null, |n| Sql::Integer(n as i64)),
        Sq::Float(v) => v.map_or(Sql::Null, |f| Sql::Real(f.into())),
        Sq::Double(v) => v.map_or(Sql::Null, Sql::Real),
        Sq::Char(v) => v.map_or(Sql::Null, |c| Sql::Text(c.to_string())),
        Sq::String(v) => v.map_or(Sql::Null, |s| Sql::Text(*s)),
        Sq::Bytes(v) => v.map_or(Sql::Null, |b| Sql::Blob(*b)),
    }
}

fn bind_params(values: sea_query::Values) -> Vec<rusqlite::types::Value> {
    values.0.into_iter().map(to_sql_value).collect()
}

/// Execute a built INSERT/UPDATE/DELETE, returning the affected row count.
pub fn sq_execute(conn: &Connection, (sql, values): Built) -> rusqlite::Result<usize> {
    conn.execute(&sql, rusqlite::params_from_iter(bind_params(values)))
}

/// Run a built SELECT expected to yield at most one row.
pub fn sq_query_row<T, F>(conn: &Connection, (sql, values): Built, f: F) -> rusqlite::Result<Option<T>>
where
    F: FnOnce(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
{
    conn.query_row(&sql, rusqlite::params_from_iter(bind_params(values)), f)
        .optional()
}

/// Run a built SELECT and collect all rows.
pub fn sq_query_map<T, F>(conn: &Connection, (sql, values): Built, f: F) -> rusqlite::Result<Vec<T>>
where
    F: FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(bind_params(values)), f)?;
    rows.collect()
}
