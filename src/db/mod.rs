pub mod dm;
pub mod migrations;
pub mod models;
pub mod notifications;
pub mod polls;
pub mod tweets;
pub mod users;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::ApiError;

/// Shared database handle. rusqlite is synchronous — the connection is
/// wrapped in Arc<Mutex> and every query runs under
/// tokio::task::spawn_blocking so the event loop never blocks on SQLite.
pub type DbPool = Arc<Mutex<Connection>>;

/// Initialize the SQLite database: create the data directory if needed,
/// open (or create) the database file, enable WAL mode, and run migrations.
pub fn init_db(data_dir: &str) -> Result<DbPool, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(data_dir)?;

    let db_path = Path::new(data_dir).join("flock.db");
    let mut conn = Connection::open(&db_path)?;

    // WAL for better concurrent read performance
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    migrations::migrations().to_latest(&mut conn)?;

    tracing::info!("Database initialized at {}", db_path.display());

    Ok(Arc::new(Mutex::new(conn)))
}

/// Acquire the connection lock, mapping poisoning to an internal error.
pub fn lock(db: &DbPool) -> Result<MutexGuard<'_, Connection>, ApiError> {
    db.lock()
        .map_err(|e| ApiError::Internal(format!("db lock poisoned: {e}")))
}

/// Current timestamp in the canonical storage format (RFC3339, UTC).
pub fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Fresh UUIDv7 row id.
pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
