pub mod enums;
pub mod models;
pub mod services;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

// AUTOINCREMENT keeps monitor ids monotonic: a deleted monitor's id is never
// handed out again.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS monitors (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    user              TEXT NOT NULL,
    channel           TEXT NOT NULL,
    target            TEXT NOT NULL,
    type              TEXT NOT NULL,
    port              INTEGER,
    last_state_failed INTEGER NOT NULL DEFAULT 0
)
"#;

/// Opens the SQLite database at `db_path`, creating the file if it does not
/// exist yet.
pub async fn connect(db_path: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}

/// Creates the monitors table if it is missing. Safe to run on every start.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(SCHEMA).execute(pool).await?;
    Ok(())
}
