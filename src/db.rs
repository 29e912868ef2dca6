use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::settings::SettingsStore;

/// File name of the question-bank database inside the data directory.
pub const DB_FILE_NAME: &str = "mobius_data.sqlite3";

/// `<data_path>/mobius_data.sqlite3`. Fails when no data path is configured.
pub fn database_path(settings: &SettingsStore) -> Result<PathBuf> {
    let data_dir = settings.data_dir().with_context(|| {
        format!(
            "No data path configured; set data_path in {} or run `qbank init --data-path <DIR>`",
            settings.path().display()
        )
    })?;
    Ok(data_dir.join(DB_FILE_NAME))
}

/// Opens a pool on `db_path`. With `create` false a missing file is an error.
pub async fn connect(db_path: &Path, create: bool) -> Result<SqlitePool> {
    if create {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
    } else if !db_path.exists() {
        anyhow::bail!(
            "Database file {} does not exist; run `qbank init` first",
            db_path.display()
        );
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(create)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    Ok(pool)
}
