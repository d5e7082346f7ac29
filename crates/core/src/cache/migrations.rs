//! Database schema migrations.
//!
//! Uses a simple version table approach to track applied migrations.
//! Each migration is a SQL batch that transforms the schema.

use std::num::ParseIntError;

use super::Error;
use tokio_rusqlite::{Connection, params};

/// Migration list: (version, SQL).
///
/// Migrations must be applied in order. All migrations are idempotent using
/// CREATE IF NOT EXISTS.
const MIGRATIONS: &[(&str, &str)] = &[
    ("1", include_str!("../../migrations/001_generations.sql")),
    ("2", include_str!("../../migrations/002_entries.sql")),
];

/// Run any pending migrations.
///
/// This creates the _migrations table if it doesn't exist, checks the
/// current version, and applies any migrations that haven't been run yet.
///
/// # Errors
///
/// Returns an error if a migration SQL fails to execute.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(Error::from)?;

        let current: i64 = conn
            .query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| {
                row.get(0)
            })
            .map_err(Error::from)?;

        for (version, sql) in MIGRATIONS {
            let version_num: i64 = version
                .parse()
                .map_err(|e: ParseIntError| Error::MigrationFailed(e.to_string()))?;
            if version_num > current {
                tracing::debug!(version = version_num, "applying cache migration");
                conn.execute_batch(sql)?;
                conn.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                    params![version_num, chrono::Utc::now().to_rfc3339()],
                )
                .map_err(Error::from)?;
            }
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn table_exists(conn: &Connection, name: &'static str) -> bool {
        conn.call(move |conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1)",
                [name],
                |row| row.get(0),
            )
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();
        run(&conn).await.unwrap();

        assert!(table_exists(&conn, "generations").await);
        assert!(table_exists(&conn, "entries").await);
    }

    #[tokio::test]
    async fn test_migrations_version_tracking() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();

        let count: i64 = conn
            .call(|conn| conn.query_row("SELECT COUNT(*) FROM _migrations", [], |row| row.get(0)))
            .await
            .unwrap();

        assert_eq!(count, MIGRATIONS.len() as i64);
    }
}
