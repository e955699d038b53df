use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqliteConnection, SqlitePool};

use crate::error::{Error, Result};

// ============================================================================
// Database plumbing: pool, transactions, deadlines
// ============================================================================
//
// Writers open their transaction with BEGIN IMMEDIATE so the write lock is
// taken up front; concurrent DEFERRED transactions would otherwise race to
// upgrade from shared to exclusive and fail with SQLITE_BUSY instead of
// producing a clean version conflict. Readers go straight to the pool and
// see committed data only (WAL).
//
// ============================================================================

pub async fn connect(
    database_url: &str,
    max_connections: u32,
    busy_timeout: Duration,
) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(busy_timeout);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    tracing::debug!(
        database_url = %database_url,
        max_connections,
        "Connected to event store database"
    );

    Ok(pool)
}

/// Run a storage future under a deadline
pub async fn with_deadline<T, F>(deadline: Duration, operation: &'static str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                operation,
                deadline_ms = deadline.as_millis() as u64,
                "Storage operation exceeded its deadline"
            );
            Err(Error::Technical(format!(
                "{operation}: deadline of {}ms exceeded",
                deadline.as_millis()
            )))
        }
    }
}

/// A write transaction on a dedicated pool connection.
///
/// If it is dropped without commit or rollback (e.g. the caller's future was
/// cancelled) the connection is closed instead of going back to the pool,
/// which makes SQLite discard the open transaction.
pub struct Transaction {
    conn: PoolConnection<Sqlite>,
    finished: bool,
}

impl Transaction {
    pub async fn begin(pool: &SqlitePool) -> Result<Self> {
        let conn = pool.acquire().await?;

        // Guard is armed before BEGIN: a cancelled BEGIN may still complete on
        // the connection, so it must never return to the pool.
        let mut tx = Self { conn, finished: false };
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *tx.conn).await?;

        Ok(tx)
    }

    pub fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }

    pub async fn commit(mut self) -> Result<()> {
        sqlx::query("COMMIT").execute(&mut *self.conn).await?;
        self.finished = true;
        Ok(())
    }

    pub async fn rollback(mut self) -> Result<()> {
        sqlx::query("ROLLBACK").execute(&mut *self.conn).await?;
        self.finished = true;
        Ok(())
    }

    /// Commit on success, roll back on failure; the work's own error wins
    pub async fn finish<T>(self, outcome: Result<T>) -> Result<T> {
        match outcome {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback().await {
                    tracing::error!(
                        error = %rollback_err,
                        "Rollback failed, connection will be discarded"
                    );
                }
                Err(err)
            }
        }
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.finished {
            self.conn.close_on_drop();
        }
    }
}
