use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::error::{Error, Result};
use crate::event_sourcing::core::{Clock, DomainEvent, EventCodec, EventEnvelope, StreamId};

// ============================================================================
// Generic Event Store - Repository for Events
// ============================================================================
//
// This is a GENERIC event store that works with ANY codec / event type.
//
// Responsibilities:
// 1. Append events to the event table (append-only)
// 2. Load event history for a stream, ordered by stream version
// 3. Ensure optimistic concurrency control at commit time
// 4. Purge a stream
//
// Writes run on a connection the caller has put inside a transaction, so
// that other writes (e.g. a uniqueness ledger) can join the same unit.
//
// ============================================================================

pub struct EventStore<C: EventCodec> {
    pool: SqlitePool,
    table: String,
    codec: C,
    clock: Arc<dyn Clock>,
}

impl<C: EventCodec> EventStore<C> {
    pub fn new(pool: SqlitePool, table: &str, codec: C, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            table: table.to_string(),
            codec,
            clock,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the event table if it does not exist yet
    pub async fn init_schema(&self) -> Result<()> {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                stream_id TEXT NOT NULL,
                stream_version INTEGER NOT NULL CHECK (stream_version >= 1),
                event_name TEXT NOT NULL,
                payload BLOB NOT NULL,
                recorded_at TEXT NOT NULL,
                PRIMARY KEY (stream_id, stream_version)
            )",
            self.table
        );

        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(())
    }

    /// Load raw envelopes, ordered by stream version
    pub async fn load_envelopes(
        &self,
        stream_id: &StreamId,
        from_version: u64,
        max_count: u64,
    ) -> Result<Vec<EventEnvelope>> {
        let query = format!(
            "SELECT event_name, payload, stream_version, recorded_at
             FROM {}
             WHERE stream_id = ? AND stream_version >= ?
             ORDER BY stream_version ASC
             LIMIT ?",
            self.table
        );

        let rows = sqlx::query(&query)
            .bind(stream_id.as_str())
            .bind(to_sql_int(from_version))
            .bind(to_sql_int(max_count))
            .fetch_all(&self.pool)
            .await?;

        let mut envelopes = Vec::with_capacity(rows.len());
        for row in rows {
            let stream_version: i64 = row.try_get("stream_version")?;
            let recorded_at: DateTime<Utc> = row.try_get("recorded_at")?;

            envelopes.push(EventEnvelope {
                stream_id: stream_id.clone(),
                event_name: row.try_get("event_name")?,
                payload: row.try_get("payload")?,
                stream_version: from_sql_int(stream_version)?,
                recorded_at,
            });
        }

        Ok(envelopes)
    }

    /// Load and decode events of a stream. An absent stream is empty.
    pub async fn load(
        &self,
        stream_id: &StreamId,
        from_version: u64,
        max_count: u64,
    ) -> Result<Vec<C::Event>> {
        let envelopes = self.load_envelopes(stream_id, from_version, max_count).await?;

        let events = envelopes
            .iter()
            .map(|envelope| {
                self.codec
                    .decode(&envelope.event_name, &envelope.payload, envelope.stream_version)
                    .map_err(|e| e.context(format!("eventStore.load [{}]", stream_id)))
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(stream_id = %stream_id, event_count = events.len(), "Loaded event stream");

        Ok(events)
    }

    /// Highest persisted version of a stream, 0 when the stream is absent
    pub async fn current_version(
        &self,
        conn: &mut SqliteConnection,
        stream_id: &StreamId,
    ) -> Result<u64> {
        let query = format!("SELECT MAX(stream_version) FROM {} WHERE stream_id = ?", self.table);

        let row = sqlx::query(&query)
            .bind(stream_id.as_str())
            .fetch_one(&mut *conn)
            .await?;

        let max_version: Option<i64> = row.try_get(0)?;
        max_version.map(from_sql_int).unwrap_or(Ok(0))
    }

    /// Append events as the versions following `expected_version`.
    ///
    /// The stream's actual version is re-read on the transaction's connection
    /// and compared with `expected_version`; on mismatch nothing is written.
    pub async fn append(
        &self,
        conn: &mut SqliteConnection,
        stream_id: &StreamId,
        events: &[C::Event],
        expected_version: u64,
    ) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let actual_version = self.current_version(conn, stream_id).await?;
        if actual_version != expected_version {
            return Err(Error::ConcurrencyConflict(format!(
                "stream [{}]: expected version {}, but current is {}",
                stream_id, expected_version, actual_version
            )));
        }

        let insert = format!(
            "INSERT INTO {} (stream_id, stream_version, event_name, payload, recorded_at)
             VALUES (?, ?, ?, ?, ?)",
            self.table
        );
        let recorded_at = self.clock.now();

        let mut new_version = expected_version;
        for event in events {
            new_version += 1;

            if event.stream_version() != new_version {
                return Err(Error::InvalidEventStream(format!(
                    "stream [{}]: event {} carries version {}, but its slot is {}",
                    stream_id,
                    event.event_name(),
                    event.stream_version(),
                    new_version
                )));
            }

            let (event_name, payload) = self.codec.encode(event)?;

            let inserted = sqlx::query(&insert)
                .bind(stream_id.as_str())
                .bind(to_sql_int(new_version))
                .bind(&event_name)
                .bind(payload)
                .bind(recorded_at)
                .execute(&mut *conn)
                .await;

            match inserted {
                Ok(_) => {}
                Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                    return Err(Error::ConcurrencyConflict(format!(
                        "stream [{}]: version {} is already taken",
                        stream_id, new_version
                    )));
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!(
            stream_id = %stream_id,
            expected_version,
            new_version,
            event_count = events.len(),
            "Appended events to event store"
        );

        Ok(())
    }

    /// Delete every envelope of a stream; purging an absent stream is fine
    pub async fn purge(&self, conn: &mut SqliteConnection, stream_id: &StreamId) -> Result<()> {
        let query = format!("DELETE FROM {} WHERE stream_id = ?", self.table);

        let result = sqlx::query(&query)
            .bind(stream_id.as_str())
            .execute(&mut *conn)
            .await?;

        tracing::info!(
            stream_id = %stream_id,
            purged = result.rows_affected(),
            "Purged event stream"
        );

        Ok(())
    }
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_sql_int(value: i64) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| Error::InvalidEventStream(format!("negative stream version {value}")))
}

// ============================================================================
// Unit Tests
// ============================================================================
