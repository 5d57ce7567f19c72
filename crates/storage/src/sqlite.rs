//! SQLite-backed feed store
//!
//! One table holds every feed as `(id, station_id, tstamp, payload)`, where
//! `payload` is the submitted reading serialized as JSON. Keeping the raw
//! reading lets its shape grow without migrating old rows.
//!
//! The database runs in WAL mode with `synchronous = FULL`, so a commit is on
//! disk before `store` returns and readers keep going while a write is in
//! flight.

use crate::clock::{next_tstamp, now_millis};
use crate::{Feed, Reading, ReadingStore, StorageError};
use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::Row;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS feeds (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        station_id TEXT NOT NULL,
        tstamp INTEGER NOT NULL,
        payload TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS feeds_tstamp_idx ON feeds (tstamp)",
    "CREATE INDEX IF NOT EXISTS feeds_station_idx ON feeds (station_id)",
];

const MAX_CONNECTIONS: u32 = 4;

/// Durable feed store on a single SQLite file
pub struct SqliteStore {
    pool: SqlitePool,
    /// Last timestamp handed out; the lock also serializes writers
    last_tstamp: Arc<Mutex<i64>>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    ///
    /// Existing rows are kept and new ids continue after the current
    /// maximum.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }

        let last: Option<i64> = sqlx::query_scalar("SELECT MAX(tstamp) FROM feeds")
            .fetch_one(&pool)
            .await?;

        info!("Opened feed store at {}", path.display());

        Ok(Self {
            pool,
            last_tstamp: Arc::new(Mutex::new(last.unwrap_or(0))),
        })
    }

    /// Close the connection pool, waiting for in-flight queries.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn decode_row(row: &SqliteRow) -> Result<Feed, StorageError> {
    let id: i64 = row.try_get("id")?;
    let station_id: String = row.try_get("station_id")?;
    let tstamp: i64 = row.try_get("tstamp")?;
    let payload: String = row.try_get("payload")?;

    let reading: Reading = serde_json::from_str(&payload).map_err(|e| {
        StorageError::SerializationError(format!("feed {}: {}", id, e))
    })?;

    Ok(Feed {
        id,
        station_id,
        tstamp,
        humidity: reading.humidity,
        temperature: reading.temperature,
    })
}

#[async_trait]
impl ReadingStore for SqliteStore {
    async fn store(&self, reading: Reading) -> Result<Feed, StorageError> {
        let payload = serde_json::to_string(&reading)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        // The spawned insert holds the writer lock until the row is committed,
        // even if this future is dropped.
        let mut last = self.last_tstamp.clone().lock_owned().await;
        let pool = self.pool.clone();
        let station_id = reading.station_id.clone();

        let insert = tokio::spawn(async move {
            let tstamp = next_tstamp(*last, now_millis());
            *last = tstamp;

            let result = sqlx::query(
                "INSERT INTO feeds (station_id, tstamp, payload) VALUES (?1, ?2, ?3)",
            )
            .bind(station_id)
            .bind(tstamp)
            .bind(payload)
            .execute(&pool)
            .await?;

            Ok::<_, StorageError>((result.last_insert_rowid(), tstamp))
        });

        let (id, tstamp) = insert
            .await
            .map_err(|e| StorageError::DatabaseError(format!("insert task failed: {}", e)))??;
        debug!("Stored feed {} for station {}", id, reading.station_id);

        Ok(Feed::from_reading(id, tstamp, reading))
    }

    async fn load_range(&self, from: i64, to: i64) -> Result<Vec<Feed>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, station_id, tstamp, payload FROM feeds
             WHERE tstamp > ?1 AND tstamp < ?2 ORDER BY id",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(decode_row).collect()
    }

    async fn load_since(&self, from: i64) -> Result<Vec<Feed>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, station_id, tstamp, payload FROM feeds
             WHERE tstamp > ?1 ORDER BY id",
        )
        .bind(from)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(decode_row).collect()
    }

    async fn count(&self) -> Result<u64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM feeds")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}
