//! In-memory feed store

use crate::clock::{next_tstamp, now_millis};
use crate::{Feed, Reading, ReadingStore, StorageError};
use async_trait::async_trait;
use std::sync::RwLock;
use tracing::{debug, info};

/// Feed log plus the counters handed out with each insert
struct FeedLog {
    feeds: Vec<Feed>,
    next_id: i64,
    last_tstamp: i64,
}

/// Store that keeps every feed in process memory.
///
/// Ids start at 1. Contents are lost when the store is dropped.
pub struct MemoryStore {
    log: RwLock<FeedLog>,
}

impl MemoryStore {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        info!("Creating in-memory feed store");
        Self {
            log: RwLock::new(FeedLog {
                feeds: Vec::with_capacity(1024),
                next_id: 1,
                last_tstamp: 0,
            }),
        }
    }

    fn select<F>(&self, predicate: F) -> Result<Vec<Feed>, StorageError>
    where
        F: Fn(&Feed) -> bool,
    {
        let log = self
            .log
            .read()
            .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))?;

        // Feeds are appended in id order, so a filter keeps them sorted.
        Ok(log.feeds.iter().filter(|f| predicate(f)).cloned().collect())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReadingStore for MemoryStore {
    async fn store(&self, reading: Reading) -> Result<Feed, StorageError> {
        let mut log = self
            .log
            .write()
            .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))?;

        let id = log.next_id;
        let tstamp = next_tstamp(log.last_tstamp, now_millis());
        let feed = Feed::from_reading(id, tstamp, reading);

        log.feeds.push(feed.clone());
        log.next_id += 1;
        log.last_tstamp = tstamp;
        debug!("Stored feed {} for station {}", id, feed.station_id);

        Ok(feed)
    }

    async fn load_range(&self, from: i64, to: i64) -> Result<Vec<Feed>, StorageError> {
        self.select(|f| f.tstamp > from && f.tstamp < to)
    }

    async fn load_since(&self, from: i64) -> Result<Vec<Feed>, StorageError> {
        self.select(|f| f.tstamp > from)
    }

    async fn count(&self) -> Result<u64, StorageError> {
        let log = self
            .log
            .read()
            .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))?;
        Ok(log.feeds.len() as u64)
    }
}
