//! Query service
//!
//! Loads raw feeds for a time window and decimates them for charting.

use decimator::{decimate, Window};
use std::sync::Arc;
use storage::{Feed, ReadingStore, StorageError};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("missing query parameter: {0}")]
    MissingBound(&'static str),
    #[error("{name} must be an integer epoch millisecond value, got {value:?}")]
    InvalidBound { name: &'static str, value: String },
    #[error("{name} must not be negative, got {value}")]
    NegativeBound { name: &'static str, value: i64 },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Parse an optional raw query parameter into a non-negative bound
pub fn parse_bound(name: &'static str, raw: Option<&str>) -> Result<i64, QueryError> {
    let raw = raw.ok_or(QueryError::MissingBound(name))?;
    let value: i64 = raw.trim().parse().map_err(|_| QueryError::InvalidBound {
        name,
        value: raw.to_string(),
    })?;
    check_bound(name, value)
}

fn check_bound(name: &'static str, value: i64) -> Result<i64, QueryError> {
    if value < 0 {
        return Err(QueryError::NegativeBound { name, value });
    }
    Ok(value)
}

/// Decimated range and since queries over the store
pub struct QueryService {
    store: Arc<dyn ReadingStore>,
    window: Window,
}

impl QueryService {
    pub fn new(store: Arc<dyn ReadingStore>, window: Window) -> Self {
        Self { store, window }
    }

    /// Decimated feeds with `from < tstamp < to`
    pub async fn range(&self, from: i64, to: i64) -> Result<Vec<Feed>, QueryError> {
        let from = check_bound("from", from)?;
        let to = check_bound("to", to)?;

        let feeds = self.store.load_range(from, to).await?;
        Ok(self.finish(feeds))
    }

    /// Decimated feeds with `tstamp > from`
    pub async fn latest_since(&self, from: i64) -> Result<Vec<Feed>, QueryError> {
        let from = check_bound("from", from)?;

        let feeds = self.store.load_since(from).await?;
        Ok(self.finish(feeds))
    }

    fn finish(&self, feeds: Vec<Feed>) -> Vec<Feed> {
        let decimated = decimate(&feeds, self.window);
        metrics::counter!("queries_served_total").increment(1);
        debug!("Query matched {} feeds, {} after decimation", feeds.len(), decimated.len());
        decimated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::{MemoryStore, Reading};

    fn service(window_ms: i64) -> (Arc<MemoryStore>, QueryService) {
        let store = Arc::new(MemoryStore::new());
        let service = QueryService::new(store.clone(), Window::new(window_ms).unwrap());
        (store, service)
    }

    #[test]
    fn test_parse_bound() {
        assert_eq!(parse_bound("from", Some("1700000000000")).unwrap(), 1_700_000_000_000);
        assert_eq!(parse_bound("from", Some("0")).unwrap(), 0);
        assert!(matches!(
            parse_bound("from", None),
            Err(QueryError::MissingBound("from"))
        ));
        assert!(matches!(
            parse_bound("to", Some("yesterday")),
            Err(QueryError::InvalidBound { name: "to", .. })
        ));
        assert!(matches!(
            parse_bound("to", Some("1.5")),
            Err(QueryError::InvalidBound { .. })
        ));
        assert!(matches!(
            parse_bound("from", Some("-1")),
            Err(QueryError::NegativeBound { value: -1, .. })
        ));
    }

    #[tokio::test]
    async fn test_negative_bounds_rejected() {
        let (_store, service) = service(1000);
        assert!(matches!(
            service.range(-5, 10).await,
            Err(QueryError::NegativeBound { name: "from", .. })
        ));
        assert!(matches!(
            service.latest_since(-1).await,
            Err(QueryError::NegativeBound { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_range() {
        let (store, service) = service(1000);
        let feed = store.store(Reading::new("a", 1.0, 1.0)).await.unwrap();

        assert!(service.range(feed.tstamp, feed.tstamp).await.unwrap().is_empty());
        assert!(service.range(0, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_range_round_trip() {
        let (store, service) = service(1);
        let feed = store.store(Reading::new("roof", 12.5, 48.0)).await.unwrap();

        let out = service.range(feed.tstamp - 1, feed.tstamp + 1).await.unwrap();

        // A 1 ms window leaves every feed in its own bucket
        assert_eq!(out, vec![feed]);
    }

    #[tokio::test]
    async fn test_range_decimates_burst() {
        // Wide enough that every current timestamp rounds to tick 0
        let (store, service) = service(10_000_000_000_000);

        let mut station_a = Vec::new();
        for t in [10.0, 20.0, 30.0] {
            station_a.push(store.store(Reading::new("a", t, 50.0)).await.unwrap());
        }
        store.store(Reading::new("b", 5.0, 40.0)).await.unwrap();

        let out = service.latest_since(0).await.unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].station_id, "a");
        assert_eq!(out[0].id, station_a[0].id);
        assert_eq!(out[0].tstamp, 0);
        assert!((out[0].temperature - 20.0).abs() < 1e-9);
        assert!((out[0].humidity - 50.0).abs() < 1e-9);
        assert_eq!(out[1].station_id, "b");
        assert_eq!(out[1].temperature, 5.0);
        assert_eq!(out[1].humidity, 40.0);

        let ranged = service.range(0, i64::MAX).await.unwrap();
        assert_eq!(ranged, out);
    }

    #[tokio::test]
    async fn test_latest_since_excludes_cursor() {
        let (store, service) = service(1);
        let first = store.store(Reading::new("a", 1.0, 1.0)).await.unwrap();
        let second = store.store(Reading::new("a", 2.0, 2.0)).await.unwrap();

        let out = service.latest_since(first.tstamp).await.unwrap();
        assert_eq!(out, vec![second]);
    }
}
