//! Ingestion service

use data_validator::{ValidationError, Validator};
use std::sync::Arc;
use storage::{Feed, Reading, ReadingStore, StorageError};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Validates readings and appends them to the store
pub struct IngestionService {
    store: Arc<dyn ReadingStore>,
    validator: Validator,
}

impl IngestionService {
    pub fn new(store: Arc<dyn ReadingStore>, validator: Validator) -> Self {
        Self { store, validator }
    }

    /// Store one reading. The returned feed is already durable.
    pub async fn submit(&self, reading: Reading) -> Result<Feed, IngestError> {
        if let Err(err) = self.validator.validate(&reading) {
            return Err(self.reject(err));
        }

        let feed = self.store.store(reading).await?;
        metrics::counter!("readings_accepted_total").increment(1);
        info!(
            id = feed.id,
            station = %feed.station_id,
            tstamp = feed.tstamp,
            "Reading accepted"
        );

        Ok(feed)
    }

    /// Parse a raw JSON request body and store it
    pub async fn submit_json(&self, body: &[u8]) -> Result<Feed, IngestError> {
        let reading = self.validator.parse(body).map_err(|err| self.reject(err))?;
        self.submit(reading).await
    }

    fn reject(&self, err: ValidationError) -> IngestError {
        metrics::counter!("readings_rejected_total").increment(1);
        warn!("Reading rejected: {}", err);
        IngestError::Validation(err)
    }
}
