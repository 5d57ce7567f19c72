//! Reading and feed records

use serde::{Deserialize, Serialize};

/// A raw station reading as submitted. The server assigns the timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub station_id: String,
    pub temperature: f64,
    pub humidity: f64,
}

impl Reading {
    pub fn new(station_id: impl Into<String>, temperature: f64, humidity: f64) -> Self {
        Self {
            station_id: station_id.into(),
            temperature,
            humidity,
        }
    }
}

/// A persisted reading with its store-assigned id and timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    pub id: i64,
    pub station_id: String,
    /// Epoch milliseconds
    pub tstamp: i64,
    pub humidity: f64,
    pub temperature: f64,
}

impl Feed {
    pub(crate) fn from_reading(id: i64, tstamp: i64, reading: Reading) -> Self {
        Self {
            id,
            station_id: reading.station_id,
            tstamp,
            humidity: reading.humidity,
            temperature: reading.temperature,
        }
    }
}
