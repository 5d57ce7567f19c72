//! Reading Validator

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use storage::Reading;

/// Validation configuration.
///
/// Ranges are inclusive `(min, max)` pairs. `None` disables the check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Temperature valid range (°C)
    #[serde(default)]
    pub temperature_range: Option<(f64, f64)>,
    /// Relative humidity valid range (%)
    #[serde(default)]
    pub humidity_range: Option<(f64, f64)>,
}

impl ValidationConfig {
    /// Bounds that cover any plausible outdoor station
    pub fn physical() -> Self {
        Self {
            temperature_range: Some((-90.0, 60.0)),
            humidity_range: Some((0.0, 100.0)),
        }
    }
}

/// Validator for station readings
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate a single value against a range
    pub fn validate_range(
        &self,
        field: &'static str,
        value: f64,
        range: (f64, f64),
    ) -> Result<(), ValidationError> {
        if value < range.0 || value > range.1 {
            Err(ValidationError::OutOfRange {
                field,
                value,
                min: range.0,
                max: range.1,
            })
        } else {
            Ok(())
        }
    }

    fn validate_measurement(
        &self,
        field: &'static str,
        value: f64,
        range: Option<(f64, f64)>,
    ) -> Result<(), ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NotFinite { field });
        }
        match range {
            Some(range) => self.validate_range(field, value, range),
            None => Ok(()),
        }
    }

    /// Check a reading that is already typed
    pub fn validate(&self, reading: &Reading) -> Result<(), ValidationError> {
        if reading.station_id.trim().is_empty() {
            return Err(ValidationError::BlankField("stationId"));
        }
        self.validate_measurement("temperature", reading.temperature, self.config.temperature_range)?;
        self.validate_measurement("humidity", reading.humidity, self.config.humidity_range)?;
        Ok(())
    }

    /// Parse a raw JSON body into a reading and validate it.
    ///
    /// Unknown fields are ignored.
    pub fn parse(&self, body: &[u8]) -> Result<Reading, ValidationError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ValidationError::InvalidFormat(e.to_string()))?;

        let object = value
            .as_object()
            .ok_or_else(|| ValidationError::InvalidFormat("expected a JSON object".to_string()))?;

        let station_id = match object.get("stationId") {
            None | Some(Value::Null) => return Err(ValidationError::MissingField("stationId")),
            Some(Value::String(s)) => s.clone(),
            Some(_) => {
                return Err(ValidationError::WrongType {
                    field: "stationId",
                    expected: "string",
                })
            }
        };

        let reading = Reading {
            station_id,
            temperature: number_field(object, "temperature")?,
            humidity: number_field(object, "humidity")?,
        };

        self.validate(&reading)?;
        Ok(reading)
    }
}

fn number_field(object: &Map<String, Value>, field: &'static str) -> Result<f64, ValidationError> {
    match object.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingField(field)),
        Some(Value::Number(n)) => n.as_f64().ok_or(ValidationError::NotFinite { field }),
        Some(_) => Err(ValidationError::WrongType {
            field,
            expected: "number",
        }),
    }
}
