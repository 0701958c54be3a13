//! The unit of export: one timestamped, tagged set of field values.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::PointError;
use crate::line;

/// A field value. Floats must be finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Boolean(v)
    }
}

/// A validated point. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    series: String,
    tags: HashMap<String, String>,
    fields: HashMap<String, FieldValue>,
    timestamp: SystemTime,
}

impl Point {
    /// Build a point, rejecting an empty series, an empty field set, empty
    /// keys, and non-finite floats.
    pub fn new(
        series: impl Into<String>,
        tags: HashMap<String, String>,
        fields: HashMap<String, FieldValue>,
        timestamp: SystemTime,
    ) -> Result<Self, PointError> {
        let series = series.into();
        if series.is_empty() {
            return Err(PointError::EmptySeries);
        }
        if fields.is_empty() {
            return Err(PointError::NoFields);
        }
        if tags.keys().any(|k| k.is_empty()) {
            return Err(PointError::EmptyTagKey);
        }
        for (key, value) in &fields {
            if key.is_empty() {
                return Err(PointError::EmptyFieldKey);
            }
            if let FieldValue::Float(f) = value {
                if !f.is_finite() {
                    return Err(PointError::NonFiniteField {
                        key: key.clone(),
                        value: *f,
                    });
                }
            }
        }

        Ok(Self {
            series,
            tags,
            fields,
            timestamp,
        })
    }

    pub fn series(&self) -> &str {
        &self.series
    }

    pub fn tags(&self) -> &HashMap<String, String> {
        &self.tags
    }

    pub fn fields(&self) -> &HashMap<String, FieldValue> {
        &self.fields
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// Nanoseconds since the Unix epoch; negative before it.
    pub fn unix_nanos(&self) -> i128 {
        match self.timestamp.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_nanos() as i128,
            Err(e) => -(e.duration().as_nanos() as i128),
        }
    }

    /// Encode as one line of line protocol (no trailing newline) with the
    /// given integer timestamp.
    pub fn to_line(&self, timestamp: i128) -> String {
        let mut out = String::with_capacity(64);
        line::write_point(&mut out, self, timestamp);
        out
    }
}
