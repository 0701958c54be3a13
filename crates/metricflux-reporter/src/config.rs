//! Reporter configuration.
//!
//! Built once at startup and never mutated afterwards. Can be written by
//! hand or loaded from TOML:
//!
//! ```toml
//! url = "http://localhost:8086"
//! database = "metrics"
//! measurement = "app"
//! interval = "10s"
//! align = true
//!
//! [tags]
//! host = "web-1"
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ReporterError, ReporterResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReporterConfig {
    /// Destination; `http://` selects HTTP, any other scheme UDP.
    pub url: String,
    pub database: String,
    /// Series every point is written to.
    pub measurement: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Reporting period, e.g. "10s", "500ms", "1m".
    #[serde(with = "duration_str")]
    pub interval: Duration,
    /// Truncate point timestamps down to a multiple of `interval`.
    #[serde(default)]
    pub align: bool,
    /// Base tags attached to every point.
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl ReporterConfig {
    pub fn new(
        url: impl Into<String>,
        database: impl Into<String>,
        measurement: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            measurement: measurement.into(),
            username: String::new(),
            password: String::new(),
            interval,
            align: false,
            tags: HashMap::new(),
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_tags(mut self, tags: HashMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_align(mut self, align: bool) -> Self {
        self.align = align;
        self
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Parsed destination URL.
    pub fn destination(&self) -> ReporterResult<Url> {
        Url::parse(&self.url)
            .map_err(|e| ReporterError::Config(format!("unable to parse url {}: {e}", self.url)))
    }

    /// Reject settings the reporter cannot start with.
    pub fn validate(&self) -> ReporterResult<()> {
        if self.interval.is_zero() {
            return Err(ReporterError::Config("interval must be greater than zero".to_string()));
        }
        self.destination()?;
        Ok(())
    }
}

/// Parse a duration string like "5s", "500ms", "1m". A bare number is seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.trim().parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.trim().parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.trim().parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

fn format_duration(d: Duration) -> String {
    if d.subsec_nanos() == 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{}ms", d.as_millis())
    }
}

mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_duration(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid duration: {raw}")))
    }
}
