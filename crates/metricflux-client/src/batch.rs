//! A batch of points bound for one database.

use std::fmt;
use std::str::FromStr;

use crate::error::ClientError;
use crate::point::Point;

/// Timestamp precision of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    #[default]
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
}

impl Precision {
    /// Query-string form accepted by the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Nanoseconds => "ns",
            Precision::Microseconds => "u",
            Precision::Milliseconds => "ms",
            Precision::Seconds => "s",
            Precision::Minutes => "m",
            Precision::Hours => "h",
        }
    }

    /// Length of one unit in nanoseconds.
    pub fn unit_nanos(&self) -> i128 {
        match self {
            Precision::Nanoseconds => 1,
            Precision::Microseconds => 1_000,
            Precision::Milliseconds => 1_000_000,
            Precision::Seconds => 1_000_000_000,
            Precision::Minutes => 60_000_000_000,
            Precision::Hours => 3_600_000_000_000,
        }
    }

    /// Whole units contained in `nanos`, rounding toward negative infinity.
    pub fn truncate(&self, nanos: i128) -> i128 {
        nanos.div_euclid(self.unit_nanos())
    }

    /// `nanos` rounded to the nearest unit, halves rounding up. Stays in nanoseconds.
    pub fn round(&self, nanos: i128) -> i128 {
        let unit = self.unit_nanos();
        let rem = nanos.rem_euclid(unit);
        if rem * 2 >= unit {
            nanos - rem + unit
        } else {
            nanos - rem
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Precision {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "n" | "ns" => Ok(Precision::Nanoseconds),
            "u" | "us" => Ok(Precision::Microseconds),
            "ms" => Ok(Precision::Milliseconds),
            "s" => Ok(Precision::Seconds),
            "m" => Ok(Precision::Minutes),
            "h" => Ok(Precision::Hours),
            other => Err(ClientError::UnknownPrecision(other.to_string())),
        }
    }
}

/// Points plus the write parameters that apply to all of them.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPoints {
    database: String,
    precision: Precision,
    retention_policy: Option<String>,
    points: Vec<Point>,
}

impl BatchPoints {
    pub fn new(database: impl Into<String>, precision: Precision) -> Self {
        Self {
            database: database.into(),
            precision,
            retention_policy: None,
            points: Vec::new(),
        }
    }

    pub fn with_retention_policy(mut self, rp: impl Into<String>) -> Self {
        self.retention_policy = Some(rp.into());
        self
    }

    pub fn add_point(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn add_points(&mut self, points: impl IntoIterator<Item = Point>) {
        self.points.extend(points);
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn retention_policy(&self) -> Option<&str> {
        self.retention_policy.as_deref()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Newline-terminated line protocol with timestamps in precision units.
    pub fn to_line_protocol(&self) -> String {
        let mut out = String::with_capacity(self.points.len() * 64);
        for point in &self.points {
            let ts = self.precision.truncate(point.unix_nanos());
            out.push_str(&point.to_line(ts));
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::FieldValue;
    use std::collections::HashMap;
    use std::time::{Duration, UNIX_EPOCH};

    fn point_at(nanos: u64) -> Point {
        Point::new(
            "app",
            HashMap::new(),
            HashMap::from([("x".to_string(), FieldValue::Integer(1))]),
            UNIX_EPOCH + Duration::from_nanos(nanos),
        )
        .unwrap()
    }

    #[test]
    fn precision_parses_known_units() {
        assert_eq!("s".parse::<Precision>().unwrap(), Precision::Seconds);
        assert_eq!("ms".parse::<Precision>().unwrap(), Precision::Milliseconds);
        assert_eq!("".parse::<Precision>().unwrap(), Precision::Nanoseconds);
        assert!(matches!(
            "fortnight".parse::<Precision>(),
            Err(ClientError::UnknownPrecision(_))
        ));
    }

    #[test]
    fn precision_round_trips_through_display() {
        for p in [
            Precision::Nanoseconds,
            Precision::Microseconds,
            Precision::Milliseconds,
            Precision::Seconds,
            Precision::Minutes,
            Precision::Hours,
        ] {
            assert_eq!(p.to_string().parse::<Precision>().unwrap(), p);
        }
    }

    #[test]
    fn truncate_and_round() {
        let s = Precision::Seconds;
        assert_eq!(s.truncate(1_999_999_999), 1);
        assert_eq!(s.round(1_499_999_999), 1_000_000_000);
        assert_eq!(s.round(1_500_000_000), 2_000_000_000);
        assert_eq!(s.truncate(-1), -1);
    }

    #[test]
    fn line_protocol_uses_batch_precision() {
        let mut batch = BatchPoints::new("metrics", Precision::Seconds);
        batch.add_point(point_at(1_700_000_000_900_000_000));
        batch.add_point(point_at(5_000_000_000));
        assert_eq!(
            batch.to_line_protocol(),
            "app x=1i 1700000000\napp x=1i 5\n"
        );
    }

    #[test]
    fn batch_accessors() {
        let mut batch = BatchPoints::new("db", Precision::Seconds).with_retention_policy("weekly");
        assert!(batch.is_empty());
        batch.add_points(vec![point_at(0), point_at(1)]);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.database(), "db");
        assert_eq!(batch.retention_policy(), Some("weekly"));
        assert_eq!(batch.precision(), Precision::Seconds);
    }
}
