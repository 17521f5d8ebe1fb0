use std::{collections::BTreeMap, sync::Arc};

use influxdb_line_protocol::LineProtocolBuilder;
use smallvec::SmallVec;

use crate::error::{Error, TransportError};

pub type Tags = BTreeMap<String, String>;

/// Fields in the order they were added. Timers have the most, at 16.
pub type Fields = SmallVec<[(&'static str, FieldValue); 16]>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
}

impl FieldValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            FieldValue::Integer(v) => *v as f64,
            FieldValue::Float(v) => *v,
        }
    }

    fn is_finite(&self) -> bool {
        match self {
            FieldValue::Integer(_) => true,
            FieldValue::Float(v) => v.is_finite(),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<usize> for FieldValue {
    fn from(value: usize) -> Self {
        FieldValue::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

/// A single row destined for the database.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    measurement: String,
    /// Milliseconds since the unix epoch.
    timestamp: i64,
    fields: Fields,
    tags: Arc<Tags>,
}

impl Point {
    /// Build a point, rejecting an empty measurement, no fields at all, or a
    /// field that isn't a finite number.
    pub fn new(
        measurement: &str,
        timestamp: i64,
        fields: Fields,
        tags: Arc<Tags>,
    ) -> Result<Self, Error> {
        if measurement.is_empty() {
            return Err(Error::translation(measurement, "empty measurement name"));
        }
        if fields.is_empty() {
            return Err(Error::translation(measurement, "no fields"));
        }
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(Error::translation(
                measurement,
                format!("field {name} is not finite: {value:?}"),
            ));
        }
        Ok(Self {
            measurement: measurement.to_string(),
            timestamp,
            fields,
            tags,
        })
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn fields(&self) -> &[(&'static str, FieldValue)] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<FieldValue> {
        self.fields
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Encode as a single newline terminated line of line protocol with a
    /// millisecond timestamp.
    pub fn to_line_protocol(&self) -> Result<Vec<u8>, TransportError> {
        let mut builder = LineProtocolBuilder::new().measurement(&self.measurement);
        for (key, value) in self.tags.iter() {
            builder = builder.tag(key, value);
        }

        // The first field moves the builder into its field state, so it is
        // handled on its own.
        let Some(((first_key, first_value), rest)) = self.fields.split_first() else {
            return Err(TransportError::Encode(format!(
                "point {:?} has no fields",
                self.measurement
            )));
        };
        let mut after_first_field = match first_value {
            FieldValue::Integer(v) => builder.field(first_key, *v),
            FieldValue::Float(v) => builder.field(first_key, *v),
        };
        for (key, value) in rest {
            after_first_field = match value {
                FieldValue::Integer(v) => after_first_field.field(key, *v),
                FieldValue::Float(v) => after_first_field.field(key, *v),
            };
        }
        Ok(after_first_field
            .timestamp(self.timestamp)
            .close_line()
            .build())
    }
}

/// InfluxDB write consistency levels.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Consistency {
    Any,
    One,
    Quorum,
    All,
}

impl Consistency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Consistency::Any => "any",
            Consistency::One => "one",
            Consistency::Quorum => "quorum",
            Consistency::All => "all",
        }
    }
}

/// Points sent to one database and retention policy in a single write.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub database: String,
    pub retention_policy: String,
    pub consistency: Consistency,
    points: Vec<Point>,
}

impl Batch {
    pub fn new(database: &str, retention_policy: &str, consistency: Consistency) -> Self {
        Self {
            database: database.to_string(),
            retention_policy: retention_policy.to_string(),
            consistency,
            points: Vec::new(),
        }
    }

    pub fn push(&mut self, point: Point) {
        self.points.push(point);
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

    /// One line per point, in order.
    pub fn to_line_protocol(&self) -> Result<Vec<u8>, TransportError> {
        let mut buf = Vec::new();
        for point in &self.points {
            buf.extend_from_slice(&point.to_line_protocol()?);
        }
        Ok(buf)
    }
}

impl Extend<Point> for Batch {
    fn extend<I: IntoIterator<Item = Point>>(&mut self, iter: I) {
        self.points.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use smallvec::smallvec;

    use super::*;

    fn tags() -> Arc<Tags> {
        Arc::new(BTreeMap::from([
            ("host".to_string(), "server1".to_string()),
            ("region".to_string(), "us-west".to_string()),
        ]))
    }

    #[test]
    fn encodes_tags_fields_and_timestamp() {
        let point = Point::new(
            "metrics.test.histograms.h1",
            1_609_459_200_000,
            smallvec![("count", 2i64.into()), ("mean", 75.5.into())],
            tags(),
        )
        .unwrap();
        let line = String::from_utf8(point.to_line_protocol().unwrap()).unwrap();
        assert!(line.starts_with("metrics.test.histograms.h1,host=server1,region=us-west "));
        assert!(line.contains("count=2i"));
        assert!(line.contains("mean=75.5"));
        assert!(line.ends_with(" 1609459200000\n"));
        // fields keep insertion order
        assert!(line.find("count=").unwrap() < line.find("mean=").unwrap());
    }

    #[test]
    fn encodes_without_tags() {
        let point = Point::new(
            "requests",
            1,
            smallvec![("value", 42.0.into())],
            Arc::default(),
        )
        .unwrap();
        let line = String::from_utf8(point.to_line_protocol().unwrap()).unwrap();
        assert!(line.starts_with("requests value=42"));
        assert!(!line.contains(','));
    }

    #[test]
    fn rejects_invalid_points() {
        let err = Point::new("", 1, smallvec![("value", 1i64.into())], Arc::default());
        assert!(matches!(err, Err(Error::Translation { .. })));
        let err = Point::new("empty", 1, Fields::new(), Arc::default());
        assert!(matches!(err, Err(Error::Translation { .. })));
        let err = Point::new("nan", 1, smallvec![("value", f64::NAN.into())], Arc::default());
        assert!(matches!(err, Err(Error::Translation { .. })));
    }

    #[test]
    fn batch_is_one_line_per_point() {
        let mut batch = Batch::new("metrics", "default", Consistency::All);
        assert!(batch.is_empty());
        batch.extend((0..3).map(|i| {
            Point::new("p", i, smallvec![("value", i.into())], Arc::default()).unwrap()
        }));
        batch.push(Point::new("q", 9, smallvec![("count", 1i64.into())], tags()).unwrap());
        assert_eq!(batch.len(), 4);
        let body = String::from_utf8(batch.to_line_protocol().unwrap()).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "p value=0i 0");
        assert!(lines[3].starts_with("q,host=server1"));
        assert_eq!(Consistency::All.as_str(), "all");
    }

    #[test]
    fn field_conversions() {
        assert_eq!(FieldValue::from(u64::MAX), FieldValue::Integer(i64::MAX));
        assert_eq!(FieldValue::from(3usize), FieldValue::Integer(3));
        assert_eq!(FieldValue::Integer(3).as_f64(), 3.0);
    }
}
