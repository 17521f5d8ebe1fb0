//! Turns registry snapshots into points. Each instrument kind has its own
//! function producing one point per named instrument; the measurement is the
//! instrument's registered name and the reporter's tags are attached to
//! every point.
//!
//! Instruments of different kinds that share a name end up in the same
//! measurement and are merged by the database.

use std::{collections::BTreeMap, sync::Arc};

use crate::{
    config::TimeUnit,
    error::Error,
    point::{FieldValue, Fields, Point, Tags},
    snapshot::{
        CounterReading, GaugeValue, HistogramReading, MeterReading, RegistrySnapshot, Statistics,
        TimerReading,
    },
};

/// Conversion applied to rate and duration fields. Readings carry rates in
/// events per second and durations in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Units {
    rate_secs: f64,
    duration_nanos: f64,
}

impl Units {
    pub fn new(rate_unit: TimeUnit, duration_unit: TimeUnit) -> Self {
        Self {
            rate_secs: rate_unit.as_secs(),
            duration_nanos: duration_unit.as_nanos(),
        }
    }

    pub fn convert_rate(&self, per_second: f64) -> f64 {
        per_second * self.rate_secs
    }

    pub fn convert_duration(&self, nanos: f64) -> f64 {
        nanos / self.duration_nanos
    }
}

impl Default for Units {
    fn default() -> Self {
        Self::new(TimeUnit::Seconds, TimeUnit::Milliseconds)
    }
}

pub fn gauge_point(
    name: &str,
    value: &GaugeValue,
    timestamp: i64,
    tags: &Arc<Tags>,
) -> Result<Point, Error> {
    let value = match value {
        GaugeValue::Integer(v) => FieldValue::Integer(*v),
        GaugeValue::Float(v) => FieldValue::Float(*v),
        GaugeValue::Other(v) => {
            return Err(Error::translation(
                name,
                format!("gauge value {v:?} is not numeric"),
            ))
        }
    };
    let mut fields = Fields::new();
    fields.push(("value", value));
    Point::new(name, timestamp, fields, tags.clone())
}

pub fn counter_point(
    name: &str,
    reading: &CounterReading,
    timestamp: i64,
    tags: &Arc<Tags>,
) -> Result<Point, Error> {
    let mut fields = Fields::new();
    fields.push(("count", reading.count.into()));
    Point::new(name, timestamp, fields, tags.clone())
}

pub fn histogram_point(
    name: &str,
    reading: &HistogramReading,
    timestamp: i64,
    tags: &Arc<Tags>,
) -> Result<Point, Error> {
    let mut fields = Fields::new();
    fields.push(("count", reading.count.into()));
    push_stats(&mut fields, &reading.stats, |v| v);
    Point::new(name, timestamp, fields, tags.clone())
}

pub fn meter_point(
    name: &str,
    reading: &MeterReading,
    timestamp: i64,
    tags: &Arc<Tags>,
    units: &Units,
) -> Result<Point, Error> {
    let mut fields = Fields::new();
    push_rates(&mut fields, reading, units);
    Point::new(name, timestamp, fields, tags.clone())
}

pub fn timer_point(
    name: &str,
    reading: &TimerReading,
    timestamp: i64,
    tags: &Arc<Tags>,
    units: &Units,
) -> Result<Point, Error> {
    let mut fields = Fields::new();
    push_rates(&mut fields, &reading.meter, units);
    push_stats(&mut fields, &reading.stats, |v| units.convert_duration(v));
    Point::new(name, timestamp, fields, tags.clone())
}

fn push_rates(fields: &mut Fields, reading: &MeterReading, units: &Units) {
    fields.push(("count", reading.count.into()));
    fields.push(("m1_rate", units.convert_rate(reading.m1_rate).into()));
    fields.push(("m5_rate", units.convert_rate(reading.m5_rate).into()));
    fields.push(("m15_rate", units.convert_rate(reading.m15_rate).into()));
    fields.push(("mean_rate", units.convert_rate(reading.mean_rate).into()));
}

fn push_stats(fields: &mut Fields, stats: &Statistics, convert: impl Fn(f64) -> f64) {
    fields.push(("size", stats.size.into()));
    fields.push(("max", convert(stats.max).into()));
    fields.push(("mean", convert(stats.mean).into()));
    fields.push(("min", convert(stats.min).into()));
    fields.push(("stddev", convert(stats.stddev).into()));
    fields.push(("p50", convert(stats.p50).into()));
    fields.push(("p75", convert(stats.p75).into()));
    fields.push(("p95", convert(stats.p95).into()));
    fields.push(("p98", convert(stats.p98).into()));
    fields.push(("p99", convert(stats.p99).into()));
    fields.push(("p999", convert(stats.p999).into()));
}

/// Translate every reading in `snapshot`, all stamped with `timestamp`.
/// Readings that can't be turned into a point are logged and skipped, the
/// rest of the snapshot is still translated.
pub fn translate(
    snapshot: &RegistrySnapshot,
    timestamp: i64,
    tags: &Arc<Tags>,
    units: &Units,
) -> Vec<Point> {
    let mut points = Vec::with_capacity(snapshot.len());
    translate_kind(&mut points, &snapshot.gauges, |name, v| {
        gauge_point(name, v, timestamp, tags)
    });
    translate_kind(&mut points, &snapshot.counters, |name, v| {
        counter_point(name, v, timestamp, tags)
    });
    translate_kind(&mut points, &snapshot.histograms, |name, v| {
        histogram_point(name, v, timestamp, tags)
    });
    translate_kind(&mut points, &snapshot.meters, |name, v| {
        meter_point(name, v, timestamp, tags, units)
    });
    translate_kind(&mut points, &snapshot.timers, |name, v| {
        timer_point(name, v, timestamp, tags, units)
    });
    points
}

fn translate_kind<V>(
    points: &mut Vec<Point>,
    readings: &Option<BTreeMap<String, V>>,
    to_point: impl Fn(&str, &V) -> Result<Point, Error>,
) {
    let Some(readings) = readings else {
        return;
    };
    for (name, reading) in readings {
        match to_point(name, reading) {
            Ok(point) => points.push(point),
            Err(e) => tracing::warn!(message = "skipping metric", error = %e),
        }
    }
}
