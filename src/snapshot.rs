//! The read-only view of a registry that a reporter consumes. A snapshot holds
//! plain readings rather than live instruments so a report cycle always sees a
//! single consistent set of values.

use std::collections::BTreeMap;

use crate::{config::MetricFilter, metrics::MetricKind};

/// The current value of a gauge. Anything that isn't a number ends up in
/// [`GaugeValue::Other`] and is rejected when the point is built.
#[derive(Debug, Clone, PartialEq)]
pub enum GaugeValue {
    Integer(i64),
    Float(f64),
    Other(String),
}

impl From<i64> for GaugeValue {
    fn from(value: i64) -> Self {
        GaugeValue::Integer(value)
    }
}

impl From<i32> for GaugeValue {
    fn from(value: i32) -> Self {
        GaugeValue::Integer(value.into())
    }
}

impl From<u64> for GaugeValue {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(v) => GaugeValue::Integer(v),
            Err(_) => GaugeValue::Float(value as f64),
        }
    }
}

impl From<f64> for GaugeValue {
    fn from(value: f64) -> Self {
        GaugeValue::Float(value)
    }
}

impl From<String> for GaugeValue {
    fn from(value: String) -> Self {
        GaugeValue::Other(value)
    }
}

impl From<&str> for GaugeValue {
    fn from(value: &str) -> Self {
        GaugeValue::Other(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterReading {
    pub count: i64,
}

/// Summary statistics over the samples currently held in a reservoir.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Statistics {
    /// Number of samples the summary was computed over.
    pub size: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub stddev: f64,
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
    pub p98: f64,
    pub p99: f64,
    pub p999: f64,
}

impl Statistics {
    /// Summarise `values`. The slice is sorted in place. An empty slice
    /// produces all zeroes.
    pub fn from_values(values: &mut [f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        values.sort_unstable_by(f64::total_cmp);
        let size = values.len();
        let mean = values.iter().sum::<f64>() / size as f64;
        // Sample standard deviation, a single sample has none.
        let stddev = if size > 1 {
            let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (sum_sq / (size - 1) as f64).sqrt()
        } else {
            0.0
        };
        Self {
            size,
            min: values[0],
            max: values[size - 1],
            mean,
            stddev,
            p50: quantile(values, 0.5),
            p75: quantile(values, 0.75),
            p95: quantile(values, 0.95),
            p98: quantile(values, 0.98),
            p99: quantile(values, 0.99),
            p999: quantile(values, 0.999),
        }
    }
}

/// Linear interpolation between the two closest ranks, using the (n + 1)
/// position estimate.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let pos = q * (sorted.len() + 1) as f64;
    let index = pos.floor() as usize;
    if index < 1 {
        return sorted[0];
    }
    if index >= sorted.len() {
        return sorted[sorted.len() - 1];
    }
    let lower = sorted[index - 1];
    let upper = sorted[index];
    lower + (pos - pos.floor()) * (upper - lower)
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HistogramReading {
    /// Number of values ever recorded, not just the ones still held.
    pub count: u64,
    pub stats: Statistics,
}

/// Meter rates are always in events per second, the reporter converts them to
/// its configured rate unit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MeterReading {
    pub count: u64,
    pub m1_rate: f64,
    pub m5_rate: f64,
    pub m15_rate: f64,
    pub mean_rate: f64,
}

/// A timer is a meter plus a histogram of durations. `stats` is in
/// nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimerReading {
    pub meter: MeterReading,
    pub stats: Statistics,
}

/// Readings for every instrument in a registry at one point in time. Each map
/// is optional, a missing map is the same as an empty one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrySnapshot {
    pub gauges: Option<BTreeMap<String, GaugeValue>>,
    pub counters: Option<BTreeMap<String, CounterReading>>,
    pub histograms: Option<BTreeMap<String, HistogramReading>>,
    pub meters: Option<BTreeMap<String, MeterReading>>,
    pub timers: Option<BTreeMap<String, TimerReading>>,
}

impl RegistrySnapshot {
    /// Drop every reading the filter rejects.
    pub fn retain(&mut self, filter: &MetricFilter) {
        fn retain_kind<V>(
            map: &mut Option<BTreeMap<String, V>>,
            kind: MetricKind,
            filter: &MetricFilter,
        ) {
            if let Some(map) = map {
                map.retain(|name, _| filter.matches(name, kind));
            }
        }
        retain_kind(&mut self.gauges, MetricKind::Gauge, filter);
        retain_kind(&mut self.counters, MetricKind::Counter, filter);
        retain_kind(&mut self.histograms, MetricKind::Histogram, filter);
        retain_kind(&mut self.meters, MetricKind::Meter, filter);
        retain_kind(&mut self.timers, MetricKind::Timer, filter);
    }

    /// Total number of readings across all five maps.
    pub fn len(&self) -> usize {
        self.gauges.as_ref().map_or(0, BTreeMap::len)
            + self.counters.as_ref().map_or(0, BTreeMap::len)
            + self.histograms.as_ref().map_or(0, BTreeMap::len)
            + self.meters.as_ref().map_or(0, BTreeMap::len)
            + self.timers.as_ref().map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
