use parking_lot::RwLock;
use std::{
    collections::{btree_map::Entry, BTreeMap},
    sync::LazyLock,
};

use crate::{
    metrics::{
        counter::Counter, gauge::FnGauge, gauge::Gauge, histogram::Histogram, meter::Meter,
        timer::Timer, Metric, MetricKind, MetricValue, Recordable,
    },
    snapshot::{GaugeValue, RegistrySnapshot},
};

pub static DEFAULT_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Metrics are keyed by kind and name, so a counter and a timer may share a
/// name without clobbering each other.
type MetricKey = (MetricKind, String);

#[derive(Default)]
pub struct Registry {
    metrics: RwLock<BTreeMap<MetricKey, Box<dyn Recordable>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            metrics: Default::default(),
        }
    }

    /// Register is a fairly heavy weight operation. We expect that concrete metrics are cached at a higher
    /// level. Registering the same name and kind twice hands back a handle to the same metric.
    pub fn register<R: Recordable + Metric + Clone>(&self, name: &str) -> R {
        let mut metrics = self.metrics.write();
        match metrics.entry((R::KIND, name.to_string())) {
            Entry::Occupied(mut oe) => {
                if let Some(existing) = oe.get().as_any().downcast_ref::<R>() {
                    return existing.clone();
                }
                // Only gauges can get here, a FnGauge being replaced by a plain one.
                tracing::warn!(message="replacing metric of a different type", name=name, kind=R::KIND.as_str());
                let metric = R::must();
                oe.insert(Box::new(metric.clone()));
                metric
            }
            Entry::Vacant(ve) => {
                let metric = R::must();
                ve.insert(Box::new(metric.clone()));
                metric
            }
        }
    }

    /// Register a gauge computed by `f` on every snapshot. Any gauge already
    /// registered under `name` is replaced.
    pub fn register_gauge_fn<F, V>(&self, name: &str, f: F) -> FnGauge
    where
        F: Fn() -> V + Send + Sync + 'static,
        V: Into<GaugeValue>,
    {
        let gauge = FnGauge::new(f);
        self.metrics
            .write()
            .insert((MetricKind::Gauge, name.to_string()), Box::new(gauge.clone()));
        gauge
    }

    pub fn gauge(&self, name: &str) -> Gauge {
        self.register(name)
    }

    pub fn counter(&self, name: &str) -> Counter {
        self.register(name)
    }

    pub fn histogram(&self, name: &str) -> Histogram {
        self.register(name)
    }

    pub fn meter(&self, name: &str) -> Meter {
        self.register(name)
    }

    pub fn timer(&self, name: &str) -> Timer {
        self.register(name)
    }

    /// Returns true if a metric was removed.
    pub fn remove(&self, kind: MetricKind, name: &str) -> bool {
        self.metrics
            .write()
            .remove(&(kind, name.to_string()))
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.metrics.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.read().is_empty()
    }

    /// Read every registered metric. All five maps are present in the result,
    /// empty when nothing of that kind is registered.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let metrics = self.metrics.read();
        let mut gauges = BTreeMap::new();
        let mut counters = BTreeMap::new();
        let mut histograms = BTreeMap::new();
        let mut meters = BTreeMap::new();
        let mut timers = BTreeMap::new();
        for ((_, name), metric) in metrics.iter() {
            let name = name.clone();
            match metric.value() {
                MetricValue::Gauge(v) => {
                    gauges.insert(name, v);
                }
                MetricValue::Counter(v) => {
                    counters.insert(name, v);
                }
                MetricValue::Histogram(v) => {
                    histograms.insert(name, v);
                }
                MetricValue::Meter(v) => {
                    meters.insert(name, v);
                }
                MetricValue::Timer(v) => {
                    timers.insert(name, v);
                }
            }
        }
        tracing::trace!(message = "registry snapshot", metrics = metrics.len());
        RegistrySnapshot {
            gauges: Some(gauges),
            counters: Some(counters),
            histograms: Some(histograms),
            meters: Some(meters),
            timers: Some(timers),
        }
    }
}
