use std::{
    any::Any,
    fmt,
    sync::{atomic, Arc},
};

use super::{MetricKind, MetricValue};
use crate::snapshot::GaugeValue;

/// A gauge holding an integer that is set directly.
#[derive(Clone, Default, Debug)]
pub struct Gauge {
    inner: Arc<atomic::AtomicI64>,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr_by(&self, count: i64) {
        self.inner.fetch_add(count, atomic::Ordering::Relaxed);
    }

    pub fn incr(&self) {
        self.incr_by(1);
    }

    pub fn set(&self, val: i64) {
        self.inner.store(val, atomic::Ordering::Relaxed)
    }

    pub fn decr(&self) {
        self.incr_by(-1)
    }

    pub fn get(&self) -> i64 {
        self.inner.load(atomic::Ordering::Relaxed)
    }
}

impl super::Metric for Gauge {
    const KIND: MetricKind = MetricKind::Gauge;

    fn must() -> Self {
        Self::new()
    }
}

impl super::Recordable for Gauge {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn kind(&self) -> MetricKind {
        MetricKind::Gauge
    }

    fn value(&self) -> MetricValue {
        MetricValue::Gauge(GaugeValue::Integer(self.get()))
    }
}

/// A gauge whose value is computed by a callback every time it is read.
#[derive(Clone)]
pub struct FnGauge {
    f: Arc<dyn Fn() -> GaugeValue + Send + Sync>,
}

impl FnGauge {
    pub fn new<F, V>(f: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
        V: Into<GaugeValue>,
    {
        Self {
            f: Arc::new(move || f().into()),
        }
    }

    pub fn get(&self) -> GaugeValue {
        (self.f)()
    }
}

impl fmt::Debug for FnGauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnGauge").finish_non_exhaustive()
    }
}

impl super::Recordable for FnGauge {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn kind(&self) -> MetricKind {
        MetricKind::Gauge
    }

    fn value(&self) -> MetricValue {
        MetricValue::Gauge(self.get())
    }
}
