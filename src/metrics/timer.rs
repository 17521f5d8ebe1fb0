use std::{
    any::Any,
    time::{Duration, Instant},
};

use super::{histogram::Histogram, meter::Meter, MetricKind, MetricValue};
use crate::snapshot::TimerReading;

/// Measures how long something takes and how often it happens. Durations
/// are kept in nanoseconds.
#[derive(Clone, Default, Debug)]
pub struct Timer {
    meter: Meter,
    histogram: Histogram,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, duration: Duration) {
        self.histogram.record(duration.as_nanos() as f64);
        self.meter.mark(1);
    }

    /// Start timing. The elapsed time is recorded when the guard drops.
    pub fn time(&self) -> TimerGuard<'_> {
        TimerGuard {
            timer: self,
            start: Instant::now(),
        }
    }

    pub fn time_fn<T>(&self, f: impl FnOnce() -> T) -> T {
        let _guard = self.time();
        f()
    }

    pub fn count(&self) -> u64 {
        self.meter.count()
    }

    pub fn reading(&self) -> TimerReading {
        TimerReading {
            meter: self.meter.reading(),
            stats: self.histogram.reading().stats,
        }
    }
}

pub struct TimerGuard<'a> {
    timer: &'a Timer,
    start: Instant,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.timer.update(self.start.elapsed());
    }
}

impl super::Metric for Timer {
    const KIND: MetricKind = MetricKind::Timer;

    fn must() -> Self {
        Self::new()
    }
}

impl super::Recordable for Timer {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn kind(&self) -> MetricKind {
        MetricKind::Timer
    }

    fn value(&self) -> MetricValue {
        MetricValue::Timer(self.reading())
    }
}
