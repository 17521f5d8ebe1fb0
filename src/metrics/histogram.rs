use std::{any::Any, collections::VecDeque, sync::Arc, time::Duration};

use parking_lot::Mutex;

use super::{MetricKind, MetricValue};
use crate::snapshot::{HistogramReading, Statistics};

/// Number of samples kept when no window is given.
pub const DEFAULT_WINDOW: usize = 1028;

/// The reservoir is a sliding window over the most recent samples. The
/// lifetime count is tracked separately so it keeps growing after the window
/// fills up.
#[derive(Debug)]
struct HistogramInner {
    count: u64,
    window: usize,
    samples: VecDeque<f64>,
}

impl Default for HistogramInner {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl HistogramInner {
    fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            count: 0,
            window,
            samples: VecDeque::with_capacity(window),
        }
    }

    fn record(&mut self, value: f64) {
        self.count += 1;
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    fn reading(&self) -> HistogramReading {
        let mut values: Vec<f64> = self.samples.iter().copied().collect();
        HistogramReading {
            count: self.count,
            stats: Statistics::from_values(&mut values),
        }
    }
}

/// A threadsafe histogram summarising the distribution of recent values.
#[derive(Default, Clone, Debug)]
pub struct Histogram {
    inner: Arc<Mutex<HistogramInner>>,
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// A histogram that keeps the last `window` samples. A window of zero is
    /// treated as one.
    pub fn with_window(window: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HistogramInner::new(window))),
        }
    }

    pub fn record(&self, value: f64) {
        self.inner.lock().record(value);
    }

    pub fn record_duration_ms(&self, value: Duration) {
        self.inner.lock().record(value.as_millis() as f64)
    }

    pub fn count(&self) -> u64 {
        self.inner.lock().count
    }

    pub fn reading(&self) -> HistogramReading {
        self.inner.lock().reading()
    }
}

impl super::Metric for Histogram {
    const KIND: MetricKind = MetricKind::Histogram;

    fn must() -> Self {
        Self::new()
    }
}

impl super::Recordable for Histogram {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn kind(&self) -> MetricKind {
        MetricKind::Histogram
    }

    fn value(&self) -> MetricValue {
        let reading = self.reading();
        tracing::trace!(message="histogram.value", count=reading.count, size=reading.stats.size, mean=reading.stats.mean);
        MetricValue::Histogram(reading)
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::Histogram;

    #[test]
    fn mean_of_two_samples() {
        let hist = Histogram::default();
        hist.record(100.0);
        hist.record(50.0);
        let reading = hist.reading();
        assert_eq!(reading.count, 2);
        assert_eq!(reading.stats.size, 2);
        assert_eq!(reading.stats.mean, 75.0);

        let hist = Histogram::default();
        hist.record(200.0);
        hist.record(250.0);
        assert_eq!(hist.reading().stats.mean, 225.0);
    }

    #[test]
    fn window_evicts_oldest() {
        let hist = Histogram::with_window(3);
        for i in 1..=5 {
            hist.record(i as f64);
        }
        let reading = hist.reading();
        assert_eq!(reading.count, 5);
        assert_eq!(reading.stats.size, 3);
        assert_eq!(reading.stats.min, 3.0);
        assert_eq!(reading.stats.max, 5.0);
    }

    #[test]
    fn zero_window_keeps_one_sample() {
        let hist = Histogram::with_window(0);
        hist.record(1.0);
        hist.record(2.0);
        assert_eq!(hist.reading().stats.size, 1);
        assert_eq!(hist.reading().stats.max, 2.0);
    }

    #[test]
    fn durations_in_millis() {
        let hist = Histogram::new();
        hist.record_duration_ms(Duration::from_micros(2_500));
        assert_eq!(hist.reading().stats.max, 2.0);
        assert_eq!(hist.count(), 1);
    }

    #[test]
    fn increments() {
        let hist = Histogram::default();
        for i in 0..20_000 {
            hist.record(i as f64);
        }
        let reading = hist.reading();
        assert_eq!(reading.count, 20_000);
        assert_eq!(reading.stats.size, super::DEFAULT_WINDOW);
        assert_eq!(reading.stats.max, 19_999.0);
    }
}
