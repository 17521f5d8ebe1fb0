use std::{
    any::Any,
    sync::{atomic, Arc},
};

use super::{MetricKind, MetricValue};
use crate::snapshot::CounterReading;

/// A cumulative counter. Unlike a meter it can go down, and reading it never
/// resets the count.
#[derive(Clone, Default, Debug)]
pub struct Counter {
    inner: Arc<atomic::AtomicI64>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr_by(&self, count: i64) {
        self.inner.fetch_add(count, atomic::Ordering::Relaxed);
    }

    pub fn incr(&self) {
        self.incr_by(1);
    }

    pub fn decr_by(&self, count: i64) {
        self.inner.fetch_sub(count, atomic::Ordering::Relaxed);
    }

    pub fn decr(&self) {
        self.decr_by(1);
    }

    pub fn count(&self) -> i64 {
        self.inner.load(atomic::Ordering::Relaxed)
    }
}

impl super::Metric for Counter {
    const KIND: MetricKind = MetricKind::Counter;

    fn must() -> Self {
        Self::new()
    }
}

impl super::Recordable for Counter {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn kind(&self) -> MetricKind {
        MetricKind::Counter
    }

    fn value(&self) -> MetricValue {
        MetricValue::Counter(CounterReading {
            count: self.count(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::Counter;
    use crate::metrics::{MetricValue, Recordable};
    use crate::snapshot::CounterReading;

    #[test]
    fn count_is_cumulative() {
        let counter = Counter::new();
        counter.incr_by(100);
        assert_eq!(counter.count(), 100);
        counter.decr_by(50);
        counter.incr();
        counter.decr();
        assert_eq!(
            counter.value(),
            MetricValue::Counter(CounterReading { count: 50 })
        );
        // reading twice must not reset
        assert_eq!(counter.count(), 50);
    }

    #[test]
    fn clones_share_state() {
        let counter = Counter::new();
        let other = counter.clone();
        other.incr_by(3);
        assert_eq!(counter.count(), 3);
    }
}
