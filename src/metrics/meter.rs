use std::{
    any::Any,
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

use super::{MetricKind, MetricValue};
use crate::snapshot::MeterReading;

const TICK_INTERVAL: Duration = Duration::from_secs(5);

/// An exponentially weighted moving average, ticked every [`TICK_INTERVAL`].
/// The rate is kept in events per second.
#[derive(Debug)]
struct Ewma {
    alpha: f64,
    rate: f64,
    uncounted: u64,
    initialized: bool,
}

impl Ewma {
    fn over_minutes(minutes: f64) -> Self {
        let interval_minutes = TICK_INTERVAL.as_secs_f64() / 60.0;
        Self {
            alpha: 1.0 - (-interval_minutes / minutes).exp(),
            rate: 0.0,
            uncounted: 0,
            initialized: false,
        }
    }

    fn update(&mut self, n: u64) {
        self.uncounted += n;
    }

    fn tick(&mut self) {
        let instant_rate = self.uncounted as f64 / TICK_INTERVAL.as_secs_f64();
        self.uncounted = 0;
        if self.initialized {
            self.rate += self.alpha * (instant_rate - self.rate);
        } else {
            self.rate = instant_rate;
            self.initialized = true;
        }
    }
}

#[derive(Debug)]
struct MeterInner {
    count: u64,
    start: Instant,
    last_tick: Instant,
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
}

impl MeterInner {
    fn new(now: Instant) -> Self {
        Self {
            count: 0,
            start: now,
            last_tick: now,
            m1: Ewma::over_minutes(1.0),
            m5: Ewma::over_minutes(5.0),
            m15: Ewma::over_minutes(15.0),
        }
    }

    /// Catch the averages up with every whole tick interval that has passed.
    fn tick_if_necessary(&mut self, now: Instant) {
        let age = now.saturating_duration_since(self.last_tick);
        if age < TICK_INTERVAL {
            return;
        }
        let ticks = (age.as_nanos() / TICK_INTERVAL.as_nanos()) as u32;
        self.last_tick += TICK_INTERVAL * ticks;
        for _ in 0..ticks {
            self.m1.tick();
            self.m5.tick();
            self.m15.tick();
        }
    }

    fn mark(&mut self, n: u64, now: Instant) {
        self.tick_if_necessary(now);
        self.count += n;
        self.m1.update(n);
        self.m5.update(n);
        self.m15.update(n);
    }

    fn reading(&mut self, now: Instant) -> MeterReading {
        self.tick_if_necessary(now);
        let elapsed = now.saturating_duration_since(self.start).as_secs_f64();
        let mean_rate = if self.count == 0 || elapsed == 0.0 {
            0.0
        } else {
            self.count as f64 / elapsed
        };
        MeterReading {
            count: self.count,
            m1_rate: self.m1.rate,
            m5_rate: self.m5.rate,
            m15_rate: self.m15.rate,
            mean_rate,
        }
    }
}

/// Tracks how often something happens: a lifetime count, 1/5/15 minute
/// moving averages and the mean rate since creation.
#[derive(Clone, Debug)]
pub struct Meter {
    inner: Arc<Mutex<MeterInner>>,
}

impl Default for Meter {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MeterInner::new(Instant::now()))),
        }
    }
}

impl Meter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self, n: u64) {
        self.mark_at(n, Instant::now());
    }

    pub fn count(&self) -> u64 {
        self.inner.lock().count
    }

    pub fn reading(&self) -> MeterReading {
        self.reading_at(Instant::now())
    }

    pub(crate) fn mark_at(&self, n: u64, now: Instant) {
        self.inner.lock().mark(n, now);
    }

    pub(crate) fn reading_at(&self, now: Instant) -> MeterReading {
        self.inner.lock().reading(now)
    }

    #[cfg(test)]
    pub(crate) fn started_at(&self) -> Instant {
        self.inner.lock().start
    }
}

impl super::Metric for Meter {
    const KIND: MetricKind = MetricKind::Meter;

    fn must() -> Self {
        Self::new()
    }
}

impl super::Recordable for Meter {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn kind(&self) -> MetricKind {
        MetricKind::Meter
    }

    fn value(&self) -> MetricValue {
        MetricValue::Meter(self.reading())
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::{Ewma, Meter, TICK_INTERVAL};

    #[test]
    fn count_is_sum_of_marks() {
        let meter = Meter::new();
        meter.mark(100);
        meter.mark(50);
        assert_eq!(meter.count(), 150);
        meter.mark(200);
        meter.mark(250);
        let reading = meter.reading();
        assert_eq!(reading.count, 600);

        let fresh = Meter::new();
        fresh.mark(200);
        fresh.mark(250);
        assert_eq!(fresh.reading().count, 450);
        assert!(reading.m1_rate >= 0.0);
        assert!(reading.m5_rate >= 0.0);
        assert!(reading.m15_rate >= 0.0);
        assert!(reading.mean_rate >= 0.0);
    }

    #[test]
    fn first_tick_sets_the_rate() {
        let meter = Meter::new();
        let start = meter.started_at();
        meter.mark_at(60, start);
        let reading = meter.reading_at(start + TICK_INTERVAL);
        assert_eq!(reading.m1_rate, 12.0);
        assert_eq!(reading.m5_rate, 12.0);
        assert_eq!(reading.m15_rate, 12.0);
        assert_eq!(reading.mean_rate, 12.0);
    }

    #[test]
    fn rates_decay_without_marks() {
        let meter = Meter::new();
        let start = meter.started_at();
        meter.mark_at(60, start);
        let first = meter.reading_at(start + TICK_INTERVAL);
        let later = meter.reading_at(start + Duration::from_secs(60));
        assert!(later.m1_rate < first.m1_rate);
        // the longer windows decay slower
        assert!(later.m1_rate < later.m5_rate);
        assert!(later.m5_rate < later.m15_rate);
        assert_eq!(later.count, 60);
    }

    #[test]
    fn one_minute_alpha() {
        let mut ewma = Ewma::over_minutes(1.0);
        ewma.update(5);
        ewma.tick();
        assert_eq!(ewma.rate, 1.0);
        ewma.tick();
        let expected = 1.0 - (1.0 - (-5.0f64 / 60.0).exp());
        assert!((ewma.rate - expected).abs() < 1e-12);
    }
}
