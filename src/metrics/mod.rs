use std::{any::Any, fmt, marker::PhantomData};

use crate::{
    registry::Registry,
    snapshot::{CounterReading, GaugeValue, HistogramReading, MeterReading, TimerReading},
    DEFAULT_REGISTRY,
};

pub(crate) mod counter;
pub(crate) mod gauge;
pub(crate) mod histogram;
pub(crate) mod meter;
pub(crate) mod timer;

/// The five instrument kinds a registry can hold.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricKind {
    Gauge,
    Counter,
    Histogram,
    Meter,
    Timer,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
            MetricKind::Histogram => "histogram",
            MetricKind::Meter => "meter",
            MetricKind::Timer => "timer",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trait representing the public metric interface. This is common across all metric kinds, and slots into the
/// general [`MetricDef`] to provide the backing implementation.
pub trait Metric: Sized {
    const KIND: MetricKind;

    fn must() -> Self;
}

/// A single reading taken from an instrument.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Gauge(GaugeValue),
    Counter(CounterReading),
    Histogram(HistogramReading),
    Meter(MeterReading),
    Timer(TimerReading),
}

impl MetricValue {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricValue::Gauge(_) => MetricKind::Gauge,
            MetricValue::Counter(_) => MetricKind::Counter,
            MetricValue::Histogram(_) => MetricKind::Histogram,
            MetricValue::Meter(_) => MetricKind::Meter,
            MetricValue::Timer(_) => MetricKind::Timer,
        }
    }
}

/// A trait representing the internal chunk of the metric interface. We use this to collect observations of the
/// underlying metric value, as well as store references to the metric in the registry.
pub trait Recordable: Send + Sync + 'static {
    /// Lets the registry turn a `dyn Recordable` back into the concrete
    /// [`Metric`] the caller asked for.
    fn as_any(&self) -> &dyn Any;

    fn kind(&self) -> MetricKind;

    /// Read the current value. Reading never resets the instrument.
    fn value(&self) -> MetricValue;
}

/// A constant definition of a metric. Provides a single spot for defining the schema of a metric at compile time
/// Internally it will handle calling out to the registry at runtime to register the new metric.
pub struct MetricDef<M> {
    name: &'static str,
    _kind: PhantomData<M>,
}

impl<M> MetricDef<M>
where
    M: Metric + Recordable + Clone,
{
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _kind: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Fetch the metric from the default registry, registering it on first use.
    pub fn must(&self) -> M {
        self.must_with_registry(&DEFAULT_REGISTRY)
    }

    #[doc(hidden)]
    pub fn must_with_registry(&self, registry: &Registry) -> M {
        registry.register(self.name)
    }
}
