//! Periodically report a metrics registry to InfluxDB.
//!
//! A [`Reporter`] takes an immutable [`RegistrySnapshot`], turns every
//! reading into a line protocol point and writes them to a database, either
//! as one batch or point by point.
//!
//! ```no_run
//! use std::{sync::Arc, time::Duration};
//!
//! const REQUESTS: influx64::CounterDef = influx64::CounterDef::new("app.requests");
//!
//! # async fn run() -> Result<(), influx64::Error> {
//! // Reporter::connect blocks, so async callers go through runtime::connect.
//! let reporter = influx64::runtime::connect(influx64::Config {
//!     tags: influx64::host_tags(),
//!     ..Default::default()
//! })
//! .await?;
//! REQUESTS.must().incr();
//! influx64::runtime::report_task(
//!     Arc::new(reporter),
//!     &influx64::DEFAULT_REGISTRY,
//!     Duration::from_secs(10),
//! )
//! .await;
//! # Ok(())
//! # }
//! ```

pub mod config;
mod error;
pub mod metrics;
pub mod point;
mod registry;
mod reporter;
pub mod runtime;
pub mod snapshot;
pub mod translate;
pub mod transport;

pub use config::{Clock, Config, MetricFilter, StartTs, TimeUnit, WallClock, WriteMode};
pub use error::{Error, TransportError, WriteFailure};
pub use metrics::{
    counter::Counter,
    gauge::{FnGauge, Gauge},
    histogram::Histogram,
    meter::Meter,
    timer::{Timer, TimerGuard},
    Metric, MetricDef, MetricKind,
};
pub use point::{Batch, Consistency, Point, Tags};
pub use registry::{Registry, DEFAULT_REGISTRY};
pub use reporter::Reporter;
pub use snapshot::RegistrySnapshot;
pub use transport::{HttpTransport, Transport};

pub type CounterDef = MetricDef<Counter>;
pub type GaugeDef = MetricDef<Gauge>;
pub type HistogramDef = MetricDef<Histogram>;
pub type MeterDef = MetricDef<Meter>;
pub type TimerDef = MetricDef<Timer>;

/// Tags identifying this process: `host` set to the machine's hostname.
pub fn host_tags() -> Tags {
    let host = gethostname::gethostname().to_string_lossy().into_owned();
    let mut tags = Tags::new();
    if !host.is_empty() {
        tags.insert("host".to_string(), host);
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_tags_has_hostname() {
        let tags = host_tags();
        assert!(tags.len() <= 1);
        if let Some(host) = tags.get("host") {
            assert!(!host.is_empty());
        }
    }

    #[test]
    fn defs_are_const() {
        const TIMER: TimerDef = TimerDef::new("influx64/test/lib/timer");
        const METER: MeterDef = MeterDef::new("influx64/test/lib/meter");
        TIMER.must().update(std::time::Duration::from_millis(1));
        METER.must().mark(3);
        assert_eq!(METER.must().count(), 3);
        assert!(DEFAULT_REGISTRY.len() >= 2);
    }
}
