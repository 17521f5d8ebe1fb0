use std::{sync::Arc, time::Duration};

use influx64::{CounterDef, GaugeDef, HistogramDef, MeterDef, TimerDef};

const REQUESTS: CounterDef = CounterDef::new("demo.requests");
const IN_FLIGHT: GaugeDef = GaugeDef::new("demo.in_flight");
const PAYLOAD_BYTES: HistogramDef = HistogramDef::new("demo.payload_bytes");
const EVENTS: MeterDef = MeterDef::new("demo.events");
const LATENCY: TimerDef = TimerDef::new("demo.latency");

/// Report a handful of synthetic metrics to a local InfluxDB every 5 seconds.
/// Point it somewhere else with INFLUX_URL.
#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let url = std::env::var("INFLUX_URL").unwrap_or_else(|_| influx64::config::DEFAULT_URL.into());
    let reporter = influx64::runtime::connect(influx64::Config {
        url,
        database: "influx64_demo".into(),
        tags: influx64::host_tags(),
        timeout: Some(Duration::from_secs(5)),
        ..Default::default()
    })
    .await?;
    influx64::DEFAULT_REGISTRY.register_gauge_fn("demo.uptime_ms", {
        let start = std::time::Instant::now();
        move || start.elapsed().as_millis() as u64
    });
    tokio::spawn(influx64::runtime::report_task(
        Arc::new(reporter),
        &influx64::DEFAULT_REGISTRY,
        Duration::from_secs(5),
    ));

    let requests = REQUESTS.must();
    let in_flight = IN_FLIGHT.must();
    let payload = PAYLOAD_BYTES.must();
    let events = EVENTS.must();
    let latency = LATENCY.must();
    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    for i in 0u64.. {
        ticker.tick().await;
        let _t = latency.time();
        requests.incr();
        in_flight.set((i % 7) as i64);
        payload.record((i % 100) as f64 * 12.5);
        events.mark(i % 3);
    }
    Ok(())
}
