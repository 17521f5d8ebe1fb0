//! Drive a [`Reporter`] from a tokio runtime. Connecting and reporting are
//! blocking, so both are handed to the blocking pool. Calling
//! [`Reporter::connect`] directly on a runtime thread panics inside the http
//! client.

use std::{sync::Arc, time::Duration};

use crate::{
    config::Config, error::Error, registry::Registry, reporter::Reporter,
    transport::Transport,
};

/// [`Reporter::connect`] for async callers.
pub async fn connect(config: Config) -> Result<Reporter, Error> {
    tokio::task::spawn_blocking(move || Reporter::connect(config)).await?
}

/// Snapshot `registry` and report it every `period`, forever. Failures are
/// logged and the loop keeps going.
pub async fn report_task<T>(
    reporter: Arc<Reporter<T>>,
    registry: &'static Registry,
    period: Duration,
) where
    T: Transport + 'static,
{
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        let reporter = reporter.clone();
        let res = tokio::task::spawn_blocking(move || reporter.report(registry.snapshot())).await;
        match res {
            Ok(Ok(points)) => tracing::debug!(message = "reported metrics", points = points),
            Ok(Err(e)) => tracing::error!(message = "report cycle failed", error = %e),
            Err(e) => tracing::error!(message = "report task panicked", error = %e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{serve, MockTransport};

    #[tokio::test]
    async fn connect_from_async_context() {
        let (url, server) = serve(vec![(204, ""), (204, "")]);
        let reporter = Arc::new(
            connect(Config {
                url,
                ..Default::default()
            })
            .await
            .unwrap(),
        );
        let registry: &'static Registry = Box::leak(Box::new(Registry::new()));
        registry.gauge("runtime.test.connected").set(1);
        let res = tokio::time::timeout(
            Duration::from_millis(500),
            report_task(reporter, registry, Duration::from_secs(60)),
        )
        .await;
        assert!(res.is_err());

        let requests = tokio::task::spawn_blocking(move || server.join().unwrap())
            .await
            .unwrap();
        assert!(requests[0].starts_with("POST /query?q="));
        assert!(requests[1].starts_with("POST /write?db=metrics"));
    }

    #[tokio::test]
    async fn connect_failure_from_async_context() {
        let (url, server) = serve(vec![(503, "unavailable")]);
        let err = connect(Config {
            url,
            ..Default::default()
        })
        .await
        .err()
        .unwrap();
        assert!(matches!(err, Error::Connection { .. }), "unexpected error {err:?}");
        tokio::task::spawn_blocking(move || server.join().unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn reports_every_tick() {
        let registry: &'static Registry = Box::leak(Box::new(Registry::new()));
        registry.counter("runtime.test.ticks").incr();
        let transport = MockTransport::new();
        let reporter =
            Arc::new(Reporter::with_transport(Config::default(), transport.clone()).unwrap());

        let res = tokio::time::timeout(
            Duration::from_millis(250),
            report_task(reporter, registry, Duration::from_millis(20)),
        )
        .await;
        assert!(res.is_err(), "report_task never returns");

        let points = transport.written_points();
        assert!(points.len() >= 2, "got {} points", points.len());
        assert!(points.iter().all(|p| p.measurement() == "runtime.test.ticks"));
    }
}
