use std::{
    collections::BTreeMap,
    fmt,
    sync::Arc,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use reqwest::Url;

use crate::{
    error::Error,
    metrics::MetricKind,
    point::{Consistency, Tags},
};

pub const DEFAULT_URL: &str = "http://127.0.0.1:8086";
pub const DEFAULT_DATABASE: &str = "metrics";
pub const DEFAULT_RETENTION_POLICY: &str = "default";

/// Units that rates and durations are reported in.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    pub fn as_nanos(&self) -> f64 {
        match self {
            TimeUnit::Nanoseconds => 1.0,
            TimeUnit::Microseconds => 1e3,
            TimeUnit::Milliseconds => 1e6,
            TimeUnit::Seconds => 1e9,
            TimeUnit::Minutes => 60e9,
            TimeUnit::Hours => 3_600e9,
            TimeUnit::Days => 86_400e9,
        }
    }

    pub fn as_secs(&self) -> f64 {
        self.as_nanos() / 1e9
    }
}

/// How a report cycle's points are sent.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// One write containing every point. All or nothing.
    #[default]
    Batch,
    /// One write per point. A failed point does not stop the rest.
    PerPoint,
}

/// Decides which metrics get reported.
#[derive(Clone)]
pub struct MetricFilter {
    f: Arc<dyn Fn(&str, MetricKind) -> bool + Send + Sync>,
}

impl MetricFilter {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str, MetricKind) -> bool + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    pub fn all() -> Self {
        Self::new(|_, _| true)
    }

    /// Accept metrics whose name starts with `prefix`.
    pub fn prefix(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self::new(move |name, _| name.starts_with(&prefix))
    }

    pub fn matches(&self, name: &str, kind: MetricKind) -> bool {
        (self.f)(name, kind)
    }
}

impl Default for MetricFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Debug for MetricFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MetricFilter")
    }
}

/// Source of point timestamps, in milliseconds since the unix epoch.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Reads the system clock on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct WallClock;

impl Clock for WallClock {
    fn now_ms(&self) -> i64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_millis() as i64,
            Err(e) => -(e.duration().as_millis() as i64),
        }
    }
}

/// Instead of using a non-monotonic system time call for every report we use
/// a base timestamp and a monotonic offset. Clock skew after process start
/// doesn't move our timestamps. Skew already present at start is kept.
#[derive(Copy, Clone, Debug)]
pub struct StartTs {
    instant: Instant,
    unix_ms: i64,
}

impl StartTs {
    pub fn new() -> Self {
        Self {
            instant: Instant::now(),
            unix_ms: WallClock.now_ms(),
        }
    }
}

impl Default for StartTs {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StartTs {
    fn now_ms(&self) -> i64 {
        self.unix_ms + self.instant.elapsed().as_millis() as i64
    }
}

/// Everything a [`crate::Reporter`] needs, fixed at construction.
#[derive(Clone)]
pub struct Config {
    /// Base url of the InfluxDB HTTP API.
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: String,
    pub retention_policy: String,
    /// Attached to every point.
    pub tags: Tags,
    pub clock: Arc<dyn Clock>,
    pub rate_unit: TimeUnit,
    pub duration_unit: TimeUnit,
    pub filter: MetricFilter,
    pub write_mode: WriteMode,
    /// Sent with batch writes. Per-point writes use the server default.
    pub consistency: Consistency,
    /// Request timeout for the HTTP client. `None` keeps the client default.
    pub timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            username: Some("root".to_string()),
            password: Some("root".to_string()),
            database: DEFAULT_DATABASE.to_string(),
            retention_policy: DEFAULT_RETENTION_POLICY.to_string(),
            tags: BTreeMap::new(),
            clock: Arc::new(WallClock),
            rate_unit: TimeUnit::Seconds,
            duration_unit: TimeUnit::Milliseconds,
            filter: MetricFilter::all(),
            write_mode: WriteMode::Batch,
            consistency: Consistency::All,
            timeout: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("database", &self.database)
            .field("retention_policy", &self.retention_policy)
            .field("tags", &self.tags)
            .field("rate_unit", &self.rate_unit)
            .field("duration_unit", &self.duration_unit)
            .field("write_mode", &self.write_mode)
            .field("consistency", &self.consistency)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Checks everything except the url, which only matters to the http
    /// transport.
    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.database.is_empty() {
            return Err(Error::InvalidConfig("database name is empty".into()));
        }
        if self.retention_policy.is_empty() {
            return Err(Error::InvalidConfig("retention policy is empty".into()));
        }
        if let Some((key, value)) = self
            .tags
            .iter()
            .find(|(k, v)| k.is_empty() || v.is_empty())
        {
            return Err(Error::InvalidConfig(format!(
                "tag {key:?}={value:?} has an empty key or value"
            )));
        }
        Ok(())
    }

    pub(crate) fn parse_url(&self) -> Result<Url, Error> {
        let url = Url::parse(&self.url)
            .map_err(|e| Error::InvalidConfig(format!("bad url {:?}: {e}", self.url)))?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(Error::InvalidConfig(format!(
                "url {:?} is not an http(s) endpoint",
                self.url
            )));
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.database, "metrics");
        assert_eq!(config.retention_policy, "default");
        assert_eq!(config.rate_unit, TimeUnit::Seconds);
        assert_eq!(config.duration_unit, TimeUnit::Milliseconds);
        assert_eq!(config.write_mode, WriteMode::Batch);
        assert_eq!(config.consistency, Consistency::All);
        assert!(config.tags.is_empty());
        assert!(config.filter.matches("anything", MetricKind::Timer));
        assert!(config.validate().is_ok());
        assert_eq!(config.parse_url().unwrap().port(), Some(8086));
    }

    #[test]
    fn rejects_bad_config() {
        let config = Config {
            database: String::new(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = Config {
            tags: BTreeMap::from([("host".to_string(), String::new())]),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        for url in ["not a url", "ftp://127.0.0.1", "mailto:root@localhost"] {
            let config = Config {
                url: url.to_string(),
                ..Default::default()
            };
            assert!(
                matches!(config.parse_url(), Err(Error::InvalidConfig(_))),
                "{url} should be rejected"
            );
        }
    }

    #[test]
    fn unit_factors() {
        assert_eq!(TimeUnit::Milliseconds.as_nanos(), 1e6);
        assert_eq!(TimeUnit::Minutes.as_secs(), 60.0);
        assert_eq!(TimeUnit::Milliseconds.as_secs(), 0.001);
    }

    #[test]
    fn filters() {
        let only_timers = MetricFilter::new(|_, kind| kind == MetricKind::Timer);
        assert!(only_timers.matches("a", MetricKind::Timer));
        assert!(!only_timers.matches("a", MetricKind::Meter));
        let prefix = MetricFilter::prefix("app.");
        assert!(prefix.matches("app.requests", MetricKind::Counter));
        assert!(!prefix.matches("db.requests", MetricKind::Counter));
    }

    #[test]
    fn start_ts_moves_forward() {
        let clock = StartTs::new();
        let first = clock.now_ms();
        assert!(first > 0);
        assert!(clock.now_ms() >= first);
        assert!((WallClock.now_ms() - first).abs() < 60_000);
    }
}
