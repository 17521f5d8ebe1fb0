use std::{sync::Arc, time::Instant};

use crate::{
    config::{Clock, Config, MetricFilter, WriteMode},
    error::{Error, WriteFailure},
    point::{Batch, Consistency, Point, Tags},
    snapshot::RegistrySnapshot,
    translate::{translate, Units},
    transport::{HttpTransport, Transport},
};

/// Writes registry snapshots to InfluxDB. Construction creates the target
/// database, after that every [`Reporter::report`] call is independent: a
/// failed cycle is logged, returned and dropped.
pub struct Reporter<T = HttpTransport> {
    transport: T,
    database: String,
    retention_policy: String,
    tags: Arc<Tags>,
    units: Units,
    filter: MetricFilter,
    write_mode: WriteMode,
    consistency: Consistency,
    clock: Arc<dyn Clock>,
}

impl Reporter<HttpTransport> {
    /// Connect to the InfluxDB instance at `config.url` and create the
    /// configured database.
    pub fn connect(config: Config) -> Result<Self, Error> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> Reporter<T> {
    pub fn with_transport(config: Config, transport: T) -> Result<Self, Error> {
        config.validate()?;
        if let Err(source) = transport.create_database(&config.database) {
            tracing::error!(message="failed to create database", database=%config.database, error=%source);
            return Err(Error::Connection {
                database: config.database,
                source,
            });
        }
        tracing::debug!(message="reporter ready", database=%config.database, retention_policy=%config.retention_policy, write_mode=?config.write_mode);
        Ok(Self {
            transport,
            database: config.database,
            retention_policy: config.retention_policy,
            tags: Arc::new(config.tags),
            units: Units::new(config.rate_unit, config.duration_unit),
            filter: config.filter,
            write_mode: config.write_mode,
            consistency: config.consistency,
            clock: config.clock,
        })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Translate and write one snapshot. Returns the number of points
    /// delivered. Every point in the cycle shares a single timestamp.
    pub fn report(&self, mut snapshot: RegistrySnapshot) -> Result<usize, Error> {
        let timestamp = self.clock.now_ms();
        let collection_start = Instant::now();
        snapshot.retain(&self.filter);
        let points = translate(&snapshot, timestamp, &self.tags, &self.units);
        let collection_dur = collection_start.elapsed();
        tracing::debug!(message="collected metrics", collection_ts=timestamp, duration=?collection_dur, readings=snapshot.len(), points=points.len());

        if points.is_empty() {
            return Ok(0);
        }
        match self.write_mode {
            WriteMode::Batch => self.write_batch(points),
            WriteMode::PerPoint => self.write_points(points),
        }
    }

    fn write_batch(&self, points: Vec<Point>) -> Result<usize, Error> {
        let mut batch = Batch::new(&self.database, &self.retention_policy, self.consistency);
        batch.extend(points);
        let count = batch.len();
        if let Err(source) = self.transport.write_batch(&batch) {
            tracing::error!(message="failed to export metrics", points=count, error=%source);
            return Err(Error::Write {
                points: count,
                source,
            });
        }
        Ok(count)
    }

    /// Write each point on its own. A failure doesn't stop the remaining
    /// points from being attempted.
    fn write_points(&self, points: Vec<Point>) -> Result<usize, Error> {
        let attempted = points.len();
        let mut failures = Vec::new();
        for point in points {
            if let Err(source) =
                self.transport
                    .write_point(&self.database, &self.retention_policy, &point)
            {
                tracing::error!(message="failed to export point", measurement=point.measurement(), error=%source);
                failures.push(WriteFailure {
                    measurement: point.measurement().to_string(),
                    source,
                });
            }
        }
        if failures.is_empty() {
            Ok(attempted)
        } else {
            Err(Error::PartialWrite {
                attempted,
                failures,
            })
        }
    }
}
