//! The seam between the reporter and the database. [`HttpTransport`] talks to
//! the InfluxDB 1.x HTTP API, tests swap in their own implementation.

use reqwest::{
    blocking::{Client as BlockingClient, Request, RequestBuilder},
    Url,
};

use crate::{
    config::Config,
    error::{Error, TransportError},
    point::{Batch, Point},
};

/// Write precision sent with every request, points carry millisecond
/// timestamps.
const PRECISION: &str = "ms";

pub trait Transport: Send + Sync {
    fn create_database(&self, name: &str) -> Result<(), TransportError>;

    fn write_batch(&self, batch: &Batch) -> Result<(), TransportError>;

    fn write_point(
        &self,
        database: &str,
        retention_policy: &str,
        point: &Point,
    ) -> Result<(), TransportError>;
}

/// Blocking InfluxDB client. Every call runs to completion on the calling
/// thread.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: BlockingClient,
    base: Url,
    credentials: Option<(String, Option<String>)>,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let base = config.parse_url()?;
        let mut builder = BlockingClient::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to create http client: {e}")))?;
        Ok(Self {
            client,
            base,
            credentials: config
                .username
                .clone()
                .map(|user| (user, config.password.clone())),
        })
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        // parse_url rejects urls that can't be a base, so this always succeeds
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(path);
        }
        url
    }

    fn post(&self, path: &str) -> RequestBuilder {
        let builder = self.client.post(self.endpoint(path));
        match &self.credentials {
            Some((user, password)) => builder.basic_auth(user, password.as_ref()),
            None => builder,
        }
    }

    pub(crate) fn create_database_request(&self, name: &str) -> Result<Request, TransportError> {
        let query = format!("CREATE DATABASE {}", quote_ident(name));
        Ok(self.post("query").query(&[("q", query)]).build()?)
    }

    pub(crate) fn write_request(
        &self,
        database: &str,
        retention_policy: &str,
        consistency: Option<&str>,
        body: Vec<u8>,
    ) -> Result<Request, TransportError> {
        let mut params = vec![
            ("db", database),
            ("rp", retention_policy),
            ("precision", PRECISION),
        ];
        if let Some(consistency) = consistency {
            params.push(("consistency", consistency));
        }
        Ok(self.post("write").query(&params).body(body).build()?)
    }

    fn execute(&self, request: Request) -> Result<(), TransportError> {
        let resp = self.client.execute(request)?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().unwrap_or_default();
        Err(TransportError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

impl Transport for HttpTransport {
    fn create_database(&self, name: &str) -> Result<(), TransportError> {
        self.execute(self.create_database_request(name)?)
    }

    fn write_batch(&self, batch: &Batch) -> Result<(), TransportError> {
        let request = self.write_request(
            &batch.database,
            &batch.retention_policy,
            Some(batch.consistency.as_str()),
            batch.to_line_protocol()?,
        )?;
        self.execute(request)
    }

    fn write_point(
        &self,
        database: &str,
        retention_policy: &str,
        point: &Point,
    ) -> Result<(), TransportError> {
        let request =
            self.write_request(database, retention_policy, None, point.to_line_protocol()?)?;
        self.execute(request)
    }
}

/// Quote an identifier for InfluxQL.
fn quote_ident(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}
