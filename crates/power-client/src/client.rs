//! HTTP client for the POWER regional daily archive.

use std::time::Duration;

use async_trait::async_trait;
use power_common::{lookup_parameter, BoundingBox, DataCube, DateRange};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument, warn};

use crate::error::{SourceError, SourceResult};
use crate::parse::decode_regional;
use crate::source::DataSource;

/// Configuration for [`PowerArchiveClient`].
#[derive(Debug, Clone)]
pub struct PowerClientConfig {
    /// Archive API root.
    pub base_url: String,
    /// POWER user community tag sent with every request.
    pub community: String,
    /// Total attempts per fetch (first try + retries).
    pub max_attempts: u32,
    /// Initial retry delay (doubles each retry).
    pub initial_retry_delay: Duration,
    /// Retry delay cap.
    pub max_retry_delay: Duration,
    /// Per-request timeout; bounds worst-case pipeline latency.
    pub request_timeout: Duration,
}

impl Default for PowerClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://power.larc.nasa.gov/api".to_string(),
            community: "RE".to_string(),
            max_attempts: 3,
            initial_retry_delay: Duration::from_secs(1),
            max_retry_delay: Duration::from_secs(30),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Client for the POWER regional daily endpoint.
pub struct PowerArchiveClient {
    client: Client,
    config: PowerClientConfig,
}

impl PowerArchiveClient {
    pub fn new(config: PowerClientConfig) -> SourceResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| SourceError::Unavailable {
                attempts: 0,
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self { client, config })
    }

    /// Build the regional query URL. `None` bbox requests the full grid.
    fn build_regional_url(
        &self,
        variable: &str,
        range: &DateRange,
        bbox: Option<&BoundingBox>,
    ) -> String {
        let (min_lon, min_lat, max_lon, max_lat) = match bbox {
            Some(b) => (b.min_lon, b.min_lat, b.max_lon, b.max_lat),
            None => (-180.0, -90.0, 180.0, 90.0),
        };

        format!(
            "{}/temporal/daily/regional?parameters={}&community={}\
             &latitude-min={}&latitude-max={}&longitude-min={}&longitude-max={}\
             &start={}&end={}&format=JSON",
            self.config.base_url,
            variable,
            self.config.community,
            min_lat,
            max_lat,
            min_lon,
            max_lon,
            range.start.format("%Y%m%d"),
            range.end.format("%Y%m%d"),
        )
    }

    /// One request/decode attempt.
    async fn attempt(&self, url: &str, variable: &str) -> Result<DataCube, TransientOrFatal> {
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            // Transport-level failures (connect, timeout, reset) are
            // all retryable against this archive.
            Err(e) => return Err(TransientOrFatal::Transient(e.to_string())),
        };

        let status = response.status();
        if status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| TransientOrFatal::Transient(e.to_string()))?;
            return decode_regional(&body, variable).map_err(TransientOrFatal::Fatal);
        }

        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(TransientOrFatal::Transient(format!("HTTP {status}")));
        }

        // The archive answers 422 when a parameter id is unrecognized.
        if status == StatusCode::UNPROCESSABLE_ENTITY {
            return Err(TransientOrFatal::Fatal(SourceError::InvalidVariable(
                variable.to_string(),
            )));
        }

        let message = response.text().await.unwrap_or_default();
        Err(TransientOrFatal::Fatal(SourceError::Rejected {
            status: status.as_u16(),
            message,
        }))
    }
}

enum TransientOrFatal {
    Transient(String),
    Fatal(SourceError),
}

#[async_trait]
impl DataSource for PowerArchiveClient {
    #[instrument(skip(self, range, bbox), fields(variable = %variable))]
    async fn fetch(
        &self,
        variable: &str,
        range: &DateRange,
        bbox: Option<&BoundingBox>,
    ) -> SourceResult<DataCube> {
        // Reject unknown ids before any network traffic.
        if lookup_parameter(variable).is_none() {
            return Err(SourceError::InvalidVariable(variable.to_string()));
        }

        let url = self.build_regional_url(variable, range, bbox);
        debug!(url = %url, "Fetching regional data");

        let mut attempts = 0;
        let mut delay = self.config.initial_retry_delay;

        loop {
            attempts += 1;
            match self.attempt(&url, variable).await {
                Ok(cube) => {
                    info!(
                        times = cube.times().len(),
                        lats = cube.lats().len(),
                        lons = cube.lons().len(),
                        "Fetched cube"
                    );
                    return Ok(cube);
                }
                Err(TransientOrFatal::Fatal(e)) => return Err(e),
                Err(TransientOrFatal::Transient(message)) => {
                    if attempts >= self.config.max_attempts {
                        return Err(SourceError::Unavailable { attempts, message });
                    }

                    warn!(
                        error = %message,
                        attempt = attempts,
                        max_attempts = self.config.max_attempts,
                        delay_secs = delay.as_secs(),
                        "Fetch failed, retrying"
                    );

                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, self.config.max_retry_delay);
                }
            }
        }
    }
}
