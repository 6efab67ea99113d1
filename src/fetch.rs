//! Network fetcher for remote assets

use crate::error::{InhouseError, InhouseResult};
use std::time::Duration;
use tracing::debug;
use ureq::tls::TlsConfig;

/// Largest response body accepted for a single asset
const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

/// Retrieves the bytes behind a URL
pub trait Fetcher: Send + Sync {
    /// GET `url`; non-success statuses are errors
    fn get(&self, url: &str) -> InhouseResult<Vec<u8>>;
}

/// Blocking HTTP fetcher
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    /// Create a fetcher; `timeout` of `None` leaves requests unbounded
    pub fn new(verify_tls: bool, timeout: Option<Duration>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .tls_config(
                TlsConfig::builder()
                    .disable_verification(!verify_tls)
                    .build(),
            )
            .timeout_global(timeout)
            .build()
            .into();

        Self { agent }
    }
}

impl Fetcher for HttpFetcher {
    fn get(&self, url: &str) -> InhouseResult<Vec<u8>> {
        debug!("Fetching {}", url);

        let mut response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| InhouseError::fetch(url, e))?;

        response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_vec()
            .map_err(|e| InhouseError::fetch(url, e))
    }
}
