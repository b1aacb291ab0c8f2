// src/fetch/mod.rs

use crate::error::{Error, Result};
use reqwest::blocking::Client;
use std::{fs, thread, time::Duration};
use tracing::{debug, error, warn};
use url::Url;

/// Retrieves the raw bytes behind a URL.
pub trait Fetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>>;
}

/// Blocking HTTP(S) fetcher with timeout and retry; also serves `file://` URLs.
pub struct HttpFetcher {
    client: Client,
    max_retries: u32,
    initial_backoff: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, max_retries: u32, initial_backoff: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("zipfips/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("building HTTP client: {}", e)))?;
        Ok(Self {
            client,
            max_retries,
            initial_backoff,
        })
    }

    fn get_once(&self, url: &Url) -> std::result::Result<Vec<u8>, Attempt> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| Attempt::from_reqwest(url, e))?;
        let status = resp.status();
        if !status.is_success() {
            let err = Error::Network {
                url: url.to_string(),
                reason: format!("HTTP status {}", status),
            };
            return Err(if status.is_server_error() {
                Attempt::Retry(err)
            } else {
                Attempt::Fail(err)
            });
        }
        resp.bytes()
            .map(|b| b.to_vec())
            .map_err(|e| Attempt::from_reqwest(url, e))
    }

    fn get_with_retry(&self, url: &Url) -> Result<Vec<u8>> {
        let mut attempts = 0;
        loop {
            match self.get_once(url) {
                Ok(bytes) => return Ok(bytes),
                Err(Attempt::Retry(e)) if attempts < self.max_retries => {
                    attempts += 1;
                    let backoff = backoff_delay(self.initial_backoff, attempts);
                    warn!(%url, attempt = attempts, delay_ms = backoff.as_millis() as u64, error = %e, "retrying");
                    thread::sleep(backoff);
                }
                Err(Attempt::Retry(e)) => {
                    error!(%url, error = %e, "exhausted retries");
                    return Err(e);
                }
                Err(Attempt::Fail(e)) => return Err(e),
            }
        }
    }
}

impl Fetcher for HttpFetcher {
    #[tracing::instrument(level = "debug", skip_all, fields(url = %url))]
    fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        match url.scheme() {
            "http" | "https" => {
                let bytes = self.get_with_retry(url)?;
                debug!(bytes = bytes.len(), "fetched");
                Ok(bytes)
            }
            "file" => read_local(url),
            other => Err(Error::Network {
                url: url.to_string(),
                reason: format!("unsupported scheme `{}`", other),
            }),
        }
    }
}

/// Exponential delay before retry number `attempt` (1-based), saturating
/// instead of overflowing.
fn backoff_delay(initial: Duration, attempt: u32) -> Duration {
    initial.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
}

fn read_local(url: &Url) -> Result<Vec<u8>> {
    let path = url.to_file_path().map_err(|_| Error::Network {
        url: url.to_string(),
        reason: "not a local file path".into(),
    })?;
    fs::read(&path).map_err(|e| Error::Network {
        url: url.to_string(),
        reason: format!("reading {}: {}", path.display(), e),
    })
}

/// Outcome of a single request: worth retrying or not.
enum Attempt {
    Retry(Error),
    Fail(Error),
}

impl Attempt {
    fn from_reqwest(url: &Url, e: reqwest::Error) -> Self {
        let retry = e.is_timeout() || e.is_connect() || e.is_request() || e.is_body();
        let err = Error::Network {
            url: url.to_string(),
            reason: e.to_string(),
        };
        if retry {
            Attempt::Retry(err)
        } else {
            Attempt::Fail(err)
        }
    }
}
