//! src/fetcher.rs
//!
//! Retrieval of raw image bytes over HTTP with bounded retries.
//!
//! A fetch attempt succeeds when the response status is 2xx and the body is
//! non-empty. Failure classes back off differently: a bad status or empty
//! body waits briefly before the next attempt, a connection-level failure
//! waits an order of magnitude longer, and any other error retries
//! immediately. Exhausting all trials yields `None` rather than an error;
//! a missing payload is an expected outcome the pipeline tolerates per item.
//!
//! Fetchers keep no state across calls. Cloning one shares the underlying
//! connection pool, so a single fetcher can serve a whole worker pool.

use std::time::Duration;

use bytes::Bytes;
use tracing::warn;

use crate::error::DataflowError;

/// Retry and timeout knobs for a fetcher. Applied per call.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Maximum number of attempts per locator.
    pub max_trials: usize,
    /// Per-attempt overall request timeout.
    pub request_timeout: Duration,
    /// Per-attempt connect timeout.
    pub connect_timeout: Duration,
    /// Wait after a non-2xx status or an empty body.
    pub status_backoff: Duration,
    /// Wait after a connection-level failure.
    pub transport_backoff: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_trials: 5,
            request_timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(2),
            status_backoff: Duration::from_millis(50),
            transport_backoff: Duration::from_millis(500),
        }
    }
}

/// What to do after a failed attempt.
enum Backoff {
    Status,
    Transport,
    None,
}

impl Backoff {
    fn for_request_error(err: &reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Backoff::Transport
        } else {
            Backoff::None
        }
    }
}

/// Blocking fetcher used by the sequential and OS-thread strategies.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::blocking::Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self, DataflowError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(DataflowError::Client)?;
        Ok(Self { client, config })
    }

    pub fn max_trials(&self) -> usize {
        self.config.max_trials
    }

    /// Fetches `url`, retrying up to `max_trials` times.
    ///
    /// Returns `None` once every trial is exhausted.
    pub fn fetch(&self, url: &str) -> Option<Bytes> {
        for trial in 1..=self.config.max_trials {
            let backoff = match self.client.get(url).send() {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        warn!(url, status = status.as_u16(), trial, "fetch returned non-success status");
                        Backoff::Status
                    } else {
                        match response.bytes() {
                            Ok(body) if !body.is_empty() => return Some(body),
                            Ok(_) => {
                                warn!(url, trial, "fetch returned empty body");
                                Backoff::Status
                            }
                            Err(err) => {
                                warn!(url, error = %err, trial, "failed to read response body");
                                Backoff::for_request_error(&err)
                            }
                        }
                    }
                }
                Err(err) => {
                    warn!(url, error = %err, trial, "request failed");
                    Backoff::for_request_error(&err)
                }
            };

            match backoff {
                Backoff::Status => std::thread::sleep(self.config.status_backoff),
                Backoff::Transport => std::thread::sleep(self.config.transport_backoff),
                Backoff::None => {}
            }
        }
        None
    }
}

/// Async fetcher used by the coroutine-pool strategy. Same contract as
/// [`Fetcher`], suspending instead of blocking at the network and backoff
/// waits.
#[derive(Debug, Clone)]
pub struct AsyncFetcher {
    client: reqwest::Client,
    config: FetchConfig,
}

impl AsyncFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, DataflowError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(DataflowError::Client)?;
        Ok(Self { client, config })
    }

    pub fn max_trials(&self) -> usize {
        self.config.max_trials
    }

    pub async fn fetch(&self, url: &str) -> Option<Bytes> {
        for trial in 1..=self.config.max_trials {
            let backoff = match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        warn!(url, status = status.as_u16(), trial, "fetch returned non-success status");
                        Backoff::Status
                    } else {
                        match response.bytes().await {
                            Ok(body) if !body.is_empty() => return Some(body),
                            Ok(_) => {
                                warn!(url, trial, "fetch returned empty body");
                                Backoff::Status
                            }
                            Err(err) => {
                                warn!(url, error = %err, trial, "failed to read response body");
                                Backoff::for_request_error(&err)
                            }
                        }
                    }
                }
                Err(err) => {
                    warn!(url, error = %err, trial, "request failed");
                    Backoff::for_request_error(&err)
                }
            };

            match backoff {
                Backoff::Status => tokio::time::sleep(self.config.status_backoff).await,
                Backoff::Transport => tokio::time::sleep(self.config.transport_backoff).await,
                Backoff::None => {}
            }
        }
        None
    }
}
