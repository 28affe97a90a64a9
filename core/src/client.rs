//! Report service access.
//!
//! [`LogSource`] is the seam between the pipeline and the network; the
//! pipeline only ever talks to the trait. [`DpsReportClient`] is the HTTP
//! implementation against dps.report:
//! - `GET /getUploads?userToken=T[&page=P]` → `{ pages, uploads: [{ id, .. }] }`
//! - `GET /getJson?id=ID` → report JSON of one fight

use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::TransportError;
use crate::model::LogId;
use fightstats_types::{RemoteConfig, RetryConfig};

/// One page of the upload listing
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadsPage {
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub uploads: Vec<Upload>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Upload {
    pub id: LogId,
}

pub trait LogSource: Send + Sync {
    /// Fetch one listing page (1-based). Single attempt, no retry.
    fn uploads_page(&self, token: &str, page: u32) -> Result<UploadsPage, TransportError>;

    /// Fetch the report JSON for one log. Implementations may retry internally.
    fn log_json(&self, id: &LogId) -> Result<Value, TransportError>;
}

pub struct DpsReportClient {
    http: Client,
    base_url: String,
    retry: RetryConfig,
}

impl DpsReportClient {
    pub fn new(remote: &RemoteConfig, retry: RetryConfig) -> Result<Self, TransportError> {
        let http = Client::builder()
            .user_agent(remote.user_agent.clone())
            .timeout(Duration::from_secs(remote.request_timeout_secs))
            .build()
            .map_err(|e| TransportError::Request {
                url: remote.base_url.clone(),
                message: e.to_string(),
            })?;
        Ok(Self {
            http,
            base_url: remote.base_url.trim_end_matches('/').to_string(),
            retry,
        })
    }

    /// Single GET. Error messages carry the endpoint only; query strings
    /// contain the user token and must stay out of logs.
    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, TransportError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .map_err(|e| TransportError::Request {
                url: url.clone(),
                message: e.without_url().to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url,
                status: status.as_u16(),
            });
        }

        response.json::<T>().map_err(|e| TransportError::Decode {
            url,
            message: e.without_url().to_string(),
        })
    }

    fn get_with_retry<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, TransportError> {
        let max_attempts = self.retry.max_retries + 1;
        let mut attempt = 0;

        let op = || {
            attempt += 1;
            self.get(path, query).map_err(|err| {
                if err.is_transient() && attempt < max_attempts {
                    backoff::Error::transient(err)
                } else {
                    backoff::Error::permanent(err)
                }
            })
        };
        let notify = |err: TransportError, wait: Duration| {
            tracing::debug!(error = %err, wait_ms = wait.as_millis() as u64, "Retrying request");
        };

        backoff::retry_notify(retry_backoff(&self.retry), op, notify).map_err(|e| match e {
            backoff::Error::Permanent(err) => err,
            backoff::Error::Transient { err, .. } => err,
        })
    }
}

fn retry_backoff(retry: &RetryConfig) -> backoff::ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(retry.initial_backoff_ms))
        .with_multiplier(retry.multiplier)
        .with_randomization_factor(0.2)
        .with_max_interval(Duration::from_millis(retry.max_backoff_ms))
        .with_max_elapsed_time(None)
        .build()
}

impl LogSource for DpsReportClient {
    fn uploads_page(&self, token: &str, page: u32) -> Result<UploadsPage, TransportError> {
        if page <= 1 {
            self.get("/getUploads", &[("userToken", token)])
        } else {
            let page = page.to_string();
            self.get("/getUploads", &[("userToken", token), ("page", page.as_str())])
        }
    }

    fn log_json(&self, id: &LogId) -> Result<Value, TransportError> {
        self.get_with_retry("/getJson", &[("id", id.as_str())])
    }
}
