//! Where a screen's collection comes from.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::error::LoadError;
use tracing::debug;
use url::Url;

/// Matches the demo panel's fetch budget.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait DataSource<T>: Send + Sync {
    async fn fetch(&self) -> Result<Vec<T>, LoadError>;
}

/// Fixed in-memory collection.
#[derive(Debug, Clone)]
pub struct StaticSource<T> {
    items: Vec<T>,
}

impl<T> StaticSource<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl<T: Clone + Send + Sync> DataSource<T> for StaticSource<T> {
    async fn fetch(&self) -> Result<Vec<T>, LoadError> {
        Ok(self.items.clone())
    }
}

/// Always fails with the configured error; used for offline mode.
#[derive(Debug, Clone)]
pub struct FailingSource {
    error: LoadError,
}

impl FailingSource {
    pub fn new(error: LoadError) -> Self {
        Self { error }
    }
}

#[async_trait]
impl<T: Send + Sync> DataSource<T> for FailingSource {
    async fn fetch(&self) -> Result<Vec<T>, LoadError> {
        Err(self.error.clone())
    }
}

/// JSON GET client with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpSource {
    http: Client,
    timeout: Duration,
}

impl HttpSource {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: Client::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn get_json(&self, url: &Url) -> Result<Value, LoadError> {
        debug!(%url, "GET");
        let res = self
            .http
            .get(url.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| self.map_error(url, err))?
            .error_for_status()
            .map_err(|err| self.map_error(url, err))?;
        res.json::<Value>()
            .await
            .map_err(|err| self.map_error(url, err))
    }

    /// Fetches a list that is either the body itself or the array under `field`.
    pub async fn get_list<W: DeserializeOwned>(
        &self,
        url: &Url,
        field: Option<&str>,
    ) -> Result<Vec<W>, LoadError> {
        let body = self.get_json(url).await?;
        let array = extract_array(body, field).map_err(|message| LoadError::Decode {
            url: url.to_string(),
            message,
        })?;
        serde_json::from_value(array).map_err(|err| LoadError::Decode {
            url: url.to_string(),
            message: err.to_string(),
        })
    }

    fn map_error(&self, url: &Url, err: reqwest::Error) -> LoadError {
        let url = url.to_string();
        if err.is_timeout() {
            LoadError::Timeout {
                url,
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else if let Some(status) = err.status() {
            LoadError::Status {
                url,
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            LoadError::Decode {
                url,
                message: err.to_string(),
            }
        } else {
            LoadError::Transport {
                url,
                message: err.to_string(),
            }
        }
    }
}

impl Default for HttpSource {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

pub(crate) fn extract_array(body: Value, field: Option<&str>) -> Result<Value, String> {
    match (body, field) {
        (array @ Value::Array(_), _) => Ok(array),
        (Value::Object(mut map), Some(field)) => match map.remove(field) {
            Some(array @ Value::Array(_)) => Ok(array),
            Some(_) => Err(format!("field '{field}' is not an array")),
            None => Err(format!("missing array field '{field}'")),
        },
        (Value::Object(_), None) => Err("expected a JSON array".to_string()),
        (other, _) => Err(format!("expected a JSON array or object, got {other}")),
    }
}

/// `base/path?limit=n`, tolerating bases with or without a trailing slash.
pub fn endpoint(base: &Url, path: &str, limit: Option<u32>) -> Result<Url, LoadError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| LoadError::Transport {
            url: base.to_string(),
            message: "base url cannot carry a path".to_string(),
        })?
        .pop_if_empty()
        .push(path);
    if let Some(limit) = limit {
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
    }
    Ok(url)
}

#[cfg(test)]
#[path = "tests/source_tests.rs"]
mod tests;
