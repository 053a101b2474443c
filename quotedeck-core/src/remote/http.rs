//! HTTP client for a JSON "posts" endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{CreateAck, RemoteCollection, RemoteItem};
use crate::error::TransportError;

pub const DEFAULT_SERVER_URL: &str = "https://jsonplaceholder.typicode.com";
pub const DEFAULT_FETCH_LIMIT: usize = 10;

const POSTS_PATH: &str = "/posts";
/// Timeout for the reachability probe only; sync requests use the
/// transport's defaults.
const CHECK_TIMEOUT: Duration = Duration::from_secs(3);

/// Remote collection backed by `GET/POST <server>/posts`.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    server_url: String,
    fetch_limit: usize,
    client: reqwest::Client,
}

impl HttpRemote {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            fetch_limit: DEFAULT_FETCH_LIMIT,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_fetch_limit(mut self, limit: usize) -> Self {
        self.fetch_limit = limit;
        self
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn fetch_limit(&self) -> usize {
        self.fetch_limit
    }

    fn posts_url(&self) -> String {
        format!("{}{}", base_url(&self.server_url), POSTS_PATH)
    }
}

#[async_trait]
impl RemoteCollection for HttpRemote {
    async fn fetch_all(&self) -> Result<Vec<RemoteItem>, TransportError> {
        let response = self
            .client
            .get(self.posts_url())
            .query(&[("_limit", self.fetch_limit)])
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TransportError::Status(response.status().as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;

        let Value::Array(values) = body else {
            tracing::debug!("Remote list response is not an array; treating as empty");
            return Ok(Vec::new());
        };

        Ok(values
            .into_iter()
            .filter_map(|v| match serde_json::from_value::<RemoteItem>(v) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::debug!("Skipping malformed remote item: {}", e);
                    None
                }
            })
            .collect())
    }

    async fn create(&self, item: &RemoteItem) -> Result<CreateAck, TransportError> {
        let response = self
            .client
            .post(self.posts_url())
            .json(item)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TransportError::Status(response.status().as_u16()));
        }

        let created: RemoteItem = response
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;

        Ok(CreateAck {
            remote_id: created.id,
        })
    }
}

/// Returns true if the server answers at all within a short timeout.
pub async fn check_server(server_url: &str) -> bool {
    let client = match reqwest::Client::builder().timeout(CHECK_TIMEOUT).build() {
        Ok(client) => client,
        Err(_) => return false,
    };
    client.get(base_url(server_url)).send().await.is_ok()
}

/// Normalizes a configured server URL: adds a scheme if missing and strips
/// trailing slashes.
fn base_url(server_url: &str) -> String {
    let url = if server_url.starts_with("http://") || server_url.starts_with("https://") {
        server_url.to_string()
    } else {
        format!("http://{}", server_url)
    };
    url.trim_end_matches('/').to_string()
}
