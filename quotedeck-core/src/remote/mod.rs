//! The remote quote collection.
//!
//! The remote side stores generic "posts". Each quote travels as a post
//! whose `title` is the quote text and whose `body` is a compact JSON bundle
//! carrying the remaining fields (see [`to_remote`] / [`from_remote`]).

mod http;
mod mapping;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

pub use http::{check_server, HttpRemote, DEFAULT_FETCH_LIMIT, DEFAULT_SERVER_URL};
pub use mapping::{from_remote, remote_post_id, to_remote};

/// A post as exchanged with the remote endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default = "default_user_id")]
    pub user_id: u64,
}

fn default_user_id() -> u64 {
    1
}

/// Acknowledgment returned by the remote after an item is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateAck {
    /// Id the remote assigned, when it reported one.
    pub remote_id: Option<u64>,
}

/// Request/response access to the remote collection.
#[async_trait]
pub trait RemoteCollection: Send + Sync {
    /// Lists the remote collection.
    async fn fetch_all(&self) -> Result<Vec<RemoteItem>, TransportError>;

    /// Creates one item remotely.
    async fn create(&self, item: &RemoteItem) -> Result<CreateAck, TransportError>;
}
