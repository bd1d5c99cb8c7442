//! HTTP client side of the peer boundary

use std::time::Duration;
use async_trait::async_trait;
use reqwest::StatusCode;

use crate::error::{Error, Result};
use crate::http::path::peer_path;
use crate::http::server::KEY_NOT_FOUND;
use crate::peers::PeerGetter;

/// Longest diagnostic body carried into an error
const MAX_DIAGNOSTIC_LEN: usize = 128;

/// Fetches values from one remote node
pub struct HttpPeer {
    /// Peer base URL, e.g. `http://10.0.0.2:8001`
    peer: String,
    base_path: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpPeer {
    /// Create a getter for `peer` serving under `base_path`
    pub fn new(peer: &str, base_path: &str, client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            peer: peer.trim_end_matches('/').to_string(),
            base_path: base_path.to_string(),
            client,
            timeout,
        }
    }

    /// Full URL for `group` and `key`
    pub fn url(&self, group: &str, key: &str) -> String {
        format!("{}{}", self.peer, peer_path(&self.base_path, group, key))
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::PeerTimeout {
                peer: self.peer.clone(),
                timeout: self.timeout,
            }
        } else {
            Error::PeerFetch {
                peer: self.peer.clone(),
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl PeerGetter for HttpPeer {
    async fn get(&self, group: &str, key: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(self.url(group, key))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;

        if status != StatusCode::OK {
            // The owner's loader has no value: an answer, not a failure
            if status == StatusCode::NOT_FOUND && body.starts_with(KEY_NOT_FOUND.as_bytes()) {
                return Err(Error::NotFound {
                    key: key.to_string(),
                });
            }
            let mut diagnostic = String::from_utf8_lossy(&body).trim().to_string();
            if diagnostic.len() > MAX_DIAGNOSTIC_LEN {
                let mut end = MAX_DIAGNOSTIC_LEN;
                while !diagnostic.is_char_boundary(end) {
                    end -= 1;
                }
                diagnostic.truncate(end);
            }
            return Err(Error::PeerFetch {
                peer: self.peer.clone(),
                message: format!("status {}: {}", status.as_u16(), diagnostic),
            });
        }

        Ok(body.to_vec())
    }

    fn addr(&self) -> &str {
        &self.peer
    }
}
