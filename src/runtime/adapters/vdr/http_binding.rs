//! Resolver backed by a universal-resolver style HTTP endpoint.

use crate::runtime::did::{DidDocument, did_method};
use crate::runtime::ports::{DidResolver, VdrError, VdrResult};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

/// Resolves DIDs of one method via `GET {url}/{did}`.
///
/// Responses may be either a bare DID document or a resolution result
/// wrapping it under `didDocument`.
#[derive(Debug, Clone)]
pub struct HttpBindingResolver {
    url: String,
    method: String,
    client: reqwest::Client,
}

impl HttpBindingResolver {
    /// Creates a resolver for DIDs of `method` served at `url`.
    #[must_use]
    pub fn new(url: &str, method: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.trim_end_matches('/').to_owned(),
            method: method.into(),
            client,
        }
    }

    /// Returns the resolver base URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DidResolver for HttpBindingResolver {
    fn accepts(&self, method: &str) -> bool {
        self.method == method
    }

    async fn resolve(&self, did: &str) -> VdrResult<DidDocument> {
        let method = did_method(did).ok_or_else(|| VdrError::MalformedDid(did.to_owned()))?;
        if !self.accepts(method) {
            return Err(VdrError::UnsupportedMethod(method.to_owned()));
        }

        let resolution_error = |reason: String| VdrError::Resolution {
            did: did.to_owned(),
            reason,
        };
        let response = self
            .client
            .get(format!("{}/{did}", self.url))
            .send()
            .await
            .map_err(|err| resolution_error(err.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(VdrError::NotFound(did.to_owned())),
            status if !status.is_success() => {
                return Err(resolution_error(format!("unexpected status {status}")));
            }
            _ => {}
        }

        let mut body: Value = response
            .json()
            .await
            .map_err(|err| resolution_error(err.to_string()))?;
        let document = match body.get_mut("didDocument") {
            Some(inner) => inner.take(),
            None => body,
        };
        serde_json::from_value(document).map_err(|err| resolution_error(err.to_string()))
    }
}
