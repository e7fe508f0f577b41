//! Remote key manager speaking the web KMS REST protocol.
//!
//! Keystores are created under a controller with `POST {server}/v1/keystores`;
//! the keystore URL comes back in the `Location` header. Keys live under
//! `{keystore}/keys/{kid}` with `export` and `sign` sub-resources. Binary
//! payloads are base64url without padding.

use crate::provisioning::domain::KeyType;
use crate::runtime::ports::{Crypto, KeyHandle, KeyManager, KmsError, KmsResult};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use reqwest::header::LOCATION;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct CreateKeystoreRequest<'a> {
    controller: &'a str,
    #[serde(rename = "vaultID", skip_serializing_if = "Option::is_none")]
    vault_id: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateKeyRequest<'a> {
    key_type: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicKeyResponse {
    public_key: String,
}

#[derive(Serialize)]
struct SignRequest {
    message: String,
}

#[derive(Deserialize)]
struct SignResponse {
    signature: String,
}

/// Builds the HTTP client used to reach a key server.
///
/// When `trust_bundle` is set, the PEM certificate it contains is added as a
/// trust anchor.
///
/// # Errors
///
/// Returns [`KmsError::Transport`] when the bundle cannot be read or parsed or
/// the client cannot be built.
pub fn key_server_client(trust_bundle: Option<&Utf8Path>) -> KmsResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(path) = trust_bundle {
        let pem = read_bundle(path)?;
        let certificate = reqwest::Certificate::from_pem(&pem).map_err(KmsError::transport)?;
        builder = builder.add_root_certificate(certificate);
    }
    builder.build().map_err(KmsError::transport)
}

fn read_bundle(path: &Utf8Path) -> KmsResult<Vec<u8>> {
    let parent = path
        .parent()
        .filter(|candidate| !candidate.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path.file_name().ok_or_else(|| {
        KmsError::transport(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("trust bundle path {path} has no file name"),
        ))
    })?;
    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(KmsError::transport)?;
    dir.read(file_name).map_err(KmsError::transport)
}

fn location_of(response: &reqwest::Response, base: &str, url: &str) -> KmsResult<String> {
    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| KmsError::RemoteProtocol {
            url: url.to_owned(),
            reason: "missing Location header".to_owned(),
        })?;

    if location.starts_with('/') {
        Ok(format!("{}{location}", origin_of(base)))
    } else {
        Ok(location.to_owned())
    }
}

fn origin_of(url: &str) -> &str {
    let after_scheme = url.find("://").map_or(0, |index| index + 3);
    match url.get(after_scheme..).and_then(|rest| rest.find('/')) {
        Some(offset) => url.get(..after_scheme + offset).unwrap_or(url),
        None => url,
    }
}

fn ensure_success(response: &reqwest::Response, url: &str) -> KmsResult<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(KmsError::RemoteStatus {
            url: url.to_owned(),
            status: status.as_u16(),
        })
    }
}

fn decode(field: &str, value: &str, url: &str) -> KmsResult<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|err| KmsError::RemoteProtocol {
            url: url.to_owned(),
            reason: format!("{field} is not base64url: {err}"),
        })
}

/// Creates a keystore for `controller` and returns its URL.
///
/// # Errors
///
/// Returns [`KmsError`] when the server is unreachable, rejects the request or
/// omits the `Location` header.
pub async fn create_keystore(
    client: &reqwest::Client,
    server_url: &str,
    controller: &str,
    vault_id: Option<&str>,
) -> KmsResult<String> {
    let url = format!("{}/v1/keystores", server_url.trim_end_matches('/'));
    let response = client
        .post(&url)
        .json(&CreateKeystoreRequest {
            controller,
            vault_id,
        })
        .send()
        .await
        .map_err(KmsError::transport)?;
    ensure_success(&response, &url)?;
    let keystore_url = location_of(&response, server_url, &url)?;
    tracing::debug!(keystore_url = %keystore_url, controller, "created remote keystore");
    Ok(keystore_url)
}

/// Key manager delegating to a remote keystore.
#[derive(Debug, Clone)]
pub struct RemoteKeyManager {
    keystore_url: String,
    client: reqwest::Client,
}

impl RemoteKeyManager {
    /// Creates a key manager for the keystore at `keystore_url`.
    #[must_use]
    pub fn new(keystore_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            keystore_url: keystore_url.into(),
            client,
        }
    }

    /// Returns the keystore URL.
    #[must_use]
    pub fn keystore_url(&self) -> &str {
        &self.keystore_url
    }
}

#[async_trait]
impl KeyManager for RemoteKeyManager {
    async fn create(&self, key_type: KeyType) -> KmsResult<KeyHandle> {
        let url = format!("{}/keys", self.keystore_url);
        let response = self
            .client
            .post(&url)
            .json(&CreateKeyRequest {
                key_type: key_type.as_str(),
            })
            .send()
            .await
            .map_err(KmsError::transport)?;
        ensure_success(&response, &url)?;

        let key_url = location_of(&response, &self.keystore_url, &url)?;
        let kid = key_url
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| KmsError::RemoteProtocol {
                url: url.clone(),
                reason: format!("key location {key_url} has no key id"),
            })?
            .to_owned();
        let body: PublicKeyResponse = response.json().await.map_err(KmsError::transport)?;
        let public_key = decode("publicKey", &body.public_key, &url)?;

        Ok(KeyHandle::new(kid, key_type, public_key))
    }

    async fn export_public_key(&self, kid: &str) -> KmsResult<Vec<u8>> {
        let url = format!("{}/keys/{kid}/export", self.keystore_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(KmsError::transport)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(KmsError::KeyNotFound(kid.to_owned()));
        }
        ensure_success(&response, &url)?;
        let body: PublicKeyResponse = response.json().await.map_err(KmsError::transport)?;
        decode("publicKey", &body.public_key, &url)
    }
}

/// Crypto client signing with keys held in a remote keystore.
#[derive(Debug, Clone)]
pub struct RemoteCrypto {
    keystore_url: String,
    client: reqwest::Client,
}

impl RemoteCrypto {
    /// Creates a crypto client for the keystore at `keystore_url`.
    #[must_use]
    pub fn new(keystore_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            keystore_url: keystore_url.into(),
            client,
        }
    }
}

#[async_trait]
impl Crypto for RemoteCrypto {
    async fn sign(&self, message: &[u8], kid: &str) -> KmsResult<Vec<u8>> {
        let url = format!("{}/keys/{kid}/sign", self.keystore_url);
        let response = self
            .client
            .post(&url)
            .json(&SignRequest {
                message: URL_SAFE_NO_PAD.encode(message),
            })
            .send()
            .await
            .map_err(KmsError::transport)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(KmsError::KeyNotFound(kid.to_owned()));
        }
        ensure_success(&response, &url)?;
        let body: SignResponse = response.json().await.map_err(KmsError::transport)?;
        decode("signature", &body.signature, &url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://kms.example.com/v1/keystores", "https://kms.example.com")]
    #[case("http://localhost:8076", "http://localhost:8076")]
    fn origin_strips_path(#[case] url: &str, #[case] expected: &str) {
        assert_eq!(origin_of(url), expected);
    }

    #[rstest]
    fn missing_trust_bundle_is_a_transport_error() {
        let result = key_server_client(Some(Utf8Path::new("does/not/exist/ec-pubCert.pem")));
        assert!(matches!(result, Err(KmsError::Transport(_))));
    }

    #[rstest]
    #[tokio::test]
    async fn unreachable_server_fails_keystore_creation() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
        let port = listener
            .local_addr()
            .expect("listener should have an address")
            .port();
        drop(listener);

        let client = key_server_client(None).expect("client should build");
        let result = create_keystore(
            &client,
            &format!("http://127.0.0.1:{port}"),
            "did:example:controller",
            None,
        )
        .await;

        assert!(matches!(result, Err(KmsError::Transport(_))));
    }
}
