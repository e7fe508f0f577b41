//! Key-management backend selection.

use super::ProvisioningDomainError;
use camino::Utf8PathBuf;

/// Settings for a remote (web) key-management server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteKmsSettings {
    server_url: String,
    controller: String,
    vault_id: Option<String>,
    trust_bundle: Option<Utf8PathBuf>,
}

impl RemoteKmsSettings {
    /// Creates remote KMS settings.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningDomainError`] when the server URL lacks an HTTP(S)
    /// prefix or the controller is empty.
    pub fn new(
        server_url: impl Into<String>,
        controller: impl Into<String>,
    ) -> Result<Self, ProvisioningDomainError> {
        let normalized_url = server_url.into().trim().trim_end_matches('/').to_owned();
        let has_valid_prefix =
            normalized_url.starts_with("http://") || normalized_url.starts_with("https://");
        if !has_valid_prefix {
            return Err(ProvisioningDomainError::InvalidKeyServerUrl(normalized_url));
        }

        let normalized_controller = controller.into().trim().to_owned();
        if normalized_controller.is_empty() {
            return Err(ProvisioningDomainError::EmptyController);
        }

        Ok(Self {
            server_url: normalized_url,
            controller: normalized_controller,
            vault_id: None,
            trust_bundle: None,
        })
    }

    /// Sets the encrypted-data-vault identifier sent with keystore creation.
    #[must_use]
    pub fn with_vault_id(mut self, vault_id: impl Into<String>) -> Self {
        self.vault_id = Some(vault_id.into());
        self
    }

    /// Anchors TLS trust to the PEM bundle at `path`.
    #[must_use]
    pub fn with_trust_bundle(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.trust_bundle = Some(path.into());
        self
    }

    /// Returns the key server base URL without a trailing slash.
    #[must_use]
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Returns the keystore controller.
    #[must_use]
    pub fn controller(&self) -> &str {
        &self.controller
    }

    /// Returns the optional vault identifier.
    #[must_use]
    pub fn vault_id(&self) -> Option<&str> {
        self.vault_id.as_deref()
    }

    /// Returns the optional PEM trust bundle path.
    #[must_use]
    pub fn trust_bundle(&self) -> Option<&Utf8PathBuf> {
        self.trust_bundle.as_ref()
    }
}

/// Which key manager backs an agent. Fixed at configuration-build time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum KeyManagementChoice {
    /// Keys live in the agent's own storage.
    #[default]
    Local,
    /// Keys live on a remote key-management server.
    Remote(RemoteKmsSettings),
}
