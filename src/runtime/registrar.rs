//! Registry of custom message services.

use super::envelope::Envelope;
use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors returned by message services.
#[derive(Debug, Clone, Error)]
#[error("message service '{service}' failed: {reason}")]
pub struct MessageServiceError {
    /// Service name.
    pub service: String,
    /// Failure description.
    pub reason: String,
}

/// A handler for inbound messages outside the built-in protocols.
#[async_trait]
pub trait MessageService: Send + Sync {
    /// Returns the unique service name.
    fn name(&self) -> &str;

    /// Returns whether this service handles `message_type`.
    fn accepts(&self, message_type: &str) -> bool;

    /// Handles an inbound envelope.
    async fn handle(&self, envelope: Envelope) -> Result<(), MessageServiceError>;
}

/// Errors returned by [`MessageRegistrar`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrarError {
    /// A service with the same name is already registered.
    #[error("message service '{0}' is already registered")]
    DuplicateService(String),

    /// No service with this name is registered.
    #[error("message service '{0}' is not registered")]
    UnknownService(String),

    /// The service table lock was poisoned.
    #[error("message registrar lock poisoned")]
    LockPoisoned,
}

/// Message services an agent routes unrecognised messages to.
#[derive(Default)]
pub struct MessageRegistrar {
    services: RwLock<Vec<Arc<dyn MessageService>>>,
}

impl MessageRegistrar {
    /// Creates an empty registrar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `service`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrarError::DuplicateService`] when the name is taken.
    pub fn register(&self, service: Arc<dyn MessageService>) -> Result<(), RegistrarError> {
        let mut services = self
            .services
            .write()
            .map_err(|_| RegistrarError::LockPoisoned)?;
        if services.iter().any(|existing| existing.name() == service.name()) {
            return Err(RegistrarError::DuplicateService(service.name().to_owned()));
        }
        services.push(service);
        Ok(())
    }

    /// Removes the service called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrarError::UnknownService`] when nothing is registered
    /// under `name`.
    pub fn unregister(&self, name: &str) -> Result<(), RegistrarError> {
        let mut services = self
            .services
            .write()
            .map_err(|_| RegistrarError::LockPoisoned)?;
        let before = services.len();
        services.retain(|service| service.name() != name);
        if services.len() == before {
            return Err(RegistrarError::UnknownService(name.to_owned()));
        }
        Ok(())
    }

    /// Returns the first service accepting `message_type`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrarError::LockPoisoned`] if the table is unusable.
    pub fn find(&self, message_type: &str) -> Result<Option<Arc<dyn MessageService>>, RegistrarError> {
        let services = self
            .services
            .read()
            .map_err(|_| RegistrarError::LockPoisoned)?;
        Ok(services
            .iter()
            .find(|service| service.accepts(message_type))
            .cloned())
    }

    /// Returns the names of all registered services.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrarError::LockPoisoned`] if the table is unusable.
    pub fn service_names(&self) -> Result<Vec<String>, RegistrarError> {
        let services = self
            .services
            .read()
            .map_err(|_| RegistrarError::LockPoisoned)?;
        Ok(services.iter().map(|service| service.name().to_owned()).collect())
    }
}

impl std::fmt::Debug for MessageRegistrar {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("MessageRegistrar")
            .field("services", &self.service_names().unwrap_or_default())
            .finish()
    }
}
