//! DID exchange: invitation, request, response and completion between two
//! agents, with connection records persisted in agent storage.

pub mod domain;
mod service;

pub use service::{DidExchangeClient, DidExchangeError};
