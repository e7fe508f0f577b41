//! Agent provisioning: transports, readiness and configuration.
//!
//! This module turns a caller's request for an agent into a running, reachable
//! agent recorded in the [`crate::registry::AgentRegistry`]. It follows
//! hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
