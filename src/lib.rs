//! DIDComm harness: provisioning and connection orchestration for
//! short-lived test agents.
//!
//! This crate starts DIDComm agents with HTTP and WebSocket transports on
//! contention-safe ports, proves their listeners are reachable, records them
//! in an explicit registry and drives the DID exchange handshake between two
//! of them.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain**: identities, transport bindings, options and connection
//!   records with no infrastructure dependencies
//! - **Ports**: trait interfaces for storage, key management, transports and
//!   DID resolution
//! - **Adapters**: concrete implementations of ports (files, memory, HTTP,
//!   WebSocket, remote key servers)
//!
//! # Modules
//!
//! - [`provisioning`]: port allocation, readiness probing, transport
//!   resolution, configuration composition and the agent lifecycle service
//! - [`registry`]: running agents keyed by identity
//! - [`runtime`]: the agent runtime and its ports and adapters
//! - [`didexchange`]: the DID exchange protocol
//! - [`handshake`]: connection establishment between two registered agents
//! - [`config`]: environment-driven harness configuration
//! - [`telemetry`]: tracing subscriber installation

pub mod config;
pub mod didexchange;
pub mod handshake;
pub mod provisioning;
pub mod registry;
pub mod runtime;
pub mod telemetry;
