//! Adapter implementations for the agent runtime ports.

pub mod document_loader;
pub mod kms;
pub mod storage;
pub mod transport;
pub mod vdr;
