//! Port contracts consumed by the agent runtime.

mod kms;
mod storage;
mod transport;
mod vdr;

pub use kms::{Crypto, KeyBackend, KeyHandle, KeyManager, KmsError, KmsResult, verify_ed25519};
pub use storage::{
    StorageError, StorageProvider, StorageResult, Store, get_json, put_json, validate_namespace,
};
pub use transport::{
    InboundMessage, InboundSender, InboundTransport, ListenerHandle, OutboundTransport,
    TransportError, TransportResult,
};
pub use vdr::{DidResolver, VdrError, VdrResult};
