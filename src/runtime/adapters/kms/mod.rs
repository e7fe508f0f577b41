//! Key-management adapters: local (storage-backed) and remote (web KMS).

#[cfg(test)]
pub(crate) mod fake_key_server;
mod local;
mod remote;

pub use local::LocalKms;
pub use remote::{RemoteCrypto, RemoteKeyManager, create_keystore, key_server_client};
