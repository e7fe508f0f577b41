//! Storage adapters: in-memory, file-backed and cached.

mod cached;
mod file;
mod memory;

pub use cached::CachedStorageProvider;
pub use file::FileStorageProvider;
pub use memory::MemStorageProvider;
