pub mod client;
pub mod memory;
pub mod object_store;

pub use client::StorageProxyClient;
pub use memory::MemoryStore;
pub use object_store::{ObjectMetadata, ObjectStore};
// StorageError は errors モジュールで定義済み
pub use crate::errors::StorageError;
