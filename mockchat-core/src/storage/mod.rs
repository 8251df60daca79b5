//! Key-value persistence surface
//!
//! The session store only ever talks to a [`KeyValueStore`]: string keys,
//! string values, no transactions. [`FileStore`] keeps one file per key on
//! disk; [`MemoryStore`] keeps everything in a map and is used by tests.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Durable string key-value store scoped to one client
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> crate::Result<Option<String>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> crate::Result<()>;

    /// Remove a value. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> crate::Result<()>;
}
