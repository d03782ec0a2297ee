//! Durable storage for the feature table.
//!
//! The registry only needs a single location it can read whole and
//! overwrite whole. `ByteStore` is that contract; `FileByteStore` is the
//! production implementation and `MemoryByteStore` backs ephemeral stores
//! and tests.

use async_trait::async_trait;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

pub mod file;
pub mod table;

pub use file::FileByteStore;
pub use table::{decode_table, encode_table, load_table, FeatureTable};

/// Errors that can occur while reading or writing the feature table
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Stored feature table is corrupt: {reason}")]
    Corrupt { reason: String },
}

/// A single durable location holding the serialized table.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ByteStore: Send + Sync {
    /// Full contents, or `None` when nothing has been written yet.
    async fn read(&self) -> Result<Option<Vec<u8>>, PersistenceError>;

    /// Replace the contents.
    async fn write(&self, bytes: &[u8]) -> Result<(), PersistenceError>;

    /// Human-readable location for logs.
    fn location(&self) -> String;
}

/// In-process byte store. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryByteStore {
    contents: tokio::sync::Mutex<Option<Vec<u8>>>,
}

impl MemoryByteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            contents: tokio::sync::Mutex::new(Some(bytes.into())),
        }
    }
}

#[async_trait]
impl ByteStore for MemoryByteStore {
    async fn read(&self) -> Result<Option<Vec<u8>>, PersistenceError> {
        Ok(self.contents.lock().await.clone())
    }

    async fn write(&self, bytes: &[u8]) -> Result<(), PersistenceError> {
        *self.contents.lock().await = Some(bytes.to_vec());
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
