//! Error types for thicket-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Failed to serialize project tree: {0}")]
    Serialize(#[from] serde_json::Error),
}
