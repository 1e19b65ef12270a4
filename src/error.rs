//! Crate-level error types

use crate::registry::RegistryError;

/// Top-level error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket or listener failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Registry operation failure
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Convenience result alias
pub type Result<T> = std::result::Result<T, Error>;
