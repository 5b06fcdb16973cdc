//! Error types for the simulation.
//!
//! Only initialization and snapshot export can fail. The per-tick hot loop has
//! no recoverable error path.

use thiserror::Error;

/// Result type for fallible simulation operations
pub type SlimeResult<T> = Result<T, SlimeError>;

#[derive(Debug, Error)]
pub enum SlimeError {
    /// Rejected before any buffer is allocated.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to allocate {what} ({bytes} bytes)")]
    Allocation { what: &'static str, bytes: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("configuration parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SlimeError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        SlimeError::InvalidConfig(msg.into())
    }
}

/// Allocate a zero-filled vector, reporting allocation failure instead of aborting.
pub(crate) fn try_alloc<T: Clone + Default>(len: usize, what: &'static str) -> SlimeResult<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| SlimeError::Allocation {
        what,
        bytes: len.saturating_mul(std::mem::size_of::<T>()),
    })?;
    v.resize(len, T::default());
    Ok(v)
}
