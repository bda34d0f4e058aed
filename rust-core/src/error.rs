//! Error types for the STFT engine
//!
//! Two failure classes matter to callers: length errors, which are fixed at
//! configuration time, and transform failures, which are per-block and
//! recoverable on the next block.

use crate::config::ChannelId;
use thiserror::Error;

/// Failure reported by a spectral transform backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// Backend could not be prepared for the requested length
    #[error("transform init failed for length {len}: {reason}")]
    Init { len: usize, reason: String },

    /// Forward transform failed on a block
    #[error("forward transform failed: {0}")]
    Process(String),
}

/// Errors produced by the window provider, pipelines and engine
#[derive(Error, Debug)]
pub enum StftError {
    /// Block length is zero, odd, or not a power of two
    #[error("invalid block length {len}: {reason}")]
    InvalidLength { len: usize, reason: &'static str },

    /// Buffer length disagrees with the configured block length
    #[error("invalid length: expected {expected} samples, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// No fresh spectrum is available for this block
    #[error("transform failure: {0}")]
    TransformFailure(#[from] TransformError),

    /// Channel id not present in the engine
    #[error("unknown channel {0}")]
    UnknownChannel(ChannelId),

    /// Channel id configured more than once
    #[error("duplicate channel {0}")]
    DuplicateChannel(ChannelId),

    /// Configuration text could not be parsed
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl StftError {
    /// True for errors the caller should retry with the next block
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StftError::TransformFailure(_))
    }

    /// True for both forms of length error
    pub fn is_length_error(&self) -> bool {
        matches!(
            self,
            StftError::InvalidLength { .. } | StftError::LengthMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, StftError>;
