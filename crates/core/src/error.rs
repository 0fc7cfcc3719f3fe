//! Shared error type for the read-along crates

use thiserror::Error;

/// Core errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid word timing data: {0}")]
    InvalidTiming(String),

    #[error("Synthesis failed ({provider}): {message}")]
    Synthesis { provider: String, message: String },

    #[error("Clock source error: {0}")]
    Clock(String),
}

impl Error {
    pub fn synthesis(provider: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Synthesis {
            provider: provider.into(),
            message: message.to_string(),
        }
    }
}
