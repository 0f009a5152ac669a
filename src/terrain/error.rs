//! Error types shared by every terrain operation.

use thiserror::Error;

/// Failures reported by the terrain core.
///
/// All variants are local and recoverable. Parameter validation runs before
/// any cell is written, except for the erosion variants which mutate the
/// grid as they go.
#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("cell ({x}, {y}) is outside the {width}x{height} grid")]
    OutOfBounds {
        x: i64,
        y: i64,
        width: usize,
        height: usize,
    },

    #[error("at least one {0} is required")]
    EmptyLayerSet(&'static str),

    #[error("canyon crawler exceeded its work stack limit of {limit} frames")]
    RecursionLimitExceeded { limit: usize },

    #[error("malformed terrain configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl TerrainError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TerrainError>;
