//! Error types for the DCGAN training library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// A network stage produced a tensor violating the fixed architecture contract
    #[error("shape mismatch at {stage}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        stage: String,
        expected: Vec<i64>,
        actual: Vec<i64>,
    },

    /// A computed loss was NaN or infinite; no parameter update was applied
    #[error("non-finite loss (generator={generator}, discriminator={discriminator}), step aborted")]
    NonFiniteLoss { generator: f64, discriminator: f64 },

    /// A checkpoint record is missing, truncated or incompatible with the live networks
    #[error("checkpoint corrupted at {path}: {reason}")]
    CheckpointCorruption { path: PathBuf, reason: String },

    /// The data pipeline yielded no batches for an epoch
    #[error("data pipeline exhausted: epoch {epoch} produced no batches")]
    PipelineExhausted { epoch: usize },

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Optimizer misuse (gradient/parameter list mismatch)
    #[error("optimizer error: {0}")]
    Optimizer(String),

    /// libtorch error
    #[error("torch error: {0}")]
    Tch(#[from] tch::TchError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Numeric field parsing error (metrics CSV)
    #[error("parse error: {0}")]
    Parse(#[from] std::num::ParseFloatError),
}

impl Error {
    /// Check whether the training loop may continue after this error.
    ///
    /// Non-finite losses abort a single step without corrupting parameters,
    /// so the orchestrator may retry with a fresh batch. Everything else is
    /// fatal to the current operation.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::NonFiniteLoss { .. })
    }

    /// Create a checkpoint corruption error with context
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::CheckpointCorruption {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_finite_is_recoverable() {
        let err = Error::NonFiniteLoss {
            generator: f64::NAN,
            discriminator: 0.5,
        };
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_corruption_is_fatal() {
        let err = Error::corrupt("checkpoints/checkpoint_epoch_0015", "missing generator.pt");
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("checkpoint_epoch_0015"));
    }

    #[test]
    fn test_shape_mismatch_display() {
        let err = Error::ShapeMismatch {
            stage: "conv2".to_string(),
            expected: vec![64, 14, 14],
            actual: vec![64, 13, 13],
        };
        let msg = err.to_string();
        assert!(msg.contains("conv2"));
        assert!(msg.contains("[64, 14, 14]"));
    }
}
