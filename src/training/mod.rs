//! Training module for DCGAN
//!
//! This module provides:
//! - The per-batch training step and epoch loop
//! - Loss functions (Binary Cross Entropy on logits)
//! - Adam optimizers with serializable state
//! - Training metrics

mod losses;
mod metrics;
mod optimizer;
mod trainer;

pub use losses::{discriminator_loss, generator_loss};
pub use metrics::TrainingMetrics;
pub use optimizer::Adam;
pub use trainer::{train_step, StepStats, Trainer, TrainingConfig};
