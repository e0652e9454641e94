//! # DCGAN for Handwritten Digits
//!
//! This crate provides a modular implementation of Deep Convolutional
//! Generative Adversarial Networks (DCGAN) for synthesizing MNIST-style
//! digit images from random noise.
//!
//! ## Modules
//!
//! - `data`: MNIST loading, normalization and batching
//! - `model`: DCGAN architecture (Generator and Discriminator)
//! - `training`: Training step, epoch loop, losses and optimizers
//! - `utils`: Configuration, checkpointing and sample grids

pub mod data;
pub mod error;
pub mod model;
pub mod training;
pub mod utils;

pub use data::{load_training_images, DataLoader};
pub use error::{Error, Result};
pub use model::{Discriminator, Generator, DCGAN};
pub use training::{train_step, Adam, Trainer, TrainingConfig, TrainingMetrics};
pub use utils::{find_latest_checkpoint, restore_checkpoint, save_checkpoint, Config};
