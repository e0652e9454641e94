//! Data module for loading and batching MNIST digit images
//!
//! This module provides:
//! - MNIST idx-file loading and normalization to [-1, 1]
//! - DataLoader for shuffled batching

mod loader;
mod mnist;

pub use loader::DataLoader;
pub use mnist::{load_training_images, to_training_images};
