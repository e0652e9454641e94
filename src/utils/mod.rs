//! Utility module with helper functions
//!
//! This module provides:
//! - Configuration handling
//! - Checkpoint save/load utilities
//! - Fixed-noise sampling to image grids

mod checkpoint;
mod config;
mod sample;

pub use checkpoint::{
    find_latest_checkpoint, list_checkpoints, load_checkpoint_meta, load_model_weights,
    restore_checkpoint, save_checkpoint, CheckpointMeta,
};
pub use config::Config;
pub use sample::{image_grid, sample_images, save_sample_grid, GRID_SIDE};
