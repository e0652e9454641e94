//! Configuration management
//!
//! Provides unified configuration for the entire training pipeline.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data configuration
    pub data: DataConfig,
    /// Model configuration
    pub model: ModelConfig,
    /// Training configuration
    pub training: TrainingSection,
}

/// Data-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding the MNIST idx files
    pub data_dir: String,
    /// Batch size
    pub batch_size: usize,
}

/// Model-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Latent dimension size
    pub latent_dim: i64,
    /// Base filters for generator
    pub gen_base_filters: i64,
    /// Base filters for discriminator
    pub disc_base_filters: i64,
    /// Dropout rate for discriminator
    pub dropout: f64,
    /// Negative slope shared by both networks' leaky rectifiers
    pub leaky_slope: f64,
}

/// Training-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSection {
    /// Number of epochs
    pub epochs: usize,
    /// Generator learning rate
    pub gen_lr: f64,
    /// Discriminator learning rate
    pub disc_lr: f64,
    /// Checkpoint save frequency (epochs)
    pub checkpoint_every: usize,
    /// Checkpoint directory
    pub checkpoint_dir: String,
    /// Sample grid output directory
    pub sample_dir: String,
    /// Device: "cpu" or "cuda"
    pub device: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig {
                data_dir: "data".to_string(),
                batch_size: 256,
            },
            model: ModelConfig {
                latent_dim: 100,
                gen_base_filters: 256,
                disc_base_filters: 64,
                dropout: 0.3,
                leaky_slope: 0.2,
            },
            training: TrainingSection {
                epochs: 50,
                gen_lr: 1e-4,
                disc_lr: 1e-4,
                checkpoint_every: 15,
                checkpoint_dir: "checkpoints".to_string(),
                sample_dir: "samples".to_string(),
                device: "cpu".to_string(),
            },
        }
    }
}

impl Config {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from TOML file
    pub fn from_toml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from JSON file
    pub fn from_json(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from a path, dispatching on the extension
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.extension().and_then(|e| e.to_str()) == Some("toml") {
            Self::from_toml(path)
        } else {
            Self::from_json(path)
        }
    }

    /// Get device from configuration
    pub fn get_device(&self) -> tch::Device {
        match self.training.device.to_lowercase().as_str() {
            "cuda" | "gpu" => {
                if tch::Cuda::is_available() {
                    tch::Device::Cuda(0)
                } else {
                    tracing::warn!("CUDA requested but not available, falling back to CPU");
                    tch::Device::Cpu
                }
            }
            _ => tch::Device::Cpu,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.data.batch_size == 0 {
            return Err(Error::Config("batch size must be > 0".to_string()));
        }
        if self.model.latent_dim <= 0 {
            return Err(Error::Config("latent dimension must be > 0".to_string()));
        }
        if self.model.gen_base_filters % 4 != 0 {
            return Err(Error::Config(
                "generator base filters must be divisible by 4".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.model.dropout) {
            return Err(Error::Config("dropout must be in [0, 1)".to_string()));
        }
        if self.training.epochs == 0 {
            return Err(Error::Config("number of epochs must be > 0".to_string()));
        }
        if self.training.checkpoint_every == 0 {
            return Err(Error::Config(
                "checkpoint interval must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
