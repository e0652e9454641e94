//! DCGAN wrapper combining Generator and Discriminator
//!
//! Owns the two parameter stores. The stores are disjoint by construction:
//! the only coupling between the networks during training is the logits
//! exchanged inside a step.

use std::path::Path;

use tch::{nn::VarStore, Device, Kind, Tensor};

use super::{Discriminator, DiscriminatorConfig, Generator, GeneratorConfig};
use crate::error::Result;

/// Complete DCGAN model
pub struct DCGAN {
    /// Generator network
    pub generator: Generator,
    /// Discriminator network
    pub discriminator: Discriminator,
    /// Variable store for generator
    pub gen_vs: VarStore,
    /// Variable store for discriminator
    pub disc_vs: VarStore,
    /// Device (CPU/GPU)
    pub device: Device,
}

impl DCGAN {
    /// Create a new DCGAN model
    ///
    /// # Arguments
    ///
    /// * `gen_config` - Generator configuration
    /// * `disc_config` - Discriminator configuration
    /// * `device` - Device to create model on
    pub fn new(
        gen_config: GeneratorConfig,
        disc_config: DiscriminatorConfig,
        device: Device,
    ) -> Result<Self> {
        let gen_vs = VarStore::new(device);
        let disc_vs = VarStore::new(device);

        let generator = Generator::new(&gen_vs.root(), gen_config)?;
        let discriminator = Discriminator::new(&disc_vs.root(), disc_config)?;

        Ok(Self {
            generator,
            discriminator,
            gen_vs,
            disc_vs,
            device,
        })
    }

    /// Create DCGAN with default architecture for a given latent dimension
    pub fn with_defaults(latent_dim: i64, device: Device) -> Result<Self> {
        let gen_config = GeneratorConfig {
            latent_dim,
            ..Default::default()
        };
        Self::new(gen_config, DiscriminatorConfig::default(), device)
    }

    /// Generate synthetic images from freshly drawn noise
    ///
    /// # Returns
    ///
    /// Tensor of shape (num_samples, 28, 28, 1)
    pub fn generate(&self, num_samples: i64) -> Tensor {
        let noise = Tensor::randn(
            [num_samples, self.latent_dim()],
            (Kind::Float, self.device),
        );
        self.generator.generate(&noise)
    }

    /// Save raw network weights (including batch-norm running statistics)
    pub fn save_weights(
        &self,
        gen_path: impl AsRef<Path>,
        disc_path: impl AsRef<Path>,
    ) -> Result<()> {
        self.gen_vs.save(gen_path)?;
        self.disc_vs.save(disc_path)?;
        Ok(())
    }

    /// Load raw network weights
    pub fn load_weights(
        &mut self,
        gen_path: impl AsRef<Path>,
        disc_path: impl AsRef<Path>,
    ) -> Result<()> {
        self.gen_vs.load(gen_path)?;
        self.disc_vs.load(disc_path)?;
        Ok(())
    }

    /// Get latent dimension
    pub fn latent_dim(&self) -> i64 {
        self.generator.config().latent_dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dcgan_creation() {
        let dcgan = DCGAN::with_defaults(100, Device::Cpu).unwrap();
        assert_eq!(dcgan.latent_dim(), 100);
    }

    #[test]
    fn test_dcgan_generate() {
        let dcgan = DCGAN::with_defaults(100, Device::Cpu).unwrap();
        let samples = dcgan.generate(4);
        assert_eq!(samples.size(), vec![4, 28, 28, 1]);
    }

    #[test]
    fn test_parameter_stores_are_disjoint() {
        let dcgan = DCGAN::with_defaults(100, Device::Cpu).unwrap();

        let gen_vars = dcgan.gen_vs.variables();
        let disc_vars = dcgan.disc_vs.variables();

        // Same layer names may appear in both stores, but storage is never shared
        for (name, gen_var) in &gen_vars {
            if let Some(disc_var) = disc_vars.get(name) {
                assert!(
                    gen_var.data_ptr() != disc_var.data_ptr(),
                    "parameter {name} aliased between networks"
                );
            }
        }
    }
}
