//! Discriminator network for DCGAN
//!
//! The Discriminator classifies digit images as real or fake.
//! Architecture uses strided 2D convolutions to downsample and extract features.

use tch::{nn, nn::Module, nn::ModuleT, Device, Kind, Tensor};

use super::{expect_shape, leaky_relu, IMG_CHANNELS, IMG_SIZE, INIT_SIZE};
use crate::error::Result;

/// Discriminator network configuration
#[derive(Debug, Clone)]
pub struct DiscriminatorConfig {
    /// Base number of filters
    pub base_filters: i64,
    /// Dropout rate (training mode only)
    pub dropout: f64,
    /// Negative slope for the leaky rectifier
    pub leaky_slope: f64,
}

impl Default for DiscriminatorConfig {
    fn default() -> Self {
        Self {
            base_filters: 64,
            dropout: 0.3,
            leaky_slope: 0.2,
        }
    }
}

/// Discriminator network
///
/// Architecture:
/// 1. Two strided Conv2d layers with LeakyReLU and Dropout (28x28 -> 14x14 -> 7x7)
/// 2. Flatten and Dense layer producing one raw logit per image
///
/// Higher logits mean "more real". No sigmoid is applied so loss functions
/// operate directly on raw scores.
#[derive(Debug)]
pub struct Discriminator {
    config: DiscriminatorConfig,
    conv1: nn::Conv2D,
    conv2: nn::Conv2D,
    /// Final classification layer
    fc: nn::Linear,
}

impl Discriminator {
    /// Create a new Discriminator network.
    ///
    /// Runs a shape probe and fails with [`crate::Error::ShapeMismatch`] if
    /// the (14,14,64) -> (7,7,128) -> scalar-logit contract is violated.
    pub fn new(vs: &nn::Path, config: DiscriminatorConfig) -> Result<Self> {
        let base = config.base_filters;

        let conv_config = nn::ConvConfig {
            stride: 2,
            padding: 2,
            ..Default::default()
        };
        let conv1 = nn::conv2d(vs / "conv1", IMG_CHANNELS, base, 5, conv_config);
        let conv2 = nn::conv2d(vs / "conv2", base, base * 2, 5, conv_config);

        let flat_size = base * 2 * INIT_SIZE * INIT_SIZE;
        let fc = nn::linear(vs / "fc", flat_size, 1, Default::default());

        let discriminator = Self {
            config,
            conv1,
            conv2,
            fc,
        };
        discriminator.shape_probe(vs.device())?;
        Ok(discriminator)
    }

    /// Forward pass
    ///
    /// # Arguments
    ///
    /// * `input` - Tensor of shape (batch_size, 28, 28, 1)
    /// * `train` - Whether in training mode (affects dropout)
    ///
    /// # Returns
    ///
    /// Tensor of shape (batch_size, 1) with logits (not sigmoid)
    pub fn forward_t(&self, input: &Tensor, train: bool) -> Tensor {
        let slope = self.config.leaky_slope;

        // Channel-first for Conv2D
        let x = input.permute([0, 3, 1, 2]);

        let x = leaky_relu(&self.conv1.forward(&x), slope);
        let x = x.dropout(self.config.dropout, train);

        let x = leaky_relu(&self.conv2.forward(&x), slope);
        let x = x.dropout(self.config.dropout, train);

        let batch_size = x.size()[0];
        let x = x.reshape([batch_size, -1]);

        self.fc.forward(&x)
    }

    /// Get configuration
    pub fn config(&self) -> &DiscriminatorConfig {
        &self.config
    }

    fn shape_probe(&self, device: Device) -> Result<()> {
        let base = self.config.base_filters;
        tch::no_grad(|| {
            let input = Tensor::zeros([2, IMG_SIZE, IMG_SIZE, IMG_CHANNELS], (Kind::Float, device));
            let x = input.permute([0, 3, 1, 2]);
            let x = self.conv1.forward(&x);
            expect_shape("conv1", &x, &[base, IMG_SIZE / 2, IMG_SIZE / 2])?;
            let x = self.conv2.forward(&leaky_relu(&x, self.config.leaky_slope));
            expect_shape("conv2", &x, &[base * 2, INIT_SIZE, INIT_SIZE])?;
            let x = self.fc.forward(&leaky_relu(&x, self.config.leaky_slope).reshape([2, -1]));
            expect_shape("fc", &x, &[1])?;
            Ok(())
        })
    }
}

impl ModuleT for Discriminator {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        Discriminator::forward_t(self, xs, train)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::nn::VarStore;

    #[test]
    fn test_discriminator_output_shape() {
        let vs = VarStore::new(Device::Cpu);
        let disc = Discriminator::new(&vs.root(), DiscriminatorConfig::default()).unwrap();

        let input = Tensor::randn([4, 28, 28, 1], (Kind::Float, Device::Cpu));
        let output = disc.forward_t(&input, false);

        assert_eq!(output.size(), vec![4, 1]);
    }

    #[test]
    fn test_discriminator_inference_is_deterministic() {
        // Dropout must be inert outside training mode
        let vs = VarStore::new(Device::Cpu);
        let disc = Discriminator::new(&vs.root(), DiscriminatorConfig::default()).unwrap();

        let input = Tensor::randn([4, 28, 28, 1], (Kind::Float, Device::Cpu));
        let a = disc.forward_t(&input, false);
        let b = disc.forward_t(&input, false);

        assert!(a.equal(&b));
    }
}
