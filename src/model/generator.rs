//! Generator network for DCGAN
//!
//! The Generator transforms random noise vectors into synthetic digit images.
//! Architecture uses transposed 2D convolutions to upsample from latent space.

use tch::{nn, nn::Module, nn::ModuleT, Device, Kind, Tensor};

use super::{expect_shape, leaky_relu, IMG_CHANNELS, IMG_SIZE, INIT_SIZE};
use crate::error::Result;

/// Generator network configuration
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Size of the latent noise vector
    pub latent_dim: i64,
    /// Channel count of the initial 7x7 feature map
    pub base_filters: i64,
    /// Negative slope for the leaky rectifier
    pub leaky_slope: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            latent_dim: 100,
            base_filters: 256,
            leaky_slope: 0.2,
        }
    }
}

/// Generator network
///
/// Architecture:
/// 1. Dense projection (no bias) from latent space to a 7x7x256 feature map
/// 2. Two ConvTranspose2d stages with BatchNorm and LeakyReLU (7x7 -> 7x7 -> 14x14)
/// 3. Final ConvTranspose2d to 28x28x1 with Tanh activation
///
/// Inputs and outputs use height x width x channel layout; the network
/// operates channel-first internally.
#[derive(Debug)]
pub struct Generator {
    config: GeneratorConfig,
    /// Initial dense projection
    fc: nn::Linear,
    bn0: nn::BatchNorm,
    /// Transposed convolution layers
    conv1: nn::ConvTranspose2D,
    bn1: nn::BatchNorm,
    conv2: nn::ConvTranspose2D,
    bn2: nn::BatchNorm,
    conv3: nn::ConvTranspose2D,
}

impl Generator {
    /// Create a new Generator network.
    ///
    /// Runs a shape probe over the fixed computational graph and fails with
    /// [`crate::Error::ShapeMismatch`] if any stage deviates from the
    /// (7,7,256) -> (7,7,128) -> (14,14,64) -> (28,28,1) contract.
    pub fn new(vs: &nn::Path, config: GeneratorConfig) -> Result<Self> {
        let base = config.base_filters;
        let init_size = base * INIT_SIZE * INIT_SIZE;

        let linear_config = nn::LinearConfig {
            bias: false,
            ..Default::default()
        };
        let fc = nn::linear(vs / "fc", config.latent_dim, init_size, linear_config);
        let bn0 = nn::batch_norm1d(vs / "bn0", init_size, Default::default());

        // Stride-1 stage keeps the 7x7 extent
        let same_config = nn::ConvTransposeConfig {
            stride: 1,
            padding: 2,
            bias: false,
            ..Default::default()
        };
        let conv1 = nn::conv_transpose2d(vs / "conv1", base, base / 2, 5, same_config);
        let bn1 = nn::batch_norm2d(vs / "bn1", base / 2, Default::default());

        // Stride-2 stages double the spatial extent
        let up_config = nn::ConvTransposeConfig {
            stride: 2,
            padding: 2,
            output_padding: 1,
            bias: false,
            ..Default::default()
        };
        let conv2 = nn::conv_transpose2d(vs / "conv2", base / 2, base / 4, 5, up_config);
        let bn2 = nn::batch_norm2d(vs / "bn2", base / 4, Default::default());

        let conv3 = nn::conv_transpose2d(vs / "conv3", base / 4, IMG_CHANNELS, 5, up_config);

        let generator = Self {
            config,
            fc,
            bn0,
            conv1,
            bn1,
            conv2,
            bn2,
            conv3,
        };
        generator.shape_probe(vs.device())?;
        Ok(generator)
    }

    /// Generate synthetic images from noise
    ///
    /// # Arguments
    ///
    /// * `noise` - Tensor of shape (batch_size, latent_dim)
    /// * `train` - Whether in training mode (affects batch norm running stats)
    ///
    /// # Returns
    ///
    /// Tensor of shape (batch_size, 28, 28, 1) with values in [-1, 1]
    pub fn forward_t(&self, noise: &Tensor, train: bool) -> Tensor {
        let base = self.config.base_filters;
        let slope = self.config.leaky_slope;

        let x = self.fc.forward(noise);
        let x = leaky_relu(&self.bn0.forward_t(&x, train), slope);
        let x = x.view([-1, base, INIT_SIZE, INIT_SIZE]);

        let x = self.conv1.forward(&x);
        let x = leaky_relu(&self.bn1.forward_t(&x, train), slope);

        let x = self.conv2.forward(&x);
        let x = leaky_relu(&self.bn2.forward_t(&x, train), slope);

        let x = self.conv3.forward(&x).tanh();

        x.permute([0, 2, 3, 1])
    }

    /// Generate images (inference mode)
    pub fn generate(&self, noise: &Tensor) -> Tensor {
        self.forward_t(noise, false)
    }

    /// Get configuration
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Verify every stage of the fixed graph against its contracted shape.
    ///
    /// Runs in inference mode under `no_grad` so the probe never touches
    /// batch-norm running statistics.
    fn shape_probe(&self, device: Device) -> Result<()> {
        let base = self.config.base_filters;
        let slope = self.config.leaky_slope;
        tch::no_grad(|| {
            let noise = Tensor::zeros([2, self.config.latent_dim], (Kind::Float, device));
            let x = self.fc.forward(&noise);
            expect_shape("fc", &x, &[base * INIT_SIZE * INIT_SIZE])?;
            let x = leaky_relu(&self.bn0.forward_t(&x, false), slope)
                .view([-1, base, INIT_SIZE, INIT_SIZE]);
            expect_shape("reshape", &x, &[base, INIT_SIZE, INIT_SIZE])?;
            let x = self.conv1.forward(&x);
            expect_shape("conv1", &x, &[base / 2, INIT_SIZE, INIT_SIZE])?;
            let x = self.conv2.forward(&leaky_relu(&self.bn1.forward_t(&x, false), slope));
            expect_shape("conv2", &x, &[base / 4, IMG_SIZE / 2, IMG_SIZE / 2])?;
            let x = self.conv3.forward(&leaky_relu(&self.bn2.forward_t(&x, false), slope));
            expect_shape("conv3", &x, &[IMG_CHANNELS, IMG_SIZE, IMG_SIZE])?;
            Ok(())
        })
    }
}

impl ModuleT for Generator {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        Generator::forward_t(self, xs, train)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::nn::VarStore;

    #[test]
    fn test_generator_output_shape() {
        let vs = VarStore::new(Device::Cpu);
        let gen = Generator::new(&vs.root(), GeneratorConfig::default()).unwrap();

        let noise = Tensor::randn([4, 100], (Kind::Float, Device::Cpu));
        let output = gen.generate(&noise);

        assert_eq!(output.size(), vec![4, 28, 28, 1]);
    }

    #[test]
    fn test_generator_output_range() {
        let vs = VarStore::new(Device::Cpu);
        let gen = Generator::new(&vs.root(), GeneratorConfig::default()).unwrap();

        let noise = Tensor::randn([8, 100], (Kind::Float, Device::Cpu));
        let output = gen.generate(&noise);

        let min_val: f64 = output.min().double_value(&[]);
        let max_val: f64 = output.max().double_value(&[]);
        assert!(min_val >= -1.0 && max_val <= 1.0);
    }

    #[test]
    fn test_generator_inference_preserves_running_stats() {
        let vs = VarStore::new(Device::Cpu);
        let gen = Generator::new(&vs.root(), GeneratorConfig::default()).unwrap();

        let running_mean = vs.variables()["bn0.running_mean"].copy();
        let noise = Tensor::randn([4, 100], (Kind::Float, Device::Cpu));
        let _ = gen.generate(&noise);

        assert!(running_mean.equal(&vs.variables()["bn0.running_mean"]));
    }

    #[test]
    fn test_generator_training_updates_running_stats() {
        let vs = VarStore::new(Device::Cpu);
        let gen = Generator::new(&vs.root(), GeneratorConfig::default()).unwrap();

        let running_mean = vs.variables()["bn0.running_mean"].copy();
        let noise = Tensor::randn([4, 100], (Kind::Float, Device::Cpu));
        let _ = gen.forward_t(&noise, true);

        assert!(!running_mean.equal(&vs.variables()["bn0.running_mean"]));
    }
}
