//! Model module containing GAN architecture components
//!
//! This module provides:
//! - Generator network for synthesizing digit images from noise
//! - Discriminator network for scoring real vs. generated images
//! - DCGAN wrapper combining both networks

mod dcgan;
mod discriminator;
mod generator;

pub use dcgan::DCGAN;
pub use discriminator::{Discriminator, DiscriminatorConfig};
pub use generator::{Generator, GeneratorConfig};

use tch::Tensor;

use crate::error::{Error, Result};

/// Output image height and width
pub const IMG_SIZE: i64 = 28;
/// Output image channels (grayscale)
pub const IMG_CHANNELS: i64 = 1;
/// Spatial size of the generator's initial feature map
pub(crate) const INIT_SIZE: i64 = 7;

/// Leaky rectified linear unit with a configurable negative slope.
///
/// `Tensor::leaky_relu` is fixed at libtorch's 0.01 slope, so the slope is
/// expressed through `maximum` instead.
pub(crate) fn leaky_relu(xs: &Tensor, slope: f64) -> Tensor {
    xs.maximum(&(xs * slope))
}

/// Check a stage output against the fixed per-image shape (batch dim ignored).
pub(crate) fn expect_shape(stage: &str, xs: &Tensor, expected: &[i64]) -> Result<()> {
    let actual = xs.size();
    if actual.len() != expected.len() + 1 || actual[1..] != *expected {
        return Err(Error::ShapeMismatch {
            stage: stage.to_string(),
            expected: expected.to_vec(),
            actual: actual.get(1..).map(|s| s.to_vec()).unwrap_or(actual),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{Device, Kind};

    #[test]
    fn test_leaky_relu_slope() {
        let xs = Tensor::from_slice(&[-1.0f32, 0.0, 2.0]);
        let ys = leaky_relu(&xs, 0.2);
        let expected = Tensor::from_slice(&[-0.2f32, 0.0, 2.0]);
        let diff: f64 = (ys - expected).abs().max().double_value(&[]);
        assert!(diff < 1e-6);
    }

    #[test]
    fn test_expect_shape_rejects_deviation() {
        let xs = Tensor::zeros([2, 64, 14, 14], (Kind::Float, Device::Cpu));
        assert!(expect_shape("stage", &xs, &[64, 14, 14]).is_ok());
        assert!(expect_shape("stage", &xs, &[64, 7, 7]).is_err());
    }
}
