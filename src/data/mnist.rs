//! MNIST dataset loading and preprocessing
//!
//! Reads the raw idx files and prepares training images in the layout the
//! networks consume: (N, 28, 28, 1), values in [-1, 1].

use std::path::Path;

use tch::Tensor;
use tracing::info;

use crate::error::Result;
use crate::model::{IMG_CHANNELS, IMG_SIZE};

/// Load the MNIST training images from a directory containing the standard
/// idx files (`train-images-idx3-ubyte` etc., optionally gzipped).
///
/// Returns a tensor of shape (60000, 28, 28, 1) normalized to [-1, 1].
pub fn load_training_images(dir: impl AsRef<Path>) -> Result<Tensor> {
    let dataset = tch::vision::mnist::load_dir(dir)?;
    let images = to_training_images(&dataset.train_images);
    info!("Loaded {} MNIST training images", images.size()[0]);
    Ok(images)
}

/// Convert flat loader output (N, 784) in [0, 1] to the (N, 28, 28, 1)
/// layout in [-1, 1] expected by the networks.
pub fn to_training_images(flat: &Tensor) -> Tensor {
    (flat * 2.0 - 1.0).view([-1, IMG_SIZE, IMG_SIZE, IMG_CHANNELS])
}
