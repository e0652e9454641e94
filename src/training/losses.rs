//! Loss functions for GAN training
//!
//! Implements Binary Cross Entropy losses for generator and discriminator.

use tch::Tensor;

/// Generator loss: -log(D(G(z)))
///
/// Non-saturating formulation: the generator wants the discriminator to
/// output 1 (real) for fake samples, rather than minimizing the negative of
/// the discriminator's loss (which saturates early in training).
///
/// # Arguments
///
/// * `fake_output` - Discriminator output on generated samples (logits)
///
/// # Returns
///
/// Scalar loss tensor (mean-reduced over the batch)
pub fn generator_loss(fake_output: &Tensor) -> Tensor {
    let targets = Tensor::ones_like(fake_output);
    fake_output.binary_cross_entropy_with_logits::<Tensor>(
        &targets,
        None,
        None,
        tch::Reduction::Mean,
    )
}

/// Discriminator loss: -log(D(x)) - log(1-D(G(z)))
///
/// Symmetric penalty: the discriminator is pushed to output high scores for
/// real samples and low scores for generated ones.
///
/// # Arguments
///
/// * `real_output` - Discriminator output on real samples (logits)
/// * `fake_output` - Discriminator output on generated samples (logits)
///
/// # Returns
///
/// Scalar loss tensor (mean-reduced over the batch)
pub fn discriminator_loss(real_output: &Tensor, fake_output: &Tensor) -> Tensor {
    let real_targets = Tensor::ones_like(real_output);
    let real_loss = real_output.binary_cross_entropy_with_logits::<Tensor>(
        &real_targets,
        None,
        None,
        tch::Reduction::Mean,
    );

    let fake_targets = Tensor::zeros_like(fake_output);
    let fake_loss = fake_output.binary_cross_entropy_with_logits::<Tensor>(
        &fake_targets,
        None,
        None,
        tch::Reduction::Mean,
    );

    real_loss + fake_loss
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{Device, Kind};

    #[test]
    fn test_generator_loss_positive() {
        let fake_output = Tensor::randn([4, 1], (Kind::Float, Device::Cpu));
        let loss = generator_loss(&fake_output);

        assert_eq!(loss.size(), Vec::<i64>::new());
        assert!(loss.double_value(&[]) > 0.0);
    }

    #[test]
    fn test_generator_loss_at_zero_logit() {
        // bce(1, 0.0) = ln 2
        let fake_output = Tensor::zeros([1, 1], (Kind::Float, Device::Cpu));
        let loss = generator_loss(&fake_output).double_value(&[]);

        assert!((loss - std::f64::consts::LN_2).abs() < 1e-6);
    }

    #[test]
    fn test_discriminator_loss_hand_computed() {
        // bce(1, 2.0) + bce(0, -1.0) = softplus(-2) + softplus(-1)
        //                            ~ 0.1269 + 0.3133 = 0.4402
        let real_output = Tensor::from_slice(&[2.0f32]).view([1, 1]);
        let fake_output = Tensor::from_slice(&[-1.0f32]).view([1, 1]);
        let loss = discriminator_loss(&real_output, &fake_output).double_value(&[]);

        let expected = (1.0 + (-2.0f64).exp()).ln() + (1.0 + (-1.0f64).exp()).ln();
        assert!((loss - expected).abs() < 1e-6);
        assert!((loss - 0.4402).abs() < 1e-4);
    }

    #[test]
    fn test_discriminator_loss_non_negative() {
        let real_output = Tensor::randn([4, 1], (Kind::Float, Device::Cpu));
        let fake_output = Tensor::randn([4, 1], (Kind::Float, Device::Cpu));
        let loss = discriminator_loss(&real_output, &fake_output);

        assert_eq!(loss.size(), Vec::<i64>::new());
        assert!(loss.double_value(&[]) > 0.0);
    }

    #[test]
    fn test_perfect_discriminator() {
        // Perfect discriminator: high confidence on real, low on fake
        let real_output = Tensor::from_slice(&[10.0f32; 4]).view([4, 1]);
        let fake_output = Tensor::from_slice(&[-10.0f32; 4]).view([4, 1]);
        let loss = discriminator_loss(&real_output, &fake_output);

        assert!(loss.double_value(&[]) < 0.1);
    }
}
