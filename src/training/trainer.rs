//! Training loop implementation for DCGAN
//!
//! Provides the per-batch training step with isolated per-network gradient
//! computation, and the epoch orchestrator with boundary-triggered sampling
//! and checkpointing.

use indicatif::{ProgressBar, ProgressStyle};
use tch::{Device, Kind, Tensor};
use tracing::{info, warn};

use super::losses::{discriminator_loss, generator_loss};
use super::metrics::TrainingMetrics;
use super::optimizer::Adam;
use crate::data::DataLoader;
use crate::error::{Error, Result};
use crate::model::DCGAN;
use crate::utils::{save_checkpoint, save_sample_grid, GRID_SIDE};

/// Consecutive non-finite steps tolerated before the epoch is aborted
const MAX_CONSECUTIVE_NON_FINITE: usize = 5;

/// Training configuration
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Number of training epochs
    pub epochs: usize,
    /// Learning rate for generator
    pub gen_lr: f64,
    /// Learning rate for discriminator
    pub disc_lr: f64,
    /// Save checkpoint every N epochs
    pub checkpoint_every: usize,
    /// Directory to save checkpoints
    pub checkpoint_dir: String,
    /// Directory to save per-epoch sample grids
    pub sample_dir: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 50,
            gen_lr: 1e-4,
            disc_lr: 1e-4,
            checkpoint_every: 15,
            checkpoint_dir: "checkpoints".to_string(),
            sample_dir: "samples".to_string(),
        }
    }
}

/// Per-step losses and discriminator accuracies
#[derive(Debug, Clone, Copy)]
pub struct StepStats {
    pub gen_loss: f64,
    pub disc_loss: f64,
    pub real_acc: f64,
    pub fake_acc: f64,
}

/// Execute one simultaneous update of both networks over one batch.
///
/// Draws a fresh noise batch, runs the generator and both discriminator
/// passes in training mode, computes both losses from the same fake logits,
/// then collects each loss's gradients against its own network's parameters
/// only (`run_backward` with an explicit input list, so neither backward
/// pass can touch the other store). Both gradient sets are collected before
/// either update is applied: on a non-finite loss the step aborts with no
/// parameter changed, and after a successful step both optimizers have
/// advanced by exactly one.
pub fn train_step(
    model: &DCGAN,
    real_images: &Tensor,
    gen_opt: &mut Adam,
    disc_opt: &mut Adam,
) -> Result<StepStats> {
    let batch_size = real_images.size()[0];

    let noise = Tensor::randn([batch_size, model.latent_dim()], (Kind::Float, model.device));
    let fake_images = model.generator.forward_t(&noise, true);

    let real_logits = model.discriminator.forward_t(real_images, true);
    let fake_logits = model.discriminator.forward_t(&fake_images, true);

    let g_loss = generator_loss(&fake_logits);
    let d_loss = discriminator_loss(&real_logits, &fake_logits);

    let gen_loss = g_loss.double_value(&[]);
    let disc_loss = d_loss.double_value(&[]);
    if !gen_loss.is_finite() || !disc_loss.is_finite() {
        return Err(Error::NonFiniteLoss {
            generator: gen_loss,
            discriminator: disc_loss,
        });
    }

    let gen_grads = Tensor::run_backward(&[&g_loss], &gen_opt.parameters(), true, false);
    let disc_grads = Tensor::run_backward(&[&d_loss], &disc_opt.parameters(), false, false);

    gen_opt.step(&gen_grads)?;
    disc_opt.step(&disc_grads)?;

    let real_acc = real_logits
        .sigmoid()
        .ge(0.5)
        .to_kind(Kind::Float)
        .mean(Kind::Float)
        .double_value(&[]);
    let fake_acc = fake_logits
        .sigmoid()
        .lt(0.5)
        .to_kind(Kind::Float)
        .mean(Kind::Float)
        .double_value(&[]);

    Ok(StepStats {
        gen_loss,
        disc_loss,
        real_acc,
        fake_acc,
    })
}

/// DCGAN Trainer
pub struct Trainer {
    config: TrainingConfig,
    device: Device,
    metrics: TrainingMetrics,
}

impl Trainer {
    /// Create a new trainer
    pub fn new(config: TrainingConfig, device: Device) -> Self {
        Self {
            config,
            device,
            metrics: TrainingMetrics::new(),
        }
    }

    /// Seed the metrics history, e.g. from a restored checkpoint
    pub fn resume_metrics(&mut self, metrics: TrainingMetrics) {
        self.metrics = metrics;
    }

    /// Train the DCGAN model.
    ///
    /// The optimizers are passed in (rather than created here) so a resumed
    /// run can hand over restored moment state. `start_epoch` is the number
    /// of epochs already completed; training continues at the next epoch
    /// boundary and a partially completed epoch is redone from its start.
    ///
    /// # Returns
    ///
    /// Training metrics over all completed epochs
    pub fn train(
        &mut self,
        model: &DCGAN,
        data_loader: &mut DataLoader,
        gen_opt: &mut Adam,
        disc_opt: &mut Adam,
        start_epoch: usize,
    ) -> Result<&TrainingMetrics> {
        let num_batches = data_loader.num_batches();
        info!(
            "Starting training for epochs {}..{}, {} batches per epoch",
            start_epoch + 1,
            self.config.epochs,
            num_batches
        );

        std::fs::create_dir_all(&self.config.checkpoint_dir)?;
        std::fs::create_dir_all(&self.config.sample_dir)?;

        // Fixed noise drawn once so samples are comparable across epochs
        let fixed_noise = Tensor::randn(
            [GRID_SIDE * GRID_SIDE, model.latent_dim()],
            (Kind::Float, self.device),
        );

        for epoch in start_epoch..self.config.epochs {
            let mut epoch_gen_loss = 0.0;
            let mut epoch_disc_loss = 0.0;
            let mut epoch_real_acc = 0.0;
            let mut epoch_fake_acc = 0.0;
            let mut batch_count = 0usize;
            let mut consecutive_non_finite = 0usize;

            let pb = ProgressBar::new(num_batches as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                    .unwrap()
                    .progress_chars("##-"),
            );

            for real_batch in data_loader.iter() {
                let real_images = real_batch.to_device(self.device);

                match train_step(model, &real_images, gen_opt, disc_opt) {
                    Ok(stats) => {
                        epoch_gen_loss += stats.gen_loss;
                        epoch_disc_loss += stats.disc_loss;
                        epoch_real_acc += stats.real_acc;
                        epoch_fake_acc += stats.fake_acc;
                        batch_count += 1;
                        consecutive_non_finite = 0;

                        pb.set_message(format!(
                            "G: {:.4}, D: {:.4}",
                            stats.gen_loss, stats.disc_loss
                        ));
                    }
                    Err(err @ Error::NonFiniteLoss { .. }) => {
                        consecutive_non_finite += 1;
                        warn!("{err}; retrying with next batch");
                        if consecutive_non_finite >= MAX_CONSECUTIVE_NON_FINITE {
                            return Err(err);
                        }
                    }
                    Err(err) => return Err(err),
                }
                pb.inc(1);
            }
            pb.finish_with_message("done");

            if batch_count == 0 {
                return Err(Error::PipelineExhausted { epoch: epoch + 1 });
            }

            let avg_gen_loss = epoch_gen_loss / batch_count as f64;
            let avg_disc_loss = epoch_disc_loss / batch_count as f64;
            let avg_real_acc = epoch_real_acc / batch_count as f64;
            let avg_fake_acc = epoch_fake_acc / batch_count as f64;
            self.metrics
                .record_epoch(avg_gen_loss, avg_disc_loss, avg_real_acc, avg_fake_acc);

            info!(
                "Epoch {}/{}: G_loss={:.4}, D_loss={:.4}, Real_acc={:.2}%, Fake_acc={:.2}%",
                epoch + 1,
                self.config.epochs,
                avg_gen_loss,
                avg_disc_loss,
                avg_real_acc * 100.0,
                avg_fake_acc * 100.0
            );

            if self.metrics.check_mode_collapse(10) {
                warn!("Possible mode collapse detected! Consider adjusting learning rates.");
            }

            // Epoch boundary: sample first, then checkpoint every N epochs
            save_sample_grid(
                &model.generator,
                &fixed_noise,
                epoch + 1,
                &self.config.sample_dir,
            )?;

            if (epoch + 1) % self.config.checkpoint_every == 0 {
                if let Err(e) = save_checkpoint(
                    model,
                    gen_opt,
                    disc_opt,
                    &self.metrics,
                    epoch + 1,
                    &self.config.checkpoint_dir,
                ) {
                    warn!("Failed to save checkpoint: {e}");
                }
            }
        }

        Ok(&self.metrics)
    }

    /// Get training metrics
    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    /// Get configuration
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }
}
