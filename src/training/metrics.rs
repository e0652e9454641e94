//! Training metrics for monitoring GAN progress
//!
//! Provides structures for tracking and logging training progress.

use std::path::Path;

use crate::error::Result;

/// Metrics collected during training
#[derive(Debug, Clone, Default)]
pub struct TrainingMetrics {
    /// Generator losses per epoch
    pub gen_losses: Vec<f64>,
    /// Discriminator losses per epoch
    pub disc_losses: Vec<f64>,
    /// Discriminator accuracy on real samples
    pub disc_real_acc: Vec<f64>,
    /// Discriminator accuracy on fake samples
    pub disc_fake_acc: Vec<f64>,
}

impl TrainingMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record epoch metrics
    pub fn record_epoch(&mut self, gen_loss: f64, disc_loss: f64, real_acc: f64, fake_acc: f64) {
        self.gen_losses.push(gen_loss);
        self.disc_losses.push(disc_loss);
        self.disc_real_acc.push(real_acc);
        self.disc_fake_acc.push(fake_acc);
    }

    /// Get number of recorded epochs
    pub fn num_epochs(&self) -> usize {
        self.gen_losses.len()
    }

    /// Get latest generator loss
    pub fn latest_gen_loss(&self) -> Option<f64> {
        self.gen_losses.last().copied()
    }

    /// Get latest discriminator loss
    pub fn latest_disc_loss(&self) -> Option<f64> {
        self.disc_losses.last().copied()
    }

    /// Calculate moving average of generator loss
    pub fn gen_loss_ma(&self, window: usize) -> f64 {
        moving_average(&self.gen_losses, window)
    }

    /// Calculate moving average of discriminator loss
    pub fn disc_loss_ma(&self, window: usize) -> f64 {
        moving_average(&self.disc_losses, window)
    }

    /// Check if training appears to have collapsed
    ///
    /// Mode collapse indicators:
    /// - Discriminator loss very low (can easily distinguish)
    /// - Generator loss very high (can't fool discriminator)
    pub fn check_mode_collapse(&self, window: usize) -> bool {
        if self.num_epochs() < window {
            return false;
        }

        let disc_ma = self.disc_loss_ma(window);
        let gen_ma = self.gen_loss_ma(window);

        // Heuristic thresholds for mode collapse detection
        disc_ma < 0.1 && gen_ma > 5.0
    }

    /// Save metrics to CSV file
    pub fn save_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;

        writer.write_record(["epoch", "gen_loss", "disc_loss", "real_acc", "fake_acc"])?;

        for i in 0..self.num_epochs() {
            writer.write_record([
                (i + 1).to_string(),
                self.gen_losses[i].to_string(),
                self.disc_losses[i].to_string(),
                self.disc_real_acc[i].to_string(),
                self.disc_fake_acc[i].to_string(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Load metrics from CSV file
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut metrics = Self::new();

        for result in reader.records() {
            let record = result?;
            metrics.gen_losses.push(record[1].parse()?);
            metrics.disc_losses.push(record[2].parse()?);
            metrics.disc_real_acc.push(record[3].parse()?);
            metrics.disc_fake_acc.push(record[4].parse()?);
        }

        Ok(metrics)
    }
}

/// Calculate moving average of last `window` values
fn moving_average(values: &[f64], window: usize) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let n = window.min(values.len());
    let sum: f64 = values.iter().rev().take(n).sum();
    sum / n as f64
}
