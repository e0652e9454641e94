//! Checkpoint save/load utilities
//!
//! A checkpoint record bundles all four pieces of learnable state: generator
//! weights, discriminator weights and both optimizer states, plus metadata
//! with the epoch counter. Records are written atomically (staged directory,
//! then rename) and validated in full before a restore mutates anything.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tch::{nn::VarStore, Tensor};

use crate::error::{Error, Result};
use crate::model::DCGAN;
use crate::training::{Adam, TrainingMetrics};

const GEN_WEIGHTS: &str = "generator.ot";
const DISC_WEIGHTS: &str = "discriminator.ot";
const GEN_OPT_STATE: &str = "gen_optimizer.pt";
const DISC_OPT_STATE: &str = "disc_optimizer.pt";
const META: &str = "meta.json";
const METRICS: &str = "metrics.csv";

/// Checkpoint metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMeta {
    /// Epoch at which the record was written
    pub epoch: usize,
    /// Generator loss at checkpoint
    pub gen_loss: f64,
    /// Discriminator loss at checkpoint
    pub disc_loss: f64,
    /// Timestamp of checkpoint
    pub timestamp: String,
    /// Model configuration (as JSON)
    pub config: String,
}

/// Save a complete checkpoint record tagged by epoch number.
///
/// The record is staged in a hidden directory and renamed into place, so a
/// crash mid-save never leaves a partial record under the final name.
pub fn save_checkpoint(
    model: &DCGAN,
    gen_opt: &Adam,
    disc_opt: &Adam,
    metrics: &TrainingMetrics,
    epoch: usize,
    dir: impl AsRef<Path>,
) -> Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let name = record_name(epoch);
    let final_dir = dir.join(&name);
    let stage_dir = dir.join(format!(".{name}.tmp"));
    if stage_dir.exists() {
        std::fs::remove_dir_all(&stage_dir)?;
    }
    std::fs::create_dir_all(&stage_dir)?;

    model.save_weights(stage_dir.join(GEN_WEIGHTS), stage_dir.join(DISC_WEIGHTS))?;
    gen_opt.save(stage_dir.join(GEN_OPT_STATE))?;
    disc_opt.save(stage_dir.join(DISC_OPT_STATE))?;

    let meta = CheckpointMeta {
        epoch,
        gen_loss: metrics.latest_gen_loss().unwrap_or(0.0),
        disc_loss: metrics.latest_disc_loss().unwrap_or(0.0),
        timestamp: chrono::Utc::now().to_rfc3339(),
        config: serde_json::json!({
            "latent_dim": model.latent_dim(),
            "gen_base_filters": model.generator.config().base_filters,
            "disc_base_filters": model.discriminator.config().base_filters,
        })
        .to_string(),
    };
    std::fs::write(stage_dir.join(META), serde_json::to_string_pretty(&meta)?)?;
    metrics.save_csv(stage_dir.join(METRICS))?;

    if final_dir.exists() {
        std::fs::remove_dir_all(&final_dir)?;
    }
    std::fs::rename(&stage_dir, &final_dir)?;

    tracing::info!("Saved checkpoint to {}", final_dir.display());
    Ok(final_dir)
}

/// Load checkpoint metadata
pub fn load_checkpoint_meta(record_dir: impl AsRef<Path>) -> Result<CheckpointMeta> {
    let meta_path = record_dir.as_ref().join(META);
    let content = std::fs::read_to_string(&meta_path)
        .map_err(|e| Error::corrupt(record_dir.as_ref(), format!("missing {META}: {e}")))?;
    let meta: CheckpointMeta = serde_json::from_str(&content)
        .map_err(|e| Error::corrupt(record_dir.as_ref(), format!("unreadable {META}: {e}")))?;
    Ok(meta)
}

/// Restore all four pieces of learnable state from a record.
///
/// Every file is validated against the live networks and optimizers before
/// anything is applied; a missing, truncated or shape-mismatched record
/// fails with [`Error::CheckpointCorruption`] and leaves in-memory state
/// untouched.
///
/// # Returns
///
/// Tuple of (epoch, metrics) recorded at save time
pub fn restore_checkpoint(
    model: &mut DCGAN,
    gen_opt: &mut Adam,
    disc_opt: &mut Adam,
    record_dir: impl AsRef<Path>,
) -> Result<(usize, TrainingMetrics)> {
    let record_dir = record_dir.as_ref();
    if !record_dir.is_dir() {
        return Err(Error::corrupt(record_dir, "record does not exist"));
    }

    let meta = load_checkpoint_meta(record_dir)?;

    // Validate everything before mutating anything
    validate_weights(&record_dir.join(GEN_WEIGHTS), &model.gen_vs)?;
    validate_weights(&record_dir.join(DISC_WEIGHTS), &model.disc_vs)?;
    gen_opt.validate_state(record_dir.join(GEN_OPT_STATE))?;
    disc_opt.validate_state(record_dir.join(DISC_OPT_STATE))?;

    model.load_weights(record_dir.join(GEN_WEIGHTS), record_dir.join(DISC_WEIGHTS))?;
    gen_opt.load(record_dir.join(GEN_OPT_STATE))?;
    disc_opt.load(record_dir.join(DISC_OPT_STATE))?;

    let metrics_path = record_dir.join(METRICS);
    let metrics = if metrics_path.exists() {
        TrainingMetrics::load_csv(&metrics_path)?
    } else {
        TrainingMetrics::new()
    };

    tracing::info!(
        "Loaded checkpoint from {} (epoch {})",
        record_dir.display(),
        meta.epoch
    );
    Ok((meta.epoch, metrics))
}

/// Load only the network weights from a record (validated), e.g. for sampling
pub fn load_model_weights(model: &mut DCGAN, record_dir: impl AsRef<Path>) -> Result<()> {
    let record_dir = record_dir.as_ref();
    validate_weights(&record_dir.join(GEN_WEIGHTS), &model.gen_vs)?;
    validate_weights(&record_dir.join(DISC_WEIGHTS), &model.disc_vs)?;
    model.load_weights(record_dir.join(GEN_WEIGHTS), record_dir.join(DISC_WEIGHTS))
}

/// Find the latest checkpoint record in a directory (newest by tag)
pub fn find_latest_checkpoint(dir: impl AsRef<Path>) -> Option<PathBuf> {
    let mut records: Vec<_> = record_entries(dir.as_ref())?;
    records.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
    records.first().map(|e| e.path())
}

/// List all checkpoint records in a directory with their metadata
pub fn list_checkpoints(dir: impl AsRef<Path>) -> Vec<(PathBuf, CheckpointMeta)> {
    record_entries(dir.as_ref())
        .unwrap_or_default()
        .into_iter()
        .filter_map(|e| {
            let path = e.path();
            load_checkpoint_meta(&path).ok().map(|meta| (path, meta))
        })
        .collect()
}

fn record_name(epoch: usize) -> String {
    format!("checkpoint_epoch_{epoch:04}")
}

fn record_entries(dir: &Path) -> Option<Vec<std::fs::DirEntry>> {
    if !dir.exists() {
        return None;
    }
    let entries = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().ok().map(|t| t.is_dir()).unwrap_or(false))
        .filter(|e| {
            e.file_name()
                .to_str()
                .map(|n| n.starts_with("checkpoint_epoch_"))
                .unwrap_or(false)
        })
        .collect();
    Some(entries)
}

/// Check that a weight file covers exactly the live store's variables with
/// matching shapes.
fn validate_weights(path: &Path, vs: &VarStore) -> Result<()> {
    let loaded = Tensor::load_multi(path)
        .map_err(|e| Error::corrupt(path, format!("unreadable weights: {e}")))?;
    let mut entries: HashMap<String, Tensor> = loaded.into_iter().collect();

    for (name, var) in vs.variables() {
        let stored = entries
            .remove(&name)
            .ok_or_else(|| Error::corrupt(path, format!("missing variable {name}")))?;
        if stored.size() != var.size() {
            return Err(Error::corrupt(
                path,
                format!(
                    "variable {name} has shape {:?}, network expects {:?}",
                    stored.size(),
                    var.size()
                ),
            ));
        }
    }
    if !entries.is_empty() {
        let mut extra: Vec<String> = entries.into_keys().collect();
        extra.sort();
        return Err(Error::corrupt(
            path,
            format!("unknown variables: {}", extra.join(", ")),
        ));
    }
    Ok(())
}
