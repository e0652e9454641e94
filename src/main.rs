//! DCGAN for Handwritten Digit Generation
//!
//! Main entry point providing CLI interface for:
//! - Training the DCGAN model on MNIST
//! - Sampling image grids from a trained generator
//! - Initializing a default configuration file

use anyhow::Result;
use clap::{Parser, Subcommand};
use tch::{Kind, Tensor};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use rust_dcgan_mnist::{
    data::{load_training_images, DataLoader},
    model::{DiscriminatorConfig, GeneratorConfig, DCGAN},
    training::{Adam, Trainer, TrainingConfig},
    utils::{
        find_latest_checkpoint, image_grid, load_model_weights, restore_checkpoint, sample_images,
        Config, GRID_SIDE,
    },
};

/// DCGAN for synthetic handwritten digits
#[derive(Parser)]
#[command(name = "dcgan_mnist")]
#[command(version = "0.1.0")]
#[command(about = "Generate handwritten digit images using DCGAN")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Verbosity level
    #[arg(short, long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the DCGAN model
    Train {
        /// Directory with the MNIST idx files (overrides config)
        #[arg(short, long)]
        data_dir: Option<String>,

        /// Number of epochs (overrides config)
        #[arg(short, long)]
        epochs: Option<usize>,

        /// Checkpoint record to resume from, or "latest"
        #[arg(long)]
        resume: Option<String>,
    },

    /// Sample an image grid from a trained generator
    Sample {
        /// Checkpoint record to load, or "latest"
        #[arg(short = 'm', long, default_value = "latest")]
        checkpoint: String,

        /// Output image path
        #[arg(short, long, default_value = "samples.png")]
        output: String,

        /// Seed for the noise batch
        #[arg(short, long)]
        seed: Option<i64>,
    },

    /// Initialize default configuration file
    Init {
        /// Output configuration file path
        #[arg(short, long, default_value = "config.json")]
        output: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbosity.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Train {
            data_dir,
            epochs,
            resume,
        } => train(&cli.config, data_dir, epochs, resume),
        Commands::Sample {
            checkpoint,
            output,
            seed,
        } => sample(&cli.config, &checkpoint, &output, seed),
        Commands::Init { output } => init_config(&output),
    }
}

fn load_config(config_path: &str) -> Result<Config> {
    let config = if std::path::Path::new(config_path).exists() {
        Config::from_path(config_path)?
    } else {
        info!("Config file not found, using defaults");
        Config::default()
    };
    config.validate()?;
    Ok(config)
}

fn build_model(config: &Config, device: tch::Device) -> Result<DCGAN> {
    let gen_config = GeneratorConfig {
        latent_dim: config.model.latent_dim,
        base_filters: config.model.gen_base_filters,
        leaky_slope: config.model.leaky_slope,
    };
    let disc_config = DiscriminatorConfig {
        base_filters: config.model.disc_base_filters,
        dropout: config.model.dropout,
        leaky_slope: config.model.leaky_slope,
    };
    Ok(DCGAN::new(gen_config, disc_config, device)?)
}

/// Resolve a record argument ("latest" or explicit path) to a record directory
fn resolve_record(arg: &str, checkpoint_dir: &str) -> Result<std::path::PathBuf> {
    if arg == "latest" {
        find_latest_checkpoint(checkpoint_dir).ok_or_else(|| {
            anyhow::anyhow!("no checkpoint records found in {checkpoint_dir}")
        })
    } else {
        Ok(std::path::PathBuf::from(arg))
    }
}

/// Train the DCGAN model
fn train(
    config_path: &str,
    data_dir: Option<String>,
    epochs: Option<usize>,
    resume: Option<String>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let device = config.get_device();
    info!("Using device: {:?}", device);

    let data_dir = data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let images = load_training_images(&data_dir)?;
    let mut data_loader = DataLoader::new(images, config.data.batch_size, true, true);

    let mut model = build_model(&config, device)?;
    let mut gen_opt = Adam::new(&model.gen_vs, config.training.gen_lr);
    let mut disc_opt = Adam::new(&model.disc_vs, config.training.disc_lr);

    let training_config = TrainingConfig {
        epochs: epochs.unwrap_or(config.training.epochs),
        gen_lr: config.training.gen_lr,
        disc_lr: config.training.disc_lr,
        checkpoint_every: config.training.checkpoint_every,
        checkpoint_dir: config.training.checkpoint_dir.clone(),
        sample_dir: config.training.sample_dir.clone(),
    };
    let mut trainer = Trainer::new(training_config, device);

    // Resume at the next epoch boundary; a partial epoch is redone
    let start_epoch = match resume {
        Some(arg) => {
            let record = resolve_record(&arg, &config.training.checkpoint_dir)?;
            let (epoch, metrics) =
                restore_checkpoint(&mut model, &mut gen_opt, &mut disc_opt, &record)?;
            trainer.resume_metrics(metrics);
            info!("Resumed from epoch {epoch}");
            epoch
        }
        None => 0,
    };

    let metrics = trainer.train(&model, &mut data_loader, &mut gen_opt, &mut disc_opt, start_epoch)?;
    info!(
        "Training complete. Final G_loss: {:.4}, D_loss: {:.4}",
        metrics.latest_gen_loss().unwrap_or(0.0),
        metrics.latest_disc_loss().unwrap_or(0.0)
    );

    Ok(())
}

/// Sample an image grid from a trained generator
fn sample(config_path: &str, checkpoint: &str, output: &str, seed: Option<i64>) -> Result<()> {
    let config = load_config(config_path)?;
    let device = config.get_device();

    let mut model = build_model(&config, device)?;
    let record = resolve_record(checkpoint, &config.training.checkpoint_dir)?;
    load_model_weights(&mut model, &record)?;
    info!("Loaded generator weights from {}", record.display());

    if let Some(seed) = seed {
        tch::manual_seed(seed);
    }
    let noise = Tensor::randn(
        [GRID_SIDE * GRID_SIDE, model.latent_dim()],
        (Kind::Float, device),
    );
    let grid = image_grid(&sample_images(&model.generator, &noise));
    tch::vision::image::save(&grid, output)?;
    info!("Saved sample grid to {output}");

    Ok(())
}

/// Initialize default configuration file
fn init_config(output_path: &str) -> Result<()> {
    let config = Config::default();
    config.save_json(output_path)?;
    info!("Created default configuration at {output_path}");
    Ok(())
}
