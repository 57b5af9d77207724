//! Command-line entry point.
//!
//! # Usage
//!
//! ```bash
//! subject-matte \
//!     --input photos/ --output clean/ \
//!     --encoder models/sam_vit_b_encoder.onnx \
//!     --decoder models/sam_vit_b_decoder.onnx \
//!     --max-side 2048 --size 768 --padding 20
//! ```

use std::path::PathBuf;

use clap::Parser;
use subject_matte::core::config::ConfigValidator;
use subject_matte::core::{InferenceDevice, OrtSessionConfig, init_tracing_with_default};
use subject_matte::models::SamAutomaticMaskGenerator;
use subject_matte::pipeline::{BatchRunner, MatteEngine, PipelineConfig, SegmentationContext};
use subject_matte::processors::CompositionMode;
use tracing::info;

/// Isolate the subject of every photograph in a directory on a white canvas.
#[derive(Parser)]
#[command(name = "subject-matte")]
#[command(about = "Subject isolation for 3D-reconstruction datasets")]
struct Args {
    /// Directory of input JPEG/PNG images.
    #[arg(long)]
    input: PathBuf,

    /// Directory for the processed images; created if missing.
    #[arg(long)]
    output: PathBuf,

    /// Path to the SAM image encoder ONNX model.
    #[arg(long)]
    encoder: PathBuf,

    /// Path to the SAM prompt decoder ONNX model.
    #[arg(long)]
    decoder: PathBuf,

    /// Downscale images so the longest side is at most this before segmentation.
    #[arg(long)]
    max_side: Option<u32>,

    /// Side of the square output canvas.
    #[arg(long)]
    size: Option<u32>,

    /// Margin around the subject bounding box, in pixels.
    #[arg(long)]
    padding: Option<u32>,

    /// Composition mode: `letterbox` or `centroid`.
    #[arg(long)]
    mode: Option<CompositionMode>,

    /// TOML or JSON pipeline configuration; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip the rotated second pass.
    #[arg(long)]
    no_consensus: bool,

    /// Inference device: `cpu`, `cuda` or `cuda:N`.
    #[arg(long, default_value = "cpu")]
    device: InferenceDevice,

    /// ONNX Runtime intra-op threads.
    #[arg(long)]
    threads: Option<usize>,

    /// Log at debug level unless RUST_LOG is set.
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn pipeline_config(&self) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(max_side) = self.max_side {
            config.scaling.max_side = Some(max_side);
        }
        if let Some(size) = self.size {
            config.composition.target_size = size;
        }
        if let Some(padding) = self.padding {
            config.composition.padding = padding;
        }
        if let Some(mode) = self.mode {
            config.composition.mode = mode;
        }
        if self.no_consensus {
            config.consensus.enabled = false;
        }
        Ok(config)
    }

    fn session_config(&self) -> OrtSessionConfig {
        let mut session = OrtSessionConfig::new().with_device(self.device);
        if let Some(threads) = self.threads {
            session = session.with_intra_threads(threads);
        }
        session
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing_with_default(if args.verbose { "debug" } else { "info" });

    let config = args.pipeline_config()?;
    let session = args.session_config();
    session.validate()?;
    session.validate_model_path(&args.encoder)?;
    session.validate_model_path(&args.decoder)?;

    let engine = MatteEngine::new(config)?;
    info!("Loading SAM encoder {}", args.encoder.display());
    let oracle = SamAutomaticMaskGenerator::from_paths(&args.encoder, &args.decoder, &session)?;
    let context = SegmentationContext::new(Box::new(oracle), session.device);

    let stats = BatchRunner::new(engine).run(&context, &args.input, &args.output)?;
    info!("{}", stats);
    Ok(())
}
