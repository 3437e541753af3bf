use fusion_spoof::{
    cli::{annotate_detections, default_annotation_path, parse_roi},
    core::render,
    Config, FasnetDetector, FusionSpoofDetector, LocalLivenessDetector,
};

use clap::{Parser, Subcommand};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "fusion-spoof")]
#[command(about = "Face spoof detection fusing on-device FASNet with a remote device detector")]
struct Cli {
    /// Path to the TOML config (default: configs/fusion-spoof.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the fusion endpoint URL
    #[arg(long, global = true)]
    url: Option<String>,

    /// Override the fusion endpoint API key
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect spoofing using the fusion endpoint
    Detect {
        #[arg(short, long)]
        image: PathBuf,
        /// Face rectangle as x,y,width,height; omit when no face was found
        #[arg(short, long)]
        roi: Option<String>,
        /// Write an image with the face and detected spoof devices drawn
        #[arg(short, long)]
        annotate: Option<Option<PathBuf>>,
    },
    /// Score the face with the on-device FASNet models only
    Local {
        #[arg(short, long)]
        image: PathBuf,
        #[arg(short, long)]
        roi: String,
    },
    /// Save the FASNet inference crops for inspection
    Crops {
        #[arg(short, long)]
        image: PathBuf,
        #[arg(short, long)]
        roi: String,
        #[arg(short, long, default_value = "crops")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    if let Some(url) = cli.url {
        config.service.url = url;
    }
    if let Some(api_key) = cli.api_key {
        config.service.api_key = api_key;
    }
    config.validate()?;

    match cli.command {
        Commands::Detect { image, roi, annotate } => {
            let img = load_image(&image)?;
            let roi = roi.as_deref().map(parse_roi).transpose()?;
            let detector = FusionSpoofDetector::from_config(&config)?;

            match (roi, annotate) {
                (Some(roi), Some(out)) => {
                    let result = detector.detect_spoof_regions(&img, roi).await?;
                    let score = result.fused_score();
                    print_verdict(score, detector.confidence_threshold);

                    for device in &result.spoof_devices {
                        println!(
                            "  spoof device at ({:.0}, {:.0}, {:.0}x{:.0}) confidence {:.3}",
                            device.bounding_box.x, device.bounding_box.y,
                            device.bounding_box.width, device.bounding_box.height,
                            device.confidence
                        );
                    }

                    let out = out.unwrap_or_else(|| default_annotation_path("fusion_spoof"));
                    annotate_detections(&img, &roi, &result)
                        .save(&out)
                        .with_context(|| format!("Failed to save {}", out.display()))?;
                    println!("Annotated image saved to {}", out.display());
                }
                (roi, _) => {
                    let score = detector.detect_spoof(&img, roi).await?;
                    print_verdict(score, detector.confidence_threshold);
                }
            }
        }
        Commands::Local { image, roi } => {
            let img = load_image(&image)?;
            let roi = parse_roi(&roi)?;
            let fasnet = FasnetDetector::new(&config)?;

            let crops = fasnet.create_inference_images(&img, &roi)?;
            let score = fasnet.local_score(&crops)?;
            print_verdict(score, config.service.confidence_threshold);
        }
        Commands::Crops { image, roi, out } => {
            let img = load_image(&image)?;
            let roi = parse_roi(&roi)?;
            let fasnet = FasnetDetector::new(&config)?;

            std::fs::create_dir_all(&out)?;
            for (crop, spec) in fasnet.create_inference_images(&img, &roi)?.iter().zip(fasnet.crop_specs()) {
                let path = out.join(format!("fasnet_{:.1}_{}.jpg", spec.scale, spec.input_size));
                std::fs::write(&path, render::encode_jpeg(crop)?)?;
                println!("Saved {}", path.display());
            }
        }
    }

    Ok(())
}

fn load_image(path: &Path) -> Result<image::DynamicImage> {
    image::open(path).with_context(|| format!("Failed to open image {}", path.display()))
}

fn print_verdict(score: f32, threshold: f32) {
    println!("Spoof score: {:.3}", score);
    println!("Verdict: {}", if score >= threshold { "SPOOF" } else { "LIVE" });
}

fn setup_logging(verbose: bool) {
    if verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .init();
    }
}
