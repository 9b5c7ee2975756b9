// Command-line entry point for the bubble numbering workflow

use bubble_workflow::{
    core::{
        config::{parse_exclude_zones, parse_level},
        Config,
    },
    orchestration::AnnotationPipeline,
    services::layout::{Anchor, Offset},
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "bubble-annotate",
    about = "Number dimension callouts on a drawing in reading order",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Annotate one image from its exported detections
    Run(RunArgs),
    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Source drawing (PNG or JPEG)
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Detections JSON exported by the recognition engine
    #[arg(long, short = 'd')]
    detections: PathBuf,

    /// Output directory (overrides OUT_DIR)
    #[arg(long, short = 'o')]
    out_dir: Option<PathBuf>,

    /// Minimum recognition confidence
    #[arg(long)]
    min_conf: Option<f32>,

    /// Bubble radius in pixels
    #[arg(long)]
    bubble_radius: Option<f32>,

    /// Number font size relative to the radius
    #[arg(long)]
    label_scale: Option<f32>,

    /// TTF/OTF font for bubble numbers
    #[arg(long)]
    font: Option<PathBuf>,

    /// top-left, top-right, bottom-left, bottom-right or auto
    #[arg(long)]
    anchor: Option<Anchor>,

    /// Bubble offset from the anchor as dx,dy
    #[arg(long, allow_hyphen_values = true)]
    offset: Option<Offset>,

    /// Extra exclusion zones "x1,y1,x2,y2;..." (replaces EXCLUDE_ZONES)
    #[arg(long)]
    exclude: Option<String>,

    /// Keep naive bubble positions even when they overlap
    #[arg(long)]
    allow_overlap: bool,

    /// Outline the detected text quadrilaterals
    #[arg(long)]
    draw_quads: bool,

    /// Log level (overrides LOG_LEVEL)
    #[arg(long)]
    log_level: Option<String>,
}

impl RunArgs {
    /// Layer CLI flags over the env-loaded configuration
    fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.out_dir {
            config.output.out_dir = dir.clone();
        }
        if let Some(conf) = self.min_conf {
            config.cleaning.min_confidence = conf;
        }
        if let Some(radius) = self.bubble_radius {
            config.layout.radius = radius;
        }
        if let Some(scale) = self.label_scale {
            config.layout.text_scale = scale;
        }
        if let Some(font) = &self.font {
            config.layout.font_path = Some(font.clone());
        }
        if let Some(anchor) = self.anchor {
            config.layout.anchor = anchor;
        }
        if let Some(offset) = self.offset {
            config.layout.offset = offset;
        }
        if let Some(zones) = &self.exclude {
            config.cleaning.exclude_zones = parse_exclude_zones(zones);
        }
        if self.allow_overlap {
            config.layout.avoid_overlap = false;
        }
        if self.draw_quads {
            config.layout.draw_quads = true;
        }
        if let Some(level) = self.log_level.as_deref().and_then(parse_level) {
            config.logging.log_level = level;
        }
    }
}

fn init_logging(config: &Config) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::new(format!(
        "bubble_workflow={},bubble_annotate={}",
        level_name(config.log_level()),
        level_name(config.log_level())
    ));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn level_name(level: tracing::Level) -> &'static str {
    match level {
        tracing::Level::TRACE => "trace",
        tracing::Level::DEBUG => "debug",
        tracing::Level::INFO => "info",
        tracing::Level::WARN => "warn",
        tracing::Level::ERROR => "error",
    }
}

fn run(args: RunArgs) -> Result<()> {
    let mut config = Config::new().context("Failed to load configuration")?;
    args.apply(&mut config);
    config.validate().context("Invalid command-line options")?;

    init_logging(&config);

    info!("=== BUBBLE ANNOTATE ===");
    info!(
        "Config: radius={} scale={} anchor={} offset=({},{}) avoid_overlap={} min_conf={:.2}",
        config.layout.radius,
        config.layout.text_scale,
        config.layout.anchor,
        config.layout.offset.dx,
        config.layout.offset.dy,
        config.layout.avoid_overlap,
        config.min_confidence()
    );

    let pipeline = AnnotationPipeline::new(Arc::new(config));
    let summary = pipeline
        .run_files(&args.input, &args.detections)
        .with_context(|| format!("Failed to annotate {}", args.input.display()))
        .inspect_err(|e| error!("{:#}", e))?;

    info!("Image: {}", summary.files.image_path.display());
    info!("Table: {}", summary.files.table_path.display());
    info!("JSON:  {}", summary.files.json_path.display());

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            println!("bubble-annotate {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Run(args) => run(args),
    }
}
