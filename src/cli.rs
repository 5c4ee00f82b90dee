use crate::config::{LayoutAlgorithm, load_config, merge_init_config};
use crate::ir::{MindTree, TreeDocument};
use crate::layout::{Position, Rect, compute_layout};
use crate::layout_dump::write_layout_dump;
use crate::parser::parse_outline;
use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;
use tracing::{debug, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

#[derive(Parser, Debug)]
#[command(name = "mmlayout", version, about = "Radial mind-map layout engine")]
pub struct Args {
    /// Input file (.json tree document or indented outline) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output JSON file. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config JSON file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Input format
    #[arg(short = 'f', long = "format", value_enum, default_value = "auto")]
    pub format: InputFormat,

    /// Override the layout algorithm from the config
    #[arg(short = 'a', long = "algorithm", value_enum)]
    pub algorithm: Option<AlgorithmArg>,

    /// Bounds width, centered on the layout center
    #[arg(short = 'w', long = "width", requires = "height")]
    pub width: Option<f64>,

    /// Bounds height, centered on the layout center
    #[arg(short = 'H', long = "height", requires = "width")]
    pub height: Option<f64>,

    #[arg(long = "center-x", default_value_t = 0.0, allow_hyphen_values = true)]
    pub center_x: f64,

    #[arg(long = "center-y", default_value_t = 0.0, allow_hyphen_values = true)]
    pub center_y: f64,

    /// Fail when the layout could not meet its spacing or bounds constraints
    #[arg(long = "strict")]
    pub strict: bool,

    /// Debug verbosity (-d, -dd, -ddd)
    #[arg(short = 'd', long = "debug", action = ArgAction::Count)]
    pub debug: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Auto,
    Json,
    Outline,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum AlgorithmArg {
    Radial,
    Layered,
}

impl From<AlgorithmArg> for LayoutAlgorithm {
    fn from(value: AlgorithmArg) -> Self {
        match value {
            AlgorithmArg::Radial => LayoutAlgorithm::Radial,
            AlgorithmArg::Layered => LayoutAlgorithm::Layered,
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.debug);

    let mut config = load_config(args.config.as_deref())
        .with_context(|| format!("failed to load config {:?}", args.config))?;
    let (input, path_format) = read_input(args.input.as_deref())?;
    let format = match args.format {
        InputFormat::Auto => path_format.unwrap_or_else(|| sniff_format(&input)),
        explicit => explicit,
    };
    debug!(?format, bytes = input.len(), "read input");

    let document = match format {
        InputFormat::Json => serde_json::from_str::<TreeDocument>(&input)
            .context("input is not a valid tree document")?,
        _ => {
            let parsed = parse_outline(&input)?;
            if let Some(init) = parsed.init_config {
                config = merge_init_config(config, init)?;
            }
            parsed.document
        }
    };
    if let Some(algorithm) = args.algorithm {
        config.layout.algorithm = algorithm.into();
    }

    let tree = MindTree::from_document(&document, &config.sizing)?;
    let center = Position::new(args.center_x, args.center_y);
    let bounds = bounds_from_args(center, args.width, args.height);
    info!(nodes = tree.len(), algorithm = ?config.layout.algorithm, "laying out");

    let result = compute_layout(&tree, center, bounds, &config.layout)?;
    for warning in &result.warnings {
        warn!(?warning, "layout warning");
    }
    write_layout_dump(args.output.as_deref(), &result, &tree)?;

    if args.strict && result.degraded {
        return Err(anyhow::anyhow!(
            "layout is degraded ({} warnings); widen the bounds or relax the config",
            result.warnings.len()
        ));
    }
    Ok(())
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let fmt_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .with_filter(env_filter);
    if tracing_subscriber::registry().with(fmt_layer).try_init().is_err() {
        debug!("tracing subscriber already set");
    }
}

fn read_input(path: Option<&Path>) -> Result<(String, Option<InputFormat>)> {
    if let Some(path) = path {
        if path != Path::new("-") {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            return Ok((content, format_from_extension(path)));
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok((buf, None))
}

fn format_from_extension(path: &Path) -> Option<InputFormat> {
    let ext = path.extension().and_then(|e| e.to_str())?;
    match ext.to_ascii_lowercase().as_str() {
        "json" => Some(InputFormat::Json),
        "mm" | "mmd" | "txt" | "outline" => Some(InputFormat::Outline),
        _ => None,
    }
}

fn sniff_format(input: &str) -> InputFormat {
    if input.trim_start().starts_with('{') {
        InputFormat::Json
    } else {
        InputFormat::Outline
    }
}

fn bounds_from_args(center: Position, width: Option<f64>, height: Option<f64>) -> Option<Rect> {
    match (width, height) {
        (Some(width), Some(height)) => Some(Rect::centered(center, width, height)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension_then_content() {
        assert_eq!(
            format_from_extension(Path::new("tree.JSON")),
            Some(InputFormat::Json)
        );
        assert_eq!(
            format_from_extension(Path::new("school.mm")),
            Some(InputFormat::Outline)
        );
        assert_eq!(format_from_extension(Path::new("notes")), None);
        assert_eq!(sniff_format("  {\"label\": \"x\"}"), InputFormat::Json);
        assert_eq!(sniff_format("mindmap\n  root"), InputFormat::Outline);
    }

    #[test]
    fn bounds_need_both_dimensions() {
        let center = Position::new(10.0, 20.0);
        assert_eq!(bounds_from_args(center, Some(100.0), None), None);
        assert_eq!(
            bounds_from_args(center, Some(100.0), Some(50.0)),
            Some(Rect::new(-40.0, -5.0, 60.0, 45.0))
        );
    }

    #[test]
    fn args_parse_negative_center() {
        let args = Args::try_parse_from([
            "mmlayout",
            "-i",
            "tree.json",
            "--center-x",
            "-50",
            "-a",
            "layered",
            "-dd",
        ])
        .unwrap();
        assert_eq!(args.center_x, -50.0);
        assert_eq!(args.debug, 2);
        assert!(matches!(args.algorithm, Some(AlgorithmArg::Layered)));
    }
}
