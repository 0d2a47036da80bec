use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod config;
mod error;
mod gait_events;
mod import;
mod lowpass;
mod pipeline;
mod signal;
mod summary;
mod trial_io;

use config::PipelineConfig;
use gait_events::{ContactRule, SearchDirection};

#[derive(Parser, Debug)]
#[command(name = "gait-strides", about = "Foot-contact detection and stride times from insole force data")]
struct Args {
    /// JSON configuration file; flags below override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Folder with raw insole exports
    #[arg(long, global = true)]
    raw_root: Option<PathBuf>,

    /// Folder with BIDS trial files
    #[arg(long, global = true)]
    input_root: Option<PathBuf>,

    /// Folder for stride tables and reports
    #[arg(long, global = true)]
    output_root: Option<PathBuf>,

    /// Force threshold for rise/fall edges (N)
    #[arg(long, global = true)]
    rise_fall_edge: Option<f64>,

    /// Samples per local line fit
    #[arg(long, global = true)]
    slope_window: Option<usize>,

    /// Slope magnitude that counts as flat (N/sample)
    #[arg(long, global = true)]
    slope_tolerance: Option<f64>,

    /// Contact level below the plateau force (N); negative puts it above
    #[arg(long, global = true, allow_negative_numbers = true)]
    offset_contact: Option<f64>,

    /// Contact is the first sample below the level instead of the first reaching it
    #[arg(long, global = true, default_value_t = false)]
    drop_below: bool,

    /// Walk backward from each edge instead of forward
    #[arg(long, global = true, default_value_t = false)]
    backward: bool,

    /// Zero-phase low-pass on force before detection (Hz)
    #[arg(long, global = true)]
    lowpass_hz: Option<f64>,

    /// Debug logging
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reformat raw recordings into BIDS trial files
    Import,
    /// Detect contacts and write per-participant stride tables
    Extract,
    /// Summarize stride tables per participant and group
    Summarize,
    /// Extract, then summarize
    All,
}

fn build_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("reading configuration {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(p) = &args.raw_root {
        config.raw_root = p.clone();
    }
    if let Some(p) = &args.input_root {
        config.input_root = p.clone();
    }
    if let Some(p) = &args.output_root {
        config.output_root = p.clone();
    }
    if let Some(v) = args.rise_fall_edge {
        config.params.rise_fall_edge = v;
    }
    if let Some(v) = args.slope_window {
        config.params.slope_window = v;
    }
    if let Some(v) = args.slope_tolerance {
        config.params.slope_tolerance = v;
    }
    if let Some(v) = args.offset_contact {
        config.params.offset_contact = v;
    }
    if args.drop_below {
        config.params.contact_rule = ContactRule::DropBelow;
    }
    if args.backward {
        config.params.direction = SearchDirection::Backward;
    }
    if args.lowpass_hz.is_some() {
        config.lowpass_cutoff_hz = args.lowpass_hz;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let config = build_config(&args)?;
    log::debug!("{:?}", config);

    match args.command {
        Command::Import => {
            println!("\n📥 Importing raw recordings...");
            import::run_import(&config).context("import failed")?;
        }
        Command::Extract => {
            println!("\n🦶 Extracting stride times...");
            let report = pipeline::run_extraction(&config).context("extraction failed")?;
            pipeline::print_extraction_summary(&report);
        }
        Command::Summarize => {
            summary::run_summary(&config).context("summary failed")?;
        }
        Command::All => {
            println!("\n🦶 Extracting stride times...");
            let report = pipeline::run_extraction(&config).context("extraction failed")?;
            pipeline::print_extraction_summary(&report);
            summary::run_summary(&config).context("summary failed")?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::try_parse_from([
            "gait-strides",
            "--output-root",
            "/tmp/gait-out",
            "--slope-window",
            "9",
            "--offset-contact",
            "-20",
            "--drop-below",
            "--backward",
            "--lowpass-hz",
            "15",
            "extract",
        ])
        .unwrap();
        let config = build_config(&args).unwrap();

        assert_eq!(config.output_root, PathBuf::from("/tmp/gait-out"));
        assert_eq!(config.params.slope_window, 9);
        assert_eq!(config.params.offset_contact, -20.0);
        assert_eq!(config.params.contact_rule, ContactRule::DropBelow);
        assert_eq!(config.params.direction, SearchDirection::Backward);
        assert_eq!(config.lowpass_cutoff_hz, Some(15.0));
        // untouched values keep their defaults
        assert_eq!(config.params.rise_fall_edge, 500.0);
        assert_eq!(config.input_root, PipelineConfig::default().input_root);
        assert!(matches!(args.command, Command::Extract));
    }

    #[test]
    fn test_flags_go_through_validation() {
        let args = Args::try_parse_from(["gait-strides", "--slope-window", "0", "extract"]).unwrap();
        let err = build_config(&args).unwrap_err();
        assert!(format!("{:#}", err).contains("slope_window"));

        let args = Args::try_parse_from(["gait-strides", "summarize"]).unwrap();
        assert_eq!(build_config(&args).unwrap(), PipelineConfig::default());
    }
}
