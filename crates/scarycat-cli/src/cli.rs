use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "scarycat")]
#[command(author, version, about = "Screen cat photos for scary behavior")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Screen image files against every model in the models directory
    Screen {
        /// Image files to screen
        #[arg(required = true)]
        images: Vec<PathBuf>,

        #[command(flatten)]
        models: ModelArgs,

        /// Flag images with any label confidence above this value
        #[arg(short, long, value_parser = parse_threshold)]
        threshold: Option<f32>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Record images that fail to score and keep going
        #[arg(long)]
        continue_on_error: bool,

        /// Print Prometheus metrics to stderr when done
        #[arg(long)]
        metrics: bool,
    },

    /// Load the models directory and list the catalog
    Models {
        #[command(flatten)]
        models: ModelArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Directory containing model files (overrides the config file)
    #[arg(short, long, env = "SCARYCAT_MODELS_DIR")]
    pub models_dir: Option<PathBuf>,

    /// Screener configuration file (YAML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

fn parse_threshold(s: &str) -> Result<f32, String> {
    let value: f32 = s.parse().map_err(|e| format!("{e}"))?;
    scarycat_screener::validate_threshold(value).map_err(|e| e.to_string())
}
