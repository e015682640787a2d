//! `summer-gen` command-line surface.

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "summer-gen",
    version,
    about = "Generate DTOs, API skeletons and resilient channel stacks from annotated OpenAPI contracts"
)]
pub struct Cli {
    /// Log in JSON lines instead of human-readable text
    #[arg(long, global = true, env = "SUMMER_LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one generation round over a manifest of annotated declarations
    Generate {
        /// Manifest file (YAML or JSON) listing the declarations
        #[arg(short, long)]
        manifest: PathBuf,

        /// Output directory for generated sources
        #[arg(short, long, default_value = "generated")]
        output: PathBuf,

        /// Overwrite files that already exist
        #[arg(long)]
        force: bool,
    },
    /// Validate a manifest without writing any sources
    Lint {
        /// Manifest file (YAML or JSON) listing the declarations
        #[arg(short, long)]
        manifest: PathBuf,
    },
}

/// Install the global tracing subscriber. `RUST_LOG` filters as usual.
pub fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter);
    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}
