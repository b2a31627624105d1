use clap::{Parser, Subcommand};
use std::path::PathBuf;
use anyhow::Result;

use crate::core::Engine;

#[derive(Parser)]
#[command(name = "traceflow")]
#[command(about = "Convert trace logs into sequence diagrams")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a trace file into a sequence diagram description
    Generate {
        /// Input trace file (defaults to standard input)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output document (defaults to the configured document, trace.fdl)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only write the document; do not launch the renderer
        #[arg(long)]
        no_render: bool,
    },

    /// Write the default configuration file
    Init {
        /// Target directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Validate regexes, templates and handler names
    Check {
        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },

    /// Render the existing scenario project
    Render,
}

impl Cli {
    pub async fn execute(self, engine: Engine) -> Result<()> {
        match self.command {
            Commands::Generate { input, output, no_render } => {
                engine.generate(input, output, no_render).await
            }
            Commands::Init { path, force } => {
                engine.init(path, force).await
            }
            Commands::Check { strict } => {
                engine.check(strict).await
            }
            Commands::Render => {
                engine.render().await
            }
        }
    }
}
