//! # blogmark CLI
//!
//! Command-line interface for the blogmark markdown pipeline.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "blogmark")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = blogmark_core::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new blogmark project
    Init {
        /// Target directory (defaults to current directory)
        path: Option<PathBuf>,
    },

    /// Render every page under the content directory
    Build {
        /// Parallel renders (overrides build.jobs)
        #[arg(long)]
        jobs: Option<usize>,

        /// Stop at the first failed page
        #[arg(long)]
        fail_fast: bool,
    },

    /// Render a single markdown file to stdout
    Render {
        /// Markdown file
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = RenderFormat::Html)]
        format: RenderFormat,

        /// Wrap the fragment in the configured wrapper component
        #[arg(long)]
        wrap: bool,
    },

    /// List the bundled highlight themes and languages
    Themes,
}

#[derive(Copy, Clone, ValueEnum)]
pub enum RenderFormat {
    Html,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init { path } => commands::init_project(path.as_deref()),
        Commands::Build { jobs, fail_fast } => {
            let opts = commands::BuildOptions { jobs, fail_fast };
            commands::build_site(&cli.config, opts).await
        }
        Commands::Render { file, format, wrap } => {
            commands::render_file(&cli.config, &file, format, wrap)
        }
        Commands::Themes => commands::list_themes(&cli.config),
    }
}
