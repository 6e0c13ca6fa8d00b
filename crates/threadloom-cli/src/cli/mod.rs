//! CLI entry and dispatch.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use threadloom_core::config::{self, OutputFormat};
use threadloom_core::logging;

mod commands;
mod input;

#[derive(Parser)]
#[command(name = "threadloom")]
#[command(version)]
#[command(about = "Rebuild threaded comment forests from flat comment exports")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log debug details about repaired references (overrides config filter)
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Where to read comments from.
#[derive(clap::Args, Debug, Clone, Default)]
struct InputArgs {
    /// JSON array or JSON-lines file of comments ("-" or omitted reads stdin)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,
}

impl InputArgs {
    fn path(&self) -> Option<&Path> {
        self.file.as_deref().filter(|p| p.as_os_str() != "-")
    }
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Print the threaded forest
    Render {
        #[command(flatten)]
        input: InputArgs,

        /// Output format (text or json); defaults to render.format from config
        #[arg(short, long)]
        format: Option<OutputFormat>,

        /// Expand every reply subtree in the text outline
        #[arg(long)]
        expand_all: bool,

        /// Hide creation times in the text outline
        #[arg(long = "no-timestamps")]
        no_timestamps: bool,
    },

    /// Report comments that had to be threaded as roots or dropped
    Audit {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Generate a fresh config from Rust defaults (for xtask)
    Generate,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load().context("load config")?;

    // Held until exit so file logs are flushed.
    let _log_guard = logging::init(&config.log, cli.verbose).context("init logging")?;

    dispatch(cli.command, &config)
}

fn dispatch(command: Commands, config: &config::Config) -> Result<()> {
    match command {
        Commands::Render {
            input,
            format,
            expand_all,
            no_timestamps,
        } => commands::render::run(
            &commands::render::RenderOptions {
                file: input.path(),
                format: format.unwrap_or(config.render.format),
                expand_all: expand_all || config.render.expand_all,
                show_timestamps: config.render.show_timestamps && !no_timestamps,
            },
            config,
        ),

        Commands::Audit { input } => commands::audit::run(input.path(), config),

        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::Generate => commands::config::generate(),
        },
    }
}
