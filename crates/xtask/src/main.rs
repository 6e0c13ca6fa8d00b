use std::fs;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "xtask", about = "Threadloom maintainer tasks")]
struct Cli {
    #[command(subcommand)]
    command: Option<CommandName>,
}

#[derive(Debug, Default, Subcommand)]
enum CommandName {
    /// Rewrite threadloom-core/default_config.toml from `Config::default()`.
    #[default]
    UpdateDefaultConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or_default() {
        CommandName::UpdateDefaultConfig => update_default_config(),
    }
}

fn update_default_config() -> Result<()> {
    let root = project_root()?;
    let template = root.join("crates/threadloom-core/default_config.toml");

    // An empty THREADLOOM_HOME keeps a local config.toml out of the output.
    let scratch_home = tempfile::tempdir().context("create scratch THREADLOOM_HOME")?;

    let generated = Command::new("cargo")
        .current_dir(&root)
        .env("THREADLOOM_HOME", scratch_home.path())
        .args(["run", "--quiet", "-p", "threadloom", "--", "config", "generate"])
        .output()
        .context("spawn cargo to run `threadloom config generate`")?;

    if !generated.status.success() {
        bail!(
            "`threadloom config generate` exited with {}:\n{}",
            generated.status,
            String::from_utf8_lossy(&generated.stderr)
        );
    }

    let before = fs::read(&template).unwrap_or_default();
    if before == generated.stdout {
        println!("{} is up to date", template.display());
        return Ok(());
    }

    fs::write(&template, &generated.stdout)
        .with_context(|| format!("write {}", template.display()))?;
    println!("Rewrote {}", template.display());
    Ok(())
}

/// `crates/xtask` sits two levels below the workspace root.
fn project_root() -> Result<PathBuf> {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .ancestors()
        .nth(2)
        .map(PathBuf::from)
        .context("locate workspace root from CARGO_MANIFEST_DIR")
}
