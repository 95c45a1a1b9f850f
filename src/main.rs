use anyhow::{Context, Result};
use clap::Parser;
use std::io;

use mesh_turntable::cli::Cli;
use mesh_turntable::config::Config;
use mesh_turntable::picker::InteractivePicker;
use mesh_turntable::pipeline;
use mesh_turntable::viewer::WinitLauncher;

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::from_cli(&cli).context("invalid configuration")?;

    let stdin = io::stdin();
    let mut picker = InteractivePicker::new(WinitLauncher, stdin.lock(), io::stdout());

    let summary = pipeline::run(&config, &mut picker)
        .with_context(|| format!("failed to turn {} into a GIF", config.mesh_path.display()))?;

    println!("GIF saved to {}", summary.gif_path.display());
    Ok(())
}
