//! treeconf - Hierarchical Text Configuration Files
//!
//! Command-line entry point: parses arguments, sets up logging and runs the
//! requested command.

use anyhow::Context;
use clap::Parser;
use tracing::error;
use treeconf::{
    cli::{TreeConfCli, TreeConfCliExecutor},
    logging::init_logging,
};

fn main() -> anyhow::Result<()> {
    let cli = TreeConfCli::parse();

    let log_config = cli
        .log_config()
        .context("Failed to read logging settings")?;
    init_logging(&log_config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let executor = TreeConfCliExecutor::new(cli.read, cli.json);
    match executor.execute(cli.command) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {}", e);
            Err(e).context("treeconf command failed")
        }
    }
}
