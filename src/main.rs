mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志系统
    rexam::logger::init_logger();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            manifest,
            config,
            strategy,
            verbose,
            no_history,
        } => {
            let passed =
                cli::run(&manifest, config.as_deref(), strategy, verbose, no_history).await?;
            if !passed {
                std::process::exit(1);
            }
        }
        Commands::Plan {
            manifest,
            config,
            strategy,
            containers,
        } => cli::plan(&manifest, config.as_deref(), strategy, containers).await?,
        Commands::Config { config } => cli::show_config(config.as_deref())?,
        Commands::History { limit } => cli::show_history(limit)?,
    }
    Ok(())
}
