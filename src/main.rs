mod cli;
mod commands;
mod mcp;
mod page_range;
mod pdf;
mod plan;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use page_range::RangePolicy;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "pagepick=debug" } else { "pagepick=info" };

    // stdout belongs to command output and the MCP transport
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Mcp => {
            mcp::run_server().await?;
        }
        Commands::Info { path } => {
            commands::info::run(&path)?;
        }
        Commands::Outline { path } => {
            commands::outline::run(&path)?;
        }
        Commands::Plan {
            path,
            pages,
            strict,
        } => {
            commands::plan::run(&path, &pages, RangePolicy::from_strict(strict))?;
        }
        Commands::Extract {
            path,
            pages,
            output,
            output_dir,
            strict,
        } => {
            let options = commands::extract::ExtractOptions {
                pages,
                output,
                output_dir,
                policy: RangePolicy::from_strict(strict),
            };
            commands::extract::run(&path, &options)?;
        }
        Commands::Merge {
            inputs,
            order,
            output,
            output_dir,
            strict,
        } => {
            let options = commands::merge::MergeOptions {
                order,
                output,
                output_dir,
                policy: RangePolicy::from_strict(strict),
            };
            commands::merge::run(&inputs, &options)?;
        }
    }

    Ok(())
}
