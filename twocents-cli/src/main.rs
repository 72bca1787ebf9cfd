mod cli;
mod commands;
mod config;
mod output;

use crate::{
    cli::{Args, Commands},
    commands::{CommandExecutor, Overrides},
    config::AppConfig,
};
use anyhow::Result;
use clap::Parser;
use std::process;
use tracing::{Level, error, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Application error: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    // Config commands never touch the network
    if let Commands::Config { show, reset } = &args.command {
        if *reset {
            AppConfig::reset(args.config.as_deref())?;
            println!("Configuration reset to defaults");
        } else if *show {
            let config = AppConfig::load(args.config.as_deref())?;
            println!("{}", config.show()?);
        } else {
            println!("Use --show to display current configuration or --reset to reset to defaults");
        }
        return Ok(());
    }

    let config = AppConfig::load(args.config.as_deref())?;
    info!(base_url = %config.base_url, "Starting twocents");

    let overrides = Overrides {
        token: args.token,
        base_url: args.base_url,
        timeout: args.timeout,
    };
    let executor = CommandExecutor::new(&config, overrides, args.output).await?;

    match args.command {
        Commands::Fetch { url, kind } => executor.fetch(&url, kind.into()).await?,
        Commands::Whoami => executor.whoami().await?,
        Commands::Groups => executor.groups().await?,
        Commands::Members { group } => executor.members(group).await?,
        Commands::Feed {
            group,
            all,
            resolve,
        } => executor.feed(group, all, resolve).await?,
        Commands::Top { group } => executor.top(group).await?,
        Commands::Post {
            kind,
            file,
            text,
            link,
            caption,
            groups,
        } => {
            executor
                .post(kind, file, text, link, caption, groups)
                .await?
        }
        Commands::Cache { action } => executor.cache(action).await?,
        Commands::Config { .. } => {}
    }

    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_level(verbose).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
