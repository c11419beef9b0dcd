//! Turnstile license client
//!
//! Usage:
//!   turnstile --config turnstile.json validate
//!   turnstile --config turnstile.json report --with-license --output report.json

use std::{io, path::PathBuf, process::ExitCode};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;
use turnstile_client::{Client, ClientConfig, JsonReportSink, render};

#[derive(Parser, Debug)]
#[command(name = "turnstile")]
#[command(about = "Validates a product license under a floating lease")]
struct Args {
    /// Path to the client configuration file
    #[arg(short, long, default_value = "turnstile.json")]
    config: PathBuf,

    /// Override the configured user key
    #[arg(long)]
    user_key: Option<String>,

    /// Override the configured product
    #[arg(long)]
    product: Option<String>,

    /// Override the configured license file
    #[arg(long)]
    license: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the license and print its grants
    Validate,
    /// Send a usage report
    Report {
        /// Validate first so the report carries read counts
        #[arg(long)]
        with_license: bool,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Args {
    fn load_config(&self) -> Result<ClientConfig> {
        let mut config = ClientConfig::load(&self.config)?;
        if let Some(user_key) = &self.user_key {
            config.user_key = user_key.clone();
        }
        if let Some(product) = &self.product {
            config.product = product.clone();
        }
        if let Some(license) = &self.license {
            config.license_path = license.clone();
        }
        config.check()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();

    let config = args.load_config()?;
    info!(client = %config.client_id, product = %config.product, "Turnstile client starting");
    let client = Client::from_config(config)?;

    match args.command {
        Command::Validate => {
            let session = client.validate().await?;
            render(&session, &mut io::stdout().lock()).context("printing license")?;
            if !session.outcome.is_valid() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Report {
            with_license,
            output,
        } => {
            let session = if with_license {
                Some(client.validate().await?)
            } else {
                None
            };
            let sink = match output {
                Some(path) => JsonReportSink::file(path),
                None => JsonReportSink::stdout(),
            };
            client.report(session.as_ref(), &sink)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}
