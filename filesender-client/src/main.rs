//! FileSender command-line client

use std::collections::BTreeSet;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use anyhow::{Context, bail};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;

use filesender_client::app::{CliHandler, PendingDownloads, report_progress};
use filesender_client::args::Args;
use filesender_client::config::{Config, Settings};
use filesender_client::logging;
use filesender_client::network::{self, ClientCommand};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let settings = match &args.config {
        Some(path) => Settings::load(path),
        None => Settings::load_default(),
    }
    .context("failed to load settings")?;
    let config = Config::resolve(settings, &args).context("invalid configuration")?;

    logging::init(&config.log_level, args.debug);

    let receives_files = config.auto_accept || !config.downloads.is_empty();
    if receives_files && !config.list_only {
        let is_dir = tokio::fs::metadata(&config.download_dir)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            bail!(
                "download directory {} does not exist",
                config.download_dir.display()
            );
        }
    }

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let pending: PendingDownloads = Arc::new(Mutex::new(
        config.downloads.iter().copied().collect::<BTreeSet<i32>>(),
    ));

    let handler = CliHandler::new(&config, cmd_tx.clone(), event_tx, Arc::clone(&pending));
    let reporter = tokio::spawn(report_progress(
        event_rx,
        pending,
        cmd_tx.clone(),
        config.auto_accept,
    ));

    let interrupt_tx = cmd_tx;
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, closing connection");
            let _ = interrupt_tx.send(ClientCommand::Close);
        }
    });

    let handler = network::run(&config.server_url, config.client.clone(), handler, cmd_rx)
        .await
        .with_context(|| format!("could not connect to {}", config.server_url))?;
    let outcome = handler.into_outcome();

    let failures = reporter.await.context("progress reporter failed")?;

    if outcome.is_success() && failures == 0 {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
