//! Wires the HTTP endpoint, the transfer service and the terminal together.

use std::sync::Arc;

use anyhow::{Context, anyhow, bail};
use filedrop_coordinator::{TransferOutcome, TransferService};
use filedrop_http::HttpEndpoint;
use filedrop_transfer::{FileSink, FileSource, TransferState, validate_remote_path};

use crate::cli::Command;
use crate::config::Config;
use crate::render;

/// Runs one transfer to completion. Ctrl-C cancels it.
pub async fn run(config: Config, server: &str, command: Command) -> anyhow::Result<()> {
    let endpoint = HttpEndpoint::new(server).with_context(|| format!("bad server URL {server}"))?;
    let mut service = TransferService::new(Arc::new(endpoint), config.transfer_config());

    let events = service
        .take_events()
        .context("event receiver already taken")?;
    let printer = tokio::spawn(render::render_events(events));

    let outcome = {
        let registry = service.registry().clone();
        let transfer = execute(&service, command);
        tokio::pin!(transfer);

        let mut interrupted = false;
        loop {
            tokio::select! {
                outcome = &mut transfer => break outcome,
                signal = tokio::signal::ctrl_c(), if !interrupted => {
                    interrupted = true;
                    if let Err(e) = signal {
                        tracing::warn!("failed to listen for Ctrl-C: {e}");
                        continue;
                    }
                    let cancelled = registry.cancel_all();
                    tracing::info!(cancelled, "interrupt received, cancelling");
                }
            }
        }
    };

    // Closing the event channel lets the printer drain and exit.
    drop(service);
    if let Err(e) = printer.await {
        tracing::warn!("progress printer stopped: {e}");
    }

    report(outcome?)
}

async fn execute(service: &TransferService, command: Command) -> anyhow::Result<TransferOutcome> {
    match command {
        Command::Upload { local, remote } => {
            let mut source = FileSource::open(&local)
                .await
                .with_context(|| format!("cannot read {}", local.display()))?;
            Ok(service.upload(&remote, &mut source, &remote).await?)
        }
        Command::Download { remote, local } => {
            // Checked before the sink exists so a bad path leaves no partial file.
            validate_remote_path(&remote)?;
            let mut sink = FileSink::create(&local)
                .await
                .with_context(|| format!("cannot write {}", local.display()))?;
            Ok(service.download(&remote, &remote, &mut sink).await?)
        }
        Command::Help => bail!("nothing to transfer"),
    }
}

fn report(outcome: TransferOutcome) -> anyhow::Result<()> {
    match outcome.state {
        TransferState::Completed => {
            tracing::info!(
                id = %outcome.id,
                bytes = outcome.bytes_transferred,
                token = outcome.session_token.as_deref().unwrap_or("-"),
                "{} finished",
                outcome.direction
            );
            Ok(())
        }
        TransferState::Cancelled => bail!("{} of {} cancelled", outcome.direction, outcome.id),
        _ => {
            let error = outcome
                .error
                .map(anyhow::Error::from)
                .unwrap_or_else(|| anyhow!("ended in state {}", outcome.state));
            Err(error.context(format!("{} of {} failed", outcome.direction, outcome.id)))
        }
    }
}
