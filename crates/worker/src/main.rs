//! `simfleet` -- simulation fan-out dispatcher.
//!
//! Builds one workspace per instance, runs `make` in each one locally or
//! through the grid scheduler, prints a status table while work remains,
//! and collects the results.
//!
//! # Environment variables
//!
//! | Variable                        | Default | Description                             |
//! |---------------------------------|---------|-----------------------------------------|
//! | `RUST_LOG`                      | `simfleet=info,simfleet_worker=info` | Log filter |
//! | `SIMFLEET_SCHEDULER`            | `qsub`  | Grid submission command                 |
//! | `SIMFLEET_POLL_INTERVAL_MS`     | `1000`  | Grid marker poll interval               |
//! | `SIMFLEET_REPORT_INTERVAL_SECS` | `5`     | Status table interval                   |

mod cli;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use simfleet_core::config::RunConfig;
use simfleet_core::settings::EngineSettings;
use simfleet_worker::dispatcher::Dispatcher;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "simfleet=info,simfleet_worker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = match RunConfig::from_args(cli.into_run_args()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("simfleet: {e}");
            return Ok(ExitCode::FAILURE);
        }
    };

    let settings = EngineSettings::from_env();
    tracing::info!(
        project = %config.project_root.display(),
        work = %config.work_dir.display(),
        start = config.start_index,
        instances = config.instances,
        dop = config.dop,
        "Starting simfleet",
    );

    let dispatcher = Dispatcher::new(config, settings);
    let mut snapshots = dispatcher.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match snapshots.recv().await {
                Ok(snapshot) => println!("{}", snapshot.render_table()),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Status printer lagging");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let report = dispatcher.run().await.context("run did not complete")?;
    drop(dispatcher);
    printer.await.context("status printer failed")?;

    if let Some(archive) = &report.archive {
        tracing::info!(
            archive = %archive.path.display(),
            members = archive.members.len(),
            "Results archived",
        );
    }

    let failed = report.failed_count();
    if failed > 0 {
        tracing::error!(failed, total = report.outcomes.len(), "Some workers failed");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
