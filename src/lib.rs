//! netvitals -- before/after network performance measurement for one host.
//!
//! Orchestrates external diagnostic tools (ping, iperf3, speedtest, local
//! file copy), normalizes their output into a uniform record schema, and
//! writes comparable CSV and JSON reports.

pub mod config;
pub mod inspect;
pub mod probes;
pub mod report;
pub mod run;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use config::RunConfig;
use report::RunReport;
use run::Aggregator;

/// Execute a full measurement run: snapshot interfaces, drive the probe
/// iterations, write both report artifacts, print the console summary.
///
/// Returns an error only for orchestration-level failure (no output could
/// be written); probe failures and interrupts are recorded in the report.
pub async fn execute(config: RunConfig) -> Result<RunReport> {
    let started_at = Utc::now();
    let host = inspect::host_info();
    info!(hostname = %host.hostname, os = %host.os, "starting measurement run");

    // Interface snapshot happens exactly once, before the loop.
    let interfaces = inspect::platform_inspector().inspect();
    info!(count = interfaces.len(), "captured interface snapshot");

    let cancel = Arc::new(AtomicBool::new(false));
    spawn_interrupt_watcher(cancel.clone());

    let probes = probes::build_set(&config);
    let aggregator = Aggregator::new(
        probes,
        config.general.iterations,
        Duration::from_secs(config.general.pause_secs),
        cancel,
    );
    let outcome = aggregator.run().await;

    if outcome.interrupted {
        warn!("run interrupted, writing partial results");
    }

    let report = RunReport {
        run_id: uuid::Uuid::new_v4(),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        started_at,
        finished_at: Utc::now(),
        hostname: host.hostname,
        os: host.os,
        target: config.general.target.clone(),
        iterations_requested: config.general.iterations,
        iterations_completed: outcome.iterations_completed,
        interrupted: outcome.interrupted,
        interfaces,
        records: outcome.records,
        summary: outcome.summary,
    };

    let written = report::write_reports(&report, &config.output.csv, &config.output.json);
    report::console::print_summary(&report);

    if let Err(e) = &written.csv {
        eprintln!("warning: CSV report not written ({e})");
    }
    if let Err(e) = &written.json {
        eprintln!("warning: JSON report not written ({e})");
    }
    if !written.any_written() {
        anyhow::bail!("no report could be written");
    }

    Ok(report)
}

/// Flip the cancel flag on Ctrl-C. The aggregator checks it between probes,
/// so the run still reaches summarizing and report emission.
fn spawn_interrupt_watcher(cancel: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing after the current probe");
            cancel.store(true, Ordering::Relaxed);
        }
    });
}
