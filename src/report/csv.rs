//! Flat tabular report: one row per (iteration, probe kind), then trailing
//! summary blocks. Written by hand; the column set is fixed so before/after
//! files line up in a diff.

use std::fmt::Write as _;
use std::path::Path;

use crate::probes::{ProbeMetrics, ProbeOutcome, ProbeRecord};
use crate::run::summary::RunSummary;

use super::RunReport;

const HEADER: &str = "timestamp,iteration,probe,status,min_ms,avg_ms,max_ms,mdev_ms,\
jitter_ms,loss_pct,send_mbps,recv_mbps,retransmits,download_mbps,upload_mbps,ping_ms,\
transfer_mbps,elapsed_secs,detail";

pub fn write(report: &RunReport, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, render(report))
}

pub fn render(report: &RunReport) -> String {
    let mut out = String::new();
    out.push_str(HEADER);
    out.push('\n');

    for record in &report.records {
        out.push_str(&data_row(record));
        out.push('\n');
    }

    out.push('\n');
    render_summary(&mut out, &report.summary);
    out
}

fn data_row(record: &ProbeRecord) -> String {
    let mut row = Row::default();

    match &record.outcome {
        ProbeOutcome::Success { metrics } => {
            fill_metrics(&mut row, metrics);
        }
        ProbeOutcome::Failure { diagnostic } => {
            row.detail = diagnostic.clone();
        }
        ProbeOutcome::Skipped { reason } => {
            row.detail = reason.clone();
        }
    }

    let status = match &record.outcome {
        ProbeOutcome::Success { .. } => "success",
        ProbeOutcome::Failure { .. } => "failure",
        ProbeOutcome::Skipped { .. } => "skipped",
    };

    format!(
        "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
        record.timestamp.format("%Y-%m-%d %H:%M:%S"),
        record.iteration,
        record.kind,
        status,
        row.min_ms,
        row.avg_ms,
        row.max_ms,
        row.mdev_ms,
        row.jitter_ms,
        row.loss_pct,
        row.send_mbps,
        row.recv_mbps,
        row.retransmits,
        row.download_mbps,
        row.upload_mbps,
        row.ping_ms,
        row.transfer_mbps,
        row.elapsed_secs,
        escape(&row.detail),
    )
}

/// One data row's cells; anything not meaningful for the record stays empty.
#[derive(Default)]
struct Row {
    min_ms: String,
    avg_ms: String,
    max_ms: String,
    mdev_ms: String,
    jitter_ms: String,
    loss_pct: String,
    send_mbps: String,
    recv_mbps: String,
    retransmits: String,
    download_mbps: String,
    upload_mbps: String,
    ping_ms: String,
    transfer_mbps: String,
    elapsed_secs: String,
    detail: String,
}

fn fill_metrics(row: &mut Row, metrics: &ProbeMetrics) {
    let fmt = |v: f64| format!("{:.2}", v);
    match metrics {
        ProbeMetrics::Latency {
            min_ms,
            avg_ms,
            max_ms,
            mdev_ms,
            jitter_ms,
            loss_pct,
            ..
        } => {
            row.min_ms = fmt(*min_ms);
            row.avg_ms = fmt(*avg_ms);
            row.max_ms = fmt(*max_ms);
            row.mdev_ms = fmt(*mdev_ms);
            row.jitter_ms = fmt(*jitter_ms);
            row.loss_pct = fmt(*loss_pct);
        }
        ProbeMetrics::Throughput {
            send_mbps,
            recv_mbps,
            retransmits,
            udp_jitter_ms,
            udp_loss_pct,
            duration_secs,
            ..
        } => {
            row.send_mbps = fmt(*send_mbps);
            row.recv_mbps = fmt(*recv_mbps);
            if let Some(r) = retransmits {
                row.retransmits = r.to_string();
            }
            // UDP jitter/loss share the generic jitter and loss columns.
            if let Some(j) = udp_jitter_ms {
                row.jitter_ms = fmt(*j);
            }
            if let Some(l) = udp_loss_pct {
                row.loss_pct = fmt(*l);
            }
            row.elapsed_secs = fmt(*duration_secs);
        }
        ProbeMetrics::InternetSpeed {
            download_mbps,
            upload_mbps,
            ping_ms,
            jitter_ms,
            ..
        } => {
            row.download_mbps = fmt(*download_mbps);
            row.upload_mbps = fmt(*upload_mbps);
            if let Some(p) = ping_ms {
                row.ping_ms = fmt(*p);
            }
            if let Some(j) = jitter_ms {
                row.jitter_ms = fmt(*j);
            }
        }
        ProbeMetrics::LocalTransfer {
            mbps, elapsed_secs, ..
        } => {
            row.transfer_mbps = fmt(*mbps);
            row.elapsed_secs = fmt(*elapsed_secs);
        }
    }
}

fn render_summary(out: &mut String, summary: &RunSummary) {
    out.push_str("probe,successes,failures,skipped\n");
    for kind in &summary.kinds {
        let _ = writeln!(
            out,
            "{},{},{},{}",
            kind.kind, kind.successes, kind.failures, kind.skipped
        );
    }

    out.push('\n');
    out.push_str("probe,metric,count,mean,min,max,std_dev\n");
    for kind in &summary.kinds {
        for (name, stats) in &kind.metrics {
            let _ = writeln!(
                out,
                "{},{},{},{:.2},{:.2},{:.2},{:.2}",
                kind.kind, name, stats.count, stats.mean, stats.min, stats.max, stats.std_dev
            );
        }
    }
}

/// Quote a field when it contains a delimiter, quote, or newline.
fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
