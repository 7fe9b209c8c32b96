//! Report artifacts: the full run report structure plus the CSV/JSON writers
//! and the end-of-run console summary.

pub mod console;
pub mod csv;

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::inspect::InterfaceInfo;
use crate::probes::ProbeRecord;
use crate::run::summary::RunSummary;

/// The complete artifact for one invocation. Field names are stable so
/// before/after JSON files stay diffable across versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub tool_version: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub hostname: String,
    pub os: String,
    pub target: String,
    pub iterations_requested: u32,
    pub iterations_completed: u32,
    pub interrupted: bool,
    pub interfaces: Vec<InterfaceInfo>,
    pub records: Vec<ProbeRecord>,
    pub summary: RunSummary,
}

/// Per-path result of a report write. Both outputs are always attempted;
/// one unwritable path never discards the other artifact.
#[derive(Debug)]
pub struct WriteOutcome {
    pub csv: Result<(), String>,
    pub json: Result<(), String>,
}

impl WriteOutcome {
    pub fn any_written(&self) -> bool {
        self.csv.is_ok() || self.json.is_ok()
    }

    pub fn all_written(&self) -> bool {
        self.csv.is_ok() && self.json.is_ok()
    }
}

/// Write both artifacts, independently. Failures are reported per path; the
/// caller decides whether zero written outputs is fatal.
pub fn write_reports(report: &RunReport, csv_path: &Path, json_path: &Path) -> WriteOutcome {
    let csv = csv::write(report, csv_path).map_err(|e| {
        error!(path = %csv_path.display(), error = %e, "failed to write CSV report");
        format!("{}: {}", csv_path.display(), e)
    });
    if csv.is_ok() {
        info!(path = %csv_path.display(), "CSV report written");
    }

    let json = write_json(report, json_path).map_err(|e| {
        error!(path = %json_path.display(), error = %e, "failed to write JSON report");
        format!("{}: {}", json_path.display(), e)
    });
    if json.is_ok() {
        info!(path = %json_path.display(), "JSON report written");
    }

    WriteOutcome { csv, json }
}

fn write_json(report: &RunReport, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let body = serde_json::to_string_pretty(report).map_err(std::io::Error::other)?;
    std::fs::write(path, body + "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::InterfaceKind;
    use crate::probes::{ProbeKind, ProbeMetrics, ProbeOutcome};

    pub(crate) fn sample_report() -> RunReport {
        let records = vec![
            ProbeRecord {
                kind: ProbeKind::Latency,
                iteration: 0,
                timestamp: Utc::now(),
                outcome: ProbeOutcome::Success {
                    metrics: ProbeMetrics::Latency {
                        min_ms: 9.0,
                        avg_ms: 10.0,
                        max_ms: 11.0,
                        mdev_ms: 0.8,
                        jitter_ms: 0.5,
                        sent: 20,
                        received: 20,
                        loss_pct: 0.0,
                    },
                },
            },
            ProbeRecord {
                kind: ProbeKind::Throughput,
                iteration: 0,
                timestamp: Utc::now(),
                outcome: ProbeOutcome::Skipped {
                    reason: "no iperf3 server configured".to_string(),
                },
            },
        ];
        let summary = RunSummary::compute(&records);

        let mut iface = InterfaceInfo::new("eth0", InterfaceKind::Wired);
        iface.ipv4 = Some("192.168.1.5".to_string());
        iface.link_speed_mbps = Some(1000);

        RunReport {
            run_id: Uuid::new_v4(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            hostname: "testhost".to_string(),
            os: "Linux 6.1".to_string(),
            target: "8.8.8.8".to_string(),
            iterations_requested: 1,
            iterations_completed: 1,
            interrupted: false,
            interfaces: vec![iface],
            records,
            summary,
        }
    }

    #[test]
    fn test_json_report_roundtrips() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        let report = sample_report();

        write_json(&report, &path).unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        let back: RunReport = serde_json::from_str(&body).unwrap();
        assert_eq!(back.run_id, report.run_id);
        assert_eq!(back.records.len(), 2);
        assert_eq!(back.summary, report.summary);
    }

    /// A path whose parent is a regular file can never be created.
    fn unwritable_path(dir: &Path, name: &str) -> std::path::PathBuf {
        let blocker = dir.join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        blocker.join(name)
    }

    #[test]
    fn test_partial_write_keeps_valid_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let json_path = dir.path().join("report.json");
        let bad_csv = unwritable_path(dir.path(), "report.csv");
        let report = sample_report();

        let outcome = write_reports(&report, &bad_csv, &json_path);

        assert!(outcome.csv.is_err());
        assert!(outcome.json.is_ok());
        assert!(outcome.any_written());
        assert!(!outcome.all_written());

        // The valid artifact is complete despite the other path failing.
        let body = std::fs::read_to_string(&json_path).unwrap();
        assert!(serde_json::from_str::<RunReport>(&body).is_ok());
        // And the failure names the offending path.
        assert!(outcome.csv.unwrap_err().contains("blocker"));
    }

    #[test]
    fn test_both_paths_failing_reports_both() {
        let dir = tempfile::TempDir::new().unwrap();
        let report = sample_report();
        let outcome = write_reports(
            &report,
            &unwritable_path(dir.path(), "a.csv"),
            &unwritable_path(dir.path(), "b.json"),
        );
        assert!(!outcome.any_written());
    }
}
