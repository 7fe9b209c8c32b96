//! End-to-end orchestration tests over a deterministic mock probe layer:
//! aggregator -> summary -> report artifacts, no external tools involved.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use netvitals::probes::{Disabled, Probe, ProbeKind, ProbeMetrics, ProbeOutcome};
use netvitals::report::{self, RunReport};
use netvitals::run::{AggregatedRun, Aggregator};

/// Probe that always returns the same canned outcome.
struct Scripted {
    kind: ProbeKind,
    outcome: ProbeOutcome,
}

#[async_trait::async_trait]
impl Probe for Scripted {
    fn kind(&self) -> ProbeKind {
        self.kind
    }

    async fn run(&self) -> ProbeOutcome {
        self.outcome.clone()
    }
}

fn mock_probes() -> Vec<Box<dyn Probe>> {
    vec![
        Box::new(Scripted {
            kind: ProbeKind::Latency,
            outcome: ProbeOutcome::Success {
                metrics: ProbeMetrics::Latency {
                    min_ms: 9.1,
                    avg_ms: 10.0,
                    max_ms: 11.4,
                    mdev_ms: 0.7,
                    jitter_ms: 0.4,
                    sent: 20,
                    received: 19,
                    loss_pct: 5.0,
                },
            },
        }),
        Box::new(Disabled::new(
            ProbeKind::Throughput,
            "no iperf3 server configured",
        )),
        Box::new(Scripted {
            kind: ProbeKind::InternetSpeed,
            outcome: ProbeOutcome::Failure {
                diagnostic: "speedtest: could not reach server".to_string(),
            },
        }),
        Box::new(Scripted {
            kind: ProbeKind::LocalTransfer,
            outcome: ProbeOutcome::Success {
                metrics: ProbeMetrics::LocalTransfer {
                    mbps: 845.2,
                    bytes: 104_857_600,
                    write_secs: 0.6,
                    read_secs: 0.4,
                    elapsed_secs: 1.0,
                },
            },
        }),
    ]
}

async fn collect(iterations: u32) -> AggregatedRun {
    let cancel = Arc::new(AtomicBool::new(false));
    Aggregator::new(mock_probes(), iterations, Duration::ZERO, cancel)
        .run()
        .await
}

fn report_from(outcome: AggregatedRun, iterations: u32) -> RunReport {
    RunReport {
        run_id: uuid::Uuid::new_v4(),
        tool_version: "0.1.0".to_string(),
        started_at: Utc::now(),
        finished_at: Utc::now(),
        hostname: "mockhost".to_string(),
        os: "Linux 6.1".to_string(),
        target: "8.8.8.8".to_string(),
        iterations_requested: iterations,
        iterations_completed: outcome.iterations_completed,
        interrupted: outcome.interrupted,
        interfaces: Vec::new(),
        records: outcome.records,
        summary: outcome.summary,
    }
}

#[tokio::test]
async fn test_every_kind_gets_one_record_per_iteration() {
    let outcome = collect(3).await;

    assert_eq!(outcome.records.len(), 12);
    for kind in ProbeKind::ALL {
        let count = outcome.records.iter().filter(|r| r.kind == kind).count();
        assert_eq!(count, 3, "{kind} should appear once per iteration");
    }
}

#[tokio::test]
async fn test_unconfigured_throughput_yields_only_skips() {
    let outcome = collect(4).await;

    let throughput: Vec<_> = outcome
        .records
        .iter()
        .filter(|r| r.kind == ProbeKind::Throughput)
        .collect();
    assert_eq!(throughput.len(), 4);
    assert!(throughput.iter().all(|r| r.is_skipped()));
    assert!(throughput.iter().all(|r| r.metrics().is_none()));

    let summary = outcome.summary.kind(ProbeKind::Throughput).unwrap();
    assert_eq!(summary.failures, 0);
    assert_eq!(summary.skipped, 4);
    assert!(summary.metrics.is_empty());
}

#[tokio::test]
async fn test_all_failing_kind_still_summarized_without_stats() {
    let outcome = collect(2).await;

    let speed = outcome.summary.kind(ProbeKind::InternetSpeed).unwrap();
    assert_eq!(speed.successes, 0);
    assert_eq!(speed.failures, 2);
    assert!(speed.metrics.is_empty());
}

#[tokio::test]
async fn test_artifacts_written_to_disk() {
    let dir = tempfile::TempDir::new().unwrap();
    let csv_path = dir.path().join("run.csv");
    let json_path = dir.path().join("run.json");

    let report = report_from(collect(2).await, 2);
    let written = report::write_reports(&report, &csv_path, &json_path);
    assert!(written.all_written());

    // JSON parses back losslessly.
    let body = std::fs::read_to_string(&json_path).unwrap();
    let back: RunReport = serde_json::from_str(&body).unwrap();
    assert_eq!(back.records.len(), 8);
    assert_eq!(back.summary, report.summary);

    // CSV: header + 8 data rows, then the summary blocks.
    let csv_body = std::fs::read_to_string(&csv_path).unwrap();
    let data_rows = csv_body
        .lines()
        .take_while(|line| !line.is_empty())
        .count();
    assert_eq!(data_rows, 9);
    assert!(csv_body.contains("probe,successes,failures,skipped"));
    assert!(csv_body.contains("internet-speed,0,2,0"));
}

/// Scrub the fields that legitimately differ between two identical runs.
fn scrub(value: &mut serde_json::Value) {
    let obj = value.as_object_mut().unwrap();
    obj["run_id"] = serde_json::Value::Null;
    obj["started_at"] = serde_json::Value::Null;
    obj["finished_at"] = serde_json::Value::Null;
    for record in obj["records"].as_array_mut().unwrap() {
        record["timestamp"] = serde_json::Value::Null;
    }
}

#[tokio::test]
async fn test_identical_inputs_produce_identical_json_modulo_timestamps() {
    let first = report_from(collect(3).await, 3);
    let second = report_from(collect(3).await, 3);

    let mut first_json = serde_json::to_value(&first).unwrap();
    let mut second_json = serde_json::to_value(&second).unwrap();
    scrub(&mut first_json);
    scrub(&mut second_json);

    let first_bytes = serde_json::to_string_pretty(&first_json).unwrap();
    let second_bytes = serde_json::to_string_pretty(&second_json).unwrap();
    assert_eq!(first_bytes, second_bytes);
}

#[tokio::test]
async fn test_interrupted_run_report_flags_partial_data() {
    let cancel = Arc::new(AtomicBool::new(true));
    let outcome = Aggregator::new(mock_probes(), 5, Duration::ZERO, cancel)
        .run()
        .await;

    assert!(outcome.interrupted);
    let report = report_from(outcome, 5);
    assert!(report.interrupted);
    assert_eq!(report.iterations_completed, 0);

    // Even an empty run writes valid artifacts.
    let dir = tempfile::TempDir::new().unwrap();
    let written = report::write_reports(
        &report,
        &dir.path().join("partial.csv"),
        &dir.path().join("partial.json"),
    );
    assert!(written.all_written());
}
