//! Run summary: per-kind outcome counts and aggregate statistics over the
//! successful measurements, derived once after the iteration loop.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::probes::{ProbeKind, ProbeRecord};

/// Aggregate of one numeric metric across the run's successful results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub count: u32,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
}

/// Outcome counts and metric aggregates for one probe kind. Statistics are
/// computed only over successes; with zero successes the metric map stays
/// empty -- absent, never NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindSummary {
    pub kind: ProbeKind,
    pub successes: u32,
    pub failures: u32,
    pub skipped: u32,
    pub metrics: BTreeMap<String, MetricSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub kinds: Vec<KindSummary>,
}

impl RunSummary {
    /// Derive the summary from the full record sequence. Every kind appears
    /// in the fixed probe order, even with zero records.
    pub fn compute(records: &[ProbeRecord]) -> Self {
        let kinds = ProbeKind::ALL
            .iter()
            .map(|&kind| {
                let of_kind: Vec<&ProbeRecord> =
                    records.iter().filter(|r| r.kind == kind).collect();

                let mut values: BTreeMap<String, Vec<f64>> = BTreeMap::new();
                for record in &of_kind {
                    if let Some(metrics) = record.metrics() {
                        for (name, value) in metrics.numeric_fields() {
                            values.entry(name.to_string()).or_default().push(value);
                        }
                    }
                }

                KindSummary {
                    kind,
                    successes: of_kind.iter().filter(|r| r.is_success()).count() as u32,
                    failures: of_kind.iter().filter(|r| r.is_failure()).count() as u32,
                    skipped: of_kind.iter().filter(|r| r.is_skipped()).count() as u32,
                    metrics: values
                        .into_iter()
                        .filter_map(|(name, samples)| {
                            summarize(&samples).map(|summary| (name, summary))
                        })
                        .collect(),
                }
            })
            .collect();

        Self { kinds }
    }

    pub fn kind(&self, kind: ProbeKind) -> Option<&KindSummary> {
        self.kinds.iter().find(|k| k.kind == kind)
    }
}

/// Mean/min/max/sample-stddev over a non-empty slice; `None` when empty so
/// callers can't divide by zero.
fn summarize(samples: &[f64]) -> Option<MetricSummary> {
    if samples.is_empty() {
        return None;
    }
    let count = samples.len();
    let mean = samples.iter().sum::<f64>() / count as f64;
    let min = samples.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let std_dev = if count > 1 {
        let variance_sum: f64 = samples
            .iter()
            .map(|v| {
                let diff = mean - *v;
                diff * diff
            })
            .sum();
        (variance_sum / (count - 1) as f64).sqrt()
    } else {
        0.0
    };

    Some(MetricSummary {
        count: count as u32,
        mean,
        min,
        max,
        std_dev,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::{ProbeMetrics, ProbeOutcome};
    use chrono::Utc;

    fn latency_record(iteration: u32, avg_ms: f64) -> ProbeRecord {
        ProbeRecord {
            kind: ProbeKind::Latency,
            iteration,
            timestamp: Utc::now(),
            outcome: ProbeOutcome::Success {
                metrics: ProbeMetrics::Latency {
                    min_ms: avg_ms - 1.0,
                    avg_ms,
                    max_ms: avg_ms + 1.0,
                    mdev_ms: 0.5,
                    jitter_ms: 0.2,
                    sent: 5,
                    received: 5,
                    loss_pct: 0.0,
                },
            },
        }
    }

    fn failure_record(kind: ProbeKind, iteration: u32) -> ProbeRecord {
        ProbeRecord {
            kind,
            iteration,
            timestamp: Utc::now(),
            outcome: ProbeOutcome::Failure {
                diagnostic: "unreachable".to_string(),
            },
        }
    }

    #[test]
    fn test_summary_over_successes() {
        let records = vec![
            latency_record(0, 10.0),
            latency_record(1, 12.0),
            latency_record(2, 14.0),
        ];
        let summary = RunSummary::compute(&records);

        let latency = summary.kind(ProbeKind::Latency).unwrap();
        assert_eq!(latency.successes, 3);
        assert_eq!(latency.failures, 0);

        let avg = &latency.metrics["avg_ms"];
        assert_eq!(avg.count, 3);
        assert!((avg.mean - 12.0).abs() < 1e-9);
        assert_eq!(avg.min, 10.0);
        assert_eq!(avg.max, 14.0);
        assert!((avg.std_dev - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_failures_are_counted_but_never_aggregated() {
        let records = vec![
            latency_record(0, 10.0),
            failure_record(ProbeKind::Latency, 1),
            failure_record(ProbeKind::Latency, 2),
        ];
        let summary = RunSummary::compute(&records);

        let latency = summary.kind(ProbeKind::Latency).unwrap();
        assert_eq!(latency.successes, 1);
        assert_eq!(latency.failures, 2);
        // Stats reflect the lone success, untouched by failures.
        assert_eq!(latency.metrics["avg_ms"].count, 1);
        assert_eq!(latency.metrics["avg_ms"].std_dev, 0.0);
    }

    #[test]
    fn test_zero_successes_reports_empty_metrics() {
        let records = vec![
            failure_record(ProbeKind::InternetSpeed, 0),
            failure_record(ProbeKind::InternetSpeed, 1),
        ];
        let summary = RunSummary::compute(&records);

        let speed = summary.kind(ProbeKind::InternetSpeed).unwrap();
        assert_eq!(speed.successes, 0);
        assert_eq!(speed.failures, 2);
        assert!(speed.metrics.is_empty());

        // No NaN anywhere in the serialized form.
        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("NaN") && !json.contains("null"));
    }

    #[test]
    fn test_every_kind_present_even_without_records() {
        let summary = RunSummary::compute(&[]);
        assert_eq!(summary.kinds.len(), 4);
        for kind_summary in &summary.kinds {
            assert_eq!(kind_summary.successes, 0);
            assert!(kind_summary.metrics.is_empty());
        }
    }

    #[test]
    fn test_summarize_empty_is_none() {
        assert!(summarize(&[]).is_none());
    }
}
