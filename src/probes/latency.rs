//! Latency/jitter probe: wraps the system `ping` utility.

use std::time::Duration;

use tracing::warn;

use super::exec::{run_tool, ToolError};
use super::{Probe, ProbeKind, ProbeMetrics, ProbeOutcome};

/// Issues a fixed burst of echo requests and derives min/avg/max, sample
/// stddev, and jitter from the per-request round-trip times.
pub struct LatencyProbe {
    target: String,
    count: u32,
}

impl LatencyProbe {
    pub fn new(target: String, count: u32) -> Self {
        Self { target, count }
    }

    fn overall_timeout(&self) -> Duration {
        // One second per request plus slack for name resolution and teardown.
        Duration::from_secs(self.count as u64 + 30)
    }
}

#[async_trait::async_trait]
impl Probe for LatencyProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Latency
    }

    async fn run(&self) -> ProbeOutcome {
        let count = self.count.to_string();
        let mut args = vec!["-c", count.as_str()];
        // -W is seconds on Linux but milliseconds on macOS; only pass it where
        // the meaning is known and rely on the outer timeout elsewhere.
        if std::env::consts::OS == "linux" {
            args.extend(["-W", "1"]);
        }
        args.push(self.target.as_str());

        let output = match run_tool("ping", &args, self.overall_timeout()).await {
            Ok(output) => output,
            Err(e @ ToolError::Timeout { .. }) => {
                warn!(target = %self.target, "ping timed out");
                return ProbeOutcome::Failure {
                    diagnostic: e.to_string(),
                };
            }
            Err(e) => {
                return ProbeOutcome::Failure {
                    diagnostic: e.to_string(),
                }
            }
        };

        // ping exits nonzero when nothing answered; samples decide the
        // outcome either way so partial loss still yields a measurement.
        let samples = parse_rtt_samples(&output.stdout);
        if samples.is_empty() {
            return ProbeOutcome::Failure {
                diagnostic: output.combined(),
            };
        }

        let received = samples.len() as u32;
        let loss_pct = parse_loss_pct(&output.stdout)
            .unwrap_or_else(|| 100.0 * (self.count - received.min(self.count)) as f64 / self.count as f64);

        let min_ms = samples.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_ms = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let avg_ms = samples.iter().sum::<f64>() / received as f64;

        ProbeOutcome::Success {
            metrics: ProbeMetrics::Latency {
                min_ms,
                avg_ms,
                max_ms,
                mdev_ms: sample_stddev(&samples),
                jitter_ms: jitter(&samples),
                sent: self.count,
                received,
                loss_pct,
            },
        }
    }
}

/// Pull every `time=X ms` sample out of ping output. Works for both the
/// Linux ("time=14.2 ms") and macOS ("time=14.200 ms") line shapes.
fn parse_rtt_samples(output: &str) -> Vec<f64> {
    let mut samples = Vec::new();
    for line in output.lines() {
        let Some(pos) = line.find("time=") else {
            continue;
        };
        let rest = &line[pos + 5..];
        let token = rest.split_whitespace().next().unwrap_or("");
        if let Ok(ms) = token.trim_end_matches("ms").parse::<f64>() {
            samples.push(ms);
        }
    }
    samples
}

/// Extract the percentage from the "N% packet loss" summary line.
fn parse_loss_pct(output: &str) -> Option<f64> {
    for line in output.lines() {
        if !line.contains("packet loss") {
            continue;
        }
        for part in line.split(',') {
            let part = part.trim();
            if let Some(pct) = part.strip_suffix("% packet loss") {
                return pct.trim().parse::<f64>().ok();
            }
        }
    }
    None
}

/// Mean absolute difference between consecutive round-trip times.
/// Zero for fewer than two samples.
fn jitter(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let sum: f64 = samples.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
    sum / (samples.len() - 1) as f64
}

/// Sample standard deviation. Zero for fewer than two samples.
fn sample_stddev(samples: &[f64]) -> f64 {
    let n = samples.len();
    if n < 2 {
        return 0.0;
    }
    let mean = samples.iter().sum::<f64>() / n as f64;
    let variance_sum: f64 = samples
        .iter()
        .map(|v| {
            let diff = mean - *v;
            diff * diff
        })
        .sum();
    (variance_sum / (n - 1) as f64).sqrt()
}
