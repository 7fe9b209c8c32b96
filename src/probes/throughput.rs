//! Throughput probe: wraps an iperf3 client run against a configured server.
//!
//! iperf3 is asked for JSON (`-J`); if the JSON is malformed the probe falls
//! back to scraping the human summary line before giving up. Format drift in
//! either shape is contained to this module.

use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use super::exec::run_tool;
use super::{Probe, ProbeKind, ProbeMetrics, ProbeOutcome};
use crate::config::ThroughputConfig;

pub struct ThroughputProbe {
    server: String,
    port: u16,
    duration_secs: u32,
    streams: u32,
    reverse: bool,
    udp: bool,
}

impl ThroughputProbe {
    pub fn new(server: String, config: &ThroughputConfig) -> Self {
        Self {
            server,
            port: config.port,
            duration_secs: config.duration_secs,
            streams: config.streams,
            reverse: config.reverse,
            udp: config.udp,
        }
    }
}

#[async_trait::async_trait]
impl Probe for ThroughputProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Throughput
    }

    async fn run(&self) -> ProbeOutcome {
        let port = self.port.to_string();
        let duration = self.duration_secs.to_string();
        let streams = self.streams.to_string();
        let mut args = vec![
            "-c",
            self.server.as_str(),
            "-p",
            port.as_str(),
            "-J",
            "-t",
            duration.as_str(),
            "-P",
            streams.as_str(),
        ];
        if self.reverse {
            args.push("-R");
        }
        if self.udp {
            args.push("-u");
        }

        let timeout = Duration::from_secs(self.duration_secs as u64 + 15);
        let output = match run_tool("iperf3", &args, timeout).await {
            Ok(output) => output,
            Err(e) => {
                return ProbeOutcome::Failure {
                    diagnostic: e.to_string(),
                }
            }
        };

        if !output.success() {
            // iperf3 reports connection errors as {"error": "..."} on stdout
            // when -J is given, so keep both streams.
            return ProbeOutcome::Failure {
                diagnostic: output.combined(),
            };
        }

        match parse_json(&output.stdout) {
            Some(parsed) => ProbeOutcome::Success {
                metrics: self.to_metrics(parsed),
            },
            None => {
                warn!(server = %self.server, "iperf3 JSON parse failed, trying text fallback");
                match parse_summary_line(&output.stdout) {
                    Some(mbps) => ProbeOutcome::Success {
                        metrics: ProbeMetrics::Throughput {
                            send_mbps: mbps,
                            recv_mbps: mbps,
                            retransmits: None,
                            udp_jitter_ms: None,
                            udp_loss_pct: None,
                            duration_secs: self.duration_secs as f64,
                            streams: self.streams,
                        },
                    },
                    None => ProbeOutcome::Failure {
                        diagnostic: format!(
                            "could not parse iperf3 output:\n{}",
                            output.combined()
                        ),
                    },
                }
            }
        }
    }
}

impl ThroughputProbe {
    fn to_metrics(&self, parsed: IperfOutput) -> ProbeMetrics {
        let to_mbps = |sum: &Option<IperfSum>| {
            sum.as_ref()
                .map(|s| s.bits_per_second / 1_000_000.0)
                .unwrap_or(0.0)
        };

        if self.udp {
            // UDP reports a single summed stream with jitter and loss.
            let mbps = to_mbps(&parsed.end.sum);
            let sum = parsed.end.sum.as_ref();
            ProbeMetrics::Throughput {
                send_mbps: mbps,
                recv_mbps: mbps,
                retransmits: None,
                udp_jitter_ms: sum.and_then(|s| s.jitter_ms),
                udp_loss_pct: sum.and_then(|s| s.lost_percent),
                duration_secs: self.duration_secs as f64,
                streams: self.streams,
            }
        } else {
            ProbeMetrics::Throughput {
                send_mbps: to_mbps(&parsed.end.sum_sent),
                recv_mbps: to_mbps(&parsed.end.sum_received),
                retransmits: parsed.end.sum_sent.as_ref().and_then(|s| s.retransmits),
                udp_jitter_ms: None,
                udp_loss_pct: None,
                duration_secs: self.duration_secs as f64,
                streams: self.streams,
            }
        }
    }
}

/// Subset of the iperf3 JSON document the probe cares about.
#[derive(Debug, Deserialize)]
struct IperfOutput {
    end: IperfEnd,
}

#[derive(Debug, Deserialize)]
struct IperfEnd {
    #[serde(default)]
    sum_sent: Option<IperfSum>,
    #[serde(default)]
    sum_received: Option<IperfSum>,
    /// UDP runs report a single `sum` instead of sent/received pairs.
    #[serde(default)]
    sum: Option<IperfSum>,
}

#[derive(Debug, Deserialize)]
struct IperfSum {
    bits_per_second: f64,
    #[serde(default)]
    retransmits: Option<u64>,
    #[serde(default)]
    jitter_ms: Option<f64>,
    #[serde(default)]
    lost_percent: Option<f64>,
}

fn parse_json(stdout: &str) -> Option<IperfOutput> {
    serde_json::from_str(stdout).ok()
}

/// Scrape the achieved rate from the human-readable summary, e.g.
/// `[  5]   0.00-10.00  sec  1.09 GBytes   941 Mbits/sec    0   sender`.
fn parse_summary_line(stdout: &str) -> Option<f64> {
    for line in stdout.lines() {
        if !line.contains("sender") || !line.contains("Mbits/sec") {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        for (i, part) in parts.iter().enumerate() {
            if part.contains("Mbits/sec") && i > 0 {
                if let Ok(mbps) = parts[i - 1].parse::<f64>() {
                    return Some(mbps);
                }
            }
        }
    }
    None
}
