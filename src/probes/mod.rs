//! Probe runners: one module per external measurement tool, plus the shared
//! record schema every runner normalizes into.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod exec;
pub mod latency;
pub mod speedtest;
pub mod throughput;
pub mod transfer;

use crate::config::RunConfig;

/// The four measurement categories a run can collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeKind {
    Latency,
    Throughput,
    InternetSpeed,
    LocalTransfer,
}

impl ProbeKind {
    /// Fixed execution order within an iteration.
    pub const ALL: [ProbeKind; 4] = [
        ProbeKind::Latency,
        ProbeKind::Throughput,
        ProbeKind::InternetSpeed,
        ProbeKind::LocalTransfer,
    ];
}

impl std::fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeKind::Latency => write!(f, "latency"),
            ProbeKind::Throughput => write!(f, "throughput"),
            ProbeKind::InternetSpeed => write!(f, "internet-speed"),
            ProbeKind::LocalTransfer => write!(f, "local-transfer"),
        }
    }
}

/// Per-kind numeric metrics. Each variant carries only the fields meaningful
/// for that kind so a latency record can never grow a bitrate by accident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ProbeMetrics {
    Latency {
        min_ms: f64,
        avg_ms: f64,
        max_ms: f64,
        /// Sample standard deviation of the round-trip times.
        mdev_ms: f64,
        /// Mean absolute difference between consecutive round-trip times.
        jitter_ms: f64,
        sent: u32,
        received: u32,
        loss_pct: f64,
    },
    Throughput {
        send_mbps: f64,
        recv_mbps: f64,
        retransmits: Option<u64>,
        udp_jitter_ms: Option<f64>,
        udp_loss_pct: Option<f64>,
        duration_secs: f64,
        streams: u32,
    },
    InternetSpeed {
        download_mbps: f64,
        upload_mbps: f64,
        ping_ms: Option<f64>,
        jitter_ms: Option<f64>,
        server: Option<String>,
        server_country: Option<String>,
    },
    LocalTransfer {
        mbps: f64,
        bytes: u64,
        write_secs: f64,
        read_secs: f64,
        elapsed_secs: f64,
    },
}

impl ProbeMetrics {
    /// Headline numeric fields for summary aggregation, in a stable order.
    pub fn numeric_fields(&self) -> Vec<(&'static str, f64)> {
        match self {
            ProbeMetrics::Latency {
                min_ms,
                avg_ms,
                max_ms,
                jitter_ms,
                loss_pct,
                ..
            } => vec![
                ("avg_ms", *avg_ms),
                ("min_ms", *min_ms),
                ("max_ms", *max_ms),
                ("jitter_ms", *jitter_ms),
                ("loss_pct", *loss_pct),
            ],
            ProbeMetrics::Throughput {
                send_mbps,
                recv_mbps,
                udp_jitter_ms,
                udp_loss_pct,
                ..
            } => {
                let mut fields = vec![("send_mbps", *send_mbps), ("recv_mbps", *recv_mbps)];
                if let Some(j) = udp_jitter_ms {
                    fields.push(("udp_jitter_ms", *j));
                }
                if let Some(l) = udp_loss_pct {
                    fields.push(("udp_loss_pct", *l));
                }
                fields
            }
            ProbeMetrics::InternetSpeed {
                download_mbps,
                upload_mbps,
                ping_ms,
                ..
            } => {
                let mut fields = vec![
                    ("download_mbps", *download_mbps),
                    ("upload_mbps", *upload_mbps),
                ];
                if let Some(p) = ping_ms {
                    fields.push(("ping_ms", *p));
                }
                fields
            }
            ProbeMetrics::LocalTransfer {
                mbps, elapsed_secs, ..
            } => vec![("mbps", *mbps), ("elapsed_secs", *elapsed_secs)],
        }
    }
}

/// Outcome of one probe invocation. Failures carry diagnostic text only,
/// never numeric metrics, so a failed run can't be mistaken for a zero
/// measurement. A skip is intentional non-execution, distinct from failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Success { metrics: ProbeMetrics },
    Failure { diagnostic: String },
    Skipped { reason: String },
}

/// One (iteration, probe kind) result, stamped by the aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeRecord {
    pub kind: ProbeKind,
    pub iteration: u32,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: ProbeOutcome,
}

impl ProbeRecord {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ProbeOutcome::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, ProbeOutcome::Failure { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, ProbeOutcome::Skipped { .. })
    }

    pub fn metrics(&self) -> Option<&ProbeMetrics> {
        match &self.outcome {
            ProbeOutcome::Success { metrics } => Some(metrics),
            _ => None,
        }
    }
}

/// Trait for all probe runners. Probe failures are data, not errors: `run`
/// is infallible and reports trouble through `ProbeOutcome::Failure`.
#[async_trait::async_trait]
pub trait Probe: Send + Sync {
    fn kind(&self) -> ProbeKind;

    async fn run(&self) -> ProbeOutcome;
}

/// Placeholder installed for probes the configuration turns off. Emits a
/// `Skipped` record every iteration so the report can tell "not configured"
/// apart from "attempted and failed".
pub struct Disabled {
    kind: ProbeKind,
    reason: String,
}

impl Disabled {
    pub fn new(kind: ProbeKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

#[async_trait::async_trait]
impl Probe for Disabled {
    fn kind(&self) -> ProbeKind {
        self.kind
    }

    async fn run(&self) -> ProbeOutcome {
        ProbeOutcome::Skipped {
            reason: self.reason.clone(),
        }
    }
}

/// Build the probe set for a run, in execution order. Disabled or
/// unconfigured probes get a `Disabled` placeholder.
pub fn build_set(config: &RunConfig) -> Vec<Box<dyn Probe>> {
    let mut probes: Vec<Box<dyn Probe>> = Vec::with_capacity(4);

    probes.push(Box::new(latency::LatencyProbe::new(
        config.general.target.clone(),
        config.latency.count,
    )));

    match &config.throughput.server {
        Some(server) => probes.push(Box::new(throughput::ThroughputProbe::new(
            server.clone(),
            &config.throughput,
        ))),
        None => probes.push(Box::new(Disabled::new(
            ProbeKind::Throughput,
            "no iperf3 server configured",
        ))),
    }

    if config.speedtest.enabled {
        probes.push(Box::new(speedtest::InternetSpeedProbe::new(
            config.speedtest.timeout_secs,
        )));
    } else {
        probes.push(Box::new(Disabled::new(
            ProbeKind::InternetSpeed,
            "internet speed test disabled",
        )));
    }

    if config.transfer.enabled {
        probes.push(Box::new(transfer::LocalTransferProbe::new(
            config.transfer.resolved_dir(),
            config.transfer.payload_mb,
        )));
    } else {
        probes.push(Box::new(Disabled::new(
            ProbeKind::LocalTransfer,
            "local transfer test disabled",
        )));
    }

    probes
}
