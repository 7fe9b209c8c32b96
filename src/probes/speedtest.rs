//! Internet speed probe: Ookla `speedtest` CLI with `speedtest-cli` fallback.
//!
//! The two CLIs emit different JSON dialects (Ookla reports `bandwidth` in
//! bytes/s, the legacy tool reports bits/s); both are normalized here, with a
//! last-resort text scrape for ancient versions that only print lines.

use std::time::Duration;

use tracing::{info, warn};

use super::exec::{run_tool, ToolError, ToolOutput};
use super::{Probe, ProbeKind, ProbeMetrics, ProbeOutcome};

pub struct InternetSpeedProbe {
    timeout: Duration,
}

impl InternetSpeedProbe {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

#[async_trait::async_trait]
impl Probe for InternetSpeedProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::InternetSpeed
    }

    async fn run(&self) -> ProbeOutcome {
        info!("running internet speed test (this can take a minute)");

        let output = match self.invoke_cli().await {
            Ok(output) => output,
            Err(e) => {
                return ProbeOutcome::Failure {
                    diagnostic: e.to_string(),
                }
            }
        };

        if !output.success() {
            return ProbeOutcome::Failure {
                diagnostic: output.combined(),
            };
        }

        match parse_json(&output.stdout).or_else(|| {
            warn!("speedtest JSON parse failed, trying text fallback");
            parse_text(&output.stdout)
        }) {
            Some(metrics) => ProbeOutcome::Success { metrics },
            None => ProbeOutcome::Failure {
                diagnostic: format!("could not parse speedtest output:\n{}", output.combined()),
            },
        }
    }
}

impl InternetSpeedProbe {
    /// Prefer the official Ookla CLI; fall back to the Python speedtest-cli.
    async fn invoke_cli(&self) -> Result<ToolOutput, ToolError> {
        match run_tool(
            "speedtest",
            &["--format=json", "--accept-license", "--accept-gdpr"],
            self.timeout,
        )
        .await
        {
            Err(ToolError::NotFound { .. }) => {
                run_tool("speedtest-cli", &["--json"], self.timeout).await
            }
            other => other,
        }
    }
}

/// Parse either speedtest JSON dialect into normalized metrics.
fn parse_json(stdout: &str) -> Option<ProbeMetrics> {
    let json: serde_json::Value = serde_json::from_str(stdout).ok()?;

    let download = json.get("download")?;
    if download.is_object() {
        // Ookla CLI: bandwidth is bytes/s.
        let download_mbps = download.get("bandwidth")?.as_f64()? * 8.0 / 1_000_000.0;
        let upload_mbps =
            json.get("upload")?.get("bandwidth")?.as_f64()? * 8.0 / 1_000_000.0;
        Some(ProbeMetrics::InternetSpeed {
            download_mbps,
            upload_mbps,
            ping_ms: json
                .get("ping")
                .and_then(|p| p.get("latency"))
                .and_then(|v| v.as_f64()),
            jitter_ms: json
                .get("ping")
                .and_then(|p| p.get("jitter"))
                .and_then(|v| v.as_f64()),
            server: json
                .get("server")
                .and_then(|s| s.get("name"))
                .and_then(|v| v.as_str())
                .map(String::from),
            server_country: json
                .get("server")
                .and_then(|s| s.get("country"))
                .and_then(|v| v.as_str())
                .map(String::from),
        })
    } else {
        // speedtest-cli: download/upload are bits/s, ping is a bare number.
        Some(ProbeMetrics::InternetSpeed {
            download_mbps: download.as_f64()? / 1_000_000.0,
            upload_mbps: json.get("upload")?.as_f64()? / 1_000_000.0,
            ping_ms: json.get("ping").and_then(|v| v.as_f64()),
            jitter_ms: None,
            server: json
                .get("server")
                .and_then(|s| s.get("sponsor"))
                .and_then(|v| v.as_str())
                .map(String::from),
            server_country: json
                .get("server")
                .and_then(|s| s.get("country"))
                .and_then(|v| v.as_str())
                .map(String::from),
        })
    }
}

/// Scrape `Download:`, `Upload:` and `Ping:` lines from text output.
fn parse_text(stdout: &str) -> Option<ProbeMetrics> {
    let mut download = None;
    let mut upload = None;
    let mut ping = None;

    for line in stdout.lines() {
        let line = line.trim();
        let value = |l: &str| {
            l.split(':')
                .nth(1)?
                .trim()
                .split_whitespace()
                .next()?
                .parse::<f64>()
                .ok()
        };
        if line.starts_with("Download:") {
            download = value(line);
        } else if line.starts_with("Upload:") {
            upload = value(line);
        } else if line.starts_with("Ping:") {
            ping = value(line);
        }
    }

    Some(ProbeMetrics::InternetSpeed {
        download_mbps: download?,
        upload_mbps: upload?,
        ping_ms: ping,
        jitter_ms: None,
        server: None,
        server_country: None,
    })
}
