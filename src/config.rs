//! Layered run configuration: compiled-in defaults, optional TOML file
//! (env-var override for the path), CLI flags applied on top by the caller.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Root configuration for one measurement run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub latency: LatencyConfig,
    #[serde(default)]
    pub throughput: ThroughputConfig,
    #[serde(default)]
    pub speedtest: SpeedtestConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl RunConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Try to load configuration from, in order:
    /// 1. The path in the `NETVITALS_CONFIG` environment variable.
    /// 2. `./netvitals.toml`.
    /// 3. Fall back to compiled-in defaults.
    pub fn load_or_default() -> Self {
        if let Ok(env_path) = std::env::var("NETVITALS_CONFIG") {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "NETVITALS_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let local_path = Path::new("netvitals.toml");
        if local_path.exists() {
            match Self::load(local_path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(error = %e, "netvitals.toml exists but could not be loaded, using defaults");
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Self::default()
    }

    /// Reject configurations no run could execute. Probe-level trouble stays
    /// a probe outcome; only impossible settings are fatal.
    pub fn validate(&self) -> Result<()> {
        if self.general.iterations == 0 {
            anyhow::bail!("iterations must be at least 1");
        }
        if self.latency.count == 0 {
            anyhow::bail!("latency ping count must be at least 1");
        }
        if self.throughput.duration_secs == 0 {
            anyhow::bail!("throughput duration must be at least 1 second");
        }
        if self.throughput.streams == 0 {
            anyhow::bail!("throughput stream count must be at least 1");
        }
        if self.transfer.enabled && self.transfer.payload_mb == 0 {
            anyhow::bail!("transfer payload must be at least 1 MB");
        }
        validate_host(&self.general.target)?;
        if let Some(server) = &self.throughput.server {
            validate_host(server)?;
        }
        Ok(())
    }
}

/// Hosts go straight onto tool command lines; keep them boring.
fn validate_host(host: &str) -> Result<()> {
    if host.is_empty() {
        anyhow::bail!("host cannot be empty");
    }
    if host.starts_with('-') {
        anyhow::bail!("host cannot start with a hyphen: {host}");
    }
    if host
        .chars()
        .any(|c| !c.is_alphanumeric() && c != '.' && c != '-' && c != ':')
    {
        anyhow::bail!("host contains invalid characters: {host}");
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Echo-request target for the latency probe.
    pub target: String,
    /// Full passes through the enabled probe set.
    pub iterations: u32,
    /// Pause between iterations (skipped after the last one).
    pub pause_secs: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            target: "8.8.8.8".to_string(),
            iterations: 3,
            pause_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyConfig {
    /// Echo requests per iteration.
    pub count: u32,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self { count: 20 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThroughputConfig {
    /// iperf3 server address. `None` skips the throughput probe entirely.
    pub server: Option<String>,
    pub port: u16,
    pub duration_secs: u32,
    pub streams: u32,
    /// Measure server-to-client instead (iperf3 `-R`).
    pub reverse: bool,
    /// UDP mode reports jitter and loss instead of retransmits.
    pub udp: bool,
}

impl Default for ThroughputConfig {
    fn default() -> Self {
        Self {
            server: None,
            port: 5201,
            duration_secs: 10,
            streams: 1,
            reverse: false,
            udp: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedtestConfig {
    /// The internet speed test is slow and burns metered bandwidth, so it
    /// can be turned off independently of everything else.
    pub enabled: bool,
    pub timeout_secs: u64,
}

impl Default for SpeedtestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    pub enabled: bool,
    /// Directory the payload is written to; defaults to the system temp dir.
    pub dir: Option<PathBuf>,
    pub payload_mb: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
            payload_mb: 100,
        }
    }
}

impl TransferConfig {
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub csv: PathBuf,
    pub json: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv: PathBuf::from("netvitals.csv"),
            json: PathBuf::from("netvitals.json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let cfg = RunConfig::default();

        assert_eq!(cfg.general.target, "8.8.8.8");
        assert_eq!(cfg.general.iterations, 3);
        assert_eq!(cfg.general.pause_secs, 5);
        assert_eq!(cfg.latency.count, 20);
        assert!(cfg.throughput.server.is_none());
        assert_eq!(cfg.throughput.port, 5201);
        assert_eq!(cfg.throughput.duration_secs, 10);
        assert_eq!(cfg.throughput.streams, 1);
        assert!(!cfg.throughput.reverse);
        assert!(!cfg.throughput.udp);
        assert!(cfg.speedtest.enabled);
        assert_eq!(cfg.speedtest.timeout_secs, 120);
        assert!(cfg.transfer.enabled);
        assert_eq!(cfg.transfer.payload_mb, 100);
        assert_eq!(cfg.output.csv, PathBuf::from("netvitals.csv"));
        assert_eq!(cfg.output.json, PathBuf::from("netvitals.json"));

        cfg.validate().expect("defaults must validate");
    }

    #[test]
    fn test_parse_example_toml() {
        let toml_str = r#"
[general]
target = "192.168.1.1"
iterations = 5
pause_secs = 0

[latency]
count = 50

[throughput]
server = "192.168.1.10"
port = 5202
duration_secs = 30
streams = 4
reverse = true

[speedtest]
enabled = false

[transfer]
enabled = true
dir = "/mnt/nas/bench"
payload_mb = 250

[output]
csv = "before.csv"
json = "before.json"
"#;

        let cfg: RunConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(cfg.general.target, "192.168.1.1");
        assert_eq!(cfg.general.iterations, 5);
        assert_eq!(cfg.latency.count, 50);
        assert_eq!(cfg.throughput.server.as_deref(), Some("192.168.1.10"));
        assert_eq!(cfg.throughput.port, 5202);
        assert!(cfg.throughput.reverse);
        assert!(!cfg.speedtest.enabled);
        assert_eq!(cfg.transfer.dir, Some(PathBuf::from("/mnt/nas/bench")));
        assert_eq!(cfg.transfer.payload_mb, 250);
        assert_eq!(cfg.output.csv, PathBuf::from("before.csv"));

        cfg.validate().unwrap();
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let cfg: RunConfig = toml::from_str("[general]\niterations = 1\n").unwrap();
        assert_eq!(cfg.general.iterations, 1);
        assert_eq!(cfg.general.target, "8.8.8.8");
        assert_eq!(cfg.latency.count, 20);
        assert!(cfg.speedtest.enabled);
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let cfg: RunConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.general.iterations, RunConfig::default().general.iterations);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("netvitals.toml");
        std::fs::write(&path, "[general]\ntarget = \"10.0.0.1\"\n").unwrap();

        let cfg = RunConfig::load(&path).unwrap();
        assert_eq!(cfg.general.target, "10.0.0.1");
    }

    #[test]
    fn test_load_missing_file_errors() {
        assert!(RunConfig::load(Path::new("/nonexistent/netvitals.toml")).is_err());
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let mut cfg = RunConfig::default();
        cfg.general.iterations = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_hostile_target_rejected() {
        let mut cfg = RunConfig::default();
        cfg.general.target = "-c5".to_string();
        assert!(cfg.validate().is_err());

        cfg.general.target = "8.8.8.8; rm -rf /".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_ipv6_and_hostnames_accepted() {
        let mut cfg = RunConfig::default();
        for target in ["2001:4860:4860::8888", "speed.example.net", "10.1.2.3"] {
            cfg.general.target = target.to_string();
            cfg.validate().unwrap();
        }
    }

    #[test]
    fn test_serialization_roundtrip() {
        let cfg = RunConfig::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let back: RunConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.general.target, cfg.general.target);
        assert_eq!(back.output.json, cfg.output.json);
    }
}
