//! Network interface inspection: a per-platform capability interface that
//! snapshots active interfaces and their link properties at run start.
//!
//! Every property is best-effort. A missing tool or an unparseable line
//! degrades to `None` fields; inspection never fails the run.

use serde::{Deserialize, Serialize};

pub mod linux;
pub mod macos;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceKind {
    Wired,
    Wireless,
    Other,
}

/// Immutable snapshot of one active interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceInfo {
    pub name: String,
    pub kind: InterfaceKind,
    pub ipv4: Option<String>,
    pub link_speed_mbps: Option<u64>,
    pub duplex: Option<String>,
    pub ssid: Option<String>,
    pub signal_dbm: Option<i32>,
    pub tx_bitrate_mbps: Option<f64>,
}

impl InterfaceInfo {
    pub fn new(name: impl Into<String>, kind: InterfaceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ipv4: None,
            link_speed_mbps: None,
            duplex: None,
            ssid: None,
            signal_dbm: None,
            tx_bitrate_mbps: None,
        }
    }
}

/// Capability interface for platform-specific interface enumeration.
pub trait InterfaceInspector: Send + Sync {
    fn inspect(&self) -> Vec<InterfaceInfo>;
}

/// Select the inspector for the running OS at startup. Unknown platforms get
/// a no-op inspector rather than a failure.
pub fn platform_inspector() -> Box<dyn InterfaceInspector> {
    match std::env::consts::OS {
        "linux" => Box::new(linux::LinuxInspector),
        "macos" => Box::new(macos::MacosInspector),
        other => {
            tracing::warn!(os = other, "no interface inspector for this platform");
            Box::new(NullInspector)
        }
    }
}

struct NullInspector;

impl InterfaceInspector for NullInspector {
    fn inspect(&self) -> Vec<InterfaceInfo> {
        Vec::new()
    }
}

/// Host metadata recorded in the report header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostInfo {
    pub hostname: String,
    pub os: String,
}

pub fn host_info() -> HostInfo {
    HostInfo {
        hostname: command_line("hostname", &[]).unwrap_or_else(|| "unknown".to_string()),
        os: command_line("uname", &["-sr"])
            .unwrap_or_else(|| std::env::consts::OS.to_string()),
    }
}

/// First line of a command's stdout, if it ran successfully.
fn command_line(program: &str, args: &[&str]) -> Option<String> {
    let output = std::process::Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.lines().next()?.trim();
    if line.is_empty() {
        None
    } else {
        Some(line.to_string())
    }
}

/// Classify by name prefix when link-level probing is inconclusive.
pub(crate) fn kind_from_name(name: &str) -> InterfaceKind {
    if name.starts_with("wl") || name.starts_with("ath") || name.starts_with("wifi") {
        InterfaceKind::Wireless
    } else if name.starts_with("en") || name.starts_with("eth") || name.starts_with("em") {
        InterfaceKind::Wired
    } else {
        InterfaceKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_name_heuristics() {
        assert_eq!(kind_from_name("wlan0"), InterfaceKind::Wireless);
        assert_eq!(kind_from_name("wlp3s0"), InterfaceKind::Wireless);
        assert_eq!(kind_from_name("eth0"), InterfaceKind::Wired);
        assert_eq!(kind_from_name("enp5s0"), InterfaceKind::Wired);
        assert_eq!(kind_from_name("en0"), InterfaceKind::Wired);
        assert_eq!(kind_from_name("tun0"), InterfaceKind::Other);
    }

    #[test]
    fn test_host_info_never_empty() {
        let info = host_info();
        assert!(!info.hostname.is_empty());
        assert!(!info.os.is_empty());
    }

    #[test]
    fn test_interface_info_serialization() {
        let mut info = InterfaceInfo::new("wlan0", InterfaceKind::Wireless);
        info.ssid = Some("HomeNet".to_string());
        info.signal_dbm = Some(-52);

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["kind"], "wireless");
        assert_eq!(json["ssid"], "HomeNet");
        // Absent properties serialize as null, not zero.
        assert!(json["link_speed_mbps"].is_null());
    }
}
