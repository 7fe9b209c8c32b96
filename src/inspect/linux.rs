//! Linux interface inspection via `ip`, `ethtool`, and `iw`.

use std::process::Command;

use tracing::debug;

use super::{kind_from_name, InterfaceInfo, InterfaceInspector, InterfaceKind};

pub struct LinuxInspector;

impl InterfaceInspector for LinuxInspector {
    fn inspect(&self) -> Vec<InterfaceInfo> {
        let Some(addr_output) = run("ip", &["-o", "addr", "show"]) else {
            debug!("`ip addr show` unavailable, no interfaces reported");
            return Vec::new();
        };

        let mut interfaces = Vec::new();
        for (name, ipv4) in parse_ip_addr_show(&addr_output) {
            let mut info = InterfaceInfo::new(&name, kind_from_name(&name));
            info.ipv4 = Some(ipv4);

            if let Some(ethtool) = run("ethtool", &[&name]) {
                let (speed, duplex) = parse_ethtool(&ethtool);
                info.link_speed_mbps = speed;
                info.duplex = duplex;
            }

            if let Some(link) = run("iw", &["dev", &name, "link"]) {
                let wifi = parse_iw_link(&link);
                if wifi.connected {
                    info.kind = InterfaceKind::Wireless;
                    info.ssid = wifi.ssid;
                    info.signal_dbm = wifi.signal_dbm;
                    info.tx_bitrate_mbps = wifi.tx_bitrate_mbps;
                }
            }

            interfaces.push(info);
        }
        interfaces
    }
}

fn run(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parse `ip -o addr show` into (interface, ipv4) pairs, loopback excluded.
/// Line shape: `2: eth0    inet 192.168.1.5/24 brd ... scope global eth0`.
pub(crate) fn parse_ip_addr_show(output: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for line in output.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 || parts[2] != "inet" {
            continue;
        }
        let name = parts[1].trim_end_matches(':').to_string();
        if name == "lo" {
            continue;
        }
        let ip = parts[3].split('/').next().unwrap_or("").to_string();
        if !ip.is_empty() && !pairs.iter().any(|(n, _)| *n == name) {
            pairs.push((name, ip));
        }
    }
    pairs
}

/// Extract negotiated speed (Mb/s) and duplex from `ethtool` output.
pub(crate) fn parse_ethtool(output: &str) -> (Option<u64>, Option<String>) {
    let mut speed = None;
    let mut duplex = None;
    for line in output.lines() {
        let line = line.trim();
        if let Some(value) = line.strip_prefix("Speed:") {
            // "1000Mb/s", or "Unknown!" when the link is down.
            speed = value
                .trim()
                .trim_end_matches("Mb/s")
                .parse::<u64>()
                .ok();
        } else if let Some(value) = line.strip_prefix("Duplex:") {
            let value = value.trim();
            if !value.is_empty() && !value.starts_with("Unknown") {
                duplex = Some(value.to_string());
            }
        }
    }
    (speed, duplex)
}

#[derive(Debug, Default)]
pub(crate) struct IwLink {
    pub connected: bool,
    pub ssid: Option<String>,
    pub signal_dbm: Option<i32>,
    pub tx_bitrate_mbps: Option<f64>,
}

/// Parse `iw dev <if> link` output.
pub(crate) fn parse_iw_link(output: &str) -> IwLink {
    let mut link = IwLink::default();
    if output.contains("Not connected.") || !output.contains("Connected to") {
        return link;
    }
    link.connected = true;

    for line in output.lines() {
        let line = line.trim();
        if let Some(ssid) = line.strip_prefix("SSID: ") {
            link.ssid = Some(ssid.to_string());
        } else if let Some(signal) = line.strip_prefix("signal: ") {
            // "-50 dBm"
            link.signal_dbm = signal.replace(" dBm", "").parse::<i32>().ok();
        } else if let Some(tx) = line.strip_prefix("tx bitrate: ") {
            // "866.7 MBit/s VHT-MCS 9 80MHz short GI VHT-NSS 2"
            link.tx_bitrate_mbps = tx
                .split_whitespace()
                .next()
                .and_then(|rate| rate.parse::<f64>().ok());
        }
    }
    link
}
