//! macOS interface inspection via `ifconfig`, `networksetup`, and the
//! airport utility (when present).

use std::process::Command;

use tracing::debug;

use super::{kind_from_name, InterfaceInfo, InterfaceInspector, InterfaceKind};

const AIRPORT_PATH: &str =
    "/System/Library/PrivateFrameworks/Apple80211.framework/Versions/Current/Resources/airport";

pub struct MacosInspector;

impl InterfaceInspector for MacosInspector {
    fn inspect(&self) -> Vec<InterfaceInfo> {
        let Some(ifconfig) = run("ifconfig", &[]) else {
            debug!("`ifconfig` unavailable, no interfaces reported");
            return Vec::new();
        };

        // airport reports the single associated Wi-Fi network; newer macOS
        // releases removed the binary, in which case Wi-Fi details stay None.
        let wifi = run(AIRPORT_PATH, &["-I"]).and_then(|out| parse_airport(&out));

        let mut interfaces = Vec::new();
        for (name, ipv4) in parse_ifconfig(&ifconfig) {
            let mut info = InterfaceInfo::new(&name, kind_from_name(&name));
            info.ipv4 = Some(ipv4);

            if let Some(media) = run("networksetup", &["-getmedia", &name]) {
                info.link_speed_mbps = parse_getmedia_speed(&media);
            }

            // Only the built-in en* ports can be the Wi-Fi adapter. An
            // associated SSID with no negotiated ethernet speed marks it.
            if name.starts_with("en") && info.link_speed_mbps.is_none() {
                if let Some(status) = &wifi {
                    info.kind = InterfaceKind::Wireless;
                    info.ssid = Some(status.ssid.clone());
                    info.signal_dbm = status.signal_dbm;
                    info.tx_bitrate_mbps = status.tx_bitrate_mbps;
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

/// Parse `ifconfig` blocks into (interface, ipv4) pairs, loopback excluded.
pub(crate) fn parse_ifconfig(output: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut current: Option<String> = None;

    for line in output.lines() {
        if !line.starts_with('\t') && !line.starts_with(' ') {
            current = line.split(':').next().map(String::from);
            continue;
        }
        let Some(name) = &current else { continue };
        if name == "lo0" {
            continue;
        }
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("inet ") {
            if let Some(ip) = rest.split_whitespace().next() {
                if !pairs.iter().any(|(n, _)| n == name) {
                    pairs.push((name.clone(), ip.to_string()));
                }
            }
        }
    }
    pairs
}

/// Extract the negotiated speed from `networksetup -getmedia`, e.g.
/// `Active: 1000baseT <full-duplex>` -> 1000.
pub(crate) fn parse_getmedia_speed(output: &str) -> Option<u64> {
    for line in output.lines() {
        let line = line.trim();
        if !line.to_lowercase().starts_with("active:") || !line.contains("baseT") {
            continue;
        }
        for token in line.split_whitespace() {
            if let Some(speed) = token.strip_suffix("baseT") {
                return speed.parse::<u64>().ok();
            }
        }
    }
    None
}

#[derive(Debug, Clone)]
pub(crate) struct AirportStatus {
    pub ssid: String,
    pub signal_dbm: Option<i32>,
    pub tx_bitrate_mbps: Option<f64>,
}

/// Parse `airport -I` output; `None` when not associated.
pub(crate) fn parse_airport(output: &str) -> Option<AirportStatus> {
    let mut ssid = None;
    let mut signal_dbm = None;
    let mut tx_bitrate_mbps = None;

    for line in output.lines() {
        let line = line.trim();
        if let Some(value) = line.strip_prefix("SSID: ") {
            ssid = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("agrCtlRSSI: ") {
            signal_dbm = value.trim().parse::<i32>().ok();
        } else if let Some(value) = line.strip_prefix("lastTxRate: ") {
            tx_bitrate_mbps = value.trim().parse::<f64>().ok();
        }
    }

    ssid.map(|ssid| AirportStatus {
        ssid,
        signal_dbm,
        tx_bitrate_mbps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const IFCONFIG: &str = "\
lo0: flags=8049<UP,LOOPBACK,RUNNING,MULTICAST> mtu 16384
	inet 127.0.0.1 netmask 0xff000000
en0: flags=8863<UP,BROADCAST,SMART,RUNNING,SIMPLEX,MULTICAST> mtu 1500
	ether f0:18:98:aa:bb:cc
	inet 192.168.1.42 netmask 0xffffff00 broadcast 192.168.1.255
	status: active
en5: flags=8863<UP,BROADCAST,SMART,RUNNING,SIMPLEX,MULTICAST> mtu 1500
	inet 10.0.0.7 netmask 0xffffff00 broadcast 10.0.0.255";

    const GETMEDIA: &str = "\
Current: autoselect
Active: 1000baseT <full-duplex>";

    const AIRPORT: &str = "\
     agrCtlRSSI: -58
     agrExtRSSI: 0
    agrCtlNoise: -94
          state: running
        op mode: station
     lastTxRate: 867
        maxRate: 1300
           SSID: HomeNet
            MCS: 9
        channel: 44,80";

    #[test]
    fn test_parse_ifconfig_skips_loopback() {
        let pairs = parse_ifconfig(IFCONFIG);
        assert_eq!(
            pairs,
            vec![
                ("en0".to_string(), "192.168.1.42".to_string()),
                ("en5".to_string(), "10.0.0.7".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_getmedia_speed() {
        assert_eq!(parse_getmedia_speed(GETMEDIA), Some(1000));
        assert_eq!(parse_getmedia_speed("Current: autoselect\nActive: autoselect"), None);
    }

    #[test]
    fn test_parse_airport_associated() {
        let status = parse_airport(AIRPORT).expect("should be associated");
        assert_eq!(status.ssid, "HomeNet");
        assert_eq!(status.signal_dbm, Some(-58));
        assert_eq!(status.tx_bitrate_mbps, Some(867.0));
    }

    #[test]
    fn test_parse_airport_not_associated() {
        assert!(parse_airport("AirPort: Off").is_none());
    }
}
