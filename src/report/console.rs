//! Human-readable end-of-run summary printed to stdout.

use crate::inspect::{InterfaceInfo, InterfaceKind};
use crate::probes::ProbeKind;

use super::RunReport;

/// Render a rate with an adaptive unit: 9412.0 -> "9.41 Gbps".
pub fn format_rate(mbps: f64) -> String {
    if mbps >= 1000.0 {
        format!("{:.2} Gbps", mbps / 1000.0)
    } else {
        format!("{:.1} Mbps", mbps)
    }
}

fn describe_interface(iface: &InterfaceInfo) -> String {
    let ip = iface.ipv4.as_deref().unwrap_or("no address");
    match iface.kind {
        InterfaceKind::Wireless => {
            let ssid = iface.ssid.as_deref().unwrap_or("unknown SSID");
            let signal = iface
                .signal_dbm
                .map(|s| format!(", signal {} dBm", s))
                .unwrap_or_default();
            format!("{}: {} (wireless, {}{})", iface.name, ip, ssid, signal)
        }
        _ => {
            let speed = iface
                .link_speed_mbps
                .map(|s| format!(", {}", format_rate(s as f64)))
                .unwrap_or_default();
            format!("{}: {} (wired{})", iface.name, ip, speed)
        }
    }
}

/// Print the report summary as a console table.
pub fn print_summary(report: &RunReport) {
    println!();
    println!("=== netvitals run {} ===", report.run_id);
    println!("Host:       {} ({})", report.hostname, report.os);
    println!("Target:     {}", report.target);
    println!(
        "Iterations: {} of {} completed{}",
        report.iterations_completed,
        report.iterations_requested,
        if report.interrupted {
            " (interrupted)"
        } else {
            ""
        }
    );

    if !report.interfaces.is_empty() {
        println!("Interfaces:");
        for iface in &report.interfaces {
            println!("  - {}", describe_interface(iface));
        }
    }

    println!();
    println!(
        "{:<16} | {:>9} | {:>8} | {:>7} | Key metrics",
        "Probe", "Successes", "Failures", "Skipped"
    );
    println!("{:-<16}-|-{:-<9}-|-{:-<8}-|-{:-<7}-|-{:-<40}", "", "", "", "", "");

    for kind_summary in &report.summary.kinds {
        let metrics = headline(kind_summary.kind, report);
        println!(
            "{:<16} | {:>9} | {:>8} | {:>7} | {}",
            kind_summary.kind.to_string(),
            kind_summary.successes,
            kind_summary.failures,
            kind_summary.skipped,
            metrics,
        );
    }
    println!();
}

fn headline(kind: ProbeKind, report: &RunReport) -> String {
    let Some(kind_summary) = report.summary.kind(kind) else {
        return String::new();
    };
    if kind_summary.successes == 0 {
        return "-".to_string();
    }

    let stat = |name: &str| kind_summary.metrics.get(name).map(|m| m.mean);
    match kind {
        ProbeKind::Latency => {
            let avg = stat("avg_ms").unwrap_or(0.0);
            let jitter = stat("jitter_ms").unwrap_or(0.0);
            format!("avg {:.2} ms, jitter {:.2} ms", avg, jitter)
        }
        ProbeKind::Throughput => {
            let send = stat("send_mbps").unwrap_or(0.0);
            let recv = stat("recv_mbps").unwrap_or(0.0);
            format!("send {}, recv {}", format_rate(send), format_rate(recv))
        }
        ProbeKind::InternetSpeed => {
            let down = stat("download_mbps").unwrap_or(0.0);
            let up = stat("upload_mbps").unwrap_or(0.0);
            format!("down {}, up {}", format_rate(down), format_rate(up))
        }
        ProbeKind::LocalTransfer => {
            let mbps = stat("mbps").unwrap_or(0.0);
            format_rate(mbps)
        }
    }
}
