use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use netvitals::config::RunConfig;

#[derive(Parser)]
#[command(
    name = "netvitals",
    about = "Before/after network performance measurement for a single host",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full measurement suite and write CSV + JSON reports
    Run {
        /// Config file (defaults: $NETVITALS_CONFIG, then ./netvitals.toml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Echo-request target for the latency probe
        #[arg(long)]
        target: Option<String>,

        /// iperf3 server address (enables the throughput probe)
        #[arg(short, long)]
        server: Option<String>,

        /// Number of test iterations
        #[arg(short, long)]
        iterations: Option<u32>,

        /// Duration of each throughput test in seconds
        #[arg(short, long)]
        duration: Option<u32>,

        /// Parallel TCP streams for the throughput test
        #[arg(long)]
        streams: Option<u32>,

        /// Measure download (server-to-client) instead of upload
        #[arg(long)]
        reverse: bool,

        /// Use UDP for the throughput test
        #[arg(long)]
        udp: bool,

        /// Skip the internet speed test
        #[arg(long)]
        no_speedtest: bool,

        /// Skip the local transfer test
        #[arg(long)]
        no_local: bool,

        /// Directory for the local transfer payload (e.g. a NAS mount)
        #[arg(long)]
        transfer_dir: Option<PathBuf>,

        /// Local transfer payload size in MB
        #[arg(long)]
        transfer_size_mb: Option<u64>,

        /// CSV report path
        #[arg(long)]
        csv: Option<PathBuf>,

        /// JSON report path
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Show the active network interfaces and their link properties
    Interfaces {
        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            target,
            server,
            iterations,
            duration,
            streams,
            reverse,
            udp,
            no_speedtest,
            no_local,
            transfer_dir,
            transfer_size_mb,
            csv,
            json,
        } => {
            let mut cfg = match config {
                Some(path) => RunConfig::load(&path)?,
                None => RunConfig::load_or_default(),
            };

            // CLI flags win over file values.
            if let Some(target) = target {
                cfg.general.target = target;
            }
            if let Some(server) = server {
                cfg.throughput.server = Some(server);
            }
            if let Some(iterations) = iterations {
                cfg.general.iterations = iterations;
            }
            if let Some(duration) = duration {
                cfg.throughput.duration_secs = duration;
            }
            if let Some(streams) = streams {
                cfg.throughput.streams = streams;
            }
            if reverse {
                cfg.throughput.reverse = true;
            }
            if udp {
                cfg.throughput.udp = true;
            }
            if no_speedtest {
                cfg.speedtest.enabled = false;
            }
            if no_local {
                cfg.transfer.enabled = false;
            }
            if let Some(dir) = transfer_dir {
                cfg.transfer.dir = Some(dir);
            }
            if let Some(size) = transfer_size_mb {
                cfg.transfer.payload_mb = size;
            }
            if let Some(csv) = csv {
                cfg.output.csv = csv;
            }
            if let Some(json) = json {
                cfg.output.json = json;
            }

            cfg.validate()?;
            netvitals::execute(cfg).await?;
        }
        Commands::Interfaces { json } => {
            let interfaces = netvitals::inspect::platform_inspector().inspect();
            if json {
                println!("{}", serde_json::to_string_pretty(&interfaces)?);
            } else if interfaces.is_empty() {
                println!("No active interfaces found.");
            } else {
                println!("{:<12} | {:<8} | {:<15} | Details", "Interface", "Kind", "IPv4");
                println!("{:-<12}-|-{:-<8}-|-{:-<15}-|-{:-<30}", "", "", "", "");
                for iface in &interfaces {
                    let kind = match iface.kind {
                        netvitals::inspect::InterfaceKind::Wired => "wired",
                        netvitals::inspect::InterfaceKind::Wireless => "wireless",
                        netvitals::inspect::InterfaceKind::Other => "other",
                    };
                    let mut details = Vec::new();
                    if let Some(speed) = iface.link_speed_mbps {
                        details.push(format!("{} Mb/s", speed));
                    }
                    if let Some(ssid) = &iface.ssid {
                        details.push(format!("SSID {}", ssid));
                    }
                    if let Some(signal) = iface.signal_dbm {
                        details.push(format!("{} dBm", signal));
                    }
                    println!(
                        "{:<12} | {:<8} | {:<15} | {}",
                        iface.name,
                        kind,
                        iface.ipv4.as_deref().unwrap_or("-"),
                        details.join(", "),
                    );
                }
            }
        }
    }

    Ok(())
}
