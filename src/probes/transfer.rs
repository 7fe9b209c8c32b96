//! Local transfer probe: timed write + read-back of a generated payload,
//! typically against a network mount. Measures effective file throughput.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use rand::RngCore;
use tracing::warn;

use super::{Probe, ProbeKind, ProbeMetrics, ProbeOutcome};

const CHUNK_BYTES: usize = 1024 * 1024;
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(300);

pub struct LocalTransferProbe {
    dir: PathBuf,
    payload_mb: u64,
}

impl LocalTransferProbe {
    pub fn new(dir: PathBuf, payload_mb: u64) -> Self {
        Self { dir, payload_mb }
    }
}

#[async_trait::async_trait]
impl Probe for LocalTransferProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::LocalTransfer
    }

    async fn run(&self) -> ProbeOutcome {
        let dir = self.dir.clone();
        let payload_mb = self.payload_mb;

        // File I/O is blocking; run it off the async worker under a timeout.
        let task =
            tokio::task::spawn_blocking(move || transfer_once(&dir, payload_mb));

        match tokio::time::timeout(TRANSFER_TIMEOUT, task).await {
            Ok(Ok(Ok(timing))) => ProbeOutcome::Success {
                metrics: ProbeMetrics::LocalTransfer {
                    mbps: timing.mbps(),
                    bytes: timing.bytes,
                    write_secs: timing.write_secs,
                    read_secs: timing.read_secs,
                    elapsed_secs: timing.elapsed_secs(),
                },
            },
            Ok(Ok(Err(e))) => ProbeOutcome::Failure {
                diagnostic: format!("transfer to {} failed: {}", self.dir.display(), e),
            },
            Ok(Err(join_err)) => ProbeOutcome::Failure {
                diagnostic: format!("transfer task failed: {}", join_err),
            },
            Err(_) => {
                warn!(dir = %self.dir.display(), "local transfer timed out");
                ProbeOutcome::Failure {
                    diagnostic: format!(
                        "transfer to {} exceeded the {}s timeout",
                        self.dir.display(),
                        TRANSFER_TIMEOUT.as_secs()
                    ),
                }
            }
        }
    }
}

pub(crate) struct TransferTiming {
    pub bytes: u64,
    pub write_secs: f64,
    pub read_secs: f64,
}

impl TransferTiming {
    pub fn elapsed_secs(&self) -> f64 {
        self.write_secs + self.read_secs
    }

    pub fn mbps(&self) -> f64 {
        let elapsed = self.elapsed_secs();
        if elapsed <= 0.0 {
            return 0.0;
        }
        (self.bytes as f64 * 8.0) / elapsed / 1_000_000.0
    }
}

/// Write a random payload to `dir`, sync it, read it back, and time both
/// phases. The payload file is removed on every path, including errors.
pub(crate) fn transfer_once(
    dir: &std::path::Path,
    payload_mb: u64,
) -> std::io::Result<TransferTiming> {
    let path = dir.join(format!(
        "netvitals-payload-{}.bin",
        uuid::Uuid::new_v4().simple()
    ));

    let result = write_and_read(&path, payload_mb);
    if let Err(e) = std::fs::remove_file(&path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove payload file");
        }
    }
    result
}

fn write_and_read(path: &std::path::Path, payload_mb: u64) -> std::io::Result<TransferTiming> {
    let mut chunk = vec![0u8; CHUNK_BYTES];
    rand::thread_rng().fill_bytes(&mut chunk);
    let total_bytes = payload_mb * CHUNK_BYTES as u64;

    let write_start = Instant::now();
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    for _ in 0..payload_mb {
        file.write_all(&chunk)?;
    }
    file.sync_all()?;
    drop(file);
    let write_secs = write_start.elapsed().as_secs_f64();

    let read_start = Instant::now();
    let mut file = File::open(path)?;
    let mut buf = vec![0u8; CHUNK_BYTES];
    let mut read_bytes: u64 = 0;
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        read_bytes += n as u64;
    }
    let read_secs = read_start.elapsed().as_secs_f64();

    if read_bytes != total_bytes {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!("read back {} of {} bytes", read_bytes, total_bytes),
        ));
    }

    Ok(TransferTiming {
        bytes: total_bytes,
        write_secs,
        read_secs,
    })
}
