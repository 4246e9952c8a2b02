use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// A positive observation: the phrase, what it derived to, and what the
/// oracle reported for it at lookup time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub address: String,
    pub master_key: String,
    pub funded_sats: u64,
    pub phrase: String,
}

/// Append-only durable target for matches.
///
/// The file is opened in create/truncate mode on the first match of the run
/// and appended to afterwards. A write lock serializes appends; each record
/// is one formatted block written in a single call, so records from
/// concurrent workers never interleave. No dedup: the same match observed
/// twice is recorded twice.
pub struct ResultSink {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl ResultSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one complete record.
    pub fn record(&self, m: &Match) -> Result<()> {
        let record = format_record(m);

        let mut guard = self.file.lock();
        let file = match &mut *guard {
            Some(file) => file,
            slot => {
                if let Some(parent) = self.path.parent() {
                    if !parent.as_os_str().is_empty() {
                        fs::create_dir_all(parent)
                            .context("Failed to create results directory")?;
                    }
                }
                let file = File::create(&self.path)
                    .context(format!("Failed to create results file: {}", self.path.display()))?;
                slot.insert(file)
            }
        };

        file.write_all(record.as_bytes())
            .context("Failed to append match record")?;
        file.flush().context("Failed to flush match record")?;

        Ok(())
    }
}

fn format_record(m: &Match) -> String {
    format!(
        "[{}] address: {}\nmaster key: {}\nbalance: {} BTC\nphrase: {}\n\n",
        chrono::Utc::now().to_rfc3339(),
        m.address,
        m.master_key,
        format_btc(m.funded_sats),
        m.phrase,
    )
}

/// Satoshis as a whole-unit BTC decimal, without going through floats.
pub fn format_btc(sats: u64) -> String {
    format!("{}.{:08}", sats / 100_000_000, sats % 100_000_000)
}
