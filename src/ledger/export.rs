//! JSONL fact export
//!
//! - Append-only file, one fact per line
//! - Flushed and synced after each line
//! - Runs off a ledger subscription; the appender never waits on it

use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use super::errors::ExportResult;
use super::fact::Fact;
use super::log::FactReceiver;

/// Drain `rx` into the file at `path` until the ledger side closes.
///
/// Returns the number of facts written.
pub async fn export_jsonl(mut rx: FactReceiver, path: impl AsRef<Path>) -> ExportResult<u64> {
    let path: PathBuf = path.as_ref().to_path_buf();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await?;

    let mut written = 0u64;
    while let Some(fact) = rx.recv().await {
        let mut line = serde_json::to_vec(&fact)?;
        line.push(b'\n');
        file.write_all(&line).await?;
        file.flush().await?;
        file.sync_data().await?;
        written += 1;
    }

    Ok(written)
}

/// Read a JSONL export back.
pub fn read_jsonl(path: impl AsRef<Path>) -> ExportResult<Vec<Fact>> {
    let content = std::fs::read_to_string(path)?;
    let mut facts = Vec::new();
    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        facts.push(serde_json::from_str(line)?);
    }
    Ok(facts)
}
