use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use light_config::CommitteeIndexersConfig;
use light_primitives::DenylistEntry;
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::Mutex};
use tracing::*;

use crate::{errors::DenylistError, sink::DenylistSink};

/// Denylist stored as one JSON object per line.
#[derive(Debug)]
pub struct JsonLinesDenylist {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesDenylist {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: io::Error) -> DenylistError {
        DenylistError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl DenylistSink for JsonLinesDenylist {
    async fn append(&self, entry: &DenylistEntry) -> Result<(), DenylistError> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_err(e))?;
        file.write_all(&line).await.map_err(|e| self.io_err(e))?;
        file.flush().await.map_err(|e| self.io_err(e))?;

        info!(source = %entry.source, height = entry.evidence.height, "source added to denylist");
        Ok(())
    }
}

/// Reads the entries stored at `path`.
///
/// A missing file is an empty denylist. Reading stops at the first line that does not parse;
/// entries before it are kept.
pub fn load(path: &Path) -> Result<Vec<DenylistEntry>, DenylistError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(?path, "no denylist file");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(DenylistError::Io {
                path: path.to_owned(),
                source,
            })
        }
    };

    let mut entries = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|source| DenylistError::Io {
            path: path.to_owned(),
            source,
        })?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(entry) => entries.push(entry),
            Err(err) => {
                warn!(?path, loaded = entries.len(), %err, "malformed denylist line, ignoring the rest");
                break;
            }
        }
    }
    Ok(entries)
}

/// Removes every configured source that some entry convicts. Returns how many were removed.
pub fn prune_sources(indexers: &mut CommitteeIndexersConfig, entries: &[DenylistEntry]) -> usize {
    let before = indexers.len();
    indexers.retain_allowed(|desc| entries.iter().any(|e| e.source == *desc));
    let removed = before - indexers.len();
    if removed > 0 {
        info!(%removed, "pruned denylisted sources");
    }
    removed
}
