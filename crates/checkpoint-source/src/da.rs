use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use light_common::{retry_with_backoff, RetryConfig};
use light_primitives::{Checkpoint, CheckpointExport, DaSource, SourceDescriptor};
use tracing::*;

use crate::{errors::SourceError, s3::parse_checkpoint, source::CheckpointSource};

/// Number of data ids requested per namespace page.
pub const DA_PAGE_SIZE: u64 = 100;

const NO_HINT: u64 = u64::MAX;

/// Read access to a data-availability namespace.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait DaNamespaceReader: Send + Sync {
    /// Number of data entries in the namespace.
    async fn data_count(&self, namespace_id: &str) -> Result<u64, SourceError>;

    /// Ids of up to `limit` entries starting at `offset`, oldest first.
    async fn list_data_ids(
        &self,
        namespace_id: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<String>, SourceError>;

    /// Raw payload of one entry.
    async fn data(&self, data_id: &str) -> Result<Vec<u8>, SourceError>;
}

/// Checkpoints published as entries of a data-availability namespace.
///
/// The namespace is scanned page by page for the entry matching the requested block. The page
/// where the last match was found is remembered and the next scan starts there, wrapping
/// around to the beginning of the namespace.
pub struct DaCheckpointSource {
    descriptor: SourceDescriptor,
    namespace_id: String,
    name: String,
    meta_protocol: String,
    reader: Arc<dyn DaNamespaceReader>,
    retry: RetryConfig,
    offset_hint: AtomicU64,
}

impl fmt::Debug for DaCheckpointSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DaCheckpointSource")
            .field("descriptor", &self.descriptor)
            .field("offset_hint", &self.offset_hint)
            .finish_non_exhaustive()
    }
}

impl DaCheckpointSource {
    pub fn new(
        source: DaSource,
        meta_protocol: impl Into<String>,
        reader: Arc<dyn DaNamespaceReader>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            namespace_id: source.namespace_id.clone(),
            name: source.name.clone(),
            descriptor: SourceDescriptor::Da(source),
            meta_protocol: meta_protocol.into(),
            reader,
            retry,
            offset_hint: AtomicU64::new(NO_HINT),
        }
    }

    /// Offset of the page where the previous scan matched, if any.
    pub fn offset_hint(&self) -> Option<u64> {
        match self.offset_hint.load(Ordering::Relaxed) {
            NO_HINT => None,
            hint => Some(hint),
        }
    }

    /// Starts at the hint, or at the newest page when there is none or it is out of range.
    fn start_offset(&self, count: u64) -> u64 {
        self.offset_hint()
            .filter(|hint| *hint < count)
            .unwrap_or_else(|| count.saturating_sub(DA_PAGE_SIZE))
    }

    fn matches(&self, checkpoint: &Checkpoint, height: u64, hash: &str) -> bool {
        checkpoint.name().eq_ignore_ascii_case(&self.name)
            && checkpoint
                .meta_protocol()
                .eq_ignore_ascii_case(&self.meta_protocol)
            && checkpoint.is_for_block(height, hash)
    }

    async fn scan(&self, height: u64, hash: &str) -> Result<Checkpoint, SourceError> {
        let ns = &self.namespace_id;
        let count = self.reader.data_count(ns).await?;
        if count == 0 {
            return Err(SourceError::EmptyNamespace(ns.clone()));
        }

        for (offset, limit) in page_windows(self.start_offset(count), count) {
            let ids = self.reader.list_data_ids(ns, offset, limit).await?;
            trace!(namespace_id = %ns, %offset, entries = ids.len(), "scanning namespace page");

            for id in ids {
                let raw = self.reader.data(&id).await?;
                let checkpoint = match parse_checkpoint(&id, &raw) {
                    Ok(c) => c,
                    Err(err) => {
                        debug!(namespace_id = %ns, data_id = %id, %err, "skipping foreign entry");
                        continue;
                    }
                };
                if self.matches(&checkpoint, height, hash) {
                    self.offset_hint.store(offset, Ordering::Relaxed);
                    return Ok(checkpoint);
                }
            }
        }

        Err(SourceError::NotFound {
            namespace_id: ns.clone(),
            height,
            hash: hash.to_owned(),
        })
    }
}

/// Pages covering `[start, count)` followed by `[0, start)`, as `(offset, limit)` pairs.
fn page_windows(start: u64, count: u64) -> Vec<(u64, u64)> {
    let forward = (start..count)
        .step_by(DA_PAGE_SIZE as usize)
        .map(|off| (off, DA_PAGE_SIZE));
    let wrapped = (0..start)
        .step_by(DA_PAGE_SIZE as usize)
        .map(|off| (off, DA_PAGE_SIZE.min(start - off)));
    forward.chain(wrapped).collect()
}

#[async_trait]
impl CheckpointSource for DaCheckpointSource {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    async fn fetch(&self, height: u64, hash: &str) -> Result<CheckpointExport, SourceError> {
        let name = self.descriptor.to_string();
        let checkpoint = retry_with_backoff(&name, &self.retry, SourceError::is_transient, || {
            self.scan(height, hash)
        })
        .await
        .inspect_err(|err| warn!(source = %name, %height, %hash, %err, "failed to find checkpoint"))?;

        debug!(source = %name, %height, commitment = %checkpoint.commitment(), "fetched checkpoint");
        Ok(CheckpointExport::new(checkpoint, self.descriptor.clone()))
    }
}
