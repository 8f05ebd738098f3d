use std::{fmt, str, time::Duration};

use async_trait::async_trait;
use light_common::{retry_with_backoff, RetryConfig};
use light_primitives::{Checkpoint, CheckpointExport, S3Source, SourceDescriptor};
use reqwest::Client;
use tracing::*;

use crate::{errors::SourceError, source::CheckpointSource};

/// Checkpoints uploaded by a committee indexer to an S3 bucket, one object per block.
pub struct S3CheckpointSource {
    descriptor: SourceDescriptor,
    meta_protocol: String,
    base_url: String,
    client: Client,
    retry: RetryConfig,
}

impl fmt::Debug for S3CheckpointSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3CheckpointSource")
            .field("descriptor", &self.descriptor)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl S3CheckpointSource {
    /// Creates a source reading from `endpoint`, or the bucket's public virtual-host URL when
    /// `endpoint` is `None`.
    pub fn new(
        source: S3Source,
        endpoint: Option<String>,
        meta_protocol: impl Into<String>,
        request_timeout: Duration,
        retry: RetryConfig,
    ) -> Result<Self, SourceError> {
        let base_url = endpoint
            .unwrap_or_else(|| format!("https://{}.s3.{}.amazonaws.com", source.bucket, source.region));
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| SourceError::Setup(e.to_string()))?;
        Ok(Self {
            descriptor: SourceDescriptor::S3(source),
            meta_protocol: meta_protocol.into(),
            base_url,
            client,
            retry,
        })
    }

    fn object_url(&self, height: u64, hash: &str) -> String {
        format!(
            "{}/checkpoint-{}-{}-{height}-{hash}.json",
            self.base_url.trim_end_matches('/'),
            self.descriptor.name(),
            self.meta_protocol,
        )
    }

    async fn download(&self, height: u64, hash: &str) -> Result<Checkpoint, SourceError> {
        let url = self.object_url(height, hash);
        trace!(%url, "downloading checkpoint object");

        let transport = |e: reqwest::Error| SourceError::Transport {
            url: url.clone(),
            reason: e.to_string(),
        };
        let resp = self.client.get(&url).send().await.map_err(transport)?;
        let status = resp.status();
        let body = resp.bytes().await.map_err(transport)?;

        // S3 describes failures in an XML document, whatever the status.
        if let Some(err) = storage_error(&url, &body) {
            return Err(err);
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let checkpoint = parse_checkpoint(&url, &body)?;
        ensure_block(&url, &checkpoint, height, hash)?;
        Ok(checkpoint)
    }
}

pub(crate) fn parse_checkpoint(origin: &str, body: &[u8]) -> Result<Checkpoint, SourceError> {
    serde_json::from_slice(body).map_err(|e| SourceError::Decode {
        origin: origin.to_owned(),
        reason: e.to_string(),
    })
}

fn ensure_block(
    origin: &str,
    checkpoint: &Checkpoint,
    height: u64,
    hash: &str,
) -> Result<(), SourceError> {
    if checkpoint.is_for_block(height, hash) {
        return Ok(());
    }
    Err(SourceError::WrongBlock {
        origin: origin.to_owned(),
        height,
        hash: hash.to_owned(),
        got_height: checkpoint.height(),
        got_hash: checkpoint.hash().to_owned(),
    })
}

/// Extracts `<Code>` and `<Message>` from an S3 error document.
fn storage_error(url: &str, body: &[u8]) -> Option<SourceError> {
    let text = str::from_utf8(body).ok()?;
    if !text.trim_start().starts_with('<') {
        return None;
    }
    let code = xml_field(text, "Code")?;
    Some(SourceError::Storage {
        url: url.to_owned(),
        code: code.to_owned(),
        message: xml_field(text, "Message").unwrap_or_default().to_owned(),
    })
}

fn xml_field<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = text.find(&open)? + open.len();
    let len = text[start..].find(&close)?;
    Some(&text[start..start + len])
}

#[async_trait]
impl CheckpointSource for S3CheckpointSource {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    async fn fetch(&self, height: u64, hash: &str) -> Result<CheckpointExport, SourceError> {
        let name = self.descriptor.to_string();
        let checkpoint = retry_with_backoff(&name, &self.retry, SourceError::is_transient, || {
            self.download(height, hash)
        })
        .await
        .inspect_err(|err| warn!(source = %name, %height, %hash, %err, "failed to download checkpoint"))?;

        debug!(source = %name, %height, commitment = %checkpoint.commitment(), "fetched checkpoint");
        Ok(CheckpointExport::new(checkpoint, self.descriptor.clone()))
    }
}
