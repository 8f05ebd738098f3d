use std::{fmt, path::PathBuf, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use tracing::*;

use crate::{
    client::CommitteeClient,
    errors::CommitteeError,
    types::{LatestStateProof, LatestStateProofResponse},
};

/// Path of the latest state proof endpoint, relative to an indexer's base URL.
pub const LATEST_STATE_PROOF_PATH: &str = "/v1/brc20_verifiable/latest_state_proof";

const FILE_SCHEME: &str = "file://";

/// [`CommitteeClient`] speaking the committee's JSON API over HTTP.
///
/// `file://` URLs are served from the local filesystem instead, which lets a deployment pin
/// an indexer's evidence to a file.
pub struct HttpCommitteeClient {
    client: Client,
}

impl fmt::Debug for HttpCommitteeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpCommitteeClient").finish_non_exhaustive()
    }
}

impl HttpCommitteeClient {
    pub fn new(request_timeout: Duration) -> Result<Self, CommitteeError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| CommitteeError::Setup(e.to_string()))?;
        Ok(Self { client })
    }

    async fn fetch_remote(&self, base_url: &str) -> Result<LatestStateProof, CommitteeError> {
        let url = state_proof_url(base_url);
        debug!(%url, "requesting latest state proof");

        let transport = |e: reqwest::Error| CommitteeError::Transport {
            url: url.clone(),
            reason: e.to_string(),
        };
        let resp = self.client.get(&url).send().await.map_err(transport)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CommitteeError::Status {
                url,
                status: status.as_u16(),
            });
        }
        let body = resp.bytes().await.map_err(transport)?;
        decode(&url, &body)
    }
}

/// Joins the endpoint path onto an indexer base URL.
fn state_proof_url(base_url: &str) -> String {
    format!("{}{LATEST_STATE_PROOF_PATH}", base_url.trim_end_matches('/'))
}

async fn read_file(path: PathBuf) -> Result<LatestStateProof, CommitteeError> {
    debug!(?path, "reading latest state proof from file");
    let body = tokio::fs::read(&path)
        .await
        .map_err(|source| CommitteeError::Io {
            path: path.clone(),
            source,
        })?;
    decode(&path.display().to_string(), &body)
}

fn decode(origin: &str, body: &[u8]) -> Result<LatestStateProof, CommitteeError> {
    serde_json::from_slice::<LatestStateProofResponse>(body)
        .map(LatestStateProof::from)
        .map_err(|e| CommitteeError::Decode {
            origin: origin.to_owned(),
            reason: e.to_string(),
        })
}

#[async_trait]
impl CommitteeClient for HttpCommitteeClient {
    async fn latest_state_proof(
        &self,
        source_url: &str,
    ) -> Result<LatestStateProof, CommitteeError> {
        match source_url.strip_prefix(FILE_SCHEME) {
            Some(path) => read_file(PathBuf::from(path)).await,
            None => self.fetch_remote(source_url).await,
        }
    }
}
