use std::{fmt, time::Duration};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};

use crate::{da::DaNamespaceReader, errors::SourceError};

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataIdsResponse {
    #[serde(default)]
    data_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataResponse {
    raw_data: String,
}

/// [`DaNamespaceReader`] over a DA node's JSON query API.
pub struct HttpDaNamespaceReader {
    base_url: String,
    client: Client,
}

impl fmt::Debug for HttpDaNamespaceReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpDaNamespaceReader")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpDaNamespaceReader {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| SourceError::Setup(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            client,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, SourceError> {
        let transport = |e: reqwest::Error| SourceError::Transport {
            url: url.clone(),
            reason: e.to_string(),
        };
        let resp = self.client.get(&url).send().await.map_err(transport)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url,
                status: status.as_u16(),
            });
        }
        let body = resp.bytes().await.map_err(transport)?;
        serde_json::from_slice(&body).map_err(|e| SourceError::Decode {
            origin: url,
            reason: e.to_string(),
        })
    }
}

fn count_url(base: &str, namespace_id: &str) -> String {
    format!("{base}/v1/namespaces/{namespace_id}/count")
}

fn data_ids_url(base: &str, namespace_id: &str, offset: u64, limit: u64) -> String {
    format!("{base}/v1/namespaces/{namespace_id}/data_ids?offset={offset}&limit={limit}")
}

fn data_url(base: &str, data_id: &str) -> String {
    format!("{base}/v1/data/{data_id}")
}

#[async_trait]
impl DaNamespaceReader for HttpDaNamespaceReader {
    async fn data_count(&self, namespace_id: &str) -> Result<u64, SourceError> {
        let resp: CountResponse = self.get_json(count_url(&self.base_url, namespace_id)).await?;
        Ok(resp.count)
    }

    async fn list_data_ids(
        &self,
        namespace_id: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<String>, SourceError> {
        let url = data_ids_url(&self.base_url, namespace_id, offset, limit);
        let resp: DataIdsResponse = self.get_json(url).await?;
        Ok(resp.data_ids)
    }

    async fn data(&self, data_id: &str) -> Result<Vec<u8>, SourceError> {
        let resp: DataResponse = self.get_json(data_url(&self.base_url, data_id)).await?;
        STANDARD
            .decode(resp.raw_data.trim())
            .map_err(|e| SourceError::Decode {
                origin: data_id.to_owned(),
                reason: e.to_string(),
            })
    }
}
