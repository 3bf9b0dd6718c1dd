use std::path::Path;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer};
use tokio_stream::StreamExt;
use tracing::{debug, info};

use crate::config::RemoteConfig;
use crate::domain::RemoteLogSummary;
use crate::error::{LogboxError, Result};
use crate::util::hash_forward::HashingForward;

/// Result of streaming one archive to disk.
#[derive(Clone, Debug)]
pub struct Fetched {
    pub bytes: u64,
    pub blake3: String,
}

/// Where log bundles come from.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// List remote bundles matching `keyword`; an empty keyword lists all.
    async fn search(&self, keyword: &str) -> Result<Vec<RemoteLogSummary>>;

    /// Stream the archive for `id` into `dest`, overwriting it.
    async fn fetch(&self, id: &str, dest: &Path) -> Result<Fetched>;
}

/// HTTP client for the remote log-hosting authority.
pub struct RemoteClient {
    http: Client,
    cfg: RemoteConfig,
}

impl RemoteClient {
    pub fn new(cfg: RemoteConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("logbox/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, cfg })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.cfg.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl LogSource for RemoteClient {
    async fn search(&self, keyword: &str) -> Result<Vec<RemoteLogSummary>> {
        let resp = self
            .http
            .get(self.url("/api/v1/search"))
            .query(&[("queryType", "1"), ("keyword", keyword)])
            .basic_auth(&self.cfg.username, Some(&self.cfg.password))
            .timeout(self.cfg.search_timeout)
            .send()
            .await?
            .error_for_status()?;
        let raw: Vec<RawRemoteLog> = resp.json().await?;
        debug!(keyword, results = raw.len(), "remote search finished");
        Ok(raw.into_iter().map(RemoteLogSummary::from).collect())
    }

    async fn fetch(&self, id: &str, dest: &Path) -> Result<Fetched> {
        let url = self.url(&format!("/api/v1/download-log/{id}"));
        info!(log_id = id, %url, "downloading log archive");
        let resp = self
            .http
            .get(&url)
            .basic_auth(&self.cfg.username, Some(&self.cfg.password))
            .timeout(self.cfg.fetch_timeout)
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(LogboxError::RemoteNotFound(id.to_string()));
        }
        let resp = resp.error_for_status()?;

        let mut sink = HashingForward::create(dest).await?;
        let mut body = std::pin::pin!(resp.bytes_stream());
        while let Some(chunk) = body.next().await {
            sink.write_chunk(&chunk?).await?;
        }
        let (bytes, blake3) = sink.finish().await?;
        info!(log_id = id, bytes, %blake3, "download finished");
        Ok(Fetched { bytes, blake3 })
    }
}

#[derive(Deserialize)]
struct RawRemoteLog {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    #[serde(rename = "x-boxname", default)]
    boxname: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    createat: String,
    #[serde(default)]
    description: Option<String>,
}

impl From<RawRemoteLog> for RemoteLogSummary {
    fn from(raw: RawRemoteLog) -> Self {
        Self {
            id: raw.id,
            boxname: raw.boxname.unwrap_or_default(),
            createat: raw.createat,
            description: raw.description.unwrap_or_default(),
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}
