//! Elasticsearch-backed [`MetadataIndex`].
//!
//! Backup jobs index one document per run into `backups-*`:
//!
//! ```json
//! { "@timestamp": "...", "source": { "id": "b1" },
//!   "stats": { "dumpedfiles": ["s3://bucket1/snap.enc"] } }
//! ```
//!
//! The newest document for the backup id wins and its first dumped file is the
//! snapshot locator. Responses are decoded into typed structs; an empty hit
//! list or an unexpected shape is an error value, never a panic.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use url::Url;
use validator::Validate;

use super::{IndexError, MetadataIndex, Result};
use crate::secrets::SecretString;

/// Connect timeout used for every index request.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Search index connection settings.
#[derive(Debug, Clone, Validate)]
pub struct IndexConfig {
    /// Base URL, e.g. `https://search.internal:9200`
    #[validate(length(min = 1, message = "ELASTICSEARCH_URL cannot be empty"))]
    pub url: String,

    /// Basic auth username
    pub username: Option<String>,

    /// Basic auth password
    pub password: Option<SecretString>,

    /// Index pattern to search
    #[validate(length(min = 1, message = "Index pattern cannot be empty"))]
    pub index: String,

    /// Whole-request timeout in seconds
    #[validate(range(min = 1, max = 300, message = "Index timeout must be between 1 and 300 seconds"))]
    pub timeout_seconds: u64,

    /// Skip TLS certificate verification. Non-production use only.
    pub insecure_skip_verify: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:9200".to_string(),
            username: None,
            password: None,
            index: "backups-*".to_string(),
            timeout_seconds: 5,
            insecure_skip_verify: false,
        }
    }
}

impl IndexConfig {
    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Elasticsearch search client for backup run records.
#[derive(Debug, Clone)]
pub struct ElasticsearchIndex {
    client: Client,
    search_url: Url,
    username: Option<String>,
    password: Option<SecretString>,
}

impl ElasticsearchIndex {
    /// Build the client. No request is made until the first lookup.
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let base = Url::parse(&config.url)
            .map_err(|e| IndexError::config(format!("Invalid index URL '{}': {}", config.url, e)))?;
        let search_url = base
            .join(&format!("{}/_search", config.index.trim_matches('/')))
            .map_err(|e| IndexError::config(format!("Invalid index pattern: {}", e)))?;

        if config.insecure_skip_verify {
            tracing::warn!(
                url = %config.url,
                "TLS certificate verification DISABLED for the backups index; do not use in production"
            );
        }

        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.timeout())
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .build()
            .map_err(|e| IndexError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            search_url,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn search_body(backup_id: &str) -> serde_json::Value {
        json!({
            "size": 1,
            "sort": [{ "@timestamp": { "order": "desc" } }],
            "query": { "match": { "source.id.keyword": backup_id } }
        })
    }
}

#[async_trait]
impl MetadataIndex for ElasticsearchIndex {
    async fn latest_snapshot(&self, backup_id: &str) -> Result<String> {
        let mut request = self.client.post(self.search_url.clone()).json(&Self::search_body(backup_id));
        if let Some(username) = &self.username {
            request = request
                .basic_auth(username, self.password.as_ref().map(|p| p.expose_secret().to_string()));
        }

        let response = request.send().await.map_err(|e| IndexError::query(e.to_string()))?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| IndexError::query(e.to_string()))?;

        tracing::debug!(backup_id = %backup_id, status = %status, "Backups index responded");
        decode_latest_snapshot(backup_id, status, &body)
    }
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    error: Option<SearchFailure>,
    hits: Option<HitList>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SearchFailure {
    Detailed { reason: String },
    Plain(String),
}

#[derive(Debug, Deserialize)]
struct HitList {
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: BackupRecord,
}

#[derive(Debug, Deserialize)]
struct BackupRecord {
    stats: BackupStats,
}

#[derive(Debug, Deserialize)]
struct BackupStats {
    dumpedfiles: Vec<String>,
}

/// Turn a raw search response into the newest snapshot locator.
fn decode_latest_snapshot(backup_id: &str, status: StatusCode, body: &[u8]) -> Result<String> {
    let envelope: SearchEnvelope = match serde_json::from_slice(body) {
        Ok(envelope) => envelope,
        Err(e) if status.is_success() => return Err(IndexError::malformed(e.to_string())),
        Err(_) => return Err(IndexError::query(format!("search failed with status {}", status))),
    };

    if let Some(failure) = envelope.error {
        let reason = match failure {
            SearchFailure::Detailed { reason } | SearchFailure::Plain(reason) => reason,
        };
        return Err(IndexError::query(reason));
    }

    if !status.is_success() {
        return Err(IndexError::query(format!("search failed with status {}", status)));
    }

    let hits = envelope.hits.ok_or_else(|| IndexError::malformed("response has no 'hits'"))?;
    let hit = hits.hits.into_iter().next().ok_or_else(|| IndexError::no_match(backup_id))?;

    hit.source
        .stats
        .dumpedfiles
        .into_iter()
        .next()
        .ok_or_else(|| IndexError::no_match_because(backup_id, "latest record lists no dumped files"))
}
