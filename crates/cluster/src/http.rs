//! REST client for the managed Elasticsearch / OpenSearch node.
//!
//! Endpoints used:
//! - `GET  /_cat/indices?format=json`: index snapshot
//! - `HEAD /{index}`: existence (200 / 404)
//! - `PUT  /{index}`, `DELETE /{index}`: acknowledged mutations
//! - `GET  /_cat/master?format=json` and `GET /_nodes/_local`: leadership
//! - `GET  /` and `GET /_nodes/_local/stats/process`: liveness and stats

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::admin::{IndexAdmin, IndexSnapshot, IndexStatus};
use crate::error::ClusterError;
use crate::health::{NodeProbe, ProcessStats};
use crate::leader::LeadershipCheck;

const CAT_INDICES: &str = "_cat/indices?format=json&h=index,health,status,docs.count";
const CAT_MASTER: &str = "_cat/master?format=json&h=id,node";
const LOCAL_NODE: &str = "_nodes/_local?filter_path=nodes.*.name";
const LOCAL_PROCESS_STATS: &str = "_nodes/_local/stats/process";

/// Stateless REST client; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct EsHttpClient {
    base_url: Url,
    client: reqwest::Client,
}

impl EsHttpClient {
    pub fn new(base_url: &str) -> Result<Self, ClusterError> {
        let mut url = Url::parse(base_url)
            .map_err(|e| ClusterError::InvalidUrl(format!("{base_url}: {e}")))?;
        if url.cannot_be_a_base() {
            return Err(ClusterError::InvalidUrl(base_url.to_string()));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(Self {
            base_url: url,
            client: reqwest::Client::new(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn api_url(&self, path: &str) -> Result<Url, ClusterError> {
        self.base_url
            .join(path)
            .map_err(|e| ClusterError::InvalidUrl(format!("{path}: {e}")))
    }

    /// URL of a single index; the name is percent-encoded as one path segment.
    fn index_url(&self, index: &str) -> Result<Url, ClusterError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClusterError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(index);
        Ok(url)
    }

    async fn get_text(&self, path: &str, timeout: Duration) -> Result<String, ClusterError> {
        let url = self.api_url(path)?;
        let response = self.client.get(url).timeout(timeout).send().await?;
        let response = ensure_success("GET", path, response).await?;
        Ok(response.text().await?)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        timeout: Duration,
    ) -> Result<T, ClusterError> {
        let body = self.get_text(path, timeout).await?;
        decode(path, &body)
    }

    async fn mutate_index(
        &self,
        method: Method,
        index: &str,
        timeout: Duration,
    ) -> Result<bool, ClusterError> {
        let url = self.index_url(index)?;
        let label = if method == Method::PUT { "PUT" } else { "DELETE" };
        let response = self
            .client
            .request(method, url)
            .timeout(timeout)
            .send()
            .await?;
        let response = ensure_success(label, index, response).await?;
        let body = response.text().await?;
        parse_acknowledged(index, &body)
    }
}

#[async_trait]
impl IndexAdmin for EsHttpClient {
    async fn list_indices(&self, timeout: Duration) -> Result<IndexSnapshot, ClusterError> {
        let body = self.get_text(CAT_INDICES, timeout).await?;
        parse_cat_indices(&body)
    }

    async fn index_exists(&self, name: &str, timeout: Duration) -> Result<bool, ClusterError> {
        let url = self.index_url(name)?;
        let response = self.client.head(url).timeout(timeout).send().await?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(ClusterError::Status {
                method: "HEAD",
                target: name.to_string(),
                status: status.as_u16(),
                body: String::new(),
            }),
        }
    }

    async fn create_index(&self, name: &str, timeout: Duration) -> Result<bool, ClusterError> {
        self.mutate_index(Method::PUT, name, timeout).await
    }

    async fn delete_index(&self, name: &str, timeout: Duration) -> Result<bool, ClusterError> {
        self.mutate_index(Method::DELETE, name, timeout).await
    }
}

#[async_trait]
impl LeadershipCheck for EsHttpClient {
    async fn is_current_node_leader(&self, timeout: Duration) -> Result<bool, ClusterError> {
        let master_body = self.get_text(CAT_MASTER, timeout).await?;
        let Some(master_id) = parse_master_id(&master_body)? else {
            tracing::debug!("no elected master reported by the cluster");
            return Ok(false);
        };

        let local_body = self.get_text(LOCAL_NODE, timeout).await?;
        let local_id = parse_local_node_id(&local_body)?;

        tracing::debug!(master = %master_id, local = %local_id, "resolved master node");
        Ok(master_id == local_id)
    }
}

#[async_trait]
impl NodeProbe for EsHttpClient {
    async fn ping(&self, timeout: Duration) -> Result<(), ClusterError> {
        self.get_text("", timeout).await.map(|_| ())
    }

    async fn local_process_stats(&self, timeout: Duration) -> Result<ProcessStats, ClusterError> {
        let body: NodesEnvelope<ProcessSection> =
            self.get_json(LOCAL_PROCESS_STATS, timeout).await?;
        body.nodes
            .into_values()
            .next()
            .map(|node| node.process)
            .ok_or_else(|| ClusterError::Decode {
                target: LOCAL_PROCESS_STATS.to_string(),
                reason: "no local node in response".to_string(),
            })
    }
}

async fn ensure_success(
    method: &'static str,
    target: &str,
    response: Response,
) -> Result<Response, ClusterError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    tracing::warn!(method, target, %status, body = %body, "cluster returned non-2xx status");
    Err(ClusterError::Status {
        method,
        target: target.to_string(),
        status: status.as_u16(),
        body,
    })
}

fn decode<T: DeserializeOwned>(target: &str, body: &str) -> Result<T, ClusterError> {
    serde_json::from_str(body).map_err(|e| ClusterError::Decode {
        target: target.to_string(),
        reason: e.to_string(),
    })
}

// ── Response shapes ───────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CatIndexRow {
    index: String,
    health: Option<String>,
    status: Option<String>,
    #[serde(rename = "docs.count")]
    docs_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CatMasterRow {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NodesEnvelope<T> {
    #[serde(default = "HashMap::new")]
    nodes: HashMap<String, T>,
}

#[derive(Debug, Deserialize)]
struct ProcessSection {
    #[serde(default)]
    process: ProcessStats,
}

#[derive(Debug, Deserialize)]
struct Acknowledgment {
    #[serde(default)]
    acknowledged: bool,
}

fn parse_cat_indices(body: &str) -> Result<IndexSnapshot, ClusterError> {
    let rows: Vec<CatIndexRow> = decode("_cat/indices", body)?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let status = IndexStatus {
                health: row.health,
                status: row.status,
                docs_count: row.docs_count.and_then(|c| c.parse().ok()),
            };
            (row.index, status)
        })
        .collect())
}

fn parse_master_id(body: &str) -> Result<Option<String>, ClusterError> {
    let rows: Vec<CatMasterRow> = decode("_cat/master", body)?;
    Ok(rows
        .into_iter()
        .next()
        .and_then(|row| row.id)
        .filter(|id| !id.is_empty() && id != "-"))
}

fn parse_local_node_id(body: &str) -> Result<String, ClusterError> {
    let envelope: NodesEnvelope<serde_json::Value> = decode("_nodes/_local", body)?;
    let mut ids = envelope.nodes.into_keys();
    match (ids.next(), ids.next()) {
        (Some(id), None) => Ok(id),
        (None, _) => Err(ClusterError::Decode {
            target: "_nodes/_local".to_string(),
            reason: "no local node in response".to_string(),
        }),
        (Some(_), Some(_)) => Err(ClusterError::Decode {
            target: "_nodes/_local".to_string(),
            reason: "more than one local node in response".to_string(),
        }),
    }
}

fn parse_acknowledged(target: &str, body: &str) -> Result<bool, ClusterError> {
    let ack: Acknowledgment = decode(target, body)?;
    Ok(ack.acknowledged)
}
