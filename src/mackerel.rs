//! Mackerel API client.
//!
//! Posts metric values, updates host metadata and creates graph definitions
//! through the Mackerel REST API. Implements [`Sender`] for the send queue and
//! [`MetadataUpdater`] for the metadata ticker and supervisor.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::collectors::InterfaceInfo;
use crate::config::{GraphDef, GraphDefMetric};
use crate::counters;
use crate::metric::Metric;
use crate::sendqueue::Sender;
use crate::ticker::MetadataUpdater;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("herakles-traffic-agent/", env!("CARGO_PKG_VERSION"));

/// Errors returned by the ingestion backend client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api returned status {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MetricValue<'a> {
    host_id: &'a str,
    name: &'a str,
    time: i64,
    value: f64,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct HostInterface {
    name: String,
    ipv4_addresses: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mac_address: Option<String>,
}

/// Interface list reported for a host. An empty inventory reports the
/// target address as a single `main` interface.
fn host_interfaces(host_addr: &str, inventory: &[InterfaceInfo]) -> Vec<HostInterface> {
    if inventory.is_empty() {
        return vec![HostInterface {
            name: "main".into(),
            ipv4_addresses: vec![host_addr.to_string()],
            mac_address: None,
        }];
    }
    inventory
        .iter()
        .map(|i| HostInterface {
            name: i.name.clone(),
            ipv4_addresses: i.ip_addresses.clone(),
            mac_address: i.mac_address.clone(),
        })
        .collect()
}

/// Graph definitions for the raw-diff interface counters, one graph per counter
/// with a wildcard over interfaces.
pub fn standard_graph_defs() -> Vec<GraphDef> {
    counters::known_names()
        .filter(|name| !counters::is_rate(name))
        .map(|name| GraphDef {
            name: format!("custom.interface.{}", name),
            display_name: name.to_string(),
            unit: "integer".into(),
            metrics: vec![GraphDefMetric {
                name: format!("custom.interface.{}.*", name),
                display_name: "%1".into(),
                is_stacked: false,
            }],
        })
        .collect()
}

pub struct MackerelClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl MackerelClient {
    pub fn new(api_key: impl Into<String>, api_base: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    async fn request<T: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &T,
    ) -> Result<(), ClientError> {
        let response = self
            .http
            .request(method, self.url(path))
            .header("X-Api-Key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        debug!("{} succeeded", path);
        Ok(())
    }

    pub async fn create_graph_defs(&self, defs: &[GraphDef]) -> Result<(), ClientError> {
        if defs.is_empty() {
            return Ok(());
        }
        self.request(reqwest::Method::POST, "/api/v0/graph-defs/create", defs)
            .await
    }
}

#[async_trait]
impl Sender for MackerelClient {
    async fn send(&self, host_id: &str, metrics: &[Metric]) -> Result<(), ClientError> {
        let values: Vec<MetricValue<'_>> = metrics
            .iter()
            .map(|m| MetricValue {
                host_id,
                name: &m.name,
                time: m.time,
                value: m.value,
            })
            .collect();
        self.request(reqwest::Method::POST, "/api/v0/tsdb", &values)
            .await
    }
}

#[async_trait]
impl MetadataUpdater for MackerelClient {
    async fn update_host(
        &self,
        host_id: &str,
        host_addr: &str,
        hostname: &str,
        inventory: &[InterfaceInfo],
    ) -> Result<(), ClientError> {
        let body = json!({
            "name": hostname,
            "meta": {},
            "interfaces": host_interfaces(host_addr, inventory),
        });
        self.request(
            reqwest::Method::PUT,
            &format!("/api/v0/hosts/{}", host_id),
            &body,
        )
        .await?;
        MackerelClient::create_graph_defs(self, &standard_graph_defs()).await
    }

    async fn create_graph_defs(&self, defs: &[GraphDef]) -> Result<(), ClientError> {
        MackerelClient::create_graph_defs(self, defs).await
    }
}
