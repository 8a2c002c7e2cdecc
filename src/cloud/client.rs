//! # API Client
//!
//! A thin JSON-over-HTTPS wrapper around the cloud API. Every response is
//! wrapped in a `{"data": ...}` envelope; failures come back as
//! `{"error": {"code", "message", "suggestion"}}` with a non-2xx status.

use super::types::{Instance, InstanceQuote, InstanceTypesItem, LaunchRequest, SshKey, Title};
use crate::ssh::keys::parse_key;
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Instance lifecycle operations.
#[async_trait]
pub trait InstanceApi: Send + Sync {
    async fn instances(&self) -> Result<Vec<Instance>>;

    /// Launch one instance and return the ids the API created.
    async fn launch(&self, request: &LaunchRequest) -> Result<Vec<String>>;

    async fn terminate(&self, ids: &[String]) -> Result<()>;
}

/// Public keys registered with the cloud account.
#[async_trait]
pub trait SshKeyCatalog: Send + Sync {
    async fn ssh_keys(&self) -> Result<KeyCatalog>;
}

/// Registered keys grouped by fingerprint (`type base64`), plus one message
/// per registered key that could not be parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyCatalog {
    pub keys: HashMap<String, Vec<String>>,
    pub errors: Vec<String>,
}

impl KeyCatalog {
    pub fn from_keys(keys: Vec<SshKey>) -> Self {
        let mut catalog = Self::default();
        for key in keys {
            match parse_key(key.public_key.as_bytes()) {
                Ok(fingerprint) => catalog.keys.entry(fingerprint).or_default().push(key.name),
                Err(e) => catalog
                    .errors
                    .push(format!("error parsing cloud SSH key '{}': {}", key.name, e)),
            }
        }
        catalog
    }

    /// Whether some registered key is called `name`.
    pub fn has_name(&self, name: &str) -> bool {
        self.keys.values().flatten().any(|n| n == name)
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    message: String,
    #[serde(default)]
    suggestion: Option<String>,
}

#[derive(Deserialize)]
struct LaunchResponse {
    instance_ids: Vec<String>,
}

#[derive(Serialize)]
struct TerminateRequest<'a> {
    instance_ids: &'a [String],
}

#[derive(Deserialize)]
struct TerminateResponse {
    #[serde(default)]
    terminated_instances: Vec<Instance>,
}

pub struct Client {
    http: reqwest::Client,
    base_url: String,
    authorization: String,
}

impl Client {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        if api_key.is_empty() {
            anyhow::bail!("API key is empty");
        }
        let http = reqwest::Client::builder()
            .user_agent(concat!("lambdactl/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            http,
            base_url,
            authorization: format!("Basic {}", STANDARD.encode(format!("{api_key}:"))),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!(path, "GET");
        let request = self
            .http
            .get(self.url(path))
            .header("Authorization", &self.authorization)
            .header("Accept", "application/json");
        Self::send(request, path).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        debug!(path, "POST");
        let request = self
            .http
            .post(self.url(path))
            .header("Authorization", &self.authorization)
            .header("Accept", "application/json")
            .json(body);
        Self::send(request, path).await
    }

    async fn send<T: DeserializeOwned>(request: reqwest::RequestBuilder, path: &str) -> Result<T> {
        let response = request
            .send()
            .await
            .with_context(|| format!("Request to '{path}' failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("{}", describe_failure(path, status, &body));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .with_context(|| format!("Failed to decode response from '{path}'"))?;
        Ok(envelope.data)
    }

    /// Every offer with capacity, one title per region.
    pub async fn availability(&self) -> Result<BTreeMap<Title, InstanceQuote>> {
        let types: HashMap<String, InstanceTypesItem> = self.get("instance-types").await?;
        Ok(offers(types.into_values()))
    }
}

/// Expand instance types into one offer per region with capacity.
pub fn offers<I>(types: I) -> BTreeMap<Title, InstanceQuote>
where
    I: IntoIterator<Item = InstanceTypesItem>,
{
    let mut offers = BTreeMap::new();
    for item in types {
        for region in &item.regions_with_capacity_available {
            let title = Title::new(region.name, item.instance_type.name.clone());
            offers.insert(title, item.instance_type.clone());
        }
    }
    offers
}

fn describe_failure(path: &str, status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope { error }) => {
            let mut message = format!(
                "API request '{path}' failed with status {status}: {} ({})",
                error.message, error.code
            );
            if let Some(suggestion) = error.suggestion.filter(|s| !s.is_empty()) {
                message.push_str(&format!("; {suggestion}"));
            }
            message
        }
        Err(_) => format!("API request '{path}' failed with status {status}: {body}"),
    }
}

#[async_trait]
impl InstanceApi for Client {
    async fn instances(&self) -> Result<Vec<Instance>> {
        self.get("instances").await
    }

    async fn launch(&self, request: &LaunchRequest) -> Result<Vec<String>> {
        let response: LaunchResponse = self.post("instance-operations/launch", request).await?;
        Ok(response.instance_ids)
    }

    async fn terminate(&self, ids: &[String]) -> Result<()> {
        let response: TerminateResponse = self
            .post(
                "instance-operations/terminate",
                &TerminateRequest { instance_ids: ids },
            )
            .await?;
        debug!(count = response.terminated_instances.len(), "terminated");
        Ok(())
    }
}

#[async_trait]
impl SshKeyCatalog for Client {
    async fn ssh_keys(&self) -> Result<KeyCatalog> {
        let keys: Vec<SshKey> = self.get("ssh-keys").await?;
        let catalog = KeyCatalog::from_keys(keys);
        for error in &catalog.errors {
            warn!("{}", error);
        }
        Ok(catalog)
    }
}
