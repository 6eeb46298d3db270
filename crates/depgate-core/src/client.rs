//! Remote validation service client.
//!
//! The engine only sees the [`ValidationClient`] trait; [`HttpValidationClient`]
//! is the JSON-over-HTTP implementation used by the CLI.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::credentials::CredentialProvider;
use crate::error::TransportError;
use crate::types::{DependencyKey, DependencyRecord, Observation};

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api/v1";

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

/// Body of a `request` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyRequest {
    pub package_name: String,
    pub package_manager: String,
    pub package_version: String,
    pub project_name: String,
}

impl DependencyRequest {
    pub fn new(obs: &Observation, project: &str) -> Self {
        Self {
            package_name: obs.name.clone(),
            package_manager: obs.ecosystem.clone(),
            package_version: obs.version.clone(),
            project_name: project.to_string(),
        }
    }

    /// Request for a tracked dependency, using its latest version.
    pub fn for_record(rec: &DependencyRecord, project: &str) -> Self {
        Self {
            package_name: rec.key.name().to_string(),
            package_manager: rec.key.ecosystem().to_string(),
            package_version: rec.version.clone(),
            project_name: project.to_string(),
        }
    }

    pub fn key(&self) -> DependencyKey {
        DependencyKey::new(self.package_name.clone(), self.package_manager.clone())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckBody<'a> {
    package_name: &'a str,
    package_manager: &'a str,
}

/// One entry of an initial-scan bulk submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageInfo {
    pub package_name: String,
    pub package_version: String,
    pub package_manager: String,
    pub project_name: String,
}

impl PackageInfo {
    pub fn new(obs: &Observation, project: &str) -> Self {
        Self {
            package_name: obs.name.clone(),
            package_version: obs.version.clone(),
            package_manager: obs.ecosystem.clone(),
            project_name: project.to_string(),
        }
    }

    pub fn key(&self) -> DependencyKey {
        DependencyKey::new(self.package_name.clone(), self.package_manager.clone())
    }
}

#[derive(Debug, Serialize)]
struct QueueBody<'a> {
    packages: &'a [PackageInfo],
}

/// The machine and user an inventory report comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeveloperInfo {
    pub username: String,
    pub hostname: String,
    pub os: String,
    pub project_name: String,
    pub tool_version: String,
}

/// Body of a `report_inventory` call: every dependency the project declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryReport {
    pub dependencies: Vec<PackageInfo>,
    pub developer: DeveloperInfo,
}

/// Raw decision payload returned by `request` and `check`.
///
/// Every field is optional; see [`crate::classifier::classify`] for how the
/// combination is interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub approved: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

impl DecisionResponse {
    pub fn with_status(status: &str) -> Self {
        Self {
            status: Some(status.to_string()),
            ..Default::default()
        }
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }
}

// ---------------------------------------------------------------------------
// ValidationClient
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ValidationClient: Send + Sync {
    /// Ask the service to validate a newly observed dependency.
    async fn request(&self, req: &DependencyRequest) -> Result<DecisionResponse, TransportError>;

    /// Poll the current decision for a dependency.
    async fn check(&self, key: &DependencyKey) -> Result<DecisionResponse, TransportError>;

    /// Submit a batch of already-present packages for review.
    async fn queue(&self, packages: &[PackageInfo]) -> Result<(), TransportError>;

    /// Report the full dependency inventory of a project.
    async fn report_inventory(&self, report: &InventoryReport) -> Result<(), TransportError>;

    /// Succeeds when the service answers its health endpoint with a 2xx.
    async fn health(&self) -> Result<(), TransportError>;
}

// ---------------------------------------------------------------------------
// HttpValidationClient
// ---------------------------------------------------------------------------

pub struct HttpValidationClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpValidationClient {
    /// Build a client with finite connect and overall timeouts so a hung
    /// call cannot pin a worker.
    pub fn new(
        base_url: &str,
        credentials: Arc<dyn CredentialProvider>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| TransportError::Other(format!("failed to build HTTP client: {e}")))?;
        let base = if base_url.trim().is_empty() {
            DEFAULT_API_URL
        } else {
            base_url.trim()
        };
        Ok(Self {
            http,
            base_url: base.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn token(&self) -> Result<String, TransportError> {
        self.credentials
            .credential()
            .ok_or_else(|| TransportError::Other("no credential configured".into()))
    }

    /// Send with bearer auth; non-2xx statuses become [`TransportError::Status`].
    async fn send(&self, req: reqwest::RequestBuilder) -> Result<String, TransportError> {
        let resp = req.bearer_auth(self.token()?).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<String, TransportError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "POST");
        self.send(self.http.post(&url).json(body)).await
    }

    async fn post_decision<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<DecisionResponse, TransportError> {
        let text = self.post(path, body).await?;
        if text.trim().is_empty() {
            return Ok(DecisionResponse::default());
        }
        serde_json::from_str(&text).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ValidationClient for HttpValidationClient {
    async fn request(&self, req: &DependencyRequest) -> Result<DecisionResponse, TransportError> {
        self.post_decision("/dependencies/request", req).await
    }

    async fn check(&self, key: &DependencyKey) -> Result<DecisionResponse, TransportError> {
        let body = CheckBody {
            package_name: key.name(),
            package_manager: key.ecosystem(),
        };
        self.post_decision("/dependencies/check", &body).await
    }

    async fn queue(&self, packages: &[PackageInfo]) -> Result<(), TransportError> {
        self.post("/dependencies/queue", &QueueBody { packages })
            .await
            .map(|_| ())
    }

    async fn report_inventory(&self, report: &InventoryReport) -> Result<(), TransportError> {
        self.post("/dependencies/inventory", report)
            .await
            .map(|_| ())
    }

    async fn health(&self) -> Result<(), TransportError> {
        let url = format!("{}/health", self.base_url);
        tracing::debug!(url = %url, "GET");
        self.send(self.http.get(&url)).await.map(|_| ())
    }
}
