//! HTTP client for the coordination API's lease endpoints

use async_trait::async_trait;
use reqwest::{header, Certificate, Client, RequestBuilder, Response};
use std::time::Duration;
use tracing::debug;

use crate::error::{KubeApiError, Result};
use crate::lease::{Lease, LeasePatch};
use crate::repository::LeaseRepository;

const DEFAULT_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
const DEFAULT_CA_CERT_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";

const PATCH_CONTENT_TYPE: &str = "application/strategic-merge-patch+json";

/// Where and how to reach the API server.
#[derive(Debug, Clone)]
pub struct KubeClientConfig {
    pub api_url: String,
    pub token: Option<String>,
    pub ca_cert_pem: Option<Vec<u8>>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl KubeClientConfig {
    pub fn new(api_url: String, token: String) -> Self {
        KubeClientConfig {
            api_url,
            token: Some(token),
            ca_cert_pem: None,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(15),
        }
    }

    /// Discover the in-cluster environment: API server address from the
    /// `KUBERNETES_SERVICE_*` variables, credentials from the mounted
    /// service account volume.
    pub fn in_cluster() -> Result<Self> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST").map_err(|_| {
            KubeApiError::Config(
                "KUBERNETES_SERVICE_HOST is not set; not running in a cluster".to_string(),
            )
        })?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT_HTTPS")
            .unwrap_or_else(|_| "443".to_string());
        Self::from_files(
            format!("https://{}:{}", host, port),
            DEFAULT_TOKEN_PATH,
            DEFAULT_CA_CERT_PATH,
        )
    }

    /// Build a config against an explicit API server, reading credentials
    /// from files. An empty path skips that credential, which is how a
    /// `kubectl proxy` endpoint is reached without auth.
    pub fn from_files(api_url: String, token_path: &str, ca_cert_path: &str) -> Result<Self> {
        let token = if token_path.is_empty() {
            None
        } else {
            let raw = std::fs::read_to_string(token_path).map_err(|e| {
                KubeApiError::Config(format!("failed to read token from {}: {}", token_path, e))
            })?;
            Some(raw.trim().to_string())
        };

        let ca_cert_pem = if ca_cert_path.is_empty() {
            None
        } else {
            let pem = std::fs::read(ca_cert_path).map_err(|e| {
                KubeApiError::Config(format!(
                    "failed to read CA bundle from {}: {}",
                    ca_cert_path, e
                ))
            })?;
            Some(pem)
        };

        Ok(KubeClientConfig {
            api_url,
            token,
            ca_cert_pem,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(15),
        })
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// [`LeaseRepository`] backed by a real API server.
pub struct KubeLeaseClient {
    http: Client,
    api_url: String,
    token: Option<String>,
}

impl KubeLeaseClient {
    pub fn new(config: KubeClientConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout);

        if let Some(pem) = &config.ca_cert_pem {
            let cert = Certificate::from_pem(pem)
                .map_err(|e| KubeApiError::Config(format!("invalid CA bundle: {}", e)))?;
            builder = builder.add_root_certificate(cert);
        }

        let http = builder
            .build()
            .map_err(|e| KubeApiError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(KubeLeaseClient {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token,
        })
    }

    fn leases_url(&self, namespace: &str) -> String {
        format!(
            "{}/apis/coordination.k8s.io/v1/namespaces/{}/leases",
            self.api_url, namespace
        )
    }

    fn lease_url(&self, name: &str, namespace: &str) -> String {
        format!("{}/{}", self.leases_url(namespace), name)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn ensure_success(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(KubeApiError::from_status(status, body))
        }
    }

    async fn read_lease(response: Response) -> Result<Lease> {
        let response = Self::ensure_success(response).await?;
        response
            .json::<Lease>()
            .await
            .map_err(KubeApiError::from_request)
    }
}

#[async_trait]
impl LeaseRepository for KubeLeaseClient {
    async fn create(&self, lease: &Lease) -> Result<Lease> {
        let url = self.leases_url(&lease.metadata.namespace);
        debug!(url = %url, lease = %lease.metadata.name, "Creating lease");

        let response = self
            .authorize(self.http.post(&url))
            .json(lease)
            .send()
            .await
            .map_err(KubeApiError::from_request)?;
        Self::read_lease(response).await
    }

    async fn get(&self, name: &str, namespace: &str) -> Result<Lease> {
        let url = self.lease_url(name, namespace);
        debug!(url = %url, "Fetching lease");

        let response = self
            .authorize(self.http.get(&url))
            .send()
            .await
            .map_err(KubeApiError::from_request)?;
        Self::read_lease(response).await
    }

    async fn patch(&self, name: &str, namespace: &str, patch: &LeasePatch) -> Result<Lease> {
        let url = self.lease_url(name, namespace);
        debug!(url = %url, "Patching lease");

        let body = serde_json::to_vec(patch).map_err(|e| KubeApiError::Decode(e.to_string()))?;
        let response = self
            .authorize(self.http.patch(&url))
            .header(header::CONTENT_TYPE, PATCH_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(KubeApiError::from_request)?;
        Self::read_lease(response).await
    }

    async fn delete(&self, name: &str, namespace: &str) -> Result<()> {
        let url = self.lease_url(name, namespace);
        debug!(url = %url, "Deleting lease");

        let response = self
            .authorize(self.http.delete(&url))
            .send()
            .await
            .map_err(KubeApiError::from_request)?;
        Self::ensure_success(response).await?;
        Ok(())
    }
}
