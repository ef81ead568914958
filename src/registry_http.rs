//! HTTP registry client
//!
//! [`RegistryClient`] implementation backed by an HTTP package registry.
//! Missing packages and versions surface as empty results or `None`, never
//! as errors; HTTP 405 and 501 on the dependency-info endpoint surface as
//! [`Error::UnsupportedOperation`] so the session degrades the registry to
//! plain version queries instead of retrying.

use crate::config::RegistrySource;
use crate::reference::{PackageId, PackageIdentity};
use crate::registry::{DependencyGroup, PackageMetadata, RegistryClient};
use crate::version::parse_lenient;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use semver::Version;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

pub struct HttpRegistryClient {
    name: String,
    base_url: String,
    client: reqwest::Client,
    api_token: Option<String>,
}

impl HttpRegistryClient {
    pub fn new(
        name: impl Into<String>,
        base_url: &str,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let name = name.into();
        let parsed = Url::parse(base_url)
            .map_err(|e| Error::InvalidRegistryUrl(base_url.to_string(), e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidRegistryUrl(
                base_url.to_string(),
                format!("unsupported scheme '{}'", parsed.scheme()),
            ));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            name,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            api_token,
        })
    }

    pub fn from_source(source: &RegistrySource, timeout: Duration) -> Result<Self> {
        Self::new(
            source.name.clone(),
            &source.url,
            source.token.clone(),
            timeout,
        )
    }

    /// Format authorization header based on token type
    /// API tokens (starting with "dpm_") use "Token <token>" format
    /// JWT tokens use "Bearer <token>" format
    fn format_auth_header(token: &str) -> String {
        if token.starts_with("dpm_") {
            format!("Token {}", token)
        } else {
            format!("Bearer {}", token)
        }
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let mut request = self.client.get(url);
        if let Some(token) = &self.api_token {
            request = request.header("Authorization", Self::format_auth_header(token));
        }
        Ok(request.send().await?)
    }

    fn status_error(&self, status: StatusCode, operation: &str) -> Error {
        match status.as_u16() {
            405 | 501 => Error::UnsupportedOperation {
                registry: self.name.clone(),
                operation: operation.to_string(),
            },
            code => Error::Other(format!("{}: {} failed with HTTP {}", self.name, operation, code)),
        }
    }

    async fn fetch_versions(&self, url: &str, operation: &str) -> Result<Vec<Version>> {
        let response = self.get(url).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(self.status_error(status, operation));
        }

        let body: ApiPackageResponse = response.json().await?;
        Ok(parse_versions(&self.name, body.versions))
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_versions(&self, id: &PackageId) -> Result<Vec<Version>> {
        let url = format!("{}/api/v1/packages/{}", self.base_url, id);
        self.fetch_versions(&url, "version list").await
    }

    async fn dependency_info_versions(&self, id: &PackageId) -> Result<Vec<Version>> {
        let url = format!("{}/api/v1/packages/{}/dependency-info", self.base_url, id);
        self.fetch_versions(&url, "dependency info").await
    }

    async fn metadata(&self, identity: &PackageIdentity) -> Result<Option<PackageMetadata>> {
        let url = format!(
            "{}/api/v1/packages/{}/{}",
            self.base_url, identity.id, identity.version
        );

        let response = self.get(&url).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(self.status_error(status, "metadata"));
        }

        Ok(Some(response.json().await?))
    }

    async fn dependency_groups(&self, identity: &PackageIdentity) -> Result<Vec<DependencyGroup>> {
        let url = format!(
            "{}/api/v1/packages/{}/{}/dependencies",
            self.base_url, identity.id, identity.version
        );

        let response = self.get(&url).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(self.status_error(status, "dependency groups"));
        }

        let body: ApiDependenciesResponse = response.json().await?;
        Ok(body.groups)
    }
}

/// Parse registry version strings leniently; entries that still fail to
/// parse are skipped rather than failing the whole catalog.
fn parse_versions(registry: &str, entries: Vec<ApiVersionEntry>) -> Vec<Version> {
    entries
        .into_iter()
        .filter(|entry| entry.listed)
        .filter_map(|entry| match parse_lenient(&entry.version) {
            Ok(version) => Some(version),
            Err(_) => {
                tracing::debug!(registry, version = %entry.version, "skipping unparseable version");
                None
            }
        })
        .collect()
}

// API response structures
#[derive(Debug, Deserialize)]
struct ApiPackageResponse {
    #[serde(default)]
    versions: Vec<ApiVersionEntry>,
}

#[derive(Debug, Deserialize)]
struct ApiVersionEntry {
    version: String,
    #[serde(default = "default_listed")]
    listed: bool,
}

fn default_listed() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct ApiDependenciesResponse {
    #[serde(default)]
    groups: Vec<DependencyGroup>,
}
