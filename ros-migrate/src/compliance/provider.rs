use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::config::ComplianceSettings;

/// Errors from fetching the remote compliance script.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("compliance script {path} not found")]
    NotFound { path: String },
    #[error("invalid compliance URL: {0}")]
    InvalidUrl(String),
    #[error("compliance script is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Source of raw compliance script bytes.
pub trait ScriptProvider: Send + Sync {
    fn fetch_raw(&self, path: &str) -> Result<Vec<u8>, FetchError>;

    fn is_reachable(&self) -> bool;

    /// Short label for logs and reports.
    fn describe(&self) -> String;
}

/// Fetches scripts from a GitLab-style repository over HTTPS.
///
/// Tries the project raw-file API first and falls back to the plain
/// `/-/raw/` URL when the API answers 404.
#[derive(Debug, Clone)]
pub struct HttpScriptProvider {
    client: Client,
    base_url: Url,
    project: String,
    reference: String,
    token: Option<String>,
}

impl HttpScriptProvider {
    pub fn new(
        base_url: &str,
        project: &str,
        reference: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let base_url =
            Url::parse(base_url).map_err(|e| FetchError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(FetchError::InvalidUrl(base_url.to_string()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ros-migrate/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url,
            project: project.to_string(),
            reference: reference.to_string(),
            token,
        })
    }

    pub fn from_settings(settings: &ComplianceSettings) -> Result<Self, FetchError> {
        Self::new(
            &settings.base_url,
            &settings.project,
            &settings.reference,
            settings.token(),
            settings.timeout(),
        )
    }

    /// `/api/v4/projects/{project}/repository/files/{path}/raw?ref={ref}`,
    /// with project and path each encoded as a single segment.
    pub fn api_url(&self, path: &str) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["api", "v4", "projects", self.project.as_str()])
            .extend(["repository", "files", path, "raw"]);
        url.query_pairs_mut().append_pair("ref", &self.reference);
        Ok(url)
    }

    /// `/{project}/-/raw/{ref}/{path}`.
    pub fn raw_url(&self, path: &str) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| FetchError::InvalidUrl(self.base_url.to_string()))?;
            segments.pop_if_empty();
            segments.extend(self.project.split('/').filter(|s| !s.is_empty()));
            segments.extend(["-", "raw", self.reference.as_str()]);
            segments.extend(path.split('/').filter(|s| !s.is_empty()));
        }
        Ok(url)
    }

    fn get(&self, url: Url) -> Result<Option<Vec<u8>>, FetchError> {
        debug!(%url, "fetching compliance script");
        let mut request = self.client.get(url.clone());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send()?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.bytes()?.to_vec())),
            status => Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }),
        }
    }
}

impl ScriptProvider for HttpScriptProvider {
    fn fetch_raw(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        if let Some(body) = self.get(self.api_url(path)?)? {
            info!(path, "fetched compliance script via API");
            return Ok(body);
        }
        if let Some(body) = self.get(self.raw_url(path)?)? {
            info!(path, "fetched compliance script via raw URL");
            return Ok(body);
        }
        Err(FetchError::NotFound {
            path: path.to_string(),
        })
    }

    fn is_reachable(&self) -> bool {
        self.client.head(self.base_url.clone()).send().is_ok()
    }

    fn describe(&self) -> String {
        format!("{} ({}@{})", self.base_url, self.project, self.reference)
    }
}
