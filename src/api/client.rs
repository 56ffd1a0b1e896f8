//! HTTP client for the digital twin platform's ontology API.

use crate::ontology::{ClassInfo, OntologySource, SourceError};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000/api/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("API returned status: {0}")]
    Status(StatusCode),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("failed to parse response: {0}")]
    Decode(#[source] reqwest::Error),
}

pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                Client::new()
            });

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let req = self.client.get(format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn fetch_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        tracing::debug!(path, "GET");
        let resp = self.get(path).send().map_err(ApiError::Request)?;

        match resp.status() {
            s if s.is_success() => resp.json().map_err(ApiError::Decode),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(path.to_string())),
            s => Err(ApiError::Status(s)),
        }
    }

    pub fn fetch_root_classes(&self) -> Result<Vec<String>, ApiError> {
        self.fetch_json("/digital-twins/ontology/root-classes")
    }

    /// All class names, sorted
    pub fn fetch_classes(&self) -> Result<Vec<String>, ApiError> {
        let mut classes: Vec<String> = self.fetch_json("/digital-twins/ontology/classes")?;
        classes.sort();
        Ok(classes)
    }

    pub fn fetch_class(&self, class_name: &str) -> Result<ClassInfo, ApiError> {
        let path = format!("/digital-twins/ontology/class/{}", urlencoding::encode(class_name));
        let mut info: ClassInfo = self.fetch_json(&path)?;
        if info.name.is_empty() {
            info.name = class_name.to_string();
        }
        Ok(info)
    }
}

impl OntologySource for ApiClient {
    fn root_classes(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.fetch_root_classes()?)
    }

    fn all_classes(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.fetch_classes()?)
    }

    fn class_info(&self, name: &str) -> Result<ClassInfo, SourceError> {
        Ok(self.fetch_class(name)?)
    }

    fn describe(&self) -> String {
        format!("API {}", self.base_url())
    }
}
