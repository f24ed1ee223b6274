//! reqwest-backed implementation of [`ImagingApi`].

use std::time::Duration;

use async_trait::async_trait;
use mammoscan_common::{AnalysisResponse, HealthResponse, ModelInfoResponse, UploadResponse};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use crate::api::{ImageFile, ImagingApi};
use crate::error::{ApiError, ApiResult};

pub const DEFAULT_ORIGIN: &str = "http://localhost:8000";
pub const DEFAULT_BASE_PATH: &str = "/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Absolute URL every endpoint path is appended to.
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: resolve_base_url(DEFAULT_ORIGIN, DEFAULT_BASE_PATH, None),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Combine origin and base path, honouring an override.
///
/// An absolute override replaces both; anything else replaces only the path.
pub fn resolve_base_url(origin: &str, base_path: &str, override_url: Option<&str>) -> String {
    let origin = origin.trim_end_matches('/');
    let join = |path: &str| {
        if path.starts_with('/') {
            format!("{}{}", origin, path)
        } else {
            format!("{}/{}", origin, path)
        }
    };

    match override_url.map(str::trim).filter(|s| !s.is_empty()) {
        Some(url) if url.starts_with("http://") || url.starts_with("https://") => url.to_string(),
        Some(path) => join(path),
        None => join(base_path),
    }
}

/// HTTP client for the imaging backend.
#[derive(Debug, Clone)]
pub struct HttpImagingClient {
    base_url: Url,
    client: Client,
}

impl HttpImagingClient {
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ApiError::Config(format!("bad base URL {:?}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Config(format!("{} cannot be used as a base URL", base_url)));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Append path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Config(format!("{} cannot be used as a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send_json<T: DeserializeOwned>(&self, op: &'static str, request: RequestBuilder) -> ApiResult<T> {
        let resp = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                let err = ApiError::from_transport(e);
                warn!(op, error = ?err, "request failed without a response");
                return Err(err);
            }
        };

        let status = resp.status();
        if !status.is_success() {
            let body = resp.bytes().await.unwrap_or_default();
            let err = ApiError::from_status(status.as_u16(), &body);
            warn!(op, status = status.as_u16(), message = %err, "server returned an error");
            return Err(err);
        }

        resp.json::<T>().await.map_err(|e| {
            let err = ApiError::from_transport(e);
            warn!(op, error = ?err, "could not read response body");
            err
        })
    }
}

#[async_trait]
impl ImagingApi for HttpImagingClient {
    #[instrument(skip(self))]
    async fn check_health(&self) -> ApiResult<HealthResponse> {
        let url = self.endpoint(&["health"])?;
        debug!(%url, "health check");
        self.send_json("check_health", self.client.get(url)).await
    }

    #[instrument(skip(self))]
    async fn check_detailed_health(&self) -> ApiResult<HealthResponse> {
        let url = self.endpoint(&["health", "detailed"])?;
        debug!(%url, "detailed health check");
        self.send_json("check_detailed_health", self.client.get(url)).await
    }

    #[instrument(skip(self, file), fields(filename = %file.filename, size = file.size()))]
    async fn upload_image(&self, file: ImageFile) -> ApiResult<UploadResponse> {
        let url = self.endpoint(&["upload"])?;
        debug!(%url, content_type = %file.content_type, "uploading image");

        let part = reqwest::multipart::Part::bytes(file.bytes)
            .file_name(file.filename)
            .mime_str(&file.content_type)
            .map_err(|e| ApiError::Unexpected(format!("invalid content type: {}", e)))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp: UploadResponse = self.send_json("upload_image", self.client.post(url).multipart(form)).await?;
        info!(study_id = %resp.study_id, "image uploaded");
        Ok(resp)
    }

    #[instrument(skip(self))]
    async fn get_upload_status(&self, study_id: &str) -> ApiResult<UploadResponse> {
        let url = self.endpoint(&["upload", study_id])?;
        debug!(%url, "upload status");
        self.send_json("get_upload_status", self.client.get(url)).await
    }

    #[instrument(skip(self))]
    async fn analyze_image(&self, study_id: &str) -> ApiResult<AnalysisResponse> {
        let url = self.endpoint(&["inference", study_id])?;
        debug!(%url, "starting analysis");
        let resp: AnalysisResponse = self.send_json("analyze_image", self.client.post(url)).await?;
        info!(study_id, status = %resp.status, "analysis request finished");
        Ok(resp)
    }

    #[instrument(skip(self))]
    async fn get_analysis_result(&self, study_id: &str) -> ApiResult<AnalysisResponse> {
        let url = self.endpoint(&["inference", study_id])?;
        debug!(%url, "fetching analysis");
        self.send_json("get_analysis_result", self.client.get(url)).await
    }

    #[instrument(skip(self))]
    async fn get_model_info(&self) -> ApiResult<ModelInfoResponse> {
        let url = self.endpoint(&["inference", "model", "info"])?;
        debug!(%url, "model info");
        self.send_json("get_model_info", self.client.get(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_base_url() {
        assert_eq!(resolve_base_url(DEFAULT_ORIGIN, DEFAULT_BASE_PATH, None), "http://localhost:8000/api");
        assert_eq!(ClientConfig::default().timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_absolute_override_replaces_everything() {
        assert_eq!(
            resolve_base_url("http://localhost:8000", "/api", Some("https://imaging.example.org/v2")),
            "https://imaging.example.org/v2"
        );
    }

    #[test]
    fn test_relative_override_replaces_path() {
        assert_eq!(resolve_base_url("http://localhost:8000/", "/api", Some("/backend")), "http://localhost:8000/backend");
        assert_eq!(resolve_base_url("http://localhost:8000", "/api", Some("svc")), "http://localhost:8000/svc");
        assert_eq!(resolve_base_url("http://localhost:8000", "/api", Some("  ")), "http://localhost:8000/api");
    }

    #[test]
    fn test_endpoint_joins_and_encodes_segments() {
        let client = HttpImagingClient::new(&ClientConfig {
            base_url: "http://localhost:8000/api/".into(),
            timeout: Duration::from_secs(1),
        }).unwrap();
        assert_eq!(
            client.endpoint(&["inference", "model", "info"]).unwrap().as_str(),
            "http://localhost:8000/api/inference/model/info"
        );
        assert_eq!(
            client.endpoint(&["upload", "a b/c"]).unwrap().as_str(),
            "http://localhost:8000/api/upload/a%20b%2Fc"
        );
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let err = HttpImagingClient::new(&ClientConfig {
            base_url: "/api".into(),
            timeout: Duration::from_secs(1),
        }).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }
}
