//! The backend contract the UI components are written against.

use async_trait::async_trait;
use mammoscan_common::{AnalysisResponse, HealthResponse, ModelInfoResponse, UploadResponse};

use crate::error::ApiResult;

/// An image ready to be submitted as multipart form data.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { filename: filename.into(), content_type: content_type.into(), bytes }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// One method per backend operation.
#[async_trait]
pub trait ImagingApi: Send + Sync {
    /// `GET /health`
    async fn check_health(&self) -> ApiResult<HealthResponse>;

    /// `GET /health/detailed`
    async fn check_detailed_health(&self) -> ApiResult<HealthResponse>;

    /// `POST /upload`, multipart field `file`.
    async fn upload_image(&self, file: ImageFile) -> ApiResult<UploadResponse>;

    /// `GET /upload/{study_id}`
    async fn get_upload_status(&self, study_id: &str) -> ApiResult<UploadResponse>;

    /// `POST /inference/{study_id}`
    async fn analyze_image(&self, study_id: &str) -> ApiResult<AnalysisResponse>;

    /// `GET /inference/{study_id}`
    async fn get_analysis_result(&self, study_id: &str) -> ApiResult<AnalysisResponse>;

    /// `GET /inference/model/info`
    async fn get_model_info(&self) -> ApiResult<ModelInfoResponse>;
}
