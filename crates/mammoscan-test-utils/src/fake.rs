//! Scriptable in-memory [`ImagingApi`].
//!
//! Each operation pops the next scripted answer; calls are recorded in order.
//! `hold()` makes upload and analyze block until `release()` so tests can
//! observe components mid-request.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mammoscan_client::{ApiError, ApiResult, ImageFile, ImagingApi};
use mammoscan_common::{
    AnalysisResponse, HealthResponse, ModelInfo, ModelInfoResponse, Region, UploadResponse,
};
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CheckHealth,
    CheckDetailedHealth,
    Upload { filename: String, content_type: String, size: u64 },
    UploadStatus(String),
    Analyze(String),
    GetResult(String),
    ModelInfo,
}

#[derive(Default)]
pub struct FakeApi {
    health: Mutex<VecDeque<ApiResult<HealthResponse>>>,
    uploads: Mutex<VecDeque<ApiResult<UploadResponse>>>,
    analyses: Mutex<VecDeque<ApiResult<AnalysisResponse>>>,
    results: Mutex<VecDeque<ApiResult<AnalysisResponse>>>,
    calls: Mutex<Vec<Call>>,
    held: AtomicBool,
    entered: Notify,
    released: Notify,
}

fn unscripted(op: &str) -> ApiError {
    ApiError::Unexpected(format!("no scripted response for {}", op))
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_health(&self, r: ApiResult<HealthResponse>) {
        self.health.lock().unwrap().push_back(r);
    }

    pub fn push_upload(&self, r: ApiResult<UploadResponse>) {
        self.uploads.lock().unwrap().push_back(r);
    }

    pub fn push_analysis(&self, r: ApiResult<AnalysisResponse>) {
        self.analyses.lock().unwrap().push_back(r);
    }

    /// Scripted answers for `get_analysis_result`; defaults to `pending`.
    pub fn push_existing(&self, r: ApiResult<AnalysisResponse>) {
        self.results.lock().unwrap().push_back(r);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub fn uploads(&self) -> usize {
        self.count(|c| matches!(c, Call::Upload { .. }))
    }

    pub fn analyses(&self) -> usize {
        self.count(|c| matches!(c, Call::Analyze(_)))
    }

    /// Block upload/analyze calls until [`release`](Self::release).
    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    /// Wait until a held call has started.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let one held call finish and stop holding new ones.
    pub fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
        self.released.notify_one();
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    async fn gate(&self) {
        if self.held.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.released.notified().await;
        }
    }
}

#[async_trait]
impl ImagingApi for FakeApi {
    async fn check_health(&self) -> ApiResult<HealthResponse> {
        self.record(Call::CheckHealth);
        self.health.lock().unwrap().pop_front().unwrap_or_else(|| Err(unscripted("check_health")))
    }

    async fn check_detailed_health(&self) -> ApiResult<HealthResponse> {
        self.record(Call::CheckDetailedHealth);
        self.health.lock().unwrap().pop_front().unwrap_or_else(|| Err(unscripted("check_detailed_health")))
    }

    async fn upload_image(&self, file: ImageFile) -> ApiResult<UploadResponse> {
        self.record(Call::Upload {
            filename: file.filename.clone(),
            content_type: file.content_type.clone(),
            size: file.size(),
        });
        self.gate().await;
        self.uploads.lock().unwrap().pop_front().unwrap_or_else(|| Err(unscripted("upload_image")))
    }

    async fn get_upload_status(&self, study_id: &str) -> ApiResult<UploadResponse> {
        self.record(Call::UploadStatus(study_id.to_string()));
        Ok(uploaded(study_id))
    }

    async fn analyze_image(&self, study_id: &str) -> ApiResult<AnalysisResponse> {
        self.record(Call::Analyze(study_id.to_string()));
        self.gate().await;
        self.analyses.lock().unwrap().pop_front().unwrap_or_else(|| Err(unscripted("analyze_image")))
    }

    async fn get_analysis_result(&self, study_id: &str) -> ApiResult<AnalysisResponse> {
        self.record(Call::GetResult(study_id.to_string()));
        self.results.lock().unwrap().pop_front().unwrap_or_else(|| Ok(pending(study_id)))
    }

    async fn get_model_info(&self) -> ApiResult<ModelInfoResponse> {
        self.record(Call::ModelInfo);
        Ok(ModelInfoResponse {
            model_info: ModelInfo {
                model_version: "mock-v1.0".into(),
                model_type: "mock_classifier".into(),
                supported_formats: vec!["PNG".into(), "JPEG".into(), "DICOM".into()],
                lesion_types: vec!["mass".into(), "calcification".into()],
                description: "Mock mammography classifier".into(),
            },
            status: "available".into(),
        })
    }
}

// ── Canned bodies ─────────────────────────────────────────────────────────────

pub fn uploaded(study_id: &str) -> UploadResponse {
    UploadResponse {
        study_id: study_id.to_string(),
        status: "uploaded".into(),
        filename: Some("scan.png".into()),
        file_size: Some(4),
        content_type: Some("image/png".into()),
        upload_time: Some("2024-05-01T10:00:00".into()),
        message: Some("File uploaded successfully. Use study_id for AI analysis.".into()),
        has_analysis: Some(false),
    }
}

pub fn pending(study_id: &str) -> AnalysisResponse {
    AnalysisResponse {
        study_id: Some(study_id.to_string()),
        status: "pending".into(),
        message: Some("Analysis not yet performed. Use POST to start analysis.".into()),
        ..Default::default()
    }
}

/// A flat completed analysis with one mass region.
pub fn completed(study_id: &str) -> AnalysisResponse {
    AnalysisResponse {
        study_id: Some(study_id.to_string()),
        status: "completed".into(),
        prediction: Some("suspicious".into()),
        confidence: Some(0.87),
        processing_time: Some(1.2),
        regions: Some(vec![Region {
            id: Some("r1".into()),
            x: 120.0,
            y: 340.0,
            width: 48.0,
            height: 52.0,
            confidence: 0.81,
            kind: "mass".into(),
            severity: Some("moderate".into()),
            description: None,
        }]),
        model_version: Some("mock-v1.0".into()),
        analysis_date: Some("2024-05-01T10:00:05".into()),
        image_quality: Some("good".into()),
        ..Default::default()
    }
}

pub fn healthy() -> HealthResponse {
    HealthResponse {
        status: "healthy".into(),
        service: "AI Medical Imaging - Starter Kit".into(),
        version: "1.0.0".into(),
        components: None,
        ai_model_info: None,
    }
}
