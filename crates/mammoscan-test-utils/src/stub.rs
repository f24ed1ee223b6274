//! In-process stand-in for the imaging backend.
//!
//! Serves the `/api` endpoint table on `127.0.0.1:0` with the same bodies
//! the real service produces (analysis nested under `analysis`), and counts
//! every hit so tests can assert how many requests a component issued.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tracing::debug;

const SERVICE: &str = "AI Medical Imaging - Starter Kit";
const VERSION: &str = "1.0.0";
const SUPPORTED_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/jpg", "application/dicom"];

/// How `POST /inference/{id}` answers.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyzeBehaviour {
    /// Run the mock classifier and report `completed`.
    Complete,
    /// Answer 500 with `{"detail": msg}`.
    Fail(String),
    /// Answer 200 with the given status and a message, no analysis.
    Status(String),
}

#[derive(Debug, Clone)]
pub struct StubOptions {
    pub analyze: AnalyzeBehaviour,
    /// When false, both health endpoints answer 503.
    pub healthy: bool,
    pub analysis_delay: Duration,
}

impl Default for StubOptions {
    fn default() -> Self {
        Self {
            analyze: AnalyzeBehaviour::Complete,
            healthy: true,
            analysis_delay: Duration::ZERO,
        }
    }
}

/// What the stub saw in the last multipart upload.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedUpload {
    pub field_name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub size: usize,
}

#[derive(Debug, Clone)]
struct StoredStudy {
    filename: String,
    content_type: String,
    file_size: usize,
    created_at: String,
    analysis: Option<Value>,
}

#[derive(Default)]
struct Inner {
    studies: HashMap<String, StoredStudy>,
    hits: HashMap<&'static str, usize>,
    last_upload: Option<ReceivedUpload>,
}

#[derive(Clone)]
struct StubState {
    options: Arc<Mutex<StubOptions>>,
    inner: Arc<Mutex<Inner>>,
}

impl StubState {
    fn hit(&self, op: &'static str) {
        let mut inner = self.inner.lock().unwrap();
        *inner.hits.entry(op).or_insert(0) += 1;
    }

    fn options(&self) -> StubOptions {
        self.options.lock().unwrap().clone()
    }
}

type StubError = (StatusCode, Json<Value>);

fn detail(status: StatusCode, msg: &str) -> StubError {
    (status, Json(json!({ "detail": msg })))
}

/// Deterministic stand-in for the mock classifier.
pub fn mock_analysis() -> Value {
    json!({
        "prediction": "suspicious",
        "confidence": 0.87,
        "processing_time": 1.2,
        "regions": [{
            "id": "r1",
            "x": 120.0,
            "y": 340.0,
            "width": 48.0,
            "height": 52.0,
            "confidence": 0.81,
            "type": "mass",
            "severity": "moderate",
            "description": "Irregular mass in upper outer quadrant"
        }],
        "metadata": {
            "model_version": "mock-v1.0",
            "image_quality": "good",
            "processing_date": chrono::Utc::now().to_rfc3339()
        }
    })
}

fn model_info() -> Value {
    json!({
        "model_version": "mock-v1.0",
        "model_type": "mock_classifier",
        "supported_formats": ["PNG", "JPEG", "DICOM"],
        "lesion_types": ["mass", "calcification", "architectural_distortion"],
        "description": "Mock mammography classifier for demonstration"
    })
}

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn health(State(state): State<StubState>) -> Result<Json<Value>, StubError> {
    state.hit("health");
    if !state.options().healthy {
        return Err(detail(StatusCode::SERVICE_UNAVAILABLE, "Service unavailable"));
    }
    Ok(Json(json!({ "status": "healthy", "service": SERVICE, "version": VERSION })))
}

async fn health_detailed(State(state): State<StubState>) -> Result<Json<Value>, StubError> {
    state.hit("health_detailed");
    if !state.options().healthy {
        return Err(detail(StatusCode::SERVICE_UNAVAILABLE, "Service unavailable"));
    }
    Ok(Json(json!({
        "status": "healthy",
        "components": { "database": "healthy", "ai_model": "healthy" },
        "ai_model_info": model_info(),
        "service": SERVICE,
        "version": VERSION
    })))
}

async fn upload(State(state): State<StubState>, mut multipart: Multipart) -> Result<Json<Value>, StubError> {
    state.hit("upload");

    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| detail(StatusCode::BAD_REQUEST, &e.to_string()))?
    {
        let received = ReceivedUpload {
            field_name: field.name().unwrap_or_default().to_string(),
            filename: field.file_name().map(String::from),
            content_type: field.content_type().map(String::from),
            size: 0,
        };
        let bytes = field.bytes().await.map_err(|e| detail(StatusCode::BAD_REQUEST, &e.to_string()))?;
        let received = ReceivedUpload { size: bytes.len(), ..received };
        state.inner.lock().unwrap().last_upload = Some(received.clone());
        if received.field_name == "file" {
            file = Some(received);
        }
    }

    let Some(file) = file else {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": [{ "loc": ["body", "file"], "msg": "field required" }] })),
        ));
    };

    let content_type = file.content_type.clone().unwrap_or_default();
    if !SUPPORTED_TYPES.contains(&content_type.as_str()) {
        return Err(detail(
            StatusCode::BAD_REQUEST,
            &format!("Unsupported file type. Supported types: {:?}", SUPPORTED_TYPES),
        ));
    }

    let study_id = uuid::Uuid::new_v4().to_string();
    let filename = file.filename.clone().unwrap_or_default();
    let now = chrono::Utc::now().to_rfc3339();
    state.inner.lock().unwrap().studies.insert(study_id.clone(), StoredStudy {
        filename: filename.clone(),
        content_type: content_type.clone(),
        file_size: file.size,
        created_at: now.clone(),
        analysis: None,
    });
    debug!(%study_id, "stub stored upload");

    Ok(Json(json!({
        "study_id": study_id,
        "filename": filename,
        "file_size": file.size,
        "content_type": content_type,
        "upload_time": now,
        "status": "uploaded",
        "message": "File uploaded successfully. Use study_id for AI analysis."
    })))
}

async fn upload_status(State(state): State<StubState>, Path(study_id): Path<String>) -> Result<Json<Value>, StubError> {
    state.hit("upload_status");
    let inner = state.inner.lock().unwrap();
    let study = inner.studies.get(&study_id).ok_or_else(|| detail(StatusCode::NOT_FOUND, "Study not found"))?;
    Ok(Json(json!({
        "study_id": study_id,
        "status": "uploaded",
        "filename": study.filename,
        "content_type": study.content_type,
        "file_size": study.file_size,
        "upload_time": study.created_at,
        "has_analysis": study.analysis.is_some()
    })))
}

async fn analyze(State(state): State<StubState>, Path(study_id): Path<String>) -> Result<Json<Value>, StubError> {
    state.hit("analyze");
    let options = state.options();
    if !state.inner.lock().unwrap().studies.contains_key(&study_id) {
        return Err(detail(StatusCode::NOT_FOUND, "Study not found"));
    }
    if !options.analysis_delay.is_zero() {
        tokio::time::sleep(options.analysis_delay).await;
    }

    match options.analyze {
        AnalyzeBehaviour::Complete => {
            let analysis = mock_analysis();
            if let Some(study) = state.inner.lock().unwrap().studies.get_mut(&study_id) {
                study.analysis = Some(analysis.clone());
            }
            Ok(Json(json!({
                "study_id": study_id,
                "status": "completed",
                "analysis": analysis,
                "message": "AI analysis completed successfully"
            })))
        }
        AnalyzeBehaviour::Fail(msg) => Err(detail(StatusCode::INTERNAL_SERVER_ERROR, &msg)),
        AnalyzeBehaviour::Status(status) => Ok(Json(json!({
            "study_id": study_id,
            "status": status,
            "message": "Analysis is still queued"
        }))),
    }
}

async fn analysis_result(State(state): State<StubState>, Path(study_id): Path<String>) -> Result<Json<Value>, StubError> {
    state.hit("analysis_result");
    let inner = state.inner.lock().unwrap();
    let study = inner.studies.get(&study_id).ok_or_else(|| detail(StatusCode::NOT_FOUND, "Study not found"))?;
    Ok(Json(match &study.analysis {
        None => json!({
            "study_id": study_id,
            "status": "pending",
            "message": "Analysis not yet performed. Use POST to start analysis."
        }),
        Some(analysis) => json!({
            "study_id": study_id,
            "status": "completed",
            "analysis": analysis
        }),
    }))
}

async fn model_info_handler(State(state): State<StubState>) -> Json<Value> {
    state.hit("model_info");
    Json(json!({ "model_info": model_info(), "status": "available" }))
}

// ── Server ────────────────────────────────────────────────────────────────────

/// A running stub backend. The server task is aborted on drop.
pub struct StubBackend {
    addr: SocketAddr,
    state: StubState,
    handle: JoinHandle<()>,
}

impl StubBackend {
    pub async fn start() -> Self {
        Self::start_with(StubOptions::default()).await
    }

    pub async fn start_with(options: StubOptions) -> Self {
        let state = StubState {
            options: Arc::new(Mutex::new(options)),
            inner: Arc::new(Mutex::new(Inner::default())),
        };

        let api = Router::new()
            .route("/health",               get(health))
            .route("/health/detailed",      get(health_detailed))
            .route("/upload",               post(upload))
            .route("/upload/{study_id}",    get(upload_status))
            .route("/inference/model/info", get(model_info_handler))
            .route("/inference/{study_id}", get(analysis_result).post(analyze))
            .layer(DefaultBodyLimit::max(64 * 1024 * 1024));

        let router = Router::new().nest("/api", api).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub backend");
        let addr = listener.local_addr().expect("stub backend address");
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Self { addr, state, handle }
    }

    /// Base URL including the `/api` prefix.
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Number of requests seen by one endpoint: `health`, `health_detailed`,
    /// `upload`, `upload_status`, `analyze`, `analysis_result`, `model_info`.
    pub fn hits(&self, op: &str) -> usize {
        self.state.inner.lock().unwrap().hits.get(op).copied().unwrap_or(0)
    }

    pub fn last_upload(&self) -> Option<ReceivedUpload> {
        self.state.inner.lock().unwrap().last_upload.clone()
    }

    pub fn set_analyze(&self, behaviour: AnalyzeBehaviour) {
        self.state.options.lock().unwrap().analyze = behaviour;
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.state.options.lock().unwrap().healthy = healthy;
    }

    pub fn study_count(&self) -> usize {
        self.state.inner.lock().unwrap().studies.len()
    }
}

impl Drop for StubBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
