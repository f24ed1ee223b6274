//! Top-level app state and the wiring between the upload zone and the
//! results view.
//!
//! Children never touch this state directly. They emit [`UiEvent`]s and the
//! shell applies them in [`App::sync`], which runs after every delegated
//! action.

use std::sync::Arc;

use mammoscan_client::{ImageFile, ImagingApi};
use mammoscan_common::{AnalysisResult, HealthResponse, Study};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::events::{channel, EventReceiver, EventSender, UiEvent};
use crate::results::{AnalysisOutcome, ResultsSnapshot, ResultsView};
use crate::upload::{UploadOutcome, UploadSettings, UploadZone};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppState {
    pub study_id: Option<String>,
    /// Details of the study uploaded in this session, if any.
    pub study: Option<Study>,
    pub result: Option<AnalysisResult>,
    pub error: Option<String>,
    pub loading: bool,
    pub health: Option<HealthResponse>,
}

pub struct App {
    api: Arc<dyn ImagingApi>,
    events: EventSender,
    inbox: EventReceiver,
    upload: UploadZone,
    results: Option<ResultsView>,
    state: AppState,
}

impl App {
    pub fn new(api: Arc<dyn ImagingApi>, settings: UploadSettings) -> Self {
        let (events, inbox) = channel();
        let upload = UploadZone::new(api.clone(), events.clone(), settings);
        Self { api, events, inbox, upload, results: None, state: AppState::default() }
    }

    /// Run the one-time detailed health check.
    pub async fn mount(&mut self) -> &HealthResponse {
        let health = match self.api.check_detailed_health().await {
            Ok(h) => h,
            Err(e) => {
                warn!(error = ?e, "health check failed; reporting backend as unhealthy");
                HealthResponse::unhealthy()
            }
        };
        debug!(status = %health.status, "health status");
        self.state.health.insert(health)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn health(&self) -> Option<&HealthResponse> {
        self.state.health.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.state.loading
    }

    pub fn upload_zone(&self) -> &UploadZone {
        &self.upload
    }

    pub fn upload_progress(&self) -> watch::Receiver<u8> {
        self.upload.subscribe_progress()
    }

    pub fn results(&self) -> Option<&ResultsView> {
        self.results.as_ref()
    }

    pub fn results_snapshot(&self) -> Option<ResultsSnapshot> {
        self.results.as_ref().map(ResultsView::snapshot)
    }

    /// Hand a selected file to the upload zone, disabled while loading.
    pub async fn upload(&mut self, file: ImageFile) -> UploadOutcome {
        let outcome = self.upload.select_file(file, self.state.loading).await;
        if let UploadOutcome::Uploaded(resp) = &outcome {
            self.state.study = Some(Study::from_upload(resp));
        }
        self.sync().await;
        outcome
    }

    /// Start (or retry) analysis of the current study. `None` when no study
    /// is open.
    pub async fn start_analysis(&mut self) -> Option<AnalysisOutcome> {
        let view = self.results.clone()?;
        let outcome = view.start_analysis(self.state.loading).await;
        self.sync().await;
        Some(outcome)
    }

    /// Open a study that was uploaded earlier, as if its upload had just
    /// completed.
    pub async fn open_study(&mut self, study_id: &str) {
        self.on_upload_complete(study_id.to_string()).await;
        self.sync().await;
    }

    pub fn dismiss_error(&mut self) {
        self.state.error = None;
    }

    /// Back to the initial screen. Health is kept.
    pub fn reset(&mut self) {
        self.results = None;
        self.state.study_id = None;
        self.state.study = None;
        self.state.result = None;
        self.state.error = None;
        self.state.loading = false;
        // Drop anything a child sent for the old study.
        while self.inbox.try_recv().is_ok() {}
    }

    /// Apply every queued child event.
    pub async fn sync(&mut self) {
        while let Ok(event) = self.inbox.try_recv() {
            match event {
                UiEvent::UploadComplete(study_id) => self.on_upload_complete(study_id).await,
                UiEvent::AnalysisComplete(result) => {
                    if let Some(study) = self.state.study.as_mut() {
                        study.record_analysis(&result);
                    }
                    self.state.result = Some(result);
                    self.state.error = None;
                }
                UiEvent::Error(message) => {
                    self.state.error = Some(message);
                    self.state.loading = false;
                }
                UiEvent::LoadingChanged(loading) => self.state.loading = loading,
            }
        }
    }

    async fn on_upload_complete(&mut self, study_id: String) {
        info!(study_id = %study_id, "opening results for study");
        if self.state.study.as_ref().is_some_and(|s| s.study_id != study_id) {
            self.state.study = None;
        }
        self.state.study_id = Some(study_id.clone());
        self.state.result = None;
        self.state.error = None;

        let view = ResultsView::new(self.api.clone(), study_id, self.events.clone());
        self.results = Some(view.clone());
        view.load().await;
    }
}
