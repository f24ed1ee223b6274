//! Results view for one study.
//!
//! `Pending -> Analyzing -> Completed`, `Analyzing -> Error`, and retry takes
//! `Error -> Analyzing`. Each view is bound to a single study id; the shell
//! builds a fresh one whenever a new upload completes.

use std::sync::{Arc, Mutex};

use mammoscan_client::ImagingApi;
use mammoscan_common::AnalysisResult;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::events::{emit, EventSender, UiEvent};

pub const ANALYSIS_FAILED_MESSAGE: &str = "Analysis failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Analyzing,
    Completed,
    Error,
}

impl AnalysisStatus {
    /// Whether a new analysis attempt may begin from this state.
    pub fn can_start(self) -> bool {
        matches!(self, AnalysisStatus::Pending | AnalysisStatus::Error)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// Already running, already done, or the shell is busy.
    Ignored,
    Completed(AnalysisResult),
    Failed(String),
}

/// Everything a renderer needs, taken in one lock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsSnapshot {
    pub study_id: String,
    pub status: AnalysisStatus,
    pub result: Option<AnalysisResult>,
    pub error: Option<String>,
}

#[derive(Debug)]
struct ResultsState {
    status: AnalysisStatus,
    result: Option<AnalysisResult>,
    error: Option<String>,
}

/// Emits `LoadingChanged(false)` however the attempt ends.
struct LoadingGuard<'a> {
    events: &'a EventSender,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        emit(self.events, UiEvent::LoadingChanged(false));
    }
}

#[derive(Clone)]
pub struct ResultsView {
    api: Arc<dyn ImagingApi>,
    study_id: Arc<str>,
    events: EventSender,
    state: Arc<Mutex<ResultsState>>,
}

impl ResultsView {
    pub fn new(api: Arc<dyn ImagingApi>, study_id: impl Into<String>, events: EventSender) -> Self {
        Self {
            api,
            study_id: Arc::from(study_id.into()),
            events,
            state: Arc::new(Mutex::new(ResultsState {
                status: AnalysisStatus::Pending,
                result: None,
                error: None,
            })),
        }
    }

    pub fn study_id(&self) -> &str {
        &self.study_id
    }

    pub fn status(&self) -> AnalysisStatus {
        self.state.lock().map(|s| s.status).unwrap_or(AnalysisStatus::Pending)
    }

    pub fn result(&self) -> Option<AnalysisResult> {
        self.state.lock().ok().and_then(|s| s.result.clone())
    }

    pub fn snapshot(&self) -> ResultsSnapshot {
        let (status, result, error) = match self.state.lock() {
            Ok(s) => (s.status, s.result.clone(), s.error.clone()),
            Err(_) => (AnalysisStatus::Pending, None, None),
        };
        ResultsSnapshot { study_id: self.study_id.to_string(), status, result, error }
    }

    /// Look for an analysis that already exists for this study.
    ///
    /// A fetch failure is logged and leaves the view `Pending`; the user can
    /// still start an analysis by hand.
    pub async fn load(&self) -> Option<AnalysisResult> {
        let resp = match self.api.get_analysis_result(&self.study_id).await {
            Ok(r) => r,
            Err(e) => {
                warn!(study_id = %self.study_id, error = ?e, "could not fetch existing analysis");
                return None;
            }
        };

        if !resp.is_complete() {
            debug!(study_id = %self.study_id, status = %resp.status, "no finished analysis yet");
            return None;
        }

        let result = resp.normalise();
        {
            let Ok(mut st) = self.state.lock() else { return None };
            if st.status != AnalysisStatus::Pending {
                return None;
            }
            st.status = AnalysisStatus::Completed;
            st.result = Some(result.clone());
            st.error = None;
        }
        info!(study_id = %self.study_id, prediction = %result.prediction, "existing analysis found");
        emit(&self.events, UiEvent::AnalysisComplete(result.clone()));
        Some(result)
    }

    /// Trigger an analysis. `is_loading` is the shell's loading flag.
    pub async fn start_analysis(&self, is_loading: bool) -> AnalysisOutcome {
        if is_loading {
            debug!(study_id = %self.study_id, "shell busy; analysis not started");
            return AnalysisOutcome::Ignored;
        }
        {
            let Ok(mut st) = self.state.lock() else { return AnalysisOutcome::Ignored };
            if !st.status.can_start() {
                debug!(study_id = %self.study_id, status = ?st.status, "analysis already running or done");
                return AnalysisOutcome::Ignored;
            }
            st.status = AnalysisStatus::Analyzing;
            st.error = None;
        }

        emit(&self.events, UiEvent::LoadingChanged(true));
        let _loading = LoadingGuard { events: &self.events };

        let outcome = match self.api.analyze_image(&self.study_id).await {
            Ok(resp) if resp.is_complete() => Ok(resp.normalise()),
            Ok(resp) => Err(resp
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| ANALYSIS_FAILED_MESSAGE.to_string())),
            Err(e) => Err(e.user_message()),
        };

        match outcome {
            Ok(result) => {
                self.settle(AnalysisStatus::Completed, Some(result.clone()), None);
                info!(
                    study_id = %self.study_id,
                    prediction = %result.prediction,
                    regions = result.regions.len(),
                    "analysis complete"
                );
                emit(&self.events, UiEvent::AnalysisComplete(result.clone()));
                AnalysisOutcome::Completed(result)
            }
            Err(message) => {
                warn!(study_id = %self.study_id, error = %message, "analysis failed");
                self.settle(AnalysisStatus::Error, None, Some(message.clone()));
                emit(&self.events, UiEvent::Error(message.clone()));
                AnalysisOutcome::Failed(message)
            }
        }
    }

    /// Same action as [`start_analysis`](Self::start_analysis), offered from
    /// the error state.
    pub async fn retry(&self, is_loading: bool) -> AnalysisOutcome {
        self.start_analysis(is_loading).await
    }

    fn settle(&self, status: AnalysisStatus, result: Option<AnalysisResult>, error: Option<String>) {
        if let Ok(mut st) = self.state.lock() {
            st.status = status;
            st.result = result;
            st.error = error;
        }
    }
}
