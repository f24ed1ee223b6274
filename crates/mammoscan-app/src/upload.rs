//! Upload zone: validates a selected image, submits it and reports the new
//! study id to the shell.
//!
//! States are `Idle` and `Uploading`. A selection while uploading, or while
//! the shell has the zone disabled, is ignored without an error. Type and
//! size are checked before anything touches the network.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use mammoscan_client::{ApiError, ImageFile, ImagingApi};
use mammoscan_common::UploadResponse;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::events::{emit, EventSender, UiEvent};
use crate::files::DICOM_MIME;
use crate::progress::{ProgressSettings, ProgressTicker};

pub const DEFAULT_ALLOWED_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/jpg", DICOM_MIME];
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("Please upload a valid image file (PNG, JPEG) or DICOM file")]
    UnsupportedType(String),

    #[error("File size must be less than {limit_mb}MB")]
    TooLarge { size: u64, limit_mb: u64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadSettings {
    pub allowed_types: Vec<String>,
    pub max_size_bytes: u64,
    pub progress: ProgressSettings,
    /// How long 100% stays visible before the zone resets.
    pub completion_hold: Duration,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            allowed_types: DEFAULT_ALLOWED_TYPES.iter().map(|s| s.to_string()).collect(),
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            progress: ProgressSettings::default(),
            completion_hold: Duration::from_millis(500),
        }
    }
}

impl UploadSettings {
    pub fn validate(&self, file: &ImageFile) -> Result<(), ValidationError> {
        if !self.allowed_types.iter().any(|t| t == &file.content_type) {
            return Err(ValidationError::UnsupportedType(file.content_type.clone()));
        }
        if file.size() > self.max_size_bytes {
            return Err(ValidationError::TooLarge {
                size: file.size(),
                limit_mb: self.max_size_bytes / (1024 * 1024),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Uploading,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// Busy or disabled; nothing happened.
    Ignored,
    /// Failed local validation; never sent.
    Rejected(ValidationError),
    Uploaded(UploadResponse),
    Failed(ApiError),
}

/// Returns the zone to `Idle` with zero progress when dropped, including
/// when the upload future itself is dropped mid-request.
struct UploadingGuard {
    state: Arc<Mutex<UploadState>>,
    progress: Arc<watch::Sender<u8>>,
}

impl Drop for UploadingGuard {
    fn drop(&mut self) {
        if let Ok(mut st) = self.state.lock() {
            *st = UploadState::Idle;
        }
        self.progress.send_replace(0);
    }
}

#[derive(Clone)]
pub struct UploadZone {
    api: Arc<dyn ImagingApi>,
    events: EventSender,
    settings: Arc<UploadSettings>,
    state: Arc<Mutex<UploadState>>,
    progress: Arc<watch::Sender<u8>>,
}

impl UploadZone {
    pub fn new(api: Arc<dyn ImagingApi>, events: EventSender, settings: UploadSettings) -> Self {
        let (progress, _) = watch::channel(0u8);
        Self {
            api,
            events,
            settings: Arc::new(settings),
            state: Arc::new(Mutex::new(UploadState::Idle)),
            progress: Arc::new(progress),
        }
    }

    pub fn state(&self) -> UploadState {
        self.state.lock().map(|s| *s).unwrap_or(UploadState::Idle)
    }

    pub fn is_uploading(&self) -> bool {
        self.state() == UploadState::Uploading
    }

    /// Current cosmetic progress, 0..=100.
    pub fn progress(&self) -> u8 {
        *self.progress.borrow()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<u8> {
        self.progress.subscribe()
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    /// Handle a file chosen by the user.
    pub async fn select_file(&self, file: ImageFile, disabled: bool) -> UploadOutcome {
        let guard = {
            let Ok(mut st) = self.state.lock() else {
                return UploadOutcome::Ignored;
            };
            if disabled || *st == UploadState::Uploading {
                debug!(disabled, "upload zone busy; selection ignored");
                return UploadOutcome::Ignored;
            }
            if let Err(e) = self.settings.validate(&file) {
                warn!(filename = %file.filename, error = ?e, "file rejected before upload");
                emit(&self.events, UiEvent::Error(e.to_string()));
                return UploadOutcome::Rejected(e);
            }
            *st = UploadState::Uploading;
            UploadingGuard { state: self.state.clone(), progress: self.progress.clone() }
        };

        self.progress.send_replace(0);
        let ticker = ProgressTicker::start(self.progress.clone(), &self.settings.progress);

        let result = self.api.upload_image(file).await;
        ticker.cancel();

        match result {
            Ok(resp) => {
                self.progress.send_replace(100);
                tokio::time::sleep(self.settings.completion_hold).await;
                drop(guard);
                info!(study_id = %resp.study_id, "upload complete");
                emit(&self.events, UiEvent::UploadComplete(resp.study_id.clone()));
                UploadOutcome::Uploaded(resp)
            }
            Err(e) => {
                drop(guard);
                emit(&self.events, UiEvent::Error(e.user_message()));
                UploadOutcome::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{channel, EventReceiver};
    use mammoscan_test_utils::fake::uploaded;
    use mammoscan_test_utils::FakeApi;
    use pretty_assertions::assert_eq;

    fn png(size: usize) -> ImageFile {
        ImageFile::new("scan.png", "image/png", vec![0u8; size])
    }

    fn zone(api: Arc<FakeApi>) -> (UploadZone, EventReceiver) {
        let (tx, rx) = channel();
        (UploadZone::new(api, tx, UploadSettings::default()), rx)
    }

    fn drain(rx: &mut EventReceiver) -> Vec<UiEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_disallowed_type_rejected_without_request() {
        let api = FakeApi::new();
        let (zone, mut rx) = zone(api.clone());

        for ct in ["text/plain", "image/gif", "application/pdf", ""] {
            let outcome = zone.select_file(ImageFile::new("x", ct, vec![1]), false).await;
            assert_eq!(outcome, UploadOutcome::Rejected(ValidationError::UnsupportedType(ct.to_string())));
        }

        assert_eq!(api.uploads(), 0);
        let events = drain(&mut rx);
        assert_eq!(events.len(), 4);
        assert_eq!(
            events[0],
            UiEvent::Error("Please upload a valid image file (PNG, JPEG) or DICOM file".into())
        );
        assert_eq!(zone.state(), UploadState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_file_rejected_without_request() {
        let api = FakeApi::new();
        let (zone, mut rx) = zone(api.clone());

        let outcome = zone.select_file(png(50 * 1024 * 1024 + 1), false).await;
        assert!(matches!(outcome, UploadOutcome::Rejected(ValidationError::TooLarge { .. })));
        assert_eq!(api.uploads(), 0);
        assert_eq!(drain(&mut rx), vec![UiEvent::Error("File size must be less than 50MB".into())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exact_limit_is_accepted() {
        let api = FakeApi::new();
        api.push_upload(Ok(uploaded("S9")));
        let (zone, _rx) = zone(api.clone());

        let outcome = zone.select_file(png(50 * 1024 * 1024), false).await;
        assert!(matches!(outcome, UploadOutcome::Uploaded(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_emits_study_id_once() {
        let api = FakeApi::new();
        api.push_upload(Ok(uploaded("S1")));
        let (zone, mut rx) = zone(api.clone());

        let outcome = zone.select_file(png(4), false).await;
        assert!(matches!(outcome, UploadOutcome::Uploaded(ref r) if r.study_id == "S1"));
        assert_eq!(drain(&mut rx), vec![UiEvent::UploadComplete("S1".into())]);
        assert_eq!(api.uploads(), 1);
        assert_eq!(zone.state(), UploadState::Idle);
        assert_eq!(zone.progress(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_emits_error_and_resets() {
        let api = FakeApi::new();
        api.push_upload(Err(ApiError::NoResponse("refused".into())));
        let (zone, mut rx) = zone(api.clone());

        let outcome = zone.select_file(png(4), false).await;
        assert!(matches!(outcome, UploadOutcome::Failed(ApiError::NoResponse(_))));
        assert_eq!(
            drain(&mut rx),
            vec![UiEvent::Error("No response from server. Please check your connection.".into())]
        );
        assert_eq!(zone.state(), UploadState::Idle);
        assert_eq!(zone.progress(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_zone_ignores_selection() {
        let api = FakeApi::new();
        let (zone, mut rx) = zone(api.clone());

        assert_eq!(zone.select_file(png(4), true).await, UploadOutcome::Ignored);
        assert_eq!(api.uploads(), 0);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_selection_while_uploading_is_ignored() {
        let api = FakeApi::new();
        api.push_upload(Ok(uploaded("S1")));
        api.hold();
        let (zone, mut rx) = zone(api.clone());

        let first = tokio::spawn({
            let zone = zone.clone();
            async move { zone.select_file(png(4), false).await }
        });
        api.entered().await;
        assert!(zone.is_uploading());

        assert_eq!(zone.select_file(png(4), false).await, UploadOutcome::Ignored);

        api.release();
        assert!(matches!(first.await.unwrap(), UploadOutcome::Uploaded(_)));
        assert_eq!(api.uploads(), 1);
        assert_eq!(drain(&mut rx), vec![UiEvent::UploadComplete("S1".into())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_climbs_while_outstanding_and_holds_at_100() {
        let api = FakeApi::new();
        api.push_upload(Ok(uploaded("S1")));
        api.hold();
        let (zone, _rx) = zone(api.clone());
        let progress = zone.subscribe_progress();

        let task = tokio::spawn({
            let zone = zone.clone();
            async move { zone.select_file(png(4), false).await }
        });
        api.entered().await;

        tokio::time::sleep(Duration::from_millis(650)).await;
        assert_eq!(*progress.borrow(), 30);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(*progress.borrow(), 90);

        api.release();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(*progress.borrow(), 100);
        assert!(zone.is_uploading());

        task.await.unwrap();
        assert_eq!(*progress.borrow(), 0);
        assert!(!zone.is_uploading());
    }
}
