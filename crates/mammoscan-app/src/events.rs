//! One-way messages from the child components up to the shell.

use mammoscan_common::AnalysisResult;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// An upload finished; carries the new study id.
    UploadComplete(String),
    /// An analysis finished or an existing one was found.
    AnalysisComplete(AnalysisResult),
    /// Any user-facing failure from a child.
    Error(String),
    /// The results view started or finished an analysis attempt.
    LoadingChanged(bool),
}

pub type EventSender = mpsc::UnboundedSender<UiEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<UiEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Send an event; a shell that has gone away is not an error.
pub(crate) fn emit(tx: &EventSender, event: UiEvent) {
    if let Err(e) = tx.send(event) {
        debug!(event = ?e.0, "no listener for UI event");
    }
}
