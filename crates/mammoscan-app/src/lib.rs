//! mammoscan-app: Headless upload / results / shell components and the
//! configuration and rendering used by the `mammoscan` binary.

pub mod config;
pub mod events;
pub mod files;
pub mod progress;
pub mod render;
pub mod results;
pub mod shell;
pub mod upload;

pub use config::Config;
pub use events::UiEvent;
pub use results::{AnalysisOutcome, AnalysisStatus, ResultsSnapshot, ResultsView};
pub use shell::{App, AppState};
pub use upload::{UploadOutcome, UploadSettings, UploadState, UploadZone, ValidationError};
