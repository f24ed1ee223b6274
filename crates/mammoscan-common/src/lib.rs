//! mammoscan-common: Shared wire types, entities and errors used across all Mammoscan crates.

pub mod error;
pub mod entities;
pub mod normalise;

// Re-export commonly used types
pub use entities::{
    AnalysisMetadata, AnalysisResponse, AnalysisResult, ComponentStatus, HealthResponse,
    ModelInfo, ModelInfoResponse, Region, Study, UploadResponse,
};
pub use error::{MammoscanError, Result};
