/// Wire types exchanged with the imaging backend, plus the client-side
/// entities built from them.

use serde::{Deserialize, Serialize};

use crate::normalise::normalise_analysis;

// ---------------------------------------------------------------------------
// Region of interest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub confidence: f64,
    #[serde(rename = "type", default)]
    pub kind: String,   // e.g. mass | calcification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Normalised analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub model_version: String,
    pub processing_date: String,
    pub image_quality: String,
    /// Always `regions.len()` of the owning result.
    pub lesion_count: usize,
}

/// Client-side view of a finished analysis. Only built through
/// [`AnalysisResponse::normalise`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub prediction: String,   // normal | suspicious | unknown
    pub confidence: f64,
    pub processing_time: f64,
    pub regions: Vec<Region>,
    pub metadata: AnalysisMetadata,
}

impl AnalysisResult {
    pub fn is_suspicious(&self) -> bool {
        self.prediction == "suspicious"
    }
}

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

/// Body of `POST /upload` and `GET /upload/{study_id}`. The status endpoint
/// omits size and content type and adds `has_analysis`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub study_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub upload_time: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub has_analysis: Option<bool>,
}

// ---------------------------------------------------------------------------
// Inference
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NestedMetadata {
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub processing_date: Option<String>,
    #[serde(default)]
    pub image_quality: Option<String>,
}

/// Analysis fields as the backend nests them under `analysis`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NestedAnalysis {
    #[serde(default)]
    pub prediction: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub processing_time: Option<f64>,
    #[serde(default)]
    pub regions: Option<Vec<Region>>,
    #[serde(default)]
    pub metadata: Option<NestedMetadata>,
}

/// Body of `POST /inference/{id}` and `GET /inference/{id}`.
///
/// Analysis fields may arrive flat or nested under `analysis`; flat values
/// win when both are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    #[serde(default)]
    pub study_id: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub prediction: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub processing_time: Option<f64>,
    #[serde(default)]
    pub regions: Option<Vec<Region>>,
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub analysis_date: Option<String>,
    #[serde(default)]
    pub image_quality: Option<String>,
    #[serde(default)]
    pub analysis: Option<NestedAnalysis>,
}

impl AnalysisResponse {
    /// True when the backend reports a finished analysis.
    pub fn is_complete(&self) -> bool {
        matches!(self.status.as_str(), "completed" | "analyzed")
    }

    /// Map into the client-side result, defaulting every missing field.
    pub fn normalise(&self) -> AnalysisResult {
        normalise_analysis(self)
    }
}

// ---------------------------------------------------------------------------
// Health / model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    #[serde(default)]
    pub model_version: String,
    #[serde(default)]
    pub model_type: String,
    #[serde(default)]
    pub supported_formats: Vec<String>,
    #[serde(default)]
    pub lesion_types: Vec<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfoResponse {
    pub model_info: ModelInfo,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentStatus {
    pub database: String,
    pub ai_model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<ComponentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_model_info: Option<ModelInfo>,
}

pub const SERVICE_NAME: &str = "AI Medical Imaging - Starter Kit";
pub const SERVICE_VERSION: &str = "1.0.0";

impl HealthResponse {
    /// Status shown when the backend cannot be reached at all.
    pub fn unhealthy() -> Self {
        Self {
            status: "unhealthy".to_string(),
            service: SERVICE_NAME.to_string(),
            version: SERVICE_VERSION.to_string(),
            components: None,
            ai_model_info: None,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

// ---------------------------------------------------------------------------
// Study
// ---------------------------------------------------------------------------

/// A single uploaded image and, once analysed, its findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Study {
    pub study_id: String,
    pub filename: String,
    pub content_type: String,
    pub file_size: u64,
    pub upload_time: Option<String>,
    pub prediction: Option<String>,
    pub confidence: Option<f64>,
    pub processing_time: Option<f64>,
    pub regions: Option<Vec<Region>>,
    pub model_version: Option<String>,
    pub image_quality: Option<String>,
    pub processing_date: Option<String>,
}

impl Study {
    pub fn from_upload(resp: &UploadResponse) -> Self {
        Self {
            study_id: resp.study_id.clone(),
            filename: resp.filename.clone().unwrap_or_default(),
            content_type: resp.content_type.clone().unwrap_or_default(),
            file_size: resp.file_size.unwrap_or(0),
            upload_time: resp.upload_time.clone(),
            prediction: None,
            confidence: None,
            processing_time: None,
            regions: None,
            model_version: None,
            image_quality: None,
            processing_date: None,
        }
    }

    pub fn record_analysis(&mut self, result: &AnalysisResult) {
        self.prediction = Some(result.prediction.clone());
        self.confidence = Some(result.confidence);
        self.processing_time = Some(result.processing_time);
        self.regions = Some(result.regions.clone());
        self.model_version = Some(result.metadata.model_version.clone());
        self.image_quality = Some(result.metadata.image_quality.clone());
        self.processing_date = Some(result.metadata.processing_date.clone());
    }

    pub fn is_analysed(&self) -> bool {
        self.prediction.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_region_type_field_renamed() {
        let r: Region = serde_json::from_value(serde_json::json!({
            "x": 10.0, "y": 20.0, "width": 5.0, "height": 6.0,
            "confidence": 0.8, "type": "mass", "severity": "moderate"
        })).unwrap();
        assert_eq!(r.kind, "mass");
        assert_eq!(r.severity.as_deref(), Some("moderate"));
        assert!(r.id.is_none());

        let back = serde_json::to_value(&r).unwrap();
        assert_eq!(back["type"], "mass");
        assert!(back.get("description").is_none());
    }

    #[test]
    fn test_upload_status_shape_decodes() {
        let r: UploadResponse = serde_json::from_value(serde_json::json!({
            "study_id": "abc",
            "status": "uploaded",
            "filename": "scan.png",
            "upload_time": null,
            "has_analysis": false
        })).unwrap();
        assert_eq!(r.study_id, "abc");
        assert_eq!(r.file_size, None);
        assert_eq!(r.has_analysis, Some(false));
    }

    #[test]
    fn test_analysis_status_completion() {
        let mut r = AnalysisResponse { status: "pending".into(), ..Default::default() };
        assert!(!r.is_complete());
        r.status = "analyzed".into();
        assert!(r.is_complete());
        r.status = "completed".into();
        assert!(r.is_complete());
    }

    #[test]
    fn test_unhealthy_status() {
        let h = HealthResponse::unhealthy();
        assert_eq!(h.status, "unhealthy");
        assert_eq!(h.service, "AI Medical Imaging - Starter Kit");
        assert_eq!(h.version, "1.0.0");
        assert!(!h.is_healthy());
    }

    #[test]
    fn test_study_records_analysis() {
        let upload = UploadResponse {
            study_id: "S1".into(),
            status: "uploaded".into(),
            filename: Some("left_cc.png".into()),
            file_size: Some(1024),
            content_type: Some("image/png".into()),
            upload_time: Some("2024-05-01T10:00:00".into()),
            message: None,
            has_analysis: None,
        };
        let mut study = Study::from_upload(&upload);
        assert!(!study.is_analysed());

        let result = AnalysisResponse {
            status: "completed".into(),
            prediction: Some("normal".into()),
            confidence: Some(0.91),
            ..Default::default()
        }.normalise();
        study.record_analysis(&result);

        assert!(study.is_analysed());
        assert_eq!(study.prediction.as_deref(), Some("normal"));
        assert_eq!(study.regions, Some(vec![]));
        assert_eq!(study.file_size, 1024);
    }
}
