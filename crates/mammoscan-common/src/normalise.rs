//! Maps raw inference responses onto [`AnalysisResult`].
//!
//! Missing fields default: prediction / model version / image quality to
//! `"unknown"`, confidence and processing time to `0`, regions to empty and
//! the processing date to the current time. Empty strings and non-finite
//! numbers count as missing.

use chrono::{SecondsFormat, Utc};

use crate::entities::{AnalysisMetadata, AnalysisResponse, AnalysisResult, NestedMetadata};

const UNKNOWN: &str = "unknown";

fn text(v: Option<&String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty()).cloned()
}

fn number(v: Option<f64>) -> Option<f64> {
    v.filter(|n| n.is_finite())
}

pub fn normalise_analysis(resp: &AnalysisResponse) -> AnalysisResult {
    let nested = resp.analysis.as_ref();
    let nested_meta: Option<&NestedMetadata> = nested.and_then(|a| a.metadata.as_ref());

    let prediction = text(resp.prediction.as_ref())
        .or_else(|| text(nested.and_then(|a| a.prediction.as_ref())))
        .unwrap_or_else(|| UNKNOWN.to_string());

    let confidence = number(resp.confidence)
        .or_else(|| number(nested.and_then(|a| a.confidence)))
        .unwrap_or(0.0);

    let processing_time = number(resp.processing_time)
        .or_else(|| number(nested.and_then(|a| a.processing_time)))
        .unwrap_or(0.0);

    let regions = resp.regions.clone()
        .or_else(|| nested.and_then(|a| a.regions.clone()))
        .unwrap_or_default();

    let model_version = text(resp.model_version.as_ref())
        .or_else(|| text(nested_meta.and_then(|m| m.model_version.as_ref())))
        .unwrap_or_else(|| UNKNOWN.to_string());

    let processing_date = text(resp.analysis_date.as_ref())
        .or_else(|| text(nested_meta.and_then(|m| m.processing_date.as_ref())))
        .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));

    let image_quality = text(resp.image_quality.as_ref())
        .or_else(|| text(nested_meta.and_then(|m| m.image_quality.as_ref())))
        .unwrap_or_else(|| UNKNOWN.to_string());

    let lesion_count = regions.len();

    AnalysisResult {
        prediction,
        confidence,
        processing_time,
        regions,
        metadata: AnalysisMetadata {
            model_version,
            processing_date,
            image_quality,
            lesion_count,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{NestedAnalysis, Region};
    use pretty_assertions::assert_eq;

    fn region(kind: &str) -> Region {
        Region {
            id: None,
            x: 1.0,
            y: 2.0,
            width: 3.0,
            height: 4.0,
            confidence: 0.5,
            kind: kind.to_string(),
            severity: None,
            description: None,
        }
    }

    #[test]
    fn test_missing_confidence_defaults_to_zero() {
        let resp: AnalysisResponse = serde_json::from_value(serde_json::json!({
            "status": "completed",
            "prediction": "suspicious",
            "regions": [
                {"x": 1, "y": 2, "width": 3, "height": 4, "confidence": 0.7, "type": "mass"},
                {"x": 5, "y": 6, "width": 7, "height": 8, "confidence": 0.6, "type": "calcification"}
            ]
        })).unwrap();

        let result = normalise_analysis(&resp);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.prediction, "suspicious");
        assert_eq!(result.metadata.lesion_count, result.regions.len());
        assert_eq!(result.metadata.lesion_count, 2);
    }

    #[test]
    fn test_empty_response_gets_all_defaults() {
        let resp = AnalysisResponse { status: "completed".into(), ..Default::default() };
        let result = normalise_analysis(&resp);

        assert_eq!(result.prediction, "unknown");
        assert_eq!(result.processing_time, 0.0);
        assert!(result.regions.is_empty());
        assert_eq!(result.metadata.model_version, "unknown");
        assert_eq!(result.metadata.image_quality, "unknown");
        assert_eq!(result.metadata.lesion_count, 0);
        assert!(chrono::DateTime::parse_from_rfc3339(&result.metadata.processing_date).is_ok());
    }

    #[test]
    fn test_empty_strings_count_as_missing() {
        let resp = AnalysisResponse {
            status: "completed".into(),
            prediction: Some(String::new()),
            image_quality: Some("  ".into()),
            ..Default::default()
        };
        let result = normalise_analysis(&resp);
        assert_eq!(result.prediction, "unknown");
        assert_eq!(result.metadata.image_quality, "unknown");
    }

    #[test]
    fn test_nested_analysis_is_used_as_fallback() {
        let resp: AnalysisResponse = serde_json::from_value(serde_json::json!({
            "study_id": "S1",
            "status": "completed",
            "analysis": {
                "prediction": "normal",
                "confidence": 0.93,
                "processing_time": 1.4,
                "regions": [],
                "metadata": {
                    "model_version": "mock-v1.0",
                    "image_quality": "good",
                    "processing_date": "2024-05-01T10:00:00"
                }
            }
        })).unwrap();

        let result = normalise_analysis(&resp);
        assert_eq!(result.prediction, "normal");
        assert_eq!(result.confidence, 0.93);
        assert_eq!(result.processing_time, 1.4);
        assert_eq!(result.metadata.model_version, "mock-v1.0");
        assert_eq!(result.metadata.processing_date, "2024-05-01T10:00:00");
    }

    #[test]
    fn test_flat_fields_win_over_nested() {
        let resp = AnalysisResponse {
            status: "completed".into(),
            prediction: Some("suspicious".into()),
            regions: Some(vec![region("mass")]),
            analysis: Some(NestedAnalysis {
                prediction: Some("normal".into()),
                regions: Some(vec![region("mass"), region("calcification")]),
                ..Default::default()
            }),
            ..Default::default()
        };
        let result = normalise_analysis(&resp);
        assert_eq!(result.prediction, "suspicious");
        assert_eq!(result.regions.len(), 1);
        assert_eq!(result.metadata.lesion_count, 1);
    }

    #[test]
    fn test_non_finite_confidence_is_zero() {
        let resp = AnalysisResponse {
            status: "completed".into(),
            confidence: Some(f64::NAN),
            ..Default::default()
        };
        assert_eq!(normalise_analysis(&resp).confidence, 0.0);
    }
}
