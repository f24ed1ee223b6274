//! Plain-text rendering for the terminal front end.

use std::fmt::Write;

use chrono::{DateTime, NaiveDateTime};
use mammoscan_common::{AnalysisResult, HealthResponse, ModelInfoResponse, UploadResponse};

use crate::results::{AnalysisStatus, ResultsSnapshot};

pub const DISCLAIMER: &str = "This is a demonstration system using mock AI. Results are simulated \
and should not be used for clinical decisions.";

const BAR_WIDTH: usize = 30;

/// `0.873` -> `87.3%`
pub fn percent(confidence: f64) -> String {
    format!("{:.1}%", confidence * 100.0)
}

/// Local-free display of a backend timestamp; unparseable input is shown as-is.
pub fn format_date(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%Y-%m-%d %H:%M:%S").to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format("%Y-%m-%d %H:%M:%S").to_string();
    }
    raw.to_string()
}

fn capitalise(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn progress_bar(progress: u8) -> String {
    let p = progress.min(100) as usize;
    let filled = p * BAR_WIDTH / 100;
    format!("[{}{}] {:>3}%", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled), p)
}

pub fn render_results(snapshot: &ResultsSnapshot) -> String {
    match (snapshot.status, &snapshot.result) {
        (AnalysisStatus::Completed, Some(result)) => render_analysis(result),
        (AnalysisStatus::Completed, None) | (AnalysisStatus::Pending, _) => format!(
            "Ready for Analysis\nStudy {} is uploaded. Run `mammoscan analyze {}` to start AI analysis.\n",
            snapshot.study_id, snapshot.study_id
        ),
        (AnalysisStatus::Analyzing, _) => "Analyzing Mammogram\nAI is processing your image...\n".to_string(),
        (AnalysisStatus::Error, _) => {
            let mut out = String::from("Analysis Failed\n");
            let _ = writeln!(
                out,
                "{}",
                snapshot.error.as_deref().unwrap_or("There was an error during analysis")
            );
            let _ = writeln!(out, "Retry with `mammoscan analyze {}`.", snapshot.study_id);
            out
        }
    }
}

pub fn render_analysis(result: &AnalysisResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "AI Analysis Result");
    let _ = writeln!(out, "  Prediction:      {}", capitalise(&result.prediction));
    let _ = writeln!(out, "  Confidence:      {}", percent(result.confidence));
    let _ = writeln!(out, "  Processing Time: {}s", result.processing_time);

    if !result.regions.is_empty() {
        let _ = writeln!(out, "\nRegions of Interest");
        for (i, region) in result.regions.iter().enumerate() {
            let _ = writeln!(
                out,
                "  Region {} ({} confidence) at ({}, {}) size {}x{}",
                i + 1,
                percent(region.confidence),
                region.x,
                region.y,
                region.width,
                region.height
            );
            let _ = writeln!(
                out,
                "    Type: {}  Severity: {}",
                capitalise(&region.kind),
                capitalise(region.severity.as_deref().unwrap_or("unknown"))
            );
            if let Some(desc) = region.description.as_deref().filter(|d| !d.is_empty()) {
                let _ = writeln!(out, "    {}", desc);
            }
        }
    }

    let meta = &result.metadata;
    let _ = writeln!(out, "\nAnalysis Details");
    let _ = writeln!(out, "  Model Version:   {}", meta.model_version);
    let _ = writeln!(out, "  Image Quality:   {}", meta.image_quality);
    let _ = writeln!(out, "  Lesion Count:    {}", meta.lesion_count);
    let _ = writeln!(out, "  Processing Date: {}", format_date(&meta.processing_date));

    let _ = writeln!(out, "\nDemo Disclaimer: {}", DISCLAIMER);
    out
}

pub fn render_health(health: &HealthResponse) -> String {
    let mut out = format!("{} v{}: {}\n", health.service, health.version, health.status);
    if let Some(c) = &health.components {
        let _ = writeln!(out, "  database: {}", c.database);
        let _ = writeln!(out, "  ai_model: {}", c.ai_model);
    }
    if let Some(m) = &health.ai_model_info {
        let _ = writeln!(out, "  model:    {} ({})", m.model_version, m.model_type);
    }
    out
}

pub fn render_model_info(info: &ModelInfoResponse) -> String {
    let m = &info.model_info;
    let mut out = String::new();
    let _ = writeln!(out, "{} [{}]", m.model_version, info.status);
    let _ = writeln!(out, "  type:      {}", m.model_type);
    let _ = writeln!(out, "  formats:   {}", m.supported_formats.join(", "));
    let _ = writeln!(out, "  lesions:   {}", m.lesion_types.join(", "));
    if !m.description.is_empty() {
        let _ = writeln!(out, "  {}", m.description);
    }
    out
}

pub fn render_upload(resp: &UploadResponse) -> String {
    let mut out = format!("study {}: {}\n", resp.study_id, resp.status);
    if let Some(name) = &resp.filename {
        let _ = writeln!(out, "  file:     {}", name);
    }
    if let Some(size) = resp.file_size {
        let _ = writeln!(out, "  size:     {} bytes", size);
    }
    if let Some(t) = &resp.upload_time {
        let _ = writeln!(out, "  uploaded: {}", format_date(t));
    }
    if let Some(has) = resp.has_analysis {
        let _ = writeln!(out, "  analysed: {}", if has { "yes" } else { "no" });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mammoscan_test_utils::fake::{completed, healthy};

    #[test]
    fn test_percent_one_decimal() {
        assert_eq!(percent(0.873), "87.3%");
        assert_eq!(percent(0.0), "0.0%");
        assert_eq!(percent(1.0), "100.0%");
    }

    #[test]
    fn test_format_date_variants() {
        assert_eq!(format_date("2024-05-01T10:00:05"), "2024-05-01 10:00:05");
        assert_eq!(format_date("2024-05-01T10:00:05.123456"), "2024-05-01 10:00:05");
        assert_eq!(format_date("2024-05-01T10:00:05.000Z"), "2024-05-01 10:00:05");
        assert_eq!(format_date("yesterday"), "yesterday");
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0), format!("[{}]   0%", "-".repeat(30)));
        assert_eq!(progress_bar(50), format!("[{}{}]  50%", "#".repeat(15), "-".repeat(15)));
        assert_eq!(progress_bar(200), format!("[{}] 100%", "#".repeat(30)));
    }

    #[test]
    fn test_completed_rendering() {
        let result = completed("S1").normalise();
        let text = render_analysis(&result);
        assert!(text.contains("Prediction:      Suspicious"));
        assert!(text.contains("Confidence:      87.0%"));
        assert!(text.contains("Region 1 (81.0% confidence) at (120, 340) size 48x52"));
        assert!(text.contains("Type: Mass  Severity: Moderate"));
        assert!(text.contains("Lesion Count:    1"));
        assert!(text.contains("Processing Date: 2024-05-01 10:00:05"));
        assert!(text.contains(DISCLAIMER));
    }

    #[test]
    fn test_state_renderings() {
        let mut snap = ResultsSnapshot {
            study_id: "S1".into(),
            status: AnalysisStatus::Pending,
            result: None,
            error: None,
        };
        assert!(render_results(&snap).starts_with("Ready for Analysis"));

        snap.status = AnalysisStatus::Analyzing;
        assert!(render_results(&snap).contains("AI is processing your image..."));

        snap.status = AnalysisStatus::Error;
        snap.error = Some("Study not found".into());
        let text = render_results(&snap);
        assert!(text.contains("Study not found"));
        assert!(text.contains("mammoscan analyze S1"));
    }

    #[test]
    fn test_health_rendering() {
        let text = render_health(&healthy());
        assert_eq!(text, "AI Medical Imaging - Starter Kit v1.0.0: healthy\n");
        assert!(render_health(&HealthResponse::unhealthy()).ends_with("unhealthy\n"));
    }
}
