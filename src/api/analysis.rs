//! Indicator analysis submission
//!
//! `POST /analyze/` accepts either a text indicator (IP, domain, URL or
//! hash) as JSON or an uploaded file as multipart. The backend decides the
//! input type and runs the chosen scan engine.

use serde::{Deserialize, Serialize};

use crate::api::ApiClient;
use crate::errors::{ApiError, ApiResult};

/// Scan engine selector. The backend only knows these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// VirusTotal
    Vt,
    /// AlienVault OTX
    Otx,
}

impl Engine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Vt => "vt",
            Engine::Otx => "otx",
        }
    }
}

impl std::str::FromStr for Engine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vt" => Ok(Engine::Vt),
            "otx" => Ok(Engine::Otx),
            other => Err(format!("unknown engine '{other}', expected 'vt' or 'otx'")),
        }
    }
}

#[derive(Debug, Serialize)]
struct AnalyzeTextRequest<'a> {
    input_value: &'a str,
    engine_choice: Engine,
}

/// What the backend returns for a completed submission. The full scan
/// payloads live on the report; this is the summary row.
#[derive(Debug, Deserialize)]
pub struct AnalysisResult {
    pub id: i64,
    pub input_type: String,
    pub input_value: String,
    pub severity: String,
    pub threat_score: f64,
    pub status: String,
    pub engine_used: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Submit a text indicator for analysis. Empty input is rejected locally,
/// the backend would 400 on it anyway.
pub async fn analyze_text(
    api: &ApiClient,
    input: &str,
    engine: Engine,
) -> ApiResult<AnalysisResult> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ApiError::Status {
            status: 400,
            message: "empty input value".to_string(),
        });
    }
    api.post(
        "/analyze/",
        &AnalyzeTextRequest {
            input_value: input,
            engine_choice: engine,
        },
    )
    .await
}

/// Submit a file for analysis as a multipart upload.
pub async fn analyze_file(
    api: &ApiClient,
    file_name: String,
    bytes: Vec<u8>,
    engine: Engine,
) -> ApiResult<AnalysisResult> {
    api.post_multipart(
        "/analyze/",
        file_name,
        bytes,
        vec![("engine_choice".to_string(), engine.as_str().to_string())],
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_parses_case_insensitively() {
        assert_eq!("VT".parse::<Engine>().unwrap(), Engine::Vt);
        assert_eq!("otx".parse::<Engine>().unwrap(), Engine::Otx);
        assert!("virustotal".parse::<Engine>().is_err());
    }

    #[test]
    fn engine_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Engine::Vt).unwrap(), "\"vt\"");
    }
}
