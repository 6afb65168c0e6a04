//! Analysis reports
//!
//! List/detail, status updates, admin review and escalation. The raw scan
//! payloads (`vt_data`, `otx_data`, `ipinfo_data`) are backend-shaped JSON
//! and stay untyped here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{ApiClient, Page};
use crate::auth::types::User;
use crate::errors::ApiResult;

#[derive(Debug, Deserialize)]
pub struct Report {
    pub id: i64,
    #[serde(default)]
    pub analyst: Option<User>,
    #[serde(default)]
    pub assigned_to: Option<User>,
    pub input_type: String,
    pub input_value: String,
    #[serde(default)]
    pub file_name: Option<String>,
    pub engine_used: String,
    #[serde(default)]
    pub vt_data: Option<Value>,
    #[serde(default)]
    pub otx_data: Option<Value>,
    #[serde(default)]
    pub ipinfo_data: Option<Value>,
    pub severity: String,
    pub threat_score: f64,
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Optional list filters, rendered into query parameters.
#[derive(Debug, Default)]
pub struct ReportFilters {
    pub severity: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
struct UpdateStatusRequest<'a> {
    status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
}

/// Review verdict an admin can hand down on a pending report.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Approve,
    FalsePositive,
}

#[derive(Debug, Serialize)]
struct ReviewRequest {
    action: ReviewAction,
}

#[derive(Debug, Serialize)]
struct SendToAdminRequest<'a> {
    admin_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct SendToAdminResponse {
    #[serde(default)]
    pub detail: Option<String>,
}

pub async fn list(
    api: &ApiClient,
    page: u32,
    filters: &ReportFilters,
) -> ApiResult<Page<Report>> {
    let mut query = vec![("page", page.to_string())];
    if let Some(severity) = &filters.severity {
        query.push(("severity", severity.clone()));
    }
    if let Some(status) = &filters.status {
        query.push(("status", status.clone()));
    }
    if let Some(search) = &filters.search {
        query.push(("search", search.clone()));
    }
    api.get("/reports/", &query).await
}

pub async fn get(api: &ApiClient, id: i64) -> ApiResult<Report> {
    api.get(&format!("/reports/{id}/"), &[]).await
}

pub async fn update_status(
    api: &ApiClient,
    id: i64,
    status: &str,
    notes: Option<&str>,
) -> ApiResult<Report> {
    api.patch(
        &format!("/reports/{id}/"),
        &UpdateStatusRequest { status, notes },
    )
    .await
}

pub async fn review(api: &ApiClient, id: i64, action: ReviewAction) -> ApiResult<Report> {
    api.post(&format!("/reports/{id}/review/"), &ReviewRequest { action })
        .await
}

pub async fn delete(api: &ApiClient, id: i64) -> ApiResult<()> {
    api.delete(&format!("/reports/{id}/")).await
}

/// Escalate a report to a specific admin, with an optional note.
pub async fn send_to_admin(
    api: &ApiClient,
    id: i64,
    admin_id: i64,
    message: Option<&str>,
) -> ApiResult<SendToAdminResponse> {
    api.post(
        &format!("/reports/{id}/send_to_admin/"),
        &SendToAdminRequest { admin_id, message },
    )
    .await
}

/// Where the backend serves the PDF export for a report. The client hands
/// this path to the transport (or the user); rendering is server-side.
pub fn pdf_path(id: i64) -> String {
    format!("/reports/{id}/pdf/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_action_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ReviewAction::FalsePositive).unwrap(),
            "\"false_positive\""
        );
    }

    #[test]
    fn send_to_admin_omits_empty_message() {
        let json = serde_json::to_string(&SendToAdminRequest {
            admin_id: 3,
            message: None,
        })
        .unwrap();
        assert_eq!(json, r#"{"admin_id":3}"#);
    }

    #[test]
    fn report_parses_with_untyped_scan_payloads() {
        let report: Report = serde_json::from_str(
            r#"{
                "id": 7,
                "input_type": "ip",
                "input_value": "203.0.113.7",
                "engine_used": "vt",
                "vt_data": {"positives": 12, "total": 70},
                "severity": "high",
                "threat_score": 82.5,
                "status": "pending_review",
                "created_at": "2026-05-01T10:00:00Z"
            }"#,
        )
        .unwrap();
        assert_eq!(report.vt_data.unwrap()["positives"], 12);
        assert!(report.analyst.is_none());
    }
}
