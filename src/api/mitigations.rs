//! AWS mitigation actions (admin only)
//!
//! A mitigation is created `pending`, then explicitly executed; the backend
//! drives the AWS side and moves the status through
//! `in_progress`/`completed`/`failed`. `rule_number` only applies to NACL
//! blocks and is validated client-side the same way the backend does.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, Page};
use crate::errors::{ApiError, ApiResult};

/// Action types the backend executes. Kept as strings on the wire.
pub const ACTION_TYPES: &[&str] = &[
    "block_ip",
    "block_ip_waf",
    "block_ip_nacl",
    "isolate_instance",
    "geo_block",
    "rate_limit",
    "update_firewall",
];

#[derive(Debug, Deserialize)]
pub struct InitiatedBy {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Mitigation {
    pub id: i64,
    #[serde(default)]
    pub report: Option<i64>,
    pub action_type: String,
    pub target_value: String,
    pub aws_region: String,
    #[serde(default)]
    pub rule_number: Option<u32>,
    pub description: String,
    pub status: String,
    #[serde(default)]
    pub initiated_by: Option<InitiatedBy>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MitigationCreate {
    pub action_type: String,
    pub target_value: String,
    pub aws_region: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_number: Option<u32>,
}

#[derive(Debug, Default, Serialize)]
pub struct MitigationUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_number: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    pub action: Mitigation,
}

#[derive(Debug, Deserialize)]
pub struct MitigationStats {
    pub total: u64,
    pub pending: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub failed: u64,
    #[serde(default)]
    pub by_type: HashMap<String, u64>,
}

#[derive(Debug, Default)]
pub struct MitigationFilters {
    pub status: Option<String>,
    pub action_type: Option<String>,
    pub report_id: Option<i64>,
    pub page: Option<u32>,
}

/// Local sanity check before creation, mirroring the backend's rules so the
/// user gets an immediate error instead of a 400 round-trip.
pub fn validate(create: &MitigationCreate) -> Result<(), ApiError> {
    let mut errors = Vec::new();

    if !ACTION_TYPES.contains(&create.action_type.as_str()) {
        errors.push(format!("unknown action type '{}'", create.action_type));
    }
    if create.target_value.trim().is_empty() {
        errors.push("target value is required".to_string());
    }
    if create.description.trim().is_empty() {
        errors.push("description is required".to_string());
    }
    if create.action_type == "block_ip_nacl" {
        match create.rule_number {
            Some(n) if (1..=32766).contains(&n) => {}
            _ => errors.push("NACL blocks need a rule number between 1 and 32766".to_string()),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Status {
            status: 400,
            message: errors.join(", "),
        })
    }
}

pub async fn list(api: &ApiClient, filters: &MitigationFilters) -> ApiResult<Page<Mitigation>> {
    let mut query = Vec::new();
    if let Some(status) = &filters.status {
        query.push(("status", status.clone()));
    }
    if let Some(action_type) = &filters.action_type {
        query.push(("action_type", action_type.clone()));
    }
    if let Some(report_id) = filters.report_id {
        query.push(("report", report_id.to_string()));
    }
    if let Some(page) = filters.page {
        query.push(("page", page.to_string()));
    }
    api.get("/admin/mitigations/", &query).await
}

pub async fn get(api: &ApiClient, id: i64) -> ApiResult<Mitigation> {
    api.get(&format!("/admin/mitigations/{id}/"), &[]).await
}

pub async fn create(api: &ApiClient, request: &MitigationCreate) -> ApiResult<Mitigation> {
    validate(request)?;
    api.post("/admin/mitigations/", request).await
}

pub async fn update(api: &ApiClient, id: i64, update: &MitigationUpdate) -> ApiResult<Mitigation> {
    api.patch(&format!("/admin/mitigations/{id}/"), update).await
}

pub async fn delete(api: &ApiClient, id: i64) -> ApiResult<()> {
    api.delete(&format!("/admin/mitigations/{id}/")).await
}

pub async fn execute(api: &ApiClient, id: i64) -> ApiResult<ExecuteResponse> {
    api.post(
        &format!("/admin/mitigations/{id}/execute/"),
        &serde_json::json!({}),
    )
    .await
}

pub async fn stats(api: &ApiClient) -> ApiResult<MitigationStats> {
    api.get("/admin/mitigations/stats/", &[]).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_create() -> MitigationCreate {
        MitigationCreate {
            action_type: "block_ip".to_string(),
            target_value: "203.0.113.7".to_string(),
            aws_region: "us-east-1".to_string(),
            description: "block scanner".to_string(),
            report: None,
            rule_number: None,
        }
    }

    #[test]
    fn validate_accepts_a_plain_ip_block() {
        assert!(validate(&base_create()).is_ok());
    }

    #[test]
    fn nacl_block_requires_a_rule_number() {
        let mut create = base_create();
        create.action_type = "block_ip_nacl".to_string();
        assert!(validate(&create).is_err());

        create.rule_number = Some(100);
        assert!(validate(&create).is_ok());

        create.rule_number = Some(40000);
        assert!(validate(&create).is_err());
    }

    #[test]
    fn unknown_action_type_is_rejected() {
        let mut create = base_create();
        create.action_type = "launch_missiles".to_string();
        assert!(validate(&create).is_err());
    }
}
