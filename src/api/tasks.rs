//! Remediation tasks
//!
//! Tasks hang off a report and are assigned to a user. Creation takes ids;
//! reads come back with the related objects embedded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::ApiClient;
use crate::errors::ApiResult;

#[derive(Debug, Deserialize)]
pub struct TaskReportRef {
    pub id: i64,
    pub input_value: String,
}

#[derive(Debug, Deserialize)]
pub struct TaskUserRef {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub priority: String,
    pub status: String,
    #[serde(default)]
    pub report: Option<TaskReportRef>,
    #[serde(default)]
    pub assigned_to: Option<TaskUserRef>,
    #[serde(default)]
    pub created_by: Option<TaskUserRef>,
    #[serde(default)]
    pub due_date: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct TaskCreateRequest {
    pub title: String,
    pub description: String,
    pub priority: String,
    pub assigned_to_id: i64,
    pub report_id: i64,
    pub due_date: String,
}

/// Partial update; only set fields are sent.
#[derive(Debug, Default, Serialize)]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

#[derive(Debug, Default)]
pub struct TaskFilters {
    pub status: Option<String>,
    pub priority: Option<String>,
}

pub async fn list(api: &ApiClient, filters: &TaskFilters) -> ApiResult<Vec<Task>> {
    let mut query = Vec::new();
    if let Some(status) = &filters.status {
        query.push(("status", status.clone()));
    }
    if let Some(priority) = &filters.priority {
        query.push(("priority", priority.clone()));
    }
    api.get("/tasks/", &query).await
}

pub async fn get(api: &ApiClient, id: i64) -> ApiResult<Task> {
    api.get(&format!("/tasks/{id}/"), &[]).await
}

pub async fn create(api: &ApiClient, request: &TaskCreateRequest) -> ApiResult<Task> {
    api.post("/tasks/", request).await
}

pub async fn update(api: &ApiClient, id: i64, update: &TaskUpdate) -> ApiResult<Task> {
    api.patch(&format!("/tasks/{id}/"), update).await
}

pub async fn delete(api: &ApiClient, id: i64) -> ApiResult<()> {
    api.delete(&format!("/tasks/{id}/")).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_serializes_only_set_fields() {
        let update = TaskUpdate {
            status: Some("completed".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_string(&update).unwrap(),
            r#"{"status":"completed"}"#
        );
    }

    #[test]
    fn task_parses_with_embedded_refs() {
        let task: Task = serde_json::from_str(
            r#"{
                "id": 4,
                "title": "Block the IP",
                "description": "Seen in report 7",
                "priority": "high",
                "status": "pending",
                "report": {"id": 7, "input_value": "203.0.113.7"},
                "assigned_to": {"id": 2, "username": "amal", "email": "a@x.io"},
                "created_at": "2026-05-01T10:00:00Z"
            }"#,
        )
        .unwrap();
        assert_eq!(task.report.unwrap().id, 7);
        assert_eq!(task.assigned_to.unwrap().username, "amal");
    }
}
