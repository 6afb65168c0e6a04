//! Admin dashboard stats and analytics

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::api::ApiClient;
use crate::errors::ApiResult;

#[derive(Debug, Deserialize)]
pub struct Overview {
    pub total_reports: u64,
    pub pending_reports: u64,
    pub critical_reports: u64,
    pub mitigated_reports: u64,
}

#[derive(Debug, Deserialize)]
pub struct Trends {
    pub today: u64,
    pub this_week: u64,
    pub this_month: u64,
}

#[derive(Debug, Deserialize)]
pub struct TaskCounts {
    pub open: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub urgent: u64,
}

#[derive(Debug, Deserialize)]
pub struct MitigationCounts {
    pub pending: u64,
    pub completed: u64,
    pub failed: u64,
}

#[derive(Debug, Deserialize)]
pub struct TopThreat {
    pub input_value: String,
    pub input_type: String,
    pub severity: String,
    pub count: u64,
}

#[derive(Debug, Deserialize)]
pub struct DashboardStats {
    pub overview: Overview,
    #[serde(default)]
    pub severity_distribution: HashMap<String, u64>,
    #[serde(default)]
    pub status_distribution: HashMap<String, u64>,
    pub trends: Trends,
    pub tasks: TaskCounts,
    pub mitigations: MitigationCounts,
    #[serde(default)]
    pub top_threats: Vec<TopThreat>,
    #[serde(default)]
    pub recent_critical: Vec<Value>,
}

/// Analytics filters; unset fields are left off the query string.
#[derive(Debug, Default)]
pub struct AnalyticsFilters {
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub severity: Option<String>,
}

pub async fn stats(api: &ApiClient) -> ApiResult<DashboardStats> {
    api.get("/admin/dashboard/", &[]).await
}

/// Analytics payload is report-shape dependent; callers pick what they need.
pub async fn analytics(api: &ApiClient, filters: &AnalyticsFilters) -> ApiResult<Value> {
    let mut query = Vec::new();
    if let Some(from) = &filters.date_from {
        query.push(("date_from", from.clone()));
    }
    if let Some(to) = &filters.date_to {
        query.push(("date_to", to.clone()));
    }
    if let Some(severity) = &filters.severity {
        query.push(("severity", severity.clone()));
    }
    api.get("/admin/analytics/", &query).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_parse_a_full_payload() {
        let stats: DashboardStats = serde_json::from_str(
            r#"{
                "overview": {"total_reports": 120, "pending_reports": 8,
                             "critical_reports": 3, "mitigated_reports": 40},
                "severity_distribution": {"critical": 3, "high": 20},
                "status_distribution": {"pending_review": 8},
                "trends": {"today": 4, "this_week": 22, "this_month": 67},
                "tasks": {"open": 5, "in_progress": 2, "completed": 30, "urgent": 1},
                "mitigations": {"pending": 2, "completed": 11, "failed": 0},
                "top_threats": [{"input_value": "203.0.113.7", "input_type": "ip",
                                 "severity": "high", "count": 6}],
                "recent_critical": []
            }"#,
        )
        .unwrap();
        assert_eq!(stats.overview.total_reports, 120);
        assert_eq!(stats.top_threats[0].count, 6);
        assert_eq!(stats.severity_distribution["high"], 20);
    }
}
