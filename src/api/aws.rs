//! AWS configuration and infrastructure status (admin only)
//!
//! One configuration is active at a time; the backend runs mitigations
//! against it. Secret keys are write-only: the backend never echoes them
//! back, so `aws_secret_key` is optional on reads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::ApiClient;
use crate::errors::ApiResult;

#[derive(Debug, Serialize, Deserialize)]
pub struct AwsConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub aws_access_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_secret_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_session_token: Option<String>,
    pub aws_region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isolation_sg_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nacl_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waf_web_acl_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waf_ip_set_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_firewall_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_group_name: Option<String>,
    #[serde(default)]
    pub auto_block_enabled: bool,
    #[serde(default)]
    pub auto_block_threshold: u32,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Partial configuration update; only set fields are sent. Supplying a new
/// secret key replaces it, omitting it leaves the stored one alone.
#[derive(Debug, Default, Serialize)]
pub struct AwsConfigurationUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_access_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_secret_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_block_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_block_threshold: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct TestCredentialsResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub regions: Option<Vec<String>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Discovered resources keyed by kind (`vpcs`, `security_groups`, …).
/// Shapes vary per kind so the payload stays untyped.
#[derive(Debug, Deserialize)]
pub struct ResourcesResponse {
    pub success: bool,
    #[serde(default)]
    pub resources: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetActiveResponse {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub configuration: Option<AwsConfiguration>,
}

#[derive(Debug, Deserialize)]
pub struct AwsStatus {
    pub configured: bool,
    #[serde(default)]
    pub connected: Option<bool>,
    #[serde(default)]
    pub credentials_valid: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub config: Option<Value>,
    #[serde(default)]
    pub vpc_info: Option<Value>,
    #[serde(default)]
    pub security_group: Option<Value>,
    #[serde(default)]
    pub last_check: Option<String>,
}

pub async fn list_configurations(api: &ApiClient) -> ApiResult<Vec<AwsConfiguration>> {
    api.get("/admin/aws-config/", &[]).await
}

pub async fn get_configuration(api: &ApiClient, id: i64) -> ApiResult<AwsConfiguration> {
    api.get(&format!("/admin/aws-config/{id}/"), &[]).await
}

pub async fn active_configuration(api: &ApiClient) -> ApiResult<AwsConfiguration> {
    api.get("/admin/aws-config/active/", &[]).await
}

pub async fn create_configuration(
    api: &ApiClient,
    config: &AwsConfiguration,
) -> ApiResult<AwsConfiguration> {
    api.post("/admin/aws-config/", config).await
}

pub async fn update_configuration(
    api: &ApiClient,
    id: i64,
    update: &AwsConfigurationUpdate,
) -> ApiResult<AwsConfiguration> {
    api.patch(&format!("/admin/aws-config/{id}/"), update).await
}

pub async fn delete_configuration(api: &ApiClient, id: i64) -> ApiResult<()> {
    api.delete(&format!("/admin/aws-config/{id}/")).await
}

pub async fn test_credentials(api: &ApiClient, id: i64) -> ApiResult<TestCredentialsResponse> {
    api.post(
        &format!("/admin/aws-config/{id}/test_credentials/"),
        &serde_json::json!({}),
    )
    .await
}

pub async fn get_resources(api: &ApiClient, id: i64) -> ApiResult<ResourcesResponse> {
    api.get(&format!("/admin/aws-config/{id}/get_resources/"), &[])
        .await
}

pub async fn set_active(api: &ApiClient, id: i64) -> ApiResult<SetActiveResponse> {
    api.post(
        &format!("/admin/aws-config/{id}/set_active/"),
        &serde_json::json!({}),
    )
    .await
}

pub async fn status(api: &ApiClient) -> ApiResult<AwsStatus> {
    api.get("/admin/aws-status/", &[]).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_roundtrips_without_secret() {
        let config: AwsConfiguration = serde_json::from_str(
            r#"{
                "id": 2,
                "name": "prod",
                "aws_access_key": "AKIAEXAMPLE",
                "aws_region": "eu-west-1",
                "auto_block_enabled": true,
                "auto_block_threshold": 80,
                "is_active": true
            }"#,
        )
        .unwrap();
        assert!(config.aws_secret_key.is_none());

        // Serializing back must not invent a secret-key field.
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("aws_secret_key"));
    }

    #[test]
    fn configuration_update_serializes_only_set_fields() {
        let update = AwsConfigurationUpdate {
            aws_region: Some("eu-central-1".to_string()),
            auto_block_enabled: Some(false),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_string(&update).unwrap(),
            r#"{"aws_region":"eu-central-1","auto_block_enabled":false}"#
        );
    }

    #[test]
    fn status_parses_unconfigured_response() {
        let status: AwsStatus =
            serde_json::from_str(r#"{"configured": false, "message": "no active config"}"#)
                .unwrap();
        assert!(!status.configured);
        assert!(status.connected.is_none());
    }
}
