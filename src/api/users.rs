//! User directory
//!
//! Used to pick task assignees and escalation targets. Listing is the only
//! operation; account management lives in the backend admin.

use crate::api::ApiClient;
use crate::auth::types::{Role, User};
use crate::errors::ApiResult;

#[derive(Debug, Default)]
pub struct UserFilters {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

pub async fn list(api: &ApiClient, filters: &UserFilters) -> ApiResult<Vec<User>> {
    let mut query = Vec::new();
    if let Some(role) = filters.role {
        query.push(("role", role.as_str().to_string()));
    }
    if let Some(active) = filters.is_active {
        query.push(("is_active", active.to_string()));
    }
    api.get("/users/", &query).await
}
