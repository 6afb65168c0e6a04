//! Views and role guards
//!
//! Guarding is a pure decision over a route and a session snapshot; no I/O,
//! no mutation. A role mismatch is not an error surface: the user is sent
//! to their own home view, never to the login screen, as long as the
//! session itself is valid.

use crate::auth::types::Role;

/// Navigable views of the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Root `/`; unconditionally redirects to the login view.
    Root,
    Login,
    Dashboard,
    DashboardAdmin,
    Reports,
    ReportDetail,
    Analyze,
    Tasks,
    CreateTask,
    SendToAdmin,
    Users,
    Mitigations,
    AwsConfig,
}

/// What the shell should do with a navigation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Granted,
    RedirectToLogin,
    RedirectTo(Route),
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Root => "/",
            Route::Login => "/login",
            Route::Dashboard => "/dashboard",
            Route::DashboardAdmin => "/dashboardadmin",
            Route::Reports => "/reports",
            Route::ReportDetail => "/reports/:id",
            Route::Analyze => "/analyze",
            Route::Tasks => "/tasks",
            Route::CreateTask => "/tasks/new",
            Route::SendToAdmin => "/sendtoadmin",
            Route::Users => "/users",
            Route::Mitigations => "/mitigations",
            Route::AwsConfig => "/aws-config",
        }
    }

    /// Roles allowed on this route. Empty slice means unguarded.
    fn required_roles(&self) -> &'static [Role] {
        match self {
            Route::Root | Route::Login => &[],
            Route::Dashboard
            | Route::Reports
            | Route::ReportDetail
            | Route::Analyze
            | Route::Tasks
            | Route::CreateTask
            | Route::SendToAdmin
            | Route::Users => &[Role::Analyst, Role::Admin],
            Route::DashboardAdmin | Route::Mitigations | Route::AwsConfig => &[Role::Admin],
        }
    }
}

/// Home view for a role, used both after login and as the redirect target
/// on a role mismatch.
pub fn home_for(role: Role) -> Route {
    match role {
        Role::Admin => Route::DashboardAdmin,
        Role::Analyst => Route::Dashboard,
    }
}

/// Decide a navigation. `has_token` and `role` are the session snapshot:
/// a missing token makes the session anonymous even if a profile is cached.
pub fn guard(route: Route, has_token: bool, role: Option<Role>) -> GuardDecision {
    // Root always lands on login; the shell redirects onward for
    // authenticated users after the session is restored.
    if route == Route::Root {
        return GuardDecision::RedirectTo(Route::Login);
    }

    let required = route.required_roles();
    if required.is_empty() {
        return GuardDecision::Granted;
    }

    let role = match (has_token, role) {
        (true, Some(role)) => role,
        _ => return GuardDecision::RedirectToLogin,
    };

    if required.contains(&role) {
        GuardDecision::Granted
    } else {
        GuardDecision::RedirectTo(home_for(role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_is_sent_to_login() {
        assert_eq!(
            guard(Route::Dashboard, false, None),
            GuardDecision::RedirectToLogin
        );
        assert_eq!(
            guard(Route::Mitigations, false, None),
            GuardDecision::RedirectToLogin
        );
    }

    #[test]
    fn stale_profile_without_token_is_still_anonymous() {
        assert_eq!(
            guard(Route::Reports, false, Some(Role::Analyst)),
            GuardDecision::RedirectToLogin
        );
    }

    #[test]
    fn analyst_on_an_admin_route_goes_home_not_to_login() {
        assert_eq!(
            guard(Route::Mitigations, true, Some(Role::Analyst)),
            GuardDecision::RedirectTo(Route::Dashboard)
        );
        assert_eq!(
            guard(Route::DashboardAdmin, true, Some(Role::Analyst)),
            GuardDecision::RedirectTo(Route::Dashboard)
        );
    }

    #[test]
    fn admin_on_an_analyst_view_is_granted() {
        assert_eq!(
            guard(Route::Reports, true, Some(Role::Admin)),
            GuardDecision::Granted
        );
    }

    #[test]
    fn user_directory_admits_both_roles() {
        assert_eq!(
            guard(Route::Users, true, Some(Role::Analyst)),
            GuardDecision::Granted
        );
        assert_eq!(
            guard(Route::Users, true, Some(Role::Admin)),
            GuardDecision::Granted
        );
        assert_eq!(guard(Route::Users, false, None), GuardDecision::RedirectToLogin);
    }

    #[test]
    fn admin_routes_admit_admins() {
        assert_eq!(
            guard(Route::AwsConfig, true, Some(Role::Admin)),
            GuardDecision::Granted
        );
    }

    #[test]
    fn login_is_never_guarded() {
        assert_eq!(guard(Route::Login, false, None), GuardDecision::Granted);
        assert_eq!(
            guard(Route::Login, true, Some(Role::Admin)),
            GuardDecision::Granted
        );
    }

    #[test]
    fn root_redirects_to_login() {
        assert_eq!(
            guard(Route::Root, true, Some(Role::Admin)),
            GuardDecision::RedirectTo(Route::Login)
        );
    }

    #[test]
    fn homes_match_roles() {
        assert_eq!(home_for(Role::Admin), Route::DashboardAdmin);
        assert_eq!(home_for(Role::Analyst), Route::Dashboard);
    }
}
