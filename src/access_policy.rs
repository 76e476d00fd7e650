//! Who may reach the admin interface.

use crate::{authentication::Principal, user_role::UserRole};

/// Outcome of checking a request against the admin policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    /// Nobody is logged in: send them to the login form.
    LoginRequired,
    /// Logged in, but not allowed here.
    Forbidden,
}

pub fn has_role(principal: &Principal, role_name: &str) -> bool {
    principal.roles.iter().any(|r| r == role_name)
}

pub fn is_accessible(principal: Option<&Principal>) -> bool {
    match principal {
        Some(p) if p.active => has_role(p, UserRole::Superuser.as_str()),
        _ => false,
    }
}

pub fn evaluate(principal: Option<&Principal>) -> AccessDecision {
    if is_accessible(principal) {
        AccessDecision::Granted
    } else if principal.is_some() {
        AccessDecision::Forbidden
    } else {
        AccessDecision::LoginRequired
    }
}
