//! Role-based access decisions, independent of the transport layer.

use super::AuthUser;
use crate::entities::{order, user::UserRole};
use crate::errors::ServiceError;

/// Owner-or-admin gate governing order detail views and cancellation.
pub fn can_access_order(identity: &AuthUser, order: &order::Model) -> bool {
    identity.role == UserRole::Admin || identity.id == order.user_id
}

/// Admin gate for status/payment mutation and back-office listings.
pub fn can_manage(identity: &AuthUser) -> bool {
    identity.role == UserRole::Admin
}

/// Capability-set check: the identity's role must be in the allowed set.
pub fn require_role(identity: &AuthUser, allowed: &[UserRole]) -> Result<(), ServiceError> {
    if allowed.contains(&identity.role) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden("Access denied".to_string()))
    }
}
