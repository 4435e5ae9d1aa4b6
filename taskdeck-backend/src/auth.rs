//! Identity capability.
//!
//! The auth service is external; the core consumes only the signed-in
//! user's opaque id and role. [`StaticIdentity`] is the fixed-identity
//! provider used by tests and the demo binary.

use taskdeck_model::UserRole;

/// The signed-in user as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    /// Opaque user id.
    pub id: String,
    /// Role, used for board-visibility decisions only.
    pub role: UserRole,
}

/// Identity provider capability.
pub trait Identity: Send + Sync {
    /// Returns the signed-in user, or `None` when signed out.
    fn current_user(&self) -> Option<CurrentUser>;
}

/// Identity provider with a fixed signed-in user.
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    user: CurrentUser,
}

impl StaticIdentity {
    /// Creates a provider that always reports the given user.
    #[must_use]
    pub fn new(id: impl Into<String>, role: UserRole) -> Self {
        Self {
            user: CurrentUser {
                id: id.into(),
                role,
            },
        }
    }
}

impl Identity for StaticIdentity {
    fn current_user(&self) -> Option<CurrentUser> {
        Some(self.user.clone())
    }
}
