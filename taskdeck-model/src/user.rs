//! User identity types consumed from the auth service.
//!
//! The core treats the user id as an opaque string. The role gates
//! board visibility only (admins are routed to administrative views,
//! not the drag board); access control is enforced server side.

use serde::{Deserialize, Serialize};

/// Role reported by the auth service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Administrative user.
    Admin,
    /// Regular member.
    Member,
}

impl UserRole {
    /// Whether this role sees the drag board. Admins land on the
    /// administrative views instead.
    #[must_use]
    pub const fn can_view_board(self) -> bool {
        matches!(self, Self::Member)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Member => write!(f, "member"),
        }
    }
}
