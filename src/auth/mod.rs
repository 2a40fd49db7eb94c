//! Authentication
//!
//! JWT bearer authentication. The boundary's only contract with the
//! checkout core is a stable, non-empty caller identity.

pub mod extractor;
pub mod jwt;

pub use jwt::{Claims, JwtConfig, JwtError, JwtService};

/// Authenticated caller, extracted from a validated token
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
    pub role: String,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            username: claims.username,
            role: claims.role,
        }
    }
}
