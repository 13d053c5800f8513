//! Authentication and authorization module

pub mod gate;
pub mod jwt;
pub mod middleware;
pub mod password;

pub use gate::{AuthGate, Principal};
pub use jwt::{Claims, JwtService, TokenError, TokenKind, TokenPair};
pub use middleware::{extract_token, require_auth, AdminPrincipal};
pub use password::PasswordHasher;
