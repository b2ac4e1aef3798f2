//! Authentication and authorization
//!
//! Handles:
//! - Password hashing (argon2id)
//! - Session tokens (HMAC-signed, stateless)
//! - Authentication extractors
//! - Capability policy
//! - Sign-in rate limiting

mod capability;
mod middleware;
pub mod password;
mod rate_limit;
pub mod session;

pub use capability::Capability;
pub use middleware::{CurrentUser, MaybeUser, SESSION_COOKIE, require_capability};
pub use rate_limit::RateLimiter;
pub use session::{Session, create_session_token, verify_session_token};
