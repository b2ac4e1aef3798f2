//! Session management
//!
//! Uses HMAC-signed tokens stored in cookies or sent as bearer tokens.
//! No server-side session storage needed.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::capability::Capability;
use crate::data::{Profile, Role};
use crate::error::AppError;

/// User session data
///
/// Stored in a signed token. Contains the minimal identity needed to
/// authorize a request without a database round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    /// When session was created
    pub created_at: DateTime<Utc>,
    /// When session expires
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Start a session for a stored profile
    pub fn for_profile(profile: &Profile, role: Role, max_age_secs: i64) -> Self {
        let now = Utc::now();
        Self {
            user_id: profile.id.clone(),
            email: profile.email.clone(),
            name: profile.name.clone(),
            role,
            created_at: now,
            expires_at: now + Duration::seconds(max_age_secs),
        }
    }

    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }

    /// Authorize one operation
    ///
    /// # Errors
    /// `Forbidden` when the session's role lacks `capability`
    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        if self.role.grants(capability) {
            Ok(())
        } else {
            tracing::warn!(
                user_id = %self.user_id,
                role = self.role.as_str(),
                ?capability,
                "Capability denied"
            );
            Err(AppError::Forbidden)
        }
    }
}

/// Create a signed session token
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
pub fn create_session_token(session: &Session, secret: &str) -> Result<String, AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    // 1. Serialize session to JSON
    let payload = serde_json::to_string(session).map_err(|e| AppError::Internal(e.into()))?;

    // 2. Base64 encode the payload
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    // 3. Create HMAC-SHA256 signature
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Encryption(e.to_string()))?;
    mac.update(payload_b64.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    // 4. Return "{payload}.{signature}"
    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a session token
///
/// # Errors
/// Returns `Unauthorized` if the signature is invalid, the token is
/// malformed, or the session has expired
pub fn verify_session_token(token: &str, secret: &str) -> Result<Session, AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let (payload_b64, signature_b64) = token.split_once('.').ok_or(AppError::Unauthorized)?;
    if signature_b64.contains('.') {
        return Err(AppError::Unauthorized);
    }

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Encryption(e.to_string()))?;
    mac.update(payload_b64.as_bytes());

    let expected_signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::Unauthorized)?;

    mac.verify_slice(&expected_signature)
        .map_err(|_| AppError::Unauthorized)?;

    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AppError::Unauthorized)?;

    let session: Session =
        serde_json::from_slice(&payload_bytes).map_err(|_| AppError::Unauthorized)?;

    if session.is_expired() {
        return Err(AppError::Unauthorized);
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn session(role: Role, expires_in: Duration) -> Session {
        let now = Utc::now();
        Session {
            user_id: "u1".to_string(),
            email: "student@inst.example".to_string(),
            name: "Student".to_string(),
            role,
            created_at: now,
            expires_at: now + expires_in,
        }
    }

    #[test]
    fn token_round_trip() {
        let token = create_session_token(&session(Role::Admin, Duration::hours(1)), SECRET).unwrap();
        let decoded = verify_session_token(&token, SECRET).unwrap();
        assert_eq!(decoded.user_id, "u1");
        assert_eq!(decoded.role, Role::Admin);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let token =
            create_session_token(&session(Role::Student, Duration::hours(1)), SECRET).unwrap();
        let forged = create_session_token(&session(Role::Admin, Duration::hours(1)), SECRET)
            .unwrap();
        let (forged_payload, _) = forged.split_once('.').unwrap();
        let (_, signature) = token.split_once('.').unwrap();

        assert!(matches!(
            verify_session_token(&format!("{forged_payload}.{signature}"), SECRET),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token =
            create_session_token(&session(Role::Student, Duration::hours(1)), SECRET).unwrap();
        assert!(verify_session_token(&token, "another-secret-another-secret-xx").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token =
            create_session_token(&session(Role::Student, Duration::seconds(-5)), SECRET).unwrap();
        assert!(matches!(
            verify_session_token(&token, SECRET),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn require_enforces_role_capabilities() {
        let student = session(Role::Student, Duration::hours(1));
        assert!(student.require(Capability::TrackOwnLearning).is_ok());
        assert!(matches!(
            student.require(Capability::ReviewCompletions),
            Err(AppError::Forbidden)
        ));

        let admin = session(Role::Admin, Duration::hours(1));
        assert!(admin.require(Capability::ReviewCompletions).is_ok());
    }
}
