//! Account service
//!
//! Sign-up, sign-in and the current user's view. Roles come from the
//! configured administrator email or the stored profile.

use std::sync::Arc;

use serde::Deserialize;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::{RateLimiter, Session, create_session_token};
use crate::config::AppConfig;
use crate::data::{Database, EntityId, Profile, Role, User};
use crate::error::AppError;

const MIN_PASSWORD_LEN: usize = 8;

/// Sign-up form
#[derive(Debug, Clone, Deserialize)]
pub struct SignUpInput {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// A freshly issued session
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub token: String,
    pub session: Session,
    pub user: User,
}

fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_ascii_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty() && domain.contains('.') && !domain.contains('@')
        });
    if valid {
        Ok(email)
    } else {
        Err(AppError::Validation("a valid email address is required".to_string()))
    }
}

pub struct AccountService {
    db: Arc<Database>,
    config: Arc<AppConfig>,
    rate_limiter: Arc<RateLimiter>,
}

impl AccountService {
    pub fn new(db: Arc<Database>, config: Arc<AppConfig>, rate_limiter: Arc<RateLimiter>) -> Self {
        Self {
            db,
            config,
            rate_limiter,
        }
    }

    fn role_for(&self, profile: &Profile) -> Role {
        match Role::parse(&profile.role) {
            Role::Admin => Role::Admin,
            Role::Student => Role::for_email(&profile.email, &self.config.admin.email),
        }
    }

    async fn issue(&self, profile: &Profile) -> Result<SignedIn, AppError> {
        let role = self.role_for(profile);
        let session = Session::for_profile(profile, role, self.config.auth.session_max_age);
        let token = create_session_token(&session, &self.config.auth.session_secret)?;

        let enrollments = self.db.list_enrollments_for_user(&profile.id).await?;
        let mut user = User::from_parts(profile, &enrollments);
        user.role = role;

        Ok(SignedIn {
            token,
            session,
            user,
        })
    }

    /// Create an account and sign it in
    ///
    /// # Errors
    /// `Validation` for a malformed form, `Conflict` for a taken email
    pub async fn sign_up(&self, input: SignUpInput) -> Result<SignedIn, AppError> {
        let email = normalize_email(&input.email)?;
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation("name is required".to_string()));
        }
        if input.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if self.db.get_profile_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("email is already registered".to_string()));
        }

        let password = input.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AppError::Internal(e.into()))??;

        let role = Role::for_email(&email, &self.config.admin.email);
        let now = chrono::Utc::now();
        let profile = Profile {
            id: EntityId::new().0,
            email,
            name,
            role: role.as_str().to_string(),
            password_hash,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_profile(&profile).await?;
        tracing::info!(user_id = %profile.id, role = role.as_str(), "Account created");

        self.issue(&profile).await
    }

    /// Check credentials, subject to the per-email attempt limit
    ///
    /// # Errors
    /// `RateLimited` over the limit, `Unauthorized` for bad credentials
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, AppError> {
        let email = email.trim().to_ascii_lowercase();
        self.rate_limiter.check_and_increment(&email).await?;

        let Some(profile) = self.db.get_profile_by_email(&email).await? else {
            tracing::info!("Sign-in failed: unknown email");
            return Err(AppError::Unauthorized);
        };

        let password = password.to_string();
        let stored_hash = profile.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
        if !valid {
            tracing::info!(user_id = %profile.id, "Sign-in failed: wrong password");
            return Err(AppError::Unauthorized);
        }

        self.rate_limiter.reset(&email).await;
        tracing::info!(user_id = %profile.id, "Signed in");
        self.issue(&profile).await
    }

    /// The signed-in user with enrollment sets
    pub async fn me(&self, session: &Session) -> Result<User, AppError> {
        let profile = self
            .db
            .get_profile(&session.user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;
        let enrollments = self.db.list_enrollments_for_user(&profile.id).await?;

        let mut user = User::from_parts(&profile, &enrollments);
        user.role = self.role_for(&profile);
        Ok(user)
    }
}
