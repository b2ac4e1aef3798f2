//! Sign-up, sign-in and session endpoints
//!
//! The session token is returned in the body for bearer clients and set as
//! an HttpOnly cookie for browsers.

use axum::{Json, Router, extract::State, routing::{get, post}};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};

use super::dto::{AuthResponse, SessionResponse, SignInRequest};
use crate::AppState;
use crate::auth::{MaybeUser, SESSION_COOKIE};
use crate::error::AppError;
use crate::service::{SignUpInput, SignedIn};

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(state.config.should_use_secure_cookies())
        .same_site(SameSite::Lax)
        .build()
}

fn signed_in(state: &AppState, jar: CookieJar, signed: SignedIn) -> (CookieJar, Json<AuthResponse>) {
    let jar = jar.add(session_cookie(state, signed.token.clone()));
    (
        jar,
        Json(AuthResponse {
            token: signed.token,
            user: signed.user,
        }),
    )
}

/// POST /api/auth/sign_up
async fn sign_up(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(input): Json<SignUpInput>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let signed = state.accounts().sign_up(input).await?;
    Ok(signed_in(&state, jar, signed))
}

/// POST /api/auth/sign_in
async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<SignInRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let signed = state
        .accounts()
        .sign_in(&request.email, &request.password)
        .await?;
    Ok(signed_in(&state, jar, signed))
}

/// POST /api/auth/sign_out
///
/// Tokens are stateless; signing out only drops the cookie.
async fn sign_out(jar: CookieJar) -> (CookieJar, Json<SessionResponse>) {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Json(SessionResponse { user: None }))
}

/// GET /api/auth/session
async fn session(
    State(state): State<AppState>,
    MaybeUser(session): MaybeUser,
) -> Result<Json<SessionResponse>, AppError> {
    let user = match session {
        Some(session) => match state.accounts().me(&session).await {
            Ok(user) => Some(user),
            // Token outlived its profile
            Err(AppError::Unauthorized) => None,
            Err(error) => return Err(error),
        },
        None => None,
    };
    Ok(Json(SessionResponse { user }))
}

pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/auth/sign_up", post(sign_up))
        .route("/auth/sign_in", post(sign_in))
        .route("/auth/sign_out", post(sign_out))
        .route("/auth/session", get(session))
}
