//! Authentication middleware
//!
//! Resolves the caller's session from a bearer token or the session cookie.

use axum::{
    async_trait,
    body::Body,
    extract::{FromRef, FromRequestParts, State},
    http::{HeaderMap, Request, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use super::capability::Capability;
use super::session::{Session, verify_session_token};
use crate::AppState;
use crate::error::AppError;

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "session";

fn extract_token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(ToOwned::to_owned)
        .or_else(|| {
            let jar = CookieJar::from_headers(headers);
            jar.get(SESSION_COOKIE)
                .map(|cookie| cookie.value().to_owned())
        })
}

fn authenticate_headers(headers: &HeaderMap, state: &AppState) -> Result<Session, AppError> {
    let token = extract_token_from_headers(headers).ok_or(AppError::Unauthorized)?;
    verify_session_token(&token, &state.config.auth.session_secret)
}

/// Middleware requiring a session holding `capability`
///
/// Inserts the Session into request extensions so handlers can reuse it.
///
/// # Usage
/// ```ignore
/// let routes = Router::new()
///     .route("/metrics", get(metrics_handler))
///     .layer(middleware::from_fn_with_state(
///         state,
///         |state: State<AppState>, request: Request<Body>, next: Next| {
///             require_capability(Capability::ViewMetrics, state, request, next)
///         },
///     ));
/// ```
pub async fn require_capability(
    capability: Capability,
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let session = authenticate_headers(request.headers(), &state)?;
    session.require(capability)?;

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

/// Extractor for current authenticated user
///
/// # Usage
/// ```ignore
/// async fn handler(CurrentUser(session): CurrentUser) -> impl IntoResponse {
///     format!("Hello, {}", session.name)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>().cloned() {
            return Ok(CurrentUser(session));
        }

        let state = AppState::from_ref(state);
        let session = authenticate_headers(&parts.headers, &state)?;
        parts.extensions.insert(session.clone());

        Ok(CurrentUser(session))
    }
}

/// Optional current user extractor
///
/// Returns None if not authenticated, instead of error.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Session>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>().cloned() {
            return Ok(MaybeUser(Some(session)));
        }

        let app_state = AppState::from_ref(state);
        let session = authenticate_headers(&parts.headers, &app_state).ok();

        if let Some(session) = &session {
            parts.extensions.insert(session.clone());
        }

        Ok(MaybeUser(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Bearer abc.def"));
        headers.insert("Cookie", HeaderValue::from_static("session=cookie.token"));

        assert_eq!(
            extract_token_from_headers(&headers).as_deref(),
            Some("abc.def")
        );
    }

    #[test]
    fn session_cookie_is_used_without_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Cookie",
            HeaderValue::from_static("theme=dark; session=cookie.token"),
        );

        assert_eq!(
            extract_token_from_headers(&headers).as_deref(),
            Some("cookie.token")
        );
    }

    #[test]
    fn missing_credentials_yield_none() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Basic xyz"));
        assert!(extract_token_from_headers(&headers).is_none());
    }
}
