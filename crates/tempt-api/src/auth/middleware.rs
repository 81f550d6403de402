use crate::auth::jwt::verify_token;
use crate::auth::models::UserContext;
use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tempt_core::models::{User, UserRole};
use tempt_core::AppError;

use crate::constants::CALLBACK_SECRET_HEADER;

#[derive(Clone)]
pub struct AuthState {
    pub jwt_secret: String,
}

/// `Ok(None)` when no Authorization header is present.
fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AppError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;
    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim())),
        _ => Err(AppError::Unauthorized(
            "Invalid authorization header format".to_string(),
        )),
    }
}

fn authenticate(auth_state: &AuthState, headers: &HeaderMap) -> Result<Option<UserContext>, AppError> {
    match bearer_token(headers)? {
        Some(token) => {
            let claims = verify_token(&auth_state.jwt_secret, token)?;
            Ok(Some(UserContext::from(&claims)))
        }
        None => Ok(None),
    }
}

/// Reject requests without a valid bearer token.
pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(&auth_state, request.headers()) {
        Ok(Some(ctx)) => {
            request.extensions_mut().insert(ctx);
            next.run(request).await
        }
        Ok(None) => {
            tracing::debug!("Missing authorization header");
            HttpAppError(AppError::Unauthorized(
                "Missing authorization header".to_string(),
            ))
            .into_response()
        }
        Err(e) => HttpAppError(e).into_response(),
    }
}

/// Attach the caller's identity when a token is sent; anonymous requests pass through.
pub async fn optional_auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(&auth_state, request.headers()) {
        Ok(Some(ctx)) => {
            request.extensions_mut().insert(ctx);
            next.run(request).await
        }
        Ok(None) => next.run(request).await,
        Err(e) => HttpAppError(e).into_response(),
    }
}

fn require(request: &Request, allowed: fn(&UserRole) -> bool) -> Result<UserContext, AppError> {
    let ctx = request
        .extensions()
        .get::<UserContext>()
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;
    if allowed(&ctx.role) {
        Ok(*ctx)
    } else {
        tracing::warn!(user_id = %ctx.user_id, role = %ctx.role, path = %request.uri().path(), "Role check failed");
        Err(AppError::Forbidden("Insufficient permissions".to_string()))
    }
}

/// The stored account must still hold the role and be in good standing.
fn check_standing(
    user: Option<&User>,
    allowed: fn(&UserRole) -> bool,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let user = user.ok_or_else(|| AppError::Forbidden("Profile not found".to_string()))?;
    if !allowed(&user.role) {
        return Err(AppError::Forbidden("Insufficient permissions".to_string()));
    }
    if user.is_banned {
        return Err(AppError::AccountRestricted("Account is banned".to_string()));
    }
    if user.is_suspended_at(now) {
        return Err(AppError::AccountRestricted("Account is suspended".to_string()));
    }
    Ok(())
}

fn require_staff<'a>(
    state: &'a AppState,
    request: &Request,
    allowed: fn(&UserRole) -> bool,
) -> impl std::future::Future<Output = Result<(), AppError>> + Send + 'a {
    // `Request` is not `Sync`, so it must not be borrowed across an await point.
    let ctx = require(request, allowed);
    async move {
        let ctx = ctx?;
        let user = state.repos.users.get(ctx.user_id).await?;
        check_standing(user.as_ref(), allowed, Utc::now()).inspect_err(|e| {
            tracing::warn!(user_id = %ctx.user_id, error = %e, "Staff account not in good standing");
        })
    }
}

/// Layer for admin-only routes. Must run after `auth_middleware`.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    match require_staff(&state, &request, UserRole::is_admin).await {
        Ok(()) => next.run(request).await,
        Err(e) => HttpAppError(e).into_response(),
    }
}

/// Layer for moderation routes (moderators and admins).
pub async fn require_moderator(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    match require_staff(&state, &request, UserRole::can_moderate).await {
        Ok(()) => next.run(request).await,
        Err(e) => HttpAppError(e).into_response(),
    }
}

/// Shared secret the generation provider signs callbacks with
#[derive(Clone)]
pub struct CallbackAuth {
    pub secret: String,
}

fn check_callback_secret(auth: &CallbackAuth, headers: &HeaderMap) -> Result<(), AppError> {
    let provided = headers
        .get(CALLBACK_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing callback secret".to_string()))?;
    if bool::from(provided.as_bytes().ct_eq(auth.secret.as_bytes())) {
        Ok(())
    } else {
        Err(AppError::Unauthorized("Invalid callback secret".to_string()))
    }
}

/// Guards the provider callback route.
pub async fn callback_auth_middleware(
    State(auth): State<Arc<CallbackAuth>>,
    request: Request,
    next: Next,
) -> Response {
    match check_callback_secret(&auth, request.headers()) {
        Ok(()) => next.run(request).await,
        Err(e) => {
            tracing::warn!(path = %request.uri().path(), "Rejected provider callback");
            HttpAppError(e).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn missing_header_is_anonymous() {
        assert_eq!(bearer_token(&HeaderMap::new()).unwrap(), None);
    }

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(bearer_token(&headers("Bearer abc")).unwrap(), Some("abc"));
        assert!(bearer_token(&headers("Basic abc")).is_err());
        assert!(bearer_token(&headers("Bearer ")).is_err());
    }

    fn staff(role: UserRole) -> User {
        let now = Utc::now();
        User {
            id: uuid::Uuid::new_v4(),
            email: "mod@example.com".to_string(),
            username: "mod".to_string(),
            avatar_url: None,
            role,
            is_banned: false,
            ban_reason: None,
            is_suspended: false,
            suspended_until: None,
            nuts_balance: 0,
            images_generated: 0,
            videos_generated: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn staff_in_good_standing_pass() {
        let now = Utc::now();
        assert!(check_standing(Some(&staff(UserRole::Admin)), UserRole::is_admin, now).is_ok());
        assert!(
            check_standing(Some(&staff(UserRole::Moderator)), UserRole::can_moderate, now).is_ok()
        );
    }

    #[test]
    fn banned_or_suspended_staff_are_restricted() {
        let now = Utc::now();
        let mut banned = staff(UserRole::Admin);
        banned.is_banned = true;
        assert!(matches!(
            check_standing(Some(&banned), UserRole::is_admin, now),
            Err(AppError::AccountRestricted(_))
        ));

        let mut suspended = staff(UserRole::Moderator);
        suspended.is_suspended = true;
        suspended.suspended_until = Some(now + chrono::Duration::hours(2));
        assert!(matches!(
            check_standing(Some(&suspended), UserRole::can_moderate, now),
            Err(AppError::AccountRestricted(_))
        ));

        suspended.suspended_until = Some(now - chrono::Duration::hours(2));
        assert!(check_standing(Some(&suspended), UserRole::can_moderate, now).is_ok());
    }

    #[test]
    fn demoted_or_missing_staff_are_forbidden() {
        let now = Utc::now();
        assert!(matches!(
            check_standing(Some(&staff(UserRole::User)), UserRole::can_moderate, now),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            check_standing(Some(&staff(UserRole::Moderator)), UserRole::is_admin, now),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            check_standing(None, UserRole::is_admin, now),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn callback_secret_must_match_exactly() {
        let auth = CallbackAuth {
            secret: "s3cret-value".to_string(),
        };
        let mut headers = HeaderMap::new();
        assert!(check_callback_secret(&auth, &headers).is_err());

        headers.insert(CALLBACK_SECRET_HEADER, HeaderValue::from_static("s3cret"));
        assert!(check_callback_secret(&auth, &headers).is_err());

        headers.insert(CALLBACK_SECRET_HEADER, HeaderValue::from_static("s3cret-value"));
        assert!(check_callback_secret(&auth, &headers).is_ok());
    }
}
