use std::collections::BTreeSet;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use axum_extra::extract::CookieJar;
use tracing::debug;

use atrium_auth::verify_session_token;
use atrium_core::permissions::{
    ROLES_DELETE, ROLES_READ, ROLES_WRITE, USERS_DELETE, USERS_READ, USERS_WRITE,
};
use atrium_core::{AppError, AuthError};
use atrium_models::{SessionUser, UserId};
use atrium_observability::track_authorization_check;

use crate::state::AppState;
use crate::store::AuthzStore;

/// Session token from the `Authorization` header, else from the session cookie.
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(cookie_name)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

/// Resolves the caller's session to a stored user.
///
/// # Errors
///
/// [`AuthError::Unauthenticated`] when no token is present, the token does not
/// verify, or its user no longer exists. [`AuthError::Backend`] when the store
/// fails.
pub async fn require_user(headers: &HeaderMap, state: &AppState) -> Result<SessionUser, AuthError> {
    let token = session_token(headers, &state.session_config.cookie_name)
        .ok_or(AuthError::Unauthenticated("Missing session"))?;

    let claims = verify_session_token(&token, &state.session_config)?;
    let user_id = UserId::from(claims.user_id()?);

    let user = state
        .store
        .find_user(user_id)
        .await?
        .ok_or(AuthError::Unauthenticated("Session user no longer exists"))?;

    Ok(SessionUser::from(user))
}

/// Resolves the caller and checks that one of their roles grants `permission`.
///
/// # Errors
///
/// Everything [`require_user`] returns, plus [`AuthError::Forbidden`] naming
/// `permission` when the user lacks it.
pub async fn require_permission(
    headers: &HeaderMap,
    state: &AppState,
    permission: &str,
) -> Result<SessionUser, AuthError> {
    let user = require_user(headers, state).await?;
    let permissions = get_user_permissions(state.store.as_ref(), user.id).await?;

    let allowed = permissions.contains(permission);
    track_authorization_check(permission, allowed);

    if !allowed {
        debug!(user_id = %user.id, permission, "Permission denied");
        return Err(AuthError::forbidden(permission));
    }

    Ok(user)
}

/// Effective permission set of a user: the union over all assigned roles.
/// Empty when the user holds no role.
pub async fn get_user_permissions(
    store: &dyn AuthzStore,
    user_id: UserId,
) -> Result<BTreeSet<String>, AuthError> {
    Ok(store.user_permission_names(user_id).await?)
}

/// Extractor for any authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub SessionUser);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = require_user(&parts.headers, state).await?;
        Ok(CurrentUser(user))
    }
}

/// Declares an extractor that only admits callers holding `$permission`.
#[macro_export]
macro_rules! require_permission {
    ($name:ident, $permission:expr) => {
        #[derive(Debug, Clone)]
        pub struct $name(pub $crate::atrium_models::SessionUser);

        impl axum::extract::FromRequestParts<$crate::state::AppState> for $name {
            type Rejection = $crate::atrium_core::AppError;

            async fn from_request_parts(
                parts: &mut axum::http::request::Parts,
                state: &$crate::state::AppState,
            ) -> Result<Self, Self::Rejection> {
                let user = $crate::middleware::auth::require_permission(
                    &parts.headers,
                    state,
                    $permission,
                )
                .await?;

                Ok($name(user))
            }
        }
    };
}

// Users permissions
require_permission!(RequireUsersRead, USERS_READ);
require_permission!(RequireUsersWrite, USERS_WRITE);
require_permission!(RequireUsersDelete, USERS_DELETE);

// Roles permissions (also guard permissions, the catalog and the sync)
require_permission!(RequireRolesRead, ROLES_READ);
require_permission!(RequireRolesWrite, ROLES_WRITE);
require_permission!(RequireRolesDelete, ROLES_DELETE);
