use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use tracing::instrument;
use utoipa::ToSchema;

use atrium_core::AppError;
use atrium_models::{
    AccessQuery, AccessResponse, LoginRequest, LoginResponse, NavigationResponse,
    PermissionsResponse, SessionUser,
};

use crate::middleware::auth::CurrentUser;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service::AuthService;

#[derive(ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Login and receive a session token
///
/// The token is returned in the body and set as an http-only cookie.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Bad request - malformed body", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(dto): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    let response = AuthService::login(state.store.as_ref(), dto, &state.session_config).await?;

    let cookie = Cookie::build((
        state.session_config.cookie_name.clone(),
        response.access_token.clone(),
    ))
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .secure(state.session_config.secure_cookie);

    Ok((jar.add(cookie), Json(response)))
}

/// Clear the session cookie
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 204, description = "Session cookie cleared")
    ),
    tag = "Authentication"
)]
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, StatusCode) {
    let cookie = Cookie::build((state.session_config.cookie_name.clone(), "")).path("/");
    (jar.remove(cookie), StatusCode::NO_CONTENT)
}

/// Get the current user
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = SessionUser),
        (status = 401, description = "Unauthorized - missing or invalid session", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Authentication"
)]
pub async fn me(CurrentUser(user): CurrentUser) -> Json<SessionUser> {
    Json(user)
}

/// Get the caller's effective permissions
#[utoipa::path(
    get,
    path = "/api/auth/permissions",
    responses(
        (status = 200, description = "Sorted permission names", body = PermissionsResponse),
        (status = 401, description = "Unauthorized - missing or invalid session", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Authentication"
)]
#[instrument(skip_all)]
pub async fn permissions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<PermissionsResponse>, AppError> {
    let permissions = AuthService::permissions(state.store.as_ref(), &user).await?;
    Ok(Json(PermissionsResponse { permissions }))
}

/// Get the navigation visible to the caller
#[utoipa::path(
    get,
    path = "/api/auth/navigation",
    responses(
        (status = 200, description = "Filtered navigation sections", body = NavigationResponse),
        (status = 401, description = "Unauthorized - missing or invalid session", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Authentication"
)]
#[instrument(skip_all)]
pub async fn navigation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<NavigationResponse>, AppError> {
    let sections = AuthService::navigation(state.store.as_ref(), &state.navigation, &user).await?;
    Ok(Json(NavigationResponse { sections }))
}

/// Check whether the caller may open a back-office path
#[utoipa::path(
    get,
    path = "/api/auth/access",
    params(AccessQuery),
    responses(
        (status = 200, description = "Required permission and verdict", body = AccessResponse),
        (status = 401, description = "Unauthorized - missing or invalid session", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Authentication"
)]
#[instrument(skip_all)]
pub async fn access(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<AccessQuery>,
) -> Result<Json<AccessResponse>, AppError> {
    let response =
        AuthService::access(state.store.as_ref(), &state.navigation, &user, &query.path).await?;
    Ok(Json(response))
}
