use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use atrium_core::{AppError, Paginated, PaginationParams};
use atrium_models::{CreateUserDto, UpdateUserDto, UserId, UserWithRole};

use crate::middleware::auth::{RequireUsersDelete, RequireUsersRead, RequireUsersWrite};
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service;

/// List users with their role
#[utoipa::path(
    get,
    path = "/api/admin/users",
    params(PaginationParams),
    responses(
        (status = 200, description = "Page of users", body = Paginated<UserWithRole>),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden - missing users:read", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
#[instrument(skip(state, _auth))]
pub async fn get_users(
    State(state): State<AppState>,
    _auth: RequireUsersRead,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Paginated<UserWithRole>>, AppError> {
    let users = service::list_users(state.store.as_ref(), &params).await?;
    Ok(Json(users))
}

/// Get a user by id
#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    params(("id" = UserId, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserWithRole),
        (status = 403, description = "Forbidden - missing users:read", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
#[instrument(skip(state, _auth))]
pub async fn get_user(
    State(state): State<AppState>,
    _auth: RequireUsersRead,
    Path(id): Path<UserId>,
) -> Result<Json<UserWithRole>, AppError> {
    let user = service::get_user(state.store.as_ref(), id).await?;
    Ok(Json(user))
}

/// Create a user
#[utoipa::path(
    post,
    path = "/api/admin/users",
    request_body = CreateUserDto,
    responses(
        (status = 201, description = "User created", body = UserWithRole),
        (status = 403, description = "Forbidden - missing users:write", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 422, description = "Validation error or unknown role", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
#[instrument(skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    _auth: RequireUsersWrite,
    ValidatedJson(dto): ValidatedJson<CreateUserDto>,
) -> Result<(StatusCode, Json<UserWithRole>), AppError> {
    let user = service::create_user(state.store.as_ref(), dto).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Update a user's name or role
///
/// `roleId` absent keeps the role, `null` clears it, an id replaces it.
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}",
    params(("id" = UserId, Path, description = "User id")),
    request_body = UpdateUserDto,
    responses(
        (status = 200, description = "User updated", body = UserWithRole),
        (status = 403, description = "Forbidden - missing users:write", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 422, description = "Validation error or unknown role", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
#[instrument(skip(state, _auth))]
pub async fn update_user(
    State(state): State<AppState>,
    _auth: RequireUsersWrite,
    Path(id): Path<UserId>,
    ValidatedJson(dto): ValidatedJson<UpdateUserDto>,
) -> Result<Json<UserWithRole>, AppError> {
    let user = service::update_user(state.store.as_ref(), id, dto).await?;
    Ok(Json(user))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    params(("id" = UserId, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Forbidden - missing users:delete", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
#[instrument(skip(state, _auth))]
pub async fn delete_user(
    State(state): State<AppState>,
    _auth: RequireUsersDelete,
    Path(id): Path<UserId>,
) -> Result<StatusCode, AppError> {
    service::delete_user(state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
