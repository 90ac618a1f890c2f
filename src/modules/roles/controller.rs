use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use atrium_core::{AppError, Paginated, PaginationParams};
use atrium_models::{
    CreatePermissionDto, CreateRoleDto, Permission, PermissionId, RoleId, RoleWithPermissions,
    UpdatePermissionDto, UpdateRoleDto,
};

use crate::middleware::auth::{RequireRolesDelete, RequireRolesRead, RequireRolesWrite};
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service;

// ============ Role Handlers ============

/// List roles with their permissions and user counts
#[utoipa::path(
    get,
    path = "/api/admin/roles",
    params(PaginationParams),
    responses(
        (status = 200, description = "Page of roles", body = Paginated<RoleWithPermissions>),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden - missing roles:read", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Roles"
)]
#[instrument(skip(state, _auth))]
pub async fn get_roles(
    State(state): State<AppState>,
    _auth: RequireRolesRead,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Paginated<RoleWithPermissions>>, AppError> {
    let roles = service::list_roles(state.store.as_ref(), &params).await?;
    Ok(Json(roles))
}

/// Get a role by id
#[utoipa::path(
    get,
    path = "/api/admin/roles/{id}",
    params(("id" = RoleId, Path, description = "Role id")),
    responses(
        (status = 200, description = "Role", body = RoleWithPermissions),
        (status = 403, description = "Forbidden - missing roles:read", body = ErrorResponse),
        (status = 404, description = "Role not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Roles"
)]
#[instrument(skip(state, _auth))]
pub async fn get_role(
    State(state): State<AppState>,
    _auth: RequireRolesRead,
    Path(id): Path<RoleId>,
) -> Result<Json<RoleWithPermissions>, AppError> {
    let role = service::get_role(state.store.as_ref(), id).await?;
    Ok(Json(role))
}

/// Create a role, optionally with its initial permissions
#[utoipa::path(
    post,
    path = "/api/admin/roles",
    request_body = CreateRoleDto,
    responses(
        (status = 201, description = "Role created", body = RoleWithPermissions),
        (status = 403, description = "Forbidden - missing roles:write", body = ErrorResponse),
        (status = 409, description = "Role name already exists", body = ErrorResponse),
        (status = 422, description = "Validation error or unknown permission id", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Roles"
)]
#[instrument(skip(state, _auth))]
pub async fn create_role(
    State(state): State<AppState>,
    _auth: RequireRolesWrite,
    ValidatedJson(dto): ValidatedJson<CreateRoleDto>,
) -> Result<(StatusCode, Json<RoleWithPermissions>), AppError> {
    let role = service::create_role(state.store.as_ref(), dto).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

/// Update a role
///
/// When `permissionIds` is present it replaces the role's permissions exactly.
#[utoipa::path(
    put,
    path = "/api/admin/roles/{id}",
    params(("id" = RoleId, Path, description = "Role id")),
    request_body = UpdateRoleDto,
    responses(
        (status = 200, description = "Role updated", body = RoleWithPermissions),
        (status = 403, description = "Forbidden - missing roles:write", body = ErrorResponse),
        (status = 404, description = "Role not found", body = ErrorResponse),
        (status = 409, description = "Role name already exists", body = ErrorResponse),
        (status = 422, description = "Validation error or unknown permission id", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Roles"
)]
#[instrument(skip(state, _auth))]
pub async fn update_role(
    State(state): State<AppState>,
    _auth: RequireRolesWrite,
    Path(id): Path<RoleId>,
    ValidatedJson(dto): ValidatedJson<UpdateRoleDto>,
) -> Result<Json<RoleWithPermissions>, AppError> {
    let role = service::update_role(state.store.as_ref(), id, dto).await?;
    Ok(Json(role))
}

/// Delete a role
///
/// Its permission links and user assignments go with it.
#[utoipa::path(
    delete,
    path = "/api/admin/roles/{id}",
    params(("id" = RoleId, Path, description = "Role id")),
    responses(
        (status = 204, description = "Role deleted"),
        (status = 403, description = "Forbidden - missing roles:delete", body = ErrorResponse),
        (status = 404, description = "Role not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Roles"
)]
#[instrument(skip(state, _auth))]
pub async fn delete_role(
    State(state): State<AppState>,
    _auth: RequireRolesDelete,
    Path(id): Path<RoleId>,
) -> Result<StatusCode, AppError> {
    service::delete_role(state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List the permissions granted by a role
#[utoipa::path(
    get,
    path = "/api/admin/roles/{id}/permissions",
    params(("id" = RoleId, Path, description = "Role id")),
    responses(
        (status = 200, description = "Permissions of the role", body = Vec<Permission>),
        (status = 403, description = "Forbidden - missing roles:read", body = ErrorResponse),
        (status = 404, description = "Role not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Roles"
)]
#[instrument(skip(state, _auth))]
pub async fn get_role_permissions(
    State(state): State<AppState>,
    _auth: RequireRolesRead,
    Path(id): Path<RoleId>,
) -> Result<Json<Vec<Permission>>, AppError> {
    let permissions = service::get_role_permissions(state.store.as_ref(), id).await?;
    Ok(Json(permissions))
}

// ============ Permission Handlers ============

/// List permissions
#[utoipa::path(
    get,
    path = "/api/admin/permissions",
    params(PaginationParams),
    responses(
        (status = 200, description = "Page of permissions", body = Paginated<Permission>),
        (status = 403, description = "Forbidden - missing roles:read", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Permissions"
)]
#[instrument(skip(state, _auth))]
pub async fn get_permissions(
    State(state): State<AppState>,
    _auth: RequireRolesRead,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Paginated<Permission>>, AppError> {
    let permissions = service::list_permissions(state.store.as_ref(), &params).await?;
    Ok(Json(permissions))
}

/// Create a permission from a `resource:action` name
#[utoipa::path(
    post,
    path = "/api/admin/permissions",
    request_body = CreatePermissionDto,
    responses(
        (status = 201, description = "Permission created", body = Permission),
        (status = 403, description = "Forbidden - missing roles:write", body = ErrorResponse),
        (status = 409, description = "Permission already exists", body = ErrorResponse),
        (status = 422, description = "Malformed permission name", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Permissions"
)]
#[instrument(skip(state, _auth))]
pub async fn create_permission(
    State(state): State<AppState>,
    _auth: RequireRolesWrite,
    ValidatedJson(dto): ValidatedJson<CreatePermissionDto>,
) -> Result<(StatusCode, Json<Permission>), AppError> {
    let permission = service::create_permission(state.store.as_ref(), dto).await?;
    Ok((StatusCode::CREATED, Json(permission)))
}

/// Update a permission
#[utoipa::path(
    put,
    path = "/api/admin/permissions/{id}",
    params(("id" = PermissionId, Path, description = "Permission id")),
    request_body = UpdatePermissionDto,
    responses(
        (status = 200, description = "Permission updated", body = Permission),
        (status = 403, description = "Forbidden - missing roles:write", body = ErrorResponse),
        (status = 404, description = "Permission not found", body = ErrorResponse),
        (status = 409, description = "Permission already exists", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Permissions"
)]
#[instrument(skip(state, _auth))]
pub async fn update_permission(
    State(state): State<AppState>,
    _auth: RequireRolesWrite,
    Path(id): Path<PermissionId>,
    ValidatedJson(dto): ValidatedJson<UpdatePermissionDto>,
) -> Result<Json<Permission>, AppError> {
    let permission = service::update_permission(state.store.as_ref(), id, dto).await?;
    Ok(Json(permission))
}

/// Delete a permission
#[utoipa::path(
    delete,
    path = "/api/admin/permissions/{id}",
    params(("id" = PermissionId, Path, description = "Permission id")),
    responses(
        (status = 204, description = "Permission deleted"),
        (status = 403, description = "Forbidden - missing roles:delete", body = ErrorResponse),
        (status = 404, description = "Permission not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Permissions"
)]
#[instrument(skip(state, _auth))]
pub async fn delete_permission(
    State(state): State<AppState>,
    _auth: RequireRolesDelete,
    Path(id): Path<PermissionId>,
) -> Result<StatusCode, AppError> {
    service::delete_permission(state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
