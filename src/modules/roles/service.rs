use std::collections::BTreeSet;

use anyhow::anyhow;
use tracing::{info, instrument};

use atrium_core::{AppError, Paginated, PaginationParams, PermissionName};
use atrium_models::{
    CreatePermissionDto, CreateRoleDto, Permission, PermissionId, RoleId, RoleWithPermissions,
    UpdatePermissionDto, UpdateRoleDto,
};

use crate::store::AuthzStore;

// ============ Role Services ============

#[instrument(skip(store))]
pub async fn list_roles(
    store: &dyn AuthzStore,
    params: &PaginationParams,
) -> Result<Paginated<RoleWithPermissions>, AppError> {
    store.list_roles(params).await
}

#[instrument(skip(store))]
pub async fn get_role(store: &dyn AuthzStore, id: RoleId) -> Result<RoleWithPermissions, AppError> {
    store
        .find_role(id)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Role not found")))
}

/// Creates the role holding `permission_ids`.
///
/// Every id must name an existing permission; otherwise nothing is created.
#[instrument(skip(store))]
pub async fn create_role(
    store: &dyn AuthzStore,
    dto: CreateRoleDto,
) -> Result<RoleWithPermissions, AppError> {
    let name = required_name(&dto.name)?;
    let permission_ids = match &dto.permission_ids {
        Some(ids) => resolve_permission_ids(store, ids).await?,
        None => BTreeSet::new(),
    };

    let role = store
        .create_role_with_permissions(name, dto.description.as_deref(), &permission_ids)
        .await?;

    info!(role_id = %role.id, role_name = %role.name, "Role created");
    get_role(store, role.id).await
}

/// Updates name and description. `permission_ids`, when present, replaces the
/// role's permission set; when absent the set is left alone. The row and its
/// permission set change together or not at all.
#[instrument(skip(store))]
pub async fn update_role(
    store: &dyn AuthzStore,
    id: RoleId,
    dto: UpdateRoleDto,
) -> Result<RoleWithPermissions, AppError> {
    let name = dto.name.as_deref().map(required_name).transpose()?;
    let permission_ids = match &dto.permission_ids {
        Some(ids) => Some(resolve_permission_ids(store, ids).await?),
        None => None,
    };

    let (_, diff) = store
        .update_role_with_permissions(
            id,
            name,
            dto.description.as_deref(),
            permission_ids.as_ref(),
        )
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Role not found")))?;

    if permission_ids.is_some() {
        info!(
            role_id = %id,
            added = diff.to_add.len(),
            removed = diff.to_remove.len(),
            "Role permissions replaced"
        );
    }

    get_role(store, id).await
}

#[instrument(skip(store))]
pub async fn delete_role(store: &dyn AuthzStore, id: RoleId) -> Result<(), AppError> {
    if !store.delete_role(id).await? {
        return Err(AppError::not_found(anyhow!("Role not found")));
    }

    info!(role_id = %id, "Role deleted");
    Ok(())
}

#[instrument(skip(store))]
pub async fn get_role_permissions(
    store: &dyn AuthzStore,
    id: RoleId,
) -> Result<Vec<Permission>, AppError> {
    Ok(get_role(store, id).await?.permissions)
}

fn required_name(name: &str) -> Result<&str, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::unprocessable(anyhow!("Role name is required")));
    }
    Ok(name)
}

/// Dedupes `ids` and checks that each names a stored permission.
async fn resolve_permission_ids(
    store: &dyn AuthzStore,
    ids: &[PermissionId],
) -> Result<BTreeSet<PermissionId>, AppError> {
    let wanted: BTreeSet<PermissionId> = ids.iter().copied().collect();
    if wanted.is_empty() {
        return Ok(wanted);
    }

    let ids: Vec<PermissionId> = wanted.iter().copied().collect();
    let found = store.find_permissions_by_ids(&ids).await?;
    if found.len() != wanted.len() {
        return Err(AppError::unprocessable(anyhow!(
            "One or more permission IDs are invalid"
        )));
    }

    Ok(wanted)
}

// ============ Permission Services ============

#[instrument(skip(store))]
pub async fn list_permissions(
    store: &dyn AuthzStore,
    params: &PaginationParams,
) -> Result<Paginated<Permission>, AppError> {
    store.list_permissions(params).await
}

/// Creates a permission from a `resource:action` name. Both parts are stored
/// lowercase.
#[instrument(skip(store))]
pub async fn create_permission(
    store: &dyn AuthzStore,
    dto: CreatePermissionDto,
) -> Result<Permission, AppError> {
    let name = parse_name(&dto.name)?;
    let permission = store
        .create_permission(&name, dto.description.as_deref())
        .await?;

    info!(permission = %permission.name, "Permission created");
    Ok(permission)
}

#[instrument(skip(store))]
pub async fn update_permission(
    store: &dyn AuthzStore,
    id: PermissionId,
    dto: UpdatePermissionDto,
) -> Result<Permission, AppError> {
    let name = dto.name.as_deref().map(parse_name).transpose()?;

    store
        .update_permission(id, name.as_ref(), dto.description.as_deref())
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Permission not found")))
}

#[instrument(skip(store))]
pub async fn delete_permission(store: &dyn AuthzStore, id: PermissionId) -> Result<(), AppError> {
    if !store.delete_permission(id).await? {
        return Err(AppError::not_found(anyhow!("Permission not found")));
    }

    info!(permission_id = %id, "Permission deleted");
    Ok(())
}

fn parse_name(raw: &str) -> Result<PermissionName, AppError> {
    PermissionName::parse(raw).map_err(AppError::unprocessable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryAuthzStore;
    use axum::http::StatusCode;

    fn role_dto(name: &str, permission_ids: Option<Vec<PermissionId>>) -> CreateRoleDto {
        CreateRoleDto {
            name: name.to_string(),
            description: None,
            permission_ids,
        }
    }

    async fn permission(store: &MemoryAuthzStore, name: &str) -> Permission {
        create_permission(
            store,
            CreatePermissionDto {
                name: name.to_string(),
                description: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_permission_lowercases() {
        let store = MemoryAuthzStore::new();
        let created = permission(&store, "Forms:Write").await;

        assert_eq!(created.resource, "forms");
        assert_eq!(created.action, "write");
        assert_eq!(created.name, "forms:write");
    }

    #[tokio::test]
    async fn test_create_permission_rejects_malformed_names() {
        let store = MemoryAuthzStore::new();
        for raw in ["formswrite", ":write", "forms:"] {
            let err = create_permission(
                &store,
                CreatePermissionDto {
                    name: raw.to_string(),
                    description: None,
                },
            )
            .await
            .unwrap_err();
            assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY, "{raw}");
        }
    }

    #[tokio::test]
    async fn test_update_permission_resplits_name() {
        let store = MemoryAuthzStore::new();
        let created = permission(&store, "forms:write").await;

        let updated = update_permission(
            &store,
            created.id,
            UpdatePermissionDto {
                name: Some("Blog:Publish".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.resource, "blog");
        assert_eq!(updated.action, "publish");
    }

    #[tokio::test]
    async fn test_missing_ids_are_not_found() {
        let store = MemoryAuthzStore::new();

        let err = update_permission(&store, PermissionId::new(), UpdatePermissionDto::default())
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let err = update_role(&store, RoleId::new(), UpdateRoleDto::default())
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let err = delete_role(&store, RoleId::new()).await.unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_role_with_blank_name_is_rejected() {
        let store = MemoryAuthzStore::new();
        let err = create_role(&store, role_dto("   ", None)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(store.role_count().await, 0);
    }

    #[tokio::test]
    async fn test_create_role_with_unknown_permission_creates_nothing() {
        let store = MemoryAuthzStore::new();
        let known = permission(&store, "blog:read").await;

        let err = create_role(
            &store,
            role_dto("editor", Some(vec![known.id, PermissionId::new()])),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(store.role_count().await, 0);
    }

    #[tokio::test]
    async fn test_update_role_replaces_permissions_exactly() {
        let store = MemoryAuthzStore::new();
        let read = permission(&store, "blog:read").await;
        let write = permission(&store, "blog:write").await;
        let delete = permission(&store, "blog:delete").await;

        let role = create_role(&store, role_dto("editor", Some(vec![read.id, write.id])))
            .await
            .unwrap();

        let updated = update_role(
            &store,
            role.role.id,
            UpdateRoleDto {
                permission_ids: Some(vec![delete.id, delete.id]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.permission_names(), vec!["blog:delete"]);

        // Omitting permission_ids leaves the set alone
        let renamed = update_role(
            &store,
            role.role.id,
            UpdateRoleDto {
                name: Some("writer".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(renamed.role.name, "writer");
        assert_eq!(renamed.permission_names(), vec!["blog:delete"]);
    }

    #[tokio::test]
    async fn test_update_role_with_unknown_permission_keeps_name() {
        let store = MemoryAuthzStore::new();
        let read = permission(&store, "blog:read").await;
        let role = create_role(&store, role_dto("editor", Some(vec![read.id])))
            .await
            .unwrap();

        let err = update_role(
            &store,
            role.role.id,
            UpdateRoleDto {
                name: Some("publisher".to_string()),
                permission_ids: Some(vec![PermissionId::new()]),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);

        let stored = get_role(&store, role.role.id).await.unwrap();
        assert_eq!(stored.role.name, "editor");
        assert_eq!(stored.permission_names(), vec!["blog:read"]);
    }

    #[tokio::test]
    async fn test_update_role_with_empty_list_clears_permissions() {
        let store = MemoryAuthzStore::new();
        let read = permission(&store, "blog:read").await;
        let role = create_role(&store, role_dto("editor", Some(vec![read.id])))
            .await
            .unwrap();

        let updated = update_role(
            &store,
            role.role.id,
            UpdateRoleDto {
                permission_ids: Some(vec![]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(updated.permissions.is_empty());
    }
}
