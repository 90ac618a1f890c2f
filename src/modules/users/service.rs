use anyhow::anyhow;
use tracing::{info, instrument};

use atrium_core::{AppError, Paginated, PaginationParams, hash_password};
use atrium_models::{CreateUserDto, NewUser, RoleId, UpdateUserDto, UserId, UserWithRole};
use atrium_observability::track_user_created;

use crate::store::AuthzStore;

#[instrument(skip(store))]
pub async fn list_users(
    store: &dyn AuthzStore,
    params: &PaginationParams,
) -> Result<Paginated<UserWithRole>, AppError> {
    store.list_users(params).await
}

#[instrument(skip(store))]
pub async fn get_user(store: &dyn AuthzStore, id: UserId) -> Result<UserWithRole, AppError> {
    let user = store
        .find_user(id)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("User not found")))?;
    let role = store.user_roles(id).await?.into_iter().next();

    Ok(UserWithRole { user, role })
}

/// Creates a user, hashing the password, and assigns `role_id` when given.
#[instrument(skip(store, dto), fields(email = %dto.email))]
pub async fn create_user(
    store: &dyn AuthzStore,
    dto: CreateUserDto,
) -> Result<UserWithRole, AppError> {
    if let Some(role_id) = dto.role_id {
        ensure_role_exists(store, role_id).await?;
    }

    let password_hash = hash_password(&dto.password)?;
    let user = store
        .create_user(NewUser {
            email: dto.email.trim().to_lowercase(),
            name: dto.name.trim().to_string(),
            password_hash,
        })
        .await?;

    if let Some(role_id) = dto.role_id {
        store.set_user_role(user.id, Some(role_id)).await?;
    }

    track_user_created();
    info!(user_id = %user.id, "User created");
    get_user(store, user.id).await
}

/// Applies a partial update.
///
/// `role_id` absent keeps the user's roles, `null` removes them all and an id
/// replaces them with that single role.
#[instrument(skip(store))]
pub async fn update_user(
    store: &dyn AuthzStore,
    id: UserId,
    dto: UpdateUserDto,
) -> Result<UserWithRole, AppError> {
    if store.find_user(id).await?.is_none() {
        return Err(AppError::not_found(anyhow!("User not found")));
    }

    if let Some(name) = dto.name.as_deref() {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::unprocessable(anyhow!("Name cannot be empty")));
        }
        store.update_user_name(id, name).await?;
    }

    if let Some(role_id) = dto.role_id {
        if let Some(role_id) = role_id {
            ensure_role_exists(store, role_id).await?;
        }
        store.set_user_role(id, role_id).await?;
        info!(user_id = %id, role_id = ?role_id, "User role changed");
    }

    get_user(store, id).await
}

#[instrument(skip(store))]
pub async fn delete_user(store: &dyn AuthzStore, id: UserId) -> Result<(), AppError> {
    if !store.delete_user(id).await? {
        return Err(AppError::not_found(anyhow!("User not found")));
    }

    info!(user_id = %id, "User deleted");
    Ok(())
}

async fn ensure_role_exists(store: &dyn AuthzStore, role_id: RoleId) -> Result<(), AppError> {
    match store.find_role(role_id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::unprocessable(anyhow!("Role not found"))),
    }
}
