//! In-process [`AuthzStore`] used by the test suites.
//!
//! State sits behind one `tokio::sync::RwLock`; every operation takes the lock
//! once, which makes the full-replace operations atomic. Ordering, search and
//! uniqueness follow the Postgres store.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use atrium_core::{AppError, Paginated, PaginationParams, PermissionDiff, PermissionName};
use atrium_models::{
    NewUser, Permission, PermissionId, Role, RoleId, RoleWithPermissions, User, UserCredentials,
    UserId, UserWithRole,
};

use super::AuthzStore;

struct UserRecord {
    user: User,
    password_hash: String,
}

struct Assignment {
    user_id: UserId,
    role_id: RoleId,
    assigned_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    users: Vec<UserRecord>,
    permissions: Vec<Permission>,
    roles: Vec<Role>,
    role_permissions: BTreeSet<(RoleId, PermissionId)>,
    /// Kept in assignment order.
    user_roles: Vec<Assignment>,
}

impl Tables {
    fn role_with_permissions(&self, role: &Role) -> RoleWithPermissions {
        RoleWithPermissions {
            role: role.clone(),
            permissions: self.permissions_of(role.id),
            user_count: self
                .user_roles
                .iter()
                .filter(|a| a.role_id == role.id)
                .count() as i64,
        }
    }

    fn permissions_of(&self, role_id: RoleId) -> Vec<Permission> {
        let mut permissions: Vec<Permission> = self
            .permissions
            .iter()
            .filter(|p| self.role_permissions.contains(&(role_id, p.id)))
            .cloned()
            .collect();
        permissions.sort_by(|a, b| a.name.cmp(&b.name));
        permissions
    }

    fn roles_of(&self, user_id: UserId) -> Vec<Role> {
        let mut assignments: Vec<&Assignment> = self
            .user_roles
            .iter()
            .filter(|a| a.user_id == user_id)
            .collect();
        assignments.sort_by_key(|a| a.assigned_at);

        assignments
            .into_iter()
            .filter_map(|a| self.roles.iter().find(|r| r.id == a.role_id).cloned())
            .collect()
    }

    fn permission_name_taken(&self, name: &PermissionName, except: Option<PermissionId>) -> bool {
        self.permissions.iter().any(|p| {
            Some(p.id) != except && p.resource == name.resource() && p.action == name.action()
        })
    }

    fn check_permission_ids(&self, ids: &BTreeSet<PermissionId>) -> Result<(), AppError> {
        if ids
            .iter()
            .any(|id| !self.permissions.iter().any(|p| p.id == *id))
        {
            return Err(AppError::unprocessable(anyhow!(
                "One or more permission IDs are invalid"
            )));
        }
        Ok(())
    }

    /// Caller checks the ids first.
    fn apply_permission_set(
        &mut self,
        role_id: RoleId,
        desired: &BTreeSet<PermissionId>,
    ) -> PermissionDiff<PermissionId> {
        let current: BTreeSet<PermissionId> = self
            .role_permissions
            .iter()
            .filter(|(r, _)| *r == role_id)
            .map(|(_, p)| *p)
            .collect();

        let diff = PermissionDiff::between(&current, desired);
        for permission_id in &diff.to_remove {
            self.role_permissions.remove(&(role_id, *permission_id));
        }
        for permission_id in &diff.to_add {
            self.role_permissions.insert((role_id, *permission_id));
        }
        diff
    }

    fn role_name_taken(&self, name: &str, except: Option<RoleId>) -> bool {
        self.roles
            .iter()
            .any(|r| Some(r.id) != except && r.name == name)
    }
}

/// [`AuthzStore`] kept in memory.
///
/// [`set_unavailable`](Self::set_unavailable) makes every call fail with a
/// 500, which is how the test suites simulate a storage outage.
#[derive(Default)]
pub struct MemoryAuthzStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
}

impl MemoryAuthzStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of stored permissions.
    pub async fn permission_count(&self) -> usize {
        self.tables.read().await.permissions.len()
    }

    /// Number of stored roles.
    pub async fn role_count(&self) -> usize {
        self.tables.read().await.roles.len()
    }

    /// Number of stored `(user, role)` assignments.
    pub async fn assignment_count(&self) -> usize {
        self.tables.read().await.user_roles.len()
    }

    fn available(&self) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::database(anyhow!("Authorization store unavailable")));
        }
        Ok(())
    }
}

fn matches_search(search: Option<&str>, fields: &[Option<&str>]) -> bool {
    let Some(search) = search else {
        return true;
    };
    let needle = search.to_lowercase();
    fields
        .iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
}

fn paginate<T>(items: Vec<T>, params: &PaginationParams) -> Paginated<T> {
    let total = items.len() as i64;
    let page = items
        .into_iter()
        .skip(params.offset() as usize)
        .take(params.limit() as usize)
        .collect();
    Paginated::new(page, total, params)
}

fn build_permission(name: &PermissionName, description: Option<&str>) -> Permission {
    let now = Utc::now();
    Permission {
        id: PermissionId::new(),
        resource: name.resource().to_string(),
        action: name.action().to_string(),
        name: name.to_string(),
        description: description.map(str::to_string),
        created_at: now,
        updated_at: now,
    }
}

fn build_role(name: &str, description: Option<&str>) -> Role {
    let now = Utc::now();
    Role {
        id: RoleId::new(),
        name: name.to_string(),
        description: description.map(str::to_string),
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl AuthzStore for MemoryAuthzStore {
    async fn list_permissions(
        &self,
        params: &PaginationParams,
    ) -> Result<Paginated<Permission>, AppError> {
        self.available()?;
        let tables = self.tables.read().await;

        let mut items: Vec<Permission> = tables
            .permissions
            .iter()
            .filter(|p| {
                matches_search(
                    params.search(),
                    &[Some(p.name.as_str()), p.description.as_deref()],
                )
            })
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(paginate(items, params))
    }

    async fn find_permission(&self, id: PermissionId) -> Result<Option<Permission>, AppError> {
        self.available()?;
        let tables = self.tables.read().await;
        Ok(tables.permissions.iter().find(|p| p.id == id).cloned())
    }

    async fn find_permissions_by_ids(
        &self,
        ids: &[PermissionId],
    ) -> Result<Vec<Permission>, AppError> {
        self.available()?;
        let tables = self.tables.read().await;

        let mut permissions: Vec<Permission> = tables
            .permissions
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect();
        permissions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(permissions)
    }

    async fn all_permissions(&self) -> Result<Vec<Permission>, AppError> {
        self.available()?;
        let tables = self.tables.read().await;

        let mut permissions = tables.permissions.clone();
        permissions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(permissions)
    }

    async fn create_permission(
        &self,
        name: &PermissionName,
        description: Option<&str>,
    ) -> Result<Permission, AppError> {
        self.available()?;
        let mut tables = self.tables.write().await;

        if tables.permission_name_taken(name, None) {
            return Err(AppError::conflict(anyhow!(
                "Permission with this name already exists"
            )));
        }

        let permission = build_permission(name, description);
        tables.permissions.push(permission.clone());
        Ok(permission)
    }

    async fn update_permission(
        &self,
        id: PermissionId,
        name: Option<&PermissionName>,
        description: Option<&str>,
    ) -> Result<Option<Permission>, AppError> {
        self.available()?;
        let mut tables = self.tables.write().await;

        if let Some(name) = name {
            if tables.permission_name_taken(name, Some(id)) {
                return Err(AppError::conflict(anyhow!(
                    "Permission with this name already exists"
                )));
            }
        }

        let Some(permission) = tables.permissions.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };

        if let Some(name) = name {
            permission.resource = name.resource().to_string();
            permission.action = name.action().to_string();
            permission.name = name.to_string();
        }
        if let Some(description) = description {
            permission.description = Some(description.to_string());
        }
        permission.updated_at = Utc::now();

        Ok(Some(permission.clone()))
    }

    async fn delete_permission(&self, id: PermissionId) -> Result<bool, AppError> {
        self.available()?;
        let mut tables = self.tables.write().await;

        let before = tables.permissions.len();
        tables.permissions.retain(|p| p.id != id);
        tables.role_permissions.retain(|(_, permission_id)| *permission_id != id);
        Ok(tables.permissions.len() < before)
    }

    async fn ensure_permission(
        &self,
        name: &PermissionName,
        description: &str,
    ) -> Result<Permission, AppError> {
        self.available()?;
        let mut tables = self.tables.write().await;

        let existing = tables
            .permissions
            .iter()
            .find(|p| p.resource == name.resource() && p.action == name.action());
        if let Some(permission) = existing {
            return Ok(permission.clone());
        }

        let permission = build_permission(name, Some(description));
        tables.permissions.push(permission.clone());
        Ok(permission)
    }

    async fn list_roles(
        &self,
        params: &PaginationParams,
    ) -> Result<Paginated<RoleWithPermissions>, AppError> {
        self.available()?;
        let tables = self.tables.read().await;

        let mut roles: Vec<&Role> = tables
            .roles
            .iter()
            .filter(|r| {
                matches_search(
                    params.search(),
                    &[Some(r.name.as_str()), r.description.as_deref()],
                )
            })
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));

        let items = roles
            .into_iter()
            .map(|role| tables.role_with_permissions(role))
            .collect();
        Ok(paginate(items, params))
    }

    async fn find_role(&self, id: RoleId) -> Result<Option<RoleWithPermissions>, AppError> {
        self.available()?;
        let tables = self.tables.read().await;

        Ok(tables
            .roles
            .iter()
            .find(|r| r.id == id)
            .map(|role| tables.role_with_permissions(role)))
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, AppError> {
        self.available()?;
        let tables = self.tables.read().await;
        Ok(tables.roles.iter().find(|r| r.name == name).cloned())
    }

    async fn create_role_with_permissions(
        &self,
        name: &str,
        description: Option<&str>,
        permissions: &BTreeSet<PermissionId>,
    ) -> Result<Role, AppError> {
        self.available()?;
        let mut tables = self.tables.write().await;

        if tables.role_name_taken(name, None) {
            return Err(AppError::conflict(anyhow!(
                "Role with this name already exists"
            )));
        }
        tables.check_permission_ids(permissions)?;

        let role = build_role(name, description);
        tables.roles.push(role.clone());
        tables.apply_permission_set(role.id, permissions);
        Ok(role)
    }

    async fn update_role_with_permissions(
        &self,
        id: RoleId,
        name: Option<&str>,
        description: Option<&str>,
        permissions: Option<&BTreeSet<PermissionId>>,
    ) -> Result<Option<(Role, PermissionDiff<PermissionId>)>, AppError> {
        self.available()?;
        let mut tables = self.tables.write().await;

        if let Some(name) = name {
            if tables.role_name_taken(name, Some(id)) {
                return Err(AppError::conflict(anyhow!(
                    "Role with this name already exists"
                )));
            }
        }
        if !tables.roles.iter().any(|r| r.id == id) {
            return Ok(None);
        }
        if let Some(desired) = permissions {
            tables.check_permission_ids(desired)?;
        }

        let diff = match permissions {
            Some(desired) => tables.apply_permission_set(id, desired),
            None => PermissionDiff::default(),
        };

        let Some(role) = tables.roles.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        if let Some(name) = name {
            role.name = name.to_string();
        }
        if let Some(description) = description {
            role.description = Some(description.to_string());
        }
        role.updated_at = Utc::now();

        Ok(Some((role.clone(), diff)))
    }

    async fn delete_role(&self, id: RoleId) -> Result<bool, AppError> {
        self.available()?;
        let mut tables = self.tables.write().await;

        tables.user_roles.retain(|a| a.role_id != id);
        tables.role_permissions.retain(|(role_id, _)| *role_id != id);

        let before = tables.roles.len();
        tables.roles.retain(|r| r.id != id);
        Ok(tables.roles.len() < before)
    }

    async fn ensure_role(&self, name: &str, description: Option<&str>) -> Result<Role, AppError> {
        self.available()?;
        let mut tables = self.tables.write().await;

        if let Some(role) = tables.roles.iter().find(|r| r.name == name) {
            return Ok(role.clone());
        }

        let role = build_role(name, description);
        tables.roles.push(role.clone());
        Ok(role)
    }

    async fn role_permissions(&self, id: RoleId) -> Result<Vec<Permission>, AppError> {
        self.available()?;
        let tables = self.tables.read().await;
        Ok(tables.permissions_of(id))
    }

    async fn replace_role_permissions(
        &self,
        role_id: RoleId,
        desired: &BTreeSet<PermissionId>,
    ) -> Result<PermissionDiff<PermissionId>, AppError> {
        self.available()?;
        let mut tables = self.tables.write().await;

        if !tables.roles.iter().any(|r| r.id == role_id) {
            return Err(AppError::not_found(anyhow!("Role not found")));
        }
        tables.check_permission_ids(desired)?;

        Ok(tables.apply_permission_set(role_id, desired))
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, AppError> {
        self.available()?;
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|r| r.user.id == id)
            .map(|r| r.user.clone()))
    }

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, AppError> {
        self.available()?;
        let tables = self.tables.read().await;

        Ok(tables
            .users
            .iter()
            .find(|r| r.user.email == email)
            .map(|r| UserCredentials {
                id: r.user.id,
                email: r.user.email.clone(),
                name: r.user.name.clone(),
                password_hash: r.password_hash.clone(),
            }))
    }

    async fn list_users(
        &self,
        params: &PaginationParams,
    ) -> Result<Paginated<UserWithRole>, AppError> {
        self.available()?;
        let tables = self.tables.read().await;

        let mut users: Vec<&User> = tables
            .users
            .iter()
            .map(|r| &r.user)
            .filter(|u| {
                matches_search(
                    params.search(),
                    &[Some(u.name.as_str()), Some(u.email.as_str())],
                )
            })
            .collect();
        users.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.email.cmp(&b.email))
        });

        let items = users
            .into_iter()
            .map(|user| UserWithRole {
                user: user.clone(),
                role: tables.roles_of(user.id).into_iter().next(),
            })
            .collect();
        Ok(paginate(items, params))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        self.available()?;
        let mut tables = self.tables.write().await;

        if tables.users.iter().any(|r| r.user.email == user.email) {
            return Err(AppError::conflict(anyhow!(
                "User with this email already exists"
            )));
        }

        let now = Utc::now();
        let created = User {
            id: UserId::new(),
            email: user.email,
            name: user.name,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(UserRecord {
            user: created.clone(),
            password_hash: user.password_hash,
        });
        Ok(created)
    }

    async fn update_user_name(&self, id: UserId, name: &str) -> Result<Option<User>, AppError> {
        self.available()?;
        let mut tables = self.tables.write().await;

        let Some(record) = tables.users.iter_mut().find(|r| r.user.id == id) else {
            return Ok(None);
        };
        record.user.name = name.to_string();
        record.user.updated_at = Utc::now();
        Ok(Some(record.user.clone()))
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, AppError> {
        self.available()?;
        let mut tables = self.tables.write().await;

        tables.user_roles.retain(|a| a.user_id != id);
        let before = tables.users.len();
        tables.users.retain(|r| r.user.id != id);
        Ok(tables.users.len() < before)
    }

    async fn first_user(&self) -> Result<Option<User>, AppError> {
        self.available()?;
        let tables = self.tables.read().await;

        Ok(tables
            .users
            .iter()
            .map(|r| &r.user)
            .min_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.email.cmp(&b.email))
            })
            .cloned())
    }

    async fn user_roles(&self, user_id: UserId) -> Result<Vec<Role>, AppError> {
        self.available()?;
        let tables = self.tables.read().await;
        Ok(tables.roles_of(user_id))
    }

    async fn users_with_role(&self, role_id: RoleId) -> Result<Vec<UserId>, AppError> {
        self.available()?;
        let tables = self.tables.read().await;

        Ok(tables
            .user_roles
            .iter()
            .filter(|a| a.role_id == role_id)
            .map(|a| a.user_id)
            .collect())
    }

    async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> Result<bool, AppError> {
        self.available()?;
        let mut tables = self.tables.write().await;

        if !tables.users.iter().any(|r| r.user.id == user_id)
            || !tables.roles.iter().any(|r| r.id == role_id)
        {
            return Err(AppError::unprocessable(anyhow!("User or role not found")));
        }
        if tables
            .user_roles
            .iter()
            .any(|a| a.user_id == user_id && a.role_id == role_id)
        {
            return Ok(false);
        }

        tables.user_roles.push(Assignment {
            user_id,
            role_id,
            assigned_at: Utc::now(),
        });
        Ok(true)
    }

    async fn set_user_role(
        &self,
        user_id: UserId,
        role_id: Option<RoleId>,
    ) -> Result<(), AppError> {
        self.available()?;
        let mut tables = self.tables.write().await;

        if !tables.users.iter().any(|r| r.user.id == user_id) {
            return Err(AppError::not_found(anyhow!("User not found")));
        }
        if let Some(role_id) = role_id {
            if !tables.roles.iter().any(|r| r.id == role_id) {
                return Err(AppError::unprocessable(anyhow!("Role not found")));
            }
        }

        tables.user_roles.retain(|a| a.user_id != user_id);
        if let Some(role_id) = role_id {
            tables.user_roles.push(Assignment {
                user_id,
                role_id,
                assigned_at: Utc::now(),
            });
        }
        Ok(())
    }

    async fn user_permission_names(&self, user_id: UserId) -> Result<BTreeSet<String>, AppError> {
        self.available()?;
        let tables = self.tables.read().await;

        let names: HashMap<PermissionId, &str> = tables
            .permissions
            .iter()
            .map(|p| (p.id, p.name.as_str()))
            .collect();

        Ok(tables
            .user_roles
            .iter()
            .filter(|a| a.user_id == user_id)
            .flat_map(|a| {
                tables
                    .role_permissions
                    .iter()
                    .filter(move |(role_id, _)| *role_id == a.role_id)
            })
            .filter_map(|(_, permission_id)| names.get(permission_id))
            .map(|name| name.to_string())
            .collect())
    }
}
