//! Persistence of roles, permissions, users and their assignments.
//!
//! The application talks to storage only through [`AuthzStore`], held in
//! [`AppState`](crate::state::AppState) as an `Arc<dyn AuthzStore>` built once
//! at startup.
//!
//! - [`PgAuthzStore`]: Postgres through runtime-checked `sqlx` queries
//! - [`MemoryAuthzStore`]: in-process store for tests (`test-utils` feature)
//!
//! Both implementations enforce the same uniqueness rules (permission
//! `(resource, action)`, role name, user email, `(user, role)` assignment) and
//! the same orderings: permissions and roles by name, users by creation time.
//!
//! The full-replace operations ([`AuthzStore::replace_role_permissions`],
//! [`AuthzStore::set_user_role`] and the role writes that carry a permission
//! set) run as one atomic unit each. Concurrent replaces on the same role
//! never interleave; the later one wins.

use std::collections::BTreeSet;

use async_trait::async_trait;

use atrium_core::{AppError, Paginated, PaginationParams, PermissionDiff, PermissionName};
use atrium_models::{
    NewUser, Permission, PermissionId, Role, RoleId, RoleWithPermissions, User, UserCredentials,
    UserId, UserWithRole,
};

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod postgres;

#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryAuthzStore;
pub use postgres::PgAuthzStore;

#[async_trait]
pub trait AuthzStore: Send + Sync {
    // Permissions

    async fn list_permissions(
        &self,
        params: &PaginationParams,
    ) -> Result<Paginated<Permission>, AppError>;

    async fn find_permission(&self, id: PermissionId) -> Result<Option<Permission>, AppError>;

    /// Permissions among `ids` that exist. Unknown ids are left out.
    async fn find_permissions_by_ids(
        &self,
        ids: &[PermissionId],
    ) -> Result<Vec<Permission>, AppError>;

    async fn all_permissions(&self) -> Result<Vec<Permission>, AppError>;

    /// Fails with 409 when `(resource, action)` is taken.
    async fn create_permission(
        &self,
        name: &PermissionName,
        description: Option<&str>,
    ) -> Result<Permission, AppError>;

    /// `None` fields are left unchanged. Returns `None` when `id` is unknown.
    async fn update_permission(
        &self,
        id: PermissionId,
        name: Option<&PermissionName>,
        description: Option<&str>,
    ) -> Result<Option<Permission>, AppError>;

    /// Detaches the permission from every role, then deletes it.
    async fn delete_permission(&self, id: PermissionId) -> Result<bool, AppError>;

    /// Creates the permission when absent. An existing row, description
    /// included, is returned untouched.
    async fn ensure_permission(
        &self,
        name: &PermissionName,
        description: &str,
    ) -> Result<Permission, AppError>;

    // Roles

    async fn list_roles(
        &self,
        params: &PaginationParams,
    ) -> Result<Paginated<RoleWithPermissions>, AppError>;

    async fn find_role(&self, id: RoleId) -> Result<Option<RoleWithPermissions>, AppError>;

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, AppError>;

    /// Fails with 409 when the name is taken.
    async fn create_role(&self, name: &str, description: Option<&str>) -> Result<Role, AppError> {
        self.create_role_with_permissions(name, description, &BTreeSet::new())
            .await
    }

    /// Creates the role holding exactly `permissions` as one atomic unit.
    ///
    /// Fails with 409 when the name is taken and with 422 when an id names no
    /// stored permission. Nothing is written on failure.
    async fn create_role_with_permissions(
        &self,
        name: &str,
        description: Option<&str>,
        permissions: &BTreeSet<PermissionId>,
    ) -> Result<Role, AppError>;

    async fn update_role(
        &self,
        id: RoleId,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<Role>, AppError> {
        Ok(self
            .update_role_with_permissions(id, name, description, None)
            .await?
            .map(|(role, _)| role))
    }

    /// Updates name and description and, when `permissions` is given, replaces
    /// the role's permission set, as one atomic unit. `Ok(None)` when the role
    /// does not exist. The returned diff is empty when `permissions` is `None`.
    async fn update_role_with_permissions(
        &self,
        id: RoleId,
        name: Option<&str>,
        description: Option<&str>,
        permissions: Option<&BTreeSet<PermissionId>>,
    ) -> Result<Option<(Role, PermissionDiff<PermissionId>)>, AppError>;

    /// Clears the role's user assignments and permission links, then deletes
    /// it. Permissions themselves are kept.
    async fn delete_role(&self, id: RoleId) -> Result<bool, AppError>;

    /// Creates the role when absent, otherwise returns the existing one.
    async fn ensure_role(&self, name: &str, description: Option<&str>) -> Result<Role, AppError>;

    async fn role_permissions(&self, id: RoleId) -> Result<Vec<Permission>, AppError>;

    /// Makes the role's permission set exactly `desired` and returns the edits
    /// that were applied. Fails with 404 when the role does not exist.
    async fn replace_role_permissions(
        &self,
        role_id: RoleId,
        desired: &BTreeSet<PermissionId>,
    ) -> Result<PermissionDiff<PermissionId>, AppError>;

    // Users

    async fn find_user(&self, id: UserId) -> Result<Option<User>, AppError>;

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, AppError>;

    /// Each user comes with its first-assigned role.
    async fn list_users(
        &self,
        params: &PaginationParams,
    ) -> Result<Paginated<UserWithRole>, AppError>;

    /// Fails with 409 when the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;

    async fn update_user_name(&self, id: UserId, name: &str) -> Result<Option<User>, AppError>;

    async fn delete_user(&self, id: UserId) -> Result<bool, AppError>;

    /// The earliest-created user.
    async fn first_user(&self) -> Result<Option<User>, AppError>;

    // Assignments

    /// Roles of the user in assignment order.
    async fn user_roles(&self, user_id: UserId) -> Result<Vec<Role>, AppError>;

    async fn users_with_role(&self, role_id: RoleId) -> Result<Vec<UserId>, AppError>;

    /// Adds the assignment unless it exists. Returns whether a row was added.
    async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> Result<bool, AppError>;

    /// Removes every assignment of the user, then adds `role_id` if given.
    /// Fails with 404 when the user does not exist.
    async fn set_user_role(&self, user_id: UserId, role_id: Option<RoleId>)
    -> Result<(), AppError>;

    /// Union of the permission names of every role assigned to the user.
    async fn user_permission_names(&self, user_id: UserId) -> Result<BTreeSet<String>, AppError>;
}
