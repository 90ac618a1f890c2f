use std::collections::{BTreeSet, HashMap};

use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use atrium_core::{AppError, Paginated, PaginationParams, PermissionDiff, PermissionName};
use atrium_models::{
    NewUser, Permission, PermissionId, Role, RoleId, RoleWithPermissions, User, UserCredentials,
    UserId, UserWithRole,
};

use super::AuthzStore;

const PERMISSION_COLUMNS: &str = "id, resource, action, name, description, created_at, updated_at";
const ROLE_COLUMNS: &str = "id, name, description, created_at, updated_at";
const USER_COLUMNS: &str = "id, email, name, created_at, updated_at";

#[derive(FromRow)]
struct RolePermissionRow {
    role_id: RoleId,
    #[sqlx(flatten)]
    permission: Permission,
}

#[derive(FromRow)]
struct AssignedRoleRow {
    user_id: UserId,
    #[sqlx(flatten)]
    role: Role,
}

/// Postgres-backed [`AuthzStore`].
#[derive(Clone, Debug)]
pub struct PgAuthzStore {
    db: PgPool,
}

impl PgAuthzStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }

    async fn attach_permissions(
        &self,
        roles: Vec<Role>,
    ) -> Result<Vec<RoleWithPermissions>, AppError> {
        let ids: Vec<Uuid> = roles.iter().map(|r| r.id.into_inner()).collect();

        let rows: Vec<RolePermissionRow> = sqlx::query_as(
            r#"SELECT rp.role_id, p.id, p.resource, p.action, p.name, p.description,
                      p.created_at, p.updated_at
               FROM role_permissions rp
               JOIN permissions p ON p.id = rp.permission_id
               WHERE rp.role_id = ANY($1)
               ORDER BY p.name"#,
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;

        let counts: Vec<(RoleId, i64)> = sqlx::query_as(
            "SELECT role_id, COUNT(*) FROM user_roles WHERE role_id = ANY($1) GROUP BY role_id",
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;
        let counts: HashMap<RoleId, i64> = counts.into_iter().collect();

        let mut permissions: HashMap<RoleId, Vec<Permission>> = HashMap::new();
        for row in rows {
            permissions.entry(row.role_id).or_default().push(row.permission);
        }

        Ok(roles
            .into_iter()
            .map(|role| RoleWithPermissions {
                permissions: permissions.remove(&role.id).unwrap_or_default(),
                user_count: counts.get(&role.id).copied().unwrap_or(0),
                role,
            })
            .collect())
    }
}

/// `ILIKE` pattern for a literal substring match. `\`, `%` and `_` in the
/// search text are escaped so they only match themselves.
fn search_pattern(params: &PaginationParams) -> Option<String> {
    params.search().map(|search| format!("%{}%", escape_like(search)))
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}

/// Maps a unique-constraint violation to 409 with `message`.
fn conflict_on_unique(err: sqlx::Error, message: &'static str) -> AppError {
    if is_unique_violation(&err) {
        AppError::conflict(anyhow!(message))
    } else {
        AppError::database(err)
    }
}

/// Makes the role's links exactly `desired` inside `tx`. An unknown permission
/// id fails with 422 and leaves the transaction to roll back.
async fn apply_permission_set(
    tx: &mut Transaction<'_, Postgres>,
    role_id: RoleId,
    desired: &BTreeSet<PermissionId>,
) -> Result<PermissionDiff<PermissionId>, AppError> {
    let current: Vec<PermissionId> =
        sqlx::query_scalar("SELECT permission_id FROM role_permissions WHERE role_id = $1")
            .bind(role_id)
            .fetch_all(&mut **tx)
            .await?;
    let current: BTreeSet<PermissionId> = current.into_iter().collect();

    let diff = PermissionDiff::between(&current, desired);

    if !diff.to_remove.is_empty() {
        let ids: Vec<Uuid> = diff.to_remove.iter().map(|id| id.into_inner()).collect();
        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1 AND permission_id = ANY($2)")
            .bind(role_id)
            .bind(&ids)
            .execute(&mut **tx)
            .await?;
    }

    if !diff.to_add.is_empty() {
        let ids: Vec<Uuid> = diff.to_add.iter().map(|id| id.into_inner()).collect();
        sqlx::query(
            r#"INSERT INTO role_permissions (role_id, permission_id)
               SELECT $1, UNNEST($2::uuid[])
               ON CONFLICT DO NOTHING"#,
        )
        .bind(role_id)
        .bind(&ids)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::unprocessable(anyhow!("One or more permission IDs are invalid"))
            } else {
                AppError::database(e)
            }
        })?;
    }

    Ok(diff)
}

#[async_trait]
impl AuthzStore for PgAuthzStore {
    async fn list_permissions(
        &self,
        params: &PaginationParams,
    ) -> Result<Paginated<Permission>, AppError> {
        let pattern = search_pattern(params);

        let items: Vec<Permission> = sqlx::query_as(&format!(
            r#"SELECT {PERMISSION_COLUMNS} FROM permissions
               WHERE $1::text IS NULL
                  OR name ILIKE $1 ESCAPE '\'
                  OR description ILIKE $1 ESCAPE '\'
               ORDER BY name
               LIMIT $2 OFFSET $3"#
        ))
        .bind(&pattern)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.db)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM permissions
               WHERE $1::text IS NULL
                  OR name ILIKE $1 ESCAPE '\'
                  OR description ILIKE $1 ESCAPE '\'"#,
        )
        .bind(&pattern)
        .fetch_one(&self.db)
        .await?;

        Ok(Paginated::new(items, total, params))
    }

    async fn find_permission(&self, id: PermissionId) -> Result<Option<Permission>, AppError> {
        let permission = sqlx::query_as(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(permission)
    }

    async fn find_permissions_by_ids(
        &self,
        ids: &[PermissionId],
    ) -> Result<Vec<Permission>, AppError> {
        let ids: Vec<Uuid> = ids.iter().map(|id| id.into_inner()).collect();

        let permissions = sqlx::query_as(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE id = ANY($1) ORDER BY name"
        ))
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;

        Ok(permissions)
    }

    async fn all_permissions(&self) -> Result<Vec<Permission>, AppError> {
        let permissions = sqlx::query_as(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions ORDER BY name"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(permissions)
    }

    async fn create_permission(
        &self,
        name: &PermissionName,
        description: Option<&str>,
    ) -> Result<Permission, AppError> {
        sqlx::query_as(&format!(
            r#"INSERT INTO permissions (resource, action, description)
               VALUES ($1, $2, $3)
               RETURNING {PERMISSION_COLUMNS}"#
        ))
        .bind(name.resource())
        .bind(name.action())
        .bind(description)
        .fetch_one(&self.db)
        .await
        .map_err(|e| conflict_on_unique(e, "Permission with this name already exists"))
    }

    async fn update_permission(
        &self,
        id: PermissionId,
        name: Option<&PermissionName>,
        description: Option<&str>,
    ) -> Result<Option<Permission>, AppError> {
        sqlx::query_as(&format!(
            r#"UPDATE permissions
               SET resource = COALESCE($2, resource),
                   action = COALESCE($3, action),
                   description = COALESCE($4, description),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING {PERMISSION_COLUMNS}"#
        ))
        .bind(id)
        .bind(name.map(|n| n.resource()))
        .bind(name.map(|n| n.action()))
        .bind(description)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| conflict_on_unique(e, "Permission with this name already exists"))
    }

    async fn delete_permission(&self, id: PermissionId) -> Result<bool, AppError> {
        // role_permissions rows go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ensure_permission(
        &self,
        name: &PermissionName,
        description: &str,
    ) -> Result<Permission, AppError> {
        sqlx::query(
            r#"INSERT INTO permissions (resource, action, description)
               VALUES ($1, $2, $3)
               ON CONFLICT (resource, action) DO NOTHING"#,
        )
        .bind(name.resource())
        .bind(name.action())
        .bind(description)
        .execute(&self.db)
        .await?;

        let permission = sqlx::query_as(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE resource = $1 AND action = $2"
        ))
        .bind(name.resource())
        .bind(name.action())
        .fetch_one(&self.db)
        .await?;

        Ok(permission)
    }

    async fn list_roles(
        &self,
        params: &PaginationParams,
    ) -> Result<Paginated<RoleWithPermissions>, AppError> {
        let pattern = search_pattern(params);

        let roles: Vec<Role> = sqlx::query_as(&format!(
            r#"SELECT {ROLE_COLUMNS} FROM roles
               WHERE $1::text IS NULL
                  OR name ILIKE $1 ESCAPE '\'
                  OR description ILIKE $1 ESCAPE '\'
               ORDER BY name
               LIMIT $2 OFFSET $3"#
        ))
        .bind(&pattern)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.db)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM roles
               WHERE $1::text IS NULL
                  OR name ILIKE $1 ESCAPE '\'
                  OR description ILIKE $1 ESCAPE '\'"#,
        )
        .bind(&pattern)
        .fetch_one(&self.db)
        .await?;

        let items = self.attach_permissions(roles).await?;
        Ok(Paginated::new(items, total, params))
    }

    async fn find_role(&self, id: RoleId) -> Result<Option<RoleWithPermissions>, AppError> {
        let role: Option<Role> =
            sqlx::query_as(&format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.db)
                .await?;

        match role {
            Some(role) => Ok(self.attach_permissions(vec![role]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as(&format!("SELECT {ROLE_COLUMNS} FROM roles WHERE name = $1"))
            .bind(name)
            .fetch_optional(&self.db)
            .await?;

        Ok(role)
    }

    async fn create_role_with_permissions(
        &self,
        name: &str,
        description: Option<&str>,
        permissions: &BTreeSet<PermissionId>,
    ) -> Result<Role, AppError> {
        let mut tx = self.db.begin().await?;

        let role: Role = sqlx::query_as(&format!(
            "INSERT INTO roles (name, description) VALUES ($1, $2) RETURNING {ROLE_COLUMNS}"
        ))
        .bind(name)
        .bind(description)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "Role with this name already exists"))?;

        if !permissions.is_empty() {
            apply_permission_set(&mut tx, role.id, permissions).await?;
        }

        tx.commit().await?;
        Ok(role)
    }

    async fn update_role_with_permissions(
        &self,
        id: RoleId,
        name: Option<&str>,
        description: Option<&str>,
        permissions: Option<&BTreeSet<PermissionId>>,
    ) -> Result<Option<(Role, PermissionDiff<PermissionId>)>, AppError> {
        let mut tx = self.db.begin().await?;

        // The UPDATE holds the row lock until commit
        let role: Option<Role> = sqlx::query_as(&format!(
            r#"UPDATE roles
               SET name = COALESCE($2, name),
                   description = COALESCE($3, description),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING {ROLE_COLUMNS}"#
        ))
        .bind(id)
        .bind(name)
        .bind(description)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "Role with this name already exists"))?;

        let Some(role) = role else {
            return Ok(None);
        };

        let diff = match permissions {
            Some(desired) => apply_permission_set(&mut tx, id, desired).await?,
            None => PermissionDiff::default(),
        };

        tx.commit().await?;
        Ok(Some((role, diff)))
    }

    async fn delete_role(&self, id: RoleId) -> Result<bool, AppError> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM user_roles WHERE role_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ensure_role(&self, name: &str, description: Option<&str>) -> Result<Role, AppError> {
        sqlx::query(
            "INSERT INTO roles (name, description) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING",
        )
        .bind(name)
        .bind(description)
        .execute(&self.db)
        .await?;

        let role = sqlx::query_as(&format!("SELECT {ROLE_COLUMNS} FROM roles WHERE name = $1"))
            .bind(name)
            .fetch_one(&self.db)
            .await?;

        Ok(role)
    }

    async fn role_permissions(&self, id: RoleId) -> Result<Vec<Permission>, AppError> {
        let permissions = sqlx::query_as(
            r#"SELECT p.id, p.resource, p.action, p.name, p.description, p.created_at, p.updated_at
               FROM permissions p
               JOIN role_permissions rp ON rp.permission_id = p.id
               WHERE rp.role_id = $1
               ORDER BY p.name"#,
        )
        .bind(id)
        .fetch_all(&self.db)
        .await?;

        Ok(permissions)
    }

    async fn replace_role_permissions(
        &self,
        role_id: RoleId,
        desired: &BTreeSet<PermissionId>,
    ) -> Result<PermissionDiff<PermissionId>, AppError> {
        let mut tx = self.db.begin().await?;

        // Serializes concurrent replaces of the same role
        let locked: Option<RoleId> =
            sqlx::query_scalar("SELECT id FROM roles WHERE id = $1 FOR UPDATE")
                .bind(role_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(AppError::not_found(anyhow!("Role not found")));
        }

        let diff = apply_permission_set(&mut tx, role_id, desired).await?;

        tx.commit().await?;

        debug!(
            role_id = %role_id,
            added = diff.to_add.len(),
            removed = diff.to_remove.len(),
            "Role permissions replaced"
        );

        Ok(diff)
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, AppError> {
        let credentials =
            sqlx::query_as("SELECT id, email, name, password_hash FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.db)
                .await?;

        Ok(credentials)
    }

    async fn list_users(
        &self,
        params: &PaginationParams,
    ) -> Result<Paginated<UserWithRole>, AppError> {
        let pattern = search_pattern(params);

        let users: Vec<User> = sqlx::query_as(&format!(
            r#"SELECT {USER_COLUMNS} FROM users
               WHERE $1::text IS NULL
                  OR name ILIKE $1 ESCAPE '\'
                  OR email ILIKE $1 ESCAPE '\'
               ORDER BY created_at, email
               LIMIT $2 OFFSET $3"#
        ))
        .bind(&pattern)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.db)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM users
               WHERE $1::text IS NULL
                  OR name ILIKE $1 ESCAPE '\'
                  OR email ILIKE $1 ESCAPE '\'"#,
        )
        .bind(&pattern)
        .fetch_one(&self.db)
        .await?;

        let ids: Vec<Uuid> = users.iter().map(|u| u.id.into_inner()).collect();
        let rows: Vec<AssignedRoleRow> = sqlx::query_as(
            r#"SELECT DISTINCT ON (ur.user_id) ur.user_id, r.id, r.name, r.description,
                      r.created_at, r.updated_at
               FROM user_roles ur
               JOIN roles r ON r.id = ur.role_id
               WHERE ur.user_id = ANY($1)
               ORDER BY ur.user_id, ur.assigned_at, ur.id"#,
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;
        let mut roles: HashMap<UserId, Role> =
            rows.into_iter().map(|row| (row.user_id, row.role)).collect();

        let items = users
            .into_iter()
            .map(|user| UserWithRole {
                role: roles.remove(&user.id),
                user,
            })
            .collect();

        Ok(Paginated::new(items, total, params))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        sqlx::query_as(&format!(
            r#"INSERT INTO users (email, name, password_hash)
               VALUES ($1, $2, $3)
               RETURNING {USER_COLUMNS}"#
        ))
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| conflict_on_unique(e, "User with this email already exists"))
    }

    async fn update_user_name(&self, id: UserId, name: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as(&format!(
            "UPDATE users SET name = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn first_user(&self) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, email LIMIT 1"
        ))
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    async fn user_roles(&self, user_id: UserId) -> Result<Vec<Role>, AppError> {
        let roles = sqlx::query_as(
            r#"SELECT r.id, r.name, r.description, r.created_at, r.updated_at
               FROM roles r
               JOIN user_roles ur ON ur.role_id = r.id
               WHERE ur.user_id = $1
               ORDER BY ur.assigned_at, ur.id"#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(roles)
    }

    async fn users_with_role(&self, role_id: RoleId) -> Result<Vec<UserId>, AppError> {
        let users = sqlx::query_scalar(
            "SELECT user_id FROM user_roles WHERE role_id = $1 ORDER BY assigned_at, id",
        )
        .bind(role_id)
        .fetch_all(&self.db)
        .await?;

        Ok(users)
    }

    async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"INSERT INTO user_roles (user_id, role_id)
               VALUES ($1, $2)
               ON CONFLICT (user_id, role_id) DO NOTHING"#,
        )
        .bind(user_id)
        .bind(role_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_user_role(
        &self,
        user_id: UserId,
        role_id: Option<RoleId>,
    ) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;

        let locked: Option<UserId> =
            sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(AppError::not_found(anyhow!("User not found")));
        }

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if let Some(role_id) = role_id {
            sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)")
                .bind(user_id)
                .bind(role_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    if is_foreign_key_violation(&e) {
                        AppError::unprocessable(anyhow!("Role not found"))
                    } else {
                        AppError::database(e)
                    }
                })?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn user_permission_names(&self, user_id: UserId) -> Result<BTreeSet<String>, AppError> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"SELECT DISTINCT p.name
               FROM user_roles ur
               JOIN role_permissions rp ON rp.role_id = ur.role_id
               JOIN permissions p ON p.id = rp.permission_id
               WHERE ur.user_id = $1"#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(names.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_escapes_wildcards() {
        assert_eq!(escape_like("blog"), "blog");
        assert_eq!(escape_like("doctor_profiles"), "doctor\\_profiles");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_search_pattern_wraps_escaped_text() {
        let params = PaginationParams::default().with_search(" _ ");
        assert_eq!(search_pattern(&params).as_deref(), Some("%\\_%"));
        assert_eq!(search_pattern(&PaginationParams::default()), None);
    }
}
