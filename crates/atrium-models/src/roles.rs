//! Role and permission models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::ids::{PermissionId, RoleId};

/// A persisted `(resource, action)` permission. `name` is `resource:action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: PermissionId,
    pub resource: String,
    pub action: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// A role together with its permission set and the number of users holding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<Permission>,
    pub user_count: i64,
}

impl RoleWithPermissions {
    pub fn permission_names(&self) -> Vec<&str> {
        self.permissions.iter().map(|p| p.name.as_str()).collect()
    }
}

// DTOs

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoleDto {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name must be between 1 and 100 characters"
    ))]
    pub name: String,
    #[validate(length(max = 500, message = "Description must not exceed 500 characters"))]
    pub description: Option<String>,
    /// Permission IDs granted to the new role
    pub permission_ids: Option<Vec<PermissionId>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleDto {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name must be between 1 and 100 characters"
    ))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Description must not exceed 500 characters"))]
    pub description: Option<String>,
    /// When present, replaces the role's permission set entirely
    pub permission_ids: Option<Vec<PermissionId>>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePermissionDto {
    /// `resource:action`, e.g. `blog:write`
    #[validate(length(
        min = 3,
        max = 100,
        message = "Name must be between 3 and 100 characters"
    ))]
    pub name: String,
    #[validate(length(max = 500, message = "Description must not exceed 500 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePermissionDto {
    #[validate(length(
        min = 3,
        max = 100,
        message = "Name must be between 3 and 100 characters"
    ))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Description must not exceed 500 characters"))]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_create_role_dto_valid() {
        let dto = CreateRoleDto {
            name: "editor".to_string(),
            description: Some("Edits content".to_string()),
            permission_ids: None,
        };
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_create_role_dto_empty_name() {
        let dto = CreateRoleDto {
            name: String::new(),
            description: None,
            permission_ids: None,
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_create_role_dto_description_too_long() {
        let dto = CreateRoleDto {
            name: "editor".to_string(),
            description: Some("a".repeat(501)),
            permission_ids: None,
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_update_role_dto_all_optional() {
        assert!(UpdateRoleDto::default().validate().is_ok());
    }

    #[test]
    fn test_update_role_dto_deserializes_camel_case() {
        let id = Uuid::new_v4();
        let dto: UpdateRoleDto =
            serde_json::from_str(&format!(r#"{{"permissionIds":["{id}"]}}"#)).unwrap();
        assert_eq!(dto.permission_ids, Some(vec![PermissionId(id)]));
        assert!(dto.name.is_none());
    }

    #[test]
    fn test_update_role_dto_empty_permission_list_is_present() {
        let dto: UpdateRoleDto = serde_json::from_str(r#"{"permissionIds":[]}"#).unwrap();
        assert_eq!(dto.permission_ids, Some(vec![]));
    }

    #[test]
    fn test_create_permission_dto_too_short() {
        let dto = CreatePermissionDto {
            name: "a:".to_string(),
            description: None,
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_role_with_permissions_flattens_role() {
        let now = chrono::Utc::now();
        let role = RoleWithPermissions {
            role: Role {
                id: RoleId::new(),
                name: "editor".to_string(),
                description: None,
                created_at: now,
                updated_at: now,
            },
            permissions: vec![],
            user_count: 3,
        };
        let json = serde_json::to_value(&role).unwrap();
        assert_eq!(json["name"], "editor");
        assert_eq!(json["userCount"], 3);
        assert!(json["permissions"].as_array().unwrap().is_empty());
    }
}
