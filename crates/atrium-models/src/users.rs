//! User models and DTOs.

use atrium_core::serde::deserialize_nullable;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::ids::{RoleId, UserId};
use crate::roles::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Login lookup row. Never serialized.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

/// A user with its authoritative (earliest assigned) role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserWithRole {
    #[serde(flatten)]
    pub user: User,
    pub role: Option<Role>,
}

/// Insert payload for the store; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserDto {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name must be between 1 and 100 characters"
    ))]
    pub name: String,
    pub role_id: Option<RoleId>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserDto {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name must be between 1 and 100 characters"
    ))]
    pub name: Option<String>,
    /// Absent keeps the current role, `null` clears it, an id replaces it
    #[serde(default, deserialize_with = "deserialize_nullable")]
    #[schema(value_type = Option<String>, format = "uuid")]
    pub role_id: Option<Option<RoleId>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_create_user_dto_valid() {
        let dto = CreateUserDto {
            email: "editor@example.com".to_string(),
            password: "longenough".to_string(),
            name: "Editor".to_string(),
            role_id: None,
        };
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_create_user_dto_invalid_email() {
        let dto = CreateUserDto {
            email: "not-an-email".to_string(),
            password: "longenough".to_string(),
            name: "Editor".to_string(),
            role_id: None,
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_create_user_dto_short_password() {
        let dto = CreateUserDto {
            email: "editor@example.com".to_string(),
            password: "short".to_string(),
            name: "Editor".to_string(),
            role_id: None,
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_update_user_dto_role_states() {
        let absent: UpdateUserDto = serde_json::from_str(r#"{"name":"New"}"#).unwrap();
        assert_eq!(absent.role_id, None);

        let cleared: UpdateUserDto = serde_json::from_str(r#"{"roleId":null}"#).unwrap();
        assert_eq!(cleared.role_id, Some(None));

        let id = Uuid::new_v4();
        let replaced: UpdateUserDto =
            serde_json::from_str(&format!(r#"{{"roleId":"{id}"}}"#)).unwrap();
        assert_eq!(replaced.role_id, Some(Some(RoleId(id))));
    }

    #[test]
    fn test_user_credentials_stay_out_of_user_json() {
        let now = chrono::Utc::now();
        let user = User {
            id: UserId::new(),
            email: "a@example.com".to_string(),
            name: "A".to_string(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(UserWithRole { user, role: None }).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json["role"].is_null());
        assert_eq!(json["email"], "a@example.com");
    }
}
