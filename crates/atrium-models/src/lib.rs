//! # Atrium Models
//!
//! Domain models and DTOs for the Atrium API.
//!
//! This crate provides the rows persisted by the authorization store and the
//! request/response bodies of the HTTP surface. Wire bodies use camelCase keys.
//!
//! # Modules
//!
//! - [`ids`]: Strongly-typed ids for users, roles and permissions
//! - [`roles`]: Roles, permissions and their DTOs
//! - [`users`]: Users and their DTOs
//! - [`auth`]: Login, session user and navigation responses
//! - [`system`]: Permission sync report and catalog listing
//!
//! # Example
//!
//! ```ignore
//! use atrium_models::roles::{CreateRoleDto, RoleWithPermissions};
//! use atrium_models::ids::PermissionId;
//!
//! let dto = CreateRoleDto {
//!     name: "editor".into(),
//!     description: Some("Edits content".into()),
//!     permission_ids: Some(vec![blog_read_id]),
//! };
//! ```

pub mod auth;
pub mod ids;
pub mod roles;
pub mod system;
pub mod users;

// Re-export commonly used types at crate root for convenience
pub use ids::{PermissionId, RoleId, UserId};

pub use roles::{
    CreatePermissionDto, CreateRoleDto, Permission, Role, RoleWithPermissions,
    UpdatePermissionDto, UpdateRoleDto,
};

pub use users::{CreateUserDto, NewUser, UpdateUserDto, User, UserCredentials, UserWithRole};

pub use auth::{
    AccessQuery, AccessResponse, LoginRequest, LoginResponse, NavigationResponse,
    PermissionsResponse, SessionUser,
};

pub use system::{CatalogModule, CatalogResponse, SyncReport, SyncStats};
