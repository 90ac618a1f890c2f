//! Authorization middleware and extractors.
//!
//! Every protected request goes through the same states:
//! unauthenticated, then authenticated once a session resolves to a stored
//! user, then authorized or forbidden once the permission is checked against
//! the user's current roles.
//!
//! # Authentication Flow
//!
//! 1. The client sends `Authorization: Bearer <token>` or the session cookie
//! 2. [`auth::require_user`] verifies the token and loads the user
//! 3. [`auth::require_permission`] reads the user's effective permissions from
//!    the store and checks membership
//! 4. The handler runs with the resolved [`SessionUser`](atrium_models::SessionUser)
//!
//! Permissions are never cached: a role change applies to the next request.
//!
//! # Example
//!
//! ```ignore
//! use crate::middleware::auth::{CurrentUser, RequireRolesWrite};
//!
//! // Any valid session
//! async fn me(CurrentUser(user): CurrentUser) -> Json<SessionUser> {
//!     Json(user)
//! }
//!
//! // Only with "roles:write"
//! async fn create_role(RequireRolesWrite(user): RequireRolesWrite) -> impl IntoResponse {
//!     // ...
//! }
//! ```

pub mod auth;
