//! # Atrium Core
//!
//! Core types, errors, and the authorization building blocks of the Atrium API.
//!
//! This crate provides foundational types used throughout the Atrium application:
//!
//! - [`errors`]: Application and authorization error types with HTTP response conversion
//! - [`pagination`]: Page-based pagination for list endpoints
//! - [`password`]: Secure password hashing and verification
//! - [`permissions`]: Permission names, core permission constants and set reconciliation
//! - [`registry`]: The permission registry assembled once at bootstrap
//! - [`navigation`]: The back-office navigation tree and its permission filter
//! - [`serde`]: Custom serde deserialization helpers
//!
//! # Example
//!
//! ```ignore
//! use atrium_core::permissions::{self, PermissionName};
//! use atrium_core::registry::PermissionRegistry;
//!
//! let mut builder = PermissionRegistry::builder();
//! let users = builder.define_permissions(
//!     "users",
//!     [("READ", permissions::USERS_READ), ("WRITE", permissions::USERS_WRITE)],
//! );
//! let registry = builder.build();
//!
//! assert!(registry.contains(&users["READ"]));
//! let name = PermissionName::parse("Blog:Write")?;
//! assert_eq!(name.to_string(), "blog:write");
//! ```

pub mod errors;
pub mod navigation;
pub mod pagination;
pub mod password;
pub mod permissions;
pub mod registry;
pub mod serde;

// Re-export commonly used types at crate root
pub use errors::{AppError, AuthError};
pub use navigation::{NavigationItem, NavigationKind, NavigationTree};
pub use pagination::{Paginated, PaginationParams};
pub use password::{hash_password, verify_password};
pub use permissions::{PermissionDiff, PermissionName};
pub use registry::{ActionMap, ModuleConfig, PermissionRegistry, PermissionRegistryBuilder};
