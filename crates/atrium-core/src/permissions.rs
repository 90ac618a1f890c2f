//! Permission names and the permission constants of the core back-office areas.
//!
//! A permission is a `(resource, action)` pair written as `"resource:action"`.
//! Parsing splits on the first colon and folds both halves to lowercase, so the
//! canonical string and the pair convert into each other without loss.
//!
//! # Example
//!
//! ```ignore
//! use atrium_core::permissions::{self, PermissionName};
//!
//! let name = PermissionName::parse("Forms:Write")?;
//! assert_eq!(name.resource(), "forms");
//! assert_eq!(name.action(), "write");
//! assert_eq!(name.to_string(), "forms:write");
//!
//! assert_eq!(permissions::USERS_READ, "users:read");
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

// =============================================================================
// Dashboard permissions
// =============================================================================

/// Permission to open the dashboard
pub const DASHBOARD_READ: &str = "dashboard:read";

// =============================================================================
// Users permissions
// =============================================================================

/// Permission to list users
pub const USERS_READ: &str = "users:read";
/// Permission to create and update users
pub const USERS_WRITE: &str = "users:write";
/// Permission to delete users
pub const USERS_DELETE: &str = "users:delete";

// =============================================================================
// Roles permissions (also guards permission management)
// =============================================================================

/// Permission to list roles and permissions
pub const ROLES_READ: &str = "roles:read";
/// Permission to create and update roles and permissions
pub const ROLES_WRITE: &str = "roles:write";
/// Permission to delete roles and permissions
pub const ROLES_DELETE: &str = "roles:delete";

// =============================================================================
// Appointments and messages permissions
// =============================================================================

pub const APPOINTMENTS_READ: &str = "appointments:read";
pub const APPOINTMENTS_WRITE: &str = "appointments:write";
pub const APPOINTMENTS_DELETE: &str = "appointments:delete";

pub const MESSAGES_READ: &str = "messages:read";
pub const MESSAGES_WRITE: &str = "messages:write";
pub const MESSAGES_DELETE: &str = "messages:delete";

// =============================================================================
// Settings and reports permissions
// =============================================================================

/// Permission to view site settings
pub const SETTINGS_READ: &str = "settings:read";
/// Permission to change site settings
pub const SETTINGS_WRITE: &str = "settings:write";
/// Permission to view reports
pub const REPORTS_READ: &str = "reports:read";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionNameError {
    #[error("Permission name must have the form resource:action")]
    MissingSeparator,
    #[error("Permission resource must not be empty")]
    EmptyResource,
    #[error("Permission action must not be empty")]
    EmptyAction,
}

/// A parsed, lowercase `resource:action` permission.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PermissionName {
    resource: String,
    action: String,
}

impl PermissionName {
    /// Splits `name` on its first colon. Both halves are lowercased.
    pub fn parse(name: &str) -> Result<Self, PermissionNameError> {
        let (resource, action) = name
            .split_once(':')
            .ok_or(PermissionNameError::MissingSeparator)?;

        Self::from_parts(resource, action)
    }

    pub fn from_parts(resource: &str, action: &str) -> Result<Self, PermissionNameError> {
        let resource = resource.to_lowercase();
        let action = action.to_lowercase();

        if resource.is_empty() {
            return Err(PermissionNameError::EmptyResource);
        }
        if action.is_empty() {
            return Err(PermissionNameError::EmptyAction);
        }

        Ok(Self { resource, action })
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    /// Description given to permissions created from the registry.
    pub fn default_description(&self) -> String {
        format!("Permission to {} {}", self.action, self.resource)
    }
}

impl fmt::Display for PermissionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.action)
    }
}

impl FromStr for PermissionName {
    type Err = PermissionNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// The edits that turn one set into another.
///
/// Used for every full-replace of a role's permissions: applying `to_add` and
/// `to_remove` to `current` yields exactly `desired`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionDiff<T: Ord> {
    pub to_add: BTreeSet<T>,
    pub to_remove: BTreeSet<T>,
}

impl<T: Ord> Default for PermissionDiff<T> {
    fn default() -> Self {
        Self {
            to_add: BTreeSet::new(),
            to_remove: BTreeSet::new(),
        }
    }
}

impl<T: Ord + Clone> PermissionDiff<T> {
    pub fn between(current: &BTreeSet<T>, desired: &BTreeSet<T>) -> Self {
        Self {
            to_add: desired.difference(current).cloned().collect(),
            to_remove: current.difference(desired).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Applies the diff to `current` in place.
    pub fn apply(&self, current: &mut BTreeSet<T>) {
        for item in &self.to_remove {
            current.remove(item);
        }
        current.extend(self.to_add.iter().cloned());
    }
}
