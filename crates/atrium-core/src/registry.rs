//! The permission registry.
//!
//! Every permission the application understands is declared in code, either as a
//! named group through [`PermissionRegistryBuilder::define_permissions`] or by a
//! feature module registering its [`ModuleConfig`]. The builder is filled once
//! during bootstrap and frozen into a [`PermissionRegistry`], which is then shared
//! read-only (behind an `Arc`) with the sync routine, the middleware and the CLI.
//!
//! # Example
//!
//! ```ignore
//! use atrium_core::registry::{ModuleConfig, PermissionRegistry};
//!
//! let mut builder = PermissionRegistry::builder();
//! let dashboard = builder.define_permissions("dashboard", [("READ", "dashboard:read")]);
//! builder.register_module(ModuleConfig::new("blog").with_crud_permissions());
//! let registry = builder.build();
//!
//! assert!(registry.contains(&dashboard["READ"]));
//! assert!(registry.contains("blog:delete"));
//! ```

use std::collections::{BTreeMap, BTreeSet};

use crate::navigation::NavigationItem;

/// Symbolic key (`READ`, `WRITE`, ...) to permission string.
pub type ActionMap = BTreeMap<String, String>;

/// Collects declared actions. Permission strings are folded to lowercase, the
/// form the store and the guards compare against; keys are kept as written.
fn action_map<I, K, V>(actions: I) -> ActionMap
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    actions
        .into_iter()
        .map(|(k, v)| (k.into(), Into::<String>::into(v).to_lowercase()))
        .collect()
}

/// A named group of permissions declared directly in code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModulePermissionSet {
    pub module: String,
    pub actions: ActionMap,
}

/// A self-contained feature area contributing permissions and navigation.
#[derive(Debug, Clone)]
pub struct ModuleConfig {
    pub name: String,
    pub permissions: ActionMap,
    pub navigation: Option<NavigationItem>,
}

impl ModuleConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permissions: ActionMap::new(),
            navigation: None,
        }
    }

    /// Declares `READ`, `WRITE` and `DELETE` as `<name>:read|write|delete`.
    pub fn with_crud_permissions(self) -> Self {
        let name = self.name.clone();
        self.with_permissions([
            ("READ", format!("{name}:read")),
            ("WRITE", format!("{name}:write")),
            ("DELETE", format!("{name}:delete")),
        ])
    }

    pub fn with_permissions<I, K, V>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.permissions.extend(action_map(actions));
        self
    }

    pub fn with_navigation(mut self, item: NavigationItem) -> Self {
        self.navigation = Some(item);
        self
    }

    /// Looks up a permission by its symbolic key.
    pub fn permission(&self, key: &str) -> Option<&str> {
        self.permissions.get(key).map(String::as_str)
    }
}

#[derive(Debug, Default)]
pub struct PermissionRegistryBuilder {
    declarations: Vec<ModulePermissionSet>,
    modules: Vec<ModuleConfig>,
}

impl PermissionRegistryBuilder {
    /// Registers `module -> actions` and hands the map back, so a call site can
    /// declare and bind in one expression. The returned strings are the
    /// lowercase forms that enter the catalog.
    pub fn define_permissions<I, K, V>(&mut self, module: &str, actions: I) -> ActionMap
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let actions = action_map(actions);

        self.declarations.push(ModulePermissionSet {
            module: module.to_string(),
            actions: actions.clone(),
        });

        actions
    }

    pub fn register_module(&mut self, module: ModuleConfig) -> &mut Self {
        self.modules.push(module);
        self
    }

    pub fn build(self) -> PermissionRegistry {
        let catalog = self
            .declarations
            .iter()
            .flat_map(|set| set.actions.values())
            .chain(self.modules.iter().flat_map(|m| m.permissions.values()))
            .cloned()
            .collect();

        PermissionRegistry {
            declarations: self.declarations,
            modules: self.modules,
            catalog,
        }
    }
}

/// The frozen catalog of permission strings.
#[derive(Debug, Clone, Default)]
pub struct PermissionRegistry {
    declarations: Vec<ModulePermissionSet>,
    modules: Vec<ModuleConfig>,
    catalog: BTreeSet<String>,
}

impl PermissionRegistry {
    pub fn builder() -> PermissionRegistryBuilder {
        PermissionRegistryBuilder::default()
    }

    /// Union of every declared and module-contributed permission string.
    pub fn all_permission_strings(&self) -> &BTreeSet<String> {
        &self.catalog
    }

    pub fn contains(&self, permission: &str) -> bool {
        self.catalog.contains(permission)
    }

    pub fn declarations(&self) -> &[ModulePermissionSet] {
        &self.declarations
    }

    pub fn modules(&self) -> &[ModuleConfig] {
        &self.modules
    }

    pub fn module(&self, name: &str) -> Option<&ModuleConfig> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Permission strings grouped by the module (or declaration) that named them.
    pub fn grouped(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut groups: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for set in &self.declarations {
            groups
                .entry(set.module.clone())
                .or_default()
                .extend(set.actions.values().cloned());
        }
        for module in &self.modules {
            groups
                .entry(module.name.clone())
                .or_default()
                .extend(module.permissions.values().cloned());
        }

        groups
    }

    /// Navigation entries contributed by registered modules, in registration order.
    pub fn module_navigation(&self) -> impl Iterator<Item = &NavigationItem> {
        self.modules.iter().filter_map(|m| m.navigation.as_ref())
    }
}
