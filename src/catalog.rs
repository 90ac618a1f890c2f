//! The permissions and navigation of the back office.
//!
//! Core areas declare their permissions as named groups; content features
//! register a [`ModuleConfig`] that brings CRUD permissions and a navigation
//! entry. Both are folded into one [`PermissionRegistry`] at startup.

use atrium_core::permissions::{
    APPOINTMENTS_DELETE, APPOINTMENTS_READ, APPOINTMENTS_WRITE, DASHBOARD_READ, MESSAGES_DELETE,
    MESSAGES_READ, MESSAGES_WRITE, REPORTS_READ, ROLES_DELETE, ROLES_READ, ROLES_WRITE,
    SETTINGS_READ, SETTINGS_WRITE, USERS_DELETE, USERS_READ, USERS_WRITE,
};
use atrium_core::{ModuleConfig, NavigationItem, NavigationTree, PermissionRegistry};

/// Content features, each contributing `<name>:read|write|delete`.
fn content_modules() -> Vec<ModuleConfig> {
    vec![
        crud_module("pages", "Pages", "/admin/pages", "i-lucide-file-text"),
        crud_module("blog", "Blog", "/admin/blog", "i-lucide-newspaper"),
        crud_module("products", "Products", "/admin/urunler", "i-lucide-package"),
        crud_module(
            "doctorprofile",
            "Doctor Profiles",
            "/admin/doctor-profiles",
            "i-lucide-stethoscope",
        ),
        crud_module(
            "doctortestimonial",
            "Testimonials",
            "/admin/doctor-testimonials",
            "i-lucide-quote",
        ),
        crud_module("forms", "Forms", "/admin/forms", "i-lucide-clipboard-list"),
        components_module(),
    ]
}

fn crud_module(name: &str, label: &str, to: &str, icon: &str) -> ModuleConfig {
    let module = ModuleConfig::new(name).with_crud_permissions();
    let item = NavigationItem::link(label, to).with_icon(icon);
    let item = match module.permission("READ") {
        Some(read) => item.requires(read),
        None => item,
    };
    module.with_navigation(item)
}

// Children carry no permission of their own; the group gates them.
fn components_module() -> ModuleConfig {
    let module = ModuleConfig::new("components").with_crud_permissions();
    let mut group = NavigationItem::group("Components")
        .with_icon("i-lucide-blocks")
        .with_children([
            NavigationItem::link("All Components", "/admin/components"),
            NavigationItem::link("Builder", "/admin/components/builder"),
        ]);
    if let Some(read) = module.permission("READ") {
        group = group.requires(read);
    }
    module.with_navigation(group)
}

/// Builds the registry of every permission the back office understands.
pub fn build_registry() -> PermissionRegistry {
    let mut builder = PermissionRegistry::builder();

    builder.define_permissions("dashboard", [("READ", DASHBOARD_READ)]);
    builder.define_permissions(
        "users",
        [
            ("READ", USERS_READ),
            ("WRITE", USERS_WRITE),
            ("DELETE", USERS_DELETE),
        ],
    );
    builder.define_permissions(
        "roles",
        [
            ("READ", ROLES_READ),
            ("WRITE", ROLES_WRITE),
            ("DELETE", ROLES_DELETE),
        ],
    );
    builder.define_permissions(
        "appointments",
        [
            ("READ", APPOINTMENTS_READ),
            ("WRITE", APPOINTMENTS_WRITE),
            ("DELETE", APPOINTMENTS_DELETE),
        ],
    );
    builder.define_permissions(
        "messages",
        [
            ("READ", MESSAGES_READ),
            ("WRITE", MESSAGES_WRITE),
            ("DELETE", MESSAGES_DELETE),
        ],
    );
    builder.define_permissions(
        "settings",
        [("READ", SETTINGS_READ), ("WRITE", SETTINGS_WRITE)],
    );
    builder.define_permissions("reports", [("READ", REPORTS_READ)]);

    for module in content_modules() {
        builder.register_module(module);
    }

    builder.build()
}

/// Assembles the full navigation tree. Content entries come from the modules
/// registered in `registry`, in registration order.
pub fn build_navigation(registry: &PermissionRegistry) -> NavigationTree {
    vec![
        vec![
            NavigationItem::link("Dashboard", "/admin")
                .with_icon("i-lucide-house")
                .requires(DASHBOARD_READ),
        ],
        vec![
            NavigationItem::group("User Management")
                .with_icon("i-lucide-users")
                .with_children([
                    NavigationItem::link("Users", "/admin/users/users").requires(USERS_READ),
                    NavigationItem::link("Roles", "/admin/users/roles").requires(ROLES_READ),
                    NavigationItem::link("Permissions", "/admin/users/permissions")
                        .requires(ROLES_READ),
                ]),
        ],
        vec![
            NavigationItem::heading("Content"),
            NavigationItem::group("Content Management")
                .with_icon("i-lucide-layout-dashboard")
                .open_by_default()
                .with_children(registry.module_navigation().cloned()),
        ],
        vec![
            NavigationItem::link("Appointments", "/admin/appointments")
                .with_icon("i-lucide-calendar")
                .requires(APPOINTMENTS_READ),
            NavigationItem::link("Messages", "/admin/messages")
                .with_icon("i-lucide-inbox")
                .requires(MESSAGES_READ),
        ],
        vec![
            NavigationItem::heading("System"),
            NavigationItem::link("Settings", "/admin/settings")
                .with_icon("i-lucide-settings")
                .requires(SETTINGS_READ),
            NavigationItem::link("Reports", "/admin/reports")
                .with_icon("i-lucide-chart-bar")
                .requires(REPORTS_READ),
        ],
    ]
}
