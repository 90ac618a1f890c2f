use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use atrium_core::PaginationParams;
use atrium_models::{
    AccessResponse, CatalogModule, CatalogResponse, CreatePermissionDto, CreateRoleDto,
    CreateUserDto, LoginRequest, LoginResponse, NavigationResponse, Permission,
    PermissionsResponse, Role, RoleWithPermissions, SessionUser, SyncReport, SyncStats,
    UpdatePermissionDto, UpdateRoleDto, UpdateUserDto, User, UserWithRole,
};

use crate::modules::auth::controller::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::login,
        crate::modules::auth::controller::logout,
        crate::modules::auth::controller::me,
        crate::modules::auth::controller::permissions,
        crate::modules::auth::controller::navigation,
        crate::modules::auth::controller::access,
        crate::modules::roles::controller::get_roles,
        crate::modules::roles::controller::get_role,
        crate::modules::roles::controller::create_role,
        crate::modules::roles::controller::update_role,
        crate::modules::roles::controller::delete_role,
        crate::modules::roles::controller::get_role_permissions,
        crate::modules::roles::controller::get_permissions,
        crate::modules::roles::controller::create_permission,
        crate::modules::roles::controller::update_permission,
        crate::modules::roles::controller::delete_permission,
        crate::modules::users::controller::get_users,
        crate::modules::users::controller::get_user,
        crate::modules::users::controller::create_user,
        crate::modules::users::controller::update_user,
        crate::modules::users::controller::delete_user,
        crate::modules::system::controller::sync_permissions,
        crate::modules::system::controller::get_catalog,
    ),
    components(
        schemas(
            LoginRequest,
            LoginResponse,
            SessionUser,
            PermissionsResponse,
            NavigationResponse,
            AccessResponse,
            Permission,
            Role,
            RoleWithPermissions,
            CreateRoleDto,
            UpdateRoleDto,
            CreatePermissionDto,
            UpdatePermissionDto,
            User,
            UserWithRole,
            CreateUserDto,
            UpdateUserDto,
            SyncReport,
            SyncStats,
            CatalogModule,
            CatalogResponse,
            PaginationParams,
            ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Session, effective permissions and navigation"),
        (name = "Roles", description = "Role management"),
        (name = "Permissions", description = "Permission management"),
        (name = "Users", description = "User management and role assignment"),
        (name = "System", description = "Permission sync and catalog")
    ),
    info(
        title = "Atrium API",
        version = "0.1.0",
        description = "Role-based access control for the Atrium back office.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_admin_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        for expected in [
            "/api/auth/login",
            "/api/admin/roles/{id}",
            "/api/admin/permissions",
            "/api/admin/users/{id}",
            "/api/admin/system/sync",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "{expected} missing"
            );
        }
    }

    #[test]
    fn test_bearer_scheme_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
