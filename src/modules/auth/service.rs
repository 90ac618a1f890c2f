use tracing::{info, instrument, warn};

use atrium_auth::create_session_token;
use atrium_config::SessionConfig;
use atrium_core::navigation::{filter_navigation, find_required_permission};
use atrium_core::{AppError, NavigationTree, verify_password};
use atrium_models::{AccessResponse, LoginRequest, LoginResponse, SessionUser};
use atrium_observability::track_user_login;

use crate::middleware::auth::get_user_permissions;
use crate::store::AuthzStore;

pub struct AuthService;

impl AuthService {
    /// Checks the credentials and issues a session token.
    ///
    /// Unknown emails and wrong passwords get the same 401.
    #[instrument(skip_all, fields(email = %dto.email))]
    pub async fn login(
        store: &dyn AuthzStore,
        dto: LoginRequest,
        config: &SessionConfig,
    ) -> Result<LoginResponse, AppError> {
        let email = dto.email.trim().to_lowercase();

        let credentials = match store.find_credentials_by_email(&email).await? {
            Some(credentials) => credentials,
            None => {
                warn!("Login failed: unknown email");
                track_user_login(false);
                return Err(invalid_credentials());
            }
        };

        if !verify_password(&dto.password, &credentials.password_hash)? {
            warn!(user_id = %credentials.id, "Login failed: wrong password");
            track_user_login(false);
            return Err(invalid_credentials());
        }

        let user = SessionUser::from(credentials);
        let access_token = create_session_token(user.id.into_inner(), &user.email, config)?;
        let permissions = get_user_permissions(store, user.id).await?;

        info!(user_id = %user.id, "User logged in");
        track_user_login(true);

        Ok(LoginResponse {
            access_token,
            user,
            permissions: permissions.into_iter().collect(),
        })
    }

    /// The caller's effective permissions, sorted.
    pub async fn permissions(
        store: &dyn AuthzStore,
        user: &SessionUser,
    ) -> Result<Vec<String>, AppError> {
        let permissions = get_user_permissions(store, user.id).await?;
        Ok(permissions.into_iter().collect())
    }

    pub async fn navigation(
        store: &dyn AuthzStore,
        tree: &NavigationTree,
        user: &SessionUser,
    ) -> Result<NavigationTree, AppError> {
        let permissions = get_user_permissions(store, user.id).await?;
        Ok(filter_navigation(tree, &permissions))
    }

    /// Whether the caller may open `path`. Paths the navigation does not gate
    /// are allowed.
    pub async fn access(
        store: &dyn AuthzStore,
        tree: &NavigationTree,
        user: &SessionUser,
        path: &str,
    ) -> Result<AccessResponse, AppError> {
        let permission = find_required_permission(tree, path).map(str::to_string);

        let allowed = match &permission {
            Some(required) => get_user_permissions(store, user.id)
                .await?
                .contains(required),
            None => true,
        };

        Ok(AccessResponse {
            path: path.to_string(),
            permission,
            allowed,
        })
    }
}

fn invalid_credentials() -> AppError {
    AppError::unauthorized("Invalid email or password".to_string())
}
