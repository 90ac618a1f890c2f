use anyhow::anyhow;
use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use dotenvy::dotenv;

use atrium::catalog::build_registry;
use atrium::modules::system::service::{ADMIN_ROLE_NAME, sync_permissions};
use atrium::modules::users::service::create_user;
use atrium::store::{AuthzStore, PgAuthzStore};
use atrium_config::{DatabaseConfig, SyncConfig};
use atrium_core::{AppError, PermissionRegistry};
use atrium_db::{init_db_pool, run_migrations};
use atrium_models::CreateUserDto;

#[derive(Parser)]
#[command(name = "atrium-cli")]
#[command(about = "Atrium CLI - Administrative tools for Atrium", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a user holding the admin role
    CreateAdmin {
        /// Email address
        #[arg(short = 'e', long)]
        email: Option<String>,

        /// Display name
        #[arg(short = 'n', long)]
        name: Option<String>,

        /// Password (will be prompted securely if not provided)
        #[arg(short = 'p', long)]
        password: Option<String>,
    },
    /// Reconcile stored permissions and the admin role with the catalog
    SyncPermissions,
    /// Show a user's roles and effective permissions
    CheckPermissions {
        /// Email of the user to inspect
        email: String,
    },
    /// Print the permission catalog grouped by module
    ListPermissions,
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    atrium_observability::init_tracing();

    let cli = Cli::parse();
    let registry = build_registry();

    match cli.command {
        Commands::CreateAdmin {
            email,
            name,
            password,
        } => handle_create_admin(&connect().await, &registry, email, name, password).await,
        Commands::SyncPermissions => handle_sync(&connect().await, &registry).await,
        Commands::CheckPermissions { email } => {
            handle_check_permissions(&connect().await, &email).await
        }
        Commands::ListPermissions => print_catalog(&registry),
    }
}

async fn connect() -> PgAuthzStore {
    let config = match DatabaseConfig::from_env() {
        Ok(config) => config,
        Err(e) => fail("Invalid database configuration", e),
    };

    let pool = match init_db_pool(&config).await {
        Ok(pool) => pool,
        Err(e) => fail("Failed to connect to database", e),
    };

    if let Err(e) = run_migrations(&pool).await {
        fail("Failed to run migrations", e);
    }

    PgAuthzStore::new(pool)
}

fn fail(context: &str, err: impl std::fmt::Display) -> ! {
    eprintln!("\n❌ {}: {}", context, err);
    std::process::exit(1);
}

fn prompt(label: &str, value: Option<String>) -> String {
    match value {
        Some(value) => value,
        None => Input::new()
            .with_prompt(label)
            .interact_text()
            .unwrap_or_else(|e| fail(&format!("Failed to read {}", label.to_lowercase()), e)),
    }
}

async fn handle_create_admin(
    store: &PgAuthzStore,
    registry: &PermissionRegistry,
    email: Option<String>,
    name: Option<String>,
    password: Option<String>,
) {
    let email = prompt("Email address", email);
    let name = prompt("Name", name);
    let password = password.unwrap_or_else(|| {
        Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords don't match")
            .interact()
            .unwrap_or_else(|e| fail("Failed to read password", e))
    });

    if password.len() < 8 {
        fail("Invalid password", "must be at least 8 characters");
    }

    match create_admin(store, registry, &email, &name, &password).await {
        Ok(permissions) => {
            println!("\n✅ Admin created successfully!");
            println!("   Email: {}", email.trim().to_lowercase());
            println!("   Name: {}", name);
            println!("   Role: {} ({} permissions)", ADMIN_ROLE_NAME, permissions);
        }
        Err(e) => fail("Error creating admin", e.error),
    }
}

/// Syncs first so the admin role exists and holds the full catalog. The new
/// user ends up with `admin` as its only role.
async fn create_admin(
    store: &PgAuthzStore,
    registry: &PermissionRegistry,
    email: &str,
    name: &str,
    password: &str,
) -> Result<usize, AppError> {
    let config = SyncConfig {
        on_startup: false,
        bootstrap_first_user: false,
    };
    let report = sync_permissions(store, registry, &config).await?;

    let admin = store
        .find_role_by_name(ADMIN_ROLE_NAME)
        .await?
        .ok_or_else(|| AppError::internal(anyhow!("Admin role missing after sync")))?;

    create_user(
        store,
        CreateUserDto {
            email: email.to_string(),
            password: password.to_string(),
            name: name.to_string(),
            role_id: Some(admin.id),
        },
    )
    .await?;

    Ok(report.stats.permissions_count)
}

async fn handle_sync(store: &PgAuthzStore, registry: &PermissionRegistry) {
    let config = SyncConfig::from_env();
    match sync_permissions(store, registry, &config).await {
        Ok(report) => {
            println!("✅ {}", report.message);
            println!("   Permissions: {}", report.stats.permissions_count);
            println!("   Role: {}", report.stats.role_name);
            println!("   Admin assigned: {}", report.stats.user_assigned);
            if report.stats.legacy_assignments_migrated > 0 {
                println!(
                    "   Legacy assignments migrated: {}",
                    report.stats.legacy_assignments_migrated
                );
            }
        }
        Err(e) => fail("Error syncing permissions", e.error),
    }
}

async fn handle_check_permissions(store: &PgAuthzStore, email: &str) {
    let email = email.trim().to_lowercase();
    let user = match store.find_credentials_by_email(&email).await {
        Ok(Some(user)) => user,
        Ok(None) => fail("User not found", &email),
        Err(e) => fail("Error loading user", e.error),
    };

    let roles = match store.user_roles(user.id).await {
        Ok(roles) => roles,
        Err(e) => fail("Error loading roles", e.error),
    };
    let permissions = match store.user_permission_names(user.id).await {
        Ok(permissions) => permissions,
        Err(e) => fail("Error loading permissions", e.error),
    };

    println!("👤 {} <{}>", user.name, user.email);
    if roles.is_empty() {
        println!("   Roles: (none)");
    } else {
        let names: Vec<&str> = roles.iter().map(|r| r.name.as_str()).collect();
        println!("   Roles: {}", names.join(", "));
    }

    println!("   Permissions ({}):", permissions.len());
    for permission in &permissions {
        println!("     - {}", permission);
    }
}

fn print_catalog(registry: &PermissionRegistry) {
    for (module, permissions) in registry.grouped() {
        println!("📦 {}", module);
        for permission in permissions {
            println!("     - {}", permission);
        }
    }
    println!(
        "\n{} permissions in total",
        registry.all_permission_strings().len()
    );
}
