use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use tournament_api::app::API_ROOT;
use tournament_api::authz::{tournament_policy, RoleAssignments};
use tournament_api::docs::build_openapi;
use tournament_api::identity::{grant_roles, list_users, revoke_roles, sync_profile};
use tournament_api::jwt::JwtConfig;
use tournament_api::models::user::UpstreamProfile;
use tournament_api::utils::{env_or, load_env};

#[derive(Parser, Debug)]
#[command(author, version, about = "tournament-api admin tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending migrations
    MigrateRun,
    /// Show migration status against the current database
    MigrateStatus,
    /// Create or refresh a user from an identity provider profile and print a token
    SyncUser {
        #[arg(long, default_value = "google")]
        provider: String,
        #[arg(long)]
        provider_id: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        photo: Option<String>,
        /// Extra roles to grant, e.g. --role tournament_editor
        #[arg(long = "role")]
        roles: Vec<String>,
    },
    /// Grant roles to an existing user; a running server applies it on restart
    GrantRole {
        user_id: Uuid,
        #[arg(required = true)]
        roles: Vec<String>,
    },
    /// Revoke roles from an existing user; a running server applies it on restart
    RevokeRole {
        user_id: Uuid,
        #[arg(required = true)]
        roles: Vec<String>,
    },
    /// List stored users and their roles
    ListUsers,
    /// Write the OpenAPI document to a file
    DumpOpenapi {
        #[arg(long, default_value = "openapi.json")]
        output: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();

    let cli = Cli::parse();

    match cli.command {
        Commands::MigrateRun => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            migrator.run(&pool).await?;
            println!("Migrations applied");
        }
        Commands::MigrateStatus => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            print_status(&pool, &migrator).await?;
        }
        Commands::SyncUser {
            provider,
            provider_id,
            email,
            name,
            photo,
            roles,
        } => {
            let pool = get_pool().await?;
            let jwt = JwtConfig::from_env()?;
            let assignments = RoleAssignments::new();

            let profile = UpstreamProfile {
                provider_name: provider,
                provider_id,
                email,
                photo,
                display_name: name,
            };
            let mut user = sync_profile(&pool, &assignments, &profile).await?;
            if !roles.is_empty() {
                let policy = tournament_policy(API_ROOT)?;
                user = grant_roles(&pool, &policy, &assignments, user.id, &roles).await?;
            }

            println!("user:  {} ({})", user.id, user.roles.join(", "));
            println!("token: {}", jwt.encode(&user)?);
        }
        Commands::GrantRole { user_id, roles } => {
            let pool = get_pool().await?;
            let policy = tournament_policy(API_ROOT)?;
            let user = grant_roles(&pool, &policy, &RoleAssignments::new(), user_id, &roles).await?;
            println!("{} now holds: {}", user.id, user.roles.join(", "));
        }
        Commands::RevokeRole { user_id, roles } => {
            let pool = get_pool().await?;
            let user = revoke_roles(&pool, &RoleAssignments::new(), user_id, &roles).await?;
            println!("{} now holds: {}", user.id, user.roles.join(", "));
        }
        Commands::ListUsers => {
            let pool = get_pool().await?;
            println!("{:<38} {:<28} {}", "Id", "Email", "Roles");
            for user in list_users(&pool).await? {
                println!("{:<38} {:<28} {}", user.id, user.email, user.roles.join(", "));
            }
        }
        Commands::DumpOpenapi { output } => {
            let doc = build_openapi(env_or("APP_PORT", 3000))?;
            std::fs::write(&output, serde_json::to_string_pretty(&doc)?)
                .with_context(|| format!("failed to write {output}"))?;
            println!("wrote {output}");
        }
    }

    Ok(())
}

async fn get_pool() -> anyhow::Result<SqlitePool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    let options = database_url
        .parse::<SqliteConnectOptions>()
        .context("DATABASE_URL is not a valid sqlite url")?
        .create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .context("failed to connect to database")
}

async fn print_status(pool: &SqlitePool, migrator: &sqlx::migrate::Migrator) -> anyhow::Result<()> {
    let tracked: Option<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'")
            .fetch_optional(pool)
            .await?;

    let applied_versions: HashSet<i64> = if tracked.is_some() {
        let rows = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?;
        rows.iter().filter_map(|row| row.try_get::<i64, _>("version").ok()).collect()
    } else {
        HashSet::new()
    };

    println!("{:<8} {:<20} {}", "Status", "Version", "Name");
    for migration in migrator.iter() {
        let status = if applied_versions.contains(&migration.version) { "applied" } else { "pending" };
        let desc = migration.description.trim();
        let name = if desc.is_empty() { "unknown" } else { desc };
        println!("{:<8} {:<20} {}", status, migration.version, name);
    }

    Ok(())
}

async fn get_migrator() -> anyhow::Result<sqlx::migrate::Migrator> {
    let local = Path::new("./migrations");
    let migrator_path = if local.exists() {
        local.to_path_buf()
    } else {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")
    };

    let migrator_path_display = migrator_path.display().to_string();
    sqlx::migrate::Migrator::new(migrator_path)
        .await
        .with_context(|| format!("failed to load migrations from {}", migrator_path_display))
}
