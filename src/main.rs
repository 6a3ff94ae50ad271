// src/main.rs

use std::{process::ExitCode, time::Duration};

use postboard::{
    AppError,
    config::Config,
    logging,
    models::user::Role,
    services::IdGenerator,
    utils::{
        hash::{hash_password, verify_password},
        id::UuidGenerator,
    },
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Prepares a PostgreSQL database for the post service and exits.
///
/// The binary only connects, applies migrations and seeds the admin account.
/// `PostService` is built by the embedding application over `PgPostStore`.
#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let _guard = logging::init(&config);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Bootstrap failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), AppError> {
    let pool = connect_with_retry(&config).await?;
    tracing::info!("Database connected...");

    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Migrations applied successfully.");

    if let Err(e) = seed_admin_user(&pool, &config).await {
        tracing::error!("Failed to seed admin user: {}", e);
    }

    tracing::info!(
        posts = %config.tables.posts,
        reactions = %config.tables.reactions,
        "Database ready"
    );

    Ok(())
}

async fn connect_with_retry(config: &Config) -> Result<PgPool, AppError> {
    let mut retry_count = 0;
    loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => return Ok(pool),
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    return Err(AppError::Internal(format!(
                        "Failed to connect to database after 5 retries: {}",
                        e
                    )));
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }
}

async fn seed_admin_user(pool: &PgPool, config: &Config) -> Result<(), AppError> {
    let (Some(name), Some(password)) = (&config.admin_username, &config.admin_password) else {
        return Ok(());
    };

    let users = &config.tables.users;
    let existing: Option<String> =
        sqlx::query_scalar(&format!("SELECT password FROM {} WHERE name = $1", users))
            .bind(name)
            .fetch_optional(pool)
            .await?;

    match existing {
        Some(stored_hash) => {
            if !verify_password(password, &stored_hash)? {
                tracing::warn!("Admin user '{}' exists with a different password; leaving it unchanged", name);
            }
        }
        None => {
            tracing::info!("Seeding admin user: {}", name);
            let hashed_password = hash_password(password)?;

            sqlx::query(&format!(
                "INSERT INTO {} (id, name, password, role) VALUES ($1, $2, $3, $4)",
                users
            ))
            .bind(UuidGenerator.next_id())
            .bind(name)
            .bind(hashed_password)
            .bind(Role::Admin.as_str())
            .execute(pool)
            .await?;
            tracing::info!("Admin user created successfully.");
        }
    }

    Ok(())
}
