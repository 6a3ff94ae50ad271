// src/config.rs

use std::env;

use dotenvy::dotenv;

use crate::error::AppError;

/// Names of the tables the PostgreSQL adapter reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub posts: String,
    pub reactions: String,
    pub users: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            posts: "posts".to_string(),
            reactions: "likes_dislikes".to_string(),
            users: "users".to_string(),
        }
    }
}

impl TableNames {
    /// Table names are spliced into SQL text, so only plain identifiers are accepted.
    pub fn validate(&self) -> Result<(), AppError> {
        for name in [&self.posts, &self.reactions, &self.users] {
            if !is_identifier(name) {
                return Err(AppError::Config(format!("invalid table name '{}'", name)));
            }
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub log_dir: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub tables: TableNames,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let jwt_expiration = match env::var("JWT_EXPIRATION") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|e| AppError::Config(format!("JWT_EXPIRATION: {}", e)))?,
            Err(_) => 86_400,
        };

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());

        let defaults = TableNames::default();
        let tables = TableNames {
            posts: env::var("POSTS_TABLE").unwrap_or(defaults.posts),
            reactions: env::var("REACTIONS_TABLE").unwrap_or(defaults.reactions),
            users: env::var("USERS_TABLE").unwrap_or(defaults.users),
        };
        tables.validate()?;

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            log_dir,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            tables,
        })
    }
}

fn required(key: &str) -> Result<String, AppError> {
    env::var(key).map_err(|_| AppError::Config(format!("{} must be set", key)))
}
