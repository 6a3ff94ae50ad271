// src/services/mod.rs

use async_trait::async_trait;

use crate::{error::AppError, models::user::Caller};

pub mod community;
pub mod interaction;

pub use community::PostService;

/// Resolves a caller token into an identity.
///
/// `None` or an empty token fails with `Unauthenticated`; a token that does
/// not verify fails with `InvalidToken`.
#[async_trait]
pub trait AuthVerifier: Send + Sync {
    async fn verify(&self, token: Option<&str>) -> Result<Caller, AppError>;
}

/// Produces unique ids for new posts.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}
