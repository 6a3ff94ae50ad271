// src/lib.rs

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

pub use error::AppError;
pub use services::PostService;
