//! Library Lending Server
//!
//! REST JSON API for a lending library: a catalog of books with copy counts,
//! a registry of members, and a lending engine that opens and closes loans,
//! computes due dates and late fines, and announces what happened.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
