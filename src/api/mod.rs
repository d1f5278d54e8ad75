//! API handlers for the library REST endpoints

pub mod books;
pub mod health;
pub mod members;
pub mod openapi;
pub mod transactions;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Catalog
        .route("/books", get(books::list_books).post(books::create_book))
        .route("/books/search", get(books::search_books))
        .route("/books/:id", get(books::get_book))
        // Members
        .route("/members", get(members::list_members).post(members::register_member))
        .route("/members/:id", get(members::get_member))
        .route("/members/:id/activate", post(members::activate_member))
        .route("/members/:id/deactivate", post(members::deactivate_member))
        // Lending
        .route("/transactions/active", get(transactions::active_transactions))
        .route("/transactions/borrow", post(transactions::borrow_book))
        .route("/transactions/return/:id", post(transactions::return_book))
        .route("/transactions/member/:id/history", get(transactions::member_history))
        .route("/transactions/:id", get(transactions::get_transaction))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
