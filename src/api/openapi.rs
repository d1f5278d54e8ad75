//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, health, members, transactions};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library Lending API",
        version = "1.0.0",
        description = "Catalog, member registry and lending REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::create_book,
        books::get_book,
        books::list_books,
        books::search_books,
        // Members
        members::register_member,
        members::get_member,
        members::list_members,
        members::activate_member,
        members::deactivate_member,
        // Transactions
        transactions::borrow_book,
        transactions::return_book,
        transactions::get_transaction,
        transactions::member_history,
        transactions::active_transactions,
    ),
    components(
        schemas(
            // Books
            crate::models::book::Book,
            crate::models::book::BookStatus,
            crate::models::book::BookSummary,
            crate::models::book::CreateBook,
            // Members
            crate::models::member::Member,
            crate::models::member::MemberSummary,
            crate::models::member::MembershipType,
            crate::models::member::RegisterMember,
            // Transactions
            crate::models::transaction::BorrowingTransaction,
            crate::models::transaction::TransactionStatus,
            crate::models::transaction::BorrowBook,
            crate::models::transaction::TransactionDetails,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Catalog management"),
        (name = "members", description = "Member registry"),
        (name = "transactions", description = "Borrowing and returning")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
