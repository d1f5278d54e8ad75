//! Lending endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::transaction::{BorrowBook, BorrowingTransaction, TransactionDetails},
    AppState,
};

/// Borrow a book
#[utoipa::path(
    post,
    path = "/transactions/borrow",
    tag = "transactions",
    request_body = BorrowBook,
    responses(
        (status = 200, description = "Loan opened", body = BorrowingTransaction),
        (status = 403, description = "Member is not active", body = crate::error::ErrorResponse),
        (status = 404, description = "Book or member not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Already borrowed, limit reached or no copy available", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    Json(request): Json<BorrowBook>,
) -> AppResult<Json<BorrowingTransaction>> {
    request.validate()?;

    let transaction = state.services.lending.borrow_book(request).await?;
    Ok(Json(transaction))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/transactions/return/{id}",
    tag = "transactions",
    params(
        ("id" = i32, Path, description = "Transaction ID")
    ),
    responses(
        (status = 200, description = "Loan closed", body = BorrowingTransaction),
        (status = 404, description = "Transaction not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Transaction is not active", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowingTransaction>> {
    let transaction = state.services.lending.return_book(id).await?;
    Ok(Json(transaction))
}

/// Get transaction by ID
#[utoipa::path(
    get,
    path = "/transactions/{id}",
    tag = "transactions",
    params(
        ("id" = i32, Path, description = "Transaction ID")
    ),
    responses(
        (status = 200, description = "Transaction", body = BorrowingTransaction),
        (status = 404, description = "Transaction not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowingTransaction>> {
    let transaction = state.services.lending.get_transaction(id).await?;
    Ok(Json(transaction))
}

/// Loan history of a member, newest first
#[utoipa::path(
    get,
    path = "/transactions/member/{id}/history",
    tag = "transactions",
    params(
        ("id" = i32, Path, description = "Member ID")
    ),
    responses(
        (status = 200, description = "Member's loans", body = Vec<TransactionDetails>),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn member_history(
    State(state): State<AppState>,
    Path(member_id): Path<i32>,
) -> AppResult<Json<Vec<TransactionDetails>>> {
    let history = state.services.lending.member_history(member_id).await?;
    Ok(Json(history))
}

/// Open loans, soonest due first
#[utoipa::path(
    get,
    path = "/transactions/active",
    tag = "transactions",
    responses(
        (status = 200, description = "Active loans", body = Vec<BorrowingTransaction>)
    )
)]
pub async fn active_transactions(State(state): State<AppState>) -> AppResult<Json<Vec<BorrowingTransaction>>> {
    let transactions = state.services.lending.active_transactions().await?;
    Ok(Json(transactions))
}
