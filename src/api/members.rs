//! Member registry endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::member::{Member, MemberSummary, RegisterMember},
    AppState,
};

/// Register a new member
#[utoipa::path(
    post,
    path = "/members",
    tag = "members",
    request_body = RegisterMember,
    responses(
        (status = 201, description = "Member registered", body = Member),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn register_member(
    State(state): State<AppState>,
    Json(request): Json<RegisterMember>,
) -> AppResult<(StatusCode, Json<Member>)> {
    request.validate()?;

    let member = state.services.members.register_member(request).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

/// Get member by ID
#[utoipa::path(
    get,
    path = "/members/{id}",
    tag = "members",
    params(
        ("id" = i32, Path, description = "Member ID")
    ),
    responses(
        (status = 200, description = "Member details", body = Member),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_member(State(state): State<AppState>, Path(id): Path<i32>) -> AppResult<Json<Member>> {
    let member = state.services.members.get_member(id).await?;
    Ok(Json(member))
}

/// List active members
#[utoipa::path(
    get,
    path = "/members",
    tag = "members",
    responses(
        (status = 200, description = "Active members", body = Vec<MemberSummary>)
    )
)]
pub async fn list_members(State(state): State<AppState>) -> AppResult<Json<Vec<MemberSummary>>> {
    let members = state.services.members.list_members().await?;
    Ok(Json(members))
}

/// Re-enable borrowing for a member
#[utoipa::path(
    post,
    path = "/members/{id}/activate",
    tag = "members",
    params(
        ("id" = i32, Path, description = "Member ID")
    ),
    responses(
        (status = 200, description = "Member activated", body = Member),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn activate_member(State(state): State<AppState>, Path(id): Path<i32>) -> AppResult<Json<Member>> {
    let member = state.services.members.activate_member(id).await?;
    Ok(Json(member))
}

/// Suspend borrowing for a member
#[utoipa::path(
    post,
    path = "/members/{id}/deactivate",
    tag = "members",
    params(
        ("id" = i32, Path, description = "Member ID")
    ),
    responses(
        (status = 200, description = "Member deactivated", body = Member),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn deactivate_member(State(state): State<AppState>, Path(id): Path<i32>) -> AppResult<Json<Member>> {
    let member = state.services.members.deactivate_member(id).await?;
    Ok(Json(member))
}
