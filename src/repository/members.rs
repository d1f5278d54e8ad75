//! Member queries for PostgreSQL

use sqlx::PgExecutor;

use super::books::unique_violation;
use crate::{
    error::{AppError, AppResult, DomainError},
    models::member::{Member, MemberRow, NewMember},
};

const COLUMNS: &str = "id, membership_number, first_name, last_name, email, phone, address, \
                       membership_type, registration_date, is_active, active_borrowings_count, \
                       created_at, updated_at";

pub async fn find<'e>(db: impl PgExecutor<'e>, id: i32, for_update: bool) -> AppResult<Option<Member>> {
    let lock = if for_update { " FOR UPDATE" } else { "" };
    sqlx::query_as::<_, MemberRow>(&format!("SELECT {COLUMNS} FROM members WHERE id = $1{lock}"))
        .bind(id)
        .fetch_optional(db)
        .await?
        .map(Member::try_from)
        .transpose()
}

pub async fn list_active<'e>(db: impl PgExecutor<'e>) -> AppResult<Vec<Member>> {
    sqlx::query_as::<_, MemberRow>(&format!(
        "SELECT {COLUMNS} FROM members WHERE is_active ORDER BY last_name, first_name, id"
    ))
    .fetch_all(db)
    .await?
    .into_iter()
    .map(Member::try_from)
    .collect()
}

pub async fn email_exists<'e>(db: impl PgExecutor<'e>, email: &str) -> AppResult<bool> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM members WHERE LOWER(email) = LOWER($1))",
    )
    .bind(email)
    .fetch_one(db)
    .await?;
    Ok(exists)
}

/// Counts members after locking the table against concurrent registrations,
/// so the count can seed the next membership number
pub async fn count_locked(conn: &mut sqlx::PgConnection) -> AppResult<i64> {
    sqlx::query("LOCK TABLE members IN SHARE ROW EXCLUSIVE MODE")
        .execute(&mut *conn)
        .await?;

    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM members")
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

pub async fn insert<'e>(db: impl PgExecutor<'e>, member: NewMember) -> AppResult<Member> {
    let row = sqlx::query_as::<_, MemberRow>(&format!(
        r#"
        INSERT INTO members (membership_number, first_name, last_name, email, phone, address,
                             membership_type, registration_date, is_active,
                             active_borrowings_count, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE, 0, $8)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(&member.membership_number)
    .bind(&member.first_name)
    .bind(&member.last_name)
    .bind(&member.email)
    .bind(&member.phone)
    .bind(&member.address)
    .bind(member.membership_type.as_str())
    .bind(member.registration_date)
    .fetch_one(db)
    .await
    .map_err(|e| match unique_violation(&e) {
        Some("members_email_lower_idx") => AppError::from(DomainError::EmailAlreadyExists),
        _ => AppError::from(e),
    })?;

    Member::try_from(row)
}

pub async fn update<'e>(db: impl PgExecutor<'e>, member: &Member) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE members
        SET is_active = $2, active_borrowings_count = $3, updated_at = $4
        WHERE id = $1
        "#,
    )
    .bind(member.id)
    .bind(member.is_active)
    .bind(member.active_borrowings_count)
    .bind(member.updated_at)
    .execute(db)
    .await?;
    Ok(())
}
