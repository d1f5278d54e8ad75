//! Borrowing transaction queries for PostgreSQL

use sqlx::{PgExecutor, Row};

use crate::{
    error::AppResult,
    models::transaction::{BorrowingTransaction, NewTransaction, TransactionHistoryEntry, TransactionRow},
};

const COLUMNS: &str = "id, book_id, member_id, borrow_date, due_date, return_date, status, \
                       fine_amount, created_at, updated_at";

pub async fn find<'e>(
    db: impl PgExecutor<'e>,
    id: i32,
    for_update: bool,
) -> AppResult<Option<BorrowingTransaction>> {
    let lock = if for_update { " FOR UPDATE" } else { "" };
    sqlx::query_as::<_, TransactionRow>(&format!(
        "SELECT {COLUMNS} FROM borrowing_transactions WHERE id = $1{lock}"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?
    .map(BorrowingTransaction::try_from)
    .transpose()
}

pub async fn list_active<'e>(db: impl PgExecutor<'e>) -> AppResult<Vec<BorrowingTransaction>> {
    sqlx::query_as::<_, TransactionRow>(&format!(
        "SELECT {COLUMNS} FROM borrowing_transactions WHERE status = 'Active' ORDER BY due_date, id"
    ))
    .fetch_all(db)
    .await?
    .into_iter()
    .map(BorrowingTransaction::try_from)
    .collect()
}

pub async fn has_active<'e>(db: impl PgExecutor<'e>, book_id: i32, member_id: i32) -> AppResult<bool> {
    let exists = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM borrowing_transactions
            WHERE book_id = $1 AND member_id = $2 AND status = 'Active'
        )
        "#,
    )
    .bind(book_id)
    .bind(member_id)
    .fetch_one(db)
    .await?;
    Ok(exists)
}

pub async fn history<'e>(db: impl PgExecutor<'e>, member_id: i32) -> AppResult<Vec<TransactionHistoryEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT t.id, t.book_id, t.member_id, t.borrow_date, t.due_date, t.return_date,
               t.status, t.fine_amount, t.created_at, t.updated_at,
               b.title AS book_title, b.author AS book_author,
               m.first_name, m.last_name, m.membership_number
        FROM borrowing_transactions t
        JOIN books b ON t.book_id = b.id
        JOIN members m ON t.member_id = m.id
        WHERE t.member_id = $1
        ORDER BY t.borrow_date DESC, t.id DESC
        "#,
    )
    .bind(member_id)
    .fetch_all(db)
    .await?;

    let mut result = Vec::with_capacity(rows.len());
    for row in rows {
        let transaction = TransactionRow {
            id: row.get("id"),
            book_id: row.get("book_id"),
            member_id: row.get("member_id"),
            borrow_date: row.get("borrow_date"),
            due_date: row.get("due_date"),
            return_date: row.get("return_date"),
            status: row.get("status"),
            fine_amount: row.get("fine_amount"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        };
        let first_name: String = row.get("first_name");
        let last_name: String = row.get("last_name");

        result.push(TransactionHistoryEntry {
            transaction: BorrowingTransaction::try_from(transaction)?,
            book_title: row.get("book_title"),
            book_author: row.get("book_author"),
            member_name: format!("{} {}", first_name, last_name),
            membership_number: row.get("membership_number"),
        });
    }

    Ok(result)
}

pub async fn insert<'e>(db: impl PgExecutor<'e>, transaction: NewTransaction) -> AppResult<BorrowingTransaction> {
    let row = sqlx::query_as::<_, TransactionRow>(&format!(
        r#"
        INSERT INTO borrowing_transactions (book_id, member_id, borrow_date, due_date,
                                            status, fine_amount, created_at)
        VALUES ($1, $2, $3, $4, 'Active', 0, $3)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(transaction.book_id)
    .bind(transaction.member_id)
    .bind(transaction.borrow_date)
    .bind(transaction.due_date)
    .fetch_one(db)
    .await?;

    BorrowingTransaction::try_from(row)
}

pub async fn update<'e>(db: impl PgExecutor<'e>, transaction: &BorrowingTransaction) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE borrowing_transactions
        SET return_date = $2, status = $3, fine_amount = $4, updated_at = $5
        WHERE id = $1
        "#,
    )
    .bind(transaction.id)
    .bind(transaction.return_date)
    .bind(transaction.status.as_str())
    .bind(transaction.fine_amount)
    .bind(transaction.updated_at)
    .execute(db)
    .await?;
    Ok(())
}
