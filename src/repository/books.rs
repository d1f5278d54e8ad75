//! Book queries for PostgreSQL

use sqlx::PgExecutor;

use crate::{
    error::{AppError, AppResult, DomainError},
    models::book::{Book, BookRow, NewBook},
};

const COLUMNS: &str = "id, isbn, title, author, publisher, publication_year, genre, \
                       total_copies, available_copies, status, created_at, updated_at";

fn into_books(rows: Vec<BookRow>) -> AppResult<Vec<Book>> {
    rows.into_iter().map(Book::try_from).collect()
}

pub async fn find<'e>(db: impl PgExecutor<'e>, id: i32, for_update: bool) -> AppResult<Option<Book>> {
    let lock = if for_update { " FOR UPDATE" } else { "" };
    sqlx::query_as::<_, BookRow>(&format!("SELECT {COLUMNS} FROM books WHERE id = $1{lock}"))
        .bind(id)
        .fetch_optional(db)
        .await?
        .map(Book::try_from)
        .transpose()
}

pub async fn list<'e>(db: impl PgExecutor<'e>) -> AppResult<Vec<Book>> {
    let rows = sqlx::query_as::<_, BookRow>(&format!("SELECT {COLUMNS} FROM books ORDER BY title, id"))
        .fetch_all(db)
        .await?;
    into_books(rows)
}

pub async fn search<'e>(db: impl PgExecutor<'e>, term: &str) -> AppResult<Vec<Book>> {
    let pattern = format!("%{}%", escape_like(term));
    let rows = sqlx::query_as::<_, BookRow>(&format!(
        r#"
        SELECT {COLUMNS} FROM books
        WHERE title ILIKE $1 ESCAPE '\' OR author ILIKE $1 ESCAPE '\' OR isbn ILIKE $1 ESCAPE '\'
        ORDER BY title, id
        "#
    ))
    .bind(pattern)
    .fetch_all(db)
    .await?;
    into_books(rows)
}

pub async fn isbn_exists<'e>(db: impl PgExecutor<'e>, isbn: &str) -> AppResult<bool> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1)")
        .bind(isbn)
        .fetch_one(db)
        .await?;
    Ok(exists)
}

pub async fn insert<'e>(db: impl PgExecutor<'e>, book: NewBook) -> AppResult<Book> {
    let row = sqlx::query_as::<_, BookRow>(&format!(
        r#"
        INSERT INTO books (isbn, title, author, publisher, publication_year, genre,
                           total_copies, available_copies, status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $7, 'Available', $8)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(&book.isbn)
    .bind(&book.title)
    .bind(&book.author)
    .bind(&book.publisher)
    .bind(book.publication_year)
    .bind(&book.genre)
    .bind(book.total_copies)
    .bind(book.created_at)
    .fetch_one(db)
    .await
    .map_err(|e| match unique_violation(&e) {
        Some("books_isbn_key") => AppError::from(DomainError::IsbnAlreadyExists),
        _ => AppError::from(e),
    })?;

    Book::try_from(row)
}

pub async fn update<'e>(db: impl PgExecutor<'e>, book: &Book) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE books
        SET available_copies = $2, status = $3, updated_at = $4
        WHERE id = $1
        "#,
    )
    .bind(book.id)
    .bind(book.available_copies)
    .bind(book.status.as_str())
    .bind(book.updated_at)
    .execute(db)
    .await?;
    Ok(())
}

/// Name of the unique constraint a failed statement tripped, if any
pub(super) fn unique_violation(error: &sqlx::Error) -> Option<&str> {
    match error {
        sqlx::Error::Database(db) if db.is_unique_violation() => db.constraint(),
        _ => None,
    }
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%_done\\"), "100\\%\\_done\\\\");
        assert_eq!(escape_like("Dune"), "Dune");
    }
}
