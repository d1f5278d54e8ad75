//! Catalog service for book management

use std::sync::Arc;

use chrono::Datelike;

use super::Clock;
use crate::{
    error::{AppError, AppResult, DomainError},
    models::book::{Book, BookSummary, CreateBook, NewBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    clock: Arc<dyn Clock>,
}

impl CatalogService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Add a title to the catalog with every copy available
    pub async fn create_book(&self, request: CreateBook) -> AppResult<Book> {
        let now = self.clock.now();
        if request.publication_year > now.year() {
            return Err(AppError::Validation(format!(
                "Publication year must be between 1001 and {}",
                now.year()
            )));
        }

        let mut unit = self.repository.begin().await?;
        if unit.isbn_exists(&request.isbn).await? {
            tracing::debug!(isbn = %request.isbn, "Rejected duplicate ISBN");
            return Err(DomainError::IsbnAlreadyExists.into());
        }

        let book = unit.insert_book(NewBook::new(request, now)).await?;
        unit.commit().await?;

        tracing::info!(book_id = book.id, isbn = %book.isbn, title = %book.title, "Book added to catalog");
        Ok(book)
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository
            .get_book(id)
            .await?
            .ok_or_else(|| DomainError::BookNotFound(id).into())
    }

    /// All books ordered by title
    pub async fn list_books(&self) -> AppResult<Vec<BookSummary>> {
        let books = self.repository.list_books().await?;
        Ok(books.into_iter().map(BookSummary::from).collect())
    }

    /// Case-insensitive match on title, author or ISBN. A blank term matches
    /// every book.
    pub async fn search_books(&self, term: &str) -> AppResult<Vec<BookSummary>> {
        let term = term.trim();
        let books = if term.is_empty() {
            self.repository.list_books().await?
        } else {
            self.repository.search_books(term).await?
        };
        Ok(books.into_iter().map(BookSummary::from).collect())
    }
}
