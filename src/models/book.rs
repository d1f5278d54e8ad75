//! Book (catalog title) model and related types

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::error::{AppError, DomainError};

/// ISBN-10 / ISBN-13, optionally prefixed and hyphen or space separated
pub static ISBN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:ISBN(?:-1[03])?:? )?(?:97[89][- ]?)?[0-9]{1,5}[- ]?[0-9]+[- ]?[0-9]+[- ]?[0-9X]$")
        .expect("valid ISBN regex")
});

static ISBN_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ISBN(?:-1[03])?:? ?").expect("valid ISBN prefix regex"));

/// An ISBN carries exactly 10 or 13 digits once prefix and separators are
/// removed. Only ISBN-10 may end in `X`.
pub fn validate_isbn_digits(isbn: &str) -> Result<(), ValidationError> {
    let digits: String = ISBN_PREFIX_RE
        .replace(isbn, "")
        .chars()
        .filter(|c| *c != '-' && *c != ' ')
        .collect();

    let valid = match digits.chars().count() {
        10 => digits
            .chars()
            .enumerate()
            .all(|(i, c)| c.is_ascii_digit() || (i == 9 && c == 'X')),
        13 => digits.chars().all(|c| c.is_ascii_digit()),
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        let mut error = ValidationError::new("isbn_digits");
        error.message = Some("ISBN must contain 10 or 13 digits".into());
        Err(error)
    }
}

/// Lending status of a book title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum BookStatus {
    Available,
    AllBorrowed,
    Damaged,
    Lost,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Available => "Available",
            BookStatus::AllBorrowed => "AllBorrowed",
            BookStatus::Damaged => "Damaged",
            BookStatus::Lost => "Lost",
        }
    }
}

impl std::fmt::Display for BookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BookStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Available" => Ok(BookStatus::Available),
            "AllBorrowed" => Ok(BookStatus::AllBorrowed),
            "Damaged" => Ok(BookStatus::Damaged),
            "Lost" => Ok(BookStatus::Lost),
            _ => Err(format!("Invalid book status: {}", s)),
        }
    }
}

/// Book title held by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i32,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub publication_year: i32,
    pub genre: String,
    pub total_copies: i32,
    pub available_copies: i32,
    pub status: BookStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Book {
    pub fn is_available(&self) -> bool {
        self.available_copies > 0
    }

    /// Take one copy off the shelf.
    ///
    /// Leaves the book untouched when no copy is left.
    pub fn borrow_copy(&mut self) -> Result<(), DomainError> {
        if !self.is_available() {
            return Err(DomainError::NoCopiesAvailable);
        }

        self.available_copies -= 1;
        self.status = if self.available_copies == 0 {
            BookStatus::AllBorrowed
        } else {
            BookStatus::Available
        };

        Ok(())
    }

    /// Put one copy back on the shelf
    pub fn return_copy(&mut self) -> Result<(), DomainError> {
        if self.available_copies >= self.total_copies {
            return Err(DomainError::CannotReturnMore);
        }

        self.available_copies += 1;
        self.status = BookStatus::Available;

        Ok(())
    }
}

/// Book row as stored in the database
#[derive(Debug, Clone, FromRow)]
pub struct BookRow {
    pub id: i32,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub publication_year: i32,
    pub genre: String,
    pub total_copies: i32,
    pub available_copies: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<BookRow> for Book {
    type Error = AppError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        Ok(Book {
            id: row.id,
            isbn: row.isbn,
            title: row.title,
            author: row.author,
            publisher: row.publisher,
            publication_year: row.publication_year,
            genre: row.genre,
            total_copies: row.total_copies,
            available_copies: row.available_copies,
            status: row.status.parse().map_err(AppError::Internal)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBook {
    #[validate(
        length(min = 1, max = 50, message = "ISBN is required"),
        regex(path = *ISBN_RE, message = "Invalid ISBN format"),
        custom(function = "validate_isbn_digits")
    )]
    pub isbn: String,
    #[validate(length(min = 1, max = 200, message = "Title is required and cannot exceed 200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 100, message = "Author is required and cannot exceed 100 characters"))]
    pub author: String,
    #[validate(length(min = 1, max = 100, message = "Publisher is required and cannot exceed 100 characters"))]
    pub publisher: String,
    #[validate(range(min = 1001, message = "Publication year must be greater than 1000"))]
    pub publication_year: i32,
    #[validate(length(min = 1, max = 50, message = "Genre is required and cannot exceed 50 characters"))]
    pub genre: String,
    #[validate(range(min = 1, max = 1000, message = "Total copies must be between 1 and 1000"))]
    pub total_copies: i32,
}

/// Book ready to be inserted, before the store assigns an id
#[derive(Debug, Clone)]
pub struct NewBook {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub publication_year: i32,
    pub genre: String,
    pub total_copies: i32,
    pub created_at: DateTime<Utc>,
}

impl NewBook {
    pub fn new(request: CreateBook, created_at: DateTime<Utc>) -> Self {
        Self {
            isbn: request.isbn,
            title: request.title,
            author: request.author,
            publisher: request.publisher,
            publication_year: request.publication_year,
            genre: request.genre,
            total_copies: request.total_copies,
            created_at,
        }
    }

    /// Every copy starts on the shelf.
    pub fn into_book(self, id: i32) -> Book {
        Book {
            id,
            isbn: self.isbn,
            title: self.title,
            author: self.author,
            publisher: self.publisher,
            publication_year: self.publication_year,
            genre: self.genre,
            total_copies: self.total_copies,
            available_copies: self.total_copies,
            status: BookStatus::Available,
            created_at: self.created_at,
            updated_at: None,
        }
    }
}

/// Book projection for listings and search results
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookSummary {
    pub id: i32,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub publication_year: i32,
    pub genre: String,
    pub total_copies: i32,
    pub available_copies: i32,
    pub status: BookStatus,
    pub is_available: bool,
}

impl From<Book> for BookSummary {
    fn from(book: Book) -> Self {
        let is_available = book.is_available();
        Self {
            id: book.id,
            isbn: book.isbn,
            title: book.title,
            author: book.author,
            publisher: book.publisher,
            publication_year: book.publication_year,
            genre: book.genre,
            total_copies: book.total_copies,
            available_copies: book.available_copies,
            status: book.status,
            is_available,
        }
    }
}

/// Book search parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct BookSearchQuery {
    /// Matched against title, author and ISBN
    #[serde(default)]
    pub search_term: String,
}
