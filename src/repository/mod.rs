//! Repository layer: storage behind a unit-of-work boundary
//!
//! Every write goes through a [`UnitOfWork`]. Rows read with the `*_for_update`
//! methods stay locked until the unit is committed or dropped, and nothing the
//! unit wrote is visible to anyone else before `commit`. Dropping a unit
//! without committing discards all of its writes.

pub mod books;
pub mod memory;
pub mod members;
pub mod postgres;
pub mod transactions;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        book::{Book, NewBook},
        member::{Member, NewMember},
        transaction::{BorrowingTransaction, NewTransaction, TransactionHistoryEntry},
    },
};

/// Read access plus the entry point for atomic writes
#[async_trait]
pub trait LibraryStore: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>>;

    /// Cheap round-trip used by the readiness probe
    async fn ping(&self) -> AppResult<()>;

    async fn get_book(&self, id: i32) -> AppResult<Option<Book>>;
    /// All books ordered by title
    async fn list_books(&self) -> AppResult<Vec<Book>>;
    /// Case-insensitive substring match on title, author or ISBN, ordered by title
    async fn search_books(&self, term: &str) -> AppResult<Vec<Book>>;

    async fn get_member(&self, id: i32) -> AppResult<Option<Member>>;
    async fn list_active_members(&self) -> AppResult<Vec<Member>>;

    async fn get_transaction(&self, id: i32) -> AppResult<Option<BorrowingTransaction>>;
    /// A member's loans, newest first
    async fn member_history(&self, member_id: i32) -> AppResult<Vec<TransactionHistoryEntry>>;
    async fn list_active_transactions(&self) -> AppResult<Vec<BorrowingTransaction>>;
}

/// One atomic batch of reads-for-update and writes
#[async_trait]
pub trait UnitOfWork: Send {
    async fn book_for_update(&mut self, id: i32) -> AppResult<Option<Book>>;
    async fn member_for_update(&mut self, id: i32) -> AppResult<Option<Member>>;
    async fn transaction_for_update(&mut self, id: i32) -> AppResult<Option<BorrowingTransaction>>;

    async fn isbn_exists(&mut self, isbn: &str) -> AppResult<bool>;
    /// Case-insensitive
    async fn email_exists(&mut self, email: &str) -> AppResult<bool>;
    /// Number of registered members; holds off concurrent registrations
    async fn count_members(&mut self) -> AppResult<i64>;
    /// Whether `member_id` holds an `Active` loan of `book_id`
    async fn has_active_loan(&mut self, book_id: i32, member_id: i32) -> AppResult<bool>;

    async fn insert_book(&mut self, book: NewBook) -> AppResult<Book>;
    async fn insert_member(&mut self, member: NewMember) -> AppResult<Member>;
    async fn insert_transaction(&mut self, transaction: NewTransaction) -> AppResult<BorrowingTransaction>;

    async fn save_book(&mut self, book: &Book) -> AppResult<()>;
    async fn save_member(&mut self, member: &Member) -> AppResult<()>;
    async fn save_transaction(&mut self, transaction: &BorrowingTransaction) -> AppResult<()>;

    /// Make every write of this unit visible at once. The unit is spent afterwards.
    async fn commit(&mut self) -> AppResult<()>;
}

/// Shared handle on the configured store
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn LibraryStore>,
}

impl Repository {
    pub fn new(store: Arc<dyn LibraryStore>) -> Self {
        Self { store }
    }

    /// Repository backed by PostgreSQL
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self::new(Arc::new(postgres::PgStore::new(pool)))
    }

    /// Repository backed by process memory
    pub fn in_memory() -> Self {
        Self::new(Arc::new(memory::MemoryStore::new()))
    }
}

impl Deref for Repository {
    type Target = dyn LibraryStore;

    fn deref(&self) -> &Self::Target {
        self.store.as_ref()
    }
}
