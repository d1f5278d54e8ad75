//! PostgreSQL store: one database transaction per unit of work

use async_trait::async_trait;
use sqlx::{PgConnection, Pool, Postgres, Transaction};

use super::{books, members, transactions, LibraryStore, UnitOfWork};
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, NewBook},
        member::{Member, NewMember},
        transaction::{BorrowingTransaction, NewTransaction, TransactionHistoryEntry},
    },
};

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LibraryStore for PgStore {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnit { tx: Some(tx) }))
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_book(&self, id: i32) -> AppResult<Option<Book>> {
        books::find(&self.pool, id, false).await
    }

    async fn list_books(&self) -> AppResult<Vec<Book>> {
        books::list(&self.pool).await
    }

    async fn search_books(&self, term: &str) -> AppResult<Vec<Book>> {
        books::search(&self.pool, term).await
    }

    async fn get_member(&self, id: i32) -> AppResult<Option<Member>> {
        members::find(&self.pool, id, false).await
    }

    async fn list_active_members(&self) -> AppResult<Vec<Member>> {
        members::list_active(&self.pool).await
    }

    async fn get_transaction(&self, id: i32) -> AppResult<Option<BorrowingTransaction>> {
        transactions::find(&self.pool, id, false).await
    }

    async fn member_history(&self, member_id: i32) -> AppResult<Vec<TransactionHistoryEntry>> {
        transactions::history(&self.pool, member_id).await
    }

    async fn list_active_transactions(&self) -> AppResult<Vec<BorrowingTransaction>> {
        transactions::list_active(&self.pool).await
    }
}

/// Open database transaction. Dropping it uncommitted rolls back.
pub struct PgUnit {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgUnit {
    fn conn(&mut self) -> AppResult<&mut PgConnection> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| AppError::Internal("Unit of work already committed".to_string()))
    }
}

#[async_trait]
impl UnitOfWork for PgUnit {
    async fn book_for_update(&mut self, id: i32) -> AppResult<Option<Book>> {
        books::find(self.conn()?, id, true).await
    }

    async fn member_for_update(&mut self, id: i32) -> AppResult<Option<Member>> {
        members::find(self.conn()?, id, true).await
    }

    async fn transaction_for_update(&mut self, id: i32) -> AppResult<Option<BorrowingTransaction>> {
        transactions::find(self.conn()?, id, true).await
    }

    async fn isbn_exists(&mut self, isbn: &str) -> AppResult<bool> {
        books::isbn_exists(self.conn()?, isbn).await
    }

    async fn email_exists(&mut self, email: &str) -> AppResult<bool> {
        members::email_exists(self.conn()?, email).await
    }

    async fn count_members(&mut self) -> AppResult<i64> {
        members::count_locked(self.conn()?).await
    }

    async fn has_active_loan(&mut self, book_id: i32, member_id: i32) -> AppResult<bool> {
        transactions::has_active(self.conn()?, book_id, member_id).await
    }

    async fn insert_book(&mut self, book: NewBook) -> AppResult<Book> {
        books::insert(self.conn()?, book).await
    }

    async fn insert_member(&mut self, member: NewMember) -> AppResult<Member> {
        members::insert(self.conn()?, member).await
    }

    async fn insert_transaction(&mut self, transaction: NewTransaction) -> AppResult<BorrowingTransaction> {
        transactions::insert(self.conn()?, transaction).await
    }

    async fn save_book(&mut self, book: &Book) -> AppResult<()> {
        books::update(self.conn()?, book).await
    }

    async fn save_member(&mut self, member: &Member) -> AppResult<()> {
        members::update(self.conn()?, member).await
    }

    async fn save_transaction(&mut self, transaction: &BorrowingTransaction) -> AppResult<()> {
        transactions::update(self.conn()?, transaction).await
    }

    async fn commit(&mut self) -> AppResult<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| AppError::Internal("Unit of work already committed".to_string()))?;
        tx.commit().await?;
        Ok(())
    }
}
