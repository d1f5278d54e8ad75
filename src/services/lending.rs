//! Lending engine: borrowing and returning books

use std::sync::Arc;

use rust_decimal::Decimal;

use super::{dispatch, Clock};
use crate::{
    error::{AppResult, DomainError},
    events::{DomainEvent, EventPublisher},
    models::transaction::{BorrowBook, BorrowingTransaction, TransactionDetails},
    repository::Repository,
};

#[derive(Clone)]
pub struct LendingService {
    repository: Repository,
    events: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    daily_fine: Decimal,
}

impl LendingService {
    pub fn new(
        repository: Repository,
        events: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        daily_fine: Decimal,
    ) -> Self {
        Self {
            repository,
            events,
            clock,
            daily_fine,
        }
    }

    /// Lend one copy of a book to a member.
    ///
    /// Checks run in a fixed order and the first failure returns before
    /// anything is written: book exists, member exists, no open loan of this
    /// book for this member, member may borrow, a copy is on the shelf.
    pub async fn borrow_book(&self, request: BorrowBook) -> AppResult<BorrowingTransaction> {
        let now = self.clock.now();
        let mut unit = self.repository.begin().await?;

        let mut book = unit
            .book_for_update(request.book_id)
            .await?
            .ok_or(DomainError::BookNotFound(request.book_id))?;
        let mut member = unit
            .member_for_update(request.member_id)
            .await?
            .ok_or(DomainError::MemberNotFound(request.member_id))?;

        if unit.has_active_loan(book.id, member.id).await? {
            tracing::debug!(book_id = book.id, member_id = member.id, "Book already borrowed by member");
            return Err(DomainError::AlreadyBorrowed.into());
        }

        let loan = BorrowingTransaction::open(&book, &member, now).map_err(|e| {
            tracing::debug!(book_id = book.id, member_id = member.id, reason = %e, "Borrow rejected");
            e
        })?;

        book.borrow_copy()?;
        book.updated_at = Some(now);
        member.increment_active_borrowings();
        member.updated_at = Some(now);

        let transaction = unit.insert_transaction(loan).await?;
        unit.save_book(&book).await?;
        unit.save_member(&member).await?;
        unit.commit().await?;

        tracing::info!(
            transaction_id = transaction.id,
            book_id = book.id,
            member_id = member.id,
            due_date = %transaction.due_date,
            "Book borrowed"
        );
        dispatch(self.events.as_ref(), DomainEvent::borrowed(&transaction, now));

        Ok(transaction)
    }

    /// Close a loan, charging a fine for every whole day past the due date
    pub async fn return_book(&self, transaction_id: i32) -> AppResult<BorrowingTransaction> {
        let now = self.clock.now();
        let mut unit = self.repository.begin().await?;

        let mut transaction = unit
            .transaction_for_update(transaction_id)
            .await?
            .ok_or(DomainError::TransactionNotFound(transaction_id))?;
        let mut book = unit
            .book_for_update(transaction.book_id)
            .await?
            .ok_or(DomainError::BookNotFound(transaction.book_id))?;
        let mut member = unit
            .member_for_update(transaction.member_id)
            .await?
            .ok_or(DomainError::MemberNotFound(transaction.member_id))?;

        let outcome = transaction.close(now, self.daily_fine).map_err(|e| {
            tracing::debug!(transaction_id, status = %transaction.status, "Return rejected");
            e
        })?;

        book.return_copy()?;
        book.updated_at = Some(now);
        member.decrement_active_borrowings();
        member.updated_at = Some(now);

        unit.save_transaction(&transaction).await?;
        unit.save_book(&book).await?;
        unit.save_member(&member).await?;
        unit.commit().await?;

        if outcome.was_overdue {
            tracing::warn!(
                transaction_id,
                member_id = member.id,
                fine = %outcome.fine_amount,
                "Book returned overdue"
            );
        } else {
            tracing::info!(transaction_id, member_id = member.id, "Book returned");
        }
        dispatch(
            self.events.as_ref(),
            DomainEvent::returned(&transaction, outcome.return_date, outcome.was_overdue, now),
        );

        Ok(transaction)
    }

    pub async fn get_transaction(&self, id: i32) -> AppResult<BorrowingTransaction> {
        self.repository
            .get_transaction(id)
            .await?
            .ok_or_else(|| DomainError::TransactionNotFound(id).into())
    }

    /// Every loan of a member, newest first
    pub async fn member_history(&self, member_id: i32) -> AppResult<Vec<TransactionDetails>> {
        if self.repository.get_member(member_id).await?.is_none() {
            return Err(DomainError::MemberNotFound(member_id).into());
        }

        let now = self.clock.now();
        let entries = self.repository.member_history(member_id).await?;
        Ok(entries
            .into_iter()
            .map(|entry| TransactionDetails::project(entry, now))
            .collect())
    }

    /// Open loans, soonest due first
    pub async fn active_transactions(&self) -> AppResult<Vec<BorrowingTransaction>> {
        self.repository.list_active_transactions().await
    }
}
