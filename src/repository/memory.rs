//! In-process store used for development and tests
//!
//! A unit of work holds the store lock for its whole lifetime and writes into
//! a staged copy of the state. `commit` swaps the copy in; dropping the unit
//! throws it away.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{LibraryStore, UnitOfWork};
use crate::{
    error::{AppError, AppResult, DomainError},
    models::{
        book::{Book, NewBook},
        member::{Member, NewMember},
        transaction::{BorrowingTransaction, NewTransaction, TransactionHistoryEntry, TransactionStatus},
    },
};

#[derive(Debug, Clone, Default)]
struct State {
    books: BTreeMap<i32, Book>,
    members: BTreeMap<i32, Member>,
    transactions: BTreeMap<i32, BorrowingTransaction>,
    last_book_id: i32,
    last_member_id: i32,
    last_transaction_id: i32,
}

impl State {
    fn sorted_books(&self, mut keep: impl FnMut(&Book) -> bool) -> Vec<Book> {
        let mut books: Vec<Book> = self.books.values().filter(|b| keep(*b)).cloned().collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        books
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LibraryStore for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryUnit {
            guard: Some(guard),
            staged,
        }))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn get_book(&self, id: i32) -> AppResult<Option<Book>> {
        Ok(self.state.lock().await.books.get(&id).cloned())
    }

    async fn list_books(&self) -> AppResult<Vec<Book>> {
        Ok(self.state.lock().await.sorted_books(|_| true))
    }

    async fn search_books(&self, term: &str) -> AppResult<Vec<Book>> {
        let needle = term.to_lowercase();
        let state = self.state.lock().await;
        Ok(state.sorted_books(|b| {
            b.title.to_lowercase().contains(&needle)
                || b.author.to_lowercase().contains(&needle)
                || b.isbn.to_lowercase().contains(&needle)
        }))
    }

    async fn get_member(&self, id: i32) -> AppResult<Option<Member>> {
        Ok(self.state.lock().await.members.get(&id).cloned())
    }

    async fn list_active_members(&self) -> AppResult<Vec<Member>> {
        let state = self.state.lock().await;
        let mut members: Vec<Member> = state.members.values().filter(|m| m.is_active).cloned().collect();
        members.sort_by(|a, b| {
            (&a.last_name, &a.first_name, a.id).cmp(&(&b.last_name, &b.first_name, b.id))
        });
        Ok(members)
    }

    async fn get_transaction(&self, id: i32) -> AppResult<Option<BorrowingTransaction>> {
        Ok(self.state.lock().await.transactions.get(&id).cloned())
    }

    async fn member_history(&self, member_id: i32) -> AppResult<Vec<TransactionHistoryEntry>> {
        let state = self.state.lock().await;
        let mut entries = Vec::new();
        for transaction in state.transactions.values().filter(|t| t.member_id == member_id) {
            let book = state.books.get(&transaction.book_id).ok_or_else(|| {
                AppError::Internal(format!("Transaction {} refers to a missing book", transaction.id))
            })?;
            let member = state.members.get(&transaction.member_id).ok_or_else(|| {
                AppError::Internal(format!("Transaction {} refers to a missing member", transaction.id))
            })?;

            entries.push(TransactionHistoryEntry {
                transaction: transaction.clone(),
                book_title: book.title.clone(),
                book_author: book.author.clone(),
                member_name: member.full_name(),
                membership_number: member.membership_number.clone(),
            });
        }

        entries.sort_by(|a, b| {
            b.transaction
                .borrow_date
                .cmp(&a.transaction.borrow_date)
                .then(b.transaction.id.cmp(&a.transaction.id))
        });
        Ok(entries)
    }

    async fn list_active_transactions(&self) -> AppResult<Vec<BorrowingTransaction>> {
        let state = self.state.lock().await;
        let mut active: Vec<BorrowingTransaction> = state
            .transactions
            .values()
            .filter(|t| t.status == TransactionStatus::Active)
            .cloned()
            .collect();
        active.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.id.cmp(&b.id)));
        Ok(active)
    }
}

pub struct MemoryUnit {
    guard: Option<OwnedMutexGuard<State>>,
    staged: State,
}

impl MemoryUnit {
    fn staged(&mut self) -> AppResult<&mut State> {
        if self.guard.is_none() {
            return Err(AppError::Internal("Unit of work already committed".to_string()));
        }
        Ok(&mut self.staged)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnit {
    async fn book_for_update(&mut self, id: i32) -> AppResult<Option<Book>> {
        Ok(self.staged()?.books.get(&id).cloned())
    }

    async fn member_for_update(&mut self, id: i32) -> AppResult<Option<Member>> {
        Ok(self.staged()?.members.get(&id).cloned())
    }

    async fn transaction_for_update(&mut self, id: i32) -> AppResult<Option<BorrowingTransaction>> {
        Ok(self.staged()?.transactions.get(&id).cloned())
    }

    async fn isbn_exists(&mut self, isbn: &str) -> AppResult<bool> {
        Ok(self.staged()?.books.values().any(|b| b.isbn == isbn))
    }

    async fn email_exists(&mut self, email: &str) -> AppResult<bool> {
        let email = email.to_lowercase();
        Ok(self
            .staged()?
            .members
            .values()
            .any(|m| m.email.to_lowercase() == email))
    }

    async fn count_members(&mut self) -> AppResult<i64> {
        Ok(self.staged()?.members.len() as i64)
    }

    async fn has_active_loan(&mut self, book_id: i32, member_id: i32) -> AppResult<bool> {
        Ok(self.staged()?.transactions.values().any(|t| {
            t.book_id == book_id && t.member_id == member_id && t.status == TransactionStatus::Active
        }))
    }

    async fn insert_book(&mut self, book: NewBook) -> AppResult<Book> {
        let state = self.staged()?;
        if state.books.values().any(|b| b.isbn == book.isbn) {
            return Err(DomainError::IsbnAlreadyExists.into());
        }

        state.last_book_id += 1;
        let book = book.into_book(state.last_book_id);
        state.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn insert_member(&mut self, member: NewMember) -> AppResult<Member> {
        let email = member.email.to_lowercase();
        let state = self.staged()?;
        if state.members.values().any(|m| m.email.to_lowercase() == email) {
            return Err(DomainError::EmailAlreadyExists.into());
        }

        state.last_member_id += 1;
        let member = member.into_member(state.last_member_id);
        state.members.insert(member.id, member.clone());
        Ok(member)
    }

    async fn insert_transaction(&mut self, transaction: NewTransaction) -> AppResult<BorrowingTransaction> {
        let state = self.staged()?;
        state.last_transaction_id += 1;
        let transaction = transaction.into_transaction(state.last_transaction_id);
        state.transactions.insert(transaction.id, transaction.clone());
        Ok(transaction)
    }

    async fn save_book(&mut self, book: &Book) -> AppResult<()> {
        let state = self.staged()?;
        match state.books.get_mut(&book.id) {
            Some(stored) => {
                *stored = book.clone();
                Ok(())
            }
            None => Err(DomainError::BookNotFound(book.id).into()),
        }
    }

    async fn save_member(&mut self, member: &Member) -> AppResult<()> {
        let state = self.staged()?;
        match state.members.get_mut(&member.id) {
            Some(stored) => {
                *stored = member.clone();
                Ok(())
            }
            None => Err(DomainError::MemberNotFound(member.id).into()),
        }
    }

    async fn save_transaction(&mut self, transaction: &BorrowingTransaction) -> AppResult<()> {
        let state = self.staged()?;
        match state.transactions.get_mut(&transaction.id) {
            Some(stored) => {
                *stored = transaction.clone();
                Ok(())
            }
            None => Err(DomainError::TransactionNotFound(transaction.id).into()),
        }
    }

    async fn commit(&mut self) -> AppResult<()> {
        let mut guard = self
            .guard
            .take()
            .ok_or_else(|| AppError::Internal("Unit of work already committed".to_string()))?;
        *guard = std::mem::take(&mut self.staged);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::member::{membership_number, MembershipType};

    fn new_book(isbn: &str, title: &str) -> NewBook {
        NewBook {
            isbn: isbn.to_string(),
            title: title.to_string(),
            author: "Ursula K. Le Guin".to_string(),
            publisher: "Ace".to_string(),
            publication_year: 1969,
            genre: "Science fiction".to_string(),
            total_copies: 2,
            created_at: Utc::now(),
        }
    }

    fn new_member(sequence: i64, email: &str) -> NewMember {
        NewMember {
            membership_number: membership_number(2024, sequence),
            first_name: "Élodie".to_string(),
            last_name: "Durand".to_string(),
            email: email.to_string(),
            phone: "0612345678".to_string(),
            address: "3 Place Bellecour, Lyon".to_string(),
            membership_type: MembershipType::Adult,
            registration_date: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let store = MemoryStore::new();

        let mut unit = store.begin().await.unwrap();
        let book = unit.insert_book(new_book("9780441478125", "The Left Hand of Darkness")).await.unwrap();
        unit.commit().await.unwrap();

        assert_eq!(store.get_book(book.id).await.unwrap(), Some(book));
    }

    #[tokio::test]
    async fn test_dropped_unit_discards_writes() {
        let store = MemoryStore::new();

        {
            let mut unit = store.begin().await.unwrap();
            unit.insert_book(new_book("9780441478125", "The Left Hand of Darkness")).await.unwrap();
        }

        assert!(store.list_books().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unit_is_spent_after_commit() {
        let store = MemoryStore::new();
        let mut unit = store.begin().await.unwrap();
        unit.commit().await.unwrap();

        assert!(unit.commit().await.is_err());
        assert!(unit.book_for_update(1).await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_isbn_rejected() {
        let store = MemoryStore::new();
        let mut unit = store.begin().await.unwrap();
        unit.insert_book(new_book("9780441478125", "A")).await.unwrap();

        let err = unit.insert_book(new_book("9780441478125", "B")).await.unwrap_err();
        assert_eq!(err.domain(), Some(&DomainError::IsbnAlreadyExists));
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_sorted() {
        let store = MemoryStore::new();
        let mut unit = store.begin().await.unwrap();
        unit.insert_book(new_book("9780441478125", "The Left Hand of Darkness")).await.unwrap();
        unit.insert_book(new_book("9780547773742", "A Wizard of Earthsea")).await.unwrap();
        unit.commit().await.unwrap();

        let found = store.search_books("le guin").await.unwrap();
        let titles: Vec<_> = found.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, ["A Wizard of Earthsea", "The Left Hand of Darkness"]);

        assert_eq!(store.search_books("earthsea").await.unwrap().len(), 1);
        assert_eq!(store.search_books("97805").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_email_match_folds_non_ascii_case() {
        let store = MemoryStore::new();
        let mut unit = store.begin().await.unwrap();
        unit.insert_member(new_member(1, "élodie@example.com")).await.unwrap();

        assert!(unit.email_exists("ÉLODIE@EXAMPLE.COM").await.unwrap());
        assert!(!unit.email_exists("elodie@example.com").await.unwrap());

        let err = unit.insert_member(new_member(2, "ÉLODIE@example.com")).await.unwrap_err();
        assert_eq!(err.domain(), Some(&DomainError::EmailAlreadyExists));
    }
}
