//! Borrowing transaction (loan ledger entry) model and related types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::{book::Book, member::Member};
use crate::error::{AppError, DomainError};

/// Lifecycle state of a loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum TransactionStatus {
    Active,
    Returned,
    Overdue,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Active => "Active",
            TransactionStatus::Returned => "Returned",
            TransactionStatus::Overdue => "Overdue",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(TransactionStatus::Active),
            "Returned" => Ok(TransactionStatus::Returned),
            "Overdue" => Ok(TransactionStatus::Overdue),
            _ => Err(format!("Invalid transaction status: {}", s)),
        }
    }
}

/// Fine for `overdue_days` whole days late at `daily_rate` per day
pub fn fine_for(overdue_days: i64, daily_rate: Decimal) -> Decimal {
    (Decimal::from(overdue_days) * daily_rate).round_dp(2)
}

/// Loan of one book to one member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowingTransaction {
    pub id: i32,
    pub book_id: i32,
    pub member_id: i32,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: TransactionStatus,
    pub fine_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// What a successful return computed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnOutcome {
    pub return_date: DateTime<Utc>,
    pub fine_amount: Decimal,
    pub was_overdue: bool,
}

impl BorrowingTransaction {
    /// Open a loan of `book` to `member` at `now`.
    ///
    /// The member's own checks run first and their error is passed through
    /// unchanged; only then is book availability checked. Neither entity is
    /// mutated here.
    pub fn open(book: &Book, member: &Member, now: DateTime<Utc>) -> Result<NewTransaction, DomainError> {
        member.can_borrow()?;

        if !book.is_available() {
            return Err(DomainError::BookNotAvailable);
        }

        Ok(NewTransaction {
            book_id: book.id,
            member_id: member.id,
            borrow_date: now,
            due_date: now + member.membership_type.loan_period(),
        })
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == TransactionStatus::Active && now > self.due_date
    }

    /// Whole days past due, or 0 when not overdue
    pub fn overdue_days(&self, now: DateTime<Utc>) -> i64 {
        if !self.is_overdue(now) {
            return 0;
        }
        (now - self.due_date).num_days()
    }

    /// Flag an active loan as overdue once its due date has passed
    pub fn mark_overdue(&mut self, now: DateTime<Utc>) {
        if self.is_overdue(now) {
            self.status = TransactionStatus::Overdue;
            self.updated_at = Some(now);
        }
    }

    /// Close the loan at `now`, charging `daily_fine` per whole day late.
    ///
    /// Only an `Active` loan can be closed; anything else leaves the record
    /// untouched.
    pub fn close(&mut self, now: DateTime<Utc>, daily_fine: Decimal) -> Result<ReturnOutcome, DomainError> {
        if self.status != TransactionStatus::Active {
            return Err(DomainError::TransactionNotActive);
        }

        let was_overdue = now > self.due_date;

        self.return_date = Some(now);
        self.status = TransactionStatus::Returned;
        self.updated_at = Some(now);

        if was_overdue {
            // num_days truncates, which is a floor for a positive span
            let overdue_days = (now - self.due_date).num_days();
            self.fine_amount = fine_for(overdue_days, daily_fine);
        }

        Ok(ReturnOutcome {
            return_date: now,
            fine_amount: self.fine_amount,
            was_overdue,
        })
    }
}

/// Loan ready to be inserted, before the store assigns an id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub book_id: i32,
    pub member_id: i32,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

impl NewTransaction {
    pub fn into_transaction(self, id: i32) -> BorrowingTransaction {
        BorrowingTransaction {
            id,
            book_id: self.book_id,
            member_id: self.member_id,
            borrow_date: self.borrow_date,
            due_date: self.due_date,
            return_date: None,
            status: TransactionStatus::Active,
            fine_amount: Decimal::ZERO,
            created_at: self.borrow_date,
            updated_at: None,
        }
    }
}

/// Transaction row as stored in the database
#[derive(Debug, Clone, FromRow)]
pub struct TransactionRow {
    pub id: i32,
    pub book_id: i32,
    pub member_id: i32,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: String,
    pub fine_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<TransactionRow> for BorrowingTransaction {
    type Error = AppError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(BorrowingTransaction {
            id: row.id,
            book_id: row.book_id,
            member_id: row.member_id,
            borrow_date: row.borrow_date,
            due_date: row.due_date,
            return_date: row.return_date,
            status: row.status.parse().map_err(AppError::Internal)?,
            fine_amount: row.fine_amount,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Borrow request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowBook {
    #[validate(range(min = 1, message = "Book ID must be greater than 0"))]
    pub book_id: i32,
    #[validate(range(min = 1, message = "Member ID must be greater than 0"))]
    pub member_id: i32,
}

/// Ledger entry joined with the book and member it refers to
#[derive(Debug, Clone)]
pub struct TransactionHistoryEntry {
    pub transaction: BorrowingTransaction,
    pub book_title: String,
    pub book_author: String,
    pub member_name: String,
    pub membership_number: String,
}

/// Loan history row for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetails {
    pub id: i32,
    pub book_id: i32,
    pub book_title: String,
    pub book_author: String,
    pub member_id: i32,
    pub member_name: String,
    pub membership_number: String,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: TransactionStatus,
    pub fine_amount: Decimal,
    pub is_overdue: bool,
    pub days_overdue: i64,
}

impl TransactionDetails {
    pub fn project(entry: TransactionHistoryEntry, now: DateTime<Utc>) -> Self {
        let TransactionHistoryEntry {
            transaction,
            book_title,
            book_author,
            member_name,
            membership_number,
        } = entry;

        Self {
            is_overdue: transaction.is_overdue(now),
            days_overdue: transaction.overdue_days(now),
            id: transaction.id,
            book_id: transaction.book_id,
            book_title,
            book_author,
            member_id: transaction.member_id,
            member_name,
            membership_number,
            borrow_date: transaction.borrow_date,
            due_date: transaction.due_date,
            return_date: transaction.return_date,
            status: transaction.status,
            fine_amount: transaction.fine_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::models::{
        book::tests::sample_book,
        member::{tests::sample_member, MembershipType},
    };

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 10, 0, 0).unwrap()
    }

    fn active_loan(now: DateTime<Utc>) -> BorrowingTransaction {
        let book = sample_book(2);
        let member = sample_member(MembershipType::Student);
        BorrowingTransaction::open(&book, &member, now)
            .unwrap()
            .into_transaction(7)
    }

    #[test]
    fn test_open_sets_due_date_from_membership() {
        let book = sample_book(1);
        for kind in [
            MembershipType::Student,
            MembershipType::Adult,
            MembershipType::Senior,
            MembershipType::Staff,
        ] {
            let member = sample_member(kind);
            let loan = BorrowingTransaction::open(&book, &member, at(1)).unwrap();
            assert_eq!(loan.due_date - loan.borrow_date, Duration::days(kind.loan_period_days()));
        }
    }

    #[test]
    fn test_open_starts_active_without_fine() {
        let loan = active_loan(at(1));
        assert_eq!(loan.status, TransactionStatus::Active);
        assert_eq!(loan.fine_amount, Decimal::ZERO);
        assert!(loan.return_date.is_none());
    }

    #[test]
    fn test_open_member_error_comes_first() {
        let mut book = sample_book(1);
        book.borrow_copy().unwrap();
        let mut member = sample_member(MembershipType::Adult);
        member.deactivate();

        assert_eq!(
            BorrowingTransaction::open(&book, &member, at(1)),
            Err(DomainError::MemberNotActive)
        );

        member.activate();
        assert_eq!(
            BorrowingTransaction::open(&book, &member, at(1)),
            Err(DomainError::BookNotAvailable)
        );
    }

    #[test]
    fn test_return_on_due_date_is_free() {
        let mut loan = active_loan(at(1));
        let outcome = loan.close(loan.due_date, Decimal::new(200, 2)).unwrap();
        assert!(!outcome.was_overdue);
        assert_eq!(outcome.fine_amount, Decimal::ZERO);
        assert_eq!(loan.status, TransactionStatus::Returned);
    }

    #[test]
    fn test_return_days_late_is_fined_per_day() {
        for days in [1_i64, 5, 30] {
            let mut loan = active_loan(at(1));
            let returned = loan.due_date + Duration::days(days);
            let outcome = loan.close(returned, Decimal::new(200, 2)).unwrap();
            assert!(outcome.was_overdue);
            assert_eq!(outcome.fine_amount, Decimal::new(200 * days, 2));
            assert_eq!(loan.fine_amount, outcome.fine_amount);
            assert_eq!(loan.return_date, Some(returned));
        }
    }

    #[test]
    fn test_partial_day_late_is_overdue_but_free() {
        let mut loan = active_loan(at(1));
        let outcome = loan
            .close(loan.due_date + Duration::hours(20), Decimal::new(200, 2))
            .unwrap();
        assert!(outcome.was_overdue);
        assert_eq!(outcome.fine_amount, Decimal::ZERO);
    }

    #[test]
    fn test_second_close_fails_and_keeps_record() {
        let mut loan = active_loan(at(1));
        loan.close(loan.due_date + Duration::days(2), Decimal::new(200, 2)).unwrap();
        let before = loan.clone();

        let again = loan.close(loan.due_date + Duration::days(9), Decimal::new(200, 2));
        assert_eq!(again, Err(DomainError::TransactionNotActive));
        assert_eq!(loan, before);
    }

    #[test]
    fn test_overdue_marking() {
        let mut loan = active_loan(at(1));
        loan.mark_overdue(at(2));
        assert_eq!(loan.status, TransactionStatus::Active);

        let late = loan.due_date + Duration::days(3);
        assert!(loan.is_overdue(late));
        assert_eq!(loan.overdue_days(late), 3);

        loan.mark_overdue(late);
        assert_eq!(loan.status, TransactionStatus::Overdue);
        assert!(!loan.is_overdue(late));
        assert_eq!(loan.overdue_days(late), 0);
    }

    #[test]
    fn test_overdue_loan_cannot_be_closed() {
        let mut loan = active_loan(at(1));
        let late = loan.due_date + Duration::days(1);
        loan.mark_overdue(late);
        assert_eq!(
            loan.close(late, Decimal::new(200, 2)),
            Err(DomainError::TransactionNotActive)
        );
        assert!(loan.return_date.is_none());
    }
}
