//! Data models for the library server

pub mod book;
pub mod member;
pub mod transaction;

// Re-export commonly used types
pub use book::{Book, BookStatus, BookSummary};
pub use member::{Member, MemberSummary, MembershipType};
pub use transaction::{BorrowingTransaction, TransactionDetails, TransactionStatus};
