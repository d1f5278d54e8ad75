//! Domain events and the sinks that consume them
//!
//! Services publish events only after their unit of work has committed. A sink
//! failing is logged by the caller and never undoes the committed change.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::{
    error::{AppError, AppResult},
    models::{BorrowingTransaction, Member},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookBorrowed {
    pub book_id: i32,
    pub member_id: i32,
    pub transaction_id: i32,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub occurred_on: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookReturned {
    pub book_id: i32,
    pub member_id: i32,
    pub transaction_id: i32,
    pub return_date: DateTime<Utc>,
    pub fine_amount: Decimal,
    pub was_overdue: bool,
    pub occurred_on: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRegistered {
    pub member_id: i32,
    pub membership_number: String,
    pub email: String,
    pub full_name: String,
    pub registration_date: DateTime<Utc>,
    pub occurred_on: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DomainEvent {
    BookBorrowed(BookBorrowed),
    BookReturned(BookReturned),
    MemberRegistered(MemberRegistered),
}

impl DomainEvent {
    pub fn borrowed(transaction: &BorrowingTransaction, occurred_on: DateTime<Utc>) -> Self {
        DomainEvent::BookBorrowed(BookBorrowed {
            book_id: transaction.book_id,
            member_id: transaction.member_id,
            transaction_id: transaction.id,
            borrow_date: transaction.borrow_date,
            due_date: transaction.due_date,
            occurred_on,
        })
    }

    pub fn returned(
        transaction: &BorrowingTransaction,
        return_date: DateTime<Utc>,
        was_overdue: bool,
        occurred_on: DateTime<Utc>,
    ) -> Self {
        DomainEvent::BookReturned(BookReturned {
            book_id: transaction.book_id,
            member_id: transaction.member_id,
            transaction_id: transaction.id,
            return_date,
            fine_amount: transaction.fine_amount,
            was_overdue,
            occurred_on,
        })
    }

    pub fn registered(member: &Member, occurred_on: DateTime<Utc>) -> Self {
        DomainEvent::MemberRegistered(MemberRegistered {
            member_id: member.id,
            membership_number: member.membership_number.clone(),
            email: member.email.clone(),
            full_name: member.full_name(),
            registration_date: member.registration_date,
            occurred_on,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::BookBorrowed(_) => "BookBorrowed",
            DomainEvent::BookReturned(_) => "BookReturned",
            DomainEvent::MemberRegistered(_) => "MemberRegistered",
        }
    }
}

/// Consumer of committed domain events
#[cfg_attr(test, mockall::automock)]
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: &DomainEvent) -> AppResult<()>;
}

/// Writes every event to the tracing log, standing in for member notifications
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingPublisher;

impl EventPublisher for LoggingPublisher {
    fn publish(&self, event: &DomainEvent) -> AppResult<()> {
        match event {
            DomainEvent::BookBorrowed(e) => {
                tracing::info!(
                    book_id = e.book_id,
                    member_id = e.member_id,
                    transaction_id = e.transaction_id,
                    due_date = %e.due_date,
                    "Book borrowed"
                );
            }
            DomainEvent::BookReturned(e) => {
                tracing::info!(
                    book_id = e.book_id,
                    member_id = e.member_id,
                    return_date = %e.return_date,
                    fine = %e.fine_amount,
                    was_overdue = e.was_overdue,
                    "Book returned"
                );
                if e.was_overdue {
                    tracing::warn!(
                        book_id = e.book_id,
                        member_id = e.member_id,
                        fine = %e.fine_amount,
                        "Book was returned overdue with fine"
                    );
                }
            }
            DomainEvent::MemberRegistered(e) => {
                tracing::info!(
                    member_id = e.member_id,
                    membership_number = %e.membership_number,
                    email = %e.email,
                    name = %e.full_name,
                    "New member registered"
                );
            }
        }
        Ok(())
    }
}

/// Fans events out to in-process subscribers over a tokio broadcast channel
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    sender: broadcast::Sender<DomainEvent>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl EventPublisher for BroadcastPublisher {
    fn publish(&self, event: &DomainEvent) -> AppResult<()> {
        // No subscriber is not an error: the event simply has no audience.
        if self.sender.receiver_count() == 0 {
            tracing::debug!("No subscriber for {}", event.name());
            return Ok(());
        }

        self.sender
            .send(event.clone())
            .map(|_| ())
            .map_err(|e| AppError::Internal(format!("Failed to broadcast {}: {}", event.name(), e)))
    }
}

/// Delivers each event to every registered sink, in registration order
#[derive(Default, Clone)]
pub struct EventBus {
    sinks: Vec<Arc<dyn EventPublisher>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventPublisher>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventPublisher for EventBus {
    /// Every sink gets the event even if an earlier one failed; the last
    /// failure is reported.
    fn publish(&self, event: &DomainEvent) -> AppResult<()> {
        let mut result = Ok(());
        for sink in &self.sinks {
            if let Err(e) = sink.publish(event) {
                result = Err(e);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> DomainEvent {
        let now = DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        DomainEvent::BookBorrowed(BookBorrowed {
            book_id: 1,
            member_id: 2,
            transaction_id: 3,
            borrow_date: now,
            due_date: now,
            occurred_on: now,
        })
    }

    #[tokio::test]
    async fn test_broadcast_reaches_subscriber() {
        let publisher = BroadcastPublisher::new(8);
        let mut rx = publisher.subscribe();

        publisher.publish(&sample_event()).unwrap();

        assert_eq!(rx.recv().await.unwrap(), sample_event());
    }

    #[test]
    fn test_broadcast_without_subscribers_is_ok() {
        let publisher = BroadcastPublisher::new(8);
        assert!(publisher.publish(&sample_event()).is_ok());
    }

    #[test]
    fn test_bus_delivers_to_all_sinks_despite_failure() {
        let mut failing = MockEventPublisher::new();
        failing
            .expect_publish()
            .times(1)
            .returning(|_| Err(AppError::Internal("sink down".to_string())));

        let mut healthy = MockEventPublisher::new();
        healthy.expect_publish().times(1).returning(|_| Ok(()));

        let bus = EventBus::new()
            .with(Arc::new(failing))
            .with(Arc::new(healthy));

        assert!(bus.publish(&sample_event()).is_err());
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(sample_event()).unwrap();
        assert_eq!(json["type"], "BookBorrowed");
        assert_eq!(json["transactionId"], 3);
    }
}
