//! Business logic services

pub mod catalog;
pub mod clock;
pub mod lending;
pub mod members;

use std::sync::Arc;

use crate::{
    config::LendingConfig,
    events::{DomainEvent, EventPublisher},
    repository::Repository,
};

pub use clock::{Clock, ManualClock, SystemClock};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub members: members::MembersService,
    pub lending: lending::LendingService,
    pub repository: Repository,
}

impl Services {
    /// Create all services over the given repository
    pub fn new(
        repository: Repository,
        events: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        lending: &LendingConfig,
    ) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone(), clock.clone()),
            members: members::MembersService::new(repository.clone(), events.clone(), clock.clone()),
            lending: lending::LendingService::new(repository.clone(), events, clock, lending.daily_fine()),
            repository,
        }
    }
}

/// Hand a committed event to the sinks. Failures are logged, never returned.
pub(crate) fn dispatch(events: &dyn EventPublisher, event: DomainEvent) {
    if let Err(e) = events.publish(&event) {
        tracing::warn!(event = event.name(), error = %e, "Failed to publish domain event");
    }
}
