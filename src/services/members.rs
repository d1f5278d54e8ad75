//! Member registry service

use std::sync::Arc;

use chrono::Datelike;

use super::{dispatch, Clock};
use crate::{
    error::{AppResult, DomainError},
    events::{DomainEvent, EventPublisher},
    models::member::{membership_number, Member, MemberSummary, NewMember, RegisterMember},
    repository::Repository,
};

#[derive(Clone)]
pub struct MembersService {
    repository: Repository,
    events: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
}

impl MembersService {
    pub fn new(repository: Repository, events: Arc<dyn EventPublisher>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            events,
            clock,
        }
    }

    /// Register a new active member and announce it
    pub async fn register_member(&self, request: RegisterMember) -> AppResult<Member> {
        let now = self.clock.now();
        let mut unit = self.repository.begin().await?;

        if unit.email_exists(&request.email).await? {
            tracing::debug!(email = %request.email, "Rejected duplicate email");
            return Err(DomainError::EmailAlreadyExists.into());
        }

        let sequence = unit.count_members().await? + 1;
        let number = membership_number(now.year(), sequence);
        let member = unit.insert_member(NewMember::new(request, number, now)).await?;
        unit.commit().await?;

        tracing::info!(
            member_id = member.id,
            membership_number = %member.membership_number,
            membership_type = %member.membership_type,
            "Member registered"
        );
        dispatch(self.events.as_ref(), DomainEvent::registered(&member, now));

        Ok(member)
    }

    pub async fn get_member(&self, id: i32) -> AppResult<Member> {
        self.repository
            .get_member(id)
            .await?
            .ok_or_else(|| DomainError::MemberNotFound(id).into())
    }

    /// Active members only
    pub async fn list_members(&self) -> AppResult<Vec<MemberSummary>> {
        let members = self.repository.list_active_members().await?;
        Ok(members.into_iter().map(MemberSummary::from).collect())
    }

    pub async fn activate_member(&self, id: i32) -> AppResult<Member> {
        self.set_active(id, true).await
    }

    pub async fn deactivate_member(&self, id: i32) -> AppResult<Member> {
        self.set_active(id, false).await
    }

    async fn set_active(&self, id: i32, active: bool) -> AppResult<Member> {
        let mut unit = self.repository.begin().await?;
        let mut member = unit
            .member_for_update(id)
            .await?
            .ok_or(DomainError::MemberNotFound(id))?;

        if active {
            member.activate();
        } else {
            member.deactivate();
        }
        member.updated_at = Some(self.clock.now());

        unit.save_member(&member).await?;
        unit.commit().await?;

        tracing::info!(member_id = id, is_active = active, "Member status changed");
        Ok(member)
    }
}
