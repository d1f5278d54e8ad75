//! Member (registered borrower) model and related types

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{AppError, DomainError};

/// Moroccan mobile and landline numbers: +212612345678 or 0612345678
pub static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\+212|0)[567]\d{8}$").expect("valid phone regex"));

/// Membership class, which drives the borrowing limit and loan period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "MembershipTypeWire")]
pub enum MembershipType {
    Student,
    Adult,
    Senior,
    Staff,
}

/// The web client sends either the enum name or its numeric code
#[derive(Deserialize)]
#[serde(untagged)]
enum MembershipTypeWire {
    Code(i16),
    Name(String),
}

impl TryFrom<MembershipTypeWire> for MembershipType {
    type Error = String;

    fn try_from(value: MembershipTypeWire) -> Result<Self, Self::Error> {
        match value {
            MembershipTypeWire::Code(code) => MembershipType::try_from(code),
            MembershipTypeWire::Name(name) => name.parse(),
        }
    }
}

impl MembershipType {
    /// Maximum number of simultaneous active loans
    pub fn borrowing_limit(&self) -> i32 {
        match self {
            MembershipType::Student => 3,
            MembershipType::Adult => 5,
            MembershipType::Senior => 5,
            MembershipType::Staff => 10,
        }
    }

    /// Days between borrow date and due date
    pub fn loan_period_days(&self) -> i64 {
        match self {
            MembershipType::Student => 14,
            MembershipType::Adult => 21,
            MembershipType::Senior => 21,
            MembershipType::Staff => 30,
        }
    }

    pub fn loan_period(&self) -> Duration {
        Duration::days(self.loan_period_days())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipType::Student => "Student",
            MembershipType::Adult => "Adult",
            MembershipType::Senior => "Senior",
            MembershipType::Staff => "Staff",
        }
    }
}

impl TryFrom<i16> for MembershipType {
    type Error = String;

    fn try_from(v: i16) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(MembershipType::Student),
            1 => Ok(MembershipType::Adult),
            2 => Ok(MembershipType::Senior),
            3 => Ok(MembershipType::Staff),
            _ => Err(format!("Invalid membership type code: {}", v)),
        }
    }
}

impl std::fmt::Display for MembershipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MembershipType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Student" => Ok(MembershipType::Student),
            "Adult" => Ok(MembershipType::Adult),
            "Senior" => Ok(MembershipType::Senior),
            "Staff" => Ok(MembershipType::Staff),
            _ => Err(format!("Invalid membership type: {}", s)),
        }
    }
}

/// Format a membership number: `MEM` + year + 4-digit sequence
pub fn membership_number(year: i32, sequence: i64) -> String {
    format!("MEM{}{:04}", year, sequence)
}

/// Registered library member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: i32,
    pub membership_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub membership_type: MembershipType,
    pub registration_date: DateTime<Utc>,
    pub is_active: bool,
    pub active_borrowings_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Member {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn borrowing_limit(&self) -> i32 {
        self.membership_type.borrowing_limit()
    }

    pub fn loan_period_days(&self) -> i64 {
        self.membership_type.loan_period_days()
    }

    /// Checks account state and the borrowing limit, in that order
    pub fn can_borrow(&self) -> Result<(), DomainError> {
        if !self.is_active {
            return Err(DomainError::MemberNotActive);
        }

        if self.active_borrowings_count >= self.borrowing_limit() {
            return Err(DomainError::BorrowingLimitExceeded {
                limit: self.borrowing_limit(),
            });
        }

        Ok(())
    }

    pub fn increment_active_borrowings(&mut self) {
        self.active_borrowings_count += 1;
    }

    /// Never drops below zero.
    pub fn decrement_active_borrowings(&mut self) {
        if self.active_borrowings_count > 0 {
            self.active_borrowings_count -= 1;
        }
    }

    pub fn activate(&mut self) {
        self.is_active = true;
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
    }
}

/// Member row as stored in the database
#[derive(Debug, Clone, FromRow)]
pub struct MemberRow {
    pub id: i32,
    pub membership_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub membership_type: String,
    pub registration_date: DateTime<Utc>,
    pub is_active: bool,
    pub active_borrowings_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<MemberRow> for Member {
    type Error = AppError;

    fn try_from(row: MemberRow) -> Result<Self, Self::Error> {
        Ok(Member {
            id: row.id,
            membership_number: row.membership_number,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            membership_type: row.membership_type.parse().map_err(AppError::Internal)?,
            registration_date: row.registration_date,
            is_active: row.is_active,
            active_borrowings_count: row.active_borrowings_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Register member request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterMember {
    #[validate(length(min = 1, max = 50, message = "First name is required and cannot exceed 50 characters"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 50, message = "Last name is required and cannot exceed 50 characters"))]
    pub last_name: String,
    #[validate(
        email(message = "Invalid email format"),
        length(max = 100, message = "Email cannot exceed 100 characters")
    )]
    pub email: String,
    #[validate(regex(
        path = *PHONE_RE,
        message = "Invalid Moroccan phone number. Use format: +212612345678 or 0612345678"
    ))]
    pub phone: String,
    #[validate(length(min = 1, max = 200, message = "Address is required and cannot exceed 200 characters"))]
    pub address: String,
    pub membership_type: MembershipType,
}

/// Member ready to be inserted, before the store assigns an id
#[derive(Debug, Clone)]
pub struct NewMember {
    pub membership_number: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub membership_type: MembershipType,
    pub registration_date: DateTime<Utc>,
}

impl NewMember {
    pub fn new(request: RegisterMember, membership_number: String, now: DateTime<Utc>) -> Self {
        Self {
            membership_number,
            first_name: request.first_name,
            last_name: request.last_name,
            email: request.email,
            phone: request.phone,
            address: request.address,
            membership_type: request.membership_type,
            registration_date: now,
        }
    }

    /// New members start active with no loans.
    pub fn into_member(self, id: i32) -> Member {
        Member {
            id,
            membership_number: self.membership_number,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            membership_type: self.membership_type,
            registration_date: self.registration_date,
            is_active: true,
            active_borrowings_count: 0,
            created_at: self.registration_date,
            updated_at: None,
        }
    }
}

/// Member projection for listings
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberSummary {
    pub id: i32,
    pub membership_number: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub membership_type: MembershipType,
    pub registration_date: DateTime<Utc>,
    pub is_active: bool,
    pub active_borrowings_count: i32,
    pub borrowing_limit: i32,
}

impl From<Member> for MemberSummary {
    fn from(member: Member) -> Self {
        Self {
            full_name: member.full_name(),
            borrowing_limit: member.borrowing_limit(),
            id: member.id,
            membership_number: member.membership_number,
            first_name: member.first_name,
            last_name: member.last_name,
            email: member.email,
            phone: member.phone,
            address: member.address,
            membership_type: member.membership_type,
            registration_date: member.registration_date,
            is_active: member.is_active,
            active_borrowings_count: member.active_borrowings_count,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_member(membership_type: MembershipType) -> Member {
        NewMember {
            membership_number: membership_number(2024, 1),
            first_name: "Amina".to_string(),
            last_name: "Benali".to_string(),
            email: "amina@example.com".to_string(),
            phone: "0612345678".to_string(),
            address: "12 Rue Atlas, Rabat".to_string(),
            membership_type,
            registration_date: Utc::now(),
        }
        .into_member(1)
    }

    #[test]
    fn test_limits_and_periods() {
        let table = [
            (MembershipType::Student, 3, 14),
            (MembershipType::Adult, 5, 21),
            (MembershipType::Senior, 5, 21),
            (MembershipType::Staff, 10, 30),
        ];
        for (kind, limit, days) in table {
            assert_eq!(kind.borrowing_limit(), limit);
            assert_eq!(kind.loan_period_days(), days);
            assert_eq!(kind.loan_period(), Duration::days(days));
        }
    }

    #[test]
    fn test_membership_number_format() {
        assert_eq!(membership_number(2024, 1), "MEM20240001");
        assert_eq!(membership_number(2025, 123), "MEM20250123");
    }

    #[test]
    fn test_new_member_defaults() {
        let member = sample_member(MembershipType::Adult);
        assert!(member.is_active);
        assert_eq!(member.active_borrowings_count, 0);
        assert_eq!(member.full_name(), "Amina Benali");
    }

    #[test]
    fn test_inactive_member_cannot_borrow() {
        let mut member = sample_member(MembershipType::Staff);
        member.deactivate();
        assert_eq!(member.can_borrow(), Err(DomainError::MemberNotActive));

        member.activate();
        assert_eq!(member.can_borrow(), Ok(()));
    }

    #[test]
    fn test_limit_reached() {
        let mut member = sample_member(MembershipType::Student);
        for _ in 0..3 {
            assert!(member.can_borrow().is_ok());
            member.increment_active_borrowings();
        }
        assert_eq!(
            member.can_borrow(),
            Err(DomainError::BorrowingLimitExceeded { limit: 3 })
        );
    }

    #[test]
    fn test_inactive_checked_before_limit() {
        let mut member = sample_member(MembershipType::Student);
        member.active_borrowings_count = 3;
        member.deactivate();
        assert_eq!(member.can_borrow(), Err(DomainError::MemberNotActive));
    }

    #[test]
    fn test_decrement_floors_at_zero() {
        let mut member = sample_member(MembershipType::Adult);
        member.decrement_active_borrowings();
        assert_eq!(member.active_borrowings_count, 0);

        member.increment_active_borrowings();
        member.decrement_active_borrowings();
        member.decrement_active_borrowings();
        assert_eq!(member.active_borrowings_count, 0);
    }

    #[test]
    fn test_membership_type_from_wire() {
        let by_name: MembershipType = serde_json::from_str("\"Senior\"").unwrap();
        assert_eq!(by_name, MembershipType::Senior);

        let by_code: MembershipType = serde_json::from_str("3").unwrap();
        assert_eq!(by_code, MembershipType::Staff);

        assert!(serde_json::from_str::<MembershipType>("7").is_err());
        assert!(serde_json::from_str::<MembershipType>("\"Gold\"").is_err());
    }

    #[test]
    fn test_register_phone_validation() {
        let request = RegisterMember {
            first_name: "Youssef".to_string(),
            last_name: "Alaoui".to_string(),
            email: "youssef@example.com".to_string(),
            phone: "12345".to_string(),
            address: "5 Avenue Hassan II, Casablanca".to_string(),
            membership_type: MembershipType::Adult,
        };
        assert!(request.validate().is_err());

        let request = RegisterMember {
            phone: "+212612345678".to_string(),
            ..request
        };
        assert!(request.validate().is_ok());
    }
}
