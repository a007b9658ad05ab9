use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::user::UserId;
use crate::errors::ValidationError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InquiryId(pub String);

impl InquiryId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for InquiryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sales pipeline status of an inquiry. The serialized names are the stored and wire-visible
/// vocabulary and must not change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InquiryStatus {
    New,
    InReview,
    WaitingOnClient,
    Quoting,
    QuotedWaiting,
    AcceptedNotBooked,
    Booked,
    Lost,
    Disqualified,
    Expired,
}

impl InquiryStatus {
    pub const ALL: [InquiryStatus; 10] = [
        Self::New,
        Self::InReview,
        Self::WaitingOnClient,
        Self::Quoting,
        Self::QuotedWaiting,
        Self::AcceptedNotBooked,
        Self::Booked,
        Self::Lost,
        Self::Disqualified,
        Self::Expired,
    ];

    /// Statuses that close an inquiry negatively.
    pub const NEGATIVE: [InquiryStatus; 3] = [Self::Lost, Self::Disqualified, Self::Expired];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::InReview => "IN_REVIEW",
            Self::WaitingOnClient => "WAITING_ON_CLIENT",
            Self::Quoting => "QUOTING",
            Self::QuotedWaiting => "QUOTED_WAITING",
            Self::AcceptedNotBooked => "ACCEPTED_NOT_BOOKED",
            Self::Booked => "BOOKED",
            Self::Lost => "LOST",
            Self::Disqualified => "DISQUALIFIED",
            Self::Expired => "EXPIRED",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::InReview => "In Review",
            Self::WaitingOnClient => "Waiting on Client",
            Self::Quoting => "Quoting",
            Self::QuotedWaiting => "Quoted — Waiting",
            Self::AcceptedNotBooked => "Accepted (Not Booked)",
            Self::Booked => "Booked",
            Self::Lost => "Lost",
            Self::Disqualified => "Disqualified",
            Self::Expired => "Expired",
        }
    }

    /// Wire name with underscores turned into spaces, e.g. `IN REVIEW`.
    pub fn humanized(self) -> String {
        self.as_str().replace('_', " ")
    }

    /// Ordinal position in the sales pipeline; negative statuses have no stage.
    pub fn stage(self) -> Option<u8> {
        match self {
            Self::New => Some(0),
            Self::InReview => Some(1),
            Self::WaitingOnClient => Some(2),
            Self::Quoting => Some(3),
            Self::QuotedWaiting => Some(4),
            Self::AcceptedNotBooked => Some(5),
            Self::Booked => Some(6),
            Self::Lost | Self::Disqualified | Self::Expired => None,
        }
    }

    pub fn is_negative(self) -> bool {
        Self::NEGATIVE.contains(&self)
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Booked || self.is_negative()
    }
}

impl fmt::Display for InquiryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown inquiry status `{0}`")]
pub struct UnknownInquiryStatus(pub String);

impl FromStr for InquiryStatus {
    type Err = UnknownInquiryStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| UnknownInquiryStatus(value.to_owned()))
    }
}

/// Normalized contact and event details of an inquiry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InquiryDetails {
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub event_type: String,
    pub event_date: Option<NaiveDate>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub guest_count_adults: Option<u32>,
    pub guest_count_children: Option<u32>,
    pub vision_notes: Option<String>,
    pub source: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inquiry {
    pub id: InquiryId,
    pub details: InquiryDetails,
    pub status: InquiryStatus,
    pub assigned_to: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Inquiry {
    /// A freshly received lead.
    pub fn new(details: InquiryDetails, now: DateTime<Utc>) -> Self {
        Self {
            id: InquiryId::generate(),
            details,
            status: InquiryStatus::New,
            assigned_to: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Raw intake form values before normalization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InquiryInput {
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub event_type: String,
    pub event_date: Option<NaiveDate>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub guest_count_adults: Option<i64>,
    pub guest_count_children: Option<i64>,
    pub vision_notes: Option<String>,
    pub source: Option<String>,
}

impl InquiryInput {
    pub fn normalize(self) -> Result<InquiryDetails, ValidationError> {
        let contact_name = required("contact_name", &self.contact_name)?;
        let contact_email = normalize_email(&self.contact_email)?;
        let event_type = required("event_type", &self.event_type)?;

        Ok(InquiryDetails {
            contact_name,
            contact_email,
            contact_phone: optional(self.contact_phone),
            event_type,
            event_date: self.event_date,
            address1: optional(self.address1),
            address2: optional(self.address2),
            city: optional(self.city),
            state: optional(self.state),
            zip_code: optional(self.zip_code),
            guest_count_adults: guest_count("guest_count_adults", self.guest_count_adults)?,
            guest_count_children: guest_count("guest_count_children", self.guest_count_children)?,
            vision_notes: optional(self.vision_notes),
            source: optional(self.source),
        })
    }
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    Ok(trimmed.to_owned())
}

fn optional(value: Option<String>) -> Option<String> {
    value.map(|value| value.trim().to_owned()).filter(|value| !value.is_empty())
}

fn normalize_email(value: &str) -> Result<String, ValidationError> {
    let email = value.trim().to_lowercase();
    if email.is_empty() {
        return Err(ValidationError::MissingField { field: "contact_email" });
    }

    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
                && domain.split('.').count() >= 2
                && domain.split('.').all(|label| !label.is_empty())
        }
        None => false,
    };
    if !well_formed {
        return Err(ValidationError::InvalidEmail { value: value.trim().to_owned() });
    }
    Ok(email)
}

fn guest_count(field: &'static str, value: Option<i64>) -> Result<Option<u32>, ValidationError> {
    match value {
        None => Ok(None),
        Some(count) => u32::try_from(count)
            .map(Some)
            .map_err(|_| ValidationError::NegativeCount { field, value: count }),
    }
}
