use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::inquiry::InquiryId;
use crate::domain::proposal::ProposalId;
use crate::domain::user::UserId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivityLogId(pub String);

impl ActivityLogId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for ActivityLogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    InquiryCreated,
    InquiryUpdated,
    StatusChanged,
    Assigned,
    ProposalCreated,
    ProposalSent,
    ProposalAccepted,
}

impl ActivityType {
    pub const ALL: [ActivityType; 7] = [
        Self::InquiryCreated,
        Self::InquiryUpdated,
        Self::StatusChanged,
        Self::Assigned,
        Self::ProposalCreated,
        Self::ProposalSent,
        Self::ProposalAccepted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::InquiryCreated => "INQUIRY_CREATED",
            Self::InquiryUpdated => "INQUIRY_UPDATED",
            Self::StatusChanged => "STATUS_CHANGED",
            Self::Assigned => "ASSIGNED",
            Self::ProposalCreated => "PROPOSAL_CREATED",
            Self::ProposalSent => "PROPOSAL_SENT",
            Self::ProposalAccepted => "PROPOSAL_ACCEPTED",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown activity type `{0}`")]
pub struct UnknownActivityType(pub String);

impl FromStr for ActivityType {
    type Err = UnknownActivityType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| UnknownActivityType(value.to_owned()))
    }
}

/// The single record an activity entry is attached to. Events and bookings are owned by
/// downstream modules; only their ids are known here.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Inquiry(InquiryId),
    Proposal(ProposalId),
    Event(String),
    Booking(String),
}

impl EntityRef {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Inquiry(_) => "inquiry",
            Self::Proposal(_) => "proposal",
            Self::Event(_) => "event",
            Self::Booking(_) => "booking",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Inquiry(id) => &id.0,
            Self::Proposal(id) => &id.0,
            Self::Event(id) | Self::Booking(id) => id,
        }
    }

    pub fn from_parts(kind: &str, id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        match kind {
            "inquiry" => Some(Self::Inquiry(InquiryId(id))),
            "proposal" => Some(Self::Proposal(ProposalId(id))),
            "event" => Some(Self::Event(id)),
            "booking" => Some(Self::Booking(id)),
            _ => None,
        }
    }
}

/// An entry waiting to be appended to the activity log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewActivity {
    pub entity: EntityRef,
    pub activity_type: ActivityType,
    pub message: Option<String>,
    pub payload: Option<Value>,
    pub actor_id: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

impl NewActivity {
    pub fn new(entity: EntityRef, activity_type: ActivityType) -> Self {
        Self {
            entity,
            activity_type,
            message: None,
            payload: None,
            actor_id: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn by(mut self, actor_id: Option<UserId>) -> Self {
        self.actor_id = actor_id;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivityLog {
    pub id: ActivityLogId,
    pub entity: EntityRef,
    pub activity_type: ActivityType,
    pub message: Option<String>,
    pub payload: Option<Value>,
    pub actor_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl ActivityLog {
    pub fn record(id: ActivityLogId, entry: NewActivity) -> Self {
        Self {
            id,
            entity: entry.entity,
            activity_type: entry.activity_type,
            message: entry.message,
            payload: entry.payload,
            actor_id: entry.actor_id,
            created_at: entry.occurred_at,
        }
    }
}
