//! Persistence port used by the lifecycle services.
//!
//! Every public service operation runs inside exactly one [`UnitOfWork`]. Work becomes
//! visible only through [`UnitOfWork::commit`]; a unit of work that is dropped on an error
//! path is rolled back by its implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::activity::{ActivityLog, ActivityLogId, EntityRef, NewActivity};
use crate::domain::inquiry::{Inquiry, InquiryDetails, InquiryId, InquiryStatus};
use crate::domain::proposal::{Proposal, ProposalId};
use crate::domain::user::UserId;
use crate::errors::StorageError;

pub mod memory;

pub use memory::InMemoryStore;

#[async_trait]
pub trait InquiryRepository: Send {
    async fn find_inquiry(&mut self, id: &InquiryId) -> Result<Option<Inquiry>, StorageError>;

    /// Newest first.
    async fn list_inquiries(&mut self) -> Result<Vec<Inquiry>, StorageError>;

    async fn insert_inquiry(&mut self, inquiry: &Inquiry) -> Result<(), StorageError>;

    /// Returns `false` when no inquiry has the id.
    async fn update_inquiry_details(
        &mut self,
        id: &InquiryId,
        details: &InquiryDetails,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, StorageError>;

    async fn update_inquiry_status(
        &mut self,
        id: &InquiryId,
        status: InquiryStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, StorageError>;

    async fn update_inquiry_assignee(
        &mut self,
        id: &InquiryId,
        assignee: Option<&UserId>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, StorageError>;

    /// Takes the write lock covering the inquiry for the rest of the unit of work, so
    /// read-then-write sequences on its children (proposal versions) are serialized.
    /// The inquiry itself is not modified. Returns `false` when it does not exist.
    async fn lock_inquiry(&mut self, id: &InquiryId) -> Result<bool, StorageError>;
}

#[async_trait]
pub trait ProposalRepository: Send {
    /// Highest stored version for the inquiry, `None` before the first proposal.
    async fn max_proposal_version(
        &mut self,
        inquiry_id: &InquiryId,
    ) -> Result<Option<u32>, StorageError>;

    /// Stores the proposal together with its packages and line items.
    async fn insert_proposal(&mut self, proposal: &Proposal) -> Result<(), StorageError>;

    async fn find_proposal(&mut self, id: &ProposalId) -> Result<Option<Proposal>, StorageError>;

    /// Highest version first.
    async fn list_proposals(
        &mut self,
        inquiry_id: &InquiryId,
    ) -> Result<Vec<Proposal>, StorageError>;

    /// Persists the mutable fields of a proposal: status, `sent_at`, `accepted_package_id`
    /// and `updated_at`. Packages and items are never rewritten.
    async fn update_proposal_state(&mut self, proposal: &Proposal) -> Result<bool, StorageError>;
}

/// Append-only activity log.
#[async_trait]
pub trait ActivitySink: Send {
    async fn append_activity(&mut self, entry: NewActivity) -> Result<ActivityLogId, StorageError>;

    /// Entries attached to `entity`, newest first.
    async fn list_activity(&mut self, entity: &EntityRef) -> Result<Vec<ActivityLog>, StorageError>;
}

#[async_trait]
pub trait UnitOfWork: InquiryRepository + ProposalRepository + ActivitySink {
    async fn commit(self) -> Result<(), StorageError>;
}

#[async_trait]
pub trait Store: Send + Sync {
    type Tx: UnitOfWork;

    async fn begin(&self) -> Result<Self::Tx, StorageError>;
}
