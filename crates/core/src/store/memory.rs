use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::activity::{ActivityLog, ActivityLogId, EntityRef, NewActivity};
use crate::domain::inquiry::{Inquiry, InquiryDetails, InquiryId, InquiryStatus};
use crate::domain::proposal::{Proposal, ProposalId};
use crate::domain::user::UserId;
use crate::errors::StorageError;

use super::{ActivitySink, InquiryRepository, ProposalRepository, Store, UnitOfWork};

#[derive(Clone, Debug, Default)]
struct MemoryState {
    inquiries: Vec<Inquiry>,
    proposals: Vec<Proposal>,
    activity: Vec<ActivityLog>,
}

impl MemoryState {
    fn inquiry_mut(&mut self, id: &InquiryId) -> Option<&mut Inquiry> {
        self.inquiries.iter_mut().find(|inquiry| &inquiry.id == id)
    }
}

#[derive(Debug, Default)]
struct Faults {
    fail_activity_appends: AtomicBool,
}

/// Store backed by process memory. Units of work are serialized by one mutex and operate on
/// a private copy of the state that replaces the shared state on commit.
#[derive(Clone, Debug, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
    faults: Arc<Faults>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent activity append fail with a storage error.
    pub fn fail_activity_appends(&self, fail: bool) {
        self.faults.fail_activity_appends.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type Tx = MemoryUnitOfWork;

    async fn begin(&self) -> Result<Self::Tx, StorageError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(MemoryUnitOfWork { guard, working, faults: Arc::clone(&self.faults) })
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    faults: Arc<Faults>,
}

#[async_trait]
impl InquiryRepository for MemoryUnitOfWork {
    async fn find_inquiry(&mut self, id: &InquiryId) -> Result<Option<Inquiry>, StorageError> {
        Ok(self.working.inquiries.iter().find(|inquiry| &inquiry.id == id).cloned())
    }

    async fn list_inquiries(&mut self) -> Result<Vec<Inquiry>, StorageError> {
        let mut inquiries: Vec<Inquiry> = self.working.inquiries.iter().rev().cloned().collect();
        inquiries.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(inquiries)
    }

    async fn insert_inquiry(&mut self, inquiry: &Inquiry) -> Result<(), StorageError> {
        if self.working.inquiries.iter().any(|existing| existing.id == inquiry.id) {
            return Err(StorageError::new(format!("inquiry {} already exists", inquiry.id)));
        }
        self.working.inquiries.push(inquiry.clone());
        Ok(())
    }

    async fn update_inquiry_details(
        &mut self,
        id: &InquiryId,
        details: &InquiryDetails,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        Ok(self.working.inquiry_mut(id).map_or(false, |inquiry| {
            inquiry.details = details.clone();
            inquiry.updated_at = updated_at;
            true
        }))
    }

    async fn update_inquiry_status(
        &mut self,
        id: &InquiryId,
        status: InquiryStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        Ok(self.working.inquiry_mut(id).map_or(false, |inquiry| {
            inquiry.status = status;
            inquiry.updated_at = updated_at;
            true
        }))
    }

    async fn update_inquiry_assignee(
        &mut self,
        id: &InquiryId,
        assignee: Option<&UserId>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        Ok(self.working.inquiry_mut(id).map_or(false, |inquiry| {
            inquiry.assigned_to = assignee.cloned();
            inquiry.updated_at = updated_at;
            true
        }))
    }

    async fn lock_inquiry(&mut self, id: &InquiryId) -> Result<bool, StorageError> {
        // The store-wide mutex is already held for the whole unit of work.
        Ok(self.working.inquiries.iter().any(|inquiry| &inquiry.id == id))
    }
}

#[async_trait]
impl ProposalRepository for MemoryUnitOfWork {
    async fn max_proposal_version(
        &mut self,
        inquiry_id: &InquiryId,
    ) -> Result<Option<u32>, StorageError> {
        Ok(self
            .working
            .proposals
            .iter()
            .filter(|proposal| &proposal.inquiry_id == inquiry_id)
            .map(|proposal| proposal.version)
            .max())
    }

    async fn insert_proposal(&mut self, proposal: &Proposal) -> Result<(), StorageError> {
        let duplicate = self.working.proposals.iter().any(|existing| {
            existing.id == proposal.id
                || (existing.inquiry_id == proposal.inquiry_id
                    && existing.version == proposal.version)
        });
        if duplicate {
            return Err(StorageError::new(format!(
                "proposal v{} for inquiry {} already exists",
                proposal.version, proposal.inquiry_id
            )));
        }
        self.working.proposals.push(proposal.clone());
        Ok(())
    }

    async fn find_proposal(&mut self, id: &ProposalId) -> Result<Option<Proposal>, StorageError> {
        Ok(self.working.proposals.iter().find(|proposal| &proposal.id == id).cloned())
    }

    async fn list_proposals(
        &mut self,
        inquiry_id: &InquiryId,
    ) -> Result<Vec<Proposal>, StorageError> {
        let mut proposals: Vec<Proposal> = self
            .working
            .proposals
            .iter()
            .filter(|proposal| &proposal.inquiry_id == inquiry_id)
            .cloned()
            .collect();
        proposals.sort_by(|left, right| right.version.cmp(&left.version));
        Ok(proposals)
    }

    async fn update_proposal_state(&mut self, proposal: &Proposal) -> Result<bool, StorageError> {
        let Some(stored) =
            self.working.proposals.iter_mut().find(|existing| existing.id == proposal.id)
        else {
            return Ok(false);
        };
        stored.status = proposal.status;
        stored.sent_at = proposal.sent_at;
        stored.accepted_package_id = proposal.accepted_package_id.clone();
        stored.updated_at = proposal.updated_at;
        Ok(true)
    }
}

#[async_trait]
impl ActivitySink for MemoryUnitOfWork {
    async fn append_activity(&mut self, entry: NewActivity) -> Result<ActivityLogId, StorageError> {
        if self.faults.fail_activity_appends.load(Ordering::SeqCst) {
            return Err(StorageError::new("activity log unavailable"));
        }
        let id = ActivityLogId::generate();
        self.working.activity.push(ActivityLog::record(id.clone(), entry));
        Ok(id)
    }

    async fn list_activity(
        &mut self,
        entity: &EntityRef,
    ) -> Result<Vec<ActivityLog>, StorageError> {
        let mut entries: Vec<ActivityLog> = self
            .working
            .activity
            .iter()
            .rev()
            .filter(|entry| &entry.entity == entity)
            .cloned()
            .collect();
        entries.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(entries)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(self) -> Result<(), StorageError> {
        let Self { mut guard, working, .. } = self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::InMemoryStore;
    use crate::domain::activity::{ActivityType, EntityRef, NewActivity};
    use crate::domain::inquiry::{Inquiry, InquiryDetails, InquiryStatus};
    use crate::store::{ActivitySink, InquiryRepository, Store, UnitOfWork};

    fn details() -> InquiryDetails {
        InquiryDetails {
            contact_name: "Ana Ruiz".to_owned(),
            contact_email: "ana@example.com".to_owned(),
            contact_phone: None,
            event_type: "Quinceañera".to_owned(),
            event_date: None,
            address1: None,
            address2: None,
            city: None,
            state: None,
            zip_code: None,
            guest_count_adults: None,
            guest_count_children: None,
            vision_notes: None,
            source: None,
        }
    }

    #[tokio::test]
    async fn committed_work_is_visible_to_the_next_unit() {
        let store = InMemoryStore::new();
        let inquiry = Inquiry::new(details(), Utc::now());

        let mut tx = store.begin().await.expect("begin");
        tx.insert_inquiry(&inquiry).await.expect("insert");
        tx.commit().await.expect("commit");

        let mut tx = store.begin().await.expect("begin");
        assert_eq!(tx.find_inquiry(&inquiry.id).await.expect("find"), Some(inquiry));
    }

    #[tokio::test]
    async fn dropped_unit_of_work_rolls_back() {
        let store = InMemoryStore::new();
        let inquiry = Inquiry::new(details(), Utc::now());

        {
            let mut tx = store.begin().await.expect("begin");
            tx.insert_inquiry(&inquiry).await.expect("insert");
            tx.update_inquiry_status(&inquiry.id, InquiryStatus::Quoting, Utc::now())
                .await
                .expect("update");
        }

        let mut tx = store.begin().await.expect("begin");
        assert_eq!(tx.find_inquiry(&inquiry.id).await.expect("find"), None);
        assert!(!tx.lock_inquiry(&inquiry.id).await.expect("lock"));
    }

    #[tokio::test]
    async fn activity_is_listed_newest_first_per_entity() {
        let store = InMemoryStore::new();
        let first = Inquiry::new(details(), Utc::now());
        let second = Inquiry::new(details(), Utc::now());
        let entity = EntityRef::Inquiry(first.id.clone());

        let mut tx = store.begin().await.expect("begin");
        tx.append_activity(NewActivity::new(entity.clone(), ActivityType::InquiryCreated))
            .await
            .expect("append");
        tx.append_activity(NewActivity::new(
            EntityRef::Inquiry(second.id.clone()),
            ActivityType::InquiryCreated,
        ))
        .await
        .expect("append");
        tx.append_activity(NewActivity::new(entity.clone(), ActivityType::StatusChanged))
            .await
            .expect("append");
        tx.commit().await.expect("commit");

        let mut tx = store.begin().await.expect("begin");
        let kinds: Vec<ActivityType> = tx
            .list_activity(&entity)
            .await
            .expect("list")
            .into_iter()
            .map(|entry| entry.activity_type)
            .collect();
        assert_eq!(kinds, vec![ActivityType::StatusChanged, ActivityType::InquiryCreated]);
    }

    #[tokio::test]
    async fn injected_append_failure_surfaces_as_storage_error() {
        let store = InMemoryStore::new();
        store.fail_activity_appends(true);

        let mut tx = store.begin().await.expect("begin");
        let error = tx
            .append_activity(NewActivity::new(
                EntityRef::Event("evt-1".to_owned()),
                ActivityType::StatusChanged,
            ))
            .await
            .expect_err("append should fail");
        assert_eq!(error.message, "activity log unavailable");
    }
}
