use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::domain::activity::{ActivityLog, ActivityType, EntityRef, NewActivity};
use crate::domain::inquiry::{Inquiry, InquiryId, InquiryInput, InquiryStatus};
use crate::domain::user::UserId;
use crate::errors::{ApplicationError, StorageError, ValidationError};
use crate::flows::{assert_transition, valid_transitions};
use crate::store::{ActivitySink, InquiryRepository, Store, UnitOfWork};

const MORE_INFO_PREFIX: &str = "Requested more info: ";

/// Optional context attached to a status change.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatusChange {
    pub message: Option<String>,
    pub payload: Option<Value>,
    pub actor_id: Option<UserId>,
}

impl StatusChange {
    pub fn by(actor_id: Option<UserId>) -> Self {
        Self { actor_id, ..Self::default() }
    }
}

/// Inquiry intake, editing and pipeline movement. Every operation is one unit of work;
/// `Ok(None)` means the inquiry does not exist.
#[derive(Clone, Debug)]
pub struct InquiryService<S> {
    store: S,
}

impl<S: Store> InquiryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn create_inquiry(
        &self,
        input: InquiryInput,
        actor_id: Option<UserId>,
    ) -> Result<Inquiry, ApplicationError> {
        let details = input.normalize()?;
        let inquiry = Inquiry::new(details, Utc::now());

        let mut tx = self.store.begin().await?;
        tx.insert_inquiry(&inquiry).await?;
        tx.append_activity(
            NewActivity::new(EntityRef::Inquiry(inquiry.id.clone()), ActivityType::InquiryCreated)
                .with_message("Inquiry created from management app.")
                .with_payload(json!({ "contact_email": inquiry.details.contact_email }))
                .by(actor_id),
        )
        .await?;
        tx.commit().await?;

        info!(
            event_name = "inquiry.created",
            inquiry_id = %inquiry.id,
            event_type = %inquiry.details.event_type,
            "inquiry created"
        );
        Ok(inquiry)
    }

    /// Rewrites contact and event details. Status and assignee are untouched.
    pub async fn update_inquiry(
        &self,
        id: &InquiryId,
        input: InquiryInput,
        actor_id: Option<UserId>,
    ) -> Result<Option<Inquiry>, ApplicationError> {
        let details = input.normalize()?;

        let mut tx = self.store.begin().await?;
        if !tx.update_inquiry_details(id, &details, Utc::now()).await? {
            return Ok(None);
        }
        tx.append_activity(
            NewActivity::new(EntityRef::Inquiry(id.clone()), ActivityType::InquiryUpdated)
                .with_message("Inquiry details updated from management app.")
                .by(actor_id),
        )
        .await?;
        let updated = reload(&mut tx, id).await?;
        tx.commit().await?;

        info!(event_name = "inquiry.updated", inquiry_id = %id, "inquiry details updated");
        Ok(Some(updated))
    }

    pub async fn get_inquiry(&self, id: &InquiryId) -> Result<Option<Inquiry>, ApplicationError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.find_inquiry(id).await?)
    }

    pub async fn list_inquiries(&self) -> Result<Vec<Inquiry>, ApplicationError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.list_inquiries().await?)
    }

    /// Validates and applies a status change, then records it in the activity log. Nothing
    /// is written when the transition is rejected or any step fails.
    pub async fn change_status(
        &self,
        id: &InquiryId,
        to: InquiryStatus,
        change: StatusChange,
    ) -> Result<Option<Inquiry>, ApplicationError> {
        let mut tx = self.store.begin().await?;
        let now = Utc::now();
        // Lock before reading so concurrent changes see either the pre- or post-state.
        if !tx.lock_inquiry(id).await? {
            return Ok(None);
        }
        let current = reload(&mut tx, id).await?;

        if let Err(error) = assert_transition(current.status, to) {
            warn!(
                event_name = "inquiry.transition_rejected",
                inquiry_id = %id,
                from = %current.status,
                to = %to,
                error = %error,
                "inquiry status change rejected"
            );
            return Err(error.into());
        }

        if !tx.update_inquiry_status(id, to, now).await? {
            return Err(missing(id).into());
        }

        let message =
            change.message.unwrap_or_else(|| format!("Status changed to {}", to.humanized()));
        let payload = change
            .payload
            .unwrap_or_else(|| json!({ "from": current.status.as_str(), "to": to.as_str() }));
        tx.append_activity(
            NewActivity::new(EntityRef::Inquiry(id.clone()), ActivityType::StatusChanged)
                .with_message(message)
                .with_payload(payload)
                .by(change.actor_id),
        )
        .await?;

        let updated = reload(&mut tx, id).await?;
        tx.commit().await?;

        info!(
            event_name = "inquiry.status_changed",
            inquiry_id = %id,
            from = %current.status,
            to = %to,
            "inquiry status changed"
        );
        Ok(Some(updated))
    }

    /// Sets or clears the assignee. No status rule applies.
    pub async fn assign(
        &self,
        id: &InquiryId,
        assignee: Option<UserId>,
        actor_id: Option<UserId>,
    ) -> Result<Option<Inquiry>, ApplicationError> {
        let mut tx = self.store.begin().await?;
        if !tx.update_inquiry_assignee(id, assignee.as_ref(), Utc::now()).await? {
            return Ok(None);
        }

        let message = match &assignee {
            Some(user) => format!("Inquiry assigned to {user}."),
            None => "Inquiry unassigned.".to_owned(),
        };
        tx.append_activity(
            NewActivity::new(EntityRef::Inquiry(id.clone()), ActivityType::Assigned)
                .with_message(message)
                .with_payload(json!({
                    "assigned_to": assignee.as_ref().map(|user| user.0.as_str()),
                }))
                .by(actor_id),
        )
        .await?;

        let updated = reload(&mut tx, id).await?;
        tx.commit().await?;

        info!(
            event_name = "inquiry.assigned",
            inquiry_id = %id,
            assigned_to = assignee.as_ref().map(|user| user.0.as_str()).unwrap_or("none"),
            "inquiry assignee changed"
        );
        Ok(Some(updated))
    }

    /// Moves the inquiry to WAITING_ON_CLIENT and records what was asked of the client.
    pub async fn request_more_info(
        &self,
        id: &InquiryId,
        message: &str,
        actor_id: Option<UserId>,
    ) -> Result<Option<Inquiry>, ApplicationError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ValidationError::BlankMessage.into());
        }

        self.change_status(
            id,
            InquiryStatus::WaitingOnClient,
            StatusChange {
                message: Some(format!("{MORE_INFO_PREFIX}{message}")),
                payload: None,
                actor_id,
            },
        )
        .await
    }

    pub async fn valid_transitions_for(
        &self,
        id: &InquiryId,
    ) -> Result<Option<Vec<InquiryStatus>>, ApplicationError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.find_inquiry(id).await?.map(|inquiry| valid_transitions(inquiry.status).to_vec()))
    }

    /// Newest first.
    pub async fn activity_for_inquiry(
        &self,
        id: &InquiryId,
    ) -> Result<Option<Vec<ActivityLog>>, ApplicationError> {
        let mut tx = self.store.begin().await?;
        if tx.find_inquiry(id).await?.is_none() {
            return Ok(None);
        }
        Ok(Some(tx.list_activity(&EntityRef::Inquiry(id.clone())).await?))
    }
}

async fn reload<T: InquiryRepository>(tx: &mut T, id: &InquiryId) -> Result<Inquiry, StorageError> {
    tx.find_inquiry(id).await?.ok_or_else(|| missing(id))
}

fn missing(id: &InquiryId) -> StorageError {
    StorageError::new(format!("inquiry {id} disappeared inside its unit of work"))
}
