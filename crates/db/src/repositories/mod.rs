//! SQLite implementation of the persistence port. One [`SqlUnitOfWork`] wraps one sqlx
//! transaction; dropping it without `commit` rolls the transaction back.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::{Sqlite, Transaction};
use thiserror::Error;

use atelier_core::domain::activity::{ActivityLog, ActivityLogId, EntityRef, NewActivity};
use atelier_core::domain::inquiry::{Inquiry, InquiryDetails, InquiryId, InquiryStatus};
use atelier_core::domain::proposal::{Proposal, ProposalId};
use atelier_core::domain::user::UserId;
use atelier_core::errors::StorageError;
use atelier_core::store::{ActivitySink, InquiryRepository, ProposalRepository, Store, UnitOfWork};

use crate::DbPool;

pub mod activity;
pub mod inquiry;
pub mod proposal;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for StorageError {
    fn from(value: RepositoryError) -> Self {
        StorageError::new(value.to_string())
    }
}

#[derive(Clone, Debug)]
pub struct SqlStore {
    pool: DbPool,
}

impl SqlStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl Store for SqlStore {
    type Tx = SqlUnitOfWork;

    async fn begin(&self) -> Result<Self::Tx, StorageError> {
        let tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        Ok(SqlUnitOfWork { tx })
    }
}

pub struct SqlUnitOfWork {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl InquiryRepository for SqlUnitOfWork {
    async fn find_inquiry(&mut self, id: &InquiryId) -> Result<Option<Inquiry>, StorageError> {
        Ok(inquiry::find(&mut self.tx, id).await?)
    }

    async fn list_inquiries(&mut self) -> Result<Vec<Inquiry>, StorageError> {
        Ok(inquiry::list(&mut self.tx).await?)
    }

    async fn insert_inquiry(&mut self, value: &Inquiry) -> Result<(), StorageError> {
        Ok(inquiry::insert(&mut self.tx, value).await?)
    }

    async fn update_inquiry_details(
        &mut self,
        id: &InquiryId,
        details: &InquiryDetails,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        Ok(inquiry::update_details(&mut self.tx, id, details, updated_at).await?)
    }

    async fn update_inquiry_status(
        &mut self,
        id: &InquiryId,
        status: InquiryStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        Ok(inquiry::update_status(&mut self.tx, id, status, updated_at).await?)
    }

    async fn update_inquiry_assignee(
        &mut self,
        id: &InquiryId,
        assignee: Option<&UserId>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        Ok(inquiry::update_assignee(&mut self.tx, id, assignee, updated_at).await?)
    }

    async fn lock_inquiry(&mut self, id: &InquiryId) -> Result<bool, StorageError> {
        Ok(inquiry::lock(&mut self.tx, id).await?)
    }
}

#[async_trait]
impl ProposalRepository for SqlUnitOfWork {
    async fn max_proposal_version(
        &mut self,
        inquiry_id: &InquiryId,
    ) -> Result<Option<u32>, StorageError> {
        Ok(proposal::max_version(&mut self.tx, inquiry_id).await?)
    }

    async fn insert_proposal(&mut self, value: &Proposal) -> Result<(), StorageError> {
        Ok(proposal::insert(&mut self.tx, value).await?)
    }

    async fn find_proposal(&mut self, id: &ProposalId) -> Result<Option<Proposal>, StorageError> {
        Ok(proposal::find(&mut self.tx, id).await?)
    }

    async fn list_proposals(
        &mut self,
        inquiry_id: &InquiryId,
    ) -> Result<Vec<Proposal>, StorageError> {
        Ok(proposal::list_for_inquiry(&mut self.tx, inquiry_id).await?)
    }

    async fn update_proposal_state(&mut self, value: &Proposal) -> Result<bool, StorageError> {
        Ok(proposal::update_state(&mut self.tx, value).await?)
    }
}

#[async_trait]
impl ActivitySink for SqlUnitOfWork {
    async fn append_activity(&mut self, entry: NewActivity) -> Result<ActivityLogId, StorageError> {
        Ok(activity::append(&mut self.tx, entry).await?)
    }

    async fn list_activity(
        &mut self,
        entity: &EntityRef,
    ) -> Result<Vec<ActivityLog>, StorageError> {
        Ok(activity::list_for_entity(&mut self.tx, entity).await?)
    }
}

#[async_trait]
impl UnitOfWork for SqlUnitOfWork {
    async fn commit(self) -> Result<(), StorageError> {
        self.tx.commit().await.map_err(RepositoryError::from)?;
        Ok(())
    }
}

/// Fixed-width RFC3339 so stored timestamps sort lexically.
pub(crate) fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_rfc3339(field: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value).map(|ts| ts.with_timezone(&Utc)).map_err(|err| {
        RepositoryError::Decode(format!("invalid {} timestamp '{}': {}", field, value, err))
    })
}

pub(crate) fn parse_date(field: &str, value: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|err| {
        RepositoryError::Decode(format!("invalid {} date '{}': {}", field, value, err))
    })
}

pub(crate) fn non_negative_u32(field: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::Decode(format!("{field} out of range: {value}")))
}
