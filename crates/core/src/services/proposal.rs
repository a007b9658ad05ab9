use chrono::{Duration, Utc};
use serde_json::json;
use tracing::info;

use crate::config::ProposalsConfig;
use crate::domain::activity::{ActivityLog, ActivityType, EntityRef, NewActivity};
use crate::domain::inquiry::InquiryId;
use crate::domain::proposal::{
    LineItem, LineItemId, PackageId, PackageInput, Proposal, ProposalDraft, ProposalId,
    ProposalPackage, ProposalStatus,
};
use crate::domain::user::UserId;
use crate::errors::{ApplicationError, PricingError, StorageError, ValidationError};
use crate::pricing::{line_total, package_subtotal};
use crate::store::{ActivitySink, InquiryRepository, ProposalRepository, Store, UnitOfWork};

pub const MIN_EXPIRY_DAYS: i64 = 1;
pub const MAX_EXPIRY_DAYS: i64 = 365;

/// Versioned proposals for an inquiry. Proposal contents are fixed at creation; only the
/// status, send time and accepted package change afterwards.
#[derive(Clone, Debug)]
pub struct ProposalService<S> {
    store: S,
    defaults: ProposalsConfig,
}

impl<S: Store> ProposalService<S> {
    pub fn new(store: S, defaults: ProposalsConfig) -> Self {
        Self { store, defaults }
    }

    /// Validates and prices the draft, then stores it as the next version for the inquiry.
    /// Returns `Ok(None)` when the inquiry does not exist.
    pub async fn create_proposal(
        &self,
        inquiry_id: &InquiryId,
        draft: ProposalDraft,
        actor_id: Option<UserId>,
    ) -> Result<Option<Proposal>, ApplicationError> {
        let expires_in_days =
            draft.expires_in_days.unwrap_or(i64::from(self.defaults.default_expiry_days));
        if !(MIN_EXPIRY_DAYS..=MAX_EXPIRY_DAYS).contains(&expires_in_days) {
            return Err(ValidationError::ExpiryOutOfRange { days: expires_in_days }.into());
        }
        let packages = build_packages(draft.packages, &self.defaults.default_currency)?;

        let mut tx = self.store.begin().await?;
        let now = Utc::now();
        // Version assignment below must not interleave with another creation for this inquiry.
        if !tx.lock_inquiry(inquiry_id).await? {
            return Ok(None);
        }
        let version = tx.max_proposal_version(inquiry_id).await?.unwrap_or(0) + 1;

        let proposal = Proposal {
            id: ProposalId::generate(),
            inquiry_id: inquiry_id.clone(),
            version,
            status: ProposalStatus::Draft,
            expires_at: Some(now + Duration::days(expires_in_days)),
            sent_at: None,
            accepted_package_id: None,
            packages,
            created_at: now,
            updated_at: now,
        };
        tx.insert_proposal(&proposal).await?;
        tx.append_activity(
            NewActivity::new(
                EntityRef::Proposal(proposal.id.clone()),
                ActivityType::ProposalCreated,
            )
            .with_message(format!("Proposal v{version} created as draft."))
            .with_payload(json!({
                "inquiry_id": inquiry_id.0,
                "version": version,
                "package_count": proposal.packages.len(),
            }))
            .by(actor_id),
        )
        .await?;

        let stored = reload(&mut tx, &proposal.id).await?;
        tx.commit().await?;

        info!(
            event_name = "proposal.created",
            proposal_id = %stored.id,
            inquiry_id = %inquiry_id,
            version,
            "proposal created"
        );
        Ok(Some(stored))
    }

    pub async fn mark_as_sent(
        &self,
        id: &ProposalId,
        actor_id: Option<UserId>,
    ) -> Result<Option<Proposal>, ApplicationError> {
        let mut tx = self.store.begin().await?;
        let Some(mut proposal) = tx.find_proposal(id).await? else {
            return Ok(None);
        };

        let now = Utc::now();
        proposal.status = ProposalStatus::Sent;
        proposal.sent_at = Some(now);
        proposal.updated_at = now;
        if !tx.update_proposal_state(&proposal).await? {
            return Err(missing(id).into());
        }
        tx.append_activity(
            NewActivity::new(EntityRef::Proposal(id.clone()), ActivityType::ProposalSent)
                .with_message(format!("Proposal v{} marked as sent.", proposal.version))
                .with_payload(json!({ "inquiry_id": proposal.inquiry_id.0 }))
                .by(actor_id),
        )
        .await?;

        let stored = reload(&mut tx, id).await?;
        tx.commit().await?;

        info!(
            event_name = "proposal.sent",
            proposal_id = %id,
            inquiry_id = %stored.inquiry_id,
            version = stored.version,
            "proposal marked as sent"
        );
        Ok(Some(stored))
    }

    /// Records the package the client chose and marks the proposal accepted.
    pub async fn accept_package(
        &self,
        id: &ProposalId,
        package_id: &PackageId,
        actor_id: Option<UserId>,
    ) -> Result<Option<Proposal>, ApplicationError> {
        let mut tx = self.store.begin().await?;
        let Some(mut proposal) = tx.find_proposal(id).await? else {
            return Ok(None);
        };

        let Some(package) = proposal.package(package_id) else {
            return Err(ValidationError::UnknownPackage {
                proposal_id: id.0.clone(),
                package_id: package_id.0.clone(),
            }
            .into());
        };
        let message =
            format!("Proposal v{}: package \"{}\" accepted.", proposal.version, package.name);
        let payload = json!({
            "inquiry_id": proposal.inquiry_id.0,
            "package_id": package_id.0,
            "subtotal_cents": package.subtotal_cents,
        });

        proposal.status = ProposalStatus::Accepted;
        proposal.accepted_package_id = Some(package_id.clone());
        proposal.updated_at = Utc::now();
        if !tx.update_proposal_state(&proposal).await? {
            return Err(missing(id).into());
        }
        tx.append_activity(
            NewActivity::new(EntityRef::Proposal(id.clone()), ActivityType::ProposalAccepted)
                .with_message(message)
                .with_payload(payload)
                .by(actor_id),
        )
        .await?;

        let stored = reload(&mut tx, id).await?;
        tx.commit().await?;

        info!(
            event_name = "proposal.accepted",
            proposal_id = %id,
            package_id = %package_id,
            "proposal package accepted"
        );
        Ok(Some(stored))
    }

    pub async fn get_proposal(
        &self,
        id: &ProposalId,
    ) -> Result<Option<Proposal>, ApplicationError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.find_proposal(id).await?)
    }

    /// Highest version first; `None` when the inquiry does not exist.
    pub async fn proposals_for_inquiry(
        &self,
        inquiry_id: &InquiryId,
    ) -> Result<Option<Vec<Proposal>>, ApplicationError> {
        let mut tx = self.store.begin().await?;
        if tx.find_inquiry(inquiry_id).await?.is_none() {
            return Ok(None);
        }
        Ok(Some(tx.list_proposals(inquiry_id).await?))
    }

    pub async fn activity_for_proposal(
        &self,
        id: &ProposalId,
    ) -> Result<Option<Vec<ActivityLog>>, ApplicationError> {
        let mut tx = self.store.begin().await?;
        if tx.find_proposal(id).await?.is_none() {
            return Ok(None);
        }
        Ok(Some(tx.list_activity(&EntityRef::Proposal(id.clone())).await?))
    }
}

/// Checks every package and item, then prices them. Fails on the first offending entry so
/// nothing is created from a partially valid draft.
fn build_packages(
    inputs: Vec<PackageInput>,
    default_currency: &str,
) -> Result<Vec<ProposalPackage>, ApplicationError> {
    if inputs.is_empty() {
        return Err(ValidationError::NoPackages.into());
    }

    let mut packages = Vec::with_capacity(inputs.len());
    for (package_index, input) in inputs.into_iter().enumerate() {
        let name = input.name.trim().to_owned();
        if name.is_empty() {
            return Err(ValidationError::BlankPackageName { package: package_index }.into());
        }
        if input.items.is_empty() {
            return Err(ValidationError::EmptyPackage { package: package_index, name }.into());
        }

        let currency = input
            .currency
            .map(|code| code.trim().to_owned())
            .filter(|code| !code.is_empty())
            .unwrap_or_else(|| default_currency.to_owned());
        if !is_currency_code(&currency) {
            return Err(
                ValidationError::InvalidCurrency { package: package_index, name, currency }.into()
            );
        }

        let mut items = Vec::with_capacity(input.items.len());
        for (item_index, item) in input.items.into_iter().enumerate() {
            let title = item.title.trim().to_owned();
            if title.is_empty() {
                return Err(ValidationError::BlankItemTitle {
                    package: package_index,
                    name,
                    item: item_index,
                }
                .into());
            }
            if item.quantity < 1 {
                return Err(ValidationError::InvalidQuantity {
                    package: package_index,
                    name,
                    item: item_index,
                    title,
                    quantity: item.quantity,
                }
                .into());
            }
            if item.unit_cents < 0 {
                return Err(ValidationError::NegativeUnitPrice {
                    package: package_index,
                    name,
                    item: item_index,
                    title,
                    unit_cents: item.unit_cents,
                }
                .into());
            }

            let Ok(total_cents) = line_total(item.quantity, item.unit_cents) else {
                return Err(ValidationError::ItemTotalOverflow {
                    package: package_index,
                    name,
                    item: item_index,
                    title,
                }
                .into());
            };
            items.push(LineItem {
                id: LineItemId::generate(),
                title,
                description: trimmed(item.description),
                quantity: item.quantity,
                unit_cents: item.unit_cents,
                total_cents,
                sort_order: u32::try_from(item_index).map_err(|_| PricingError::Overflow)?,
            });
        }

        let Ok(subtotal_cents) = package_subtotal(&items) else {
            return Err(
                ValidationError::PackageTotalOverflow { package: package_index, name }.into()
            );
        };
        packages.push(ProposalPackage {
            id: PackageId::generate(),
            subtotal_cents,
            name,
            description: trimmed(input.description),
            currency,
            items,
        });
    }
    Ok(packages)
}

pub(crate) fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|byte| byte.is_ascii_uppercase())
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|value| value.trim().to_owned()).filter(|value| !value.is_empty())
}

async fn reload<T: ProposalRepository>(
    tx: &mut T,
    id: &ProposalId,
) -> Result<Proposal, StorageError> {
    tx.find_proposal(id).await?.ok_or_else(|| missing(id))
}

fn missing(id: &ProposalId) -> StorageError {
    StorageError::new(format!("proposal {id} disappeared inside its unit of work"))
}
