use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::inquiry::InquiryId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProposalId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineItemId(pub String);

impl ProposalId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl PackageId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl LineItemId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    Draft,
    Sent,
    NeedsChanges,
    Accepted,
    Rejected,
    Expired,
    Superseded,
}

impl ProposalStatus {
    pub const ALL: [ProposalStatus; 7] = [
        Self::Draft,
        Self::Sent,
        Self::NeedsChanges,
        Self::Accepted,
        Self::Rejected,
        Self::Expired,
        Self::Superseded,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Sent => "SENT",
            Self::NeedsChanges => "NEEDS_CHANGES",
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
            Self::Expired => "EXPIRED",
            Self::Superseded => "SUPERSEDED",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Sent => "Sent",
            Self::NeedsChanges => "Needs Changes",
            Self::Accepted => "Accepted",
            Self::Rejected => "Rejected",
            Self::Expired => "Expired",
            Self::Superseded => "Superseded",
        }
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown proposal status `{0}`")]
pub struct UnknownProposalStatus(pub String);

impl FromStr for ProposalStatus {
    type Err = UnknownProposalStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| UnknownProposalStatus(value.to_owned()))
    }
}

/// One billable row. `total_cents == quantity * unit_cents`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub title: String,
    pub description: Option<String>,
    pub quantity: i64,
    pub unit_cents: i64,
    pub total_cents: i64,
    pub sort_order: u32,
}

/// One pricing option of a proposal. `subtotal_cents` is the sum of the item totals and is
/// stored when the package is created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalPackage {
    pub id: PackageId,
    pub name: String,
    pub description: Option<String>,
    pub currency: String,
    pub subtotal_cents: i64,
    pub items: Vec<LineItem>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub inquiry_id: InquiryId,
    pub version: u32,
    pub status: ProposalStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub accepted_package_id: Option<PackageId>,
    pub packages: Vec<ProposalPackage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Proposal {
    pub fn package(&self, id: &PackageId) -> Option<&ProposalPackage> {
        self.packages.iter().find(|package| &package.id == id)
    }

    pub fn accepted_package(&self) -> Option<&ProposalPackage> {
        self.accepted_package_id.as_ref().and_then(|id| self.package(id))
    }

    /// Amount the client owes: the accepted package, or the only package when there is a
    /// single option. Alternatives are never summed together.
    pub fn amount_due(&self) -> Option<i64> {
        if let Some(package) = self.accepted_package() {
            return Some(package.subtotal_cents);
        }
        match self.packages.as_slice() {
            [only] => Some(only.subtotal_cents),
            _ => None,
        }
    }
}

/// Caller-submitted proposal contents. Nothing here is trusted until validated.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalDraft {
    pub packages: Vec<PackageInput>,
    #[serde(default)]
    pub expires_in_days: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub items: Vec<LineItemInput>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub quantity: i64,
    pub unit_cents: i64,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{
        LineItem, LineItemId, PackageId, Proposal, ProposalDraft, ProposalId, ProposalPackage,
        ProposalStatus,
    };
    use crate::domain::inquiry::InquiryId;

    fn package(id: &str, subtotal_cents: i64) -> ProposalPackage {
        ProposalPackage {
            id: PackageId(id.to_owned()),
            name: id.to_owned(),
            description: None,
            currency: "USD".to_owned(),
            subtotal_cents,
            items: vec![LineItem {
                id: LineItemId(format!("{id}-item")),
                title: "Centerpieces".to_owned(),
                description: None,
                quantity: 1,
                unit_cents: subtotal_cents,
                total_cents: subtotal_cents,
                sort_order: 0,
            }],
        }
    }

    fn proposal(packages: Vec<ProposalPackage>) -> Proposal {
        let now = Utc::now();
        Proposal {
            id: ProposalId("P-1".to_owned()),
            inquiry_id: InquiryId("I-1".to_owned()),
            version: 1,
            status: ProposalStatus::Draft,
            expires_at: None,
            sent_at: None,
            accepted_package_id: None,
            packages,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn single_package_is_the_amount_due() {
        assert_eq!(proposal(vec![package("standard", 20_000)]).amount_due(), Some(20_000));
    }

    #[test]
    fn alternatives_are_not_summed_until_one_is_accepted() {
        let mut proposal = proposal(vec![package("standard", 20_000), package("premium", 35_000)]);
        assert_eq!(proposal.amount_due(), None);

        proposal.accepted_package_id = Some(PackageId("premium".to_owned()));
        assert_eq!(proposal.amount_due(), Some(35_000));
    }

    #[test]
    fn status_parses_from_wire_name() {
        for status in ProposalStatus::ALL {
            assert_eq!(status.as_str().parse::<ProposalStatus>(), Ok(status));
        }
        assert_eq!(ProposalStatus::NeedsChanges.label(), "Needs Changes");
    }

    #[test]
    fn draft_deserializes_with_optional_fields_absent() {
        let draft: ProposalDraft = serde_json::from_str(
            r#"{"packages":[{"name":"Standard",
                "items":[{"title":"Arch","quantity":1,"unit_cents":50000}]}]}"#,
        )
        .expect("parse draft");

        assert_eq!(draft.expires_in_days, None);
        assert_eq!(draft.packages[0].currency, None);
        assert_eq!(draft.packages[0].items[0].unit_cents, 50_000);
    }
}
