use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use atelier_core::domain::inquiry::InquiryId;
use atelier_core::domain::proposal::{
    LineItem, LineItemId, PackageId, Proposal, ProposalId, ProposalPackage, ProposalStatus,
};

use super::{non_negative_u32, parse_rfc3339, timestamp, RepositoryError};

const SELECT_PROPOSAL: &str = "SELECT id, inquiry_id, version, status, expires_at, sent_at,
        accepted_package_id, created_at, updated_at
     FROM proposal";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposalRecord {
    pub id: String,
    pub inquiry_id: String,
    pub version: i64,
    pub status: String,
    pub expires_at: Option<String>,
    pub sent_at: Option<String>,
    pub accepted_package_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ProposalRecord {
    fn into_proposal(self, packages: Vec<ProposalPackage>) -> Result<Proposal, RepositoryError> {
        let status = self.status.parse::<ProposalStatus>().map_err(|_| {
            RepositoryError::Decode(format!("invalid proposal status: {}", self.status))
        })?;

        Ok(Proposal {
            id: ProposalId(self.id),
            inquiry_id: InquiryId(self.inquiry_id),
            version: non_negative_u32("proposal version", self.version)?,
            status,
            expires_at: self
                .expires_at
                .as_deref()
                .map(|ts| parse_rfc3339("proposal expires_at", ts))
                .transpose()?,
            sent_at: self
                .sent_at
                .as_deref()
                .map(|ts| parse_rfc3339("proposal sent_at", ts))
                .transpose()?,
            accepted_package_id: self.accepted_package_id.map(PackageId),
            packages,
            created_at: parse_rfc3339("proposal created_at", &self.created_at)?,
            updated_at: parse_rfc3339("proposal updated_at", &self.updated_at)?,
        })
    }
}

fn proposal_record_from_row(row: &SqliteRow) -> Result<ProposalRecord, RepositoryError> {
    Ok(ProposalRecord {
        id: row.try_get("id")?,
        inquiry_id: row.try_get("inquiry_id")?,
        version: row.try_get("version")?,
        status: row.try_get("status")?,
        expires_at: row.try_get("expires_at")?,
        sent_at: row.try_get("sent_at")?,
        accepted_package_id: row.try_get("accepted_package_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn line_item_from_row(row: &SqliteRow) -> Result<LineItem, RepositoryError> {
    Ok(LineItem {
        id: LineItemId(row.try_get("id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        quantity: row.try_get("quantity")?,
        unit_cents: row.try_get("unit_cents")?,
        total_cents: row.try_get("total_cents")?,
        sort_order: non_negative_u32("line item sort_order", row.try_get("sort_order")?)?,
    })
}

/// Packages in submission order, each with its items in sort order.
async fn load_packages(
    conn: &mut SqliteConnection,
    proposal_id: &str,
) -> Result<Vec<ProposalPackage>, RepositoryError> {
    let package_rows = sqlx::query(
        "SELECT id, name, description, currency, subtotal_cents
         FROM proposal_package
         WHERE proposal_id = ?
         ORDER BY position ASC",
    )
    .bind(proposal_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut packages = Vec::with_capacity(package_rows.len());
    for row in &package_rows {
        let id: String = row.try_get("id")?;
        let item_rows = sqlx::query(
            "SELECT id, title, description, quantity, unit_cents, total_cents, sort_order
             FROM proposal_line_item
             WHERE package_id = ?
             ORDER BY sort_order ASC",
        )
        .bind(&id)
        .fetch_all(&mut *conn)
        .await?;

        packages.push(ProposalPackage {
            id: PackageId(id),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            currency: row.try_get("currency")?,
            subtotal_cents: row.try_get("subtotal_cents")?,
            items: item_rows.iter().map(line_item_from_row).collect::<Result<_, _>>()?,
        });
    }

    Ok(packages)
}

async fn hydrate(
    conn: &mut SqliteConnection,
    record: ProposalRecord,
) -> Result<Proposal, RepositoryError> {
    let packages = load_packages(conn, &record.id).await?;
    record.into_proposal(packages)
}

pub(crate) async fn max_version(
    conn: &mut SqliteConnection,
    inquiry_id: &InquiryId,
) -> Result<Option<u32>, RepositoryError> {
    let max: Option<i64> =
        sqlx::query_scalar("SELECT MAX(version) FROM proposal WHERE inquiry_id = ?")
            .bind(&inquiry_id.0)
            .fetch_one(&mut *conn)
            .await?;

    max.map(|version| non_negative_u32("proposal version", version)).transpose()
}

pub(crate) async fn insert(
    conn: &mut SqliteConnection,
    proposal: &Proposal,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO proposal (
            id, inquiry_id, version, status, expires_at, sent_at, accepted_package_id,
            created_at, updated_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&proposal.id.0)
    .bind(&proposal.inquiry_id.0)
    .bind(i64::from(proposal.version))
    .bind(proposal.status.as_str())
    .bind(proposal.expires_at.map(timestamp))
    .bind(proposal.sent_at.map(timestamp))
    .bind(proposal.accepted_package_id.as_ref().map(|id| id.0.as_str()))
    .bind(timestamp(proposal.created_at))
    .bind(timestamp(proposal.updated_at))
    .execute(&mut *conn)
    .await?;

    for (position, package) in proposal.packages.iter().enumerate() {
        sqlx::query(
            "INSERT INTO proposal_package (
                id, proposal_id, position, name, description, currency, subtotal_cents
             ) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&package.id.0)
        .bind(&proposal.id.0)
        .bind(position as i64)
        .bind(&package.name)
        .bind(&package.description)
        .bind(&package.currency)
        .bind(package.subtotal_cents)
        .execute(&mut *conn)
        .await?;

        for item in &package.items {
            sqlx::query(
                "INSERT INTO proposal_line_item (
                    id, package_id, title, description, quantity, unit_cents, total_cents,
                    sort_order
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&item.id.0)
            .bind(&package.id.0)
            .bind(&item.title)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.unit_cents)
            .bind(item.total_cents)
            .bind(i64::from(item.sort_order))
            .execute(&mut *conn)
            .await?;
        }
    }

    Ok(())
}

pub(crate) async fn find(
    conn: &mut SqliteConnection,
    id: &ProposalId,
) -> Result<Option<Proposal>, RepositoryError> {
    let row = sqlx::query(&format!("{SELECT_PROPOSAL} WHERE id = ?"))
        .bind(&id.0)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => {
            let record = proposal_record_from_row(&row)?;
            Ok(Some(hydrate(conn, record).await?))
        }
        None => Ok(None),
    }
}

pub(crate) async fn list_for_inquiry(
    conn: &mut SqliteConnection,
    inquiry_id: &InquiryId,
) -> Result<Vec<Proposal>, RepositoryError> {
    let rows = sqlx::query(&format!("{SELECT_PROPOSAL} WHERE inquiry_id = ? ORDER BY version DESC"))
        .bind(&inquiry_id.0)
        .fetch_all(&mut *conn)
        .await?;
    let records = rows.iter().map(proposal_record_from_row).collect::<Result<Vec<_>, _>>()?;

    let mut proposals = Vec::with_capacity(records.len());
    for record in records {
        proposals.push(hydrate(conn, record).await?);
    }
    Ok(proposals)
}

pub(crate) async fn update_state(
    conn: &mut SqliteConnection,
    proposal: &Proposal,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        "UPDATE proposal
         SET status = ?, sent_at = ?, accepted_package_id = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(proposal.status.as_str())
    .bind(proposal.sent_at.map(timestamp))
    .bind(proposal.accepted_package_id.as_ref().map(|id| id.0.as_str()))
    .bind(timestamp(proposal.updated_at))
    .bind(&proposal.id.0)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}
