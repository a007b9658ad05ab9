use crate::connection::DbPool;
use crate::repositories::RepositoryError;
use sqlx::Executor;

/// Canonical pipeline seeds: one inquiry parked in every status.
const SEED_INQUIRIES: &[SeedInquiryContract] = &[
    SeedInquiryContract {
        inquiry_id: "inquiry-new",
        status: "NEW",
        contact_email: "maya.chen@example.com",
        event_type: "Wedding",
        expected_proposal_count: 0,
        description: "Fresh website lead, unassigned",
    },
    SeedInquiryContract {
        inquiry_id: "inquiry-in-review",
        status: "IN_REVIEW",
        contact_email: "daniel.okafor@example.com",
        event_type: "Corporate Gala",
        expected_proposal_count: 0,
        description: "Referral under review by a planner",
    },
    SeedInquiryContract {
        inquiry_id: "inquiry-waiting-on-client",
        status: "WAITING_ON_CLIENT",
        contact_email: "priya.raman@example.com",
        event_type: "Birthday",
        expected_proposal_count: 0,
        description: "Planner asked the client for details",
    },
    SeedInquiryContract {
        inquiry_id: "inquiry-quoting",
        status: "QUOTING",
        contact_email: "lucas.moreau@example.com",
        event_type: "Anniversary",
        expected_proposal_count: 1,
        description: "Draft proposal in progress",
    },
    SeedInquiryContract {
        inquiry_id: "inquiry-quoted-waiting",
        status: "QUOTED_WAITING",
        contact_email: "sofia.alvarez@example.com",
        event_type: "Wedding",
        expected_proposal_count: 1,
        description: "Two-package proposal sent to the client",
    },
    SeedInquiryContract {
        inquiry_id: "inquiry-accepted-not-booked",
        status: "ACCEPTED_NOT_BOOKED",
        contact_email: "hannah.becker@example.com",
        event_type: "Bar Mitzvah",
        expected_proposal_count: 1,
        description: "Package accepted, deposit outstanding",
    },
    SeedInquiryContract {
        inquiry_id: "inquiry-booked",
        status: "BOOKED",
        contact_email: "marcus.reed@example.com",
        event_type: "Wedding",
        expected_proposal_count: 1,
        description: "Accepted and booked",
    },
    SeedInquiryContract {
        inquiry_id: "inquiry-lost",
        status: "LOST",
        contact_email: "elena.petrova@example.com",
        event_type: "Engagement Party",
        expected_proposal_count: 0,
        description: "Client went with another studio",
    },
    SeedInquiryContract {
        inquiry_id: "inquiry-disqualified",
        status: "DISQUALIFIED",
        contact_email: "tom.gallagher@example.com",
        event_type: "Product Launch",
        expected_proposal_count: 0,
        description: "Budget below studio minimum",
    },
    SeedInquiryContract {
        inquiry_id: "inquiry-expired",
        status: "EXPIRED",
        contact_email: "aiko.tanaka@example.com",
        event_type: "Baby Shower",
        expected_proposal_count: 0,
        description: "No response before the event date",
    },
];

const SEED_PROPOSALS: &[SeedProposalContract] = &[
    SeedProposalContract {
        proposal_id: "proposal-quoting-v1",
        inquiry_id: "inquiry-quoting",
        version: 1,
        status: "DRAFT",
        package_subtotals_cents: &[282_000],
        accepted_package_id: None,
    },
    SeedProposalContract {
        proposal_id: "proposal-quoted-waiting-v1",
        inquiry_id: "inquiry-quoted-waiting",
        version: 1,
        status: "SENT",
        package_subtotals_cents: &[125_000, 317_500],
        accepted_package_id: None,
    },
    SeedProposalContract {
        proposal_id: "proposal-accepted-not-booked-v1",
        inquiry_id: "inquiry-accepted-not-booked",
        version: 1,
        status: "ACCEPTED",
        package_subtotals_cents: &[310_000],
        accepted_package_id: Some("package-accepted-not-booked-v1-full"),
    },
    SeedProposalContract {
        proposal_id: "proposal-booked-v1",
        inquiry_id: "inquiry-booked",
        version: 1,
        status: "ACCEPTED",
        package_subtotals_cents: &[485_000],
        accepted_package_id: Some("package-booked-v1-garden"),
    },
];

/// Deterministic dataset covering every inquiry status, used by `atelier seed` and by
/// tests that need a populated pipeline.
pub struct PipelineSeedDataset;

impl PipelineSeedDataset {
    /// SQL fixture content for the pipeline seed.
    pub const SQL: &'static str = include_str!("../../../config/fixtures/seed_data.sql");

    /// Load the seed dataset. Rows that already exist are left untouched.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let inquiries_seeded = SEED_INQUIRIES
            .iter()
            .map(|inquiry| InquirySeedInfo {
                inquiry_id: inquiry.inquiry_id,
                status: inquiry.status,
                description: inquiry.description,
            })
            .collect::<Vec<_>>();

        Ok(SeedResult { inquiries_seeded, proposals_seeded: SEED_PROPOSALS.len() })
    }

    /// Verify that seed data exists and matches the contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for inquiry in SEED_INQUIRIES {
            let inquiry_ok: i64 = sqlx::query_scalar(
                "SELECT EXISTS(
                    SELECT 1 FROM inquiry
                    WHERE id = ?1 AND status = ?2 AND contact_email = ?3 AND event_type = ?4
                 )",
            )
            .bind(inquiry.inquiry_id)
            .bind(inquiry.status)
            .bind(inquiry.contact_email)
            .bind(inquiry.event_type)
            .fetch_one(pool)
            .await?;
            checks.push((inquiry.inquiry_id.to_string(), inquiry_ok == 1));

            let proposal_count: i64 =
                sqlx::query_scalar("SELECT COUNT(1) FROM proposal WHERE inquiry_id = ?1")
                    .bind(inquiry.inquiry_id)
                    .fetch_one(pool)
                    .await?;
            checks.push((
                format!("{}-proposal-count", inquiry.inquiry_id),
                proposal_count == inquiry.expected_proposal_count,
            ));

            let created_logged: i64 = sqlx::query_scalar(
                "SELECT EXISTS(
                    SELECT 1 FROM activity_log
                    WHERE entity_kind = 'inquiry' AND entity_id = ?1
                      AND activity_type = 'INQUIRY_CREATED'
                 )",
            )
            .bind(inquiry.inquiry_id)
            .fetch_one(pool)
            .await?;
            checks.push((format!("{}-created-activity", inquiry.inquiry_id), created_logged == 1));
        }

        for proposal in SEED_PROPOSALS {
            let header_ok: i64 = sqlx::query_scalar(
                "SELECT EXISTS(
                    SELECT 1 FROM proposal
                    WHERE id = ?1 AND inquiry_id = ?2 AND version = ?3 AND status = ?4
                      AND accepted_package_id IS ?5
                 )",
            )
            .bind(proposal.proposal_id)
            .bind(proposal.inquiry_id)
            .bind(proposal.version)
            .bind(proposal.status)
            .bind(proposal.accepted_package_id)
            .fetch_one(pool)
            .await?;
            checks.push((proposal.proposal_id.to_string(), header_ok == 1));

            checks.push((
                format!("{}-subtotals", proposal.proposal_id),
                Self::verify_subtotals(pool, proposal).await?,
            ));
        }

        let all_present = checks.iter().all(|(_, present)| *present);
        Ok(VerificationResult { all_present, checks })
    }

    /// Stored package subtotals must match the contract and the sum of their line items.
    async fn verify_subtotals(
        pool: &DbPool,
        proposal: &SeedProposalContract,
    ) -> Result<bool, RepositoryError> {
        let rows = sqlx::query_as::<_, (i64, i64)>(
            "SELECT p.subtotal_cents, COALESCE(SUM(i.total_cents), 0)
             FROM proposal_package p
             LEFT JOIN proposal_line_item i ON i.package_id = p.id
             WHERE p.proposal_id = ?1
             GROUP BY p.id, p.position, p.subtotal_cents
             ORDER BY p.position",
        )
        .bind(proposal.proposal_id)
        .fetch_all(pool)
        .await?;

        let stored = rows.iter().map(|(subtotal, _)| *subtotal).collect::<Vec<_>>();
        let items_match = rows.iter().all(|(subtotal, item_sum)| subtotal == item_sum);
        Ok(items_match && stored == proposal.package_subtotals_cents)
    }

    /// Remove seeded fixtures from a test database.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let quoted_inquiries =
            sql_array_from_ids(SEED_INQUIRIES.iter().map(|inquiry| inquiry.inquiry_id));
        let quoted_proposals =
            sql_array_from_ids(SEED_PROPOSALS.iter().map(|proposal| proposal.proposal_id));

        sqlx::query(&format!(
            "DELETE FROM activity_log
             WHERE (entity_kind = 'inquiry' AND entity_id IN {quoted_inquiries})
                OR (entity_kind = 'proposal' AND entity_id IN {quoted_proposals})"
        ))
        .execute(&mut *tx)
        .await?;
        // Packages and line items go with their proposal.
        sqlx::query(&format!("DELETE FROM proposal WHERE id IN {quoted_proposals}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM inquiry WHERE id IN {quoted_inquiries}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedInquiryContract {
    inquiry_id: &'static str,
    status: &'static str,
    contact_email: &'static str,
    event_type: &'static str,
    expected_proposal_count: i64,
    description: &'static str,
}

#[derive(Debug, Clone, Copy)]
struct SeedProposalContract {
    proposal_id: &'static str,
    inquiry_id: &'static str,
    version: i64,
    status: &'static str,
    package_subtotals_cents: &'static [i64],
    accepted_package_id: Option<&'static str>,
}

fn sql_array_from_ids<'a>(ids: impl Iterator<Item = &'a str>) -> String {
    let quoted = ids.map(|id| format!("'{}'", id)).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}

#[derive(Debug)]
pub struct SeedResult {
    pub inquiries_seeded: Vec<InquirySeedInfo>,
    pub proposals_seeded: usize,
}

#[derive(Debug)]
pub struct InquirySeedInfo {
    pub inquiry_id: &'static str,
    pub status: &'static str,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(String, bool)>,
}
