use serde::Deserialize;
use std::collections::HashSet;

type SeedContractTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
    ($left:expr, $right:expr, $($arg:tt)*) => {
        if $left != $right {
            return Err(format!($($arg)*));
        }
    };
}

const STATUSES: [&str; 10] = [
    "NEW",
    "IN_REVIEW",
    "WAITING_ON_CLIENT",
    "QUOTING",
    "QUOTED_WAITING",
    "ACCEPTED_NOT_BOOKED",
    "BOOKED",
    "LOST",
    "DISQUALIFIED",
    "EXPIRED",
];

#[derive(Debug, Deserialize)]
struct SeedInquiry {
    inquiry_id: String,
    status: String,
    contact_email: String,
    event_type: String,
    expected_proposal_count: usize,
    description: String,
}

#[derive(Debug, Deserialize)]
struct SeedProposal {
    proposal_id: String,
    inquiry_id: String,
    version: u32,
    status: String,
    package_subtotals_cents: Vec<i64>,
    accepted_package_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeedContract {
    dataset_version: String,
    seed_dataset: String,
    inquiries: Vec<SeedInquiry>,
    proposals: Vec<SeedProposal>,
}

fn load_contract() -> SeedContractTestResult<SeedContract> {
    serde_json::from_str(include_str!("../../../config/fixtures/seed_contract.json"))
        .map_err(|error| format!("seed contract JSON must parse: {error}"))
}

#[test]
fn seed_contract_matches_seed_sql_fixture() -> SeedContractTestResult {
    let fixture_sql = include_str!("../../../config/fixtures/seed_data.sql");
    let contract = load_contract()?;
    let mut statuses_seen = HashSet::new();

    require_eq!(contract.dataset_version, "2026-03-pipeline-1");
    require_eq!(contract.seed_dataset, "deterministic_pipeline_one_inquiry_per_status");
    require_eq!(contract.inquiries.len(), STATUSES.len());

    for inquiry in &contract.inquiries {
        require!(
            statuses_seen.insert(inquiry.status.clone()),
            "duplicate status in seed: {}",
            inquiry.status
        );
        require!(!inquiry.description.is_empty());
        require!(
            fixture_sql.contains(&format!("('{}',", inquiry.inquiry_id)),
            "seed SQL fixture should insert inquiry {}",
            inquiry.inquiry_id
        );
        require!(
            fixture_sql.contains(&format!("'{}'", inquiry.contact_email)),
            "seed SQL fixture should include contact email {}",
            inquiry.contact_email
        );
        require!(
            fixture_sql.contains(&format!("'{}'", inquiry.event_type)),
            "seed SQL fixture should include event type {}",
            inquiry.event_type
        );
        let slug = inquiry.inquiry_id.trim_start_matches("inquiry-");
        require!(
            fixture_sql.contains(&format!("('activity-{slug}-created', 'inquiry'")),
            "seed SQL fixture should log creation of {}",
            inquiry.inquiry_id
        );

        let proposals_for_inquiry = contract
            .proposals
            .iter()
            .filter(|proposal| proposal.inquiry_id == inquiry.inquiry_id)
            .count();
        require_eq!(
            proposals_for_inquiry,
            inquiry.expected_proposal_count,
            "proposal count mismatch for {}",
            inquiry.inquiry_id
        );
    }

    for status in STATUSES {
        require!(statuses_seen.contains(status), "missing seeded status: {status}");
    }
    Ok(())
}

#[test]
fn seeded_proposals_are_internally_consistent() -> SeedContractTestResult {
    let fixture_sql = include_str!("../../../config/fixtures/seed_data.sql");
    let contract = load_contract()?;
    let inquiry_ids = contract
        .inquiries
        .iter()
        .map(|inquiry| inquiry.inquiry_id.as_str())
        .collect::<HashSet<_>>();

    for proposal in &contract.proposals {
        require!(inquiry_ids.contains(proposal.inquiry_id.as_str()));
        require!(proposal.version >= 1);
        require!(!proposal.package_subtotals_cents.is_empty());
        require!(
            proposal.package_subtotals_cents.iter().all(|subtotal| *subtotal >= 0),
            "negative subtotal in {}",
            proposal.proposal_id
        );
        require!(
            fixture_sql.contains(&format!("'{}'", proposal.proposal_id)),
            "seed SQL fixture should include proposal {}",
            proposal.proposal_id
        );
        for subtotal in &proposal.package_subtotals_cents {
            require!(
                fixture_sql.contains(&format!("'USD', {subtotal})")),
                "seed SQL fixture should store subtotal {} for {}",
                subtotal,
                proposal.proposal_id
            );
        }

        match proposal.status.as_str() {
            "ACCEPTED" => {
                let package_id = proposal
                    .accepted_package_id
                    .as_ref()
                    .ok_or_else(|| format!("{} should name its package", proposal.proposal_id))?;
                require!(
                    fixture_sql.contains(&format!("('{}', '{}'", package_id, proposal.proposal_id)),
                    "accepted package {} should belong to {}",
                    package_id,
                    proposal.proposal_id
                );
            }
            "DRAFT" | "SENT" => require!(proposal.accepted_package_id.is_none()),
            other => return Err(format!("unexpected seeded proposal status {other}")),
        }
    }
    Ok(())
}
