use std::path::PathBuf;

use atelier_core::domain::inquiry::InquiryId;
use atelier_core::domain::proposal::{PackageId, Proposal, ProposalDraft, ProposalId};
use atelier_core::domain::user::UserId;
use atelier_core::pricing::{deposit_amount, format_cents, package_quotes, PackageQuote};
use clap::Subcommand;
use serde::Serialize;

use crate::commands::{
    application_failure, invalid_argument, not_found, read_json_file, to_data, with_services,
    CommandResult,
};

#[derive(Debug, Subcommand)]
pub enum ProposalCommand {
    #[command(about = "Create the next proposal version for an inquiry from a JSON draft")]
    Create {
        #[arg(long, help = "Inquiry the proposal belongs to")]
        inquiry: String,
        #[arg(long, help = "Path to the proposal draft JSON")]
        file: PathBuf,
        #[arg(long, help = "Days until the proposal expires (overrides the draft)")]
        expires_in_days: Option<i64>,
    },
    #[command(about = "Mark a proposal as sent to the client")]
    Send { id: String },
    #[command(about = "Record the package the client accepted")]
    Accept {
        id: String,
        #[arg(long, help = "Package the client chose")]
        package: String,
    },
    #[command(about = "List proposals for an inquiry, highest version first")]
    List {
        #[arg(long, help = "Inquiry to list proposals for")]
        inquiry: String,
    },
    #[command(about = "Show one proposal with package totals and deposits")]
    Show { id: String },
    #[command(about = "Show the activity log of a proposal, newest first")]
    Activity { id: String },
}

impl ProposalCommand {
    fn name(&self) -> &'static str {
        match self {
            Self::Create { .. } => "proposal create",
            Self::Send { .. } => "proposal send",
            Self::Accept { .. } => "proposal accept",
            Self::List { .. } => "proposal list",
            Self::Show { .. } => "proposal show",
            Self::Activity { .. } => "proposal activity",
        }
    }
}

/// A proposal together with the totals shown to the client.
#[derive(Debug, Serialize)]
struct ProposalView {
    #[serde(flatten)]
    proposal: Proposal,
    quotes: Vec<PackageQuote>,
    amount_due_cents: Option<i64>,
    amount_due: Option<String>,
    deposit_due: Option<String>,
}

impl From<Proposal> for ProposalView {
    fn from(proposal: Proposal) -> Self {
        let quotes = package_quotes(&proposal);
        let amount_due_cents = proposal.amount_due();
        let currency = due_currency(&proposal);
        let deposit_cents = amount_due_cents.map(deposit_amount);
        Self {
            amount_due: amount_due_cents.map(|cents| format_cents(cents, &currency)),
            deposit_due: deposit_cents.map(|cents| format_cents(cents, &currency)),
            amount_due_cents,
            quotes,
            proposal,
        }
    }
}

fn due_currency(proposal: &Proposal) -> String {
    proposal
        .accepted_package()
        .or_else(|| proposal.packages.first())
        .map_or_else(|| "USD".to_string(), |package| package.currency.clone())
}

pub fn run(command: ProposalCommand, actor: Option<String>) -> CommandResult {
    let name = command.name();
    let actor = actor.map(UserId);

    match command {
        ProposalCommand::Create { inquiry, file, expires_in_days } => {
            with_services(name, move |services| async move {
                let mut draft: ProposalDraft = read_json_file(&file)
                    .map_err(|error| invalid_argument(format!("{error:#}")))?;
                if expires_in_days.is_some() {
                    draft.expires_in_days = expires_in_days;
                }
                let proposal = services
                    .proposals
                    .create_proposal(&InquiryId(inquiry.clone()), draft, actor)
                    .await
                    .map_err(application_failure)?
                    .ok_or_else(|| not_found("inquiry", &inquiry))?;
                let message = format!(
                    "created proposal {} (v{}) for {inquiry}",
                    proposal.id, proposal.version
                );
                Ok((message, to_data(&ProposalView::from(proposal))?))
            })
        }
        ProposalCommand::Send { id } => with_services(name, move |services| async move {
            let proposal = services
                .proposals
                .mark_as_sent(&ProposalId(id.clone()), actor)
                .await
                .map_err(application_failure)?
                .ok_or_else(|| not_found("proposal", &id))?;
            let message = format!("proposal {} v{} marked as sent", proposal.id, proposal.version);
            Ok((message, to_data(&ProposalView::from(proposal))?))
        }),
        ProposalCommand::Accept { id, package } => {
            with_services(name, move |services| async move {
                let proposal = services
                    .proposals
                    .accept_package(&ProposalId(id.clone()), &PackageId(package.clone()), actor)
                    .await
                    .map_err(application_failure)?
                    .ok_or_else(|| not_found("proposal", &id))?;
                let message = format!("package {package} accepted on proposal {}", proposal.id);
                Ok((message, to_data(&ProposalView::from(proposal))?))
            })
        }
        ProposalCommand::List { inquiry } => with_services(name, move |services| async move {
            let proposals = services
                .proposals
                .proposals_for_inquiry(&InquiryId(inquiry.clone()))
                .await
                .map_err(application_failure)?
                .ok_or_else(|| not_found("inquiry", &inquiry))?;
            let message = format!("{} proposals for {inquiry}", proposals.len());
            let views = proposals.into_iter().map(ProposalView::from).collect::<Vec<_>>();
            Ok((message, to_data(&views)?))
        }),
        ProposalCommand::Show { id } => with_services(name, move |services| async move {
            let proposal = services
                .proposals
                .get_proposal(&ProposalId(id.clone()))
                .await
                .map_err(application_failure)?
                .ok_or_else(|| not_found("proposal", &id))?;
            let message = format!(
                "proposal {} v{} is {}",
                proposal.id,
                proposal.version,
                proposal.status.label()
            );
            Ok((message, to_data(&ProposalView::from(proposal))?))
        }),
        ProposalCommand::Activity { id } => with_services(name, move |services| async move {
            let entries = services
                .proposals
                .activity_for_proposal(&ProposalId(id.clone()))
                .await
                .map_err(application_failure)?
                .ok_or_else(|| not_found("proposal", &id))?;
            Ok((format!("{} activity entries for {id}", entries.len()), to_data(&entries)?))
        }),
    }
}
