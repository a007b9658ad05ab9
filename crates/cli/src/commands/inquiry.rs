use std::path::PathBuf;

use atelier_core::domain::inquiry::{Inquiry, InquiryId, InquiryInput, InquiryStatus};
use atelier_core::domain::user::UserId;
use atelier_core::flows::{classify, TransitionKind};
use atelier_core::StatusChange;
use clap::Subcommand;
use serde::Serialize;

use crate::commands::{
    application_failure, invalid_argument, not_found, read_json_file, to_data, with_services,
    CommandResult,
};

#[derive(Debug, Subcommand)]
pub enum InquiryCommand {
    #[command(about = "List inquiries, newest first")]
    List {
        #[arg(long, help = "Only include inquiries in this status (e.g. IN_REVIEW)")]
        status: Option<String>,
    },
    #[command(about = "Show one inquiry")]
    Show { id: String },
    #[command(about = "Create an inquiry from a JSON intake file")]
    Create {
        #[arg(long, help = "Path to the intake JSON")]
        file: PathBuf,
    },
    #[command(about = "Replace an inquiry's contact and event details from a JSON file")]
    Update {
        id: String,
        #[arg(long, help = "Path to the intake JSON")]
        file: PathBuf,
    },
    #[command(about = "List the statuses an inquiry may move to next")]
    Transitions { id: String },
    #[command(about = "Move an inquiry to a new status")]
    SetStatus {
        id: String,
        status: String,
        #[arg(long, help = "Activity message to record instead of the default")]
        message: Option<String>,
    },
    #[command(about = "Assign an inquiry to a user, or clear the assignee")]
    Assign {
        id: String,
        #[arg(long, help = "User to assign; omit to unassign")]
        user: Option<String>,
    },
    #[command(about = "Ask the client for more information (moves to WAITING_ON_CLIENT)")]
    RequestInfo { id: String, message: String },
    #[command(about = "Show the activity log of an inquiry, newest first")]
    Activity { id: String },
}

impl InquiryCommand {
    fn name(&self) -> &'static str {
        match self {
            Self::List { .. } => "inquiry list",
            Self::Show { .. } => "inquiry show",
            Self::Create { .. } => "inquiry create",
            Self::Update { .. } => "inquiry update",
            Self::Transitions { .. } => "inquiry transitions",
            Self::SetStatus { .. } => "inquiry set-status",
            Self::Assign { .. } => "inquiry assign",
            Self::RequestInfo { .. } => "inquiry request-info",
            Self::Activity { .. } => "inquiry activity",
        }
    }
}

#[derive(Debug, Serialize)]
struct TransitionOption {
    status: InquiryStatus,
    label: &'static str,
    kind: TransitionKind,
    requires_confirmation: bool,
}

pub fn run(command: InquiryCommand, actor: Option<String>) -> CommandResult {
    let name = command.name();
    let actor = actor.map(UserId);

    match command {
        InquiryCommand::List { status } => {
            let filter = match status.as_deref().map(parse_status).transpose() {
                Ok(filter) => filter,
                Err(message) => return CommandResult::failure(name, "invalid_input", message, 8),
            };
            with_services(name, move |services| async move {
                let inquiries = services
                    .inquiries
                    .list_inquiries()
                    .await
                    .map_err(application_failure)?
                    .into_iter()
                    .filter(|inquiry| filter.map_or(true, |status| inquiry.status == status))
                    .collect::<Vec<_>>();
                Ok((format!("{} inquiries", inquiries.len()), to_data(&inquiries)?))
            })
        }
        InquiryCommand::Show { id } => with_services(name, move |services| async move {
            let inquiry = services
                .inquiries
                .get_inquiry(&InquiryId(id.clone()))
                .await
                .map_err(application_failure)?
                .ok_or_else(|| not_found("inquiry", &id))?;
            Ok((summary(&inquiry), to_data(&inquiry)?))
        }),
        InquiryCommand::Create { file } => with_services(name, move |services| async move {
            let input: InquiryInput =
                read_json_file(&file).map_err(|error| invalid_argument(format!("{error:#}")))?;
            let inquiry = services
                .inquiries
                .create_inquiry(input, actor)
                .await
                .map_err(application_failure)?;
            Ok((format!("created inquiry {}", inquiry.id), to_data(&inquiry)?))
        }),
        InquiryCommand::Update { id, file } => with_services(name, move |services| async move {
            let input: InquiryInput =
                read_json_file(&file).map_err(|error| invalid_argument(format!("{error:#}")))?;
            let inquiry = services
                .inquiries
                .update_inquiry(&InquiryId(id.clone()), input, actor)
                .await
                .map_err(application_failure)?
                .ok_or_else(|| not_found("inquiry", &id))?;
            Ok((format!("updated inquiry {}", inquiry.id), to_data(&inquiry)?))
        }),
        InquiryCommand::Transitions { id } => with_services(name, move |services| async move {
            let inquiry = services
                .inquiries
                .get_inquiry(&InquiryId(id.clone()))
                .await
                .map_err(application_failure)?
                .ok_or_else(|| not_found("inquiry", &id))?;
            let options = transition_options(inquiry.status);
            let message = format!(
                "{} allows {} transitions from {}",
                inquiry.id,
                options.len(),
                inquiry.status
            );
            Ok((message, to_data(&options)?))
        }),
        InquiryCommand::SetStatus { id, status, message } => {
            let target = match parse_status(&status) {
                Ok(target) => target,
                Err(message) => return CommandResult::failure(name, "invalid_input", message, 8),
            };
            with_services(name, move |services| async move {
                let change = StatusChange { message, payload: None, actor_id: actor };
                let inquiry = services
                    .inquiries
                    .change_status(&InquiryId(id.clone()), target, change)
                    .await
                    .map_err(application_failure)?
                    .ok_or_else(|| not_found("inquiry", &id))?;
                Ok((summary(&inquiry), to_data(&inquiry)?))
            })
        }
        InquiryCommand::Assign { id, user } => with_services(name, move |services| async move {
            let inquiry = services
                .inquiries
                .assign(&InquiryId(id.clone()), user.map(UserId), actor)
                .await
                .map_err(application_failure)?
                .ok_or_else(|| not_found("inquiry", &id))?;
            Ok((summary(&inquiry), to_data(&inquiry)?))
        }),
        InquiryCommand::RequestInfo { id, message } => {
            with_services(name, move |services| async move {
                let inquiry = services
                    .inquiries
                    .request_more_info(&InquiryId(id.clone()), &message, actor)
                    .await
                    .map_err(application_failure)?
                    .ok_or_else(|| not_found("inquiry", &id))?;
                Ok((summary(&inquiry), to_data(&inquiry)?))
            })
        }
        InquiryCommand::Activity { id } => with_services(name, move |services| async move {
            let entries = services
                .inquiries
                .activity_for_inquiry(&InquiryId(id.clone()))
                .await
                .map_err(application_failure)?
                .ok_or_else(|| not_found("inquiry", &id))?;
            Ok((format!("{} activity entries for {id}", entries.len()), to_data(&entries)?))
        }),
    }
}

fn parse_status(value: &str) -> Result<InquiryStatus, String> {
    value.parse::<InquiryStatus>().map_err(|error| error.to_string())
}

fn summary(inquiry: &Inquiry) -> String {
    let assignee = inquiry.assigned_to.as_ref().map_or("unassigned", |user| user.0.as_str());
    format!("{} is {} ({assignee})", inquiry.id, inquiry.status.label())
}

fn transition_options(from: InquiryStatus) -> Vec<TransitionOption> {
    atelier_core::valid_transitions(from)
        .iter()
        .map(|&status| {
            let kind = classify(from, status);
            TransitionOption {
                status,
                label: status.label(),
                kind,
                requires_confirmation: kind.requires_confirmation(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use atelier_core::domain::inquiry::InquiryStatus;
    use atelier_core::flows::TransitionKind;

    use super::{parse_status, transition_options};

    #[test]
    fn status_arguments_accept_wire_names_in_any_case() {
        assert_eq!(parse_status("in_review"), Ok(InquiryStatus::InReview));
        assert_eq!(parse_status(" QUOTED_WAITING "), Ok(InquiryStatus::QuotedWaiting));
        assert!(parse_status("ARCHIVED").is_err());
    }

    #[test]
    fn transition_options_flag_closing_moves_for_confirmation() {
        let options = transition_options(InquiryStatus::Quoting);
        let lost = options
            .iter()
            .find(|option| option.status == InquiryStatus::Lost)
            .expect("QUOTING may close as LOST");
        assert_eq!(lost.kind, TransitionKind::Danger);
        assert!(lost.requires_confirmation);

        let forward = options
            .iter()
            .find(|option| option.status == InquiryStatus::QuotedWaiting)
            .expect("QUOTING may advance");
        assert_eq!(forward.kind, TransitionKind::Forward);
        assert!(!forward.requires_confirmation);
    }
}
