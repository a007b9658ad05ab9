use serde::{Deserialize, Serialize};

use crate::domain::inquiry::InquiryStatus;

/// Presentation class of a transition, used to pick the confirmation a UI shows. Not
/// persisted and not a rule of the state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Forward,
    Backward,
    Danger,
    Reopen,
}

impl TransitionKind {
    pub fn requires_confirmation(self) -> bool {
        !matches!(self, Self::Forward)
    }
}

/// Reopen beats danger, danger beats stage comparison. Transitions where either side has no
/// stage count as forward.
pub fn classify(from: InquiryStatus, to: InquiryStatus) -> TransitionKind {
    if from.is_negative() {
        return TransitionKind::Reopen;
    }
    if to.is_negative() {
        return TransitionKind::Danger;
    }
    match (from.stage(), to.stage()) {
        (Some(from_stage), Some(to_stage)) if to_stage < from_stage => TransitionKind::Backward,
        _ => TransitionKind::Forward,
    }
}

#[cfg(test)]
mod tests {
    use super::{classify, TransitionKind};
    use crate::domain::inquiry::InquiryStatus;
    use crate::flows::valid_transitions;

    #[test]
    fn pipeline_moves_classify_by_stage() {
        assert_eq!(classify(InquiryStatus::New, InquiryStatus::InReview), TransitionKind::Forward);
        assert_eq!(
            classify(InquiryStatus::QuotedWaiting, InquiryStatus::Quoting),
            TransitionKind::Backward
        );
        assert_eq!(
            classify(InquiryStatus::AcceptedNotBooked, InquiryStatus::Booked),
            TransitionKind::Forward
        );
    }

    #[test]
    fn closing_is_danger_and_reopen_wins_over_danger() {
        assert_eq!(classify(InquiryStatus::Quoting, InquiryStatus::Lost), TransitionKind::Danger);
        assert_eq!(classify(InquiryStatus::Lost, InquiryStatus::InReview), TransitionKind::Reopen);
        assert_eq!(classify(InquiryStatus::Expired, InquiryStatus::Lost), TransitionKind::Reopen);
    }

    #[test]
    fn only_forward_moves_skip_confirmation() {
        for from in InquiryStatus::ALL {
            for &to in valid_transitions(from) {
                let kind = classify(from, to);
                assert_eq!(kind.requires_confirmation(), kind != TransitionKind::Forward);
            }
        }
    }
}
