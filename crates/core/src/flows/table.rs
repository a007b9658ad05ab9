use crate::domain::inquiry::InquiryStatus;
use crate::errors::TransitionError;

/// Allowed next statuses for each inquiry status, in presentation order.
///
/// Booked has no outgoing transitions: once an event is booked, the event project owns its
/// state. Negative closures can only be reopened into review.
pub fn valid_transitions(status: InquiryStatus) -> &'static [InquiryStatus] {
    use InquiryStatus::{
        AcceptedNotBooked, Booked, Disqualified, Expired, InReview, Lost, New, QuotedWaiting,
        Quoting, WaitingOnClient,
    };

    match status {
        New => &[InReview, WaitingOnClient, Lost, Disqualified],
        InReview => &[Quoting, WaitingOnClient, QuotedWaiting, New, Lost, Disqualified],
        WaitingOnClient => &[Quoting, QuotedWaiting, InReview, New, Lost, Expired],
        Quoting => &[QuotedWaiting, WaitingOnClient, InReview, Lost, Disqualified],
        QuotedWaiting => &[AcceptedNotBooked, WaitingOnClient, Quoting, InReview, Lost, Expired],
        AcceptedNotBooked => &[Booked, QuotedWaiting, Lost],
        Booked => &[],
        Lost | Disqualified | Expired => &[InReview],
    }
}

pub fn can_transition_to(from: InquiryStatus, to: InquiryStatus) -> bool {
    from != to && valid_transitions(from).contains(&to)
}

pub fn assert_transition(from: InquiryStatus, to: InquiryStatus) -> Result<(), TransitionError> {
    if from == to {
        return Err(TransitionError::SameStatus { status: from });
    }

    let allowed = valid_transitions(from);
    if !allowed.contains(&to) {
        return Err(TransitionError::InvalidTransition { from, to, allowed: allowed.to_vec() });
    }

    Ok(())
}
