pub mod inquiry;
pub mod proposal;

pub use inquiry::{InquiryService, StatusChange};
pub use proposal::{ProposalService, MAX_EXPIRY_DAYS, MIN_EXPIRY_DAYS};
