pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod pricing;
pub mod services;
pub mod store;

pub use domain::activity::{ActivityLog, ActivityLogId, ActivityType, EntityRef, NewActivity};
pub use domain::inquiry::{Inquiry, InquiryDetails, InquiryId, InquiryInput, InquiryStatus};
pub use domain::proposal::{
    LineItem, LineItemId, LineItemInput, PackageId, PackageInput, Proposal, ProposalDraft,
    ProposalId, ProposalPackage, ProposalStatus,
};
pub use domain::user::UserId;
pub use errors::{
    ApplicationError, DomainError, InterfaceError, PricingError, StorageError, TransitionError,
    ValidationError,
};
pub use flows::{assert_transition, can_transition_to, classify, valid_transitions, TransitionKind};
pub use services::{InquiryService, ProposalService, StatusChange};
pub use store::{
    ActivitySink, InMemoryStore, InquiryRepository, ProposalRepository, Store, UnitOfWork,
};
