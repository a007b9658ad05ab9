use thiserror::Error;

use crate::domain::inquiry::InquiryStatus;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("status is already {status}")]
    SameStatus { status: InquiryStatus },
    #[error(
        "cannot transition from {from} to {to}; valid transitions: {}",
        render_allowed(.allowed)
    )]
    InvalidTransition { from: InquiryStatus, to: InquiryStatus, allowed: Vec<InquiryStatus> },
}

fn render_allowed(allowed: &[InquiryStatus]) -> String {
    if allowed.is_empty() {
        return "none".to_owned();
    }
    allowed.iter().map(|status| status.as_str()).collect::<Vec<_>>().join(", ")
}

/// Malformed caller input. Package and item positions are zero-based submission indexes.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("`{value}` is not a valid email address")]
    InvalidEmail { value: String },
    #[error("{field} cannot be negative (got {value})")]
    NegativeCount { field: &'static str, value: i64 },
    #[error("message is required")]
    BlankMessage,
    #[error("a proposal must have at least one package")]
    NoPackages,
    #[error("package #{package} must have a name")]
    BlankPackageName { package: usize },
    #[error("package \"{name}\" must have at least one item")]
    EmptyPackage { package: usize, name: String },
    #[error("item #{item} of package \"{name}\" must have a title")]
    BlankItemTitle { package: usize, name: String, item: usize },
    #[error(
        "item \"{title}\" of package \"{name}\" has quantity {quantity}; \
         quantity must be at least 1"
    )]
    InvalidQuantity { package: usize, name: String, item: usize, title: String, quantity: i64 },
    #[error(
        "item \"{title}\" of package \"{name}\" has unit price {unit_cents}; \
         price cannot be negative"
    )]
    NegativeUnitPrice { package: usize, name: String, item: usize, title: String, unit_cents: i64 },
    #[error("item \"{title}\" of package \"{name}\" totals more cents than can be represented")]
    ItemTotalOverflow { package: usize, name: String, item: usize, title: String },
    #[error("package \"{name}\" totals more cents than can be represented")]
    PackageTotalOverflow { package: usize, name: String },
    #[error("package \"{name}\" has currency `{currency}`; expected a three-letter uppercase code")]
    InvalidCurrency { package: usize, name: String, currency: String },
    #[error("proposal expiry must be between 1 and 365 days (got {days})")]
    ExpiryOutOfRange { days: i64 },
    #[error("package {package_id} does not belong to proposal {proposal_id}")]
    UnknownPackage { proposal_id: String, package_id: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("quantity must be at least 1 (got {0})")]
    InvalidQuantity(i64),
    #[error("unit price cannot be negative (got {0} cents)")]
    NegativeUnitPrice(i64),
    #[error("amount exceeds the representable range of cents")]
    Overflow,
}

/// Opaque failure from the persistence port. The unit of work it happened in is abandoned.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("storage failure: {message}")]
pub struct StorageError {
    pub message: String,
}

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl From<TransitionError> for ApplicationError {
    fn from(value: TransitionError) -> Self {
        Self::Domain(DomainError::Transition(value))
    }
}

impl From<ValidationError> for ApplicationError {
    fn from(value: ValidationError) -> Self {
        Self::Domain(DomainError::Validation(value))
    }
}

impl From<PricingError> for ApplicationError {
    fn from(value: PricingError) -> Self {
        Self::Domain(DomainError::Pricing(value))
    }
}

impl ApplicationError {
    pub fn as_transition(&self) -> Option<&TransitionError> {
        match self {
            Self::Domain(DomainError::Transition(error)) => Some(error),
            _ => None,
        }
    }

    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Domain(DomainError::Validation(error)) => Some(error),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(error) => {
                let correlation_id = "unassigned".to_owned();
                Self::BadRequest { message: error.to_string(), correlation_id }
            }
            ApplicationError::Storage(error) => Self::ServiceUnavailable {
                message: error.message,
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}
