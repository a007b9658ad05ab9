pub mod classify;
pub mod table;

pub use classify::{classify, TransitionKind};
pub use table::{assert_transition, can_transition_to, valid_transitions};
