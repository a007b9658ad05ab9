pub mod activity;
pub mod inquiry;
pub mod proposal;
pub mod user;
