pub mod eligibility;
pub mod handlers;
