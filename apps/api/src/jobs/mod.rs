pub mod handlers;
pub mod lifecycle;
pub mod search;
