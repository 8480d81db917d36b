pub mod handlers;
pub mod update;
