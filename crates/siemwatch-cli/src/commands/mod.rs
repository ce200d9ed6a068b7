pub mod auth;
pub mod dashboard;
pub mod events;
pub mod export;
