//! Command implementations

pub mod health;
pub mod provision;
pub mod start;
pub mod status;
pub mod stop;
