//! Route groups

pub mod products;
pub mod status;
pub mod user;
