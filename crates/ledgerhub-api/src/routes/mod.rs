//! API Routes

pub mod billing;
pub mod health;
pub mod records;
pub mod tenants;
