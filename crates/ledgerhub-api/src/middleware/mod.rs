//! Request pipeline: resolve tenant → check session → check entitlement

pub mod auth;
pub mod entitlement;
pub mod tenant;
