//! Command implementations

pub mod check;
pub mod completions;
pub mod deps;
pub mod features;
pub mod members;
pub mod pin;
pub mod register;
pub mod unregister;
pub mod units;
