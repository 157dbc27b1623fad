//! Core business logic for the battle ledger.

pub mod services;

pub use services::*;
