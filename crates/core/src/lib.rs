//! Odoo Bridge Core - Shared domain types.
//!
//! This crate provides the types and rules used by every Odoo bridge component:
//! - `server` - HTTP service that answers storefront credit checks
//! - `cli` - Command-line tools for checking credentials and credit by hand
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. Everything that talks to Odoo lives in the server crate.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for Odoo IDs, external identities, and amounts
//! - [`credit`] - Request validation, account authorization, and the sufficiency rule

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod credit;
pub mod types;

pub use credit::{
    AccountMismatch, CreditDecision, CreditRequest, ValidationError, authorize, judge,
    total_balance,
};
pub use types::*;
