//! Core types for the Odoo bridge.
//!
//! This module provides type-safe wrappers for the values that cross the
//! storefront/ERP boundary.

pub mod amount;
pub mod external_id;
pub mod id;

pub use amount::{Amount, AmountError};
pub use external_id::{ExternalId, ExternalIdError};
pub use id::*;
