//! Odoo credit bridge library.
//!
//! Answers storefront credit checks from Odoo receivables over JSON-RPC.
//! The binary in `main.rs` wires this library to a listener; the CLI and the
//! integration tests reuse it directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod credit;
pub mod error;
pub mod middleware;
pub mod odoo;
pub mod routes;
pub mod state;
