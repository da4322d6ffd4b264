//! Bakery Core - Shared types library.
//!
//! This crate provides common types used across all bakery storefront components:
//! - `storefront` - Client library for the bakery REST API (cart, orders, catalog)
//! - `cli` - Command-line front end driving the storefront library
//!
//! # Architecture
//!
//! The core crate contains only types and pure mappings - no I/O, no storage,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, session identifiers,
//!   contact details, and order statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
