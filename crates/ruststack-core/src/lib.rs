//! Core configuration, date handling, and caching for the RustStack IAM
//! authentication crates.
//!
//! This crate provides the building blocks shared by `ruststack-auth` and
//! `ruststack-saml`: environment-driven configuration, UTC date parsing for the
//! timestamp formats stored alongside credentials, and a bounded TTL cache
//! used by credential-store wrappers.

mod cache;
mod config;
pub mod dates;
mod error;

pub use cache::TtlCache;
pub use config::AuthConfig;
pub use error::{RustStackError, RustStackResult};
