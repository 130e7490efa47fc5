//! tally-core library.
//!
//! A collaborative catalog where users propose structured edits to shared
//! entities (performers, scenes, studios, tags), vote on them, and have
//! accepted edits applied transactionally. A sibling engine lets clients
//! submit content fingerprints for scenes and build consensus on them.
//!
//! # Conventions
//!
//! - **Errors**: domain operations return [`error::Result`] with a typed
//!   [`error::CatalogError`]; infrastructure helpers (opening databases,
//!   loading config files) return `anyhow::Result`.
//! - **Logging**: use `tracing` macros with structured fields
//!   (`edit_id`, `status`, `target_type`, `outcome`).
//! - **Transactions**: every mutating operation takes a [`session::Session`]
//!   that wraps exactly one `BEGIN IMMEDIATE` transaction.

pub mod config;
pub mod db;
pub mod diff;
pub mod edit;
pub mod error;
pub mod fingerprint;
pub mod model;
pub mod session;

pub use error::{CatalogError, ErrorCode, Result};
pub use session::{Actor, Catalog, CatalogConn, Session};
