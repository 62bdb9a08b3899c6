//! # reclaimx-core
//!
//! Core library for reclaimx - campus resource wastage reporting.
//!
//! This library provides:
//! - Domain types for users and reports
//! - A durable flat-file record store with per-table locking
//! - The user directory, report ledger and analytics services
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Services are layered leaf to root:
//! - **RecordStore:** typed tables with append, scan and atomic rewrite
//! - **UserDirectory / ReportLedger:** enforce identity and id invariants,
//!   then delegate writes to the store
//! - **AnalyticsEngine:** per-resource counts recomputed from ledger snapshots
//!
//! Frontends talk to [`Reclaim`], passing a [`Session`] into each
//! user-scoped call.
//!
//! ## Example
//!
//! ```rust,no_run
//! use reclaimx_core::{Config, Reclaim, Resource};
//!
//! let config = Config::load().expect("failed to load config");
//! let app = Reclaim::open(&config.storage).expect("failed to open tables");
//!
//! let session = app.login("111", "pw").expect("login failed");
//! app.submit_report(&session, Resource::Water, "Hostel B", "tap left running")
//!     .expect("failed to submit report");
//! ```

// Re-export commonly used items at the crate root
pub use analytics::{AnalyticsEngine, Summary};
pub use config::Config;
pub use error::{Error, Result};
pub use legacy::{import_legacy, ImportStats};
pub use reports::ReportLedger;
pub use service::Reclaim;
pub use store::{CsvStore, MemoryStore, RecordStore};
pub use types::*;
pub use users::UserDirectory;

// Public modules
pub mod analytics;
pub mod config;
pub mod credential;
pub mod error;
pub mod legacy;
pub mod logging;
pub mod reports;
pub mod service;
pub mod store;
pub mod types;
pub mod users;
