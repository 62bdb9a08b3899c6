//! Analytics module for reclaimx
//!
//! Provides per-resource aggregate counts for admin dashboards:
//! - [`summarize`]: pure count over a report snapshot
//! - [`AnalyticsEngine`]: recomputes summaries on demand from a [`ReportLedger`]
//!
//! Nothing here is persisted; every call reads a fresh snapshot.
//!
//! [`ReportLedger`]: crate::reports::ReportLedger

pub mod engine;
pub mod summary;

pub use engine::AnalyticsEngine;
pub use summary::{summarize, Summary};
