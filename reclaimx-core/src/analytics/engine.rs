//! On-demand analytics over a report ledger.

use super::summary::{summarize, Summary};
use crate::error::Result;
use crate::reports::ReportLedger;
use crate::store::RecordStore;
use crate::types::{Report, Resource};

/// Derives per-resource summaries from ledger snapshots.
///
/// Holds no state of its own; each call reloads the ledger.
pub struct AnalyticsEngine<'a, S> {
    ledger: &'a ReportLedger<S>,
}

impl<'a, S: RecordStore<Report>> AnalyticsEngine<'a, S> {
    pub fn new(ledger: &'a ReportLedger<S>) -> Self {
        Self { ledger }
    }

    /// Counts for a single resource. An empty category yields all zeros.
    pub fn summarize(&self, resource: Resource) -> Result<Summary> {
        let reports = self.ledger.list_by_resource(resource)?;
        Ok(summarize(&reports, resource))
    }

    /// One summary per resource in dashboard order, from a single snapshot
    pub fn summarize_all(&self) -> Result<Vec<(Resource, Summary)>> {
        let reports = self.ledger.list()?;
        Ok(Resource::ALL
            .iter()
            .map(|&resource| (resource, summarize(&reports, resource)))
            .collect())
    }
}
