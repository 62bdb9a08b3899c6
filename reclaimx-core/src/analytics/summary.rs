//! Status counts for one resource category.

use crate::types::{Report, ReportStatus, Resource};
use serde::Serialize;

/// Reported/resolved/pending counts for one resource.
///
/// `total == resolved + pending` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: u64,
    pub resolved: u64,
    pub pending: u64,
}

impl Summary {
    /// Fraction of reports resolved, `None` when there are no reports.
    pub fn resolution_rate(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.resolved as f64 / self.total as f64)
        }
    }

    /// Whether there is anything to chart
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Count `reports` filed under `resource` by status.
pub fn summarize(reports: &[Report], resource: Resource) -> Summary {
    reports
        .iter()
        .filter(|r| r.resource == resource)
        .fold(Summary::default(), |mut acc, report| {
            acc.total += 1;
            match report.status {
                ReportStatus::Resolved => acc.resolved += 1,
                ReportStatus::Pending => acc.pending += 1,
            }
            acc
        })
}
