//! Report ledger: creation, status updates and per-user queries.

use crate::error::{Error, Result};
use crate::store::{CsvStore, Mutation, RecordStore};
use crate::types::{Report, ReportStatus, Resource};
use chrono::{DateTime, Utc};
use std::path::Path;

/// Report lifecycle storage on top of a [`RecordStore`].
///
/// `create` and `update_status` both run inside the table's exclusive lock,
/// so concurrent submissions and status edits never lose each other's write.
#[derive(Debug)]
pub struct ReportLedger<S = CsvStore<Report>> {
    store: S,
}

impl ReportLedger<CsvStore<Report>> {
    /// Open the report table at `path`, creating it if absent
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::with_store(CsvStore::open(path)?))
    }
}

impl<S: RecordStore<Report>> ReportLedger<S> {
    pub fn with_store(store: S) -> Self {
        Self { store }
    }

    /// File a new report with status `Pending`.
    pub fn create(
        &self,
        reporter_phone: &str,
        resource: Resource,
        location: &str,
        description: &str,
    ) -> Result<Report> {
        if reporter_phone.trim().is_empty() {
            return Err(Error::InvalidInput("reporter phone must not be empty".into()));
        }

        let report = self.store.transact(|reports| {
            let now = Utc::now();
            let report = Report {
                id: next_id(reports, now)?,
                reporter_phone: reporter_phone.to_string(),
                resource,
                location: location.to_string(),
                description: description.to_string(),
                status: ReportStatus::Pending,
                created_at: now,
            };
            Ok((Mutation::Append(report.clone()), report))
        })?;

        tracing::info!(
            id = report.id,
            resource = %report.resource,
            "Created report"
        );
        Ok(report)
    }

    /// All reports in insertion order
    pub fn list(&self) -> Result<Vec<Report>> {
        self.store.load_all()
    }

    /// Reports filed under `resource`, in insertion order
    pub fn list_by_resource(&self, resource: Resource) -> Result<Vec<Report>> {
        Ok(self
            .store
            .load_all()?
            .into_iter()
            .filter(|r| r.resource == resource)
            .collect())
    }

    /// Reports filed by `phone`, in insertion order
    pub fn list_by_reporter(&self, phone: &str) -> Result<Vec<Report>> {
        Ok(self
            .store
            .load_all()?
            .into_iter()
            .filter(|r| r.reporter_phone == phone)
            .collect())
    }

    /// Whether any of `phone`'s reports has been resolved.
    ///
    /// Frontends poll this to show the "your issue was resolved" notice.
    pub fn has_resolved_notice(&self, phone: &str) -> Result<bool> {
        Ok(self
            .list_by_reporter(phone)?
            .iter()
            .any(Report::is_resolved))
    }

    /// Fetch a single report
    pub fn get(&self, id: u64) -> Result<Report> {
        self.store
            .load_all()?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or(Error::NotFound(id))
    }

    /// Overwrite the status of report `id`.
    ///
    /// Setting the current value again is allowed and still rewrites.
    pub fn update_status(&self, id: u64, status: ReportStatus) -> Result<Report> {
        let updated = self.store.transact(|reports| {
            let mut rows = reports.to_vec();
            let target = rows
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or(Error::NotFound(id))?;
            target.status = status;
            let updated = target.clone();
            Ok((Mutation::Rewrite(rows), updated))
        })?;

        tracing::info!(id, status = %status, "Updated report status");
        Ok(updated)
    }

    /// Append reports whose id is not yet present. Returns how many were added.
    pub(crate) fn import(&self, incoming: Vec<Report>) -> Result<usize> {
        self.store.transact(|reports| {
            let mut seen: std::collections::HashSet<u64> =
                reports.iter().map(|r| r.id).collect();
            let fresh: Vec<Report> = incoming
                .into_iter()
                .filter(|r| seen.insert(r.id))
                .collect();
            let added = fresh.len();
            Ok((Mutation::AppendAll(fresh), added))
        })
    }
}

/// Time-derived id, forced above every existing id.
///
/// Callers hold the table's write lock, so two creates can never observe the
/// same maximum. Fails once the largest id is `u64::MAX`.
fn next_id(existing: &[Report], now: DateTime<Utc>) -> Result<u64> {
    let from_clock = u64::try_from(now.timestamp_millis()).unwrap_or(0);
    let above_max = match existing.iter().map(|r| r.id).max() {
        Some(max) => max
            .checked_add(1)
            .ok_or_else(|| Error::InvalidInput("report id space exhausted".into()))?,
        None => 0,
    };
    Ok(from_clock.max(above_max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn ledger() -> ReportLedger<MemoryStore<Report>> {
        ReportLedger::with_store(MemoryStore::new())
    }

    fn report_with_id(id: u64) -> Report {
        Report {
            id,
            reporter_phone: "111".to_string(),
            resource: Resource::Water,
            location: "Lab".to_string(),
            description: "leak".to_string(),
            status: ReportStatus::Pending,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_next_id_uses_clock_when_ahead() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let id = next_id(&[report_with_id(5)], now).unwrap();
        assert_eq!(id, now.timestamp_millis() as u64);
    }

    #[test]
    fn test_next_id_steps_past_collision() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let taken = now.timestamp_millis() as u64;
        let id = next_id(&[report_with_id(taken)], now).unwrap();
        assert_eq!(id, taken + 1);
    }

    #[test]
    fn test_next_id_refuses_to_wrap_at_max() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert!(matches!(
            next_id(&[report_with_id(u64::MAX)], now),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_create_after_max_id_fails_without_writing() {
        let ledger =
            ReportLedger::with_store(MemoryStore::with_rows(vec![report_with_id(u64::MAX)]));
        assert!(matches!(
            ledger.create("111", Resource::Water, "Lab", ""),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(ledger.list().unwrap().len(), 1);
    }

    #[test]
    fn test_create_sets_pending() {
        let ledger = ledger();
        let report = ledger
            .create("111", Resource::Electricity, "Block A", "lights on all night")
            .unwrap();
        assert_eq!(report.status, ReportStatus::Pending);
        assert_eq!(ledger.get(report.id).unwrap(), report);
    }

    #[test]
    fn test_rapid_creates_get_distinct_ids() {
        let ledger = ledger();
        let ids: Vec<u64> = (0..20)
            .map(|_| ledger.create("111", Resource::Water, "Lab", "").unwrap().id)
            .collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 20);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_filters_preserve_order() {
        let ledger = ledger();
        let a = ledger.create("111", Resource::Water, "A", "").unwrap();
        ledger.create("222", Resource::Electricity, "B", "").unwrap();
        let c = ledger.create("222", Resource::Water, "C", "").unwrap();

        let water: Vec<u64> = ledger
            .list_by_resource(Resource::Water)
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(water, vec![a.id, c.id]);

        let mine = ledger.list_by_reporter("222").unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[1].id, c.id);
    }

    #[test]
    fn test_update_status_touches_only_target() {
        let ledger = ledger();
        let a = ledger.create("111", Resource::Water, "A", "").unwrap();
        let b = ledger.create("111", Resource::Water, "B", "").unwrap();

        let updated = ledger.update_status(a.id, ReportStatus::Resolved).unwrap();
        assert_eq!(updated.status, ReportStatus::Resolved);
        assert_eq!(ledger.get(a.id).unwrap().status, ReportStatus::Resolved);
        assert_eq!(ledger.get(b.id).unwrap(), b);

        // Reverse overwrite is allowed.
        ledger.update_status(a.id, ReportStatus::Pending).unwrap();
        assert_eq!(ledger.get(a.id).unwrap().status, ReportStatus::Pending);
    }

    #[test]
    fn test_update_unknown_id_is_not_found() {
        let ledger = ledger();
        ledger.create("111", Resource::Water, "A", "").unwrap();
        assert!(matches!(
            ledger.update_status(42, ReportStatus::Resolved),
            Err(Error::NotFound(42))
        ));
    }

    #[test]
    fn test_resolved_notice() {
        let ledger = ledger();
        let a = ledger.create("111", Resource::Water, "A", "").unwrap();
        ledger.create("222", Resource::Water, "B", "").unwrap();
        assert!(!ledger.has_resolved_notice("111").unwrap());

        ledger.update_status(a.id, ReportStatus::Resolved).unwrap();
        assert!(ledger.has_resolved_notice("111").unwrap());
        assert!(!ledger.has_resolved_notice("222").unwrap());
    }
}
