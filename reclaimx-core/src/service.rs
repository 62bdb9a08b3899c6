//! Request/response surface for frontends.
//!
//! [`Reclaim`] bundles the user directory, report ledger and analytics over
//! one data directory. It keeps no login state: callers authenticate once,
//! hold the returned [`Session`] and pass it into each user-scoped call.

use crate::analytics::{AnalyticsEngine, Summary};
use crate::config::StorageConfig;
use crate::error::Result;
use crate::reports::ReportLedger;
use crate::store::{CsvStore, RecordStore};
use crate::types::{Report, ReportRow, ReportStatus, Resource, Session, User};
use crate::users::UserDirectory;
use std::collections::HashMap;
use std::path::Path;

/// Core services over a pair of tables.
pub struct Reclaim<U = CsvStore<User>, R = CsvStore<Report>> {
    users: UserDirectory<U>,
    reports: ReportLedger<R>,
}

impl Reclaim {
    /// Open both tables as described by `storage`
    pub fn open(storage: &StorageConfig) -> Result<Self> {
        let users = UserDirectory::open(storage.users_path())?;
        let reports = ReportLedger::open(storage.reports_path())?;
        tracing::debug!(data_dir = %storage.data_dir().display(), "Opened reclaimx tables");
        Ok(Self { users, reports })
    }

    /// Open both tables under `dir` with default file names
    pub fn open_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open(&StorageConfig::in_dir(dir.as_ref()))
    }
}

impl<U: RecordStore<User>, R: RecordStore<Report>> Reclaim<U, R> {
    pub fn from_parts(users: UserDirectory<U>, reports: ReportLedger<R>) -> Self {
        Self { users, reports }
    }

    pub fn users(&self) -> &UserDirectory<U> {
        &self.users
    }

    pub fn reports(&self) -> &ReportLedger<R> {
        &self.reports
    }

    pub fn analytics(&self) -> AnalyticsEngine<'_, R> {
        AnalyticsEngine::new(&self.reports)
    }

    // ============================================
    // User-facing operations
    // ============================================

    pub fn register(&self, name: &str, phone: &str, password: &str) -> Result<Session> {
        self.users
            .register(name, phone, password)
            .map(|user| Session::from(&user))
    }

    pub fn login(&self, phone: &str, password: &str) -> Result<Session> {
        self.users.authenticate(phone, password)
    }

    /// File a report on behalf of the session's user
    pub fn submit_report(
        &self,
        session: &Session,
        resource: Resource,
        location: &str,
        description: &str,
    ) -> Result<Report> {
        self.reports
            .create(&session.phone, resource, location, description)
    }

    pub fn my_reports(&self, session: &Session) -> Result<Vec<Report>> {
        self.reports.list_by_reporter(&session.phone)
    }

    /// Whether the session's user should see the "resolved" notice
    pub fn notice(&self, session: &Session) -> Result<bool> {
        self.reports.has_resolved_notice(&session.phone)
    }

    // ============================================
    // Admin operations
    // ============================================

    /// Reports under `resource`, each joined with its reporter's name
    pub fn reports_by_resource(&self, resource: Resource) -> Result<Vec<ReportRow>> {
        let reports = self.reports.list_by_resource(resource)?;
        self.with_reporter_names(reports)
    }

    /// Every report, joined with reporter names
    pub fn all_reports(&self) -> Result<Vec<ReportRow>> {
        let reports = self.reports.list()?;
        self.with_reporter_names(reports)
    }

    pub fn set_status(&self, id: u64, status: ReportStatus) -> Result<Report> {
        self.reports.update_status(id, status)
    }

    /// Per-resource counts in dashboard order
    pub fn dashboard(&self) -> Result<Vec<(Resource, Summary)>> {
        self.analytics().summarize_all()
    }

    fn with_reporter_names(&self, reports: Vec<Report>) -> Result<Vec<ReportRow>> {
        let names: HashMap<String, String> = self
            .users
            .list()?
            .into_iter()
            .map(|u| (u.phone, u.name))
            .collect();

        Ok(reports
            .into_iter()
            .map(|report| ReportRow {
                reporter_name: names.get(&report.reporter_phone).cloned(),
                report,
            })
            .collect())
    }
}
