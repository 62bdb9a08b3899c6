//! One-shot import of pre-hardening flat files.
//!
//! Legacy layout (treated as schema version 0):
//! - `users.csv`: `Name,Phone,Password` with plaintext passwords
//! - `data.csv`: `Report ID,Name,Phone,Resource,Location,Description,Status,Timestamp`
//!   with `Timestamp` as `%Y-%m-%d %H:%M:%S`
//!
//! Passwords are hashed on the way in. Users whose phone already exists and
//! reports whose id already exists are left alone, so re-running an import is
//! harmless. Rows that fail to parse are counted and skipped.

use crate::credential;
use crate::error::Result;
use crate::service::Reclaim;
use crate::store::RecordStore;
use crate::types::{Report, ReportStatus, Resource, User};
use chrono::{NaiveDateTime, TimeZone, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

const LEGACY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Outcome of an import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub users_added: usize,
    /// Users skipped because the phone was already registered
    pub users_existing: usize,
    pub reports_added: usize,
    /// Reports skipped because the id was already present
    pub reports_existing: usize,
    /// Rows in either file that could not be parsed
    pub malformed: usize,
}

#[derive(Debug, Deserialize)]
struct LegacyUser {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Phone")]
    phone: String,
    #[serde(rename = "Password")]
    password: String,
}

#[derive(Debug, Deserialize)]
struct LegacyReport {
    #[serde(rename = "Report ID")]
    id: u64,
    #[serde(rename = "Phone")]
    phone: String,
    #[serde(rename = "Resource")]
    resource: Resource,
    #[serde(rename = "Location", default)]
    location: String,
    #[serde(rename = "Description", default)]
    description: String,
    #[serde(rename = "Status")]
    status: ReportStatus,
    #[serde(rename = "Timestamp")]
    timestamp: String,
}

impl LegacyReport {
    fn into_report(self) -> Option<Report> {
        let naive = NaiveDateTime::parse_from_str(&self.timestamp, LEGACY_TIMESTAMP_FORMAT).ok()?;
        Some(Report {
            id: self.id,
            reporter_phone: self.phone,
            resource: self.resource,
            location: self.location,
            description: self.description,
            status: self.status,
            created_at: Utc.from_utc_datetime(&naive),
        })
    }
}

/// Import legacy users and/or reports into `reclaim`.
pub fn import_legacy<U, R>(
    reclaim: &Reclaim<U, R>,
    users_csv: Option<&Path>,
    reports_csv: Option<&Path>,
) -> Result<ImportStats>
where
    U: RecordStore<User>,
    R: RecordStore<Report>,
{
    let mut stats = ImportStats::default();

    if let Some(path) = users_csv {
        let (rows, malformed) = read_legacy::<LegacyUser>(path)?;
        stats.malformed += malformed;

        let mut users = Vec::with_capacity(rows.len());
        for row in rows {
            if row.phone.trim().is_empty() || row.password.is_empty() {
                stats.malformed += 1;
                continue;
            }
            users.push(User {
                name: row.name,
                phone: row.phone,
                password_hash: credential::hash_password(&row.password)?,
            });
        }

        let candidates = users.len();
        stats.users_added = reclaim.users().import(users)?;
        stats.users_existing = candidates - stats.users_added;
    }

    if let Some(path) = reports_csv {
        let (rows, malformed) = read_legacy::<LegacyReport>(path)?;
        stats.malformed += malformed;

        let mut reports = Vec::with_capacity(rows.len());
        for row in rows {
            match row.into_report() {
                Some(report) => reports.push(report),
                None => stats.malformed += 1,
            }
        }

        let candidates = reports.len();
        stats.reports_added = reclaim.reports().import(reports)?;
        stats.reports_existing = candidates - stats.reports_added;
    }

    tracing::info!(
        users_added = stats.users_added,
        reports_added = stats.reports_added,
        malformed = stats.malformed,
        "Legacy import finished"
    );
    Ok(stats)
}

/// Reads every decodable row of a legacy file, counting the rest.
fn read_legacy<T: DeserializeOwned>(path: &Path) -> Result<(Vec<T>, usize)> {
    let file = File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let mut rows = Vec::new();
    let mut malformed = 0;
    for row in reader.deserialize::<T>() {
        match row {
            Ok(row) => rows.push(row),
            Err(e) => {
                if matches!(e.kind(), csv::ErrorKind::Io(_)) {
                    return Err(e.into());
                }
                tracing::warn!(path = %path.display(), error = %e, "Skipping malformed legacy row");
                malformed += 1;
            }
        }
    }
    Ok((rows, malformed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::ReportLedger;
    use crate::store::MemoryStore;
    use crate::users::UserDirectory;
    use std::fs;
    use tempfile::TempDir;

    fn reclaim() -> Reclaim<MemoryStore<User>, MemoryStore<Report>> {
        Reclaim::from_parts(
            UserDirectory::with_store(MemoryStore::new()),
            ReportLedger::with_store(MemoryStore::new()),
        )
    }

    #[test]
    fn test_import_hashes_passwords_and_keeps_ids() {
        let dir = TempDir::new().unwrap();
        let users = dir.path().join("users.csv");
        let data = dir.path().join("data.csv");
        fs::write(
            &users,
            "\"Name\",\"Phone\",\"Password\"\n\"Ann\",\"111\",\"pw\"\n\"Bob\",\"222\",\"secret\"\n",
        )
        .unwrap();
        fs::write(
            &data,
            concat!(
                "\"Report ID\",\"Name\",\"Phone\",\"Resource\",\"Location\",\"Description\",\"Status\",\"Timestamp\"\n",
                "\"1700000000\",\"Ann\",\"111\",\"Water\",\"Hostel\",\"tap, dripping\",\"Resolved\",\"2023-11-14 22:13:20\"\n",
                "\"1700000050\",\"Bob\",\"222\",\"Gas\",\"Lab\",\"\",\"Pending\",\"2023-11-14 22:14:10\"\n",
                "\"1700000100\",\"Bob\",\"222\",\"Electricity\",\"Lab\",\"\",\"Pending\",\"yesterday\"\n",
            ),
        )
        .unwrap();

        let app = reclaim();
        let stats = import_legacy(&app, Some(&users), Some(&data)).unwrap();
        assert_eq!(stats.users_added, 2);
        assert_eq!(stats.reports_added, 1);
        assert_eq!(stats.malformed, 2);

        let session = app.login("111", "pw").unwrap();
        assert_eq!(session.name, "Ann");
        assert!(app.notice(&session).unwrap());

        let report = app.reports().get(1_700_000_000).unwrap();
        assert_eq!(report.description, "tap, dripping");
        assert_eq!(report.created_at.timestamp(), 1_700_000_000);

        // Second run adds nothing.
        let again = import_legacy(&app, Some(&users), Some(&data)).unwrap();
        assert_eq!(again.users_added, 0);
        assert_eq!(again.users_existing, 2);
        assert_eq!(again.reports_added, 0);
        assert_eq!(again.reports_existing, 1);
    }

    #[test]
    fn test_new_ids_stay_above_imported_ones() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data.csv");
        fs::write(
            &data,
            concat!(
                "\"Report ID\",\"Name\",\"Phone\",\"Resource\",\"Location\",\"Description\",\"Status\",\"Timestamp\"\n",
                "\"99999999999999\",\"Ann\",\"111\",\"Water\",\"Hostel\",\"\",\"Pending\",\"2023-11-14 22:13:20\"\n",
            ),
        )
        .unwrap();

        let app = reclaim();
        import_legacy(&app, None, Some(&data)).unwrap();
        let created = app
            .reports()
            .create("111", Resource::Water, "Hostel", "")
            .unwrap();
        assert_eq!(created.id, 100_000_000_000_000);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let app = reclaim();
        let err = import_legacy(&app, Some(Path::new("/nonexistent/users.csv")), None).unwrap_err();
        assert!(matches!(err, crate::error::Error::Io(_)));
    }
}
