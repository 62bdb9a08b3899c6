//! Core domain types for reclaimx
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **User** | A registered campus member, identified by phone number |
//! | **Report** | One wastage incident submitted by a User |
//! | **Resource** | The category a report is filed under |
//! | **Status** | Report lifecycle marker, Pending or Resolved |
//! | **Session** | Identity returned by authentication and passed into each call |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::store::Record;

// ============================================
// Resource
// ============================================

/// Classification axis for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resource {
    Electricity,
    Water,
    Infrastructure,
}

impl Resource {
    /// Every category, in dashboard order
    pub const ALL: [Resource; 3] = [
        Resource::Electricity,
        Resource::Water,
        Resource::Infrastructure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Electricity => "Electricity",
            Resource::Water => "Water",
            Resource::Infrastructure => "Infrastructure",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "electricity" => Ok(Resource::Electricity),
            "water" => Ok(Resource::Water),
            "infrastructure" => Ok(Resource::Infrastructure),
            _ => Err(format!("unknown resource: {}", s)),
        }
    }
}

// ============================================
// Status
// ============================================

/// Report lifecycle marker
///
/// Admins may set either value at any time; an update is an overwrite, not a
/// forward-only transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReportStatus {
    #[default]
    Pending,
    Resolved,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "Pending",
            ReportStatus::Resolved => "Resolved",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(ReportStatus::Pending),
            "resolved" => Ok(ReportStatus::Resolved),
            _ => Err(format!("unknown status: {}", s)),
        }
    }
}

// ============================================
// User
// ============================================

/// A registered account.
///
/// `password_hash` is an Argon2id PHC string; the plaintext never reaches
/// the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    /// Unique identity key
    pub phone: String,
    #[serde(rename = "password")]
    pub password_hash: String,
}

impl Record for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &["name", "phone", "password"];
    const SCHEMA_VERSION: u32 = 1;
}

/// Authenticated identity handed back to the caller.
///
/// The core keeps no login state; frontends pass this into every call made on
/// behalf of the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub name: String,
    pub phone: String,
}

impl From<&User> for Session {
    fn from(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            phone: user.phone.clone(),
        }
    }
}

// ============================================
// Report
// ============================================

/// A single wastage incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Assigned once at creation, never changed
    pub id: u64,
    pub reporter_phone: String,
    pub resource: Resource,
    pub location: String,
    pub description: String,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
}

impl Report {
    pub fn is_resolved(&self) -> bool {
        self.status == ReportStatus::Resolved
    }
}

impl Record for Report {
    const TABLE: &'static str = "reports";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "reporterPhone",
        "resource",
        "location",
        "description",
        "status",
        "createdAt",
    ];
    const SCHEMA_VERSION: u32 = 1;
}

/// Report joined with the reporter's display name, for admin listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    #[serde(flatten)]
    pub report: Report,
    /// `None` when the reporter phone has no matching user
    pub reporter_name: Option<String>,
}
