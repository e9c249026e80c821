//! Tabular and JSON export of the audit trail.
//!
//! The CSV column order is fixed for downstream compliance tooling:
//!
//! ```text
//! timestamp,actor,role,action,targetId,details,origin
//! ```

use std::io::Write;

use crate::Result;
use crate::entry::AuditLogEntry;
use crate::log::{AuditFilter, AuditLog};

/// Header row of the CSV export.
pub const CSV_HEADER: [&str; 7] = [
    "timestamp",
    "actor",
    "role",
    "action",
    "targetId",
    "details",
    "origin",
];

impl AuditLog {
    /// Writes every entry matching `filter` as CSV, oldest first.
    ///
    /// Returns the number of data rows written.
    pub fn export_csv<W: Write>(&self, filter: &AuditFilter, mut writer: W) -> Result<usize> {
        writeln!(writer, "{}", CSV_HEADER.join(","))?;
        let mut rows = 0;
        for entry in self.query(filter.clone())? {
            writeln!(writer, "{}", csv_row(&entry?))?;
            rows += 1;
        }
        writer.flush()?;
        Ok(rows)
    }

    /// Writes every entry matching `filter` as a pretty-printed JSON array.
    ///
    /// Returns the number of entries written.
    pub fn export_json<W: Write>(&self, filter: &AuditFilter, mut writer: W) -> Result<usize> {
        let entries = self
            .query(filter.clone())?
            .collect::<Result<Vec<AuditLogEntry>>>()?;
        serde_json::to_writer_pretty(&mut writer, &entries)?;
        writer.flush()?;
        Ok(entries.len())
    }
}

fn csv_row(entry: &AuditLogEntry) -> String {
    let timestamp = entry.timestamp.to_rfc3339();
    let origin = entry.origin.to_string();
    [
        timestamp.as_str(),
        entry.actor.id(),
        entry.actor.role_label(),
        entry.action_type.as_str(),
        entry.target.target_id.as_str(),
        entry.details.as_str(),
        origin.as_str(),
    ]
    .iter()
    .map(|field| csv_escape(field))
    .collect::<Vec<_>>()
    .join(",")
}

/// Escape a CSV field value
///
/// Fields containing commas, quotes or line breaks are wrapped in double
/// quotes with inner quotes doubled.
fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        let escaped = field.replace('"', "\"\"");
        format!("\"{escaped}\"")
    } else {
        field.to_string()
    }
}
