//! Domain records shared across the crate.
//!
//! These mirror the records served by the query service. The client never
//! creates or destroys them; it only reads and patches cached copies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AdbookError;

/// One billable entry belonging to a campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Stable identifier, immutable
    pub id: u64,
    pub name: String,
    /// Original estimate
    pub booked_amount: f64,
    /// Realized spend
    pub actual_amount: f64,
    /// User-editable correction; editable only while `reviewed` is false
    pub adjustments: f64,
    /// Approval flag
    pub reviewed: bool,
    /// Owning campaign
    pub campaign_id: u64,
    /// ISO 8601, informational only
    pub created_at: String,
    /// ISO 8601, informational only
    pub updated_at: String,
}

impl LineItem {
    /// Derived, never stored: `actual_amount + adjustments`.
    pub fn billable_amount(&self) -> f64 {
        self.actual_amount + self.adjustments
    }
}

/// Named grouping owning zero or more line items.
///
/// `reviewed` is true iff every owned line item is reviewed. It is a
/// maintained invariant, not independently settable without cascading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: u64,
    pub name: String,
    pub reviewed: bool,
}

/// Lifecycle state of an export job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStatus {
    Waiting,
    Finished,
}

impl fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportStatus::Waiting => write!(f, "waiting"),
            ExportStatus::Finished => write!(f, "finished"),
        }
    }
}

impl FromStr for ExportStatus {
    type Err = AdbookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(ExportStatus::Waiting),
            "finished" => Ok(ExportStatus::Finished),
            other => Err(AdbookError::Other(format!(
                "invalid export status '{other}'"
            ))),
        }
    }
}

/// An asynchronous CSV export, polled by token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exportation {
    /// Opaque, generated at submit time
    pub token: String,
    pub status: ExportStatus,
    /// Populated only once finished
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_item(actual: f64, adjustments: f64) -> LineItem {
        LineItem {
            id: 1,
            name: "banner".to_string(),
            booked_amount: 100.0,
            actual_amount: actual,
            adjustments,
            reviewed: false,
            campaign_id: 7,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_billable_amount_is_derived() {
        assert_eq!(line_item(120.0, -20.0).billable_amount(), 100.0);
        assert_eq!(line_item(0.0, 0.0).billable_amount(), 0.0);
    }

    #[test]
    fn test_export_status_roundtrip() {
        for status in [ExportStatus::Waiting, ExportStatus::Finished] {
            let parsed: ExportStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("done".parse::<ExportStatus>().is_err());
    }
}
