//! Sortable fields and the canonical/wire name table.
//!
//! The client speaks canonical camel-case names (what appears in the
//! location query string); the query service speaks snake-case column
//! names. The mapping is fixed and bidirectional.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AdbookError;

/// A field line items can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortField {
    Name,
    BookedAmount,
    ActualAmount,
    Adjustments,
    CampaignName,
    /// Derived column: `actual_amount + adjustments`
    BillableAmount,
}

impl SortField {
    /// All fields, in display order.
    pub const ALL: [SortField; 6] = [
        SortField::Name,
        SortField::BookedAmount,
        SortField::ActualAmount,
        SortField::Adjustments,
        SortField::CampaignName,
        SortField::BillableAmount,
    ];

    /// Canonical name used in the location query string.
    pub fn canonical(self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::BookedAmount => "bookedAmount",
            SortField::ActualAmount => "actualAmount",
            SortField::Adjustments => "adjustments",
            SortField::CampaignName => "campaignName",
            SortField::BillableAmount => "billableAmount",
        }
    }

    /// Column name the query service expects.
    pub fn wire(self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::BookedAmount => "booked_amount",
            SortField::ActualAmount => "actual_amount",
            SortField::Adjustments => "adjustments",
            SortField::CampaignName => "campaigns.name",
            SortField::BillableAmount => "billable_amount",
        }
    }

    /// Resolve a canonical name. Unknown names yield `None` rather than an
    /// error: an unrecognized sort parameter means "no active sort".
    pub fn from_canonical(s: &str) -> Option<Self> {
        SortField::ALL.iter().copied().find(|f| f.canonical() == s)
    }

    /// Resolve a wire column name.
    pub fn from_wire(s: &str) -> Option<Self> {
        SortField::ALL.iter().copied().find(|f| f.wire() == s)
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

impl FromStr for SortField {
    type Err = AdbookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortField::from_canonical(s).ok_or_else(|| AdbookError::InvalidSortField(s.to_string()))
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

impl Direction {
    pub fn wire(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "ASC" => Some(Direction::Asc),
            "DESC" => Some(Direction::Desc),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire())
    }
}

impl FromStr for Direction {
    type Err = AdbookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Direction::from_wire(s).ok_or_else(|| AdbookError::InvalidDirection(s.to_string()))
    }
}
