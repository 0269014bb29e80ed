//! Query state and mode resolution.
//!
//! `QueryState` is the canonical in-memory descriptor of what the user is
//! looking at: an optional campaign filter, an optional free-text search,
//! and an optional sort. Exactly one of three view modes is active at a
//! time; `resolve` picks it and produces the variables the query service
//! needs. Resolution is pure and stable so the fetch coordinator can detect
//! no-op transitions by comparing variables.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AdbookError;

pub mod params;
pub mod sort;

pub use params::{decode_params, encode_params};
pub use sort::{Direction, SortField};

/// Which record name a free-text search matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    LineItem,
    Campaign,
}

impl SearchField {
    pub fn wire(self) -> &'static str {
        match self {
            SearchField::LineItem => "line_item",
            SearchField::Campaign => "campaign",
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire())
    }
}

impl FromStr for SearchField {
    type Err = AdbookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "line_item" => Ok(SearchField::LineItem),
            "campaign" => Ok(SearchField::Campaign),
            other => Err(AdbookError::InvalidSearchField(other.to_string())),
        }
    }
}

/// A free-text search over line-item or campaign names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Search {
    pub field: SearchField,
    pub value: String,
}

/// An explicit sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: SortField,
    pub direction: Direction,
}

/// Canonical filter/sort/mode descriptor, decoded from the location query
/// string. Holds everything the wire state holds; mode precedence is applied
/// at `resolve` time, not here, so encoding it back is lossless.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct QueryState {
    pub campaign: Option<u64>,
    pub search: Option<Search>,
    pub order_by: Option<OrderBy>,
}

/// The three mutually exclusive view modes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Mode {
    All,
    Campaign { campaign_id: u64 },
    Search { field: SearchField, value: String },
}

/// Variables for one query-service call, minus the pagination cursor.
///
/// This is also the staleness key: a response is applied only if the
/// variables it was issued under still equal the current ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct QueryVariables {
    pub campaign: Option<u64>,
    pub search: Option<Search>,
    pub order_by: Option<OrderBy>,
}

/// Result of mode resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub mode: Mode,
    pub variables: QueryVariables,
}

impl QueryState {
    /// Determine the active mode and the query variables to run.
    ///
    /// Precedence: a campaign filter always wins over search parameters; the
    /// search parameters are dropped from the variables but stay in the
    /// state (the codec never mutates wire state). A search with an empty
    /// value is not a query and falls through to AllMode.
    pub fn resolve(&self) -> Resolved {
        if let Some(campaign_id) = self.campaign {
            return Resolved {
                mode: Mode::Campaign { campaign_id },
                variables: QueryVariables {
                    campaign: Some(campaign_id),
                    search: None,
                    order_by: self.order_by,
                },
            };
        }

        if let Some(search) = &self.search
            && !search.value.is_empty()
        {
            return Resolved {
                mode: Mode::Search {
                    field: search.field,
                    value: search.value.clone(),
                },
                variables: QueryVariables {
                    campaign: None,
                    search: Some(search.clone()),
                    order_by: self.order_by,
                },
            };
        }

        Resolved {
            mode: Mode::All,
            variables: QueryVariables {
                campaign: None,
                search: None,
                order_by: self.order_by,
            },
        }
    }
}
