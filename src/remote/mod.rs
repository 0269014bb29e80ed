//! Service interfaces for the remote query and mutation endpoints.
//!
//! The persistence layer, search index, and export job runner are external
//! collaborators; this module describes them only at their interface. Reads
//! return ordered, cursor-paginated line-item pages with an authoritative
//! aggregate total; writes are idempotent remote procedures.

pub mod memory;

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::query::QueryVariables;
use crate::types::{Campaign, Exportation, LineItem};

/// Default page size for line-item queries.
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Relay-style pagination metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// One line item plus its opaque position cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemEdge {
    pub cursor: String,
    pub node: LineItem,
}

/// One page of the line-item connection.
///
/// `total` is the sum of `billable_amount` across the full result set, not
/// just this page; the client treats it as authoritative except for
/// optimistic deltas it applies itself. `campaign` is populated only for
/// campaign-filtered queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemPage {
    pub edges: Vec<LineItemEdge>,
    pub page_info: PageInfo,
    pub total: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign: Option<Campaign>,
}

/// One line-item query call: the staleness-relevant variables plus the
/// pagination continuation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageRequest {
    pub variables: QueryVariables,
    /// Continue after this cursor; `None` starts from the beginning
    pub after: Option<String>,
    /// Page size; `None` means [`DEFAULT_PAGE_SIZE`]
    pub first: Option<u32>,
}

impl PageRequest {
    pub fn first_page(variables: QueryVariables) -> Self {
        Self {
            variables,
            after: None,
            first: None,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.first.unwrap_or(DEFAULT_PAGE_SIZE)
    }
}

/// Read side of the remote service.
pub trait QueryService: Send + Sync {
    /// Fetch one page of line items for the given variables.
    fn fetch_line_items(
        &self,
        request: &PageRequest,
    ) -> impl Future<Output = Result<LineItemPage>> + Send;

    /// Look up an export job by its token.
    fn fetch_exportation(&self, token: &str) -> impl Future<Output = Result<Exportation>> + Send;
}

/// Write side of the remote service.
pub trait MutationService: Send + Sync {
    /// Set a line item's adjustments. Fails if the item is already reviewed.
    fn update_adjustments(
        &self,
        id: u64,
        value: f64,
    ) -> impl Future<Output = Result<LineItem>> + Send;

    /// Set a line item's reviewed flag to `!revoke`. The owning campaign's
    /// flag is recomputed server-side from all siblings.
    fn review_line_item(
        &self,
        id: u64,
        revoke: bool,
    ) -> impl Future<Output = Result<LineItem>> + Send;

    /// Set a campaign's reviewed flag to `!revoke`, cascading to every
    /// owned line item.
    fn review_campaign(
        &self,
        id: u64,
        revoke: bool,
    ) -> impl Future<Output = Result<Campaign>> + Send;

    /// Submit an asynchronous CSV export. Returns the opaque token to poll
    /// with; completion happens in the background.
    fn export(&self, campaign_id: Option<u64>) -> impl Future<Output = Result<String>> + Send;
}
