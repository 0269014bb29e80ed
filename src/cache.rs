//! The remote collection cache.
//!
//! Holds the last-fetched page set of line items (and, for campaign views,
//! the parent campaign) for the active query. This is the single shared
//! mutable resource in the client core: every write goes through the entry
//! points here, so unrelated entries are never invalidated and nothing else
//! touches the data behind the renderer's back.
//!
//! The cache is explicitly owned by its session; it is created per
//! page/session and discarded on navigation away. No process-wide state.

use crate::remote::{LineItemEdge, LineItemPage, PageInfo};
use crate::types::{Campaign, LineItem};

/// Field patch for exactly one cached line item.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RecordPatch {
    pub adjustments: Option<f64>,
    pub reviewed: Option<bool>,
}

impl RecordPatch {
    pub fn adjustments(value: f64) -> Self {
        Self {
            adjustments: Some(value),
            ..Default::default()
        }
    }

    pub fn reviewed(value: bool) -> Self {
        Self {
            reviewed: Some(value),
            ..Default::default()
        }
    }
}

/// Cached page set for the active query.
#[derive(Debug, Clone, Default)]
pub struct CollectionCache {
    edges: Vec<LineItemEdge>,
    page_info: PageInfo,
    /// Server-authoritative sum of billable amounts across the full result
    /// set, adjusted by optimistic deltas until the next replace
    total: f64,
    campaign: Option<Campaign>,
    /// Whether any page has been loaded since creation or the last clear
    populated: bool,
}

impl CollectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn edges(&self) -> &[LineItemEdge] {
        &self.edges
    }

    pub fn line_items(&self) -> impl Iterator<Item = &LineItem> {
        self.edges.iter().map(|edge| &edge.node)
    }

    pub fn get(&self, id: u64) -> Option<&LineItem> {
        self.edges
            .iter()
            .map(|edge| &edge.node)
            .find(|item| item.id == id)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn is_populated(&self) -> bool {
        self.populated
    }

    pub fn page_info(&self) -> &PageInfo {
        &self.page_info
    }

    pub fn has_next_page(&self) -> bool {
        self.page_info.has_next_page
    }

    pub fn end_cursor(&self) -> Option<&str> {
        self.page_info.end_cursor.as_deref()
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn campaign(&self) -> Option<&Campaign> {
        self.campaign.as_ref()
    }

    /// True iff every cached line item is reviewed. Meaningful for campaign
    /// views, where the cache holds the campaign's full sibling set as far
    /// as it has been paginated in.
    pub fn all_reviewed(&self) -> bool {
        !self.edges.is_empty() && self.edges.iter().all(|edge| edge.node.reviewed)
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Full overwrite on a fresh query or filter/sort change.
    pub fn replace(&mut self, page: LineItemPage) {
        self.edges = page.edges;
        self.page_info = page.page_info;
        self.total = page.total;
        self.campaign = page.campaign;
        self.populated = true;
    }

    /// Pagination extend. `requested_after` is the cursor the triggering
    /// fetch was issued with; a mismatch with the current end cursor means
    /// the page set changed underneath the request, and the append is
    /// discarded. Existing edges are never reordered; incoming edges that
    /// duplicate a cached id are dropped. `total` is left untouched.
    ///
    /// Returns whether the append was applied.
    pub fn append(
        &mut self,
        requested_after: Option<&str>,
        new_edges: Vec<LineItemEdge>,
        new_page_info: PageInfo,
    ) -> bool {
        if requested_after != self.end_cursor() {
            tracing::debug!(
                requested_after,
                end_cursor = self.end_cursor(),
                "discarding stale append"
            );
            return false;
        }

        let existing: std::collections::HashSet<u64> =
            self.edges.iter().map(|edge| edge.node.id).collect();
        self.edges
            .extend(new_edges.into_iter().filter(|e| !existing.contains(&e.node.id)));
        self.page_info = new_page_info;
        true
    }

    /// Update exactly one line item's fields, leaving all others and the
    /// overall shape untouched. Returns whether the id was present.
    pub fn patch_record(&mut self, id: u64, patch: RecordPatch) -> bool {
        let Some(item) = self
            .edges
            .iter_mut()
            .map(|edge| &mut edge.node)
            .find(|item| item.id == id)
        else {
            return false;
        };

        if let Some(adjustments) = patch.adjustments {
            item.adjustments = adjustments;
        }
        if let Some(reviewed) = patch.reviewed {
            item.reviewed = reviewed;
        }
        true
    }

    /// Apply an optimistic delta to the aggregate total ahead of server
    /// confirmation.
    pub fn apply_total_delta(&mut self, delta: f64) {
        self.total += delta;
    }

    /// Campaign views only: set every cached line item's reviewed flag and
    /// the parent campaign's flag in one step.
    pub fn patch_campaign_cascade(&mut self, reviewed: bool) {
        for edge in &mut self.edges {
            edge.node.reviewed = reviewed;
        }
        if let Some(campaign) = &mut self.campaign {
            campaign.reviewed = reviewed;
        }
    }

    /// Recompute the campaign's reviewed flag from the cached siblings.
    /// Returns the new value, or `None` when no campaign is cached.
    pub fn recompute_campaign_reviewed(&mut self) -> Option<bool> {
        let reviewed = self.all_reviewed();
        let campaign = self.campaign.as_mut()?;
        campaign.reviewed = reviewed;
        Some(reviewed)
    }
}
