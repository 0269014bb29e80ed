//! Review session: the owning glue for one page's client state.
//!
//! A `ReviewSession` is created when the review view mounts and dropped on
//! navigation away; it owns the collection cache, the fetch coordinator,
//! the scroll sentinel, and the adjustment debouncer, and is the only thing
//! that writes any of them. Network responses are applied inside the
//! session method that awaited them, so a dropped session can never patch
//! the cache late: superseded or orphaned responses are ignored on arrival.
//!
//! Transient fetch and mutation errors are swallowed here and surfaced as
//! `last_error` for the UI to present; they never crash and never trigger
//! an automatic retry. Optimistic edits are not rolled back on mutation
//! failure.

use std::time::{Duration, Instant};

use crate::cache::CollectionCache;
use crate::edits::{
    AdjustmentDebouncer, DEFAULT_DEBOUNCE, apply_adjustment_edit, apply_campaign_review_toggle,
    apply_review_toggle,
};
use crate::error::{AdbookError, Result};
use crate::fetch::{FetchCoordinator, FetchKind, FetchPhase, FetchTicket};
use crate::query::{Mode, QueryState, decode_params, encode_params};
use crate::remote::{MutationService, QueryService};
use crate::scroll::ScrollSentinel;
use crate::types::Exportation;

/// Tunables for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Quiescence period before an adjustment edit is committed
    pub debounce: Duration,
    /// Page size override; `None` uses the service default
    pub page_size: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            page_size: None,
        }
    }
}

pub struct ReviewSession<S> {
    service: S,
    config: SessionConfig,
    state: QueryState,
    cache: CollectionCache,
    coordinator: FetchCoordinator,
    sentinel: ScrollSentinel,
    debouncer: AdjustmentDebouncer,
    last_error: Option<String>,
}

impl<S: QueryService + MutationService> ReviewSession<S> {
    pub fn new(service: S) -> Self {
        Self::with_config(service, SessionConfig::default())
    }

    pub fn with_config(service: S, config: SessionConfig) -> Self {
        Self {
            debouncer: AdjustmentDebouncer::new(config.debounce),
            service,
            config,
            state: QueryState::default(),
            cache: CollectionCache::new(),
            coordinator: FetchCoordinator::new(),
            sentinel: ScrollSentinel::new(),
            last_error: None,
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn cache(&self) -> &CollectionCache {
        &self.cache
    }

    pub fn query_state(&self) -> &QueryState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.resolve().mode
    }

    pub fn phase(&self) -> FetchPhase {
        self.coordinator.phase()
    }

    pub fn is_loading(&self) -> bool {
        !self.coordinator.is_idle()
    }

    /// The externally visible location query string for the current state.
    pub fn location_query(&self) -> String {
        encode_params(&self.state)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn take_last_error(&mut self) -> Option<String> {
        self.last_error.take()
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// React to a location change. Decoding never fails; malformed input
    /// degrades to AllMode.
    pub async fn handle_location_change(&mut self, query: &str) {
        self.set_query_state(decode_params(query)).await;
    }

    /// Apply a new query state, fetching only when the resolved variables
    /// actually changed.
    pub async fn set_query_state(&mut self, state: QueryState) {
        self.state = state;
        let resolved = self.state.resolve();
        let ticket = self
            .coordinator
            .set_query(resolved.variables, self.cache.is_populated());
        if let Some(ticket) = ticket {
            self.run_fetch(ticket).await;
        }
    }

    // ------------------------------------------------------------------
    // Infinite scroll
    // ------------------------------------------------------------------

    /// Feed a sentinel visibility change; issues at most one pagination
    /// fetch per exposure, and none at all while another fetch is running.
    pub async fn handle_visibility(&mut self, visible: bool) {
        if !self.sentinel.observe(visible, self.coordinator.is_idle()) {
            return;
        }
        let end_cursor = self.cache.end_cursor().map(str::to_string);
        let ticket = self
            .coordinator
            .request_more(end_cursor, self.cache.has_next_page());
        if let Some(ticket) = ticket {
            self.run_fetch(ticket).await;
        }
    }

    async fn run_fetch(&mut self, ticket: FetchTicket) {
        let mut request = ticket.request.clone();
        if request.first.is_none() {
            request.first = self.config.page_size;
        }

        match self.service.fetch_line_items(&request).await {
            Ok(page) => {
                if !self.coordinator.complete_success(&ticket) {
                    // Superseded while in flight; drop the response
                    return;
                }
                match ticket.kind {
                    FetchKind::Fresh => {
                        self.cache.replace(page);
                        self.sentinel.rearm(self.cache.has_next_page());
                    }
                    FetchKind::More => {
                        self.cache.append(
                            ticket.request.after.as_deref(),
                            page.edges,
                            page.page_info,
                        );
                        self.sentinel.update(self.cache.has_next_page());
                    }
                }
            }
            Err(e) => {
                tracing::warn!(kind = ?ticket.kind, "fetch failed: {e}");
                self.coordinator.complete_failure(&ticket);
                if ticket.kind == FetchKind::More {
                    // Existing edges stay visible; allow another attempt
                    self.sentinel.rearm(self.cache.has_next_page());
                }
                self.last_error = Some(e.to_string());
            }
        }
    }

    // ------------------------------------------------------------------
    // Optimistic edits
    // ------------------------------------------------------------------

    /// Record one adjustment input: the cache and total update immediately,
    /// the remote commit waits for quiescence. Refused (with no cache
    /// change) when the row is reviewed or unknown.
    pub fn edit_adjustments(&mut self, id: u64, value: f64, now: Instant) -> Result<()> {
        apply_adjustment_edit(&mut self.cache, id, value)?;
        self.debouncer.input(id, value, now);
        Ok(())
    }

    /// Commit every adjustment whose quiescence period has elapsed. Only
    /// the final value per record goes to the wire.
    pub async fn flush_due_edits(&mut self, now: Instant) {
        for (id, value) in self.debouncer.due(now) {
            self.commit_adjustment(id, value).await;
        }
    }

    /// Sleep until the earliest pending deadline, then commit. Returns
    /// immediately when nothing is pending.
    pub async fn flush_pending_edits(&mut self) {
        while let Some(deadline) = self.debouncer.next_deadline() {
            tokio::time::sleep_until(deadline.into()).await;
            self.flush_due_edits(Instant::now()).await;
        }
    }

    async fn commit_adjustment(&mut self, id: u64, value: f64) {
        if let Err(e) = self.service.update_adjustments(id, value).await {
            // Deliberately no rollback of the optimistic value
            tracing::warn!("update_adjustments({id}) failed: {e}");
            self.last_error = Some(e.to_string());
        }
    }

    /// Toggle one line item's reviewed checkbox. The cache (and, in
    /// campaign views, the campaign flag recomputed from cached siblings)
    /// updates synchronously before the mutation is issued.
    pub async fn toggle_review(&mut self, id: u64, checked: bool) -> Result<()> {
        let in_campaign_mode = matches!(self.mode(), Mode::Campaign { .. });
        apply_review_toggle(&mut self.cache, in_campaign_mode, id, checked)?;

        // A row becoming read-only must not leave an uncommitted edit
        // behind; send the final value first so last-write-wins holds
        if let Some(pending) = self.debouncer.cancel(id) {
            self.commit_adjustment(id, pending).await;
        }

        if let Err(e) = self.service.review_line_item(id, !checked).await {
            tracing::warn!("review_line_item({id}) failed: {e}");
            self.last_error = Some(e.to_string());
        }
        Ok(())
    }

    /// Toggle the campaign-level checkbox: cascade to every cached sibling
    /// plus the campaign flag, then issue the campaign mutation.
    pub async fn toggle_campaign_review(&mut self, checked: bool) -> Result<()> {
        let Mode::Campaign { campaign_id } = self.mode() else {
            return Err(AdbookError::Other(
                "campaign review toggle outside campaign view".to_string(),
            ));
        };
        apply_campaign_review_toggle(&mut self.cache, checked);

        if let Err(e) = self.service.review_campaign(campaign_id, !checked).await {
            tracing::warn!("review_campaign({campaign_id}) failed: {e}");
            self.last_error = Some(e.to_string());
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    /// Submit a CSV export scoped to the current view's campaign, if any.
    /// Returns the token to poll with.
    pub async fn submit_export(&mut self) -> Result<String> {
        let campaign_id = match self.mode() {
            Mode::Campaign { campaign_id } => Some(campaign_id),
            _ => None,
        };
        self.service.export(campaign_id).await
    }

    /// Single-shot status poll; cadence is the caller's.
    pub async fn poll_export(&self, token: &str) -> Result<Exportation> {
        self.service.fetch_exportation(token).await
    }
}
