//! The fetch coordinator.
//!
//! Decides, on every relevant state change, whether to issue a fresh query,
//! extend the current one, or skip, and serializes the two so at most one
//! fresh fetch and one extend fetch are ever in flight. There is no network
//! cancellation primitive: superseded responses are detected on arrival and
//! ignored.
//!
//! The coordinator is sans-IO. Callers ask it for a [`FetchTicket`], run the
//! request however they like, and hand the ticket back with the outcome.
//! The ticket carries the variables snapshot the call was issued under plus
//! an issue generation; a response is stale when either no longer matches.

use crate::query::QueryVariables;
use crate::remote::PageRequest;

/// Coordinator phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPhase {
    #[default]
    Idle,
    /// Initial load, nothing cached yet
    FetchingFresh,
    /// Pagination extend
    FetchingMore,
    /// Parameter change with prior data still displayed
    Refreshing,
}

/// What kind of fetch a ticket stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Fresh,
    More,
}

/// Receipt for one issued fetch. Hand it back via `complete_success` /
/// `complete_failure` when the response arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub kind: FetchKind,
    pub request: PageRequest,
    generation: u64,
}

#[derive(Debug, Default)]
pub struct FetchCoordinator {
    phase: FetchPhase,
    current: QueryVariables,
    has_query: bool,
    /// Bumped on every fresh issue; in-flight tickets from older
    /// generations are superseded
    generation: u64,
}

impl FetchCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> FetchPhase {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == FetchPhase::Idle
    }

    pub fn current_variables(&self) -> &QueryVariables {
        &self.current
    }

    /// Register a (possibly changed) query. Returns a fresh-fetch ticket,
    /// or `None` when the variables are unchanged and nothing needs to run.
    ///
    /// A change arriving while a "more" fetch is in flight supersedes it:
    /// the generation bump makes the in-flight response stale on arrival.
    pub fn set_query(&mut self, variables: QueryVariables, populated: bool) -> Option<FetchTicket> {
        if self.has_query && variables == self.current && self.phase != FetchPhase::Idle {
            // Identical query already being fetched
            return None;
        }
        if self.has_query && variables == self.current && populated {
            // No-op transition, cache already holds this query
            return None;
        }

        self.has_query = true;
        self.current = variables.clone();
        self.generation += 1;
        self.phase = if populated {
            FetchPhase::Refreshing
        } else {
            FetchPhase::FetchingFresh
        };

        tracing::debug!(phase = ?self.phase, generation = self.generation, "issuing fresh fetch");
        Some(FetchTicket {
            kind: FetchKind::Fresh,
            request: PageRequest::first_page(variables),
            generation: self.generation,
        })
    }

    /// Ask for the next page. Only honored while idle with a known query
    /// and a next page to get; anything else returns `None` without side
    /// effects (a scroll trigger firing mid-fetch is simply ignored).
    pub fn request_more(
        &mut self,
        end_cursor: Option<String>,
        has_next_page: bool,
    ) -> Option<FetchTicket> {
        if !self.has_query || self.phase != FetchPhase::Idle || !has_next_page {
            return None;
        }

        self.phase = FetchPhase::FetchingMore;
        tracing::debug!(generation = self.generation, "issuing pagination fetch");
        Some(FetchTicket {
            kind: FetchKind::More,
            request: PageRequest {
                variables: self.current.clone(),
                after: end_cursor,
                first: None,
            },
            generation: self.generation,
        })
    }

    /// Whether a ticket's response may still be applied.
    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        ticket.generation == self.generation && ticket.request.variables == self.current
    }

    /// Record a successful response. Returns true when the response is
    /// current and the caller should apply it to the cache; a stale ticket
    /// returns false and leaves the phase of the superseding fetch alone.
    pub fn complete_success(&mut self, ticket: &FetchTicket) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(kind = ?ticket.kind, "ignoring stale fetch response");
            return false;
        }
        self.phase = FetchPhase::Idle;
        true
    }

    /// Record a failed response. The cache is left untouched by contract;
    /// the coordinator returns to idle so the user can retry. No automatic
    /// retry is performed.
    pub fn complete_failure(&mut self, ticket: &FetchTicket) {
        if self.is_current(ticket) {
            self.phase = FetchPhase::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Direction, OrderBy, QueryVariables, SortField};

    fn vars_with_campaign(id: u64) -> QueryVariables {
        QueryVariables {
            campaign: Some(id),
            ..Default::default()
        }
    }

    #[test]
    fn test_initial_query_is_fetching_fresh() {
        let mut fc = FetchCoordinator::new();
        let ticket = fc.set_query(QueryVariables::default(), false).unwrap();
        assert_eq!(ticket.kind, FetchKind::Fresh);
        assert_eq!(ticket.request.after, None);
        assert_eq!(fc.phase(), FetchPhase::FetchingFresh);

        assert!(fc.complete_success(&ticket));
        assert!(fc.is_idle());
    }

    #[test]
    fn test_unchanged_query_is_skipped() {
        let mut fc = FetchCoordinator::new();
        let ticket = fc.set_query(QueryVariables::default(), false).unwrap();
        fc.complete_success(&ticket);

        assert!(fc.set_query(QueryVariables::default(), true).is_none());
        assert!(fc.is_idle());
    }

    #[test]
    fn test_parameter_change_with_data_is_refreshing() {
        let mut fc = FetchCoordinator::new();
        let t1 = fc.set_query(QueryVariables::default(), false).unwrap();
        fc.complete_success(&t1);

        let t2 = fc.set_query(vars_with_campaign(3), true).unwrap();
        assert_eq!(fc.phase(), FetchPhase::Refreshing);
        assert!(fc.complete_success(&t2));
    }

    #[test]
    fn test_request_more_only_while_idle_with_next_page() {
        let mut fc = FetchCoordinator::new();
        assert!(fc.request_more(Some("c5".into()), true).is_none()); // no query yet

        let t1 = fc.set_query(QueryVariables::default(), false).unwrap();
        assert!(fc.request_more(Some("c5".into()), true).is_none()); // fetch in flight
        fc.complete_success(&t1);

        assert!(fc.request_more(Some("c5".into()), false).is_none()); // no next page

        let more = fc.request_more(Some("c5".into()), true).unwrap();
        assert_eq!(more.kind, FetchKind::More);
        assert_eq!(more.request.after.as_deref(), Some("c5"));
        assert_eq!(fc.phase(), FetchPhase::FetchingMore);

        // Re-triggering while the more fetch is outstanding is ignored
        assert!(fc.request_more(Some("c5".into()), true).is_none());
    }

    #[test]
    fn test_parameter_change_supersedes_inflight_more() {
        let mut fc = FetchCoordinator::new();
        let t1 = fc.set_query(QueryVariables::default(), false).unwrap();
        fc.complete_success(&t1);
        let more = fc.request_more(Some("c5".into()), true).unwrap();

        // Variables change while the more fetch is outstanding
        let fresh = fc.set_query(vars_with_campaign(7), true).unwrap();
        assert_eq!(fc.phase(), FetchPhase::Refreshing);

        // The stale more response must not be applied, and must not
        // disturb the superseding fetch
        assert!(!fc.complete_success(&more));
        assert_eq!(fc.phase(), FetchPhase::Refreshing);

        assert!(fc.complete_success(&fresh));
        assert!(fc.is_idle());
    }

    #[test]
    fn test_same_variables_reissued_still_supersede_old_more() {
        // A -> B -> A while a more fetch issued under A is in flight: the
        // generation makes the old response stale even though the variables
        // compare equal again.
        let mut fc = FetchCoordinator::new();
        let a = QueryVariables {
            order_by: Some(OrderBy {
                field: SortField::Name,
                direction: Direction::Asc,
            }),
            ..Default::default()
        };

        let t1 = fc.set_query(a.clone(), false).unwrap();
        fc.complete_success(&t1);
        let more = fc.request_more(Some("c1".into()), true).unwrap();

        let t2 = fc.set_query(vars_with_campaign(1), true).unwrap();
        assert!(!fc.complete_success(&more));
        fc.complete_success(&t2);

        let t3 = fc.set_query(a, true).unwrap();
        assert!(!fc.complete_success(&more));
        assert!(fc.complete_success(&t3));
    }

    #[test]
    fn test_failure_returns_to_idle_without_apply() {
        let mut fc = FetchCoordinator::new();
        let t1 = fc.set_query(QueryVariables::default(), false).unwrap();
        fc.complete_failure(&t1);
        assert!(fc.is_idle());

        // A stale failure does not knock a newer fetch out of flight
        let t2 = fc.set_query(vars_with_campaign(2), false).unwrap();
        let t3 = fc.set_query(vars_with_campaign(3), false).unwrap();
        fc.complete_failure(&t2);
        assert_eq!(fc.phase(), FetchPhase::FetchingFresh);
        fc.complete_failure(&t3);
        assert!(fc.is_idle());
    }
}
