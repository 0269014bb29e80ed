//! Optimistic edit pipeline.
//!
//! Inline adjustment edits and review toggles share one pattern: patch the
//! cache synchronously, bump the derived aggregate, then confirm with the
//! remote mutation. A failed mutation is reported but the optimistic value
//! is deliberately not reverted.
//!
//! Adjustment commits are debounced with an explicit coalescing timer: each
//! new input resets the deadline, and only the last value before the
//! quiescence period elapses is sent. Every intermediate value is still
//! applied to the cache so the UI tracks the keystrokes.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::cache::{CollectionCache, RecordPatch};
use crate::error::{AdbookError, Result};

/// Default quiescence period before an adjustment edit is committed.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, Copy)]
struct PendingEdit {
    value: f64,
    deadline: Instant,
}

/// Coalescing timer for adjustment commits, keyed by record identity so
/// concurrent edits to different rows never interfere.
///
/// Time is passed in by the caller; the session pairs this with a tokio
/// sleep, tests drive it directly.
#[derive(Debug)]
pub struct AdjustmentDebouncer {
    delay: Duration,
    pending: HashMap<u64, PendingEdit>,
}

impl AdjustmentDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: HashMap::new(),
        }
    }

    /// Record an input, resetting the record's deadline.
    pub fn input(&mut self, id: u64, value: f64, now: Instant) {
        self.pending.insert(
            id,
            PendingEdit {
                value,
                deadline: now + self.delay,
            },
        );
    }

    /// Drain every edit whose quiescence period has elapsed.
    pub fn due(&mut self, now: Instant) -> Vec<(u64, f64)> {
        let ids: Vec<u64> = self
            .pending
            .iter()
            .filter(|(_, edit)| edit.deadline <= now)
            .map(|(id, _)| *id)
            .collect();
        ids.into_iter()
            .filter_map(|id| self.pending.remove(&id).map(|edit| (id, edit.value)))
            .collect()
    }

    /// Drop a pending edit without committing (view unmounted, row became
    /// reviewed). Returns the uncommitted value.
    pub fn cancel(&mut self, id: u64) -> Option<f64> {
        self.pending.remove(&id).map(|edit| edit.value)
    }

    /// Earliest pending deadline, for scheduling the wakeup.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|edit| edit.deadline).min()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Default for AdjustmentDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

/// Apply an adjustment edit to the cache ahead of server confirmation.
///
/// Mirrors the server rule that a reviewed line item is read-only, so an
/// illegal edit never reaches the wire. Returns the total delta that was
/// applied.
pub fn apply_adjustment_edit(cache: &mut CollectionCache, id: u64, new_value: f64) -> Result<f64> {
    let item = cache
        .get(id)
        .ok_or_else(|| AdbookError::LineItemNotFound(id.to_string()))?;
    if item.reviewed {
        return Err(AdbookError::LineItemReviewed);
    }

    let delta = new_value - item.adjustments;
    cache.patch_record(id, RecordPatch::adjustments(new_value));
    cache.apply_total_delta(delta);
    Ok(delta)
}

/// Apply a single line item's review toggle.
///
/// In campaign views the campaign flag is recomputed from the cached
/// siblings with no extra round trip: checking the last unreviewed sibling
/// flips the campaign to reviewed, unchecking any sibling flips it back.
/// Returns the campaign's new flag when one was recomputed.
pub fn apply_review_toggle(
    cache: &mut CollectionCache,
    in_campaign_mode: bool,
    id: u64,
    checked: bool,
) -> Result<Option<bool>> {
    if !cache.patch_record(id, RecordPatch::reviewed(checked)) {
        return Err(AdbookError::LineItemNotFound(id.to_string()));
    }

    if in_campaign_mode {
        Ok(cache.recompute_campaign_reviewed())
    } else {
        Ok(None)
    }
}

/// Apply a campaign-level review toggle: every cached sibling plus the
/// campaign flag in one cascade.
pub fn apply_campaign_review_toggle(cache: &mut CollectionCache, checked: bool) {
    cache.patch_campaign_cascade(checked);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{LineItemEdge, LineItemPage, PageInfo};
    use crate::types::{Campaign, LineItem};

    fn item(id: u64, adjustments: f64, reviewed: bool) -> LineItem {
        LineItem {
            id,
            name: format!("item-{id}"),
            booked_amount: 10.0,
            actual_amount: 10.0,
            adjustments,
            reviewed,
            campaign_id: 1,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    fn campaign_cache(items: Vec<LineItem>, total: f64) -> CollectionCache {
        let mut cache = CollectionCache::new();
        cache.replace(LineItemPage {
            edges: items
                .into_iter()
                .map(|node| LineItemEdge {
                    cursor: format!("c{}", node.id),
                    node,
                })
                .collect(),
            page_info: PageInfo::default(),
            total,
            campaign: Some(Campaign {
                id: 1,
                name: "Spring".to_string(),
                reviewed: false,
            }),
        });
        cache
    }

    #[test]
    fn test_debouncer_coalesces_rapid_edits() {
        let mut debouncer = AdjustmentDebouncer::new(Duration::from_millis(400));
        let start = Instant::now();

        debouncer.input(1, 10.0, start);
        debouncer.input(1, 12.0, start + Duration::from_millis(200));
        debouncer.input(1, 15.0, start + Duration::from_millis(350));

        // Deadline keeps moving with each input
        assert!(debouncer.due(start + Duration::from_millis(700)).is_empty());

        let due = debouncer.due(start + Duration::from_millis(750));
        assert_eq!(due, vec![(1, 15.0)]);
        assert!(debouncer.is_empty());
    }

    #[test]
    fn test_debouncer_keys_by_record() {
        let mut debouncer = AdjustmentDebouncer::new(Duration::from_millis(400));
        let start = Instant::now();

        debouncer.input(1, 1.0, start);
        debouncer.input(2, 2.0, start + Duration::from_millis(100));

        let mut due = debouncer.due(start + Duration::from_millis(450));
        due.sort_by_key(|(id, _)| *id);
        assert_eq!(due, vec![(1, 1.0)]);

        assert_eq!(
            debouncer.due(start + Duration::from_millis(550)),
            vec![(2, 2.0)]
        );
    }

    #[test]
    fn test_debouncer_cancel() {
        let mut debouncer = AdjustmentDebouncer::default();
        let start = Instant::now();
        debouncer.input(1, 3.0, start);
        assert_eq!(debouncer.cancel(1), Some(3.0));
        assert!(debouncer.due(start + Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn test_adjustment_edit_bumps_total_by_delta() {
        let mut cache = campaign_cache(vec![item(1, 10.0, false)], 100.0);
        let delta = apply_adjustment_edit(&mut cache, 1, 15.0).unwrap();
        assert_eq!(delta, 5.0);
        assert_eq!(cache.total(), 105.0);
        assert_eq!(cache.get(1).unwrap().adjustments, 15.0);
    }

    #[test]
    fn test_adjustment_edit_refused_on_reviewed_item() {
        let mut cache = campaign_cache(vec![item(1, 10.0, true)], 100.0);
        assert!(matches!(
            apply_adjustment_edit(&mut cache, 1, 15.0),
            Err(AdbookError::LineItemReviewed)
        ));
        assert_eq!(cache.total(), 100.0);
        assert_eq!(cache.get(1).unwrap().adjustments, 10.0);
    }

    #[test]
    fn test_review_toggle_recomputes_campaign_flag() {
        let mut cache = campaign_cache(vec![item(1, 0.0, true), item(2, 0.0, false)], 0.0);

        // Reviewing the last sibling flips the campaign to reviewed
        let flag = apply_review_toggle(&mut cache, true, 2, true).unwrap();
        assert_eq!(flag, Some(true));
        assert!(cache.campaign().unwrap().reviewed);

        // Unchecking any sibling flips it back, client side only
        let flag = apply_review_toggle(&mut cache, true, 1, false).unwrap();
        assert_eq!(flag, Some(false));
        assert!(!cache.campaign().unwrap().reviewed);
    }

    #[test]
    fn test_review_toggle_outside_campaign_mode_skips_cascade() {
        let mut cache = campaign_cache(vec![item(1, 0.0, false)], 0.0);
        let flag = apply_review_toggle(&mut cache, false, 1, true).unwrap();
        assert_eq!(flag, None);
    }

    #[test]
    fn test_campaign_toggle_cascades_to_all_siblings() {
        let mut cache = campaign_cache(vec![item(1, 0.0, false), item(2, 0.0, false)], 0.0);
        apply_campaign_review_toggle(&mut cache, true);
        assert!(cache.line_items().all(|i| i.reviewed));
        assert!(cache.campaign().unwrap().reviewed);
    }
}
