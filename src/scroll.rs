//! Infinite scroll trigger.
//!
//! A sentinel element is observed for visibility; the trigger asks for the
//! next page exactly once per exposure. The platform observer is abstracted
//! behind [`VisibilitySource`] so the core never touches a concrete
//! observer API; anything that can report "the sentinel became (in)visible"
//! can drive it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// Abstract subscription contract for sentinel visibility changes.
///
/// Implementations call the callback with `true` when the sentinel becomes
/// fully visible and `false` when it leaves the viewport. Dropping the
/// returned [`Subscription`] unsubscribes.
pub trait VisibilitySource {
    fn on_visibility_change(&self, callback: Box<dyn FnMut(bool)>) -> Subscription;
}

type CallbackMap = HashMap<u64, Box<dyn FnMut(bool)>>;

/// Unsubscribe guard. Removing happens on drop.
pub struct Subscription {
    registry: Weak<RefCell<CallbackMap>>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().remove(&self.id);
        }
    }
}

/// A [`VisibilitySource`] driven by explicit `notify` calls. Stands in for
/// the platform observer in tests and in the CLI.
#[derive(Default)]
pub struct ManualVisibility {
    callbacks: Rc<RefCell<CallbackMap>>,
    next_id: RefCell<u64>,
}

impl ManualVisibility {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a visibility change to every live subscriber.
    pub fn notify(&self, visible: bool) {
        // Callbacks may not re-enter the registry; collect ids first so a
        // callback dropping its own subscription stays sound
        let ids: Vec<u64> = self.callbacks.borrow().keys().copied().collect();
        for id in ids {
            let callback = self.callbacks.borrow_mut().remove(&id);
            if let Some(mut callback) = callback {
                callback(visible);
                self.callbacks.borrow_mut().insert(id, callback);
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.callbacks.borrow().len()
    }
}

impl VisibilitySource for ManualVisibility {
    fn on_visibility_change(&self, callback: Box<dyn FnMut(bool)>) -> Subscription {
        let mut next = self.next_id.borrow_mut();
        let id = *next;
        *next += 1;
        self.callbacks.borrow_mut().insert(id, callback);
        Subscription {
            registry: Rc::downgrade(&self.callbacks),
            id,
        }
    }
}

/// Fire-once-per-exposure latch over sentinel visibility.
///
/// Emits a load-more signal on the not-visible to visible transition, at
/// most once per exposure, only while enabled (the session passes the fetch
/// coordinator's idleness), and never once the current page set is
/// exhausted. A `rearm` (on cache replace) clears the exhausted flag.
#[derive(Debug, Default)]
pub struct ScrollSentinel {
    visible: bool,
    latched: bool,
    exhausted: bool,
}

impl ScrollSentinel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a visibility change. Returns true when the caller should
    /// request the next page.
    pub fn observe(&mut self, visible: bool, enabled: bool) -> bool {
        if !visible {
            self.visible = false;
            self.latched = false;
            return false;
        }

        let rising = !self.visible;
        self.visible = true;

        if rising && !self.latched && !self.exhausted && enabled {
            self.latched = true;
            return true;
        }
        false
    }

    /// Called after a cache replace: reset the latch and take the new
    /// page-set's exhaustion state.
    pub fn rearm(&mut self, has_next_page: bool) {
        self.latched = false;
        self.exhausted = !has_next_page;
    }

    /// Called after an append: update exhaustion without resetting the
    /// exposure latch.
    pub fn update(&mut self, has_next_page: bool) {
        self.exhausted = !has_next_page;
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}
