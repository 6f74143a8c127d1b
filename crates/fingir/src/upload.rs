//! The upload sibling of a fake request.
//!
//! An upload has no readyState of its own; its events are driven by the
//! parent's send/respond/abort lifecycle and by the explicit
//! `upload_progress`/`upload_error` operations on the parent. It carries its
//! own listener registry so upload observers never collide with request
//! observers.

use crate::event::{deliver, lock_unpoisoned, EventBus, EventKind, EventTarget, FakeEvent};
use crate::event::{BoxedHandler, ListenerId};
use std::sync::{Arc, Mutex};

/// Handle to a request's upload sibling. Cloning shares the same registry.
#[derive(Clone)]
pub struct FakeUpload {
    bus: Arc<Mutex<EventBus>>,
}

impl FakeUpload {
    pub(crate) fn new() -> Self {
        Self {
            bus: Arc::new(Mutex::new(EventBus::new())),
        }
    }

    /// Register a listener; the returned id removes it again
    pub fn add_event_listener(
        &self,
        kind: EventKind,
        handler: impl FnMut(&FakeEvent) + Send + 'static,
    ) -> ListenerId {
        lock_unpoisoned(&self.bus).add(kind, Box::new(handler))
    }

    /// Remove a listener by id; false when it was not registered
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        lock_unpoisoned(&self.bus).remove(id)
    }

    /// Number of registered listeners for a kind (legacy slots not counted)
    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        lock_unpoisoned(&self.bus).listener_count(kind)
    }

    /// Set the legacy `onloadstart` handler
    pub fn set_onloadstart(&self, handler: impl FnMut(&FakeEvent) + Send + 'static) {
        self.set_legacy(EventKind::LoadStart, Box::new(handler));
    }

    /// Set the legacy `onprogress` handler
    pub fn set_onprogress(&self, handler: impl FnMut(&FakeEvent) + Send + 'static) {
        self.set_legacy(EventKind::Progress, Box::new(handler));
    }

    /// Set the legacy `onload` handler
    pub fn set_onload(&self, handler: impl FnMut(&FakeEvent) + Send + 'static) {
        self.set_legacy(EventKind::Load, Box::new(handler));
    }

    /// Set the legacy `onabort` handler
    pub fn set_onabort(&self, handler: impl FnMut(&FakeEvent) + Send + 'static) {
        self.set_legacy(EventKind::Abort, Box::new(handler));
    }

    /// Set the legacy `onerror` handler
    pub fn set_onerror(&self, handler: impl FnMut(&FakeEvent) + Send + 'static) {
        self.set_legacy(EventKind::Error, Box::new(handler));
    }

    /// Set the legacy `onloadend` handler
    pub fn set_onloadend(&self, handler: impl FnMut(&FakeEvent) + Send + 'static) {
        self.set_legacy(EventKind::LoadEnd, Box::new(handler));
    }

    /// Clear a legacy handler slot
    pub fn clear_legacy(&self, kind: EventKind) {
        lock_unpoisoned(&self.bus).clear_legacy(kind);
    }

    fn set_legacy(&self, kind: EventKind, handler: BoxedHandler) {
        lock_unpoisoned(&self.bus).set_legacy(kind, handler);
    }

    /// Dispatch a progress-kind event with this upload as the target.
    ///
    /// The bus lock is released before handlers run, so handlers may register
    /// or remove listeners re-entrantly.
    pub(crate) fn emit(&self, kind: EventKind, loaded: u64, total: u64) {
        let cells = lock_unpoisoned(&self.bus).snapshot(kind);
        let event = FakeEvent::new(kind, EventTarget::Upload(self.clone()), loaded, total);
        deliver(&cells, &event);
    }

    /// Dispatch an error event carrying a message
    pub(crate) fn emit_error(&self, message: &str) {
        let cells = lock_unpoisoned(&self.bus).snapshot(EventKind::Error);
        let event =
            FakeEvent::with_message(EventKind::Error, EventTarget::Upload(self.clone()), message);
        deliver(&cells, &event);
    }

    /// Handle identity: true when both handles share the same upload
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.bus, &other.bus)
    }
}

impl std::fmt::Debug for FakeUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeUpload").finish_non_exhaustive()
    }
}
