//! Event dispatch for fake requests and their upload siblings.
//!
//! Each request and upload owns an `EventBus`: an ordered listener registry
//! plus the single-slot legacy handlers (`onload`, `onabort`, ...). Dispatch
//! always attempts the legacy slot first, then listeners in registration
//! order, and every invocation is panic-isolated so one failing handler never
//! stops the remaining handlers or the remaining lifecycle transitions.
//!
//! Events carry their target explicitly: the owning request or upload handle,
//! never an implicit call-site binding.

use crate::request::FakeRequest;
use crate::upload::FakeUpload;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// The event kinds a fake request can dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// readyState changed
    ReadyStateChange,
    /// Transfer started
    LoadStart,
    /// Transfer progressed
    Progress,
    /// Transfer completed successfully
    Load,
    /// Transfer was aborted
    Abort,
    /// Transfer failed
    Error,
    /// Transfer finished, successfully or not
    LoadEnd,
}

impl EventKind {
    /// The DOM-conventional event name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ReadyStateChange => "readystatechange",
            Self::LoadStart => "loadstart",
            Self::Progress => "progress",
            Self::Load => "load",
            Self::Abort => "abort",
            Self::Error => "error",
            Self::LoadEnd => "loadend",
        }
    }
}

/// The object an event was dispatched on
#[derive(Clone)]
pub enum EventTarget {
    /// The fake request itself
    Request(FakeRequest),
    /// The request's upload sibling
    Upload(FakeUpload),
}

impl EventTarget {
    /// The request handle, when the target is a request
    #[must_use]
    pub const fn as_request(&self) -> Option<&FakeRequest> {
        match self {
            Self::Request(request) => Some(request),
            Self::Upload(_) => None,
        }
    }

    /// The upload handle, when the target is an upload
    #[must_use]
    pub const fn as_upload(&self) -> Option<&FakeUpload> {
        match self {
            Self::Upload(upload) => Some(upload),
            Self::Request(_) => None,
        }
    }
}

impl std::fmt::Debug for EventTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Request(_) => f.write_str("EventTarget::Request"),
            Self::Upload(_) => f.write_str("EventTarget::Upload"),
        }
    }
}

/// An event delivered to listeners and legacy handlers.
///
/// Progress-kind events carry `loaded`/`total`; `length_computable` is
/// derived as `total > 0`. Error events may carry a message.
#[derive(Debug, Clone)]
pub struct FakeEvent {
    kind: EventKind,
    target: EventTarget,
    loaded: u64,
    total: u64,
    message: Option<String>,
}

impl FakeEvent {
    pub(crate) fn new(kind: EventKind, target: EventTarget, loaded: u64, total: u64) -> Self {
        Self {
            kind,
            target,
            loaded,
            total,
            message: None,
        }
    }

    pub(crate) fn with_message(
        kind: EventKind,
        target: EventTarget,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            target,
            loaded: 0,
            total: 0,
            message: Some(message.into()),
        }
    }

    /// The event kind
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    /// The conventional event name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    /// The dispatching request or upload
    #[must_use]
    pub const fn target(&self) -> &EventTarget {
        &self.target
    }

    /// Units transferred so far
    #[must_use]
    pub const fn loaded(&self) -> u64 {
        self.loaded
    }

    /// Total units expected
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Whether the total is meaningful
    #[must_use]
    pub const fn length_computable(&self) -> bool {
        self.total > 0
    }

    /// The error detail, for error events
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Identity of a registered listener, used for removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerId(u64);

pub(crate) type BoxedHandler = Box<dyn FnMut(&FakeEvent) + Send>;
pub(crate) type HandlerCell = Arc<Mutex<BoxedHandler>>;

struct ListenerEntry {
    id: ListenerId,
    kind: EventKind,
    handler: HandlerCell,
}

/// Per-object listener registry plus legacy single-slot handlers
#[derive(Default)]
pub(crate) struct EventBus {
    listeners: Vec<ListenerEntry>,
    legacy: HashMap<EventKind, HandlerCell>,
    next_id: u64,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, kind: EventKind, handler: BoxedHandler) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.push(ListenerEntry {
            id,
            kind,
            handler: Arc::new(Mutex::new(handler)),
        });
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|entry| entry.id != id);
        self.listeners.len() != before
    }

    pub(crate) fn set_legacy(&mut self, kind: EventKind, handler: BoxedHandler) {
        self.legacy.insert(kind, Arc::new(Mutex::new(handler)));
    }

    pub(crate) fn clear_legacy(&mut self, kind: EventKind) {
        self.legacy.remove(&kind);
    }

    /// Handlers to invoke for a kind: the legacy slot first, then listeners
    /// in registration order.
    pub(crate) fn snapshot(&self, kind: EventKind) -> Vec<HandlerCell> {
        let mut cells = Vec::new();
        if let Some(legacy) = self.legacy.get(&kind) {
            cells.push(Arc::clone(legacy));
        }
        cells.extend(
            self.listeners
                .iter()
                .filter(|entry| entry.kind == kind)
                .map(|entry| Arc::clone(&entry.handler)),
        );
        cells
    }

    pub(crate) fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners
            .iter()
            .filter(|entry| entry.kind == kind)
            .count()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .field("legacy", &self.legacy.len())
            .finish()
    }
}

/// Lock a mutex, recovering from poisoning.
///
/// A panicking handler poisons its cell; the isolation contract requires that
/// later dispatches still attempt it.
pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Invoke each handler with the event, isolating panics.
///
/// A panic is logged and swallowed so the remaining handlers and the caller's
/// remaining state transitions still run.
pub(crate) fn deliver(handlers: &[HandlerCell], event: &FakeEvent) {
    for cell in handlers {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut handler = lock_unpoisoned(cell);
            (*handler)(event);
        }));
        if let Err(payload) = outcome {
            tracing::error!(
                event = event.name(),
                "event handler panicked: {}",
                panic_message(payload.as_ref())
            );
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
