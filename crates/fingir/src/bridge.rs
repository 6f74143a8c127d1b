//! Bridging a fake request onto a real transport.
//!
//! When filtering routes an `open()` to a genuine transport, the fake object
//! stays the only thing consumers touch: its methods forward to the
//! transport, and the transport pushes its readiness back through a
//! `TransportObserver`, which mirrors the snapshot onto the fake and
//! dispatches `readystatechange` with the fake as the event target. Legacy
//! handlers therefore keep their target binding even while a real transport
//! does the work.
//!
//! Only the bridging contract lives here; no actual transport is provided.

use crate::request::{FakeRequest, ReadyState, RequestBody, RequestDetails, WeakRequest};
use serde::{Deserialize, Serialize};

/// The state a real transport reports back to its fake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportSnapshot {
    /// The transport's readyState
    pub ready_state: ReadyState,
    /// HTTP status, 0 while unknown
    pub status: u16,
    /// HTTP status text
    pub status_text: String,
    /// Response text accumulated so far
    pub response_text: String,
    /// Response headers as name/value pairs, insertion-ordered
    pub response_headers: Vec<(String, String)>,
}

impl Default for TransportSnapshot {
    fn default() -> Self {
        Self {
            ready_state: ReadyState::Unsent,
            status: 0,
            status_text: String::new(),
            response_text: String::new(),
            response_headers: Vec::new(),
        }
    }
}

/// A genuine transport a matched request delegates to.
///
/// Implementations call `TransportObserver::ready_state_changed` with a fresh
/// snapshot whenever their own readiness advances; the observer is installed
/// before `open` is forwarded.
pub trait RealTransport: Send {
    /// Begin a request with the details captured by the fake's `open`
    fn open(&mut self, details: &RequestDetails);

    /// Forwarded from the fake's `set_request_header`
    fn set_request_header(&mut self, name: &str, value: &str);

    /// Forwarded from the fake's `send`
    fn send(&mut self, body: Option<&RequestBody>);

    /// Forwarded from the fake's `abort`
    fn abort(&mut self);

    /// Forwarded from the fake's `get_response_header`
    fn response_header(&self, name: &str) -> Option<String>;

    /// Forwarded from the fake's `get_all_response_headers`
    fn all_response_headers(&self) -> String;

    /// Install the observer used to report readiness back to the fake
    fn set_observer(&mut self, observer: TransportObserver);
}

/// Callback handle a transport uses to notify its fake.
///
/// Holds the fake weakly: a transport outliving its request simply stops
/// notifying.
#[derive(Clone)]
pub struct TransportObserver {
    request: WeakRequest,
}

impl TransportObserver {
    pub(crate) fn new(request: &FakeRequest) -> Self {
        Self {
            request: request.downgrade(),
        }
    }

    /// Mirror a transport snapshot onto the fake and fire `readystatechange`.
    ///
    /// The event target is the fake request, never the transport.
    pub fn ready_state_changed(&self, snapshot: TransportSnapshot) {
        if let Some(request) = self.request.upgrade() {
            request.apply_transport_snapshot(snapshot);
        } else {
            tracing::warn!("transport notified a dropped fake request");
        }
    }
}

impl std::fmt::Debug for TransportObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportObserver").finish_non_exhaustive()
    }
}

/// Delegate a fake request to a real transport.
///
/// Installs the observer, forwards `open` with the fake's current details,
/// and marks the fake as delegated so subsequent calls proxy through.
pub fn defake(request: &FakeRequest, mut transport: Box<dyn RealTransport>) {
    transport.set_observer(TransportObserver::new(request));
    transport.open(&request.details());
    request.install_transport(transport);
    tracing::debug!(id = %request.id(), "request delegated to real transport");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Scriptable transport standing in for a working network stack.
    #[derive(Default)]
    pub(crate) struct ScriptedTransport {
        pub(crate) log: Arc<Mutex<Vec<String>>>,
        pub(crate) observer: Arc<Mutex<Option<TransportObserver>>>,
        pub(crate) canned_header: Option<(String, String)>,
    }

    impl ScriptedTransport {
        pub(crate) fn new() -> Self {
            Self::default()
        }
    }

    impl RealTransport for ScriptedTransport {
        fn open(&mut self, details: &RequestDetails) {
            self.log
                .lock()
                .unwrap()
                .push(format!("open {} {}", details.method, details.url));
        }

        fn set_request_header(&mut self, name: &str, value: &str) {
            self.log
                .lock()
                .unwrap()
                .push(format!("header {name}: {value}"));
        }

        fn send(&mut self, body: Option<&RequestBody>) {
            let tag = body.and_then(RequestBody::as_text).unwrap_or("-");
            self.log.lock().unwrap().push(format!("send {tag}"));
        }

        fn abort(&mut self) {
            self.log.lock().unwrap().push("abort".to_string());
        }

        fn response_header(&self, name: &str) -> Option<String> {
            self.log.lock().unwrap().push(format!("get {name}"));
            self.canned_header
                .as_ref()
                .filter(|(header, _)| header.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.clone())
        }

        fn all_response_headers(&self) -> String {
            String::new()
        }

        fn set_observer(&mut self, observer: TransportObserver) {
            *self.observer.lock().unwrap() = Some(observer);
        }
    }

    #[test]
    fn test_defake_forwards_open() {
        let request = FakeRequest::isolated();
        request.open("GET", "http://example.com");

        let transport = ScriptedTransport::new();
        let log = Arc::clone(&transport.log);
        defake(&request, Box::new(transport));

        assert_eq!(
            log.lock().unwrap().first().map(String::as_str),
            Some("open GET http://example.com")
        );
    }

    #[test]
    fn test_snapshot_mirrors_onto_fake() {
        let request = FakeRequest::isolated();
        request.open("GET", "/real");
        let transport = ScriptedTransport::new();
        let observer_slot = Arc::clone(&transport.observer);
        defake(&request, Box::new(transport));

        let observer = observer_slot.lock().unwrap().clone().unwrap();
        observer.ready_state_changed(TransportSnapshot {
            ready_state: ReadyState::Done,
            status: 200,
            status_text: "This is the status text of the real transport".to_string(),
            response_text: "payload".to_string(),
            response_headers: vec![("Content-Type".to_string(), "text/plain".to_string())],
        });

        assert_eq!(request.ready_state(), ReadyState::Done);
        assert_eq!(request.status(), 200);
        assert_eq!(
            request.status_text(),
            "This is the status text of the real transport"
        );
        assert_eq!(request.response_text(), "payload");
    }

    #[test]
    fn test_notification_dispatches_with_fake_as_target() {
        let request = FakeRequest::isolated();
        request.open("GET", "/real");
        let transport = ScriptedTransport::new();
        let observer_slot = Arc::clone(&transport.observer);
        defake(&request, Box::new(transport));

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let probe = request.clone();
        request.set_onreadystatechange(move |event| {
            let target = event.target().as_request().unwrap();
            assert!(target.same(&probe));
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let observer = observer_slot.lock().unwrap().clone().unwrap();
        observer.ready_state_changed(TransportSnapshot {
            ready_state: ReadyState::Done,
            ..TransportSnapshot::default()
        });

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_methods_proxy_to_transport() {
        let request = FakeRequest::isolated();
        request.open("POST", "/real");
        let transport = ScriptedTransport {
            canned_header: Some(("Content-Type".to_string(), "text/html".to_string())),
            ..ScriptedTransport::new()
        };
        let log = Arc::clone(&transport.log);
        defake(&request, Box::new(transport));

        request.set_request_header("X-Fake", "no").unwrap();
        request.send(Some("data".into())).unwrap();
        assert_eq!(
            request.get_response_header("content-type").as_deref(),
            Some("text/html")
        );
        request.abort();

        let log = log.lock().unwrap();
        assert_eq!(
            log.as_slice(),
            &[
                "open POST /real".to_string(),
                "header X-Fake: no".to_string(),
                "send data".to_string(),
                "get content-type".to_string(),
                "abort".to_string(),
            ]
        );
    }

    #[test]
    fn test_observer_survives_dropped_request() {
        let request = FakeRequest::isolated();
        request.open("GET", "/real");
        let transport = ScriptedTransport::new();
        let observer_slot = Arc::clone(&transport.observer);
        defake(&request, Box::new(transport));

        let observer = observer_slot.lock().unwrap().clone().unwrap();
        drop(request);

        // Must not panic.
        observer.ready_state_changed(TransportSnapshot::default());
    }
}
