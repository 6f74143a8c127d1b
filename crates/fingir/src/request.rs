//! The fake request lifecycle engine.
//!
//! A `FakeRequest` reproduces the observable behavior of an asynchronous
//! network request object without a network: readyState transitions, header
//! validation, chunked response delivery, and the progress event sequences,
//! all driven synchronously by whichever call the test makes.
//!
//! Handles are cheap clones over shared interior state. Locks are never held
//! while handlers run, so a handler may freely call back into the request it
//! observes. "Asynchronous" only means `send()` does not itself reach Done;
//! the caller decides when to deliver the response. Synchronous requests
//! collapse the same transitions into the `send()` call stack via the
//! `on_send` hook.

use crate::bridge::RealTransport;
use crate::event::{
    deliver, lock_unpoisoned, BoxedHandler, EventBus, EventKind, EventTarget, FakeEvent, ListenerId,
};
use crate::headers::{is_cookie_header, is_unsafe_header, RequestHeaders, ResponseHeaders};
use crate::registry::Registry;
use crate::response::{coerce, is_xml_mime, reason_phrase, ResponseType, ResponseValue, XmlDocument};
use crate::result::{FingirError, FingirResult};
use crate::stream::chunk_ends;
use crate::upload::FakeUpload;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, Weak};
use uuid::Uuid;

/// Lifecycle stage of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReadyState {
    /// Not yet opened, or reset by an abort
    Unsent = 0,
    /// `open()` has been called
    Opened = 1,
    /// Response headers are available
    HeadersReceived = 2,
    /// Response body is streaming in
    Loading = 3,
    /// Response complete (or terminated)
    Done = 4,
}

impl ReadyState {
    /// The numeric readyState value
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// A request payload handed to `send`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestBody {
    /// Plain text payload
    Text(String),
    /// Multipart/form payload; never receives a defaulted Content-Type
    Form(Vec<(String, String)>),
}

impl RequestBody {
    /// A text payload
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text(body.into())
    }

    /// A form payload from field pairs
    #[must_use]
    pub fn form(fields: Vec<(String, String)>) -> Self {
        Self::Form(fields)
    }

    /// Text contents, when this is a text payload
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Form(_) => None,
        }
    }

    /// True for form payloads
    #[must_use]
    pub const fn is_form(&self) -> bool {
        matches!(self, Self::Form(_))
    }
}

impl From<&str> for RequestBody {
    fn from(body: &str) -> Self {
        Self::Text(body.to_string())
    }
}

impl From<String> for RequestBody {
    fn from(body: String) -> Self {
        Self::Text(body)
    }
}

/// The identifying details captured by `open`, as seen by filters and
/// transports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDetails {
    /// HTTP method, as given
    pub method: String,
    /// Request URL, as given
    pub url: String,
    /// Whether the request is asynchronous
    pub is_async: bool,
    /// Optional username
    pub username: Option<String>,
    /// Optional password
    pub password: Option<String>,
}

type SendHook = Box<dyn FnMut(&FakeRequest) + Send>;

struct RequestInner {
    id: Uuid,
    registry: Registry,
    ready_state: ReadyState,
    method: String,
    url: String,
    is_async: bool,
    username: Option<String>,
    password: Option<String>,
    send_flag: bool,
    error_flag: bool,
    aborted: bool,
    request_headers: RequestHeaders,
    response_headers: ResponseHeaders,
    headers_set: bool,
    body_delivered: bool,
    request_body: Option<RequestBody>,
    response_type: ResponseType,
    response_text: String,
    response: ResponseValue,
    response_xml: Option<XmlDocument>,
    status: u16,
    status_text: String,
    chunk_size: Option<usize>,
    bus: EventBus,
    upload: FakeUpload,
    on_send: Option<Arc<Mutex<SendHook>>>,
    transport: Option<Arc<Mutex<Box<dyn RealTransport>>>>,
}

impl RequestInner {
    fn new(registry: Registry) -> Self {
        Self {
            id: Uuid::new_v4(),
            registry,
            ready_state: ReadyState::Unsent,
            method: String::new(),
            url: String::new(),
            is_async: true,
            username: None,
            password: None,
            send_flag: false,
            error_flag: false,
            aborted: false,
            request_headers: RequestHeaders::new(),
            response_headers: ResponseHeaders::new(),
            headers_set: false,
            body_delivered: false,
            request_body: None,
            response_type: ResponseType::Default,
            response_text: String::new(),
            response: ResponseValue::Text(String::new()),
            response_xml: None,
            status: 0,
            status_text: String::new(),
            chunk_size: None,
            bus: EventBus::new(),
            upload: FakeUpload::new(),
            on_send: None,
            transport: None,
        }
    }
}

/// Weak handle used by transport observers so a transport outliving its
/// request stops notifying instead of keeping it alive.
#[derive(Clone)]
pub(crate) struct WeakRequest(Weak<Mutex<RequestInner>>);

impl WeakRequest {
    pub(crate) fn upgrade(&self) -> Option<FakeRequest> {
        self.0.upgrade().map(|inner| FakeRequest { inner })
    }
}

/// A deterministic test double for an asynchronous network request.
///
/// Cloning shares the same request; events always carry a handle to it as
/// their target.
#[derive(Clone)]
pub struct FakeRequest {
    inner: Arc<Mutex<RequestInner>>,
}

impl FakeRequest {
    /// readyState before `open()` (and after an abort)
    pub const UNSENT: ReadyState = ReadyState::Unsent;
    /// readyState after `open()`
    pub const OPENED: ReadyState = ReadyState::Opened;
    /// readyState once response headers are set
    pub const HEADERS_RECEIVED: ReadyState = ReadyState::HeadersReceived;
    /// readyState while the body streams in
    pub const LOADING: ReadyState = ReadyState::Loading;
    /// terminal readyState
    pub const DONE: ReadyState = ReadyState::Done;

    /// Create a request registered with the process-wide registry.
    ///
    /// Invokes the registry's `on_create` hook with the new request.
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(Registry::global())
    }

    /// Create a request bound to a specific registry (test isolation)
    #[must_use]
    pub fn with_registry(registry: &Registry) -> Self {
        let request = Self {
            inner: Arc::new(Mutex::new(RequestInner::new(registry.clone()))),
        };
        tracing::debug!(id = %request.id(), "fake request created");
        registry.notify_created(&request);
        request
    }

    #[cfg(test)]
    pub(crate) fn isolated() -> Self {
        Self::with_registry(&Registry::new())
    }

    pub(crate) fn downgrade(&self) -> WeakRequest {
        WeakRequest(Arc::downgrade(&self.inner))
    }

    /// Handle identity: true when both handles share the same request
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Unique id for log correlation
    #[must_use]
    pub fn id(&self) -> Uuid {
        lock_unpoisoned(&self.inner).id
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Open an asynchronous request. Legal from any state; resets all
    /// per-cycle state and moves to `Opened`.
    pub fn open(&self, method: &str, url: &str) {
        self.open_with(method, url, true, None, None);
    }

    /// Open with explicit async flag and credentials.
    ///
    /// When filtering is enabled and a filter matches, the request is
    /// delegated to a real transport and no local readystatechange fires;
    /// otherwise exactly one readystatechange is dispatched, whichever path
    /// was taken.
    pub fn open_with(
        &self,
        method: &str,
        url: &str,
        is_async: bool,
        username: Option<&str>,
        password: Option<&str>,
    ) {
        let (registry, details) = {
            let mut inner = lock_unpoisoned(&self.inner);
            inner.method = method.to_string();
            inner.url = url.to_string();
            inner.is_async = is_async;
            inner.username = username.map(str::to_string);
            inner.password = password.map(str::to_string);
            inner.request_headers.clear();
            inner.response_headers.clear();
            inner.headers_set = false;
            inner.body_delivered = false;
            inner.request_body = None;
            inner.response_text.clear();
            inner.response = ResponseValue::initial_for(inner.response_type);
            inner.response_xml = None;
            inner.status = 0;
            inner.status_text.clear();
            inner.send_flag = false;
            inner.error_flag = false;
            inner.aborted = false;
            inner.transport = None;
            inner.ready_state = ReadyState::Opened;
            tracing::debug!(id = %inner.id, method, url, is_async, "open");
            (
                inner.registry.clone(),
                RequestDetails {
                    method: inner.method.clone(),
                    url: inner.url.clone(),
                    is_async,
                    username: inner.username.clone(),
                    password: inner.password.clone(),
                },
            )
        };

        if registry.use_filters() && registry.matches_filter(&details) {
            if let Some(transport) = registry.make_transport(&details) {
                crate::bridge::defake(self, transport);
                return;
            }
            tracing::warn!(url = %details.url, "filter matched but no transport factory is installed");
        }
        self.dispatch_ready_state_change();
    }

    /// Set a request header.
    ///
    /// Fails unless the request is opened and unsent; forbidden header names
    /// are rejected. A repeated name (any casing) appends `","` plus the
    /// value to the existing entry.
    pub fn set_request_header(&self, name: &str, value: &str) -> FingirResult<()> {
        if let Some(transport) = self.transport_handle() {
            lock_unpoisoned(&transport).set_request_header(name, value);
            return Ok(());
        }
        let mut inner = lock_unpoisoned(&self.inner);
        if inner.ready_state != ReadyState::Opened || inner.send_flag {
            return Err(FingirError::invalid_state(
                "set_request_header() requires an opened, unsent request",
            ));
        }
        if is_unsafe_header(name) {
            return Err(FingirError::UnsafeHeader {
                name: name.to_string(),
            });
        }
        inner.request_headers.append(name, value);
        Ok(())
    }

    /// Send the request.
    ///
    /// GET and HEAD discard the body. A text body with no content-type header
    /// gets `text/plain;charset=utf-8`; an existing content-type value (any
    /// key casing) that lacks a charset gets `;charset=utf-8` appended, and is
    /// never otherwise overridden. Emits `loadstart` on the request (and on
    /// the upload when a body is present), re-dispatches `readystatechange`
    /// at Opened, then hands off to the `on_send` hook in both async and sync
    /// modes.
    pub fn send(&self, body: Option<RequestBody>) -> FingirResult<()> {
        if let Some(transport) = self.transport_handle() {
            lock_unpoisoned(&transport).send(body.as_ref());
            return Ok(());
        }
        let (has_body, upload, hook) = {
            let mut inner = lock_unpoisoned(&self.inner);
            if inner.ready_state != ReadyState::Opened || inner.send_flag {
                return Err(FingirError::invalid_state(
                    "send() requires an opened, unsent request",
                ));
            }
            let bodyless = inner.method.eq_ignore_ascii_case("get")
                || inner.method.eq_ignore_ascii_case("head");
            inner.request_body = if bodyless { None } else { body };
            if matches!(inner.request_body, Some(RequestBody::Text(_))) {
                default_content_type(&mut inner.request_headers);
            }
            inner.error_flag = false;
            if inner.is_async {
                inner.send_flag = true;
            }
            tracing::debug!(id = %inner.id, method = %inner.method, url = %inner.url, "send");
            (
                inner.request_body.is_some(),
                inner.upload.clone(),
                inner.on_send.clone(),
            )
        };

        self.emit(EventKind::LoadStart, 0, 0);
        if has_body {
            upload.emit(EventKind::LoadStart, 0, 0);
        }
        self.dispatch_ready_state_change();

        if let Some(hook) = hook {
            let mut hook = lock_unpoisoned(&hook);
            (*hook)(self);
        }
        Ok(())
    }

    /// Abort the request. Always legal; never fails.
    ///
    /// Clears per-cycle state and flags the error. A sent request runs the
    /// request-error steps: upload `progress`/`abort`/`loadend`, then request
    /// `progress`/`abort`/`loadend` (all zero-length), one `readystatechange`
    /// at Done, and a silent reset to Unsent. An unsent request fires nothing.
    pub fn abort(&self) {
        if let Some(transport) = self.transport_handle() {
            lock_unpoisoned(&transport).abort();
            return;
        }
        let (was_sent, upload) = {
            let mut inner = lock_unpoisoned(&self.inner);
            inner.aborted = true;
            inner.error_flag = true;
            inner.response_text.clear();
            inner.response = ResponseValue::Text(String::new());
            inner.response_xml = None;
            inner.request_headers.clear();
            inner.response_headers.clear();
            inner.headers_set = false;
            inner.body_delivered = false;
            inner.status = 0;
            inner.status_text.clear();
            let was_sent = inner.ready_state != ReadyState::Unsent && inner.send_flag;
            if was_sent {
                inner.ready_state = ReadyState::Done;
                inner.send_flag = false;
            }
            tracing::debug!(id = %inner.id, was_sent, "abort");
            (was_sent, inner.upload.clone())
        };

        if was_sent {
            upload.emit(EventKind::Progress, 0, 0);
            upload.emit(EventKind::Abort, 0, 0);
            upload.emit(EventKind::LoadEnd, 0, 0);
            self.emit(EventKind::Progress, 0, 0);
            self.emit(EventKind::Abort, 0, 0);
            self.emit(EventKind::LoadEnd, 0, 0);
            self.dispatch_ready_state_change();
        }
        lock_unpoisoned(&self.inner).ready_state = ReadyState::Unsent;
    }

    // ---------------------------------------------------------------------
    // Response delivery
    // ---------------------------------------------------------------------

    /// Deliver response headers.
    ///
    /// At most once per cycle. Async requests transition to HeadersReceived
    /// and fire `readystatechange`; sync requests update the state silently.
    pub fn set_response_headers(&self, headers: &[(&str, &str)]) -> FingirResult<()> {
        let fire = {
            let mut inner = lock_unpoisoned(&self.inner);
            if inner.headers_set {
                return Err(FingirError::protocol("response headers were already set"));
            }
            if inner.ready_state != ReadyState::Opened {
                return Err(FingirError::invalid_state(
                    "set_response_headers() requires an opened request",
                ));
            }
            inner.response_headers = ResponseHeaders::from_pairs(headers);
            inner.headers_set = true;
            inner.ready_state = ReadyState::HeadersReceived;
            inner.is_async
        };
        if fire {
            self.dispatch_ready_state_change();
        }
        Ok(())
    }

    /// Deliver the response body, streaming it in chunks.
    ///
    /// Requires headers to have been delivered first; at most once per cycle.
    /// Async requests fire one Loading `readystatechange` per chunk, each
    /// observing the accumulated prefix (the first already carries the first
    /// chunk), then coerce per the response type, fire the Done
    /// `readystatechange`, and run the completion progress sequence. Sync
    /// requests skip the intermediate dispatches and end at Done with one
    /// terminal `readystatechange` before the same completion sequence.
    pub fn set_response_body(&self, body: &str) -> FingirResult<()> {
        let (is_async, ends, upload) = {
            let mut inner = lock_unpoisoned(&self.inner);
            if inner.body_delivered {
                return Err(FingirError::protocol("response body was already delivered"));
            }
            if inner.ready_state != ReadyState::HeadersReceived {
                return Err(FingirError::invalid_state(
                    "set_response_body() requires response headers to be set first",
                ));
            }
            inner.body_delivered = true;
            inner.response_text.clear();
            let ends = chunk_ends(body, inner.chunk_size);
            (inner.is_async, ends, inner.upload.clone())
        };

        if is_async {
            lock_unpoisoned(&self.inner).ready_state = ReadyState::Loading;
            let mut start = 0;
            for end in ends {
                {
                    let mut inner = lock_unpoisoned(&self.inner);
                    inner.response_text.push_str(&body[start..end]);
                    inner.response = ResponseValue::Text(inner.response_text.clone());
                }
                self.dispatch_ready_state_change();
                start = end;
            }
        } else {
            let mut inner = lock_unpoisoned(&self.inner);
            inner.response_text.push_str(body);
            inner.response = ResponseValue::Text(inner.response_text.clone());
        }

        let total = {
            let mut inner = lock_unpoisoned(&self.inner);
            let text = inner.response_text.clone();
            let content_type = inner.response_headers.get("content-type").map(str::to_string);
            let document = if matches!(
                inner.response_type,
                ResponseType::Default | ResponseType::Document
            ) && is_xml_mime(content_type.as_deref())
                && !text.is_empty()
            {
                XmlDocument::parse(&text)
            } else {
                None
            };
            inner.response_xml = document.clone();
            inner.response = match inner.response_type {
                ResponseType::Document => document
                    .map(ResponseValue::Document)
                    .unwrap_or(ResponseValue::None),
                other => coerce(other, &text),
            };
            inner.ready_state = ReadyState::Done;
            inner.send_flag = false;
            tracing::debug!(id = %inner.id, bytes = text.len(), "response body complete");
            text.len() as u64
        };

        self.dispatch_ready_state_change();
        upload.emit(EventKind::Progress, total, total);
        upload.emit(EventKind::Load, total, total);
        upload.emit(EventKind::LoadEnd, total, total);
        self.emit(EventKind::Load, total, total);
        self.emit(EventKind::LoadEnd, total, total);
        Ok(())
    }

    /// Deliver a response body from raw bytes.
    ///
    /// The bytes must be valid UTF-8; binary response types still take a
    /// string chunk-source, with codec conversion at completion.
    pub fn set_response_body_bytes(&self, body: &[u8]) -> FingirResult<()> {
        let text = std::str::from_utf8(body).map_err(|err| FingirError::InvalidBody {
            message: format!("response body is not valid UTF-8: {err}"),
        })?;
        self.set_response_body(text)
    }

    /// Respond in one call: status, headers, body.
    ///
    /// The status and its reason phrase are set before the HeadersReceived
    /// transition so readystatechange observers already see them.
    pub fn respond(&self, status: u16, headers: &[(&str, &str)], body: &str) -> FingirResult<()> {
        {
            let mut inner = lock_unpoisoned(&self.inner);
            inner.status = status;
            inner.status_text = reason_phrase(status).to_string();
        }
        self.set_response_headers(headers)?;
        self.set_response_body(body)
    }

    /// Respond with `200`, no headers, and an empty body
    pub fn respond_ok(&self) -> FingirResult<()> {
        self.respond(200, &[], "")
    }

    /// Respond with a JSON payload and an `application/json` content type
    pub fn respond_json<T: serde::Serialize>(&self, status: u16, value: &T) -> FingirResult<()> {
        let body = serde_json::to_string(value)?;
        self.respond(status, &[("Content-Type", "application/json")], &body)
    }

    // ---------------------------------------------------------------------
    // Response accessors
    // ---------------------------------------------------------------------

    /// A response header value, case-insensitively.
    ///
    /// `None` before HeadersReceived and always `None` for
    /// Set-Cookie/Set-Cookie2.
    #[must_use]
    pub fn get_response_header(&self, name: &str) -> Option<String> {
        if let Some(transport) = self.transport_handle() {
            return lock_unpoisoned(&transport).response_header(name);
        }
        let inner = lock_unpoisoned(&self.inner);
        if inner.ready_state < ReadyState::HeadersReceived {
            return None;
        }
        if is_cookie_header(name) {
            return None;
        }
        inner.response_headers.get(name).map(str::to_string)
    }

    /// All response headers in `"Name: value\r\n"` form.
    ///
    /// Empty before HeadersReceived; cookie-setting headers are never
    /// included.
    #[must_use]
    pub fn get_all_response_headers(&self) -> String {
        if let Some(transport) = self.transport_handle() {
            return lock_unpoisoned(&transport).all_response_headers();
        }
        let inner = lock_unpoisoned(&self.inner);
        if inner.ready_state < ReadyState::HeadersReceived {
            return String::new();
        }
        inner.response_headers.to_wire()
    }

    // ---------------------------------------------------------------------
    // Progress operations
    // ---------------------------------------------------------------------

    /// Fire a download `progress` event with explicit numbers
    pub fn download_progress(&self, loaded: u64, total: u64) {
        self.emit(EventKind::Progress, loaded, total);
    }

    /// Fire an upload `progress` event with explicit numbers
    pub fn upload_progress(&self, loaded: u64, total: u64) {
        self.upload().emit(EventKind::Progress, loaded, total);
    }

    /// Fire an upload `error` event carrying a message
    pub fn upload_error(&self, message: &str) {
        self.upload().emit_error(message);
    }

    // ---------------------------------------------------------------------
    // Event registration
    // ---------------------------------------------------------------------

    /// Register a listener; the returned id removes it again
    pub fn add_event_listener(
        &self,
        kind: EventKind,
        handler: impl FnMut(&FakeEvent) + Send + 'static,
    ) -> ListenerId {
        lock_unpoisoned(&self.inner).bus.add(kind, Box::new(handler))
    }

    /// Remove a listener by id; false when it was not registered
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        lock_unpoisoned(&self.inner).bus.remove(id)
    }

    /// Number of registered listeners for a kind (legacy slots not counted)
    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        lock_unpoisoned(&self.inner).bus.listener_count(kind)
    }

    /// Set the legacy `onreadystatechange` handler
    pub fn set_onreadystatechange(&self, handler: impl FnMut(&FakeEvent) + Send + 'static) {
        self.set_legacy(EventKind::ReadyStateChange, Box::new(handler));
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
        lock_unpoisoned(&self.inner).bus.clear_legacy(kind);
    }

    /// Install the hook invoked by `send()` with the request itself.
    ///
    /// This is the hand-off point where test code (or a filter bridge) takes
    /// over driving the response.
    pub fn set_on_send(&self, hook: impl FnMut(&FakeRequest) + Send + 'static) {
        lock_unpoisoned(&self.inner).on_send = Some(Arc::new(Mutex::new(Box::new(hook))));
    }

    // ---------------------------------------------------------------------
    // State accessors
    // ---------------------------------------------------------------------

    /// Current readyState
    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        lock_unpoisoned(&self.inner).ready_state
    }

    /// The method given to `open`
    #[must_use]
    pub fn method(&self) -> String {
        lock_unpoisoned(&self.inner).method.clone()
    }

    /// The URL given to `open`
    #[must_use]
    pub fn url(&self) -> String {
        lock_unpoisoned(&self.inner).url.clone()
    }

    /// Whether the request is asynchronous
    #[must_use]
    pub fn is_async(&self) -> bool {
        lock_unpoisoned(&self.inner).is_async
    }

    /// The username given to `open`, if any
    #[must_use]
    pub fn username(&self) -> Option<String> {
        lock_unpoisoned(&self.inner).username.clone()
    }

    /// The password given to `open`, if any
    #[must_use]
    pub fn password(&self) -> Option<String> {
        lock_unpoisoned(&self.inner).password.clone()
    }

    /// True between `send()` and completion (async only)
    #[must_use]
    pub fn send_flag(&self) -> bool {
        lock_unpoisoned(&self.inner).send_flag
    }

    /// True once aborted or terminated by a network error
    #[must_use]
    pub fn error_flag(&self) -> bool {
        lock_unpoisoned(&self.inner).error_flag
    }

    /// True only after `abort()`
    #[must_use]
    pub fn aborted(&self) -> bool {
        lock_unpoisoned(&self.inner).aborted
    }

    /// HTTP status, 0 until a response is set
    #[must_use]
    pub fn status(&self) -> u16 {
        lock_unpoisoned(&self.inner).status
    }

    /// HTTP status text, empty until a response is set
    #[must_use]
    pub fn status_text(&self) -> String {
        lock_unpoisoned(&self.inner).status_text.clone()
    }

    /// The request body captured by `send`
    #[must_use]
    pub fn request_body(&self) -> Option<RequestBody> {
        lock_unpoisoned(&self.inner).request_body.clone()
    }

    /// The request headers accumulated so far
    #[must_use]
    pub fn request_headers(&self) -> RequestHeaders {
        lock_unpoisoned(&self.inner).request_headers.clone()
    }

    /// The raw response headers (cookie headers included)
    #[must_use]
    pub fn response_headers(&self) -> ResponseHeaders {
        lock_unpoisoned(&self.inner).response_headers.clone()
    }

    /// Accumulated response text
    #[must_use]
    pub fn response_text(&self) -> String {
        lock_unpoisoned(&self.inner).response_text.clone()
    }

    /// The typed response value
    #[must_use]
    pub fn response(&self) -> ResponseValue {
        lock_unpoisoned(&self.inner).response.clone()
    }

    /// The parsed markup document, when the response was XML-like
    #[must_use]
    pub fn response_xml(&self) -> Option<XmlDocument> {
        lock_unpoisoned(&self.inner).response_xml.clone()
    }

    /// The response type tag
    #[must_use]
    pub fn response_type(&self) -> ResponseType {
        lock_unpoisoned(&self.inner).response_type
    }

    /// Select the response type; resets the in-flight response value when
    /// the request has not started loading yet
    pub fn set_response_type(&self, response_type: ResponseType) {
        let mut inner = lock_unpoisoned(&self.inner);
        inner.response_type = response_type;
        if inner.ready_state <= ReadyState::Opened {
            inner.response = ResponseValue::initial_for(response_type);
        }
    }

    /// The configured chunk size, if any
    #[must_use]
    pub fn chunk_size(&self) -> Option<usize> {
        lock_unpoisoned(&self.inner).chunk_size
    }

    /// Configure chunked delivery; `None` delivers the body as one chunk
    pub fn set_chunk_size(&self, chunk_size: Option<usize>) {
        lock_unpoisoned(&self.inner).chunk_size = chunk_size;
    }

    /// The upload sibling
    #[must_use]
    pub fn upload(&self) -> FakeUpload {
        lock_unpoisoned(&self.inner).upload.clone()
    }

    /// The identifying details captured by `open`
    #[must_use]
    pub fn details(&self) -> RequestDetails {
        let inner = lock_unpoisoned(&self.inner);
        RequestDetails {
            method: inner.method.clone(),
            url: inner.url.clone(),
            is_async: inner.is_async,
            username: inner.username.clone(),
            password: inner.password.clone(),
        }
    }

    // ---------------------------------------------------------------------
    // Bridge plumbing
    // ---------------------------------------------------------------------

    pub(crate) fn install_transport(&self, transport: Box<dyn RealTransport>) {
        lock_unpoisoned(&self.inner).transport = Some(Arc::new(Mutex::new(transport)));
    }

    fn transport_handle(&self) -> Option<Arc<Mutex<Box<dyn RealTransport>>>> {
        lock_unpoisoned(&self.inner).transport.clone()
    }

    /// Mirror a transport snapshot and fire `readystatechange` with this
    /// request as the target.
    pub(crate) fn apply_transport_snapshot(&self, snapshot: crate::bridge::TransportSnapshot) {
        {
            let mut inner = lock_unpoisoned(&self.inner);
            inner.ready_state = snapshot.ready_state;
            inner.status = snapshot.status;
            inner.status_text = snapshot.status_text;
            inner.response_text = snapshot.response_text.clone();
            inner.response = ResponseValue::Text(snapshot.response_text);
            if !snapshot.response_headers.is_empty() {
                inner.response_headers.set_entries(snapshot.response_headers);
                inner.headers_set = true;
            }
        }
        self.dispatch_ready_state_change();
    }

    // ---------------------------------------------------------------------
    // Dispatch plumbing
    // ---------------------------------------------------------------------

    fn set_legacy(&self, kind: EventKind, handler: BoxedHandler) {
        lock_unpoisoned(&self.inner).bus.set_legacy(kind, handler);
    }

    /// Dispatch an event with this request as the target. The state lock is
    /// released before handlers run.
    fn emit(&self, kind: EventKind, loaded: u64, total: u64) {
        let cells = lock_unpoisoned(&self.inner).bus.snapshot(kind);
        let event = FakeEvent::new(kind, EventTarget::Request(self.clone()), loaded, total);
        deliver(&cells, &event);
    }

    fn dispatch_ready_state_change(&self) {
        let state = lock_unpoisoned(&self.inner).ready_state;
        tracing::trace!(state = ?state, "readystatechange");
        self.emit(EventKind::ReadyStateChange, 0, 0);
    }
}

impl Default for FakeRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FakeRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.try_lock() {
            Ok(inner) => f
                .debug_struct("FakeRequest")
                .field("id", &inner.id)
                .field("ready_state", &inner.ready_state)
                .field("method", &inner.method)
                .field("url", &inner.url)
                .finish_non_exhaustive(),
            Err(_) => f.debug_struct("FakeRequest").finish_non_exhaustive(),
        }
    }
}

/// Apply the Content-Type defaulting rule for text bodies.
fn default_content_type(headers: &mut RequestHeaders) {
    if let Some(value) = headers.value_mut("content-type") {
        if !value.to_ascii_lowercase().contains("charset=") {
            value.push_str(";charset=utf-8");
        }
    } else {
        headers.append("Content-Type", "text/plain;charset=utf-8");
    }
}
