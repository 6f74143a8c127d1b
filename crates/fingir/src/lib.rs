//! Fingir: a deterministic test double for asynchronous network requests
//!
//! Fingir (Spanish: "to pretend") lets test code drive every observable
//! transition of a request object without a network: the readyState machine,
//! header validation, chunked response delivery, and the progress event
//! sequences, with ordering fidelity to what production code written against
//! a real request object depends on.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      FINGIR Architecture                       │
//! ├────────────────────────────────────────────────────────────────┤
//! │   ┌───────────┐     ┌──────────────┐     ┌────────────┐        │
//! │   │ Test code │────►│ FakeRequest  │────►│ EventBus   │        │
//! │   │ (driver)  │     │ readyState   │     │ listeners+ │        │
//! │   └───────────┘     │ machine      │     │ legacy     │        │
//! │         │           └──────┬───────┘     └────────────┘        │
//! │         │                  │ filters match?                    │
//! │   ┌─────▼─────┐     ┌──────▼───────┐                           │
//! │   │ Registry  │     │ FilterBridge │───► real transport        │
//! │   │ (global)  │     │ (defake)     │                           │
//! │   └───────────┘     └──────────────┘                           │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything is caller-driven: no timers, no I/O threads. "Asynchronous"
//! only means `send()` does not itself reach Done; the test decides when to
//! call `respond`, `set_response_headers`, `set_response_body`, or `abort`.
//!
//! # Example
//!
//! ```
//! use fingir::{FakeRequest, ReadyState};
//!
//! let request = FakeRequest::new();
//! request.open("GET", "/users/1");
//! request.send(None)?;
//! request.respond(200, &[("Content-Type", "application/json")], r#"{"id":1}"#)?;
//!
//! assert_eq!(request.ready_state(), ReadyState::Done);
//! assert_eq!(request.status_text(), "OK");
//! assert_eq!(request.response_text(), r#"{"id":1}"#);
//! # Ok::<(), fingir::FingirError>(())
//! ```

#![warn(missing_docs)]

mod bridge;
mod event;
mod filter;
mod headers;
mod registry;
mod request;
mod response;
mod result;
mod stream;
mod upload;

pub use bridge::{defake, RealTransport, TransportObserver, TransportSnapshot};
pub use event::{EventKind, EventTarget, FakeEvent, ListenerId};
pub use filter::{RequestFilter, UrlPattern};
pub use headers::{is_cookie_header, is_unsafe_header, RequestHeaders, ResponseHeaders};
pub use registry::Registry;
pub use request::{FakeRequest, ReadyState, RequestBody, RequestDetails};
pub use response::{
    byte_per_char, coerce, is_xml_mime, reason_phrase, ResponseType, ResponseValue, XmlDocument,
};
pub use result::{FingirError, FingirResult};
pub use upload::FakeUpload;
