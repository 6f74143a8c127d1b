//! Process-wide registration state.
//!
//! The registry is the explicit context object behind the global fake: the
//! `on_create` hook invoked with every new request, the filter list and
//! `use_filters` flag consulted at `open()`, and the transport factory used
//! to delegate matched requests. Activation and restoration belong to the
//! installation collaborator that swaps the process-wide request constructor;
//! this module only owns the state it reads and writes.
//!
//! `Registry::global()` is the shared process instance. Tests that must not
//! see each other's hooks construct their own registry and pair it with
//! `FakeRequest::with_registry`.

use crate::bridge::RealTransport;
use crate::event::lock_unpoisoned;
use crate::filter::RequestFilter;
use crate::request::{FakeRequest, RequestDetails};
use std::sync::{Arc, Mutex, OnceLock};

type CreateHook = Box<dyn FnMut(&FakeRequest) + Send>;
type TransportFactory = Box<dyn FnMut(&RequestDetails) -> Box<dyn RealTransport> + Send>;

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Shared registration state; cloning shares the same state
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<Mutex<RegistryInner>>,
}

#[derive(Default)]
struct RegistryInner {
    on_create: Option<CreateHook>,
    filters: Vec<RequestFilter>,
    use_filters: bool,
    transport_factory: Option<TransportFactory>,
    active: bool,
}

impl Registry {
    /// Create an isolated registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry consulted by `FakeRequest::new`
    #[must_use]
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(Self::new)
    }

    /// Install the hook invoked with every newly constructed request
    pub fn set_on_create(&self, hook: impl FnMut(&FakeRequest) + Send + 'static) {
        lock_unpoisoned(&self.inner).on_create = Some(Box::new(hook));
    }

    /// Remove the creation hook
    pub fn clear_on_create(&self) {
        lock_unpoisoned(&self.inner).on_create = None;
    }

    /// True when a creation hook is installed
    #[must_use]
    pub fn has_on_create(&self) -> bool {
        lock_unpoisoned(&self.inner).on_create.is_some()
    }

    /// Append a filter; filters are evaluated in registration order
    pub fn add_filter(&self, filter: RequestFilter) {
        lock_unpoisoned(&self.inner).filters.push(filter);
    }

    /// Drop all filters
    pub fn clear_filters(&self) {
        lock_unpoisoned(&self.inner).filters.clear();
    }

    /// Number of registered filters
    #[must_use]
    pub fn filter_count(&self) -> usize {
        lock_unpoisoned(&self.inner).filters.len()
    }

    /// Enable or disable filter evaluation at `open()`
    pub fn set_use_filters(&self, enabled: bool) {
        lock_unpoisoned(&self.inner).use_filters = enabled;
    }

    /// Whether filter evaluation is enabled
    #[must_use]
    pub fn use_filters(&self) -> bool {
        lock_unpoisoned(&self.inner).use_filters
    }

    /// Install the factory that builds real transports for matched requests
    pub fn set_transport_factory(
        &self,
        factory: impl FnMut(&RequestDetails) -> Box<dyn RealTransport> + Send + 'static,
    ) {
        lock_unpoisoned(&self.inner).transport_factory = Some(Box::new(factory));
    }

    /// Remove the transport factory
    pub fn clear_transport_factory(&self) {
        lock_unpoisoned(&self.inner).transport_factory = None;
    }

    /// Mark the fake as installed process-wide
    pub fn activate(&self) {
        lock_unpoisoned(&self.inner).active = true;
    }

    /// True between `activate` and `restore`
    #[must_use]
    pub fn is_active(&self) -> bool {
        lock_unpoisoned(&self.inner).active
    }

    /// Tear registration state down after a test run.
    ///
    /// Clears the filters, the filtering flag, and the transport factory;
    /// the creation hook survives only when `keep_on_create` is set.
    pub fn restore(&self, keep_on_create: bool) {
        let mut inner = lock_unpoisoned(&self.inner);
        inner.active = false;
        inner.filters.clear();
        inner.use_filters = false;
        inner.transport_factory = None;
        if !keep_on_create {
            inner.on_create = None;
        }
    }

    /// Invoke the creation hook with a new request.
    ///
    /// The hook is taken out for the call so it may construct further
    /// requests without deadlocking on the registry.
    pub(crate) fn notify_created(&self, request: &FakeRequest) {
        let hook = lock_unpoisoned(&self.inner).on_create.take();
        if let Some(mut hook) = hook {
            hook(request);
            let mut inner = lock_unpoisoned(&self.inner);
            if inner.on_create.is_none() {
                inner.on_create = Some(hook);
            }
        }
    }

    /// True when any registered filter matches the details.
    ///
    /// Filters are snapshotted and evaluated without the registry lock held.
    pub(crate) fn matches_filter(&self, details: &RequestDetails) -> bool {
        let filters: Vec<RequestFilter> = lock_unpoisoned(&self.inner).filters.clone();
        filters.iter().any(|filter| filter.matches(details))
    }

    /// Build a transport for a matched request, if a factory is installed
    pub(crate) fn make_transport(
        &self,
        details: &RequestDetails,
    ) -> Option<Box<dyn RealTransport>> {
        let factory = lock_unpoisoned(&self.inner).transport_factory.take();
        factory.map(|mut factory| {
            let transport = factory(details);
            let mut inner = lock_unpoisoned(&self.inner);
            if inner.transport_factory.is_none() {
                inner.transport_factory = Some(factory);
            }
            transport
        })
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = lock_unpoisoned(&self.inner);
        f.debug_struct("Registry")
            .field("filters", &inner.filters.len())
            .field("use_filters", &inner.use_filters)
            .field("active", &inner.active)
            .field("has_on_create", &inner.on_create.is_some())
            .finish()
    }
}
