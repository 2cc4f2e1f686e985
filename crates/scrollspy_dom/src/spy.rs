//! Scroll subscriptions: attach, detach and sample dispatch
//!
//! [`ScrollSpy`] is a cloneable handle around the document and every scroll
//! subscription registered on it. Scrolling a container produces one
//! [`PositionSample`] which is run through each subscription on that
//! container, element by element, in attach order.
//!
//! # Re-entrancy
//!
//! The internal lock is never held while listeners or callbacks run, so
//! handlers may call back into the spy:
//!
//! - `detach` from a handler stops delivery to the detached subscription
//!   immediately, including the rest of the current sample
//! - `scroll_to` from a handler is queued and dispatched after the current
//!   sample completes (FIFO, nothing is dropped or merged)
//! - `attach` from a handler takes effect from the next sample
//!
//! # Example
//!
//! ```rust
//! use scrollspy_core::{TrackerConfig, ZoneEventKind};
//! use scrollspy_dom::{Document, ElementSpec, ScrollSpy};
//! use std::sync::{Arc, Mutex};
//!
//! let mut doc = Document::new(800.0, 600.0);
//! let nav = doc.insert(ElementSpec::new("nav").id("nav").size(800.0, 40.0)).unwrap();
//! let spy = ScrollSpy::new(doc);
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let seen_clone = seen.clone();
//! spy.listen(nav, ZoneEventKind::Enter, move |_, event| {
//!     seen_clone.lock().unwrap().push(event.position().top);
//! });
//!
//! spy.attach(TrackerConfig::builder().min(100.0).max(400.0).build(), &[nav]);
//! let viewport = spy.viewport();
//! spy.scroll_to(viewport, 0.0, 50.0).unwrap();
//! spy.scroll_to(viewport, 0.0, 0.0).unwrap();
//! spy.scroll_to(viewport, 150.0, 0.0).unwrap();
//!
//! assert_eq!(*seen.lock().unwrap(), vec![150.0]);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use scrollspy_core::{
    deliver, ContainerSelector, ElementId, EventSink, PositionSample, ScrollSpyOptions,
    TrackerConfig, TrackerState, ZoneEvent, ZoneEventKind, ZoneEvents, ZoneTracker,
    DEFAULT_NAMESPACE,
};
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::document::Document;
use crate::error::Result;

/// Listener for zone notifications on one element
pub type ZoneListener = Arc<dyn Fn(ElementId, &ZoneEvent) + Send + Sync>;

/// Handle of one attach call
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Handle of a registered notification listener
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// What a [`ScrollSpy::scrollspy`] call should do
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Action {
    /// Subscribe the targets
    #[default]
    Attach,
    /// Tear down the namespace on the container
    Destroy,
}

impl Action {
    /// `destroy` in any case selects teardown; anything else attaches
    pub fn parse(action: &str) -> Self {
        if action.trim().eq_ignore_ascii_case("destroy") {
            Action::Destroy
        } else {
            Action::Attach
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Attach => f.write_str("attach"),
            Action::Destroy => f.write_str("destroy"),
        }
    }
}

/// Trackers created by one attach call
struct Subscription {
    container: ElementId,
    namespace: String,
    trackers: Vec<ZoneTracker>,
}

struct SpyInner {
    document: Document,
    subscriptions: IndexMap<SubscriptionId, Subscription>,
    listeners: FxHashMap<(ElementId, ZoneEventKind), Vec<(ListenerId, ZoneListener)>>,
    /// Samples waiting for dispatch
    queue: VecDeque<(ElementId, PositionSample)>,
    dispatching: bool,
    next_id: u64,
}

impl SpyInner {
    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Drop state that refers to elements no longer in the document
    fn prune_removed(&mut self) {
        let SpyInner {
            document,
            subscriptions,
            listeners,
            queue,
            ..
        } = self;

        let before = subscriptions.len();
        subscriptions.retain(|id, sub| {
            if !document.contains(sub.container) {
                debug!(
                    subscription = ?id,
                    namespace = %sub.namespace,
                    "container removed, dropping subscription"
                );
                return false;
            }
            sub.trackers.retain(|tracker| document.contains(tracker.element()));
            if sub.trackers.is_empty() {
                debug!(
                    subscription = ?id,
                    namespace = %sub.namespace,
                    "all targets removed, dropping subscription"
                );
                return false;
            }
            true
        });
        let dropped = before - subscriptions.len();

        listeners.retain(|(element, _), _| document.contains(*element));
        queue.retain(|(container, _)| document.contains(*container));

        if dropped > 0 {
            trace!(dropped, remaining = subscriptions.len(), "pruned removed elements");
        }
    }
}

/// Scroll subscriptions over a shared document
#[derive(Clone)]
pub struct ScrollSpy {
    inner: Arc<Mutex<SpyInner>>,
}

impl fmt::Debug for ScrollSpy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("ScrollSpy")
            .field("elements", &inner.document.len())
            .field("subscriptions", &inner.subscriptions.len())
            .field("dispatching", &inner.dispatching)
            .finish()
    }
}

impl ScrollSpy {
    pub fn new(document: Document) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SpyInner {
                document,
                subscriptions: IndexMap::new(),
                listeners: FxHashMap::default(),
                queue: VecDeque::new(),
                dispatching: false,
                next_id: 1,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SpyInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn viewport(&self) -> ElementId {
        self.lock().document.viewport()
    }

    /// Read the document
    pub fn with_document<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        f(&self.lock().document)
    }

    /// Edit the document (insert, remove, resize)
    ///
    /// The closure runs under the lock and must not call back into the spy.
    /// Subscriptions, trackers and listeners of elements removed by the closure
    /// are dropped before this returns.
    pub fn with_document_mut<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        let mut inner = self.lock();
        let result = f(&mut inner.document);
        inner.prune_removed();
        result
    }

    /// Remove an element together with everything attached to it
    ///
    /// Subscriptions on it as a container are torn down, its tracker is dropped
    /// from other subscriptions, and its listeners are unregistered.
    pub fn remove_element(&self, element: ElementId) -> Result<()> {
        let mut inner = self.lock();
        inner.document.remove(element)?;
        inner.prune_removed();
        Ok(())
    }

    // =========================================================================
    // Attach / detach
    // =========================================================================

    /// Subscribe `targets` to scrolling of the configured container
    ///
    /// Returns `None` without subscribing anything when the container matches
    /// no element or none of the targets belongs to the document.
    pub fn attach(&self, config: TrackerConfig, targets: &[ElementId]) -> Option<SubscriptionId> {
        let mut inner = self.lock();

        let containers = resolve_containers(&inner.document, config.container());
        let Some(&container) = containers.first() else {
            debug!(container = %config.container(), "scrollspy container matched nothing");
            return None;
        };
        if containers.len() > 1 {
            debug!(
                container = %config.container(),
                matched = containers.len(),
                "scrollspy container matched several elements, observing the first"
            );
        }

        let config = Arc::new(config);
        let document = &inner.document;
        let trackers: Vec<ZoneTracker> = targets
            .iter()
            .copied()
            .filter(|&target| {
                let known = document.contains(target);
                if !known {
                    warn!(?target, "scrollspy target is not part of the document");
                }
                known
            })
            .map(|target| ZoneTracker::new(target, Arc::clone(&config)))
            .collect();

        if trackers.is_empty() {
            debug!(namespace = config.namespace(), "no scrollspy targets to attach");
            return None;
        }

        let id = SubscriptionId(inner.next_id());
        debug!(
            subscription = ?id,
            namespace = config.namespace(),
            container = %inner.document.label(container),
            targets = trackers.len(),
            mode = %config.mode(),
            min = config.min(),
            max = %config.max(),
            "scrollspy attached"
        );
        inner.subscriptions.insert(
            id,
            Subscription {
                container,
                namespace: config.namespace().to_string(),
                trackers,
            },
        );
        Some(id)
    }

    /// Attach using loosely typed options
    pub fn attach_options(
        &self,
        options: &ScrollSpyOptions,
        targets: &[ElementId],
    ) -> Option<SubscriptionId> {
        self.attach(options.resolve(), targets)
    }

    /// Attach to every element matching `selector`
    pub fn attach_selector(&self, config: TrackerConfig, selector: &str) -> Option<SubscriptionId> {
        let targets = match self.with_document(|doc| doc.query(selector)) {
            Ok(targets) => targets,
            Err(err) => {
                warn!(%err, "invalid scrollspy target selector");
                return None;
            }
        };
        self.attach(config, &targets)
    }

    /// Attach or tear down depending on `action`
    ///
    /// Teardown uses the container and namespace of `config`.
    pub fn scrollspy(
        &self,
        config: TrackerConfig,
        targets: &[ElementId],
        action: Action,
    ) -> Option<SubscriptionId> {
        match action {
            Action::Attach => self.attach(config, targets),
            Action::Destroy => {
                self.detach(config.container(), config.namespace());
                None
            }
        }
    }

    /// Remove every subscription with `namespace` on the container
    ///
    /// A blank namespace means the default one. Detaching something that was
    /// never attached does nothing. Returns the number of subscriptions removed.
    pub fn detach(&self, container: &ContainerSelector, namespace: &str) -> usize {
        let namespace = if namespace.trim().is_empty() {
            DEFAULT_NAMESPACE
        } else {
            namespace
        };

        let mut inner = self.lock();
        let containers = resolve_containers(&inner.document, container);
        if containers.is_empty() {
            trace!(%container, "scrollspy detach: container matched nothing");
            return 0;
        }

        let before = inner.subscriptions.len();
        inner
            .subscriptions
            .retain(|_, sub| !(sub.namespace == namespace && containers.contains(&sub.container)));
        let removed = before - inner.subscriptions.len();

        if removed > 0 {
            debug!(%container, namespace, removed, "scrollspy detached");
        } else {
            trace!(%container, namespace, "scrollspy detach: nothing attached");
        }
        removed
    }

    /// Remove a single subscription
    pub fn detach_subscription(&self, id: SubscriptionId) -> bool {
        self.lock().subscriptions.shift_remove(&id).is_some()
    }

    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.lock().subscriptions.contains_key(&id)
    }

    pub fn subscription_count(&self) -> usize {
        self.lock().subscriptions.len()
    }

    /// Namespaces subscribed on a container, in attach order
    pub fn namespaces(&self, container: ElementId) -> Vec<String> {
        self.lock()
            .subscriptions
            .values()
            .filter(|sub| sub.container == container)
            .map(|sub| sub.namespace.clone())
            .collect()
    }

    /// Current state of one element's tracker
    pub fn tracker_state(&self, id: SubscriptionId, element: ElementId) -> Option<TrackerState> {
        self.lock()
            .subscriptions
            .get(&id)?
            .trackers
            .iter()
            .find(|tracker| tracker.element() == element)
            .map(|tracker| tracker.state())
    }

    // =========================================================================
    // Notification listeners
    // =========================================================================

    /// Listen for one kind of notification on an element
    pub fn listen<F>(&self, element: ElementId, kind: ZoneEventKind, listener: F) -> ListenerId
    where
        F: Fn(ElementId, &ZoneEvent) + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        let id = ListenerId(inner.next_id());
        inner
            .listeners
            .entry((element, kind))
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Listen by event name (`scrollEnter`, `scrollTick`, ...)
    ///
    /// Returns `None` for names that are not zone notifications.
    pub fn listen_named<F>(&self, element: ElementId, name: &str, listener: F) -> Option<ListenerId>
    where
        F: Fn(ElementId, &ZoneEvent) + Send + Sync + 'static,
    {
        let kind = ZoneEventKind::from_name(name)?;
        Some(self.listen(element, kind, listener))
    }

    pub fn unlisten(&self, id: ListenerId) -> bool {
        let mut inner = self.lock();
        let mut removed = false;
        inner.listeners.retain(|_, listeners| {
            let before = listeners.len();
            listeners.retain(|(listener_id, _)| *listener_id != id);
            removed |= listeners.len() != before;
            !listeners.is_empty()
        });
        removed
    }

    // =========================================================================
    // Scrolling
    // =========================================================================

    /// Set the scroll offset of a container and notify its subscriptions
    pub fn scroll_to(&self, container: ElementId, top: f64, left: f64) -> Result<()> {
        let sample = PositionSample::new(top, left);
        {
            let mut inner = self.lock();
            inner.document.set_scroll_position(container, sample)?;
            inner.queue.push_back((container, sample));
            if inner.dispatching {
                trace!(?container, top, left, "scroll queued behind current dispatch");
                return Ok(());
            }
            inner.dispatching = true;
        }

        let _guard = DispatchGuard { spy: self };
        while let Some((container, sample)) = self.next_queued() {
            self.dispatch(container, sample);
        }
        Ok(())
    }

    /// Scroll relative to the current offset
    pub fn scroll_by(&self, container: ElementId, dy: f64, dx: f64) -> Result<()> {
        let current = self
            .with_document(|doc| doc.scroll_position(container))
            .unwrap_or_default();
        self.scroll_to(container, current.top + dy, current.left + dx)
    }

    /// Re-emit the current offset, e.g. after the layout changed
    pub fn refresh(&self, container: ElementId) -> Result<()> {
        let current = self
            .with_document(|doc| doc.scroll_position(container))
            .ok_or(crate::error::DomError::UnknownElement(container))?;
        self.scroll_to(container, current.top, current.left)
    }

    fn next_queued(&self) -> Option<(ElementId, PositionSample)> {
        let mut inner = self.lock();
        let next = inner.queue.pop_front();
        if next.is_none() {
            inner.dispatching = false;
        }
        next
    }

    /// Run one sample through every subscription on `container`
    fn dispatch(&self, container: ElementId, sample: PositionSample) {
        let subscriptions: SmallVec<[SubscriptionId; 4]> = self
            .lock()
            .subscriptions
            .iter()
            .filter(|(_, sub)| sub.container == container)
            .map(|(id, _)| *id)
            .collect();

        trace!(
            ?container,
            top = sample.top,
            left = sample.left,
            subscriptions = subscriptions.len(),
            "scroll sample"
        );

        for id in subscriptions {
            let targets: SmallVec<[ElementId; 8]> = match self.lock().subscriptions.get(&id) {
                Some(sub) => sub.trackers.iter().map(|tracker| tracker.element()).collect(),
                None => continue,
            };

            for element in targets {
                let Some((config, events)) = self.step(id, element, container, sample) else {
                    continue;
                };
                let mut sink = ListenerSink { spy: self };
                for event in &events {
                    if !self.is_subscribed(id) {
                        trace!(subscription = ?id, "subscription detached during delivery");
                        break;
                    }
                    deliver(element, &config, std::slice::from_ref(event), &mut sink);
                }
            }
        }
    }

    /// Advance one element's tracker under the lock
    ///
    /// `None` when the subscription or the tracker is gone.
    fn step(
        &self,
        id: SubscriptionId,
        element: ElementId,
        container: ElementId,
        sample: PositionSample,
    ) -> Option<(Arc<TrackerConfig>, ZoneEvents)> {
        let mut guard = self.lock();
        let SpyInner {
            document,
            subscriptions,
            ..
        } = &mut *guard;

        let tracker = subscriptions
            .get_mut(&id)?
            .trackers
            .iter_mut()
            .find(|tracker| tracker.element() == element)?;
        let metrics = document.layout_metrics(container, element);
        let events = tracker.process(sample, &metrics);
        Some((Arc::clone(tracker.config()), events))
    }

    fn listeners_for(&self, element: ElementId, kind: ZoneEventKind) -> SmallVec<[ZoneListener; 2]> {
        self.lock()
            .listeners
            .get(&(element, kind))
            .map(|listeners| listeners.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default()
    }
}

/// Routes notifications to the listeners registered on the spy
struct ListenerSink<'a> {
    spy: &'a ScrollSpy,
}

impl EventSink for ListenerSink<'_> {
    fn dispatch(&mut self, element: ElementId, event: &ZoneEvent) {
        for listener in self.spy.listeners_for(element, event.kind()) {
            listener(element, event);
        }
    }
}

/// Resets the dispatch flag if a handler panics mid-dispatch
struct DispatchGuard<'a> {
    spy: &'a ScrollSpy,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let mut inner = self.spy.lock();
            inner.dispatching = false;
            inner.queue.clear();
        }
    }
}

fn resolve_containers(document: &Document, container: &ContainerSelector) -> Vec<ElementId> {
    match container {
        ContainerSelector::Viewport => vec![document.viewport()],
        ContainerSelector::Selector(selector) => document.query(selector).unwrap_or_else(|err| {
            warn!(%err, "invalid scrollspy container selector");
            Vec::new()
        }),
    }
}
