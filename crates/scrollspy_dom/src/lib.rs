//! Scrollspy DOM host
//!
//! Connects [`scrollspy_core`] trackers to an element tree:
//!
//! - [`Document`]: elements with box sizes, ids, classes and scroll offsets
//! - [`Selector`]: `window`, `#id`, `.class` and tag lookup
//! - [`ScrollSpy`]: namespaced subscriptions, scroll dispatch and listeners
//!
//! Containers are resolved once at attach time. Every scroll of a container
//! runs one sample through all subscriptions on it.

pub mod document;
pub mod error;
pub mod selector;
pub mod spy;

pub use document::{BoxMetrics, Document, ElementSpec};
pub use error::{DomError, Result};
pub use selector::{Selector, SimpleSelector};
pub use spy::{Action, ListenerId, ScrollSpy, SubscriptionId, ZoneListener};

pub use scrollspy_core;
