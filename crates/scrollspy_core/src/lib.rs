//! Scrollspy Core
//!
//! Zone tracking for scroll containers: given the scroll offset of a
//! container, report for each attached element whether the buffered
//! coordinate lies inside `[min, max]`, and emit notifications when that
//! changes.
//!
//! - **Configuration**: immutable per attach call, thresholds resolved once
//! - **Zone Tracker**: the enter/leave/tick state machine
//! - **Notifications**: typed events delivered to an injected [`EventSink`]
//!
//! The crate does not observe anything by itself. A host feeds it
//! [`PositionSample`]s and [`LayoutMetrics`] and routes the resulting
//! notifications; `scrollspy_dom` is such a host.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use scrollspy_core::{
//!     ElementId, EventLog, LayoutMetrics, PositionSample, TrackerConfig, ZoneEventKind,
//!     ZoneTracker,
//! };
//!
//! let config = Arc::new(TrackerConfig::builder().min(0.0).max(100.0).build());
//! let mut tracker = ZoneTracker::new(ElementId::default(), config);
//! let mut log = EventLog::new();
//! let metrics = LayoutMetrics::default();
//!
//! for top in [50.0, 150.0, 50.0] {
//!     tracker.on_sample(PositionSample::vertical(top), &metrics, &mut log);
//! }
//!
//! assert_eq!(
//!     log.kinds(),
//!     vec![
//!         ZoneEventKind::Enter,
//!         ZoneEventKind::Tick,
//!         ZoneEventKind::Leave,
//!         ZoneEventKind::LeaveBottom,
//!         ZoneEventKind::Enter,
//!         ZoneEventKind::Tick,
//!     ]
//! );
//! assert_eq!(tracker.state().enter_count(), 2);
//! ```

pub mod callbacks;
pub mod config;
pub mod element;
pub mod events;
pub mod position;
pub mod tracker;

pub use callbacks::{PositionCallback, TickCallback, ZoneCallbacks};
pub use config::{
    ContainerSelector, MaxBound, Mode, ScrollSpyOptions, Threshold, TrackerConfig,
    TrackerConfigBuilder, DEFAULT_NAMESPACE,
};
pub use element::ElementId;
pub use events::{event_names, EventLog, EventSink, NullSink, ZoneEvent, ZoneEventKind};
pub use position::{LayoutMetrics, PositionSample};
pub use tracker::{deliver, Membership, TrackerState, ZoneEvents, ZoneTracker};
