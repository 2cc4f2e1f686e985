//! Zone tracker - the enter/leave/tick state machine
//!
//! Each attached element owns one [`ZoneTracker`]. For every scroll sample the
//! tracker computes the buffered coordinate, tests it against
//! `[min, effective_max]` (inclusive at both ends) and produces at most two
//! notifications:
//!
//! ```text
//! Outside --(in zone)--> Inside      Enter, Tick
//! Inside  --(in zone)--> Inside      Tick
//! Inside  --(out)------> Outside     Leave, LeaveTop | LeaveBottom
//! Outside --(out)------> Outside     (nothing)
//! ```
//!
//! Computing notifications ([`ZoneTracker::process`]) is separate from
//! delivering them ([`deliver`]) so a host can release its own locks before
//! user code runs.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::trace;

use crate::config::TrackerConfig;
use crate::element::ElementId;
use crate::events::{EventSink, ZoneEvent};
use crate::position::{LayoutMetrics, PositionSample};

/// Notifications produced by a single sample (never more than two)
pub type ZoneEvents = SmallVec<[ZoneEvent; 2]>;

/// Zone membership of one element
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Membership {
    #[default]
    Outside,
    Inside,
}

impl Membership {
    pub fn is_inside(&self) -> bool {
        matches!(self, Membership::Inside)
    }

    /// Next membership for a sample, `None` when it does not change
    pub fn on_sample(&self, in_zone: bool) -> Option<Self> {
        match (self, in_zone) {
            (Membership::Outside, true) => Some(Membership::Inside),
            (Membership::Inside, false) => Some(Membership::Outside),
            _ => None,
        }
    }
}

/// Mutable per-element state
///
/// Entries and exits alternate, so `enters - 1 <= leaves <= enters` always holds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerState {
    membership: Membership,
    enters: u32,
    leaves: u32,
}

impl TrackerState {
    pub fn inside_zone(&self) -> bool {
        self.membership.is_inside()
    }

    pub fn membership(&self) -> Membership {
        self.membership
    }

    pub fn enter_count(&self) -> u32 {
        self.enters
    }

    pub fn leave_count(&self) -> u32 {
        self.leaves
    }
}

/// Tracks one element against the zone of a shared configuration
#[derive(Clone, Debug)]
pub struct ZoneTracker {
    element: ElementId,
    config: Arc<TrackerConfig>,
    state: TrackerState,
}

impl ZoneTracker {
    pub fn new(element: ElementId, config: Arc<TrackerConfig>) -> Self {
        Self {
            element,
            config,
            state: TrackerState::default(),
        }
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn config(&self) -> &Arc<TrackerConfig> {
        &self.config
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Advance the state machine by one sample
    ///
    /// Returns the notifications in the order they must be delivered.
    pub fn process(&mut self, sample: PositionSample, metrics: &LayoutMetrics) -> ZoneEvents {
        let config = &*self.config;
        let (min, max) = config.zone(metrics);
        let coordinate = config.coordinate(&sample);
        let in_zone = min <= coordinate && coordinate <= max;

        let mut events = ZoneEvents::new();

        match self.state.membership.on_sample(in_zone) {
            Some(Membership::Inside) => {
                self.state.membership = Membership::Inside;
                self.state.enters = self.state.enters.saturating_add(1);
                trace!(
                    element = ?self.element,
                    coordinate,
                    min,
                    max,
                    enters = self.state.enters,
                    "zone enter"
                );
                events.push(ZoneEvent::Enter { position: sample });
            }
            Some(Membership::Outside) => {
                self.state.membership = Membership::Outside;
                self.state.leaves = self.state.leaves.saturating_add(1);
                let leaves = self.state.leaves;
                trace!(
                    element = ?self.element,
                    coordinate,
                    min,
                    max,
                    leaves,
                    "zone leave"
                );
                events.push(ZoneEvent::Leave {
                    position: sample,
                    leaves,
                });
                if coordinate <= min {
                    events.push(ZoneEvent::LeaveTop {
                        position: sample,
                        leaves,
                    });
                } else if coordinate >= max {
                    events.push(ZoneEvent::LeaveBottom {
                        position: sample,
                        leaves,
                    });
                }
            }
            None => {}
        }

        if in_zone {
            events.push(ZoneEvent::Tick {
                position: sample,
                inside: self.state.inside_zone(),
                enters: self.state.enters,
                leaves: self.state.leaves,
            });
        }

        events
    }

    /// Process a sample and deliver its notifications straight away
    ///
    /// Returns the number of notifications delivered.
    pub fn on_sample(
        &mut self,
        sample: PositionSample,
        metrics: &LayoutMetrics,
        sink: &mut dyn EventSink,
    ) -> usize {
        let events = self.process(sample, metrics);
        deliver(self.element, &self.config, &events, sink);
        events.len()
    }
}

/// Deliver notifications for one element
///
/// Each event goes to the sink first, then to its callback slot.
pub fn deliver(
    element: ElementId,
    config: &TrackerConfig,
    events: &[ZoneEvent],
    sink: &mut dyn EventSink,
) {
    for event in events {
        sink.dispatch(element, event);
        config.notify(element, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MaxBound, Mode};
    use crate::events::{EventLog, ZoneEventKind};
    use std::sync::Mutex;

    use ZoneEventKind::*;

    fn tracker(config: TrackerConfig) -> ZoneTracker {
        ZoneTracker::new(ElementId::default(), Arc::new(config))
    }

    fn fixed(min: f64, max: f64) -> ZoneTracker {
        tracker(TrackerConfig::builder().min(min).max(max).build())
    }

    fn kinds(events: &ZoneEvents) -> Vec<ZoneEventKind> {
        events.iter().map(|e| e.kind()).collect()
    }

    fn step(tracker: &mut ZoneTracker, top: f64) -> Vec<ZoneEventKind> {
        kinds(&tracker.process(PositionSample::vertical(top), &LayoutMetrics::default()))
    }

    #[test]
    fn test_membership_transitions() {
        assert_eq!(
            Membership::Outside.on_sample(true),
            Some(Membership::Inside)
        );
        assert_eq!(
            Membership::Inside.on_sample(false),
            Some(Membership::Outside)
        );
        assert_eq!(Membership::Inside.on_sample(true), None);
        assert_eq!(Membership::Outside.on_sample(false), None);
    }

    #[test]
    fn test_enter_then_tick() {
        let mut t = fixed(0.0, 100.0);
        let events = t.process(PositionSample::vertical(50.0), &LayoutMetrics::default());

        assert_eq!(kinds(&events), vec![Enter, Tick]);
        assert_eq!(
            events[1],
            ZoneEvent::Tick {
                position: PositionSample::vertical(50.0),
                inside: true,
                enters: 1,
                leaves: 0,
            }
        );
        assert!(t.state().inside_zone());
        assert_eq!(t.state().enter_count(), 1);
    }

    #[test]
    fn test_enter_leave_enter_scenario() {
        let mut t = fixed(0.0, 100.0);

        assert_eq!(step(&mut t, 50.0), vec![Enter, Tick]);
        assert_eq!(t.state().enter_count(), 1);

        let events = t.process(PositionSample::vertical(150.0), &LayoutMetrics::default());
        assert_eq!(kinds(&events), vec![Leave, LeaveBottom]);
        assert_eq!(
            events[0],
            ZoneEvent::Leave {
                position: PositionSample::vertical(150.0),
                leaves: 1,
            }
        );
        assert_eq!(t.state().leave_count(), 1);

        assert_eq!(step(&mut t, 50.0), vec![Enter, Tick]);
        assert_eq!(t.state().enter_count(), 2);
        assert_eq!(t.state().leave_count(), 1);
    }

    #[test]
    fn test_staying_inside_only_ticks() {
        let mut t = fixed(0.0, 100.0);
        assert_eq!(step(&mut t, 10.0), vec![Enter, Tick]);
        for top in [20.0, 30.0, 99.0, 100.0] {
            assert_eq!(step(&mut t, top), vec![Tick]);
        }
        assert_eq!(t.state().enter_count(), 1);
        assert_eq!(t.state().leave_count(), 0);
    }

    #[test]
    fn test_staying_outside_is_silent() {
        let mut t = fixed(100.0, 200.0);
        assert!(step(&mut t, 10.0).is_empty());
        assert!(step(&mut t, 500.0).is_empty());
        assert_eq!(t.state(), TrackerState::default());
    }

    #[test]
    fn test_leave_at_min_is_top() {
        // Zone entered, then the coordinate drops below min
        let mut t = tracker(TrackerConfig::builder().min(100.0).max(200.0).buffer(0.0).build());
        assert_eq!(step(&mut t, 150.0), vec![Enter, Tick]);
        assert_eq!(step(&mut t, 99.0), vec![Leave, LeaveTop]);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let mut t = fixed(100.0, 200.0);
        assert_eq!(step(&mut t, 100.0), vec![Enter, Tick]);
        assert_eq!(step(&mut t, 200.0), vec![Tick]);
        assert_eq!(step(&mut t, 200.5), vec![Leave, LeaveBottom]);
    }

    #[test]
    fn test_leave_below_min_with_buffer() {
        // top=90 with buffer -1 compares 89 against min=100
        let mut t = tracker(
            TrackerConfig::builder()
                .min(100.0)
                .max(200.0)
                .buffer(-1.0)
                .build(),
        );
        assert_eq!(step(&mut t, 150.0), vec![Enter, Tick]);
        assert_eq!(step(&mut t, 90.0), vec![Leave, LeaveTop]);
        assert_eq!(t.state().leave_count(), 1);
    }

    #[test]
    fn test_leave_exactly_at_min_when_zone_collapses() {
        // The dynamic max shrinks below min, so a coordinate equal to min is
        // outside. The lower edge is checked first.
        let mut t = tracker(TrackerConfig::builder().min(100.0).build());
        let tall = LayoutMetrics {
            container_height: 300.0,
            ..Default::default()
        };
        let short = LayoutMetrics {
            container_height: 50.0,
            ..Default::default()
        };

        assert_eq!(
            kinds(&t.process(PositionSample::vertical(150.0), &tall)),
            vec![Enter, Tick]
        );
        assert_eq!(
            kinds(&t.process(PositionSample::vertical(100.0), &short)),
            vec![Leave, LeaveTop]
        );
    }

    #[test]
    fn test_dynamic_max_is_inclusive() {
        let metrics = LayoutMetrics {
            container_height: 50.0,
            ..Default::default()
        };
        let mut t = tracker(TrackerConfig::builder().min(0.0).build());
        let events = t.process(PositionSample::vertical(50.0), &metrics);
        assert_eq!(kinds(&events), vec![Enter, Tick]);

        let events = t.process(PositionSample::vertical(60.0), &metrics);
        assert_eq!(kinds(&events), vec![Leave, LeaveBottom]);
    }

    #[test]
    fn test_dynamic_max_uses_container_height() {
        let metrics = LayoutMetrics {
            container_height: 200.0,
            ..Default::default()
        };
        let mut t = tracker(TrackerConfig::builder().max(0.0).build());

        let events = t.process(PositionSample::vertical(250.0), &metrics);
        assert!(events.is_empty());
        assert!(!t.state().inside_zone());

        let events = t.process(PositionSample::vertical(150.0), &metrics);
        assert_eq!(kinds(&events), vec![Enter, Tick]);
    }

    #[test]
    fn test_dynamic_max_recomputed_every_sample() {
        let mut t = tracker(TrackerConfig::default());
        let small = LayoutMetrics {
            container_height: 100.0,
            ..Default::default()
        };
        let large = LayoutMetrics {
            container_height: 400.0,
            ..Default::default()
        };

        assert!(t.process(PositionSample::vertical(300.0), &small).is_empty());
        assert_eq!(
            kinds(&t.process(PositionSample::vertical(300.0), &large)),
            vec![Enter, Tick]
        );
    }

    #[test]
    fn test_horizontal_dynamic_max() {
        let metrics = LayoutMetrics {
            container_height: 10.0,
            container_outer_width: 300.0,
            element_outer_width: 100.0,
        };
        let mut t = tracker(TrackerConfig::builder().mode(Mode::Horizontal).build());

        // top is ignored in horizontal mode
        let events = t.process(PositionSample::new(9999.0, 350.0), &metrics);
        assert_eq!(kinds(&events), vec![Enter, Tick]);

        let events = t.process(PositionSample::new(0.0, 401.0), &metrics);
        assert_eq!(kinds(&events), vec![Leave, LeaveBottom]);
    }

    #[test]
    fn test_horizontal_leave_through_start() {
        let mut t = tracker(
            TrackerConfig::builder()
                .mode(Mode::Horizontal)
                .min(100.0)
                .max(500.0)
                .build(),
        );

        let events = t.process(PositionSample::new(0.0, 200.0), &LayoutMetrics::default());
        assert_eq!(kinds(&events), vec![Enter, Tick]);

        // A large top does not matter; left dropped below min
        let events = t.process(PositionSample::new(300.0, 40.0), &LayoutMetrics::default());
        assert_eq!(kinds(&events), vec![Leave, LeaveTop]);
        assert_eq!(events[1].position(), PositionSample::new(300.0, 40.0));
    }

    #[test]
    fn test_counters_saturate() {
        let mut t = fixed(0.0, 100.0);
        t.state.enters = u32::MAX;
        t.state.leaves = u32::MAX - 1;
        t.state.membership = Membership::Inside;

        let events = t.process(PositionSample::vertical(200.0), &LayoutMetrics::default());
        assert_eq!(kinds(&events), vec![Leave, LeaveBottom]);
        assert_eq!(t.state().leave_count(), u32::MAX);

        let events = t.process(PositionSample::vertical(50.0), &LayoutMetrics::default());
        assert_eq!(kinds(&events), vec![Enter, Tick]);
        assert_eq!(t.state().enter_count(), u32::MAX);
    }

    #[test]
    fn test_literal_zero_max() {
        let mut t = tracker(
            TrackerConfig::builder()
                .min(-10.0)
                .max_bound(MaxBound::Fixed(0.0))
                .build(),
        );
        let metrics = LayoutMetrics {
            container_height: 500.0,
            ..Default::default()
        };
        assert_eq!(
            kinds(&t.process(PositionSample::vertical(0.0), &metrics)),
            vec![Enter, Tick]
        );
        assert_eq!(
            kinds(&t.process(PositionSample::vertical(5.0), &metrics)),
            vec![Leave, LeaveBottom]
        );
    }

    #[test]
    fn test_nan_sample_leaves_without_edge() {
        let mut t = fixed(0.0, 100.0);
        step(&mut t, 50.0);
        assert_eq!(step(&mut t, f64::NAN), vec![Leave]);
    }

    #[test]
    fn test_counter_invariant_over_sequence() {
        let mut t = fixed(100.0, 200.0);
        let tops = [
            0.0, 150.0, 250.0, 250.0, 120.0, 90.0, 100.0, 200.0, 201.0, 50.0, 175.0, 175.0, 0.0,
        ];
        for top in tops {
            step(&mut t, top);
            let state = t.state();
            assert!(state.leave_count() <= state.enter_count());
            assert!(state.enter_count() - state.leave_count() <= 1);
            assert_eq!(
                state.inside_zone(),
                state.enter_count() == state.leave_count() + 1
            );
        }
        assert_eq!(t.state().enter_count(), 4);
        assert_eq!(t.state().leave_count(), 4);
    }

    #[test]
    fn test_deliver_interleaves_sink_and_callbacks() {
        let order = Arc::new(Mutex::new(Vec::<String>::new()));
        let enter_order = order.clone();
        let tick_order = order.clone();

        let config = TrackerConfig::builder()
            .min(0.0)
            .max(100.0)
            .on_enter(move |_, _| enter_order.lock().unwrap().push("onEnter".into()))
            .on_tick(move |_, _, _, enters, _| {
                tick_order.lock().unwrap().push(format!("onTick:{}", enters))
            })
            .build();

        struct Recorder(Arc<Mutex<Vec<String>>>);
        impl EventSink for Recorder {
            fn dispatch(&mut self, _element: ElementId, event: &ZoneEvent) {
                self.0.lock().unwrap().push(event.name().to_string());
            }
        }

        let mut t = tracker(config);
        let mut sink = Recorder(order.clone());
        let delivered = t.on_sample(
            PositionSample::vertical(50.0),
            &LayoutMetrics::default(),
            &mut sink,
        );

        assert_eq!(delivered, 2);
        assert_eq!(
            *order.lock().unwrap(),
            vec!["scrollEnter", "onEnter", "scrollTick", "onTick:1"]
        );
    }

    #[test]
    fn test_leave_callbacks() {
        let hits = Arc::new(Mutex::new(Vec::<&'static str>::new()));
        let (a, b, c) = (hits.clone(), hits.clone(), hits.clone());

        let config = TrackerConfig::builder()
            .min(100.0)
            .max(200.0)
            .on_leave(move |_, _| a.lock().unwrap().push("leave"))
            .on_leave_top(move |_, _| b.lock().unwrap().push("top"))
            .on_leave_bottom(move |_, _| c.lock().unwrap().push("bottom"))
            .build();

        let mut t = tracker(config);
        let mut log = EventLog::new();
        let metrics = LayoutMetrics::default();
        t.on_sample(PositionSample::vertical(150.0), &metrics, &mut log);
        t.on_sample(PositionSample::vertical(300.0), &metrics, &mut log);
        t.on_sample(PositionSample::vertical(150.0), &metrics, &mut log);
        t.on_sample(PositionSample::vertical(10.0), &metrics, &mut log);

        assert_eq!(
            *hits.lock().unwrap(),
            vec!["leave", "bottom", "leave", "top"]
        );
        assert_eq!(
            log.kinds(),
            vec![Enter, Tick, Leave, LeaveBottom, Enter, Tick, Leave, LeaveTop]
        );
    }
}
