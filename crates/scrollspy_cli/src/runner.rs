//! Scenario replay

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use scrollspy_core::{
    ContainerSelector, ElementId, EventLog, EventSink, TrackerConfig, ZoneEvent, ZoneEventKind,
};
use scrollspy_dom::{BoxMetrics, Document, ScrollSpy, SubscriptionId};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::scenario::{Scenario, Step};

/// One notification observed during replay
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    /// 1-based index of the step that produced it
    pub step: usize,
    pub element: String,
    #[serde(flatten)]
    pub event: ZoneEvent,
}

/// A tracker entry after attach
#[derive(Debug, Clone)]
pub struct AttachedTracker {
    pub targets: String,
    pub matched: usize,
    pub subscription: Option<SubscriptionId>,
}

/// Document, subscriptions and recorded notifications of a scenario
pub struct Replay {
    spy: ScrollSpy,
    log: Arc<Mutex<EventLog>>,
    trackers: Vec<AttachedTracker>,
}

impl Replay {
    /// Build the document and attach every tracker
    pub fn prepare(scenario: &Scenario) -> Result<Self> {
        let mut document = Document::new(scenario.viewport.width, scenario.viewport.height);
        for (i, spec) in scenario.elements.iter().enumerate() {
            document
                .insert(spec.clone())
                .with_context(|| format!("Invalid element #{}", i + 1))?;
        }

        let spy = ScrollSpy::new(document);
        let log = Arc::new(Mutex::new(EventLog::new()));
        let mut listened: Vec<ElementId> = Vec::new();
        let mut trackers = Vec::with_capacity(scenario.trackers.len());

        for entry in &scenario.trackers {
            let targets = spy
                .with_document(|doc| doc.query(&entry.targets))
                .with_context(|| format!("Invalid tracker targets '{}'", entry.targets))?;

            for &target in &targets {
                if !listened.contains(&target) {
                    listen_all(&spy, target, &log);
                    listened.push(target);
                }
            }

            let config: TrackerConfig = entry.options.resolve();
            let subscription = spy.attach(config, &targets);
            if subscription.is_none() {
                warn!(targets = %entry.targets, "tracker attached nothing");
            }
            trackers.push(AttachedTracker {
                targets: entry.targets.clone(),
                matched: targets.len(),
                subscription,
            });
        }

        Ok(Self { spy, log, trackers })
    }

    pub fn spy(&self) -> &ScrollSpy {
        &self.spy
    }

    pub fn trackers(&self) -> &[AttachedTracker] {
        &self.trackers
    }

    /// Run every step, collecting notifications in delivery order
    pub fn run(&self, steps: &[Step]) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        for (i, step) in steps.iter().enumerate() {
            let index = i + 1;
            debug!(step = index, %step, "replaying");
            self.apply(step)
                .with_context(|| format!("Step {} ({}) failed", index, step))?;

            let entries = match self.log.lock() {
                Ok(mut log) => log.take(),
                Err(poisoned) => poisoned.into_inner().take(),
            };
            records.extend(entries.into_iter().map(|(element, event)| Record {
                step: index,
                element: self.spy.with_document(|doc| doc.label(element)),
                event,
            }));
        }
        info!(steps = steps.len(), notifications = records.len(), "replay finished");
        Ok(records)
    }

    fn apply(&self, step: &Step) -> Result<()> {
        match step {
            Step::Scroll {
                container,
                top,
                left,
            } => {
                let container = self.resolve(container)?;
                self.spy.scroll_to(container, *top, *left)?;
            }
            Step::ScrollBy { container, dy, dx } => {
                let container = self.resolve(container)?;
                self.spy.scroll_by(container, *dy, *dx)?;
            }
            Step::Detach {
                container,
                namespace,
            } => {
                let selector = container_selector(container);
                let removed = self.spy.detach(&selector, namespace);
                debug!(%selector, removed, "detach step");
            }
            Step::Resize {
                element,
                width,
                height,
                container,
            } => {
                let element = self.resolve(element)?;
                let container = self.resolve(container)?;
                let metrics = self
                    .spy
                    .with_document(|doc| doc.metrics(element))
                    .unwrap_or_default();
                let resized = BoxMetrics {
                    width: *width,
                    height: *height,
                    ..metrics
                };
                self.spy
                    .with_document_mut(|doc| doc.set_metrics(element, resized))?;
                self.spy.refresh(container)?;
            }
        }
        Ok(())
    }

    /// First element matching a selector
    fn resolve(&self, selector: &str) -> Result<ElementId> {
        let matches = self.spy.with_document(|doc| doc.query(selector))?;
        matches
            .first()
            .copied()
            .with_context(|| format!("'{}' matches no element", selector))
    }
}

fn container_selector(container: &str) -> ContainerSelector {
    if container.trim().eq_ignore_ascii_case("window") {
        ContainerSelector::Viewport
    } else {
        ContainerSelector::from(container)
    }
}

fn listen_all(spy: &ScrollSpy, element: ElementId, log: &Arc<Mutex<EventLog>>) {
    for kind in ZoneEventKind::ALL {
        let log = Arc::clone(log);
        spy.listen(element, kind, move |element, event| {
            if let Ok(mut log) = log.lock() {
                log.dispatch(element, event);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replay(toml: &str) -> Vec<String> {
        let scenario = Scenario::from_toml(toml).unwrap();
        let replay = Replay::prepare(&scenario).unwrap();
        replay
            .run(&scenario.steps)
            .unwrap()
            .iter()
            .map(|r| format!("{}:{}:{}", r.step, r.element, r.event.name()))
            .collect()
    }

    const FEED: &str = r##"
[[elements]]
id = "feed"
width = 300
height = 200

[[elements]]
id = "card"
width = 100
height = 40
"##;

    #[test]
    fn test_enter_leave_enter() {
        let toml = format!(
            r##"{FEED}
[[trackers]]
targets = "#card"
options = {{ container = "#feed", min = 0, max = 100 }}

[[steps]]
action = "scroll"
container = "#feed"
top = 50

[[steps]]
action = "scroll"
container = "#feed"
top = 150

[[steps]]
action = "scroll"
container = "#feed"
top = 50
"##
        );
        assert_eq!(
            replay(&toml),
            vec![
                "1:#card:scrollEnter",
                "1:#card:scrollTick",
                "2:#card:scrollLeave",
                "2:#card:scrollLeaveBottom",
                "3:#card:scrollEnter",
                "3:#card:scrollTick",
            ]
        );
    }

    #[test]
    fn test_detach_and_resize_steps() {
        let toml = format!(
            r##"{FEED}
[[trackers]]
targets = "#card"
options = {{ container = "#feed", namespace = "a" }}

[[trackers]]
targets = "#card"
options = {{ container = "#feed", namespace = "b", min = 240 }}

[[steps]]
action = "scroll"
container = "#feed"
top = 250

[[steps]]
action = "detach"
container = "#feed"
namespace = "a"

[[steps]]
action = "resize"
element = "#feed"
container = "#feed"
width = 300
height = 400
"##
        );
        // Step 1: both outside (dynamic max 200). Step 3: only "b" is left.
        assert_eq!(
            replay(&toml),
            vec!["3:#card:scrollEnter", "3:#card:scrollTick"]
        );
    }

    #[test]
    fn test_unknown_step_container_fails() {
        let toml = format!(
            r##"{FEED}
[[steps]]
action = "scroll"
container = "#missing"
top = 1
"##
        );
        let scenario = Scenario::from_toml(&toml).unwrap();
        let replay = Replay::prepare(&scenario).unwrap();
        let err = replay.run(&scenario.steps).unwrap_err();
        assert!(format!("{:#}", err).contains("'#missing' matches no element"));
    }

    #[test]
    fn test_unmatched_tracker_is_reported() {
        let toml = format!(
            r##"{FEED}
[[trackers]]
targets = "#card"
options = {{ container = "#nowhere" }}
"##
        );
        let scenario = Scenario::from_toml(&toml).unwrap();
        let replay = Replay::prepare(&scenario).unwrap();
        assert_eq!(replay.trackers()[0].matched, 1);
        assert!(replay.trackers()[0].subscription.is_none());
    }

    #[test]
    fn test_records_serialize_with_event_tag() {
        let record = Record {
            step: 2,
            element: "#card".into(),
            event: ZoneEvent::Leave {
                position: scrollspy_core::PositionSample::vertical(150.0),
                leaves: 1,
            },
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["step"], 2);
        assert_eq!(json["element"], "#card");
        assert_eq!(json["event"], "scrollLeave");
        assert_eq!(json["leaves"], 1);
    }
}
