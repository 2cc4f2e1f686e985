//! Zone notifications and the sink they are dispatched to
//!
//! Every notification carries the sample that produced it. Event names match
//! the ones consumers subscribe to on the host (`scrollEnter`, `scrollTick`,
//! `scrollLeave`, `scrollLeaveTop`, `scrollLeaveBottom`).
//!
//! In horizontal mode `LeaveTop` and `LeaveBottom` denote leaving through the
//! start and end edges respectively.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::element::ElementId;
use crate::position::PositionSample;

/// Event names as seen by listeners
pub mod event_names {
    pub const SCROLL_ENTER: &str = "scrollEnter";
    pub const SCROLL_TICK: &str = "scrollTick";
    pub const SCROLL_LEAVE: &str = "scrollLeave";
    pub const SCROLL_LEAVE_TOP: &str = "scrollLeaveTop";
    pub const SCROLL_LEAVE_BOTTOM: &str = "scrollLeaveBottom";
}

/// Discriminant of a [`ZoneEvent`], used as the listener key
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneEventKind {
    #[serde(rename = "scrollEnter")]
    Enter,
    #[serde(rename = "scrollTick")]
    Tick,
    #[serde(rename = "scrollLeave")]
    Leave,
    #[serde(rename = "scrollLeaveTop")]
    LeaveTop,
    #[serde(rename = "scrollLeaveBottom")]
    LeaveBottom,
}

impl ZoneEventKind {
    pub const ALL: [ZoneEventKind; 5] = [
        ZoneEventKind::Enter,
        ZoneEventKind::Tick,
        ZoneEventKind::Leave,
        ZoneEventKind::LeaveTop,
        ZoneEventKind::LeaveBottom,
    ];

    pub fn name(&self) -> &'static str {
        use event_names::*;
        match self {
            ZoneEventKind::Enter => SCROLL_ENTER,
            ZoneEventKind::Tick => SCROLL_TICK,
            ZoneEventKind::Leave => SCROLL_LEAVE,
            ZoneEventKind::LeaveTop => SCROLL_LEAVE_TOP,
            ZoneEventKind::LeaveBottom => SCROLL_LEAVE_BOTTOM,
        }
    }

    /// Look up a kind by its event name (exact match)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for ZoneEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A notification produced by the tracker for one element
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ZoneEvent {
    /// The buffered coordinate entered `[min, max]`
    #[serde(rename = "scrollEnter")]
    Enter { position: PositionSample },
    /// A sample landed inside the zone (including the entry sample)
    #[serde(rename = "scrollTick")]
    Tick {
        position: PositionSample,
        inside: bool,
        enters: u32,
        leaves: u32,
    },
    /// The buffered coordinate left the zone
    #[serde(rename = "scrollLeave")]
    Leave { position: PositionSample, leaves: u32 },
    /// Left through the lower bound
    #[serde(rename = "scrollLeaveTop")]
    LeaveTop { position: PositionSample, leaves: u32 },
    /// Left through the upper bound
    #[serde(rename = "scrollLeaveBottom")]
    LeaveBottom { position: PositionSample, leaves: u32 },
}

impl ZoneEvent {
    pub fn kind(&self) -> ZoneEventKind {
        match self {
            ZoneEvent::Enter { .. } => ZoneEventKind::Enter,
            ZoneEvent::Tick { .. } => ZoneEventKind::Tick,
            ZoneEvent::Leave { .. } => ZoneEventKind::Leave,
            ZoneEvent::LeaveTop { .. } => ZoneEventKind::LeaveTop,
            ZoneEvent::LeaveBottom { .. } => ZoneEventKind::LeaveBottom,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn position(&self) -> PositionSample {
        match *self {
            ZoneEvent::Enter { position }
            | ZoneEvent::Tick { position, .. }
            | ZoneEvent::Leave { position, .. }
            | ZoneEvent::LeaveTop { position, .. }
            | ZoneEvent::LeaveBottom { position, .. } => position,
        }
    }
}

impl fmt::Display for ZoneEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let position = self.position();
        write!(
            f,
            "{} top={} left={}",
            self.name(),
            position.top,
            position.left
        )?;
        match *self {
            ZoneEvent::Enter { .. } => Ok(()),
            ZoneEvent::Tick {
                inside,
                enters,
                leaves,
                ..
            } => write!(f, " inside={} enters={} leaves={}", inside, enters, leaves),
            ZoneEvent::Leave { leaves, .. }
            | ZoneEvent::LeaveTop { leaves, .. }
            | ZoneEvent::LeaveBottom { leaves, .. } => write!(f, " leaves={}", leaves),
        }
    }
}

/// Receiver of zone notifications
///
/// Calls are fire-and-forget; the tracker never inspects a result.
pub trait EventSink {
    fn dispatch(&mut self, element: ElementId, event: &ZoneEvent);
}

/// Sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn dispatch(&mut self, _element: ElementId, _event: &ZoneEvent) {}
}

/// Sink that records notifications in dispatch order
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    entries: Vec<(ElementId, ZoneEvent)>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[(ElementId, ZoneEvent)] {
        &self.entries
    }

    /// Event kinds in dispatch order
    pub fn kinds(&self) -> Vec<ZoneEventKind> {
        self.entries.iter().map(|(_, event)| event.kind()).collect()
    }

    /// Events recorded for one element
    pub fn for_element(&self, element: ElementId) -> Vec<ZoneEvent> {
        self.entries
            .iter()
            .filter(|(id, _)| *id == element)
            .map(|(_, event)| *event)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drain the recorded notifications
    pub fn take(&mut self) -> Vec<(ElementId, ZoneEvent)> {
        std::mem::take(&mut self.entries)
    }
}

impl EventSink for EventLog {
    fn dispatch(&mut self, element: ElementId, event: &ZoneEvent) {
        self.entries.push((element, *event));
    }
}
