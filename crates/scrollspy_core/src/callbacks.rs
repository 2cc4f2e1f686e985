//! Optional per-attach callback slots
//!
//! Callbacks fire alongside the sink notifications for the same logical
//! event: the sink is notified first, then the matching slot is invoked.

use std::fmt;
use std::sync::Arc;

use crate::element::ElementId;
use crate::events::ZoneEvent;
use crate::position::PositionSample;

/// Callback receiving the element and the sample that triggered the event
pub type PositionCallback = Arc<dyn Fn(ElementId, PositionSample) + Send + Sync>;

/// Callback for ticks: element, sample, inside, enters, leaves
pub type TickCallback = Arc<dyn Fn(ElementId, PositionSample, bool, u32, u32) + Send + Sync>;

/// The five callback slots of a tracker configuration
#[derive(Clone, Default)]
pub struct ZoneCallbacks {
    pub on_enter: Option<PositionCallback>,
    pub on_leave: Option<PositionCallback>,
    pub on_leave_top: Option<PositionCallback>,
    pub on_leave_bottom: Option<PositionCallback>,
    pub on_tick: Option<TickCallback>,
}

impl ZoneCallbacks {
    /// Invoke the slot matching `event`, if one is set
    pub fn invoke(&self, element: ElementId, event: &ZoneEvent) {
        match *event {
            ZoneEvent::Enter { position } => {
                if let Some(cb) = &self.on_enter {
                    cb(element, position);
                }
            }
            ZoneEvent::Tick {
                position,
                inside,
                enters,
                leaves,
            } => {
                if let Some(cb) = &self.on_tick {
                    cb(element, position, inside, enters, leaves);
                }
            }
            ZoneEvent::Leave { position, .. } => {
                if let Some(cb) = &self.on_leave {
                    cb(element, position);
                }
            }
            ZoneEvent::LeaveTop { position, .. } => {
                if let Some(cb) = &self.on_leave_top {
                    cb(element, position);
                }
            }
            ZoneEvent::LeaveBottom { position, .. } => {
                if let Some(cb) = &self.on_leave_bottom {
                    cb(element, position);
                }
            }
        }
    }

    /// Whether any slot is set
    pub fn is_empty(&self) -> bool {
        self.on_enter.is_none()
            && self.on_leave.is_none()
            && self.on_leave_top.is_none()
            && self.on_leave_bottom.is_none()
            && self.on_tick.is_none()
    }
}

impl fmt::Debug for ZoneCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZoneCallbacks")
            .field("on_enter", &self.on_enter.is_some())
            .field("on_leave", &self.on_leave.is_some())
            .field("on_leave_top", &self.on_leave_top.is_some())
            .field("on_leave_bottom", &self.on_leave_bottom.is_some())
            .field("on_tick", &self.on_tick.is_some())
            .finish()
    }
}
