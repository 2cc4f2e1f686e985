//! Scroll samples and the layout quantities the zone test reads

use serde::{Deserialize, Serialize};

use crate::config::Mode;

/// One scroll reading taken from the observed container
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    /// Vertical scroll offset
    pub top: f64,
    /// Horizontal scroll offset
    pub left: f64,
}

impl PositionSample {
    pub fn new(top: f64, left: f64) -> Self {
        Self { top, left }
    }

    /// Sample with only a vertical offset
    pub fn vertical(top: f64) -> Self {
        Self { top, left: 0.0 }
    }

    /// Sample with only a horizontal offset
    pub fn horizontal(left: f64) -> Self {
        Self { top: 0.0, left }
    }

    /// The coordinate that feeds the comparison for the given axis
    pub fn axis(&self, mode: Mode) -> f64 {
        match mode {
            Mode::Vertical => self.top,
            Mode::Horizontal => self.left,
        }
    }
}

/// Box sizes needed to derive a dynamic upper bound
///
/// Supplied by the host alongside every sample. Only read when the tracker's
/// max bound is [`MaxBound::DynamicFromLayout`](crate::config::MaxBound).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutMetrics {
    /// Content height of the container
    pub container_height: f64,
    /// Container width including padding and border
    pub container_outer_width: f64,
    /// Target element width including padding and border
    pub element_outer_width: f64,
}

impl LayoutMetrics {
    /// Upper bound derived from layout for the given axis
    pub fn dynamic_max(&self, mode: Mode) -> f64 {
        match mode {
            Mode::Vertical => self.container_height,
            Mode::Horizontal => self.container_outer_width + self.element_outer_width,
        }
    }
}
