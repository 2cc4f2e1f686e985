//! Tracker configuration
//!
//! A [`TrackerConfig`] is resolved once per attach call and never changes
//! afterwards. Thresholds may be given as literals or as functions; functions
//! are evaluated exactly once, when the configuration is built.
//!
//! Loosely typed input (scenario files, scripting layers) goes through
//! [`ScrollSpyOptions`], which replaces every value failing its type check
//! with the default instead of reporting an error.
//!
//! # Example
//!
//! ```rust
//! use scrollspy_core::config::{MaxBound, Mode, TrackerConfig};
//!
//! let config = TrackerConfig::builder()
//!     .mode(Mode::Horizontal)
//!     .min(100.0)
//!     .max_with(|| 400.0)
//!     .namespace("gallery")
//!     .build();
//!
//! assert_eq!(config.max(), MaxBound::Fixed(400.0));
//! assert_eq!(config.namespace(), "gallery");
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::callbacks::ZoneCallbacks;
use crate::element::ElementId;
use crate::position::{LayoutMetrics, PositionSample};

/// Namespace used when none (or a blank one) is given
pub const DEFAULT_NAMESPACE: &str = "scrollspy";

/// Which scroll axis feeds the comparison
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Compare `top`
    #[default]
    Vertical,
    /// Compare `left`
    Horizontal,
}

impl Mode {
    /// Interpret a mode string; anything other than `vertical` is horizontal
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("vertical") {
            Mode::Vertical
        } else {
            Mode::Horizontal
        }
    }

    pub fn is_vertical(&self) -> bool {
        matches!(self, Mode::Vertical)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Vertical => f.write_str("vertical"),
            Mode::Horizontal => f.write_str("horizontal"),
        }
    }
}

/// The element whose scrolling is observed
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerSelector {
    /// The top-level viewport
    #[default]
    Viewport,
    /// A selector resolved by the host
    Selector(String),
}

impl fmt::Display for ContainerSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerSelector::Viewport => f.write_str("viewport"),
            ContainerSelector::Selector(selector) => f.write_str(selector),
        }
    }
}

impl From<&str> for ContainerSelector {
    fn from(selector: &str) -> Self {
        ContainerSelector::Selector(selector.to_string())
    }
}

/// A threshold that is either known up front or computed at setup
#[derive(Clone)]
pub enum Threshold {
    Value(f64),
    Computed(Arc<dyn Fn() -> f64 + Send + Sync>),
}

impl Threshold {
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        Threshold::Computed(Arc::new(f))
    }

    /// Produce the concrete value, invoking the function if there is one
    pub fn resolve(&self) -> f64 {
        match self {
            Threshold::Value(value) => *value,
            Threshold::Computed(f) => f(),
        }
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Threshold::Value(0.0)
    }
}

impl From<f64> for Threshold {
    fn from(value: f64) -> Self {
        Threshold::Value(value)
    }
}

impl fmt::Debug for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threshold::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Threshold::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Upper bound of the zone
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum MaxBound {
    /// Recompute from layout on every sample
    #[default]
    DynamicFromLayout,
    /// A frozen value
    Fixed(f64),
}

impl MaxBound {
    /// Map a resolved numeric max to a bound; zero selects layout sizing
    pub fn from_value(value: f64) -> Self {
        if value == 0.0 {
            MaxBound::DynamicFromLayout
        } else {
            MaxBound::Fixed(value)
        }
    }

    /// Bound in effect for one sample
    pub fn effective(&self, mode: Mode, metrics: &LayoutMetrics) -> f64 {
        match *self {
            MaxBound::DynamicFromLayout => metrics.dynamic_max(mode),
            MaxBound::Fixed(value) => value,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, MaxBound::DynamicFromLayout)
    }
}

impl fmt::Display for MaxBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxBound::DynamicFromLayout => f.write_str("dynamic"),
            MaxBound::Fixed(value) => write!(f, "{}", value),
        }
    }
}

/// How the upper bound is specified before resolution
#[derive(Clone, Debug)]
enum MaxSpec {
    Threshold(Threshold),
    Bound(MaxBound),
}

impl Default for MaxSpec {
    fn default() -> Self {
        MaxSpec::Bound(MaxBound::DynamicFromLayout)
    }
}

/// Resolved, immutable configuration shared by every tracker of one attach call
#[derive(Clone, Debug)]
pub struct TrackerConfig {
    mode: Mode,
    buffer: f64,
    min: f64,
    max: MaxBound,
    namespace: String,
    container: ContainerSelector,
    callbacks: ZoneCallbacks,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Vertical,
            buffer: 0.0,
            min: 0.0,
            max: MaxBound::DynamicFromLayout,
            namespace: DEFAULT_NAMESPACE.to_string(),
            container: ContainerSelector::Viewport,
            callbacks: ZoneCallbacks::default(),
        }
    }
}

impl TrackerConfig {
    pub fn builder() -> TrackerConfigBuilder {
        TrackerConfigBuilder::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn buffer(&self) -> f64 {
        self.buffer
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> MaxBound {
        self.max
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn container(&self) -> &ContainerSelector {
        &self.container
    }

    pub fn callbacks(&self) -> &ZoneCallbacks {
        &self.callbacks
    }

    /// The buffered coordinate compared against the zone
    pub fn coordinate(&self, sample: &PositionSample) -> f64 {
        sample.axis(self.mode) + self.buffer
    }

    /// Zone bounds `(min, effective_max)` for one sample
    pub fn zone(&self, metrics: &LayoutMetrics) -> (f64, f64) {
        (self.min, self.max.effective(self.mode, metrics))
    }

    /// Invoke the callback slot matching `event`
    pub fn notify(&self, element: ElementId, event: &crate::events::ZoneEvent) {
        self.callbacks.invoke(element, event);
    }
}

/// Builder for [`TrackerConfig`]
#[derive(Clone, Debug, Default)]
pub struct TrackerConfigBuilder {
    mode: Mode,
    buffer: f64,
    min: Threshold,
    max: MaxSpec,
    namespace: Option<String>,
    container: ContainerSelector,
    callbacks: ZoneCallbacks,
}

impl TrackerConfigBuilder {
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn buffer(mut self, buffer: f64) -> Self {
        self.buffer = buffer;
        self
    }

    pub fn min(mut self, min: impl Into<Threshold>) -> Self {
        self.min = min.into();
        self
    }

    /// Lower bound computed once when the config is built
    pub fn min_with<F>(self, f: F) -> Self
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        self.min(Threshold::computed(f))
    }

    /// Numeric upper bound; zero selects layout sizing
    pub fn max(mut self, max: impl Into<Threshold>) -> Self {
        self.max = MaxSpec::Threshold(max.into());
        self
    }

    /// Upper bound computed once when the config is built; zero selects layout sizing
    pub fn max_with<F>(self, f: F) -> Self
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        self.max(Threshold::computed(f))
    }

    /// Explicit upper bound, including a literal `Fixed(0.0)`
    pub fn max_bound(mut self, bound: MaxBound) -> Self {
        self.max = MaxSpec::Bound(bound);
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn container(mut self, container: impl Into<ContainerSelector>) -> Self {
        self.container = container.into();
        self
    }

    pub fn on_enter<F>(mut self, f: F) -> Self
    where
        F: Fn(ElementId, PositionSample) + Send + Sync + 'static,
    {
        self.callbacks.on_enter = Some(Arc::new(f));
        self
    }

    pub fn on_leave<F>(mut self, f: F) -> Self
    where
        F: Fn(ElementId, PositionSample) + Send + Sync + 'static,
    {
        self.callbacks.on_leave = Some(Arc::new(f));
        self
    }

    pub fn on_leave_top<F>(mut self, f: F) -> Self
    where
        F: Fn(ElementId, PositionSample) + Send + Sync + 'static,
    {
        self.callbacks.on_leave_top = Some(Arc::new(f));
        self
    }

    pub fn on_leave_bottom<F>(mut self, f: F) -> Self
    where
        F: Fn(ElementId, PositionSample) + Send + Sync + 'static,
    {
        self.callbacks.on_leave_bottom = Some(Arc::new(f));
        self
    }

    pub fn on_tick<F>(mut self, f: F) -> Self
    where
        F: Fn(ElementId, PositionSample, bool, u32, u32) + Send + Sync + 'static,
    {
        self.callbacks.on_tick = Some(Arc::new(f));
        self
    }

    /// Replace all callback slots at once
    pub fn callbacks(mut self, callbacks: ZoneCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Resolve thresholds and freeze the configuration
    ///
    /// Non-finite numbers and blank namespaces fall back to the defaults.
    pub fn build(self) -> TrackerConfig {
        let buffer = finite_or("buffer", self.buffer, 0.0);
        let min = finite_or("min", self.min.resolve(), 0.0);
        let max = match self.max {
            MaxSpec::Threshold(threshold) => {
                MaxBound::from_value(finite_or("max", threshold.resolve(), 0.0))
            }
            MaxSpec::Bound(MaxBound::Fixed(value)) if !value.is_finite() => {
                warn!(value, "scrollspy option `max` is not finite, using layout sizing");
                MaxBound::DynamicFromLayout
            }
            MaxSpec::Bound(bound) => bound,
        };
        let namespace = match self.namespace {
            Some(ns) if !ns.trim().is_empty() => ns,
            Some(ns) => {
                warn!(namespace = %ns, "blank scrollspy namespace, using `{}`", DEFAULT_NAMESPACE);
                DEFAULT_NAMESPACE.to_string()
            }
            None => DEFAULT_NAMESPACE.to_string(),
        };
        let container = match self.container {
            ContainerSelector::Selector(selector) if selector.trim().is_empty() => {
                warn!("blank scrollspy container selector, using the viewport");
                ContainerSelector::Viewport
            }
            container => container,
        };

        TrackerConfig {
            mode: self.mode,
            buffer,
            min,
            max,
            namespace,
            container,
            callbacks: self.callbacks,
        }
    }
}

fn finite_or(option: &str, value: f64, default: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        warn!(option, value, "scrollspy option is not a finite number, using default");
        default
    }
}

// =============================================================================
// Loosely typed options
// =============================================================================

/// Options as they arrive from untyped input
///
/// Each field holds whatever value was supplied. [`ScrollSpyOptions::sanitize`]
/// checks each one against its type predicate and substitutes the default
/// when the check fails. An explicit `null` fails every check except `mode`,
/// where it is compared as the string `"null"` and therefore means horizontal.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollSpyOptions {
    pub buffer: Option<Value>,
    pub container: Option<Value>,
    pub max: Option<Value>,
    pub min: Option<Value>,
    pub mode: Option<Value>,
    pub namespace: Option<Value>,
}

impl ScrollSpyOptions {
    /// Turn the loose values into a builder, falling back to defaults
    pub fn sanitize(&self) -> TrackerConfigBuilder {
        let mut builder = TrackerConfig::builder();

        if let Some(value) = present(&self.container) {
            match non_blank_string(value) {
                Some(selector) => builder = builder.container(selector),
                None => warn!(%value, "invalid scrollspy option `container`, using the viewport"),
            }
        }

        if let Some(value) = present(&self.namespace) {
            match non_blank_string(value) {
                Some(namespace) => builder = builder.namespace(namespace),
                None => warn!(%value, "invalid scrollspy option `namespace`, using default"),
            }
        }

        if let Some(value) = present(&self.buffer) {
            match numeric(value) {
                Some(buffer) => builder = builder.buffer(buffer),
                None => warn!(%value, "invalid scrollspy option `buffer`, using default"),
            }
        }

        if let Some(value) = present(&self.max) {
            match numeric(value) {
                Some(max) => builder = builder.max(max),
                None => warn!(%value, "invalid scrollspy option `max`, using default"),
            }
        }

        if let Some(value) = present(&self.min) {
            match numeric(value) {
                Some(min) => builder = builder.min(min),
                None => warn!(%value, "invalid scrollspy option `min`, using default"),
            }
        }

        // A supplied `null` is stringified like any other value, so it selects horizontal
        if let Some(value) = self.mode.as_ref() {
            let mode = match value {
                Value::String(s) => Mode::parse(s),
                other => Mode::parse(&other.to_string()),
            };
            builder = builder.mode(mode);
        }

        builder
    }

    /// Sanitize and build in one step
    pub fn resolve(&self) -> TrackerConfig {
        self.sanitize().build()
    }

    /// Whether the namespace value would pass its type check
    pub fn has_valid_namespace(&self) -> bool {
        present(&self.namespace).and_then(non_blank_string).is_some()
    }
}

fn present(value: &Option<Value>) -> Option<&Value> {
    value.as_ref().filter(|v| !v.is_null())
}

fn non_blank_string(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.trim().is_empty())
}

/// Numbers and numeric strings with a finite value
fn numeric(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}
