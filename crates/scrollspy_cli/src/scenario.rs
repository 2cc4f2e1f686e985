//! Scenario files
//!
//! A scenario describes a document, the trackers attached to it and a
//! sequence of steps to replay:
//!
//! ```toml
//! name = "cards"
//!
//! [viewport]
//! width = 1024
//! height = 768
//!
//! [[elements]]
//! id = "feed"
//! tag = "section"
//! width = 300
//! height = 200
//!
//! [[trackers]]
//! targets = "#first"
//! options = { container = "#feed", min = 0, max = 100 }
//!
//! [[steps]]
//! action = "scroll"
//! container = "#feed"
//! top = 50
//! ```

use anyhow::{Context, Result};
use scrollspy_core::ScrollSpyOptions;
use scrollspy_dom::ElementSpec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// A replayable scroll scenario
#[derive(Debug, Deserialize, Serialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub viewport: ViewportConfig,
    #[serde(default)]
    pub elements: Vec<ElementSpec>,
    #[serde(default)]
    pub trackers: Vec<TrackerEntry>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// Size of the top-level viewport
#[derive(Debug, Deserialize, Serialize)]
pub struct ViewportConfig {
    #[serde(default = "default_viewport_width")]
    pub width: f64,
    #[serde(default = "default_viewport_height")]
    pub height: f64,
}

fn default_viewport_width() -> f64 {
    1024.0
}

fn default_viewport_height() -> f64 {
    768.0
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: default_viewport_width(),
            height: default_viewport_height(),
        }
    }
}

/// One attach call
#[derive(Debug, Deserialize, Serialize)]
pub struct TrackerEntry {
    /// Selector for the tracked elements
    pub targets: String,
    /// Loosely typed options, sanitized on attach
    #[serde(default)]
    pub options: ScrollSpyOptions,
}

fn default_container() -> String {
    "window".to_string()
}

/// One replay step
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Scroll a container to an absolute offset
    Scroll {
        #[serde(default = "default_container")]
        container: String,
        #[serde(default)]
        top: f64,
        #[serde(default)]
        left: f64,
    },
    /// Scroll a container relative to its current offset
    ScrollBy {
        #[serde(default = "default_container")]
        container: String,
        #[serde(default)]
        dy: f64,
        #[serde(default)]
        dx: f64,
    },
    /// Tear down a namespace on a container
    Detach {
        #[serde(default = "default_container")]
        container: String,
        #[serde(default)]
        namespace: String,
    },
    /// Change an element's size and re-emit the container's offset
    Resize {
        element: String,
        width: f64,
        height: f64,
        #[serde(default = "default_container")]
        container: String,
    },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Scroll {
                container,
                top,
                left,
            } => write!(f, "scroll {} top={} left={}", container, top, left),
            Step::ScrollBy { container, dy, dx } => {
                write!(f, "scroll_by {} dy={} dx={}", container, dy, dx)
            }
            Step::Detach {
                container,
                namespace,
            } => write!(f, "detach {} namespace={:?}", container, namespace),
            Step::Resize {
                element,
                width,
                height,
                ..
            } => write!(f, "resize {} {}x{}", element, width, height),
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Name for display, falling back to the given file stem
    pub fn display_name<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(fallback)
    }
}
