//! In-memory element tree
//!
//! The document stores what the tracker needs to know about elements: box
//! sizes for the dynamic upper bound, scroll offsets for containers, and
//! ids/classes/tags for selector lookup. It performs no layout.

use indexmap::IndexSet;
use rustc_hash::FxHashMap;
use scrollspy_core::{ElementId, LayoutMetrics, PositionSample};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::error::{DomError, Result};
use crate::selector::{Selector, SimpleSelector};

/// Box sizes of one element
///
/// `width`/`height` are content sizes; padding and border are totals for
/// both sides of an axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxMetrics {
    pub width: f64,
    pub height: f64,
    pub padding_x: f64,
    pub padding_y: f64,
    pub border_x: f64,
    pub border_y: f64,
}

impl BoxMetrics {
    pub fn sized(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Width including padding and border
    pub fn outer_width(&self) -> f64 {
        self.width + self.padding_x + self.border_x
    }

    /// Height including padding and border
    pub fn outer_height(&self) -> f64 {
        self.height + self.padding_y + self.border_y
    }
}

/// Description of an element to insert
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementSpec {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(flatten)]
    pub metrics: BoxMetrics,
}

fn default_tag() -> String {
    "div".to_string()
}

impl Default for ElementSpec {
    fn default() -> Self {
        Self {
            id: None,
            tag: default_tag(),
            classes: Vec::new(),
            metrics: BoxMetrics::default(),
        }
    }
}

impl ElementSpec {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Default::default()
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.metrics.width = width;
        self.metrics.height = height;
        self
    }

    pub fn padding(mut self, x: f64, y: f64) -> Self {
        self.metrics.padding_x = x;
        self.metrics.padding_y = y;
        self
    }

    pub fn border(mut self, x: f64, y: f64) -> Self {
        self.metrics.border_x = x;
        self.metrics.border_y = y;
        self
    }
}

/// Stored element
#[derive(Clone, Debug)]
struct ElementNode {
    dom_id: Option<String>,
    tag: String,
    classes: SmallVec<[String; 2]>,
    metrics: BoxMetrics,
    scroll: PositionSample,
}

/// The element tree observed by scroll subscriptions
#[derive(Clone, Debug)]
pub struct Document {
    nodes: SlotMap<ElementId, ElementNode>,
    /// Live elements in insertion order; slot keys are reused after removal
    order: IndexSet<ElementId>,
    ids: FxHashMap<String, ElementId>,
    viewport: ElementId,
}

impl Document {
    /// Create a document whose viewport has the given size
    pub fn new(viewport_width: f64, viewport_height: f64) -> Self {
        let mut nodes = SlotMap::with_key();
        let viewport = nodes.insert(ElementNode {
            dom_id: None,
            tag: "window".to_string(),
            classes: SmallVec::new(),
            metrics: BoxMetrics::sized(viewport_width, viewport_height),
            scroll: PositionSample::default(),
        });

        let mut order = IndexSet::new();
        order.insert(viewport);

        Self {
            nodes,
            order,
            ids: FxHashMap::default(),
            viewport,
        }
    }

    pub fn viewport(&self) -> ElementId {
        self.viewport
    }

    /// Insert an element, rejecting duplicate ids
    pub fn insert(&mut self, spec: ElementSpec) -> Result<ElementId> {
        if let Some(dom_id) = &spec.id {
            if self.ids.contains_key(dom_id) {
                return Err(DomError::DuplicateId(dom_id.clone()));
            }
        }

        let node = ElementNode {
            dom_id: spec.id.clone(),
            tag: spec.tag.to_ascii_lowercase(),
            classes: spec.classes.into_iter().collect(),
            metrics: spec.metrics,
            scroll: PositionSample::default(),
        };
        let element = self.nodes.insert(node);
        self.order.insert(element);
        if let Some(dom_id) = spec.id {
            self.ids.insert(dom_id, element);
        }
        Ok(element)
    }

    pub fn remove(&mut self, element: ElementId) -> Result<()> {
        if element == self.viewport {
            return Err(DomError::ViewportRemoval);
        }
        let node = self
            .nodes
            .remove(element)
            .ok_or(DomError::UnknownElement(element))?;
        self.order.shift_remove(&element);
        if let Some(dom_id) = node.dom_id {
            self.ids.remove(&dom_id);
        }
        Ok(())
    }

    pub fn contains(&self, element: ElementId) -> bool {
        self.nodes.contains_key(element)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get_by_id(&self, dom_id: &str) -> Option<ElementId> {
        self.ids.get(dom_id).copied()
    }

    pub fn dom_id(&self, element: ElementId) -> Option<&str> {
        self.nodes.get(element)?.dom_id.as_deref()
    }

    /// Human-readable label: `#id`, `window`, or the tag name
    pub fn label(&self, element: ElementId) -> String {
        match self.nodes.get(element) {
            Some(node) => match &node.dom_id {
                Some(dom_id) => format!("#{}", dom_id),
                None => node.tag.clone(),
            },
            None => format!("{:?}", element),
        }
    }

    pub fn metrics(&self, element: ElementId) -> Option<BoxMetrics> {
        self.nodes.get(element).map(|node| node.metrics)
    }

    pub fn set_metrics(&mut self, element: ElementId, metrics: BoxMetrics) -> Result<()> {
        let node = self
            .nodes
            .get_mut(element)
            .ok_or(DomError::UnknownElement(element))?;
        node.metrics = metrics;
        Ok(())
    }

    pub fn scroll_position(&self, element: ElementId) -> Option<PositionSample> {
        self.nodes.get(element).map(|node| node.scroll)
    }

    /// Store a scroll offset without notifying anyone
    pub(crate) fn set_scroll_position(
        &mut self,
        element: ElementId,
        position: PositionSample,
    ) -> Result<()> {
        let node = self
            .nodes
            .get_mut(element)
            .ok_or(DomError::UnknownElement(element))?;
        node.scroll = position;
        Ok(())
    }

    /// Elements matching a selector, in insertion order without duplicates
    pub fn query(&self, selector: &str) -> Result<Vec<ElementId>> {
        let selector = Selector::parse(selector)?;
        Ok(self.select(&selector))
    }

    pub fn select(&self, selector: &Selector) -> Vec<ElementId> {
        self.order
            .iter()
            .copied()
            .filter(|&element| {
                self.nodes.get(element).is_some_and(|node| {
                    selector
                        .terms()
                        .iter()
                        .any(|term| self.matches(element, node, term))
                })
            })
            .collect()
    }

    fn matches(&self, element: ElementId, node: &ElementNode, term: &SimpleSelector) -> bool {
        match term {
            SimpleSelector::Viewport => element == self.viewport,
            SimpleSelector::Id(id) => node.dom_id.as_deref() == Some(id.as_str()),
            SimpleSelector::Class(class) => node.classes.iter().any(|c| c == class),
            SimpleSelector::Tag(tag) => element != self.viewport && node.tag == *tag,
        }
    }

    /// Sizes the tracker needs for one container/target pair
    ///
    /// Missing elements contribute zero.
    pub fn layout_metrics(&self, container: ElementId, element: ElementId) -> LayoutMetrics {
        let container = self.metrics(container).unwrap_or_default();
        let element = self.metrics(element).unwrap_or_default();
        LayoutMetrics {
            container_height: container.height,
            container_outer_width: container.outer_width(),
            element_outer_width: element.outer_width(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> (Document, ElementId, ElementId, ElementId) {
        let mut doc = Document::new(1024.0, 768.0);
        let feed = doc
            .insert(ElementSpec::new("section").id("feed").size(400.0, 300.0).padding(10.0, 10.0))
            .unwrap();
        let first = doc
            .insert(ElementSpec::new("div").class("card").size(100.0, 50.0).border(2.0, 2.0))
            .unwrap();
        let second = doc
            .insert(ElementSpec::new("div").class("card").class("wide").size(200.0, 50.0))
            .unwrap();
        (doc, feed, first, second)
    }

    #[test]
    fn test_box_metrics() {
        let metrics = BoxMetrics {
            width: 100.0,
            height: 40.0,
            padding_x: 8.0,
            padding_y: 4.0,
            border_x: 2.0,
            border_y: 2.0,
        };
        assert_eq!(metrics.outer_width(), 110.0);
        assert_eq!(metrics.outer_height(), 46.0);
    }

    #[test]
    fn test_query() {
        let (doc, feed, first, second) = sample_document();

        assert_eq!(doc.query("#feed").unwrap(), vec![feed]);
        assert_eq!(doc.query(".card").unwrap(), vec![first, second]);
        assert_eq!(doc.query(".wide").unwrap(), vec![second]);
        assert_eq!(doc.query("div").unwrap(), vec![first, second]);
        assert_eq!(doc.query("window").unwrap(), vec![doc.viewport()]);
        assert_eq!(doc.query("#feed, .wide, #feed").unwrap(), vec![feed, second]);
        assert!(doc.query("#missing").unwrap().is_empty());
        assert!(doc.query("#").is_err());
    }

    #[test]
    fn test_query_order_after_remove() {
        let mut doc = Document::new(800.0, 600.0);
        let a = doc.insert(ElementSpec::new("div").class("c")).unwrap();
        let b = doc.insert(ElementSpec::new("div").class("c")).unwrap();
        doc.remove(a).unwrap();
        // Reuses the slot freed by `a` but must still come after `b`
        let x = doc.insert(ElementSpec::new("div").class("c")).unwrap();

        assert_eq!(doc.query(".c").unwrap(), vec![b, x]);
        assert_eq!(doc.query("div").unwrap(), vec![b, x]);
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let (mut doc, _, _, _) = sample_document();
        let err = doc.insert(ElementSpec::new("div").id("feed")).unwrap_err();
        assert_eq!(err, DomError::DuplicateId("feed".into()));
    }

    #[test]
    fn test_remove() {
        let (mut doc, feed, _, _) = sample_document();
        doc.remove(feed).unwrap();
        assert!(!doc.contains(feed));
        assert_eq!(doc.get_by_id("feed"), None);
        assert_eq!(doc.remove(feed), Err(DomError::UnknownElement(feed)));
        assert_eq!(doc.remove(doc.viewport()), Err(DomError::ViewportRemoval));

        // The id is free again
        assert!(doc.insert(ElementSpec::new("div").id("feed")).is_ok());
    }

    #[test]
    fn test_layout_metrics() {
        let (doc, feed, first, _) = sample_document();
        let metrics = doc.layout_metrics(feed, first);
        assert_eq!(metrics.container_height, 300.0);
        assert_eq!(metrics.container_outer_width, 410.0);
        assert_eq!(metrics.element_outer_width, 102.0);
    }

    #[test]
    fn test_labels() {
        let (doc, feed, first, _) = sample_document();
        assert_eq!(doc.label(feed), "#feed");
        assert_eq!(doc.label(first), "div");
        assert_eq!(doc.label(doc.viewport()), "window");
    }

    #[test]
    fn test_element_spec_deserialize() {
        let spec: ElementSpec = serde_json::from_value(serde_json::json!({
            "id": "panel",
            "classes": ["a"],
            "width": 120.0,
            "height": 80.0,
            "border_x": 2.0
        }))
        .unwrap();
        assert_eq!(spec.tag, "div");
        assert_eq!(spec.metrics.outer_width(), 122.0);
        assert_eq!(spec.classes, vec!["a".to_string()]);
    }
}
