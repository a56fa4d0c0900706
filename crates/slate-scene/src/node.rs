//! Scene graph nodes: retained graphical primitives.
//!
//! Nodes are plain drawable state owned by the scene arena; no element or
//! store data ever holds a node reference back.

use kurbo::{Point, Rect};
use peniko::Color;
use slate_core::{Edge, EdgeId, Element, ElementId, ElementStyle};

/// The drawable primitive a node renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Rect,
    Ellipse,
    Line,
    Text,
    Image,
    Table,
}

/// Classification tag so pointer handlers can identify a node's role
/// without re-deriving the element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeTag {
    /// A plain shape.
    Shape,
    /// Text the user can edit with a double-click.
    EditableText,
    /// A routed connector line (edge or free connector).
    ConnectorLine,
    /// Transient gesture feedback on the preview surface.
    Preview,
}

/// One retained drawable.
#[derive(Debug, Clone)]
pub struct SceneNode {
    /// Backing element, when this node mirrors one.
    pub element: Option<ElementId>,
    /// Backing edge, when this node mirrors one.
    pub edge: Option<EdgeId>,
    pub kind: NodeKind,
    pub tag: NodeTag,
    /// Frame for rect-like primitives.
    pub frame: Rect,
    /// Polyline for line primitives.
    pub points: Vec<Point>,
    /// Text content for text-bearing primitives.
    pub text: String,
    pub rotation: f64,
    pub stroke: Color,
    pub stroke_width: f64,
    pub fill: Option<Color>,
    pub opacity: f64,
    pub visible: bool,
}

impl SceneNode {
    /// Create a blank node of a kind.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            element: None,
            edge: None,
            kind,
            tag: NodeTag::Shape,
            frame: Rect::ZERO,
            points: Vec::new(),
            text: String::new(),
            rotation: 0.0,
            stroke: Color::BLACK,
            stroke_width: 1.0,
            fill: None,
            opacity: 1.0,
            visible: true,
        }
    }

    /// Clear all visual attributes so a pooled node carries nothing over
    /// from its previous use.
    pub fn reset(&mut self) {
        self.element = None;
        self.edge = None;
        self.tag = NodeTag::Shape;
        self.frame = Rect::ZERO;
        self.points.clear();
        self.text.clear();
        self.rotation = 0.0;
        self.stroke = Color::BLACK;
        self.stroke_width = 1.0;
        self.fill = None;
        self.opacity = 1.0;
        self.visible = true;
    }

    /// Build a node mirroring an element.
    pub fn from_element(element: &Element) -> Self {
        let mut node = Self::new(kind_for(element));
        node.element = Some(element.id());
        node.apply_element(element);
        node
    }

    /// Update this node in place from an element's current state.
    pub fn apply_element(&mut self, element: &Element) {
        self.kind = kind_for(element);
        self.tag = if element.is_editable_text() {
            NodeTag::EditableText
        } else if matches!(element, Element::Connector(_)) {
            NodeTag::ConnectorLine
        } else {
            NodeTag::Shape
        };
        self.frame = element.bounds();
        self.rotation = element.rotation();
        self.apply_style(element.style());

        self.points.clear();
        match element {
            Element::Stroke(stroke) => self.points.extend_from_slice(&stroke.points),
            Element::Connector(connector) => self.points.extend_from_slice(&connector.points),
            _ => {}
        }

        self.text.clear();
        match element {
            Element::Text(text) => self.text.push_str(&text.content),
            Element::Sticky(note) => self.text.push_str(&note.text),
            _ => {}
        }
    }

    /// Build a node mirroring an edge.
    pub fn from_edge(edge: &Edge) -> Self {
        let mut node = Self::new(NodeKind::Line);
        node.edge = Some(edge.id);
        node.apply_edge(edge);
        node
    }

    /// Update this node in place from an edge's current state.
    pub fn apply_edge(&mut self, edge: &Edge) {
        self.tag = NodeTag::ConnectorLine;
        self.frame = edge.bounds();
        self.points.clear();
        self.points.extend_from_slice(&edge.points);
        self.apply_style(&edge.style);
    }

    fn apply_style(&mut self, style: &ElementStyle) {
        self.stroke = style.stroke_color();
        self.stroke_width = style.stroke_width;
        self.fill = style.fill_color();
        self.opacity = style.opacity;
    }

    /// Whether a double-click on this node should open the text editor.
    pub fn is_editable_text(&self) -> bool {
        self.tag == NodeTag::EditableText
    }
}

fn kind_for(element: &Element) -> NodeKind {
    match element {
        Element::Rectangle(_) => NodeKind::Rect,
        Element::Ellipse(_) => NodeKind::Ellipse,
        Element::Text(_) => NodeKind::Text,
        Element::Sticky(_) => NodeKind::Rect,
        Element::Image(_) => NodeKind::Image,
        Element::Table(_) => NodeKind::Table,
        Element::Stroke(_) => NodeKind::Line,
        Element::Connector(_) => NodeKind::Line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slate_core::element::{Rectangle, StickyNote, Stroke};

    #[test]
    fn test_node_mirrors_element() {
        let element =
            Element::Rectangle(Rectangle::new(Point::new(10.0, 20.0), 100.0, 50.0));
        let node = SceneNode::from_element(&element);
        assert_eq!(node.kind, NodeKind::Rect);
        assert_eq!(node.element, Some(element.id()));
        assert_eq!(node.frame, Rect::new(10.0, 20.0, 110.0, 70.0));
        assert!(!node.is_editable_text());
    }

    #[test]
    fn test_sticky_is_editable_text() {
        let element = Element::Sticky(StickyNote::new(Point::new(0.0, 0.0)));
        let node = SceneNode::from_element(&element);
        assert!(node.is_editable_text());
        assert!(node.fill.is_some());
    }

    #[test]
    fn test_stroke_points_copied() {
        let element = Element::Stroke(Stroke::new(vec![
            Point::new(0.0, 0.0),
            Point::new(5.0, 5.0),
        ]));
        let node = SceneNode::from_element(&element);
        assert_eq!(node.kind, NodeKind::Line);
        assert_eq!(node.points.len(), 2);
    }

    #[test]
    fn test_reset_clears_prior_state() {
        let mut node = SceneNode::new(NodeKind::Line);
        node.points.push(Point::new(1.0, 2.0));
        node.text.push_str("leftover");
        node.opacity = 0.5;
        node.visible = false;

        node.reset();
        assert!(node.points.is_empty());
        assert!(node.text.is_empty());
        assert!((node.opacity - 1.0).abs() < f64::EPSILON);
        assert!(node.visible);
    }
}
