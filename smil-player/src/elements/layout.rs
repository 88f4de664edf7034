//! Layout model: `layout`, `root-layout` and nested `region` elements
//!
//! Region geometry accepts pixel (`120`, `120px`) and percentage (`50%`)
//! lengths. A `layout` without a `root-layout` gets an auxiliary one sized
//! to fit its pixel regions; auxiliary nodes are never serialized.

use tracing::debug;

use crate::document::Document;
use crate::host::Host;
use crate::tree::{Node, NodeId, NodeKind};

/// A region length
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Length {
    Pixels(f64),
    Percent(f64),
}

impl Length {
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Some(percent) = value.strip_suffix('%') {
            return percent.trim().parse().ok().map(Length::Percent);
        }
        let pixels = value.strip_suffix("px").unwrap_or(value);
        pixels.trim().parse().ok().map(Length::Pixels)
    }

    /// Absolute size within a parent extent
    pub fn resolve(self, extent: f64) -> f64 {
        match self {
            Length::Pixels(px) => px,
            Length::Percent(pct) => extent * pct / 100.0,
        }
    }

    fn pixels(self) -> Option<f64> {
        match self {
            Length::Pixels(px) => Some(px),
            Length::Percent(_) => None,
        }
    }
}

/// Absolute rectangle in root-layout pixels
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Geometry attributes of a `region`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegionGeometry {
    pub left: Option<Length>,
    pub top: Option<Length>,
    pub right: Option<Length>,
    pub bottom: Option<Length>,
    pub width: Option<Length>,
    pub height: Option<Length>,
    pub z_index: i32,
    pub background_color: Option<String>,
}

impl RegionGeometry {
    pub(crate) fn from_attributes(get: impl Fn(&str) -> Option<String>) -> Self {
        let length = |name: &str| get(name).as_deref().and_then(Length::parse);
        Self {
            left: length("left"),
            top: length("top"),
            right: length("right"),
            bottom: length("bottom"),
            width: length("width"),
            height: length("height"),
            z_index: get("z-index")
                .and_then(|z| z.trim().parse().ok())
                .unwrap_or(0),
            background_color: get("background-color").or_else(|| get("backgroundColor")),
        }
    }

    /// Place this region inside `parent`
    pub fn resolve(&self, parent: Rect) -> Rect {
        let (x, width) = resolve_axis(self.left, self.width, self.right, parent.width);
        let (y, height) = resolve_axis(self.top, self.height, self.bottom, parent.height);
        Rect {
            x: parent.x + x,
            y: parent.y + y,
            width,
            height,
        }
    }
}

/// Offset and size along one axis from start/size/end constraints
fn resolve_axis(
    start: Option<Length>,
    size: Option<Length>,
    end: Option<Length>,
    extent: f64,
) -> (f64, f64) {
    let start = start.map(|l| l.resolve(extent));
    let end = end.map(|l| l.resolve(extent));
    let size = size
        .map(|l| l.resolve(extent))
        .unwrap_or_else(|| (extent - start.unwrap_or(0.0) - end.unwrap_or(0.0)).max(0.0));
    let offset = start.unwrap_or_else(|| end.map_or(0.0, |end| extent - end - size));
    (offset, size)
}

impl<H: Host> Document<H> {
    /// Synthesize a `root-layout` when a closed `layout` lacks one
    pub(crate) fn ensure_root_layout(&mut self, layout: NodeId) {
        let has_root = self
            .store
            .children(layout)
            .any(|c| matches!(self.store[c].kind, NodeKind::RootLayout));
        if has_root {
            return;
        }
        let (mut width, mut height) = (0.0_f64, 0.0_f64);
        for region in self.store.children(layout) {
            if let NodeKind::Region(g) = &self.store[region].kind {
                let offset = |l: Option<Length>| l.and_then(Length::pixels).unwrap_or(0.0);
                if let Some(w) = g.width.and_then(Length::pixels) {
                    width = width.max(offset(g.left) + w);
                }
                if let Some(h) = g.height.and_then(Length::pixels) {
                    height = height.max(offset(g.top) + h);
                }
            }
        }

        let mut node = Node::new(NodeKind::RootLayout, "root-layout");
        node.auxiliary = true;
        node.closed = true;
        if width > 0.0 && height > 0.0 {
            node.set_attribute("width", &width.to_string());
            node.set_attribute("height", &height.to_string());
        }
        let first = self.store[layout].first_child;
        let id = self.store.insert(node);
        self.store.insert_before(layout, id, first);
        debug!("Synthesized root-layout {}x{}", width, height);
    }

    /// `region` element named `name`
    pub fn find_region(&self, name: &str) -> Option<NodeId> {
        let id = self.find_by_id(name).or_else(|| {
            // SMIL 1.0 documents name regions through `regionName`
            self.store
                .descendants(self.root())
                .into_iter()
                .find(|n| self.store[*n].attribute("regionName") == Some(name))
        })?;
        matches!(self.store[id].kind, NodeKind::Region(_)).then_some(id)
    }

    /// Absolute rectangle of a region
    pub fn region_rect(&self, region: NodeId) -> Option<Rect> {
        let node = self.store.get(region)?;
        let NodeKind::Region(geometry) = &node.kind else {
            return None;
        };
        let parent = node.parent?;
        let outer = match self.store[parent].kind {
            NodeKind::Region(_) => self.region_rect(parent)?,
            _ => self.root_layout_rect(parent),
        };
        Some(geometry.resolve(outer))
    }

    fn root_layout_rect(&self, layout: NodeId) -> Rect {
        let root_layout = self
            .store
            .children(layout)
            .find(|c| matches!(self.store[*c].kind, NodeKind::RootLayout));
        let size = |name: &str| {
            root_layout
                .and_then(|r| self.store[r].attribute(name))
                .and_then(Length::parse)
                .and_then(Length::pixels)
                .unwrap_or(0.0)
        };
        Rect {
            x: 0.0,
            y: 0.0,
            width: size("width"),
            height: size("height"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NullHost;

    #[test]
    fn test_length_parse() {
        assert_eq!(Length::parse("120"), Some(Length::Pixels(120.0)));
        assert_eq!(Length::parse("64px"), Some(Length::Pixels(64.0)));
        assert_eq!(Length::parse(" 50% "), Some(Length::Percent(50.0)));
        assert_eq!(Length::parse("wide"), None);
        assert_eq!(Length::Percent(25.0).resolve(400.0), 100.0);
    }

    #[test]
    fn test_resolve_axis_constraints() {
        assert_eq!(resolve_axis(Some(Length::Pixels(10.0)), None, None, 100.0), (10.0, 90.0));
        assert_eq!(
            resolve_axis(None, Some(Length::Pixels(20.0)), Some(Length::Pixels(5.0)), 100.0),
            (75.0, 20.0)
        );
        assert_eq!(
            resolve_axis(Some(Length::Percent(10.0)), Some(Length::Percent(50.0)), None, 200.0),
            (20.0, 100.0)
        );
    }

    fn layout_doc(with_root: bool) -> Document<NullHost> {
        let mut doc = Document::default();
        let root = doc.root();
        let smil = doc.create_element(root, "smil", &[]).unwrap();
        let head = doc.open_child(smil, "head", Vec::new());
        let layout = doc.open_child(head, "layout", Vec::new());
        if with_root {
            doc.create_element(layout, "root-layout", &[("width", "640"), ("height", "480")])
                .unwrap();
        }
        let outer = doc.open_child(
            layout,
            "region",
            vec![
                ("id".into(), "main".into()),
                ("left".into(), "40".into()),
                ("top".into(), "20".into()),
                ("width".into(), "200".into()),
                ("height".into(), "100".into()),
            ],
        );
        doc.create_element(
            outer,
            "region",
            &[("id", "inner"), ("left", "50%"), ("height", "25%")],
        )
        .unwrap();
        doc.close_node(outer);
        doc.close_node(layout);
        doc.close_node(head);
        doc
    }

    #[test]
    fn test_nested_region_rect() {
        let doc = layout_doc(true);
        let inner = doc.find_region("inner").unwrap();
        assert_eq!(
            doc.region_rect(inner),
            Some(Rect {
                x: 140.0,
                y: 20.0,
                width: 100.0,
                height: 25.0
            })
        );
    }

    #[test]
    fn test_missing_root_layout_is_synthesized() {
        let doc = layout_doc(false);
        let main = doc.find_region("main").unwrap();
        let layout = doc.node(main).and_then(|n| n.parent()).unwrap();
        let first = doc.children(layout).next().unwrap();
        let node = doc.node(first).unwrap();

        assert!(node.is_auxiliary());
        assert_eq!(node.attribute("width"), Some("240"));
        assert_eq!(node.attribute("height"), Some("120"));
    }

    #[test]
    fn test_find_region_ignores_other_elements() {
        let mut doc = layout_doc(true);
        let root = doc.root();
        doc.create_element(root, "par", &[("id", "p")]).unwrap();
        assert_eq!(doc.find_region("p"), None);
    }
}
