//! Node kinds, lifecycle states and per-node data

use crate::elements::layout::RegionGeometry;
use crate::signal::Connection;
use crate::timer::Postpone;
use crate::timing::Runtime;

use super::NodeId;

/// Node lifecycle state
///
/// States only advance through this lattice; `reset` is the single way back
/// to `Init`.
///
/// ```text
/// Init → Activated → Began → [Deferred] → Finished → Deactivated
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeState {
    Init,
    Activated,
    Began,
    Deferred,
    Finished,
    Deactivated,
}

impl NodeState {
    /// Activated and not yet deactivated (finished nodes are still active)
    pub fn is_active(self) -> bool {
        self >= NodeState::Activated && self < NodeState::Deactivated
    }

    /// Activated but not yet finished
    pub fn is_unfinished(self) -> bool {
        self > NodeState::Init && self < NodeState::Finished
    }
}

/// Kind of continuous or discrete media element
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Ref,
    Video,
    Audio,
    Img,
    Text,
    Animation,
    TextStream,
    Brush,
}

impl MediaKind {
    /// Parse a media element tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "ref" => MediaKind::Ref,
            "video" => MediaKind::Video,
            "audio" => MediaKind::Audio,
            "img" => MediaKind::Img,
            "text" => MediaKind::Text,
            "animation" => MediaKind::Animation,
            "textstream" => MediaKind::TextStream,
            "brush" => MediaKind::Brush,
            _ => return None,
        })
    }

    /// Discrete media (images, static text, brushes) have an intrinsic
    /// length of zero; continuous media need the host to tell.
    pub fn is_discrete(self) -> bool {
        matches!(self, MediaKind::Img | MediaKind::Text | MediaKind::Brush)
    }
}

/// Typed fields of a media element, read back when the element closes
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MediaData {
    pub src: Option<String>,
    pub region: Option<String>,
    pub mime_type: Option<String>,
    /// Currently presented (between show and hide)
    pub(crate) shown: bool,
    /// Intrinsic length already requested from the host
    pub(crate) length_requested: bool,
    /// Intrinsic length reported by the host, deci-seconds
    pub(crate) intrinsic_length: Option<i64>,
}

/// A modification applied by a `set` element
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct AppliedSet {
    pub(crate) target: NodeId,
    pub(crate) previous: Option<String>,
}

/// Typed fields of a `set` animation element
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SetData {
    pub target_element: Option<String>,
    pub attribute_name: Option<String>,
    pub to: Option<String>,
    pub(crate) applied: Option<AppliedSet>,
}

/// Sequential group state
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeqData {
    /// Child to resume at on the next begin instead of the first child
    pub(crate) jump_target: Option<NodeId>,
}

/// Exclusive group state
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExclData {
    /// "About to start" subscriptions on each child
    pub(crate) connections: Vec<(NodeId, crate::signal::ConnectionId)>,
}

/// Switch state
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SwitchData {
    /// Selected once on first activation, never re-evaluated
    pub(crate) chosen: Option<NodeId>,
}

/// Closed set of node kinds
///
/// `body` is a [`NodeKind::Seq`] with tag `body`.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Document,
    Text,
    CData,
    Smil,
    Head,
    Meta,
    Layout,
    RootLayout,
    Region(RegionGeometry),
    Par,
    Seq(SeqData),
    Excl(ExclData),
    Switch(SwitchData),
    Media(MediaKind, MediaData),
    Set(SetData),
    /// Unrecognized element kept as an opaque placeholder
    Unknown,
}

impl NodeKind {
    /// Element nodes (everything except the document and character data)
    pub fn is_element(&self) -> bool {
        !matches!(self, NodeKind::Document | NodeKind::Text | NodeKind::CData)
    }

    /// Elements governed by a [`Runtime`]
    pub fn is_timed(&self) -> bool {
        matches!(
            self,
            NodeKind::Par
                | NodeKind::Seq(_)
                | NodeKind::Excl(_)
                | NodeKind::Switch(_)
                | NodeKind::Media(..)
                | NodeKind::Set(_)
        )
    }

    /// Composite timed elements scheduling their children
    pub fn is_group(&self) -> bool {
        matches!(
            self,
            NodeKind::Par | NodeKind::Seq(_) | NodeKind::Excl(_) | NodeKind::Switch(_)
        )
    }

    /// Non-timed containers that run their element children one after another
    pub fn is_container(&self) -> bool {
        matches!(self, NodeKind::Document | NodeKind::Smil)
    }

    /// Factory for the child created by `tag` under a node of this kind.
    ///
    /// Returns `None` for tags this kind does not recognize; the builder then
    /// substitutes an [`NodeKind::Unknown`] placeholder.
    pub fn child_from_tag(&self, tag: &str) -> Option<NodeKind> {
        match self {
            NodeKind::Document => match tag {
                "smil" => Some(NodeKind::Smil),
                _ => body_content(tag),
            },
            NodeKind::Smil => match tag {
                "head" => Some(NodeKind::Head),
                "body" => Some(NodeKind::Seq(SeqData::default())),
                _ => None,
            },
            NodeKind::Head => match tag {
                "layout" => Some(NodeKind::Layout),
                "meta" | "metadata" | "title" => Some(NodeKind::Meta),
                _ => None,
            },
            NodeKind::Layout => match tag {
                "root-layout" => Some(NodeKind::RootLayout),
                "region" => Some(NodeKind::Region(RegionGeometry::default())),
                _ => None,
            },
            NodeKind::Region(_) => match tag {
                "region" => Some(NodeKind::Region(RegionGeometry::default())),
                _ => None,
            },
            NodeKind::Par | NodeKind::Seq(_) | NodeKind::Excl(_) | NodeKind::Switch(_) => {
                body_content(tag)
            }
            NodeKind::Media(..) => match tag {
                "set" => Some(NodeKind::Set(SetData::default())),
                _ => None,
            },
            _ => None,
        }
    }
}

impl NodeKind {
    /// Same kind with all runtime bookkeeping cleared, for copies
    pub(crate) fn pristine(&self) -> NodeKind {
        match self {
            NodeKind::Seq(_) => NodeKind::Seq(SeqData::default()),
            NodeKind::Excl(_) => NodeKind::Excl(ExclData::default()),
            NodeKind::Switch(_) => NodeKind::Switch(SwitchData::default()),
            NodeKind::Media(kind, _) => NodeKind::Media(*kind, MediaData::default()),
            NodeKind::Set(_) => NodeKind::Set(SetData::default()),
            other => other.clone(),
        }
    }
}

/// Timed content allowed inside groups
fn body_content(tag: &str) -> Option<NodeKind> {
    match tag {
        "par" => Some(NodeKind::Par),
        "seq" => Some(NodeKind::Seq(SeqData::default())),
        "excl" => Some(NodeKind::Excl(ExclData::default())),
        "switch" => Some(NodeKind::Switch(SwitchData::default())),
        "set" => Some(NodeKind::Set(SetData::default())),
        _ => MediaKind::from_tag(tag).map(|kind| NodeKind::Media(kind, MediaData::default())),
    }
}

/// Timing bookkeeping of a timed element
#[derive(Debug, Default)]
pub struct TimedData {
    /// Lazily created, dropped on reset/deactivate
    pub(crate) runtime: Option<Runtime>,
    /// Clock time (ms) the element last started
    pub(crate) begin_time: u64,
    /// Clock time (ms) the element last finished
    pub(crate) finish_time: u64,
    /// Started since its last activation; outlives the runtime
    pub(crate) started: bool,
    /// Finished since its last activation
    pub(crate) ended: bool,
    /// Human readable caption from the `title` attribute
    pub(crate) caption: Option<String>,
    /// Held while the element is deferred
    pub(crate) deferral: Option<Postpone>,
}

impl Drop for TimedData {
    fn drop(&mut self) {
        // the document went away mid-deferral
        if let Some(token) = self.deferral.take() {
            token.discard();
        }
    }
}

/// A node of the document tree
#[derive(Debug)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) tag: String,
    pub(crate) attributes: Vec<(String, String)>,
    pub(crate) text: String,
    pub(crate) state: NodeState,
    pub(crate) parent: Option<NodeId>,
    pub(crate) first_child: Option<NodeId>,
    pub(crate) last_child: Option<NodeId>,
    pub(crate) next_sibling: Option<NodeId>,
    pub(crate) prev_sibling: Option<NodeId>,
    /// Synthesized node, skipped by serialization and content queries
    pub(crate) auxiliary: bool,
    pub(crate) closed: bool,
    pub(crate) listeners: Vec<Connection>,
    pub(crate) timed: Option<Box<TimedData>>,
}

impl Node {
    /// Create a detached node in `Init` state
    pub fn new(kind: NodeKind, tag: &str) -> Self {
        let timed = kind.is_timed().then(Box::default);
        Self {
            kind,
            tag: tag.to_string(),
            attributes: Vec::new(),
            text: String::new(),
            state: NodeState::Init,
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
            prev_sibling: None,
            auxiliary: false,
            closed: false,
            listeners: Vec::new(),
            timed,
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Character data of text and CDATA nodes
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn first_child(&self) -> Option<NodeId> {
        self.first_child
    }

    pub fn last_child(&self) -> Option<NodeId> {
        self.last_child
    }

    pub fn next_sibling(&self) -> Option<NodeId> {
        self.next_sibling
    }

    pub fn prev_sibling(&self) -> Option<NodeId> {
        self.prev_sibling
    }

    pub fn is_auxiliary(&self) -> bool {
        self.auxiliary
    }

    /// Whether the builder has seen this node's end tag
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Attributes in document order
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub(crate) fn set_attribute(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.attributes.push((name.to_string(), value.to_string())),
        }
    }

    /// Re-read the typed fields backed by attributes
    pub(crate) fn sync_typed_fields(&mut self) {
        let attributes = &self.attributes;
        let get = |name: &str| {
            attributes
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
        };
        match &mut self.kind {
            NodeKind::Media(_, data) => {
                data.src = get("src");
                data.region = get("region");
                data.mime_type = get("type");
            }
            NodeKind::Set(data) => {
                data.target_element = get("targetElement");
                data.attribute_name = get("attributeName");
                data.to = get("to");
            }
            NodeKind::Region(geometry) => *geometry = RegionGeometry::from_attributes(get),
            _ => {}
        }
        if let Some(timed) = self.timed.as_mut() {
            timed.caption = get("title");
        }
    }

    pub(crate) fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|(key, _)| key == name)?;
        Some(self.attributes.remove(pos).1)
    }

    /// `id` (or `xml:id`) attribute
    pub fn element_id(&self) -> Option<&str> {
        self.attribute("id").or_else(|| self.attribute("xml:id"))
    }

    /// Runtime of a timed element, if it currently has one
    pub fn runtime(&self) -> Option<&Runtime> {
        self.timed.as_ref().and_then(|t| t.runtime.as_ref())
    }

    /// Caption set through the `title` attribute
    pub fn caption(&self) -> Option<&str> {
        self.timed.as_ref().and_then(|t| t.caption.as_deref())
    }

    /// Clock time (ms) of the last start and last finish
    pub fn timestamps(&self) -> Option<(u64, u64)> {
        self.timed.as_ref().map(|t| (t.begin_time, t.finish_time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_lattice_queries() {
        assert!(!NodeState::Init.is_active());
        assert!(NodeState::Activated.is_active());
        assert!(NodeState::Finished.is_active());
        assert!(!NodeState::Deactivated.is_active());

        assert!(NodeState::Began.is_unfinished());
        assert!(NodeState::Deferred.is_unfinished());
        assert!(!NodeState::Finished.is_unfinished());
        assert!(!NodeState::Init.is_unfinished());
    }

    #[test]
    fn test_factory_per_parent_kind() {
        assert_eq!(NodeKind::Document.child_from_tag("smil"), Some(NodeKind::Smil));
        assert_eq!(NodeKind::Smil.child_from_tag("head"), Some(NodeKind::Head));
        assert!(matches!(
            NodeKind::Smil.child_from_tag("body"),
            Some(NodeKind::Seq(_))
        ));
        assert_eq!(NodeKind::Smil.child_from_tag("video"), None);
        assert_eq!(NodeKind::Par.child_from_tag("head"), None);
        assert!(matches!(
            NodeKind::Par.child_from_tag("video"),
            Some(NodeKind::Media(MediaKind::Video, _))
        ));
        assert!(matches!(
            NodeKind::Media(MediaKind::Img, MediaData::default()).child_from_tag("set"),
            Some(NodeKind::Set(_))
        ));
        assert_eq!(NodeKind::Unknown.child_from_tag("par"), None);
    }

    #[test]
    fn test_kind_classification() {
        assert!(NodeKind::Par.is_group());
        assert!(NodeKind::Par.is_timed());
        assert!(NodeKind::Set(SetData::default()).is_timed());
        assert!(!NodeKind::Set(SetData::default()).is_group());
        assert!(!NodeKind::Region(RegionGeometry::default()).is_timed());
        assert!(!NodeKind::Text.is_element());
        assert!(NodeKind::Unknown.is_element());
        assert!(NodeKind::Smil.is_container());
    }

    #[test]
    fn test_attribute_set_and_remove() {
        let mut node = Node::new(NodeKind::Par, "par");
        node.set_attribute("dur", "2s");
        node.set_attribute("id", "p");
        node.set_attribute("dur", "3s");

        assert_eq!(node.attribute("dur"), Some("3s"));
        assert_eq!(node.element_id(), Some("p"));
        assert_eq!(node.attributes().len(), 2);
        assert_eq!(node.remove_attribute("dur"), Some("3s".to_string()));
        assert_eq!(node.attribute("dur"), None);
    }

    #[test]
    fn test_sync_typed_fields() {
        let mut node = Node::new(NodeKind::Media(MediaKind::Video, MediaData::default()), "video");
        node.set_attribute("src", "clip.mp4");
        node.set_attribute("region", "main");
        node.set_attribute("title", "Clip");
        node.sync_typed_fields();

        match node.kind() {
            NodeKind::Media(_, data) => {
                assert_eq!(data.src.as_deref(), Some("clip.mp4"));
                assert_eq!(data.region.as_deref(), Some("main"));
            }
            other => panic!("unexpected kind {other:?}"),
        }
        assert_eq!(node.caption(), Some("Clip"));
    }

    #[test]
    fn test_timed_nodes_get_timing_data() {
        assert!(Node::new(NodeKind::Par, "par").timed.is_some());
        assert!(Node::new(NodeKind::Head, "head").timed.is_none());
    }
}
