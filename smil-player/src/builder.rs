//! Streaming tree builder
//!
//! Consumes the four parse events (start tag, end tag, text, CDATA) and grows
//! the document incrementally. Each new element is created by its parent's
//! child factory; unrecognized tags become opaque placeholders that still
//! keep their own children.
//!
//! Malformed nesting is repaired greedily: an end tag closes every open
//! element up to the nearest one with a matching name, and end tags matching
//! nothing open are dropped.

use tracing::warn;

use crate::document::Document;
use crate::host::Host;
use crate::tree::NodeId;

/// Builds a subtree of a [`Document`] from parse events
pub struct TreeBuilder<'a, H: Host> {
    doc: &'a mut Document<H>,
    root: NodeId,
    current: NodeId,
    depth: usize,
}

impl<'a, H: Host> TreeBuilder<'a, H> {
    /// Build under the document root
    pub fn new(doc: &'a mut Document<H>) -> Self {
        let root = doc.root();
        Self::with_root(doc, root)
    }

    /// Build a fragment under `root`
    pub fn with_root(doc: &'a mut Document<H>, root: NodeId) -> Self {
        Self {
            doc,
            root,
            current: root,
            depth: 0,
        }
    }

    /// Element currently receiving children
    pub fn current(&self) -> NodeId {
        self.current
    }

    /// Number of open elements
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn start_tag<I, K, V>(&mut self, tag: &str, attributes: I) -> NodeId
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let attributes = attributes
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let id = self.doc.open_child(self.current, tag, attributes);
        self.current = id;
        self.depth += 1;
        id
    }

    pub fn end_tag(&mut self, tag: &str) {
        if self.depth == 0 {
            warn!("Stray end tag </{}> ignored", tag);
            return;
        }
        let mut open = Vec::new();
        let mut cursor = Some(self.current);
        let mut matched = false;
        while let Some(id) = cursor.filter(|id| *id != self.root) {
            open.push(id);
            if self.doc.store[id].tag == tag {
                matched = true;
                break;
            }
            cursor = self.doc.store[id].parent;
        }
        if !matched {
            warn!("End tag </{}> matches no open element, ignored", tag);
            return;
        }
        if open.len() > 1 {
            let unclosed: Vec<&str> = open[..open.len() - 1]
                .iter()
                .map(|id| self.doc.store[*id].tag.as_str())
                .collect();
            warn!("</{}> closes unclosed {:?}", tag, unclosed);
        }
        for id in open {
            self.doc.close_node(id);
            self.depth -= 1;
            self.current = self.doc.store[id].parent.unwrap_or(self.root);
        }
    }

    /// Character data; adjacent runs merge into one text node
    pub fn character_data(&mut self, text: &str) {
        self.doc.append_text(self.current, text, false);
    }

    pub fn cdata(&mut self, text: &str) {
        self.doc.append_text(self.current, text, true);
    }

    /// End of input. Elements still open are closed, innermost first.
    pub fn finish(mut self) -> NodeId {
        if self.depth > 0 {
            warn!(
                "Input ended with {} unclosed element(s), innermost <{}>",
                self.depth, self.doc.store[self.current].tag
            );
        }
        while self.depth > 0 && self.current != self.root {
            let id = self.current;
            self.doc.close_node(id);
            self.depth -= 1;
            self.current = self.doc.store[id].parent.unwrap_or(self.root);
        }
        self.root
    }
}
