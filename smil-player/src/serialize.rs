//! Writes a subtree back out as XML
//!
//! Auxiliary nodes the engine synthesised (the implied `root-layout`) are left
//! out, so a parsed document round-trips to what its author wrote. Unknown
//! elements are written like any other.

use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::document::Document;
use crate::error::{Error, Result};
use crate::host::Host;
use crate::tree::{NodeId, NodeKind};

impl<H: Host> Document<H> {
    /// Serialize `id` and everything below it
    pub fn outer_xml(&self, id: NodeId) -> Result<String> {
        if self.node(id).is_none() {
            return Err(Error::NotFound(format!("node {id}")));
        }
        let mut writer = Writer::new(Vec::new());
        self.write_node(&mut writer, id)?;
        String::from_utf8(writer.into_inner()).map_err(|e| Error::Xml(e.to_string()))
    }

    /// Serialize the children of `id` without `id` itself
    pub fn inner_xml(&self, id: NodeId) -> Result<String> {
        if self.node(id).is_none() {
            return Err(Error::NotFound(format!("node {id}")));
        }
        let mut writer = Writer::new(Vec::new());
        for child in self.children(id) {
            self.write_node(&mut writer, child)?;
        }
        String::from_utf8(writer.into_inner()).map_err(|e| Error::Xml(e.to_string()))
    }

    fn write_node(&self, writer: &mut Writer<Vec<u8>>, id: NodeId) -> Result<()> {
        let Some(node) = self.node(id) else {
            return Ok(());
        };
        if node.is_auxiliary() {
            return Ok(());
        }
        let result = match node.kind() {
            NodeKind::Document => {
                for child in self.children(id) {
                    self.write_node(writer, child)?;
                }
                Ok(())
            }
            NodeKind::Text => writer.write_event(Event::Text(BytesText::new(node.text()))),
            NodeKind::CData => writer.write_event(Event::CData(BytesCData::new(node.text()))),
            _ => {
                let start = BytesStart::new(node.tag()).with_attributes(
                    node.attributes()
                        .iter()
                        .map(|(k, v)| (k.as_str(), v.as_str())),
                );
                let has_content = self
                    .children(id)
                    .any(|c| self.node(c).is_some_and(|n| !n.is_auxiliary()));
                if has_content {
                    writer.write_event(Event::Start(start)).map_err(xml_error)?;
                    for child in self.children(id) {
                        self.write_node(writer, child)?;
                    }
                    writer.write_event(Event::End(BytesEnd::new(node.tag())))
                } else {
                    writer.write_event(Event::Empty(start))
                }
            }
        };
        result.map_err(xml_error)
    }
}

fn xml_error(err: impl std::fmt::Display) -> Error {
    Error::Xml(err.to_string())
}
