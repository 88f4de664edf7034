//! XML front-end: feeds quick-xml events into a [`TreeBuilder`]
//!
//! End-name checking is left to the builder so mismatched tags get repaired
//! instead of aborting the parse. Comments, processing instructions and the
//! doctype carry nothing for the engine and are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, warn};

use crate::builder::TreeBuilder;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::host::Host;
use crate::tree::NodeId;

/// Parse a document from any buffered reader into `doc`'s root
pub fn parse_reader<R: BufRead, H: Host>(doc: &mut Document<H>, input: R) -> Result<NodeId> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().check_end_names = false;

    let mut builder = TreeBuilder::new(doc);
    let mut buf = Vec::new();
    let mut events = 0_usize;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            Error::Xml(format!("at byte {}: {}", reader.buffer_position(), e))
        })?;
        events += 1;
        match event {
            Event::Start(e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let attributes = read_attributes(&e)?;
                builder.start_tag(&tag, attributes);
            }
            Event::Empty(e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let attributes = read_attributes(&e)?;
                builder.start_tag(&tag, attributes);
                builder.end_tag(&tag);
            }
            Event::End(e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                builder.end_tag(&tag);
            }
            Event::Text(e) => {
                let text = match e.unescape() {
                    Ok(text) => text.into_owned(),
                    Err(err) => {
                        warn!("Keeping text with bad escape verbatim: {}", err);
                        String::from_utf8_lossy(&e).into_owned()
                    }
                };
                builder.character_data(&text);
            }
            Event::CData(e) => {
                let bytes = e.into_inner();
                builder.cdata(&String::from_utf8_lossy(&bytes));
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    debug!("Parsed {} XML events", events);
    Ok(builder.finish())
}

/// Parse a document from a string
pub fn parse_str<H: Host>(doc: &mut Document<H>, input: &str) -> Result<NodeId> {
    parse_reader(doc, input.as_bytes())
}

/// Parse a document from a file
pub fn parse_file<H: Host>(doc: &mut Document<H>, path: &Path) -> Result<NodeId> {
    let file = File::open(path)?;
    debug!("Loading {}", path.display());
    parse_reader(doc, BufReader::new(file))
}

fn read_attributes(start: &quick_xml::events::BytesStart<'_>) -> Result<Vec<(String, String)>> {
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| Error::Xml(e.to_string()))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = match attribute.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attribute.value).into_owned(),
        };
        attributes.push((key, value));
    }
    Ok(attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NullHost;
    use crate::tree::NodeKind;

    #[test]
    fn test_parse_smil_document() {
        let mut doc = Document::default();
        parse_str(
            &mut doc,
            r#"<?xml version="1.0"?>
<!-- intro -->
<smil>
  <head><layout><region id="main" width="320" height="240"/></layout></head>
  <body>
    <video id="v" src="a&amp;b.mp4" dur="2s"/>
  </body>
</smil>"#,
        )
        .unwrap();

        let video = doc.find_by_id("v").unwrap();
        assert_eq!(doc.attribute(video, "src"), Some("a&b.mp4"));
        assert!(doc.find_region("main").is_some());
        let smil = doc.children(doc.root()).find(|c| {
            doc.node(*c).is_some_and(|n| matches!(n.kind(), NodeKind::Smil))
        });
        assert!(smil.is_some());
    }

    #[test]
    fn test_mismatched_end_tags_are_repaired() {
        let mut doc: Document<NullHost> = Document::default();
        parse_str(&mut doc, "<seq id='s'><par id='p'><img id='i'/></seq><img id='after'/>")
            .unwrap();

        let seq = doc.find_by_id("s").unwrap();
        let par = doc.find_by_id("p").unwrap();
        let after = doc.find_by_id("after").unwrap();
        assert_eq!(doc.node(par).and_then(|n| n.parent()), Some(seq));
        assert_eq!(doc.node(after).and_then(|n| n.parent()), Some(doc.root()));
    }

    #[test]
    fn test_cdata_is_kept() {
        let mut doc = Document::default();
        parse_str(&mut doc, "<text id='t'><![CDATA[a < b]]></text>").unwrap();
        let t = doc.find_by_id("t").unwrap();
        let child = doc.children(t).next().and_then(|c| doc.node(c)).unwrap();
        assert_eq!(child.kind(), &NodeKind::CData);
        assert_eq!(child.text(), "a < b");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let mut doc = Document::default();
        let err = parse_file(&mut doc, Path::new("/nonexistent/show.smil")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
