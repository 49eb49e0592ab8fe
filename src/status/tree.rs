//! Generic XML tree for status documents.
//!
//! The status schema is not declared anywhere, so the tree cannot tell a tag
//! that happens to occur once from one that may repeat. Repeated siblings are
//! collected into a [`RawNode::List`]; a single occurrence stays as-is. The
//! normalizer is responsible for smoothing over the difference.

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;
use quick_xml::Reader;

use super::StatusError;

/// A node of the generic status tree.
#[derive(Debug, Clone, PartialEq)]
pub enum RawNode {
    Text(String),
    /// Child tags in document order; each tag appears at most once.
    Map(Vec<(String, RawNode)>),
    /// Occurrences of a repeated tag.
    List(Vec<RawNode>),
}

impl RawNode {
    pub fn get(&self, key: &str) -> Option<&RawNode> {
        match self {
            RawNode::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            RawNode::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Text of the child `key`, if it is a leaf.
    #[cfg(test)]
    pub fn child_text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(RawNode::text)
    }

    pub fn is_map(&self) -> bool {
        matches!(self, RawNode::Map(_))
    }

    /// Insert a child, turning a repeated tag into a list.
    fn push_child(&mut self, name: String, child: RawNode) {
        if !matches!(self, RawNode::Map(_)) {
            *self = RawNode::Map(Vec::new());
        }
        let RawNode::Map(entries) = self else {
            return;
        };
        match entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, RawNode::List(items))) => items.push(child),
            Some((_, existing)) => {
                let first = std::mem::replace(existing, RawNode::List(Vec::new()));
                *existing = RawNode::List(vec![first, child]);
            }
            None => entries.push((name, child)),
        }
    }
}

/// An element being built: its name, children so far and accumulated text.
struct OpenElement {
    name: String,
    node: Option<RawNode>,
    text: String,
}

impl OpenElement {
    fn new(name: String) -> Self {
        Self {
            name,
            node: None,
            text: String::new(),
        }
    }

    fn add_child(&mut self, name: String, child: RawNode) {
        self.node
            .get_or_insert_with(|| RawNode::Map(Vec::new()))
            .push_child(name, child);
    }

    /// Children win over text; whitespace around text is dropped.
    fn finish(self) -> (String, RawNode) {
        let node = self
            .node
            .unwrap_or_else(|| RawNode::Text(self.text.trim().to_string()));
        (self.name, node)
    }
}

/// Parse a status document into a tree rooted at a map holding the root element.
///
/// `<gateway><status>x</status></gateway>` becomes
/// `Map[("gateway", Map[("status", Text("x"))])]`.
pub fn parse_document(xml: &[u8]) -> Result<RawNode, StatusError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut stack: Vec<OpenElement> = Vec::new();
    let mut document = RawNode::Map(Vec::new());
    let mut saw_root = false;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| StatusError::Xml(e.to_string()))?;

        match event {
            Event::Start(e) => {
                if stack.is_empty() && saw_root {
                    return Err(StatusError::Xml("multiple root elements".to_string()));
                }
                stack.push(OpenElement::new(element_name(e.name().as_ref())?));
            }
            Event::Empty(e) => {
                let name = element_name(e.name().as_ref())?;
                match stack.last_mut() {
                    Some(parent) => parent.add_child(name, RawNode::Text(String::new())),
                    None if saw_root => {
                        return Err(StatusError::Xml("multiple root elements".to_string()))
                    }
                    None => {
                        document.push_child(name, RawNode::Text(String::new()));
                        saw_root = true;
                    }
                }
            }
            Event::End(_) => {
                let open = stack
                    .pop()
                    .ok_or_else(|| StatusError::Xml("unexpected closing tag".to_string()))?;
                let (name, node) = open.finish();
                match stack.last_mut() {
                    Some(parent) => parent.add_child(name, node),
                    None => {
                        document.push_child(name, node);
                        saw_root = true;
                    }
                }
            }
            Event::Text(t) => {
                let text = t.decode().map_err(|e| StatusError::Xml(e.to_string()))?;
                append_text(&mut stack, &text)?;
            }
            Event::CData(c) => {
                let text = c.decode().map_err(|e| StatusError::Xml(e.to_string()))?;
                append_text(&mut stack, &text)?;
            }
            Event::GeneralRef(r) => {
                let resolved = match r
                    .resolve_char_ref()
                    .map_err(|e| StatusError::Xml(e.to_string()))?
                {
                    Some(ch) => ch.to_string(),
                    None => {
                        let name = r.decode().map_err(|e| StatusError::Xml(e.to_string()))?;
                        resolve_predefined_entity(&name)
                            .ok_or_else(|| StatusError::Xml(format!("unknown entity &{};", name)))?
                            .to_string()
                    }
                };
                append_text(&mut stack, &resolved)?;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(StatusError::Xml("unexpected end of document".to_string()));
    }
    if !saw_root {
        return Err(StatusError::Xml("document has no root element".to_string()));
    }

    Ok(document)
}

fn element_name(raw: &[u8]) -> Result<String, StatusError> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|e| StatusError::Xml(e.to_string()))
}

fn append_text(stack: &mut [OpenElement], text: &str) -> Result<(), StatusError> {
    match stack.last_mut() {
        Some(open) => {
            open.text.push_str(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(StatusError::Xml("text outside the root element".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_child_stays_map() {
        let tree = parse_document(b"<gateway><boxes><box><type>smsbox</type></box></boxes></gateway>")
            .unwrap();
        let boxes = tree.get("gateway").unwrap().get("boxes").unwrap();
        let single = boxes.get("box").unwrap();
        assert!(single.is_map());
        assert_eq!(single.child_text("type"), Some("smsbox"));
    }

    #[test]
    fn test_repeated_children_become_list() {
        let xml = br#"<?xml version="1.0"?>
            <gateway>
              <smscs>
                <count>2</count>
                <smsc><id>a</id></smsc>
                <smsc><id>b</id></smsc>
              </smscs>
            </gateway>"#;
        let tree = parse_document(xml).unwrap();
        let smscs = tree.get("gateway").unwrap().get("smscs").unwrap();
        assert_eq!(smscs.child_text("count"), Some("2"));

        match smscs.get("smsc").unwrap() {
            RawNode::List(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].child_text("id"), Some("a"));
                assert_eq!(items[1].child_text("id"), Some("b"));
            }
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn test_entities_and_empty_elements() {
        let xml = b"<gateway><version>Kannel &amp; co &#65;</version><boxes/></gateway>";
        let tree = parse_document(xml).unwrap();
        let gw = tree.get("gateway").unwrap();
        assert_eq!(gw.child_text("version"), Some("Kannel & co A"));
        assert_eq!(gw.child_text("boxes"), Some(""));
    }

    #[test]
    fn test_malformed_documents() {
        assert!(parse_document(b"").is_err());
        assert!(parse_document(b"<gateway><status>x</gateway>").is_err());
        assert!(parse_document(b"<gateway><status>x</status>").is_err());
        assert!(parse_document(b"not xml at all").is_err());
        assert!(parse_document(b"<a/><b/>").is_err());
    }
}
