use super::escape::{escape_text, escape_xml, unescape_xml};
use crate::common::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Strip the namespace prefix from a qualified name (`p:sp` -> `sp`).
#[inline]
pub fn local_name(qualified: &str) -> &str {
    match memchr::memchr(b':', qualified.as_bytes()) {
        Some(pos) => &qualified[pos + 1..],
        None => qualified,
    }
}

/// A node inside an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    /// Child element
    Element(XmlElement),
    /// Character data, stored unescaped
    Text(String),
    /// CDATA section
    CData(String),
    /// Comment, stored verbatim
    Comment(String),
}

/// A composite XML element: qualified name, ordered attributes and child nodes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

impl XmlElement {
    /// Create an empty element with a qualified name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder-style child append.
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.push(child);
        self
    }

    /// Builder-style text content.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    /// Qualified name, including the namespace prefix.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without the namespace prefix.
    #[inline]
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Get an attribute by qualified name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing any existing value in place.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|(key, _)| key == name)?;
        Some(self.attributes.remove(pos).1)
    }

    /// Iterate over attributes in document order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// All child nodes, including text.
    #[inline]
    pub fn nodes(&self) -> &[XmlNode] {
        &self.children
    }

    /// Child elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Mutable child elements in document order.
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|node| match node {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    /// First child element with the given local name.
    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.local_name() == local)
    }

    /// Mutable first child element with the given local name.
    pub fn child_mut(&mut self, local: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|e| e.local_name() == local)
    }

    /// Child elements with the given local name.
    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |e| e.local_name() == local)
    }

    /// Mutable child elements with the given local name.
    pub fn children_named_mut<'a>(
        &'a mut self,
        local: &'a str,
    ) -> impl Iterator<Item = &'a mut XmlElement> {
        self.elements_mut().filter(move |e| e.local_name() == local)
    }

    /// Follow a path of local names from this element.
    pub fn find(&self, path: &[&str]) -> Option<&XmlElement> {
        path.iter().try_fold(self, |current, local| current.child(local))
    }

    /// Mutable variant of [`find`](Self::find).
    pub fn find_mut(&mut self, path: &[&str]) -> Option<&mut XmlElement> {
        let mut current = self;
        for local in path {
            current = current.child_mut(local)?;
        }
        Some(current)
    }

    /// Append a child element.
    pub fn push(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    /// Insert a child element before the `position`-th child element.
    ///
    /// Positions past the last element append.
    pub fn insert_child(&mut self, position: usize, child: XmlElement) {
        let node_idx = self
            .children
            .iter()
            .enumerate()
            .filter(|(_, node)| matches!(node, XmlNode::Element(_)))
            .nth(position)
            .map(|(idx, _)| idx)
            .unwrap_or(self.children.len());
        self.children.insert(node_idx, XmlNode::Element(child));
    }

    /// Get the first child with the local name of `qualified`, creating it at
    /// `position` (in element order) when absent.
    pub fn ensure_child_at(&mut self, qualified: &str, position: usize) -> &mut XmlElement {
        let local = local_name(qualified);
        if !self.elements().any(|e| e.local_name() == local) {
            self.insert_child(position, XmlElement::new(qualified));
        }
        let node_idx = self
            .children
            .iter()
            .position(|node| matches!(node, XmlNode::Element(e) if e.local_name() == local))
            .unwrap_or_default();
        match &mut self.children[node_idx] {
            XmlNode::Element(e) => e,
            _ => unreachable!("position was matched against an element node"),
        }
    }

    /// Get the first child with the local name of `qualified`, appending it when absent.
    pub fn ensure_child(&mut self, qualified: &str) -> &mut XmlElement {
        let position = self.elements().count();
        self.ensure_child_at(qualified, position)
    }

    /// Remove every child element matching `pred`, returning them in order.
    pub fn remove_children<F>(&mut self, mut pred: F) -> Vec<XmlElement>
    where
        F: FnMut(&XmlElement) -> bool,
    {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.children.len());
        for node in self.children.drain(..) {
            match node {
                XmlNode::Element(e) if pred(&e) => removed.push(e),
                other => kept.push(other),
            }
        }
        self.children = kept;
        removed
    }

    /// Remove and return all child nodes.
    pub fn take_nodes(&mut self) -> Vec<XmlNode> {
        std::mem::take(&mut self.children)
    }

    /// Replace all child nodes.
    pub fn set_nodes(&mut self, nodes: Vec<XmlNode>) {
        self.children = nodes;
    }

    /// Concatenated character data of this element and its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                XmlNode::Element(e) => e.collect_text(out),
                XmlNode::Text(t) | XmlNode::CData(t) => out.push_str(t),
                XmlNode::Comment(_) => {},
            }
        }
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children.clear();
        let text = text.into();
        if !text.is_empty() {
            self.children.push(XmlNode::Text(text));
        }
    }

    /// Visit this element and all descendant elements in document order.
    pub fn visit<F: FnMut(&XmlElement)>(&self, f: &mut F) {
        f(self);
        for child in self.elements() {
            child.visit(f);
        }
    }

    /// Mutable variant of [`visit`](Self::visit).
    pub fn visit_mut<F: FnMut(&mut XmlElement)>(&mut self, f: &mut F) {
        f(self);
        for child in self.elements_mut() {
            child.visit_mut(f);
        }
    }

    /// Serialize this element into `out`.
    pub fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape_xml(value));
            out.push('"');
        }

        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }

        out.push('>');
        for node in &self.children {
            match node {
                XmlNode::Element(e) => e.write_to(out),
                XmlNode::Text(t) => out.push_str(&escape_text(t)),
                XmlNode::CData(c) => {
                    out.push_str("<![CDATA[");
                    out.push_str(c);
                    out.push_str("]]>");
                },
                XmlNode::Comment(c) => {
                    out.push_str("<!--");
                    out.push_str(c);
                    out.push_str("-->");
                },
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }

    /// Serialize this element to a string without an XML declaration.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::with_capacity(256);
        self.write_to(&mut out);
        out
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = std::str::from_utf8(start.name().as_ref())?.to_string();
        let mut element = XmlElement::new(name);
        for attr in start.attributes() {
            let attr = attr?;
            let key = std::str::from_utf8(attr.key.as_ref())?;
            let value = std::str::from_utf8(&attr.value)?;
            element.attributes.push((key.to_string(), unescape_xml(value)));
        }
        Ok(element)
    }
}

/// A parsed XML part: a single root element.
///
/// The XML declaration is normalized to UTF-8 standalone on output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    root: XmlElement,
}

impl XmlDocument {
    /// Wrap a root element.
    pub fn new(root: XmlElement) -> Self {
        Self { root }
    }

    /// Parse a complete XML document.
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(false);

        let mut buf = Vec::new();
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;
        // Raw (still escaped) character data, flushed when markup follows
        let mut pending = String::new();

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| Error::Xml(format!("at byte {}: {}", reader.buffer_position(), e)))?;
            match event {
                Event::Text(t) => pending.push_str(std::str::from_utf8(t.as_ref())?),
                Event::GeneralRef(r) => {
                    pending.push('&');
                    pending.push_str(std::str::from_utf8(&r)?);
                    pending.push(';');
                },
                Event::CData(c) => {
                    flush_text(&mut stack, &mut pending);
                    let data = std::str::from_utf8(c.as_ref())?.to_string();
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::CData(data));
                    }
                },
                Event::Comment(c) => {
                    flush_text(&mut stack, &mut pending);
                    let data = std::str::from_utf8(c.as_ref())?.to_string();
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::Comment(data));
                    }
                },
                Event::Start(e) => {
                    flush_text(&mut stack, &mut pending);
                    stack.push(XmlElement::from_start(&e)?);
                },
                Event::Empty(e) => {
                    flush_text(&mut stack, &mut pending);
                    let element = XmlElement::from_start(&e)?;
                    attach(&mut stack, &mut root, element)?;
                },
                Event::End(_) => {
                    flush_text(&mut stack, &mut pending);
                    let element = stack
                        .pop()
                        .ok_or_else(|| Error::Xml("unbalanced end tag".to_string()))?;
                    attach(&mut stack, &mut root, element)?;
                },
                Event::Eof => break,
                _ => {},
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(Error::Xml(format!(
                "unclosed element <{}>",
                stack.last().map(|e| e.name.as_str()).unwrap_or_default()
            )));
        }

        root.map(Self::new)
            .ok_or_else(|| Error::Xml("document has no root element".to_string()))
    }

    /// The root element.
    #[inline]
    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    /// Mutable root element.
    #[inline]
    pub fn root_mut(&mut self) -> &mut XmlElement {
        &mut self.root
    }

    /// Serialize with a standalone UTF-8 declaration.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::with_capacity(4096);
        out.push_str(XML_DECLARATION);
        out.push('\n');
        self.root.write_to(&mut out);
        out
    }

    /// Serialize to bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_xml_string().into_bytes()
    }
}

fn flush_text(stack: &mut [XmlElement], pending: &mut String) {
    if pending.is_empty() {
        return;
    }
    // Character data outside the root element is insignificant
    if let Some(parent) = stack.last_mut() {
        parent.children.push(XmlNode::Text(unescape_xml(pending)));
    }
    pending.clear();
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => return Err(Error::Xml("multiple root elements".to_string())),
    }
    Ok(())
}
