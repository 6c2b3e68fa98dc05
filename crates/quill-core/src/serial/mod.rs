//! XML persistence for blocks and scripts.
//!
//! Reading is two-phase: the text is first parsed into a plain [`Element`]
//! tree, then nodes are built from that tree by the builder registered for
//! each element name. No node ever exists half-populated.
//!
//! An element with no attributes and no children in a slot position means
//! "unset" and is read back as an empty slot.

pub mod builders;

use std::path::Path;

use indexmap::IndexMap;
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;
use tracing::debug;

use crate::address::AddressError;
use crate::blocks::{
    Block, CompositionError, Node, ObjectKind, ObjectRef, Script, Slot, Spine, Trigger, Value,
};
use crate::library::Library;

pub use builders::{BuildFn, BuilderRegistry};

pub const SCRIPT_ELEMENT: &str = "Script";
pub const SLOT_ELEMENT: &str = "Slot";
pub const BODY_ELEMENT: &str = "Body";
pub const ELSE_ELEMENT: &str = "Else";
pub const TRIGGER_ELEMENT: &str = "Trigger";
pub const SPINE_ELEMENT: &str = "Spine";

/// Errors raised while reading or writing XML
#[derive(Error, Debug)]
pub enum SerialError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    Attribute(#[from] AttrError),

    #[error("Malformed document: {0}")]
    Malformed(String),

    #[error("Unknown element <{0}>")]
    UnknownElement(String),

    #[error("Unexpected element <{found}> in <{parent}>")]
    UnexpectedElement { parent: String, found: String },

    #[error("<{parent}> has more than one <{found}>")]
    DuplicateElement { parent: String, found: String },

    #[error("<{element}> has unexpected attribute '{attribute}'")]
    UnexpectedAttribute { element: String, attribute: String },

    #[error("<{element}> is missing attribute '{attribute}'")]
    MissingAttribute { element: String, attribute: String },

    #[error("<{element}> has invalid {attribute} '{value}'")]
    InvalidAttribute {
        element: String,
        attribute: String,
        value: String,
    },

    #[error(transparent)]
    Composition(#[from] CompositionError),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SerialError>;

/// Plain XML element: the intermediate record nodes are built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: IndexMap<String, String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn require(&self, key: &str) -> Result<&str> {
        self.attribute(key)
            .ok_or_else(|| SerialError::MissingAttribute {
                element: self.name.clone(),
                attribute: key.to_string(),
            })
    }

    pub fn invalid(&self, attribute: &str, value: &str) -> SerialError {
        SerialError::InvalidAttribute {
            element: self.name.clone(),
            attribute: attribute.to_string(),
            value: value.to_string(),
        }
    }

    /// No attributes and no children: the serialized form of "unset".
    pub fn is_blank(&self) -> bool {
        self.attributes.is_empty() && self.children.is_empty()
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// The child named `name`, failing if there is more than one.
    pub fn unique_child(&self, name: &str) -> Result<Option<&Element>> {
        let mut matches = self.children.iter().filter(|c| c.name == name);
        let first = matches.next();
        if matches.next().is_some() {
            return Err(SerialError::DuplicateElement {
                parent: self.name.clone(),
                found: name.to_string(),
            });
        }
        Ok(first)
    }

    /// Fail if any attribute is not one of `allowed`.
    pub fn expect_attributes(&self, allowed: &[&str]) -> Result<()> {
        match self
            .attributes
            .keys()
            .find(|key| !allowed.contains(&key.as_str()))
        {
            Some(key) => Err(SerialError::UnexpectedAttribute {
                element: self.name.clone(),
                attribute: key.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Fail if the element has any children.
    pub fn expect_leaf(&self) -> Result<()> {
        self.expect_children(&[])
    }

    /// Fail if any child is not one of `allowed`.
    pub fn expect_children(&self, allowed: &[&str]) -> Result<()> {
        match self
            .children
            .iter()
            .find(|c| !allowed.contains(&c.name.as_str()))
        {
            Some(other) => Err(SerialError::UnexpectedElement {
                parent: self.name.clone(),
                found: other.name.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Parse XML text into a single root [`Element`].
pub fn parse_document(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => stack.push(start_element(e)?),
            Event::Empty(ref e) => {
                let element = start_element(e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(ref e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let element = stack
                    .pop()
                    .ok_or_else(|| SerialError::Malformed(format!("unmatched </{name}>")))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(ref e) => {
                let text = e.unescape()?;
                if !text.trim().is_empty() {
                    return Err(SerialError::Malformed(format!(
                        "unexpected text '{}'",
                        text.trim()
                    )));
                }
            }
            Event::CData(_) => {
                return Err(SerialError::Malformed("unexpected CDATA".to_string()));
            }
            Event::Eof => break,
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(SerialError::Malformed(format!("<{}> is never closed", open.name)));
    }
    root.ok_or_else(|| SerialError::Malformed("document has no root element".to_string()))
}

fn start_element(e: &BytesStart<'_>) -> Result<Element> {
    let mut element = Element::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.insert(key, value);
    }
    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(SerialError::Malformed(format!(
                "second root element <{}>",
                element.name
            )))
        }
    }
    Ok(())
}

/// Write an [`Element`] tree as an indented XML document.
pub fn write_document(root: &Element) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_element(&mut writer, root)?;
    String::from_utf8(writer.into_inner())
        .map_err(|e| SerialError::Malformed(format!("writer produced invalid UTF-8: {e}")))
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

/// Reads and writes nodes and scripts against a statement library.
pub struct XmlCodec<'a> {
    library: &'a Library,
    builders: BuilderRegistry,
}

impl<'a> XmlCodec<'a> {
    pub fn new(library: &'a Library) -> Self {
        Self {
            library,
            builders: BuilderRegistry::standard(),
        }
    }

    pub fn with_builders(library: &'a Library, builders: BuilderRegistry) -> Self {
        Self { library, builders }
    }

    pub fn library(&self) -> &Library {
        self.library
    }

    pub fn node_to_element(&self, node: &Node) -> Element {
        let element = Element::new(node.kind().element_name());
        match node.block() {
            Block::Value(Value::Integer(n)) => element.with_attribute("value", n.to_string()),
            Block::Value(Value::Float(f)) => element.with_attribute("value", f.to_string()),
            Block::Value(Value::Text(s)) => element.with_attribute("value", s.as_str()),
            Block::Object(o) => object_attributes(element, o),
            Block::Event(e) => element.with_attribute("hook", e.hook()),
            Block::Statement(s) => s.slots().fold(
                element.with_attribute("statement", s.id()),
                |el, slot| el.with_child(self.slot_to_element(SLOT_ELEMENT, slot)),
            ),
            Block::Control(c) => {
                let mut element = element
                    .with_child(self.slot_to_element(SLOT_ELEMENT, c.condition()))
                    .with_child(self.spine_to_element(BODY_ELEMENT, c.body()));
                if let Some(otherwise) = c.otherwise() {
                    element = element.with_child(self.spine_to_element(ELSE_ELEMENT, otherwise));
                }
                element
            }
            Block::Boolean(b) => b.operands().iter().fold(element, |el, slot| {
                el.with_child(self.slot_to_element(SLOT_ELEMENT, slot))
            }),
            Block::Trigger(Trigger::Event(t)) => element
                .with_child(self.slot_to_element(SLOT_ELEMENT, t.raiser()))
                .with_child(self.slot_to_element(SLOT_ELEMENT, t.event())),
            Block::Trigger(Trigger::Conversation(t)) => {
                let a = t.address();
                element
                    .with_attribute("conversation", a.conversation())
                    .with_attribute("line", a.line_id().to_string())
                    .with_attribute("attachedAs", a.attached_as().name())
            }
        }
    }

    pub fn slot_to_element(&self, name: &str, slot: &Slot) -> Element {
        match slot.contents() {
            Some(node) => Element::new(name).with_child(self.node_to_element(node)),
            None => Element::new(name),
        }
    }

    pub fn spine_to_element(&self, name: &str, spine: &Spine) -> Element {
        spine.iter().fold(Element::new(name), |el, node| {
            el.with_child(self.node_to_element(node))
        })
    }

    /// Build a node from its element using the registered builder.
    pub fn node_from_element(&self, element: &Element) -> Result<Node> {
        let build = self
            .builders
            .get(&element.name)
            .ok_or_else(|| SerialError::UnknownElement(element.name.clone()))?;
        build(element, self)
    }

    /// Contents of a slot-position element: `None` when it holds nothing or
    /// only a blank element.
    pub fn optional_child(&self, element: &Element) -> Result<Option<Node>> {
        element.expect_attributes(&[])?;
        match element.children.as_slice() {
            [] => Ok(None),
            [only] if only.is_blank() && builders::is_leaf(&only.name) => Ok(None),
            [only] => self.node_from_element(only).map(Some),
            [_, extra, ..] => Err(SerialError::UnexpectedElement {
                parent: element.name.clone(),
                found: extra.name.clone(),
            }),
        }
    }

    /// Fill `slot` from a slot-position element.
    pub fn read_slot(&self, element: &Element, slot: &mut Slot) -> Result<()> {
        if let Some(node) = self.optional_child(element)? {
            slot.assign(node)?;
        }
        Ok(())
    }

    pub fn read_spine(&self, element: &Element, spine: &mut Spine) -> Result<()> {
        element.expect_attributes(&[])?;
        for child in &element.children {
            spine.push(self.node_from_element(child)?)?;
        }
        Ok(())
    }

    pub fn node_to_xml(&self, node: &Node) -> Result<String> {
        write_document(&self.node_to_element(node))
    }

    pub fn node_from_xml(&self, xml: &str) -> Result<Node> {
        self.node_from_element(&parse_document(xml)?)
    }

    pub fn script_to_element(&self, script: &Script) -> Element {
        Element::new(SCRIPT_ELEMENT)
            .with_child(self.slot_to_element(TRIGGER_ELEMENT, script.trigger()))
            .with_child(self.spine_to_element(SPINE_ELEMENT, script.spine()))
    }

    pub fn script_from_element(&self, element: &Element) -> Result<Script> {
        if element.name != SCRIPT_ELEMENT {
            return Err(SerialError::Malformed(format!(
                "expected <{SCRIPT_ELEMENT}>, found <{}>",
                element.name
            )));
        }
        element.expect_attributes(&[])?;
        element.expect_children(&[TRIGGER_ELEMENT, SPINE_ELEMENT])?;
        let mut script = Script::new();
        if let Some(trigger) = element.unique_child(TRIGGER_ELEMENT)? {
            self.read_slot(trigger, script.trigger_mut())?;
        }
        if let Some(spine) = element.unique_child(SPINE_ELEMENT)? {
            self.read_spine(spine, script.spine_mut())?;
        }
        Ok(script)
    }

    pub fn script_to_xml(&self, script: &Script) -> Result<String> {
        write_document(&self.script_to_element(script))
    }

    pub fn script_from_xml(&self, xml: &str) -> Result<Script> {
        self.script_from_element(&parse_document(xml)?)
    }

    pub fn save_script(&self, script: &Script, path: &Path) -> Result<()> {
        std::fs::write(path, self.script_to_xml(script)?)?;
        debug!(path = %path.display(), "script saved");
        Ok(())
    }

    pub fn load_script(&self, path: &Path) -> Result<Script> {
        let xml = std::fs::read_to_string(path)?;
        let script = self.script_from_xml(&xml)?;
        debug!(path = %path.display(), "script loaded");
        Ok(script)
    }
}

fn object_attributes(element: Element, object: &ObjectRef) -> Element {
    let element = match object.kind {
        ObjectKind::Module => element.with_attribute("kind", "Module"),
        ObjectKind::Area => element.with_attribute("kind", "Area"),
        ObjectKind::Player => element.with_attribute("kind", "Player"),
        ObjectKind::Instance(t) => element
            .with_attribute("kind", "Instance")
            .with_attribute("type", t.name()),
        ObjectKind::Blueprint(t) => element
            .with_attribute("kind", "Blueprint")
            .with_attribute("type", t.name()),
    };
    let element = element
        .with_attribute("tag", object.tag.as_str())
        .with_attribute("name", object.display_name.as_str());
    match &object.area_tag {
        Some(area) => element.with_attribute("area", area.as_str()),
        None => element,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parse_builds_element_tree() {
        let root = parse_document(
            r#"<?xml version="1.0"?>
            <Script><Trigger/><Spine><If><Slot/><Body/></If></Spine></Script>"#,
        )
        .unwrap();
        assert_eq!(root.name, "Script");
        assert_eq!(root.children.len(), 2);
        assert!(root.child("Trigger").unwrap().is_blank());
        assert_eq!(root.child("Spine").unwrap().children[0].name, "If");
    }

    #[test]
    fn attributes_are_unescaped() {
        let root = parse_document(r#"<Text value="a &quot;b&quot; &amp; c"/>"#).unwrap();
        assert_eq!(root.attribute("value"), Some(r#"a "b" & c"#));
    }

    #[test]
    fn structural_errors_are_reported() {
        assert!(matches!(
            parse_document("<A/><B/>"),
            Err(SerialError::Malformed(_))
        ));
        assert!(matches!(
            parse_document("<A>text</A>"),
            Err(SerialError::Malformed(_))
        ));
        assert!(parse_document("").is_err());
    }

    #[test]
    fn write_then_parse_preserves_structure() {
        let element = Element::new("Action")
            .with_attribute("statement", "speak")
            .with_child(Element::new("Slot"))
            .with_child(
                Element::new("Slot")
                    .with_child(Element::new("Text").with_attribute("value", "<hello & bye>")),
            );
        let xml = write_document(&element).unwrap();
        assert!(xml.starts_with("<?xml"));
        assert_eq!(parse_document(&xml).unwrap(), element);
    }
}
