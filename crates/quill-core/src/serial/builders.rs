//! Element-name → node-builder registry.

use indexmap::IndexMap;
use uuid::Uuid;

use super::{Element, Result, SerialError, XmlCodec, BODY_ELEMENT, ELSE_ELEMENT, SLOT_ELEMENT};
use crate::address::{AttachedAs, ConversationAddress};
use crate::blocks::{
    BooleanExpr, Block, ControlKind, EventTrigger, InstanceType, Node, NodeKind, ObjectRef,
    StatementKind, Trigger,
};

/// Builds a node from its element; recursion goes back through the codec.
pub type BuildFn = fn(&Element, &XmlCodec<'_>) -> Result<Node>;

/// Leaf elements whose blank form stands for an unset slot.
pub(crate) fn is_leaf(name: &str) -> bool {
    matches!(
        NodeKind::from_element_name(name),
        Some(
            NodeKind::Integer
                | NodeKind::Float
                | NodeKind::Text
                | NodeKind::Object
                | NodeKind::Event
                | NodeKind::Action
                | NodeKind::Condition
                | NodeKind::ConversationTrigger
        )
    )
}

#[derive(Clone)]
pub struct BuilderRegistry {
    builders: IndexMap<String, BuildFn>,
}

impl std::fmt::Debug for BuilderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuilderRegistry")
            .field("elements", &self.builders.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for BuilderRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl BuilderRegistry {
    pub fn empty() -> Self {
        Self {
            builders: IndexMap::new(),
        }
    }

    /// One builder per [`NodeKind`].
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        for kind in NodeKind::ALL {
            let build: BuildFn = match kind {
                NodeKind::Integer => build_integer,
                NodeKind::Float => build_float,
                NodeKind::Text => build_text,
                NodeKind::Object => build_object,
                NodeKind::Event => build_event,
                NodeKind::Action => build_action,
                NodeKind::Condition => build_condition,
                NodeKind::If => build_if,
                NodeKind::IfElse => build_if_else,
                NodeKind::While => build_while,
                NodeKind::And => build_and,
                NodeKind::Or => build_or,
                NodeKind::Not => build_not,
                NodeKind::EventTrigger => build_event_trigger,
                NodeKind::ConversationTrigger => build_conversation_trigger,
            };
            registry.register(kind.element_name(), build);
        }
        registry
    }

    /// Register or replace the builder for an element name.
    pub fn register(&mut self, element: &str, build: BuildFn) -> Option<BuildFn> {
        self.builders.insert(element.to_string(), build)
    }

    pub fn get(&self, element: &str) -> Option<BuildFn> {
        self.builders.get(element).copied()
    }

    pub fn elements(&self) -> impl Iterator<Item = &str> {
        self.builders.keys().map(String::as_str)
    }
}

fn parse_value<T: std::str::FromStr>(element: &Element) -> Result<T> {
    let raw = element.require("value")?;
    raw.parse().map_err(|_| element.invalid("value", raw))
}

/// Leaf shape: no children, only the listed attributes.
fn expect_leaf_shape(element: &Element, attributes: &[&str]) -> Result<()> {
    element.expect_leaf()?;
    element.expect_attributes(attributes)
}

fn build_integer(element: &Element, _: &XmlCodec<'_>) -> Result<Node> {
    expect_leaf_shape(element, &["value"])?;
    Ok(Node::integer(parse_value(element)?))
}

fn build_float(element: &Element, _: &XmlCodec<'_>) -> Result<Node> {
    expect_leaf_shape(element, &["value"])?;
    Ok(Node::float(parse_value(element)?))
}

fn build_text(element: &Element, _: &XmlCodec<'_>) -> Result<Node> {
    expect_leaf_shape(element, &["value"])?;
    Ok(Node::text(element.require("value")?))
}

fn build_object(element: &Element, _: &XmlCodec<'_>) -> Result<Node> {
    let kind = element.require("kind")?;
    let attributes: &[&str] = match kind {
        "Instance" => &["kind", "type", "tag", "name", "area"],
        "Blueprint" => &["kind", "type", "tag", "name"],
        _ => &["kind", "tag", "name"],
    };
    expect_leaf_shape(element, attributes)?;
    let tag = element.require("tag")?;
    let name = element.attribute("name").unwrap_or(tag);
    let instance_type = || -> Result<InstanceType> {
        let raw = element.require("type")?;
        InstanceType::from_name(raw).ok_or_else(|| element.invalid("type", raw))
    };

    let object = match kind {
        "Module" => ObjectRef::module(),
        "Player" => ObjectRef::player(),
        "Area" => ObjectRef::area(tag, name),
        "Instance" => ObjectRef::instance(instance_type()?, tag, name, element.require("area")?),
        "Blueprint" => ObjectRef::blueprint(instance_type()?, tag, name),
        other => return Err(element.invalid("kind", other)),
    };
    Ok(Node::object(object))
}

fn build_event(element: &Element, _: &XmlCodec<'_>) -> Result<Node> {
    expect_leaf_shape(element, &["hook"])?;
    Ok(Node::event(element.require("hook")?)?)
}

fn build_statement(element: &Element, codec: &XmlCodec<'_>, kind: StatementKind) -> Result<Node> {
    let id = element.require("statement")?;
    let mut node = codec.library().create(id)?;
    element.expect_attributes(&["statement"])?;
    element.expect_children(&[SLOT_ELEMENT])?;

    let statement = match node.block_mut() {
        Block::Statement(s) if s.kind() == kind => s,
        _ => return Err(element.invalid("statement", id)),
    };
    if element.children.len() != statement.parameter_count() {
        return Err(SerialError::Malformed(format!(
            "statement '{id}' takes {} slots, found {}",
            statement.parameter_count(),
            element.children.len()
        )));
    }
    for (slot_element, slot) in element.children.iter().zip(statement.slots_mut()) {
        codec.read_slot(slot_element, slot)?;
    }
    Ok(node)
}

fn build_action(element: &Element, codec: &XmlCodec<'_>) -> Result<Node> {
    build_statement(element, codec, StatementKind::Action)
}

fn build_condition(element: &Element, codec: &XmlCodec<'_>) -> Result<Node> {
    build_statement(element, codec, StatementKind::Condition)
}

fn build_control(element: &Element, codec: &XmlCodec<'_>, kind: ControlKind) -> Result<Node> {
    let allowed: &[&str] = match kind {
        ControlKind::IfElse => &[SLOT_ELEMENT, BODY_ELEMENT, ELSE_ELEMENT],
        _ => &[SLOT_ELEMENT, BODY_ELEMENT],
    };
    element.expect_attributes(&[])?;
    element.expect_children(allowed)?;
    let condition = element.unique_child(SLOT_ELEMENT)?;
    let body = element.unique_child(BODY_ELEMENT)?;
    let otherwise = element.unique_child(ELSE_ELEMENT)?;

    let mut node = Node::control(kind);
    if let Block::Control(control) = node.block_mut() {
        if let Some(condition) = condition {
            codec.read_slot(condition, control.condition_mut())?;
        }
        if let Some(body) = body {
            codec.read_spine(body, control.body_mut())?;
        }
        if let (Some(otherwise), Some(spine)) = (otherwise, control.otherwise_mut()) {
            codec.read_spine(otherwise, spine)?;
        }
    }
    Ok(node)
}

fn build_if(element: &Element, codec: &XmlCodec<'_>) -> Result<Node> {
    build_control(element, codec, ControlKind::If)
}

fn build_if_else(element: &Element, codec: &XmlCodec<'_>) -> Result<Node> {
    build_control(element, codec, ControlKind::IfElse)
}

fn build_while(element: &Element, codec: &XmlCodec<'_>) -> Result<Node> {
    build_control(element, codec, ControlKind::While)
}

fn fill_operands(element: &Element, codec: &XmlCodec<'_>, expr: BooleanExpr) -> Result<Node> {
    element.expect_attributes(&[])?;
    element.expect_children(&[SLOT_ELEMENT])?;
    let mut node = Node::new(Block::Boolean(expr));
    if let Some(expr) = node.as_boolean_mut() {
        for (slot_element, slot) in element.children.iter().zip(expr.operands_mut()) {
            codec.read_slot(slot_element, slot)?;
        }
    }
    Ok(node)
}

/// A blank `<And/>` or `<Or/>` gets the minimum two empty operands.
fn operand_count(element: &Element) -> usize {
    match element.children.len() {
        0 => 2,
        n => n,
    }
}

fn build_and(element: &Element, codec: &XmlCodec<'_>) -> Result<Node> {
    fill_operands(element, codec, BooleanExpr::and(operand_count(element))?)
}

fn build_or(element: &Element, codec: &XmlCodec<'_>) -> Result<Node> {
    fill_operands(element, codec, BooleanExpr::or(operand_count(element))?)
}

fn build_not(element: &Element, codec: &XmlCodec<'_>) -> Result<Node> {
    if element.children.len() > 1 {
        return Err(SerialError::Malformed(format!(
            "<Not> takes one operand, found {}",
            element.children.len()
        )));
    }
    fill_operands(element, codec, BooleanExpr::not())
}

fn build_event_trigger(element: &Element, codec: &XmlCodec<'_>) -> Result<Node> {
    element.expect_attributes(&[])?;
    element.expect_children(&[SLOT_ELEMENT])?;
    if element.children.len() > 2 {
        return Err(SerialError::Malformed(
            "<EventTrigger> takes an object slot and an event slot".to_string(),
        ));
    }
    let mut trigger = EventTrigger::new();
    let (raiser, event) = trigger.slots_mut();
    if let Some(slot) = element.children.first() {
        codec.read_slot(slot, raiser)?;
    }
    if let Some(slot) = element.children.get(1) {
        codec.read_slot(slot, event)?;
    }
    Ok(Node::new(Block::Trigger(Trigger::Event(trigger))))
}

fn build_conversation_trigger(element: &Element, _: &XmlCodec<'_>) -> Result<Node> {
    expect_leaf_shape(element, &["conversation", "line", "attachedAs"])?;
    let conversation = element.require("conversation")?;
    let line = element.require("line")?;
    let line_id = Uuid::parse_str(line).map_err(|_| element.invalid("line", line))?;
    let attached = element.attribute("attachedAs").unwrap_or("Standard");
    let attached_as =
        AttachedAs::from_name(attached).ok_or_else(|| element.invalid("attachedAs", attached))?;
    Ok(Node::conversation_trigger(ConversationAddress::new(
        conversation,
        line_id,
        attached_as,
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::Library;

    #[test]
    fn standard_registry_covers_every_kind() {
        let registry = BuilderRegistry::standard();
        for kind in NodeKind::ALL {
            assert!(registry.get(kind.element_name()).is_some(), "{kind}");
        }
        assert!(registry.get("OrBlock").is_none());
    }

    #[test]
    fn custom_builders_can_replace_standard_ones() {
        fn always_seven(_: &Element, _: &XmlCodec<'_>) -> Result<Node> {
            Ok(Node::integer(7))
        }
        let library = Library::standard().unwrap();
        let mut registry = BuilderRegistry::standard();
        assert!(registry.register("Integer", always_seven).is_some());
        let codec = XmlCodec::with_builders(&library, registry);
        let node = codec.node_from_xml(r#"<Integer value="1"/>"#).unwrap();
        assert!(matches!(
            node.block(),
            Block::Value(crate::blocks::Value::Integer(7))
        ));
    }

    #[test]
    fn statement_element_must_match_kind() {
        let library = Library::standard().unwrap();
        let codec = XmlCodec::new(&library);
        let err = codec
            .node_from_xml(r#"<Condition statement="give-gold"><Slot/><Slot/></Condition>"#)
            .unwrap_err();
        assert!(matches!(err, SerialError::InvalidAttribute { .. }));
    }

    #[test]
    fn blank_leaf_in_slot_means_unset() {
        let library = Library::standard().unwrap();
        let codec = XmlCodec::new(&library);
        let node = codec
            .node_from_xml(r#"<Action statement="give-gold"><Slot><Integer/></Slot><Slot/></Action>"#)
            .unwrap();
        assert!(node.slots().iter().all(|s| s.is_empty()));
    }

    #[test]
    fn bad_values_are_format_errors() {
        let library = Library::standard().unwrap();
        let codec = XmlCodec::new(&library);
        assert!(matches!(
            codec.node_from_xml(r#"<Integer value="five"/>"#),
            Err(SerialError::InvalidAttribute { .. })
        ));
        assert!(matches!(
            codec.node_from_xml(r#"<Object kind="Instance" type="Dragon" tag="x" area="a"/>"#),
            Err(SerialError::InvalidAttribute { .. })
        ));
        assert!(matches!(
            codec.node_from_xml(r#"<If><Slot/><Else/></If>"#),
            Err(SerialError::UnexpectedElement { .. })
        ));
        assert!(matches!(
            codec.node_from_xml(r#"<Event hook="OnTeaTime"/>"#),
            Err(SerialError::Composition(_))
        ));
    }

    #[test]
    fn leaves_reject_stray_attributes_and_children() {
        let library = Library::standard().unwrap();
        let codec = XmlCodec::new(&library);
        assert!(matches!(
            codec.node_from_xml(r#"<Integer value="1" bogus="x"/>"#),
            Err(SerialError::UnexpectedAttribute { .. })
        ));
        assert!(matches!(
            codec.node_from_xml(r#"<Integer value="1"><Slot/><Whatever/></Integer>"#),
            Err(SerialError::UnexpectedElement { .. })
        ));
        assert!(matches!(
            codec.node_from_xml(r#"<Event hook="OnDeath" extra="1"/>"#),
            Err(SerialError::UnexpectedAttribute { .. })
        ));
        assert!(matches!(
            codec.node_from_xml(r#"<Object kind="Player" tag="player" area="forest"/>"#),
            Err(SerialError::UnexpectedAttribute { .. })
        ));
        assert!(matches!(
            codec.node_from_xml(r#"<Text value="hi"><Integer value="1"/></Text>"#),
            Err(SerialError::UnexpectedElement { .. })
        ));
    }

    #[test]
    fn composites_reject_duplicates_and_attributes() {
        let library = Library::standard().unwrap();
        let codec = XmlCodec::new(&library);
        assert!(matches!(
            codec.node_from_xml(
                r#"<If><Slot/><Slot><Integer value="3"/></Slot><Body/><Body><Unknown/></Body></If>"#
            ),
            Err(SerialError::DuplicateElement { .. })
        ));
        assert!(matches!(
            codec.node_from_xml(r#"<IfElse><Slot/><Body/><Else/><Else/></IfElse>"#),
            Err(SerialError::DuplicateElement { .. })
        ));
        assert!(matches!(
            codec.node_from_xml(r#"<While loop="forever"><Slot/><Body/></While>"#),
            Err(SerialError::UnexpectedAttribute { .. })
        ));
        assert!(matches!(
            codec.node_from_xml(r#"<And op="and"><Slot/><Slot/></And>"#),
            Err(SerialError::UnexpectedAttribute { .. })
        ));
        assert!(matches!(
            codec.node_from_xml(r#"<Action statement="kill" async="yes"><Slot/></Action>"#),
            Err(SerialError::UnexpectedAttribute { .. })
        ));
        assert!(matches!(
            codec.node_from_xml(r#"<Action statement="kill"><Slot name="victim"/></Action>"#),
            Err(SerialError::UnexpectedAttribute { .. })
        ));
        assert!(matches!(
            codec.script_from_xml(r#"<Script><Trigger/><Spine/><Spine/></Script>"#),
            Err(SerialError::DuplicateElement { .. })
        ));
    }
}
