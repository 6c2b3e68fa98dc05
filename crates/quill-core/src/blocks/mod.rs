// Block composition model
// Every visual block is a `Node`: an identity plus one closed `Block` variant.
// Code and natural language are rendered from the same resolved children,
// selected by a `Channel`.

pub mod boolean;
pub mod control;
pub mod errors;
pub mod fitter;
pub mod script;
pub mod slot;
pub mod spine;
pub mod statement;
pub mod trigger;
pub mod value;


use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use boolean::{BooleanExpr, BooleanOp};
pub use control::{ControlKind, ControlStructure};
pub use errors::{CompositionError, Result};
pub use fitter::Fitter;
pub use script::{Script, ScriptSource, ADDRESS_MARKER};
pub use slot::Slot;
pub use spine::Spine;
pub use statement::{
    Behaviour, Component, LayoutPart, Statement, StatementDefinition, StatementKind,
    TemplateBehaviour,
};
pub use trigger::{ConversationTrigger, EventTrigger, Trigger};
pub use value::{EventRef, InstanceType, ObjectKind, ObjectRef, Value};

use crate::address::ConversationAddress;
use crate::stats::ScriptStats;

/// Identity of a node. Deep copies receive fresh ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", &self.0.to_string()[..8])
    }
}

/// Flat discriminator over every concrete block kind.
///
/// Used as the XML element name, the key of the builder registry and the
/// key of [`ScriptStats`] counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    Integer,
    Float,
    Text,
    Object,
    Event,
    Action,
    Condition,
    If,
    IfElse,
    While,
    And,
    Or,
    Not,
    EventTrigger,
    ConversationTrigger,
}

impl NodeKind {
    pub const ALL: [NodeKind; 15] = [
        NodeKind::Integer,
        NodeKind::Float,
        NodeKind::Text,
        NodeKind::Object,
        NodeKind::Event,
        NodeKind::Action,
        NodeKind::Condition,
        NodeKind::If,
        NodeKind::IfElse,
        NodeKind::While,
        NodeKind::And,
        NodeKind::Or,
        NodeKind::Not,
        NodeKind::EventTrigger,
        NodeKind::ConversationTrigger,
    ];

    pub fn element_name(&self) -> &'static str {
        match self {
            NodeKind::Integer => "Integer",
            NodeKind::Float => "Float",
            NodeKind::Text => "Text",
            NodeKind::Object => "Object",
            NodeKind::Event => "Event",
            NodeKind::Action => "Action",
            NodeKind::Condition => "Condition",
            NodeKind::If => "If",
            NodeKind::IfElse => "IfElse",
            NodeKind::While => "While",
            NodeKind::And => "And",
            NodeKind::Or => "Or",
            NodeKind::Not => "Not",
            NodeKind::EventTrigger => "EventTrigger",
            NodeKind::ConversationTrigger => "ConversationTrigger",
        }
    }

    pub fn from_element_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.element_name() == name)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.element_name())
    }
}

/// Top level of the two-level tag fitters match against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Number,
    String,
    Module,
    Area,
    Player,
    Instance,
    Blueprint,
    Event,
    Action,
    Condition,
    Boolean,
    Control,
    Trigger,
}

/// Category plus optional subtype, e.g. `Instance`/`Creature`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTag {
    pub category: Category,
    pub subtype: Option<String>,
}

impl NodeTag {
    fn new(category: Category, subtype: Option<&str>) -> Self {
        Self {
            category,
            subtype: subtype.map(str::to_string),
        }
    }
}

/// Which of the two synchronized outputs to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Code,
    NaturalLanguage,
}

/// Rendering shared by every part of the tree.
pub trait Render {
    fn render(&self, channel: Channel) -> Result<String>;

    fn code(&self) -> Result<String> {
        self.render(Channel::Code)
    }

    fn natural_language(&self) -> Result<String> {
        self.render(Channel::NaturalLanguage)
    }
}

#[derive(Debug)]
pub enum Block {
    Value(Value),
    Object(ObjectRef),
    Event(EventRef),
    Statement(Statement),
    Control(ControlStructure),
    Boolean(BooleanExpr),
    Trigger(Trigger),
}

impl Block {
    fn deep_copy(&self) -> Block {
        match self {
            Block::Value(v) => Block::Value(v.clone()),
            Block::Object(o) => Block::Object(o.clone()),
            Block::Event(e) => Block::Event(e.clone()),
            Block::Statement(s) => Block::Statement(s.deep_copy()),
            Block::Control(c) => Block::Control(c.deep_copy()),
            Block::Boolean(b) => Block::Boolean(b.deep_copy()),
            Block::Trigger(t) => Block::Trigger(t.deep_copy()),
        }
    }
}

/// A single block in a script tree. A node has at most one owner: the slot
/// or spine holding it.
#[derive(Debug)]
pub struct Node {
    id: NodeId,
    block: Block,
}

impl Node {
    pub(crate) fn new(block: Block) -> Self {
        Self {
            id: NodeId::new(),
            block,
        }
    }

    pub fn integer(value: i64) -> Self {
        Self::new(Block::Value(Value::Integer(value)))
    }

    pub fn float(value: f64) -> Self {
        Self::new(Block::Value(Value::Float(value)))
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::new(Block::Value(Value::Text(value.into())))
    }

    pub fn object(object: ObjectRef) -> Self {
        Self::new(Block::Object(object))
    }

    /// An event block for a named script hook (`OnDeath`, ...).
    pub fn event(hook: &str) -> Result<Self> {
        Ok(Self::new(Block::Event(EventRef::new(hook)?)))
    }

    pub fn control(kind: ControlKind) -> Self {
        Self::new(Block::Control(ControlStructure::new(kind)))
    }

    pub fn if_block() -> Self {
        Self::control(ControlKind::If)
    }

    pub fn if_else_block() -> Self {
        Self::control(ControlKind::IfElse)
    }

    pub fn while_block() -> Self {
        Self::control(ControlKind::While)
    }

    pub fn and(operands: usize) -> Result<Self> {
        Ok(Self::new(Block::Boolean(BooleanExpr::and(operands)?)))
    }

    pub fn or(operands: usize) -> Result<Self> {
        Ok(Self::new(Block::Boolean(BooleanExpr::or(operands)?)))
    }

    pub fn not() -> Self {
        Self::new(Block::Boolean(BooleanExpr::not()))
    }

    pub fn event_trigger() -> Self {
        Self::new(Block::Trigger(Trigger::Event(EventTrigger::new())))
    }

    pub fn conversation_trigger(address: ConversationAddress) -> Self {
        Self::new(Block::Trigger(Trigger::Conversation(ConversationTrigger::new(
            address,
        ))))
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn block(&self) -> &Block {
        &self.block
    }

    pub fn block_mut(&mut self) -> &mut Block {
        &mut self.block
    }

    pub fn kind(&self) -> NodeKind {
        match &self.block {
            Block::Value(Value::Integer(_)) => NodeKind::Integer,
            Block::Value(Value::Float(_)) => NodeKind::Float,
            Block::Value(Value::Text(_)) => NodeKind::Text,
            Block::Object(_) => NodeKind::Object,
            Block::Event(_) => NodeKind::Event,
            Block::Statement(s) => match s.kind() {
                StatementKind::Action => NodeKind::Action,
                StatementKind::Condition => NodeKind::Condition,
            },
            Block::Control(c) => match c.kind() {
                ControlKind::If => NodeKind::If,
                ControlKind::IfElse => NodeKind::IfElse,
                ControlKind::While => NodeKind::While,
            },
            Block::Boolean(b) => match b.op() {
                BooleanOp::And => NodeKind::And,
                BooleanOp::Or => NodeKind::Or,
                BooleanOp::Not => NodeKind::Not,
            },
            Block::Trigger(Trigger::Event(_)) => NodeKind::EventTrigger,
            Block::Trigger(Trigger::Conversation(_)) => NodeKind::ConversationTrigger,
        }
    }

    pub fn tag(&self) -> NodeTag {
        match &self.block {
            Block::Value(Value::Integer(_)) => NodeTag::new(Category::Number, Some("Integer")),
            Block::Value(Value::Float(_)) => NodeTag::new(Category::Number, Some("Float")),
            Block::Value(Value::Text(_)) => NodeTag::new(Category::String, None),
            Block::Object(o) => match o.kind {
                ObjectKind::Module => NodeTag::new(Category::Module, None),
                ObjectKind::Area => NodeTag::new(Category::Area, None),
                ObjectKind::Player => NodeTag::new(Category::Player, None),
                ObjectKind::Instance(t) => NodeTag::new(Category::Instance, Some(t.name())),
                ObjectKind::Blueprint(t) => NodeTag::new(Category::Blueprint, Some(t.name())),
            },
            Block::Event(e) => NodeTag::new(Category::Event, Some(e.hook())),
            Block::Statement(s) => {
                let category = match s.kind() {
                    StatementKind::Action => Category::Action,
                    StatementKind::Condition => Category::Condition,
                };
                NodeTag::new(category, Some(s.id()))
            }
            Block::Control(c) => NodeTag::new(Category::Control, Some(c.kind().name())),
            Block::Boolean(b) => NodeTag::new(Category::Boolean, Some(b.op().name())),
            Block::Trigger(Trigger::Event(_)) => NodeTag::new(Category::Trigger, Some("Event")),
            Block::Trigger(Trigger::Conversation(_)) => {
                NodeTag::new(Category::Trigger, Some("Conversation"))
            }
        }
    }

    pub fn as_statement(&self) -> Option<&Statement> {
        match &self.block {
            Block::Statement(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_statement_mut(&mut self) -> Option<&mut Statement> {
        match &mut self.block {
            Block::Statement(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_control(&self) -> Option<&ControlStructure> {
        match &self.block {
            Block::Control(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_control_mut(&mut self) -> Option<&mut ControlStructure> {
        match &mut self.block {
            Block::Control(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_boolean_mut(&mut self) -> Option<&mut BooleanExpr> {
        match &mut self.block {
            Block::Boolean(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_trigger(&self) -> Option<&Trigger> {
        match &self.block {
            Block::Trigger(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_trigger_mut(&mut self) -> Option<&mut Trigger> {
        match &mut self.block {
            Block::Trigger(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match &self.block {
            Block::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Recursive AND over every required child.
    pub fn is_complete(&self) -> bool {
        match &self.block {
            Block::Value(_) | Block::Object(_) | Block::Event(_) => true,
            Block::Statement(s) => s.is_complete(),
            Block::Control(c) => c.is_complete(),
            Block::Boolean(b) => b.is_complete(),
            Block::Trigger(t) => t.is_complete(),
        }
    }

    /// Structural clone sharing no mutable state with `self`.
    pub fn deep_copy(&self) -> Node {
        Node {
            id: NodeId::new(),
            block: self.block.deep_copy(),
        }
    }

    pub fn statistics(&self) -> ScriptStats {
        let mut stats = ScriptStats::new();
        stats.record(self);
        stats
    }

    /// Slots directly owned by this node, in layout order.
    pub fn slots(&self) -> Vec<&Slot> {
        match &self.block {
            Block::Statement(s) => s.slots().collect(),
            Block::Control(c) => vec![c.condition()],
            Block::Boolean(b) => b.operands().iter().collect(),
            Block::Trigger(Trigger::Event(t)) => vec![t.raiser(), t.event()],
            _ => Vec::new(),
        }
    }

    pub fn slots_mut(&mut self) -> Vec<&mut Slot> {
        match &mut self.block {
            Block::Statement(s) => s.slots_mut().collect(),
            Block::Control(c) => vec![c.condition_mut()],
            Block::Boolean(b) => b.operands_mut().iter_mut().collect(),
            Block::Trigger(Trigger::Event(t)) => {
                let (raiser, event) = t.slots_mut();
                vec![raiser, event]
            }
            _ => Vec::new(),
        }
    }

    /// Nested bodies directly owned by this node.
    pub fn spines(&self) -> Vec<&Spine> {
        match &self.block {
            Block::Control(c) => c.spines(),
            _ => Vec::new(),
        }
    }

    pub fn spines_mut(&mut self) -> Vec<&mut Spine> {
        match &mut self.block {
            Block::Control(c) => c.spines_mut(),
            _ => Vec::new(),
        }
    }

    /// Pre-order walk over this node and every descendant.
    pub fn for_each_node(&self, f: &mut dyn FnMut(&Node)) {
        f(self);
        for slot in self.slots() {
            if let Some(child) = slot.contents() {
                child.for_each_node(f);
            }
        }
        for spine in self.spines() {
            for child in spine.iter() {
                child.for_each_node(f);
            }
        }
    }

    pub fn for_each_object_mut(&mut self, f: &mut dyn FnMut(&mut ObjectRef)) {
        if let Block::Object(o) = &mut self.block {
            f(o);
        }
        for slot in self.slots_mut() {
            if let Some(child) = slot.contents_mut() {
                child.for_each_object_mut(f);
            }
        }
        for spine in self.spines_mut() {
            for child in spine.iter_mut() {
                child.for_each_object_mut(f);
            }
        }
    }

    pub fn find(&self, id: NodeId) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        for slot in self.slots() {
            if let Some(found) = slot.contents().and_then(|c| c.find(id)) {
                return Some(found);
            }
        }
        self.spines()
            .into_iter()
            .find_map(|spine| spine.iter().find_map(|c| c.find(id)))
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if self.id == id {
            return Some(self);
        }
        let in_slots = self
            .slots()
            .iter()
            .any(|s| s.contents().is_some_and(|c| c.contains(id)));
        if in_slots {
            self.slots_mut()
                .into_iter()
                .filter_map(Slot::contents_mut)
                .find_map(|c| c.find_mut(id))
        } else {
            self.spines_mut()
                .into_iter()
                .flat_map(|s| s.iter_mut())
                .find_map(|c| c.find_mut(id))
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.find(id).is_some()
    }

    /// Detach a descendant from whichever slot or spine holds it.
    pub fn take_descendant(&mut self, id: NodeId) -> Option<Node> {
        for slot in self.slots_mut() {
            if slot.contents().map(Node::id) == Some(id) {
                return slot.take();
            }
            if let Some(found) = slot.contents_mut().and_then(|c| c.take_descendant(id)) {
                return Some(found);
            }
        }
        self.spines_mut()
            .into_iter()
            .find_map(|spine| spine.take_descendant(id))
    }

    /// Empty every slot below this node whose contents match `predicate`,
    /// returning the removed nodes.
    pub fn clear_slots_where(&mut self, predicate: &dyn Fn(&Node) -> bool) -> Vec<Node> {
        let mut removed = Vec::new();
        for slot in self.slots_mut() {
            if slot.contents().is_some_and(predicate) {
                removed.extend(slot.take());
            } else if let Some(child) = slot.contents_mut() {
                removed.extend(child.clear_slots_where(predicate));
            }
        }
        for spine in self.spines_mut() {
            for child in spine.iter_mut() {
                removed.extend(child.clear_slots_where(predicate));
            }
        }
        removed
    }
}

impl Render for Node {
    fn render(&self, channel: Channel) -> Result<String> {
        match &self.block {
            Block::Value(v) => v.render(channel),
            Block::Object(o) => o.render(channel),
            Block::Event(e) => e.render(channel),
            Block::Statement(s) => s.render(channel),
            Block::Control(c) => c.render(channel),
            Block::Boolean(b) => b.render(channel),
            Block::Trigger(t) => t.render(channel),
        }
    }
}

/// Indent every non-empty line of a nested body.
pub(crate) fn indent(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("    {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
