//! Statements: blocks with a fixed layout of labels and typed slots whose
//! output comes from a pluggable [`Behaviour`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Channel, CompositionError, Fitter, Node, Render, Result, Slot};

/// Strategy turning resolved slot values into code and natural language.
///
/// Both methods receive arguments in slot order and must reject an argument
/// list whose length differs from [`Behaviour::parameter_count`].
pub trait Behaviour: fmt::Debug + Send + Sync {
    fn id(&self) -> &str;

    fn parameter_count(&self) -> usize;

    /// The action may be started without waiting for it to finish. Does not
    /// change the generated text; translators use it for sequencing.
    fn is_asynchronous(&self) -> bool {
        false
    }

    fn code(&self, args: &[String]) -> Result<String>;

    fn natural_language(&self, args: &[String]) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Arg(usize),
}

/// Behaviour defined by two templates with `{0}`, `{1}`, ... placeholders.
/// `{{` and `}}` stand for literal braces.
#[derive(Debug, Clone)]
pub struct TemplateBehaviour {
    id: String,
    parameter_count: usize,
    asynchronous: bool,
    code: Vec<Piece>,
    natural_language: Vec<Piece>,
}

impl TemplateBehaviour {
    pub fn new(
        id: impl Into<String>,
        parameter_count: usize,
        code: &str,
        natural_language: &str,
    ) -> Result<Self> {
        let id = id.into();
        let code = parse_template(&id, code, parameter_count)?;
        let natural_language = parse_template(&id, natural_language, parameter_count)?;
        Ok(Self {
            id,
            parameter_count,
            asynchronous: false,
            code,
            natural_language,
        })
    }

    pub fn asynchronous(mut self) -> Self {
        self.asynchronous = true;
        self
    }

    fn fill(&self, pieces: &[Piece], args: &[String]) -> Result<String> {
        if args.len() != self.parameter_count {
            return Err(CompositionError::argument_count(
                &self.id,
                self.parameter_count,
                args.len(),
            ));
        }
        let mut out = String::new();
        for piece in pieces {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Arg(i) => out.push_str(&args[*i]),
            }
        }
        Ok(out)
    }
}

fn parse_template(behaviour: &str, template: &str, parameter_count: usize) -> Result<Vec<Piece>> {
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let mut digits = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(d) if d.is_ascii_digit() => digits.push(d),
                        Some(other) => {
                            return Err(CompositionError::malformed_template(
                                behaviour,
                                format!("unexpected '{other}' in placeholder"),
                            ))
                        }
                        None => {
                            return Err(CompositionError::malformed_template(
                                behaviour,
                                "unterminated placeholder",
                            ))
                        }
                    }
                }
                let index: usize = digits.parse().map_err(|_| {
                    CompositionError::malformed_template(behaviour, "empty placeholder")
                })?;
                if index >= parameter_count {
                    return Err(CompositionError::malformed_template(
                        behaviour,
                        format!("placeholder {{{index}}} but only {parameter_count} parameters"),
                    ));
                }
                if !literal.is_empty() {
                    pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                }
                pieces.push(Piece::Arg(index));
            }
            '}' => {
                return Err(CompositionError::malformed_template(
                    behaviour,
                    "unmatched '}'",
                ))
            }
            other => literal.push(other),
        }
    }
    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    Ok(pieces)
}

impl Behaviour for TemplateBehaviour {
    fn id(&self) -> &str {
        &self.id
    }

    fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    fn is_asynchronous(&self) -> bool {
        self.asynchronous
    }

    fn code(&self, args: &[String]) -> Result<String> {
        self.fill(&self.code, args)
    }

    fn natural_language(&self, args: &[String]) -> Result<String> {
        self.fill(&self.natural_language, args)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementKind {
    /// Does something; lives in a spine
    Action,
    /// Tests something; lives in a condition slot
    Condition,
}

#[derive(Debug, Clone)]
pub enum LayoutPart {
    Label(String),
    Parameter(Fitter),
}

impl LayoutPart {
    pub fn label(text: impl Into<String>) -> Self {
        LayoutPart::Label(text.into())
    }
}

/// Shared, immutable description of a statement type.
#[derive(Debug)]
pub struct StatementDefinition {
    id: String,
    kind: StatementKind,
    layout: Vec<LayoutPart>,
    behaviour: Arc<dyn Behaviour>,
}

impl StatementDefinition {
    pub fn new(
        id: impl Into<String>,
        kind: StatementKind,
        layout: Vec<LayoutPart>,
        behaviour: Arc<dyn Behaviour>,
    ) -> Result<Self> {
        let id = id.into();
        let slots = layout
            .iter()
            .filter(|p| matches!(p, LayoutPart::Parameter(_)))
            .count();
        if slots != behaviour.parameter_count() {
            return Err(CompositionError::LayoutMismatch {
                statement: id,
                slots,
                parameters: behaviour.parameter_count(),
            });
        }
        Ok(Self {
            id,
            kind,
            layout,
            behaviour,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn layout(&self) -> &[LayoutPart] {
        &self.layout
    }

    pub fn behaviour(&self) -> &dyn Behaviour {
        self.behaviour.as_ref()
    }

    pub fn parameter_count(&self) -> usize {
        self.behaviour.parameter_count()
    }

    pub fn is_asynchronous(&self) -> bool {
        self.behaviour.is_asynchronous()
    }

    /// Layout as the block reads: `give [number] gold to [creature or player]`.
    pub fn signature(&self) -> String {
        self.layout
            .iter()
            .map(|part| match part {
                LayoutPart::Label(text) => text.clone(),
                LayoutPart::Parameter(fitter) => format!("[{}]", fitter.describe()),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug)]
pub enum Component {
    Label(String),
    Slot(Slot),
}

#[derive(Debug)]
pub struct Statement {
    definition: Arc<StatementDefinition>,
    components: Vec<Component>,
}

impl Statement {
    pub(crate) fn instantiate(definition: Arc<StatementDefinition>) -> Self {
        let components = definition
            .layout()
            .iter()
            .map(|part| match part {
                LayoutPart::Label(text) => Component::Label(text.clone()),
                LayoutPart::Parameter(fitter) => Component::Slot(Slot::new(fitter.clone())),
            })
            .collect();
        Self {
            definition,
            components,
        }
    }

    pub fn definition(&self) -> &Arc<StatementDefinition> {
        &self.definition
    }

    pub fn id(&self) -> &str {
        self.definition.id()
    }

    pub fn kind(&self) -> StatementKind {
        self.definition.kind()
    }

    pub fn is_asynchronous(&self) -> bool {
        self.definition.is_asynchronous()
    }

    pub fn parameter_count(&self) -> usize {
        self.definition.parameter_count()
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn slots(&self) -> impl Iterator<Item = &Slot> {
        self.components.iter().filter_map(|c| match c {
            Component::Slot(slot) => Some(slot),
            Component::Label(_) => None,
        })
    }

    pub fn slots_mut(&mut self) -> impl Iterator<Item = &mut Slot> {
        self.components.iter_mut().filter_map(|c| match c {
            Component::Slot(slot) => Some(slot),
            Component::Label(_) => None,
        })
    }

    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots().nth(index)
    }

    pub fn slot_mut(&mut self, index: usize) -> Option<&mut Slot> {
        self.slots_mut().nth(index)
    }

    /// Assign `node` to the `index`th slot (labels are not counted).
    pub fn fill(&mut self, index: usize, node: Node) -> Result<Option<Node>> {
        let statement = self.id().to_string();
        self.slot_mut(index)
            .ok_or(CompositionError::NoSuchSlot { statement, index })?
            .assign(node)
    }

    pub fn is_complete(&self) -> bool {
        self.slots().all(Slot::is_complete_deep)
    }

    pub fn deep_copy(&self) -> Statement {
        Statement {
            definition: Arc::clone(&self.definition),
            components: self
                .components
                .iter()
                .map(|c| match c {
                    Component::Label(text) => Component::Label(text.clone()),
                    Component::Slot(slot) => Component::Slot(slot.deep_copy()),
                })
                .collect(),
        }
    }
}

impl Render for Statement {
    fn render(&self, channel: Channel) -> Result<String> {
        let args = self
            .slots()
            .map(|slot| slot.render(channel))
            .collect::<Result<Vec<_>>>()?;
        let behaviour = self.definition.behaviour();
        match channel {
            Channel::Code => behaviour.code(&args),
            Channel::NaturalLanguage => behaviour.natural_language(&args),
        }
    }
}
