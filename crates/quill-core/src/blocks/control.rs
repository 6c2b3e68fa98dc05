use serde::{Deserialize, Serialize};

use super::{indent, Channel, Fitter, Render, Result, Slot, Spine};

/// Fallback wording for an empty `else` branch.
const EMPTY_ELSE: &str = "something else happens";
/// Fallback wording for an empty `then` body.
const EMPTY_BODY: &str = "something happens";
/// Fallback wording for an unset condition.
const UNSET_CONDITION: &str = "some condition is true";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlKind {
    If,
    IfElse,
    While,
}

impl ControlKind {
    pub fn name(&self) -> &'static str {
        match self {
            ControlKind::If => "If",
            ControlKind::IfElse => "IfElse",
            ControlKind::While => "While",
        }
    }
}

/// A condition slot guarding one body, or two for `IfElse`.
#[derive(Debug)]
pub struct ControlStructure {
    kind: ControlKind,
    condition: Slot,
    body: Spine,
    otherwise: Option<Spine>,
}

impl ControlStructure {
    pub fn new(kind: ControlKind) -> Self {
        Self {
            kind,
            condition: Slot::new(Fitter::BooleanExpressions),
            body: Spine::new(),
            otherwise: match kind {
                ControlKind::IfElse => Some(Spine::new()),
                _ => None,
            },
        }
    }

    pub fn kind(&self) -> ControlKind {
        self.kind
    }

    pub fn condition(&self) -> &Slot {
        &self.condition
    }

    pub fn condition_mut(&mut self) -> &mut Slot {
        &mut self.condition
    }

    pub fn body(&self) -> &Spine {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Spine {
        &mut self.body
    }

    /// The `else` branch; only `IfElse` has one.
    pub fn otherwise(&self) -> Option<&Spine> {
        self.otherwise.as_ref()
    }

    pub fn otherwise_mut(&mut self) -> Option<&mut Spine> {
        self.otherwise.as_mut()
    }

    pub fn spines(&self) -> Vec<&Spine> {
        let mut spines = vec![&self.body];
        spines.extend(self.otherwise.as_ref());
        spines
    }

    pub fn spines_mut(&mut self) -> Vec<&mut Spine> {
        let mut spines = vec![&mut self.body];
        spines.extend(self.otherwise.as_mut());
        spines
    }

    /// Needs a complete condition; bodies may be empty but what they hold
    /// must be complete.
    pub fn is_complete(&self) -> bool {
        self.condition.is_complete_deep()
            && self.body.is_complete()
            && self.otherwise.as_ref().map_or(true, Spine::is_complete)
    }

    pub fn deep_copy(&self) -> ControlStructure {
        ControlStructure {
            kind: self.kind,
            condition: self.condition.deep_copy(),
            body: self.body.deep_copy(),
            otherwise: self.otherwise.as_ref().map(Spine::deep_copy),
        }
    }

    fn render_code(&self) -> Result<String> {
        let condition = self.condition.code()?;
        let keyword = match self.kind {
            ControlKind::While => "while",
            ControlKind::If | ControlKind::IfElse => "if",
        };
        let mut out = format!("{keyword} ({condition}) {}", code_block(&self.body)?);
        if let Some(otherwise) = &self.otherwise {
            out.push_str(" else ");
            out.push_str(&code_block(otherwise)?);
        }
        Ok(out)
    }

    fn render_natural_language(&self) -> Result<String> {
        let condition = match self.condition.contents() {
            Some(node) => node.natural_language()?,
            None => UNSET_CONDITION.to_string(),
        };
        let body = phrase_or(&self.body, EMPTY_BODY)?;
        Ok(match (&self.kind, &self.otherwise) {
            (ControlKind::While, _) => format!("while {condition}, {body}"),
            (_, Some(otherwise)) => format!(
                "if {condition}, then {body}, otherwise {}",
                phrase_or(otherwise, EMPTY_ELSE)?
            ),
            (_, None) => format!("if {condition}, then {body}"),
        })
    }
}

fn code_block(spine: &Spine) -> Result<String> {
    if spine.is_empty() {
        return Ok("{\n}".to_string());
    }
    Ok(format!("{{\n{}\n}}", indent(&spine.code()?)))
}

fn phrase_or(spine: &Spine, fallback: &str) -> Result<String> {
    if spine.is_empty() {
        Ok(fallback.to_string())
    } else {
        spine.natural_language()
    }
}

impl Render for ControlStructure {
    fn render(&self, channel: Channel) -> Result<String> {
        match channel {
            Channel::Code => self.render_code(),
            Channel::NaturalLanguage => self.render_natural_language(),
        }
    }
}
