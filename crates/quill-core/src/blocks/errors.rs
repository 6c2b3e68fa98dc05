use thiserror::Error;

use super::NodeKind;
use crate::address::AddressError;

/// Contract violations raised while composing or rendering blocks
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompositionError {
    #[error("Type mismatch: slot accepts {expected}, got {found}")]
    DoesNotFit { expected: String, found: NodeKind },

    #[error("Argument count violation: '{behaviour}' takes {expected} arguments, got {actual}")]
    ArgumentCount {
        behaviour: String,
        expected: usize,
        actual: usize,
    },

    #[error("Statement '{statement}' has {slots} slots but its behaviour takes {parameters} arguments")]
    LayoutMismatch {
        statement: String,
        slots: usize,
        parameters: usize,
    },

    #[error("Malformed template for '{behaviour}': {message}")]
    MalformedTemplate { behaviour: String, message: String },

    #[error("Index {index} out of range for sequence of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Statement '{statement}' has no slot {index}")]
    NoSuchSlot { statement: String, index: usize },

    #[error("{operator} needs at least {minimum} operands, got {actual}")]
    OperandCount {
        operator: &'static str,
        minimum: usize,
        actual: usize,
    },

    #[error("{operator} takes at most {maximum} operands, got {actual}")]
    TooManyOperands {
        operator: &'static str,
        maximum: usize,
        actual: usize,
    },

    #[error("Unknown statement '{0}'")]
    UnknownStatement(String),

    #[error("Statement '{0}' is already registered")]
    DuplicateStatement(String),

    #[error("Unknown event hook '{0}'")]
    UnknownHook(String),

    #[error("Slot is empty")]
    EmptySlot,

    #[error("Script is incomplete: {0}")]
    Incomplete(String),

    #[error(transparent)]
    Address(#[from] AddressError),
}

impl CompositionError {
    pub fn argument_count(behaviour: &str, expected: usize, actual: usize) -> Self {
        Self::ArgumentCount {
            behaviour: behaviour.to_string(),
            expected,
            actual,
        }
    }

    pub fn malformed_template(behaviour: &str, message: impl Into<String>) -> Self {
        Self::MalformedTemplate {
            behaviour: behaviour.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CompositionError>;
