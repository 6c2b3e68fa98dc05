//! Boundary to whatever turns compiled scripts into placed game artifacts.
//!
//! A [`Translator`] maps intermediate source to the target language; an
//! [`Attacher`] names the result and places it at an [`Address`] in the
//! host world. [`memory`] provides backend-free implementations of both.

pub mod memory;
pub mod resources;

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::Address;
use crate::blocks::ScriptSource;

pub use memory::{AttachedScript, IdentityTranslator, MemoryAttacher};
pub use resources::{ResourceError, ResourceTracker};

/// Failures at the attach boundary, by category
#[derive(Error, Debug)]
pub enum AttachError {
    #[error("A script named '{0}' already exists")]
    NameExists(String),

    #[error("Target not found: {0}")]
    TargetNotFound(String),

    #[error("Compiler rejected script '{name}': {reason}")]
    CompileRejected { name: String, reason: String },

    #[error("Malformed script data: {0}")]
    MalformedData(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// Host game an attacher works against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameInfo {
    pub name: String,
    pub version: String,
}

impl Default for GameInfo {
    fn default() -> Self {
        Self {
            name: "Neverwinter Nights 2".to_string(),
            version: "1.23".to_string(),
        }
    }
}

pub trait Translator {
    fn target_language(&self) -> &str;

    /// Pure mapping from intermediate source to target-language source.
    fn translate(&self, source: &str) -> Result<String, AttachError>;

    fn translate_to_file(&self, source: &str, path: &Path) -> Result<(), AttachError> {
        let translated = self.translate(source)?;
        std::fs::write(path, translated)?;
        Ok(())
    }
}

pub trait Attacher {
    fn game(&self) -> &GameInfo;

    /// Translate `source` and place it at `address`, returning the name it was
    /// stored under. Demands and releases may be stacked by the caller.
    fn attach(&mut self, source: &ScriptSource, address: &Address) -> Result<String, AttachError>;
}
