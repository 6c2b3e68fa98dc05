//! # Quill Core
//!
//! Block composition model for visual game scripting:
//! - Typed blocks plugged into fitter-guarded slots and ordered spines
//! - Code and natural-language rendering from one tree
//! - Script addresses locating where a compiled script attaches
//! - XML persistence, statistics and the translator/attacher boundary
//!
//! Front ends (the REPL, an editor) drive a [`Session`] and never touch
//! the tree from more than one thread.

#![warn(clippy::all)]

pub mod address;
pub mod backend;
pub mod blocks;
pub mod library;
pub mod serial;
pub mod session;
pub mod stats;

use std::path::Path;

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use address::{Address, AddressError, AttachedAs, ConversationAddress, ObjectAddress, TargetType};
pub use backend::{
    AttachError, Attacher, GameInfo, IdentityTranslator, MemoryAttacher, ResourceError,
    ResourceTracker, Translator,
};
pub use blocks::{
    Channel, CompositionError, Fitter, Node, NodeId, NodeKind, Render, Script, ScriptSource, Slot,
    Spine,
};
pub use library::Library;
pub use serial::{SerialError, XmlCodec};
pub use session::{Clipboard, EventSender, HostEvent, Session};
pub use stats::ScriptStats;

/// Quill version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing for quill components
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("quill_core=info"));
    // A subscriber may already be installed by the host application.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Core configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuillConfig {
    /// Enable debug mode
    pub debug: bool,
    /// Prefix for names the attacher gives new scripts
    pub script_name_prefix: String,
    /// Host game scripts are attached in
    pub game: GameInfo,
}

impl Default for QuillConfig {
    fn default() -> Self {
        Self {
            debug: false,
            script_name_prefix: backend::memory::DEFAULT_SCRIPT_PREFIX.to_string(),
            game: GameInfo::default(),
        }
    }
}

impl QuillConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.script_name_prefix.is_empty() {
            return Err(QuillError::Config(
                "script_name_prefix must not be empty".to_string(),
            ));
        }
        if self.script_name_prefix.contains(address::DELIMITER) {
            return Err(QuillError::Config(format!(
                "script_name_prefix must not contain '{}'",
                address::DELIMITER
            )));
        }
        Ok(())
    }

    /// An in-memory attacher configured from this config.
    pub fn memory_attacher<T: Translator>(&self, translator: T) -> MemoryAttacher<T> {
        MemoryAttacher::new(translator)
            .with_prefix(self.script_name_prefix.clone())
            .with_game(self.game.clone())
    }
}

/// Error types for quill core operations
#[derive(thiserror::Error, Debug)]
pub enum QuillError {
    /// Block composition or rendering error
    #[error("Composition error: {0}")]
    Composition(#[from] CompositionError),

    /// Address parse or validation error
    #[error("Address error: {0}")]
    Address(#[from] AddressError),

    /// XML read/write error
    #[error("Serialization error: {0}")]
    Serial(#[from] SerialError),

    /// Attach boundary error
    #[error("Attach error: {0}")]
    Attach(#[from] AttachError),

    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("Node {0} is not in the script")]
    NodeNotFound(NodeId),

    #[error("Clipboard is empty")]
    ClipboardEmpty,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for quill core operations
pub type Result<T> = std::result::Result<T, QuillError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config = QuillConfig::from_json(r#"{"debug": true}"#).unwrap();
        assert!(config.debug);
        assert_eq!(config.script_name_prefix, "quill_");
        assert_eq!(config.game, GameInfo::default());
    }

    #[test]
    fn config_rejects_unusable_prefix() {
        assert!(matches!(
            QuillConfig::from_json(r#"{"script_name_prefix": ""}"#),
            Err(QuillError::Config(_))
        ));
        assert!(matches!(
            QuillConfig::from_json("{not json"),
            Err(QuillError::Json(_))
        ));
    }

    #[test]
    fn config_loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quill.json");
        std::fs::write(&path, r#"{"script_name_prefix": "gen_"}"#).unwrap();
        let config = QuillConfig::load(&path).unwrap();
        assert_eq!(config.script_name_prefix, "gen_");
        let attacher = config.memory_attacher(IdentityTranslator);
        assert_eq!(attacher.next_free_name(), "gen_1");
    }
}
