//! Quill REPL - Interactive command-line interface for composing Quill scripts
//!
//! This crate provides REPL (Read-Eval-Print Loop) functionality over a
//! Quill editing session, including command parsing, multi-line XML block
//! input and a stand-in host world for attaching scripts.

pub mod repl;

// Re-export commonly used types for convenience
pub use repl::{BufferedNotifier, DefaultNotifier, Notice, Repl, ReplCommand, ReplNotifier};
