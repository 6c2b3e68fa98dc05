//! Where the shell's messages go.
//!
//! The console notifier prints command replies to stdout and failures to
//! stderr. [`BufferedNotifier`] keeps everything in memory so a driver (or a
//! test) can inspect what a session of commands reported.

use std::sync::{Arc, Mutex};

/// Receives everything the shell reports about the script being edited.
pub trait ReplNotifier: Send + Sync {
    /// Reply to a dot-command: code listings, stats, confirmations.
    fn on_output(&self, content: &str);

    /// A command or block that was refused.
    fn on_error(&self, content: &str);

    /// A block typed as XML was appended; `reading` is its natural-language
    /// rendering prefixed with its position in the spine.
    fn on_block_added(&self, reading: &str, duration_ms: u64, quiet: bool);
}

/// Shared notifiers, so the driver keeps a handle on what it installed.
impl<T: ReplNotifier + ?Sized> ReplNotifier for Arc<T> {
    fn on_output(&self, content: &str) {
        (**self).on_output(content)
    }

    fn on_error(&self, content: &str) {
        (**self).on_error(content)
    }

    fn on_block_added(&self, reading: &str, duration_ms: u64, quiet: bool) {
        (**self).on_block_added(reading, duration_ms, quiet)
    }
}

/// Console notifier.
#[derive(Debug, Default)]
pub struct DefaultNotifier;

impl DefaultNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl ReplNotifier for DefaultNotifier {
    fn on_output(&self, content: &str) {
        if !content.is_empty() {
            println!("{content}");
        }
    }

    fn on_error(&self, content: &str) {
        eprintln!("{content}");
    }

    fn on_block_added(&self, reading: &str, duration_ms: u64, quiet: bool) {
        if quiet {
            println!("{reading}");
        } else {
            println!("+ {reading} ({duration_ms}ms)");
        }
    }
}

/// One message captured by [`BufferedNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Output(String),
    Error(String),
    Block(String),
}

/// Keeps messages instead of printing them.
#[derive(Debug, Default)]
pub struct BufferedNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl BufferedNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every message captured so far.
    pub fn take(&self) -> Vec<Notice> {
        match self.notices.lock() {
            Ok(mut notices) => std::mem::take(&mut *notices),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    fn push(&self, notice: Notice) {
        match self.notices.lock() {
            Ok(mut notices) => notices.push(notice),
            Err(poisoned) => poisoned.into_inner().push(notice),
        }
    }
}

impl ReplNotifier for BufferedNotifier {
    fn on_output(&self, content: &str) {
        if !content.is_empty() {
            self.push(Notice::Output(content.to_string()));
        }
    }

    fn on_error(&self, content: &str) {
        self.push(Notice::Error(content.to_string()));
    }

    fn on_block_added(&self, reading: &str, _duration_ms: u64, _quiet: bool) {
        self.push(Notice::Block(reading.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffered_notifier_keeps_order_and_drains() {
        let notifier = BufferedNotifier::new();
        notifier.on_output("");
        notifier.on_output("Script cleared");
        notifier.on_block_added("[0] the player dies", 1, false);
        notifier.on_error("Error: no such slot");

        assert_eq!(
            notifier.take(),
            vec![
                Notice::Output("Script cleared".to_string()),
                Notice::Block("[0] the player dies".to_string()),
                Notice::Error("Error: no such slot".to_string()),
            ]
        );
        assert!(notifier.take().is_empty());
    }
}
