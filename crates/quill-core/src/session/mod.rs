//! Editing session: the script being edited, its library, a clipboard and
//! the queue host notifications arrive on.
//!
//! A session is owned by one thread. Other threads talk to it only through
//! an [`EventSender`]; queued events are applied by [`Session::drain_events`].

pub mod events;

use std::path::Path;

use tracing::{debug, info};

pub use events::{EventQueue, EventSender, HostEvent, SessionClosed};

use crate::blocks::{
    Block, CompositionError, Node, NodeId, ObjectRef, Script, ScriptSource, Trigger,
};
use crate::library::Library;
use crate::serial::XmlCodec;
use crate::stats::ScriptStats;
use crate::{QuillError, Result};

/// Holds at most one node, always a private deep copy.
#[derive(Debug, Default)]
pub struct Clipboard {
    contents: Option<Node>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn copy(&mut self, node: &Node) {
        self.contents = Some(node.deep_copy());
    }

    /// Take ownership of a node that was cut out of a tree.
    pub fn put(&mut self, node: Node) {
        self.contents = Some(node);
    }

    /// A fresh copy each time; the clipboard keeps its own.
    pub fn paste(&self) -> Option<Node> {
        self.contents.as_ref().map(Node::deep_copy)
    }

    pub fn peek(&self) -> Option<&Node> {
        self.contents.as_ref()
    }

    pub fn peek_mut(&mut self) -> Option<&mut Node> {
        self.contents.as_mut()
    }

    pub fn clear(&mut self) {
        self.contents = None;
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_none()
    }
}

#[derive(Debug)]
pub struct Session {
    library: Library,
    script: Script,
    clipboard: Clipboard,
    events: EventQueue,
}

impl Session {
    pub fn new(library: Library) -> Self {
        Self {
            library,
            script: Script::new(),
            clipboard: Clipboard::new(),
            events: EventQueue::new(),
        }
    }

    pub fn with_standard_library() -> Result<Self> {
        Ok(Self::new(Library::standard()?))
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    pub fn script_mut(&mut self) -> &mut Script {
        &mut self.script
    }

    /// Replace the script, returning the previous one.
    pub fn set_script(&mut self, script: Script) -> Script {
        std::mem::replace(&mut self.script, script)
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    pub fn clipboard_mut(&mut self) -> &mut Clipboard {
        &mut self.clipboard
    }

    pub fn event_sender(&self) -> EventSender {
        self.events.sender()
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    pub fn create(&self, statement: &str) -> Result<Node> {
        Ok(self.library.create(statement)?)
    }

    pub fn compile(&self) -> Result<ScriptSource> {
        Ok(self.script.compile()?)
    }

    pub fn statistics(&self) -> ScriptStats {
        self.script.statistics()
    }

    pub fn load_xml(&mut self, xml: &str) -> Result<()> {
        let script = XmlCodec::new(&self.library).script_from_xml(xml)?;
        self.script = script;
        Ok(())
    }

    pub fn save_xml(&self) -> Result<String> {
        Ok(XmlCodec::new(&self.library).script_to_xml(&self.script)?)
    }

    pub fn load(&mut self, path: &Path) -> Result<()> {
        let script = XmlCodec::new(&self.library).load_script(path)?;
        self.script = script;
        info!(path = %path.display(), "loaded script");
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        XmlCodec::new(&self.library).save_script(&self.script, path)?;
        info!(path = %path.display(), "saved script");
        Ok(())
    }

    /// Remove the `index`th top-level statement.
    pub fn remove_statement(&mut self, index: usize) -> Result<Node> {
        Ok(self.script.spine_mut().remove(index)?)
    }

    /// Detach any node from the script.
    pub fn remove(&mut self, id: NodeId) -> Result<Node> {
        self.script
            .take_descendant(id)
            .ok_or(QuillError::NodeNotFound(id))
    }

    pub fn copy(&mut self, id: NodeId) -> Result<()> {
        let node = self.script.find(id).ok_or(QuillError::NodeNotFound(id))?;
        self.clipboard.copy(node);
        Ok(())
    }

    pub fn cut(&mut self, id: NodeId) -> Result<()> {
        let node = self.remove(id)?;
        self.clipboard.put(node);
        Ok(())
    }

    /// Paste a copy of the clipboard into the top-level body at `index`.
    pub fn paste_at(&mut self, index: usize) -> Result<NodeId> {
        let node = self.clipboard.paste().ok_or(QuillError::ClipboardEmpty)?;
        let id = node.id();
        self.script.spine_mut().insert(index, node)?;
        Ok(id)
    }

    /// Paste a copy of the clipboard into slot `slot` of node `parent`,
    /// returning whatever the slot held before.
    pub fn paste_into_slot(&mut self, parent: NodeId, slot: usize) -> Result<Option<Node>> {
        let node = self.clipboard.paste().ok_or(QuillError::ClipboardEmpty)?;
        let parent_node = self
            .script
            .find_mut(parent)
            .ok_or(QuillError::NodeNotFound(parent))?;
        let mut slots = parent_node.slots_mut();
        let len = slots.len();
        let target = slots
            .get_mut(slot)
            .ok_or(CompositionError::IndexOutOfRange { index: slot, len })?;
        Ok(target.assign(node)?)
    }

    /// Apply every queued host event to the script and clipboard.
    /// Returns how many events were applied.
    pub fn drain_events(&mut self) -> usize {
        let events = self.events.drain();
        for event in &events {
            let removed = self.apply_event(event);
            debug!(?event, removed = removed.len(), "applied host event");
        }
        events.len()
    }

    /// Returns the nodes removed from the script because of `event`.
    pub fn apply_event(&mut self, event: &HostEvent) -> Vec<Node> {
        match event {
            HostEvent::ObjectRenamed { old_tag, new_tag } => {
                let mut rename = |object: &mut ObjectRef| {
                    if object.tag == *old_tag {
                        object.tag = new_tag.clone();
                    }
                    if object.area_tag.as_deref() == Some(old_tag.as_str()) {
                        object.area_tag = Some(new_tag.clone());
                    }
                };
                self.script.for_each_object_mut(&mut rename);
                if let Some(node) = self.clipboard.peek_mut() {
                    node.for_each_object_mut(&mut rename);
                }
                Vec::new()
            }
            HostEvent::ObjectRemoved { tag } => {
                let refers_to = |node: &Node| {
                    node.as_object().is_some_and(|o| {
                        o.tag == *tag || o.area_tag.as_deref() == Some(tag.as_str())
                    })
                };
                self.scrub_clipboard(&refers_to);
                self.script.clear_slots_where(&refers_to)
            }
            HostEvent::ConversationRemoved { conversation } => {
                let is_line_of = |node: &Node| {
                    matches!(
                        node.block(),
                        Block::Trigger(Trigger::Conversation(t))
                            if t.address().conversation() == conversation.as_str()
                    )
                };
                self.scrub_clipboard(&is_line_of);
                self.script.clear_slots_where(&is_line_of)
            }
        }
    }

    /// Drop the clipboard when it matches `predicate` itself, otherwise
    /// empty the matching slots inside it.
    fn scrub_clipboard(&mut self, predicate: &dyn Fn(&Node) -> bool) {
        if self.clipboard.peek().is_some_and(predicate) {
            self.clipboard.clear();
        } else if let Some(node) = self.clipboard.peek_mut() {
            node.clear_slots_where(predicate);
        }
    }
}
