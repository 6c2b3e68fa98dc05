use serde::{Deserialize, Serialize};
use tracing::debug;

use super::trigger::UNATTACHED;
use super::{
    Channel, CompositionError, Fitter, Node, NodeId, ObjectRef, Render, Result, Slot, Spine,
};
use crate::address::{Address, AddressError};
use crate::stats::ScriptStats;

/// Leading comment carrying the address inside generated source.
pub const ADDRESS_MARKER: &str = "// quill-address: ";

/// Root document: a trigger deciding where the script lives plus its body.
#[derive(Debug)]
pub struct Script {
    trigger: Slot,
    spine: Spine,
}

impl Default for Script {
    fn default() -> Self {
        Self::new()
    }
}

impl Script {
    pub fn new() -> Self {
        Self {
            trigger: Slot::new(Fitter::Triggers),
            spine: Spine::new(),
        }
    }

    pub fn with_trigger(trigger: Node) -> Result<Self> {
        let mut script = Self::new();
        script.trigger.assign(trigger)?;
        Ok(script)
    }

    pub fn trigger(&self) -> &Slot {
        &self.trigger
    }

    pub fn trigger_mut(&mut self) -> &mut Slot {
        &mut self.trigger
    }

    pub fn spine(&self) -> &Spine {
        &self.spine
    }

    pub fn spine_mut(&mut self) -> &mut Spine {
        &mut self.spine
    }

    pub fn address(&self) -> Result<Address> {
        match self.trigger.contents().and_then(Node::as_trigger) {
            Some(trigger) => trigger.address(),
            None => Err(CompositionError::Incomplete("script has no trigger".to_string())),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.trigger.is_complete_deep() && self.spine.is_complete()
    }

    /// Produce source ready for a translator. Incomplete scripts are refused.
    pub fn compile(&self) -> Result<ScriptSource> {
        let address = self.address()?;
        if !self.is_complete() {
            return Err(CompositionError::Incomplete(
                "script body has empty slots".to_string(),
            ));
        }
        let source = ScriptSource {
            code: self.code()?,
            natural_language: self.natural_language()?,
            address,
        };
        debug!(address = %source.address, "script compiled");
        Ok(source)
    }

    pub fn deep_copy(&self) -> Script {
        Script {
            trigger: self.trigger.deep_copy(),
            spine: self.spine.deep_copy(),
        }
    }

    pub fn find(&self, id: NodeId) -> Option<&Node> {
        self.trigger
            .contents()
            .and_then(|t| t.find(id))
            .or_else(|| self.spine.find(id))
    }

    /// Detach any node in the script, trigger included.
    pub fn take_descendant(&mut self, id: NodeId) -> Option<Node> {
        if self.trigger.contents().map(Node::id) == Some(id) {
            return self.trigger.take();
        }
        if let Some(found) = self
            .trigger
            .contents_mut()
            .and_then(|t| t.take_descendant(id))
        {
            return Some(found);
        }
        self.spine.take_descendant(id)
    }

    /// Every node in the script, trigger first, in pre-order.
    pub fn for_each_node(&self, f: &mut dyn FnMut(&Node)) {
        if let Some(trigger) = self.trigger.contents() {
            trigger.for_each_node(f);
        }
        for node in self.spine.iter() {
            node.for_each_node(f);
        }
    }

    /// The trigger node and each top-level body node.
    fn for_each_root_mut(&mut self, f: &mut dyn FnMut(&mut Node)) {
        if let Some(trigger) = self.trigger.contents_mut() {
            f(trigger);
        }
        for node in self.spine.iter_mut() {
            f(node);
        }
    }

    pub fn for_each_object_mut(&mut self, f: &mut dyn FnMut(&mut ObjectRef)) {
        self.for_each_root_mut(&mut |node| node.for_each_object_mut(f));
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if self.trigger.contents().is_some_and(|t| t.contains(id)) {
            return self.trigger.contents_mut().and_then(|t| t.find_mut(id));
        }
        self.spine.iter_mut().find_map(|node| node.find_mut(id))
    }

    /// Empty every slot, including the trigger slot, whose contents match.
    pub fn clear_slots_where(&mut self, predicate: &dyn Fn(&Node) -> bool) -> Vec<Node> {
        let mut removed = Vec::new();
        if self.trigger.contents().is_some_and(predicate) {
            removed.extend(self.trigger.take());
        }
        self.for_each_root_mut(&mut |node| removed.extend(node.clear_slots_where(predicate)));
        removed
    }

    pub fn statistics(&self) -> ScriptStats {
        let mut stats = ScriptStats::new();
        stats.record_script(self);
        stats
    }
}

impl Render for Script {
    fn render(&self, channel: Channel) -> Result<String> {
        match channel {
            Channel::Code => {
                let target = match self.trigger.contents() {
                    Some(trigger) => trigger.code()?,
                    None => UNATTACHED.to_string(),
                };
                let body = self.spine.code()?;
                if body.is_empty() {
                    Ok(format!("{ADDRESS_MARKER}{target}"))
                } else {
                    Ok(format!("{ADDRESS_MARKER}{target}\n{body}"))
                }
            }
            Channel::NaturalLanguage => {
                let trigger = match self.trigger.contents() {
                    Some(trigger) => trigger.natural_language()?,
                    None => "when something happens".to_string(),
                };
                Ok(format!("{trigger}, {}", self.spine.natural_language()?))
            }
        }
    }
}

/// A compiled script: source text carrying its own address marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptSource {
    pub address: Address,
    pub code: String,
    pub natural_language: String,
}

impl ScriptSource {
    /// Source text without the address marker line.
    pub fn body(&self) -> &str {
        strip_marker(&self.code)
    }

    /// Read the address back out of a generated artifact's marker line.
    pub fn recover(text: &str) -> std::result::Result<Address, AddressError> {
        let first = text.lines().next().unwrap_or_default();
        let encoded = first
            .strip_prefix(ADDRESS_MARKER)
            .ok_or_else(|| AddressError::malformed(first, "no address marker"))?;
        Address::try_parse(encoded.strip_suffix('\r').unwrap_or(encoded))
            .ok_or_else(|| AddressError::malformed(encoded, "matches no address grammar"))
    }
}

fn strip_marker(code: &str) -> &str {
    if !code.starts_with(ADDRESS_MARKER) {
        return code;
    }
    code.split_once('\n').map_or("", |(_, body)| body)
}
