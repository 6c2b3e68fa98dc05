use tracing::debug;

use super::{Channel, CompositionError, Fitter, Node, NodeId, Render, Result};

/// Natural-language joiner between consecutive statements.
pub const SEQUENCE_CONNECTOR: &str = "; then ";

/// Rendering of a spine with nothing in it.
pub const EMPTY_SEQUENCE: &str = "nothing happens";

/// Ordered, mutable sequence of statement-like nodes forming a script body.
#[derive(Debug)]
pub struct Spine {
    fitter: Fitter,
    nodes: Vec<Node>,
}

impl Default for Spine {
    fn default() -> Self {
        Self::new()
    }
}

impl Spine {
    pub fn new() -> Self {
        Self {
            fitter: Fitter::Actions,
            nodes: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn get(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Node> {
        self.nodes.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Node> {
        self.nodes.iter_mut()
    }

    pub fn accepts(&self, node: &Node) -> bool {
        self.fitter.fits(node)
    }

    /// Insert at `index` (0..=len). Later nodes shift down by one.
    pub fn insert(&mut self, index: usize, node: Node) -> Result<()> {
        if !self.fitter.fits(&node) {
            return Err(CompositionError::DoesNotFit {
                expected: self.fitter.describe(),
                found: node.kind(),
            });
        }
        if index > self.nodes.len() {
            return Err(CompositionError::IndexOutOfRange {
                index,
                len: self.nodes.len(),
            });
        }
        debug!(node = %node.id(), index, "spine insert");
        self.nodes.insert(index, node);
        Ok(())
    }

    pub fn push(&mut self, node: Node) -> Result<()> {
        self.insert(self.nodes.len(), node)
    }

    /// Remove the node at `index`, preserving the order of the rest.
    pub fn remove(&mut self, index: usize) -> Result<Node> {
        if index >= self.nodes.len() {
            return Err(CompositionError::IndexOutOfRange {
                index,
                len: self.nodes.len(),
            });
        }
        debug!(index, "spine remove");
        Ok(self.nodes.remove(index))
    }

    /// Remove a direct child by identity.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let index = self.position(id)?;
        Some(self.nodes.remove(index))
    }

    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| n.id() == id)
    }

    /// Detach a node anywhere below this spine.
    pub fn take_descendant(&mut self, id: NodeId) -> Option<Node> {
        if let Some(node) = self.remove_node(id) {
            return Some(node);
        }
        self.nodes
            .iter_mut()
            .find_map(|node| node.take_descendant(id))
    }

    pub fn find(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find_map(|n| n.find(id))
    }

    /// Empty bodies are structurally complete.
    pub fn is_complete(&self) -> bool {
        self.nodes.iter().all(Node::is_complete)
    }

    pub fn deep_copy(&self) -> Spine {
        Spine {
            fitter: self.fitter.clone(),
            nodes: self.nodes.iter().map(Node::deep_copy).collect(),
        }
    }
}

impl Render for Spine {
    fn render(&self, channel: Channel) -> Result<String> {
        let parts = self
            .nodes
            .iter()
            .map(|n| n.render(channel))
            .collect::<Result<Vec<_>>>()?;
        Ok(match channel {
            Channel::Code => parts.join("\n"),
            Channel::NaturalLanguage if parts.is_empty() => EMPTY_SEQUENCE.to_string(),
            Channel::NaturalLanguage => parts.join(SEQUENCE_CONNECTOR),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_spine_renders_explicitly() {
        let spine = Spine::new();
        assert!(spine.is_empty());
        assert!(spine.is_complete());
        assert_eq!(spine.code().unwrap(), "");
        assert_eq!(spine.natural_language().unwrap(), EMPTY_SEQUENCE);
    }

    #[test]
    fn spine_rejects_values() {
        let mut spine = Spine::new();
        assert!(matches!(
            spine.push(Node::integer(3)),
            Err(CompositionError::DoesNotFit { .. })
        ));
    }

    #[test]
    fn insert_checks_bounds() {
        let mut spine = Spine::new();
        assert!(matches!(
            spine.insert(1, Node::if_block()),
            Err(CompositionError::IndexOutOfRange { index: 1, len: 0 })
        ));
        spine.insert(0, Node::if_block()).unwrap();
        assert!(spine.remove(3).is_err());
    }

    #[test]
    fn take_descendant_reaches_nested_bodies() {
        let mut inner = Node::while_block();
        let nested = Node::if_block();
        let nested_id = nested.id();
        inner.as_control_mut().unwrap().body_mut().push(nested).unwrap();

        let mut spine = Spine::new();
        spine.push(inner).unwrap();

        let taken = spine.take_descendant(nested_id).unwrap();
        assert_eq!(taken.id(), nested_id);
        assert!(spine.get(0).unwrap().as_control().unwrap().body().is_empty());
    }
}
