use tracing::trace;

use super::{Channel, CompositionError, Fitter, Node, Render, Result};

/// Single-occupancy container guarded by a [`Fitter`].
///
/// Invariant: when occupied, the fitter accepts the contents.
#[derive(Debug)]
pub struct Slot {
    fitter: Fitter,
    contents: Option<Box<Node>>,
}

impl Slot {
    pub fn new(fitter: Fitter) -> Self {
        Self {
            fitter,
            contents: None,
        }
    }

    pub fn fitter(&self) -> &Fitter {
        &self.fitter
    }

    pub fn contents(&self) -> Option<&Node> {
        self.contents.as_deref()
    }

    pub fn contents_mut(&mut self) -> Option<&mut Node> {
        self.contents.as_deref_mut()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_none()
    }

    pub fn accepts(&self, node: &Node) -> bool {
        self.fitter.fits(node)
    }

    /// Place `node` in this slot, returning the previous occupant (now unowned).
    ///
    /// A node that does not fit is rejected and dropped; callers that need
    /// it back check [`Slot::accepts`] first.
    pub fn assign(&mut self, node: Node) -> Result<Option<Node>> {
        if !self.fitter.fits(&node) {
            return Err(CompositionError::DoesNotFit {
                expected: self.fitter.describe(),
                found: node.kind(),
            });
        }
        trace!(node = %node.id(), kind = %node.kind(), "slot assigned");
        Ok(self.contents.replace(Box::new(node)).map(|old| *old))
    }

    /// Move the occupant of `source` into this slot. `source` is left empty.
    pub fn transfer_from(&mut self, source: &mut Slot) -> Result<Option<Node>> {
        let node = source.contents().ok_or(CompositionError::EmptySlot)?;
        if !self.fitter.fits(node) {
            return Err(CompositionError::DoesNotFit {
                expected: self.fitter.describe(),
                found: node.kind(),
            });
        }
        match source.take() {
            Some(node) => self.assign(node),
            None => Err(CompositionError::EmptySlot),
        }
    }

    pub fn take(&mut self) -> Option<Node> {
        self.contents.take().map(|node| *node)
    }

    pub fn deep_copy(&self) -> Slot {
        Slot {
            fitter: self.fitter.clone(),
            contents: self.contents.as_ref().map(|n| Box::new(n.deep_copy())),
        }
    }

    /// A slot is complete once occupied; whether the occupant is complete
    /// is the owning node's concern.
    pub fn is_complete(&self) -> bool {
        self.contents.is_some()
    }

    /// Occupied by a node that is itself complete.
    pub(crate) fn is_complete_deep(&self) -> bool {
        self.contents().is_some_and(Node::is_complete)
    }
}

impl Render for Slot {
    /// Renders the occupant, or the fitter's placeholder when empty.
    fn render(&self, channel: Channel) -> Result<String> {
        match (self.contents(), channel) {
            (Some(node), _) => node.render(channel),
            (None, Channel::Code) => Ok(self.fitter.placeholder_code().to_string()),
            (None, Channel::NaturalLanguage) => Ok(self.fitter.placeholder_phrase()),
        }
    }
}
