//! Triggers decide where a script is attached.

use super::{Block, Channel, CompositionError, Fitter, Render, Result, Slot};
use crate::address::hooks::TargetType;
use crate::address::{Address, AttachedAs, ConversationAddress, ObjectAddress};

/// Code rendering of a trigger whose address cannot be derived yet.
pub const UNATTACHED: &str = "UNATTACHED";

#[derive(Debug)]
pub enum Trigger {
    Event(EventTrigger),
    Conversation(ConversationTrigger),
}

impl Trigger {
    pub fn address(&self) -> Result<Address> {
        match self {
            Trigger::Event(t) => t.address().map(Address::from),
            Trigger::Conversation(t) => Ok(Address::from(t.address().clone())),
        }
    }

    pub fn is_complete(&self) -> bool {
        match self {
            Trigger::Event(t) => t.is_complete(),
            Trigger::Conversation(_) => true,
        }
    }

    pub fn deep_copy(&self) -> Trigger {
        match self {
            Trigger::Event(t) => Trigger::Event(t.deep_copy()),
            Trigger::Conversation(t) => Trigger::Conversation(t.clone()),
        }
    }
}

impl Render for Trigger {
    fn render(&self, channel: Channel) -> Result<String> {
        match self {
            Trigger::Event(t) => t.render(channel),
            Trigger::Conversation(t) => t.render(channel),
        }
    }
}

/// "When <object> <event>": an object that owns script hooks plus the hook.
#[derive(Debug)]
pub struct EventTrigger {
    raiser: Slot,
    event: Slot,
}

impl Default for EventTrigger {
    fn default() -> Self {
        Self::new()
    }
}

impl EventTrigger {
    pub fn new() -> Self {
        Self {
            raiser: Slot::new(Fitter::ScriptOwners),
            event: Slot::new(Fitter::events()),
        }
    }

    pub fn raiser(&self) -> &Slot {
        &self.raiser
    }

    pub fn event(&self) -> &Slot {
        &self.event
    }

    pub fn raiser_mut(&mut self) -> &mut Slot {
        &mut self.raiser
    }

    pub fn event_mut(&mut self) -> &mut Slot {
        &mut self.event
    }

    pub fn slots_mut(&mut self) -> (&mut Slot, &mut Slot) {
        (&mut self.raiser, &mut self.event)
    }

    /// Object address built from the raiser's kind and tags and the event's hook.
    ///
    /// Fails with `Incomplete` when either slot is empty, and with an address
    /// error when the hook does not belong to the raiser's target type.
    pub fn address(&self) -> Result<ObjectAddress> {
        let raiser = self
            .raiser
            .contents()
            .and_then(|n| n.as_object())
            .ok_or_else(|| CompositionError::Incomplete("trigger has no object".to_string()))?;
        let hook = match self.event.contents().map(|n| n.block()) {
            Some(Block::Event(e)) => e.hook(),
            _ => return Err(CompositionError::Incomplete("trigger has no event".to_string())),
        };
        let target_type = raiser.target_type().ok_or_else(|| {
            CompositionError::Incomplete(format!("{} has no script hooks", raiser.display_name))
        })?;

        let address = if target_type.is_instance() {
            let area = raiser.area_tag.clone().ok_or_else(|| {
                CompositionError::Incomplete(format!("{} is not placed in an area", raiser.tag))
            })?;
            ObjectAddress::new(target_type, hook, Some(area), Some(raiser.tag.clone()))?
        } else if target_type == TargetType::Area {
            ObjectAddress::new(target_type, hook, Some(raiser.tag.clone()), None)?
        } else {
            ObjectAddress::new(target_type, hook, None, None)?
        };
        Ok(address)
    }

    pub fn is_complete(&self) -> bool {
        self.raiser.is_complete_deep() && self.event.is_complete_deep() && self.address().is_ok()
    }

    pub fn deep_copy(&self) -> EventTrigger {
        EventTrigger {
            raiser: self.raiser.deep_copy(),
            event: self.event.deep_copy(),
        }
    }
}

impl Render for EventTrigger {
    fn render(&self, channel: Channel) -> Result<String> {
        match channel {
            Channel::Code => Ok(self
                .address()
                .map_or_else(|_| UNATTACHED.to_string(), |a| a.to_string())),
            Channel::NaturalLanguage => {
                let raiser = self.raiser.natural_language()?;
                let event = match self.event.contents() {
                    Some(node) => node.natural_language()?,
                    None => "does something".to_string(),
                };
                Ok(format!("when {raiser} {event}"))
            }
        }
    }
}

/// Fires when a conversation line is spoken, or decides whether it is offered.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationTrigger {
    address: ConversationAddress,
}

impl ConversationTrigger {
    pub fn new(address: ConversationAddress) -> Self {
        Self { address }
    }

    pub fn address(&self) -> &ConversationAddress {
        &self.address
    }

    pub fn set_address(&mut self, address: ConversationAddress) {
        self.address = address;
    }
}

impl Render for ConversationTrigger {
    fn render(&self, channel: Channel) -> Result<String> {
        let a = &self.address;
        Ok(match channel {
            Channel::Code => a.to_string(),
            Channel::NaturalLanguage => {
                let line = &a.line_id().to_string()[..8];
                match a.attached_as() {
                    AttachedAs::Standard => format!(
                        "when line {line} of conversation {} is spoken",
                        a.conversation()
                    ),
                    AttachedAs::Conditional => format!(
                        "when deciding whether to offer line {line} of conversation {}",
                        a.conversation()
                    ),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::blocks::{InstanceType, Node, ObjectRef};

    fn goblin_dies() -> EventTrigger {
        let mut t = EventTrigger::new();
        t.raiser_mut()
            .assign(Node::object(ObjectRef::instance(
                InstanceType::Creature,
                "goblin",
                "the goblin",
                "forest",
            )))
            .unwrap();
        t.event_mut().assign(Node::event("OnDeath").unwrap()).unwrap();
        t
    }

    #[test]
    fn event_trigger_derives_instance_address() {
        let t = goblin_dies();
        let address = t.address().unwrap();
        assert_eq!(address.target_type(), TargetType::Creature);
        assert_eq!(address.to_string(), "Creature|OnDeath|forest|goblin");
        assert_eq!(t.natural_language().unwrap(), "when the goblin dies");
        assert!(t.is_complete());
    }

    #[test]
    fn empty_event_trigger_is_unattached() {
        let t = EventTrigger::new();
        assert!(!t.is_complete());
        assert_eq!(t.code().unwrap(), UNATTACHED);
        assert!(matches!(t.address(), Err(CompositionError::Incomplete(_))));
    }

    #[test]
    fn hook_must_belong_to_raiser() {
        let mut t = EventTrigger::new();
        t.raiser_mut().assign(Node::object(ObjectRef::module())).unwrap();
        t.event_mut().assign(Node::event("OnDeath").unwrap()).unwrap();
        assert!(matches!(t.address(), Err(CompositionError::Address(_))));
        assert!(!t.is_complete());
    }

    #[test]
    fn conversation_trigger_renders_its_address() {
        let id = Uuid::new_v4();
        let address = ConversationAddress::new("smith", id, AttachedAs::Conditional).unwrap();
        let t = Trigger::Conversation(ConversationTrigger::new(address));
        assert_eq!(t.code().unwrap(), format!("Conversation|smith|{id}|Conditional"));
        assert!(t
            .natural_language()
            .unwrap()
            .starts_with("when deciding whether to offer line"));
    }
}
