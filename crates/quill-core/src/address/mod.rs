//! Script addresses: where a compiled script attaches in the host world.
//!
//! Two families exist. An [`ObjectAddress`] names a script hook on the
//! module, an area, or an instance inside an area. A [`ConversationAddress`]
//! names a line of a conversation and whether the script runs when the line
//! is spoken or decides whether it is shown.
//!
//! Both have a canonical `|`-delimited encoding:
//!
//! ```text
//! Module|OnModuleLoad
//! Area|OnEnterScript|forest
//! Creature|OnDeath|forest|goblin
//! Conversation|intro|1b4e28ba-2fa1-11d2-883f-0016d3cca427|Standard
//! ```
//!
//! Strict parsing (`str::parse`) reports why a string was rejected;
//! `try_parse` returns `None` and is used to probe a string against both
//! grammars in turn.

pub mod hooks;

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

pub use hooks::TargetType;

pub const DELIMITER: char = '|';

const CONVERSATION_KEYWORD: &str = "Conversation";

/// Address parsing and validation errors
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// The string does not follow any address grammar
    #[error("Malformed address '{input}': {reason}")]
    Malformed { input: String, reason: String },

    /// The target type has no script hook of this name
    #[error("'{slot}' is not a script slot of {target_type}")]
    UnrecognisedSlot {
        target_type: TargetType,
        slot: String,
    },

    /// A field value is unusable (empty, contains the delimiter, wrong for the target)
    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl AddressError {
    pub(crate) fn malformed(input: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    /// True when the failure is about the shape of the string rather than
    /// the validity of its values.
    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}

fn check_field(field: &'static str, value: &str) -> Result<(), AddressError> {
    if value.is_empty() {
        return Err(AddressError::InvalidField {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    if value.contains(DELIMITER) {
        return Err(AddressError::InvalidField {
            field,
            reason: format!("'{value}' contains the delimiter '{DELIMITER}'"),
        });
    }
    if value.trim() != value {
        return Err(AddressError::InvalidField {
            field,
            reason: format!("'{value}' has leading or trailing whitespace"),
        });
    }
    if value.chars().any(char::is_control) {
        return Err(AddressError::InvalidField {
            field,
            reason: format!("{value:?} contains a control character"),
        });
    }
    Ok(())
}

/// Address of a named script hook on the module, an area or an instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectAddress {
    target_type: TargetType,
    target_slot: String,
    area_tag: Option<String>,
    instance_tag: Option<String>,
}

impl ObjectAddress {
    /// Validating constructor shared by the typed shortcuts and the parser.
    pub fn new(
        target_type: TargetType,
        target_slot: impl Into<String>,
        area_tag: Option<String>,
        instance_tag: Option<String>,
    ) -> Result<Self, AddressError> {
        let target_slot = target_slot.into();
        check_field("target slot", &target_slot)?;

        match (target_type, &area_tag, &instance_tag) {
            (TargetType::Module, None, None) => {}
            (TargetType::Area, Some(area), None) => check_field("area tag", area)?,
            (t, Some(area), Some(instance)) if t.is_instance() => {
                check_field("area tag", area)?;
                check_field("instance tag", instance)?;
            }
            (t, _, _) => {
                let expected = match t {
                    TargetType::Module => "no tags",
                    TargetType::Area => "an area tag only",
                    _ => "an area tag and an instance tag",
                };
                return Err(AddressError::InvalidField {
                    field: "tags",
                    reason: format!("{t} addresses take {expected}"),
                });
            }
        }

        if !target_type.has_slot(&target_slot) {
            return Err(AddressError::UnrecognisedSlot {
                target_type,
                slot: target_slot,
            });
        }

        Ok(Self {
            target_type,
            target_slot,
            area_tag,
            instance_tag,
        })
    }

    pub fn module(target_slot: impl Into<String>) -> Result<Self, AddressError> {
        Self::new(TargetType::Module, target_slot, None, None)
    }

    pub fn area(
        target_slot: impl Into<String>,
        area_tag: impl Into<String>,
    ) -> Result<Self, AddressError> {
        Self::new(TargetType::Area, target_slot, Some(area_tag.into()), None)
    }

    pub fn instance(
        target_type: TargetType,
        target_slot: impl Into<String>,
        area_tag: impl Into<String>,
        instance_tag: impl Into<String>,
    ) -> Result<Self, AddressError> {
        Self::new(
            target_type,
            target_slot,
            Some(area_tag.into()),
            Some(instance_tag.into()),
        )
    }

    /// Non-failing parse; `None` for anything the strict parser rejects.
    pub fn try_parse(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    pub fn target_type(&self) -> TargetType {
        self.target_type
    }

    pub fn target_slot(&self) -> &str {
        &self.target_slot
    }

    pub fn area_tag(&self) -> Option<&str> {
        self.area_tag.as_deref()
    }

    pub fn instance_tag(&self) -> Option<&str> {
        self.instance_tag.as_deref()
    }
}

impl fmt::Display for ObjectAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{DELIMITER}{}", self.target_type, self.target_slot)?;
        if let Some(area) = &self.area_tag {
            write!(f, "{DELIMITER}{area}")?;
        }
        if let Some(instance) = &self.instance_tag {
            write!(f, "{DELIMITER}{instance}")?;
        }
        Ok(())
    }
}

impl FromStr for ObjectAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(DELIMITER).collect();
        let target_type = TargetType::from_name(fields[0])
            .ok_or_else(|| AddressError::malformed(s, format!("unknown target type '{}'", fields[0])))?;

        let expected = target_type.field_count();
        if fields.len() != expected {
            return Err(AddressError::malformed(
                s,
                format!(
                    "{target_type} addresses have {expected} fields, found {}",
                    fields.len()
                ),
            ));
        }

        let area_tag = fields.get(2).map(|f| f.to_string());
        let instance_tag = fields.get(3).map(|f| f.to_string());

        Self::new(target_type, fields[1], area_tag, instance_tag).map_err(|e| match e {
            AddressError::InvalidField { .. } => AddressError::malformed(s, e.to_string()),
            other => other,
        })
    }
}

/// How a conversation script is hooked onto its line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttachedAs {
    /// Runs when the line is spoken
    Standard,
    /// Decides whether the line is offered at all
    Conditional,
}

impl AttachedAs {
    pub fn name(&self) -> &'static str {
        match self {
            AttachedAs::Standard => "Standard",
            AttachedAs::Conditional => "Conditional",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Standard" => Some(AttachedAs::Standard),
            "Conditional" => Some(AttachedAs::Conditional),
            _ => None,
        }
    }
}

impl fmt::Display for AttachedAs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Address of a conversation line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationAddress {
    conversation: String,
    line_id: Uuid,
    attached_as: AttachedAs,
}

impl ConversationAddress {
    pub fn new(
        conversation: impl Into<String>,
        line_id: Uuid,
        attached_as: AttachedAs,
    ) -> Result<Self, AddressError> {
        let conversation = conversation.into();
        check_field("conversation", &conversation)?;
        Ok(Self {
            conversation,
            line_id,
            attached_as,
        })
    }

    pub fn try_parse(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    pub fn conversation(&self) -> &str {
        &self.conversation
    }

    pub fn line_id(&self) -> Uuid {
        self.line_id
    }

    pub fn attached_as(&self) -> AttachedAs {
        self.attached_as
    }
}

impl fmt::Display for ConversationAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{CONVERSATION_KEYWORD}{DELIMITER}{}{DELIMITER}{}{DELIMITER}{}",
            self.conversation, self.line_id, self.attached_as
        )
    }
}

impl FromStr for ConversationAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(DELIMITER).collect();
        if fields[0] != CONVERSATION_KEYWORD {
            return Err(AddressError::malformed(
                s,
                format!("expected '{CONVERSATION_KEYWORD}' prefix"),
            ));
        }
        if fields.len() != 4 {
            return Err(AddressError::malformed(
                s,
                format!("conversation addresses have 4 fields, found {}", fields.len()),
            ));
        }

        let line_id = Uuid::parse_str(fields[2])
            .map_err(|e| AddressError::malformed(s, format!("bad line id: {e}")))?;
        let attached_as = AttachedAs::from_name(fields[3]).ok_or_else(|| {
            AddressError::malformed(s, format!("'{}' is neither Standard nor Conditional", fields[3]))
        })?;

        Self::new(fields[1], line_id, attached_as)
            .map_err(|e| AddressError::malformed(s, e.to_string()))
    }
}

/// Either address family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    Object(ObjectAddress),
    Conversation(ConversationAddress),
}

impl Address {
    /// Probe the object grammar first, then the conversation grammar.
    pub fn try_parse(s: &str) -> Option<Self> {
        ObjectAddress::try_parse(s)
            .map(Address::Object)
            .or_else(|| ConversationAddress::try_parse(s).map(Address::Conversation))
    }

    pub fn as_object(&self) -> Option<&ObjectAddress> {
        match self {
            Address::Object(a) => Some(a),
            Address::Conversation(_) => None,
        }
    }

    pub fn as_conversation(&self) -> Option<&ConversationAddress> {
        match self {
            Address::Conversation(a) => Some(a),
            Address::Object(_) => None,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Object(a) => a.fmt(f),
            Address::Conversation(a) => a.fmt(f),
        }
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.split(DELIMITER).next() == Some(CONVERSATION_KEYWORD) {
            s.parse().map(Address::Conversation)
        } else {
            s.parse().map(Address::Object)
        }
    }
}

impl From<ObjectAddress> for Address {
    fn from(a: ObjectAddress) -> Self {
        Address::Object(a)
    }
}

impl From<ConversationAddress> for Address {
    fn from(a: ConversationAddress) -> Self {
        Address::Conversation(a)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_address_has_no_tags() {
        let a = ObjectAddress::module("OnModuleLoad").unwrap();
        assert_eq!(a.to_string(), "Module|OnModuleLoad");
        assert_eq!(a.area_tag(), None);
        assert!(ObjectAddress::new(TargetType::Module, "OnModuleLoad", Some("x".into()), None).is_err());
    }

    #[test]
    fn tags_may_not_contain_delimiter() {
        let err = ObjectAddress::area("OnEnterScript", "for|est").unwrap_err();
        assert!(matches!(err, AddressError::InvalidField { field: "area tag", .. }));
    }

    #[test]
    fn tags_must_survive_the_marker_line() {
        for tag in ["goblin ", " goblin", "gob\nlin", "gob\rlin"] {
            let err = ObjectAddress::instance(TargetType::Creature, "OnDeath", "forest", tag)
                .unwrap_err();
            assert!(matches!(err, AddressError::InvalidField { field: "instance tag", .. }));
        }
        assert!(ConversationAddress::new("intro\n", Uuid::new_v4(), AttachedAs::Standard).is_err());
        assert!("Area|OnEnterScript| forest".parse::<ObjectAddress>().is_err());
    }

    #[test]
    fn unknown_slot_is_not_a_format_error() {
        let err = "Creature|OnTeaTime|forest|goblin"
            .parse::<ObjectAddress>()
            .unwrap_err();
        assert!(matches!(err, AddressError::UnrecognisedSlot { .. }));
        assert!(!err.is_format_error());
    }

    #[test]
    fn empty_tag_in_string_is_a_format_error() {
        let err = "Creature|OnDeath||goblin".parse::<ObjectAddress>().unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn address_serializes_as_string() {
        let a: Address = ObjectAddress::instance(TargetType::Door, "OnOpen", "keep", "gate")
            .unwrap()
            .into();
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, "\"Door|OnOpen|keep|gate\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }
}
