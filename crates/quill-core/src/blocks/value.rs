//! Terminal blocks: literal values, object references and event references.

use serde::{Deserialize, Serialize};

use super::{Channel, CompositionError, Render, Result};
use crate::address::hooks::{self, TargetType};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Render for Value {
    fn render(&self, _channel: Channel) -> Result<String> {
        Ok(match self {
            Value::Integer(n) => n.to_string(),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => format!("{f:.1}"),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => format!("\"{}\"", escape_string(s)),
        })
    }
}

pub(crate) fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstanceType {
    Creature,
    Door,
    Placeable,
    Item,
    Trigger,
    Encounter,
    Store,
    Waypoint,
}

impl InstanceType {
    pub const ALL: [InstanceType; 8] = [
        InstanceType::Creature,
        InstanceType::Door,
        InstanceType::Placeable,
        InstanceType::Item,
        InstanceType::Trigger,
        InstanceType::Encounter,
        InstanceType::Store,
        InstanceType::Waypoint,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            InstanceType::Creature => "Creature",
            InstanceType::Door => "Door",
            InstanceType::Placeable => "Placeable",
            InstanceType::Item => "Item",
            InstanceType::Trigger => "Trigger",
            InstanceType::Encounter => "Encounter",
            InstanceType::Store => "Store",
            InstanceType::Waypoint => "Waypoint",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Items and waypoints have no script hooks.
    pub fn target_type(&self) -> Option<TargetType> {
        match self {
            InstanceType::Creature => Some(TargetType::Creature),
            InstanceType::Door => Some(TargetType::Door),
            InstanceType::Placeable => Some(TargetType::Placeable),
            InstanceType::Trigger => Some(TargetType::Trigger),
            InstanceType::Encounter => Some(TargetType::Encounter),
            InstanceType::Store => Some(TargetType::Store),
            InstanceType::Item | InstanceType::Waypoint => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Module,
    Area,
    Player,
    /// A placed object in an area
    Instance(InstanceType),
    /// A template new instances are created from
    Blueprint(InstanceType),
}

/// Reference to something in the host world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub kind: ObjectKind,
    /// Tag for instances and areas, resref for blueprints
    pub tag: String,
    pub display_name: String,
    /// Area an instance lives in
    pub area_tag: Option<String>,
}

impl ObjectRef {
    pub fn module() -> Self {
        Self {
            kind: ObjectKind::Module,
            tag: "module".to_string(),
            display_name: "the module".to_string(),
            area_tag: None,
        }
    }

    pub fn player() -> Self {
        Self {
            kind: ObjectKind::Player,
            tag: "player".to_string(),
            display_name: "the player".to_string(),
            area_tag: None,
        }
    }

    pub fn area(tag: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            kind: ObjectKind::Area,
            tag: tag.into(),
            display_name: display_name.into(),
            area_tag: None,
        }
    }

    pub fn instance(
        instance_type: InstanceType,
        tag: impl Into<String>,
        display_name: impl Into<String>,
        area_tag: impl Into<String>,
    ) -> Self {
        Self {
            kind: ObjectKind::Instance(instance_type),
            tag: tag.into(),
            display_name: display_name.into(),
            area_tag: Some(area_tag.into()),
        }
    }

    pub fn blueprint(
        instance_type: InstanceType,
        resref: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            kind: ObjectKind::Blueprint(instance_type),
            tag: resref.into(),
            display_name: display_name.into(),
            area_tag: None,
        }
    }

    /// Target type for scripts hooked onto this object, if it has hooks.
    pub fn target_type(&self) -> Option<TargetType> {
        match self.kind {
            ObjectKind::Module => Some(TargetType::Module),
            ObjectKind::Area => Some(TargetType::Area),
            ObjectKind::Instance(t) => t.target_type(),
            ObjectKind::Player | ObjectKind::Blueprint(_) => None,
        }
    }
}

impl Render for ObjectRef {
    fn render(&self, channel: Channel) -> Result<String> {
        Ok(match channel {
            Channel::NaturalLanguage => self.display_name.clone(),
            Channel::Code => match self.kind {
                ObjectKind::Module => "GetModule()".to_string(),
                ObjectKind::Player => "GetFirstPC()".to_string(),
                ObjectKind::Area | ObjectKind::Instance(_) => self.tag.clone(),
                ObjectKind::Blueprint(_) => format!("\"{}\"", escape_string(&self.tag)),
            },
        })
    }
}

/// Reference to a script hook, e.g. `OnDeath`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRef {
    hook: String,
}

impl EventRef {
    pub fn new(hook: &str) -> Result<Self> {
        if !hooks::is_known_hook(hook) {
            return Err(CompositionError::UnknownHook(hook.to_string()));
        }
        Ok(Self {
            hook: hook.to_string(),
        })
    }

    pub fn hook(&self) -> &str {
        &self.hook
    }

    pub fn phrase(&self) -> &'static str {
        hooks::hook_phrase(&self.hook).unwrap_or("fires")
    }
}

impl Render for EventRef {
    fn render(&self, channel: Channel) -> Result<String> {
        Ok(match channel {
            Channel::Code => self.hook.clone(),
            Channel::NaturalLanguage => self.phrase().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_render_identically_in_both_channels() {
        for value in [Value::Integer(5), Value::Float(2.0), Value::Text("hi".into())] {
            assert_eq!(value.code().unwrap(), value.natural_language().unwrap());
        }
        assert_eq!(Value::Float(2.0).code().unwrap(), "2.0");
        assert_eq!(Value::Float(0.25).code().unwrap(), "0.25");
    }

    #[test]
    fn text_is_quoted_and_escaped() {
        let v = Value::Text("say \"hi\"".into());
        assert_eq!(v.code().unwrap(), r#""say \"hi\"""#);
        let v = Value::Text("line one\r\nline two".into());
        assert_eq!(v.code().unwrap(), r#""line one\r\nline two""#);
    }

    #[test]
    fn objects_render_tag_and_name() {
        let goblin = ObjectRef::instance(InstanceType::Creature, "goblin_01", "the goblin", "forest");
        assert_eq!(goblin.code().unwrap(), "goblin_01");
        assert_eq!(goblin.natural_language().unwrap(), "the goblin");
        assert_eq!(ObjectRef::player().code().unwrap(), "GetFirstPC()");
        assert_eq!(ObjectRef::module().target_type(), Some(TargetType::Module));
        let item = ObjectRef::instance(InstanceType::Item, "sword", "sword", "forest");
        assert_eq!(item.target_type(), None);
    }

    #[test]
    fn events_must_name_a_known_hook() {
        assert_eq!(EventRef::new("OnDeath").unwrap().phrase(), "dies");
        assert!(matches!(
            EventRef::new("OnNothing"),
            Err(CompositionError::UnknownHook(_))
        ));
    }
}
