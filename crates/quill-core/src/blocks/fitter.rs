use super::{Block, Category, Node};
use crate::blocks::value::InstanceType;

/// Compatibility predicate deciding which nodes a slot or spine accepts.
///
/// `fits` is total and has no side effects. Fitters compose with
/// [`Fitter::union`] and [`Fitter::negate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fitter {
    Anything,
    Nothing,
    /// Match on the node tag; `subtype: None` accepts every subtype
    Tag {
        category: Category,
        subtype: Option<String>,
    },
    /// Action statements and control structures, i.e. anything a spine can hold
    Actions,
    /// Condition statements only
    Conditions,
    /// Condition statements and boolean composites
    BooleanExpressions,
    Triggers,
    /// Objects that have script hooks of their own
    ScriptOwners,
    Union(Vec<Fitter>),
    Negate(Box<Fitter>),
}

impl Fitter {
    pub fn category(category: Category) -> Self {
        Fitter::Tag {
            category,
            subtype: None,
        }
    }

    pub fn tag(category: Category, subtype: impl Into<String>) -> Self {
        Fitter::Tag {
            category,
            subtype: Some(subtype.into()),
        }
    }

    pub fn numbers() -> Self {
        Self::category(Category::Number)
    }

    pub fn strings() -> Self {
        Self::category(Category::String)
    }

    pub fn events() -> Self {
        Self::category(Category::Event)
    }

    pub fn instance(instance_type: InstanceType) -> Self {
        Self::tag(Category::Instance, instance_type.name())
    }

    pub fn any_instance() -> Self {
        Self::category(Category::Instance)
    }

    pub fn player() -> Self {
        Self::category(Category::Player)
    }

    /// "creature or player", the usual recipient of an action.
    pub fn creature_or_player() -> Self {
        Self::instance(InstanceType::Creature).union(Self::player())
    }

    pub fn union(self, other: Fitter) -> Fitter {
        let mut members = match self {
            Fitter::Union(members) => members,
            single => vec![single],
        };
        match other {
            Fitter::Union(more) => members.extend(more),
            single => members.push(single),
        }
        Fitter::Union(members)
    }

    pub fn negate(self) -> Fitter {
        match self {
            Fitter::Negate(inner) => *inner,
            other => Fitter::Negate(Box::new(other)),
        }
    }

    pub fn fits(&self, node: &Node) -> bool {
        match self {
            Fitter::Anything => true,
            Fitter::Nothing => false,
            Fitter::Tag { category, subtype } => {
                let tag = node.tag();
                tag.category == *category
                    && subtype
                        .as_deref()
                        .map_or(true, |s| tag.subtype.as_deref() == Some(s))
            }
            Fitter::Actions => matches!(
                node.tag().category,
                Category::Action | Category::Control
            ),
            Fitter::Conditions => node.tag().category == Category::Condition,
            Fitter::BooleanExpressions => matches!(
                node.tag().category,
                Category::Condition | Category::Boolean
            ),
            Fitter::Triggers => node.tag().category == Category::Trigger,
            Fitter::ScriptOwners => {
                matches!(node.block(), Block::Object(o) if o.target_type().is_some())
            }
            Fitter::Union(members) => members.iter().any(|f| f.fits(node)),
            Fitter::Negate(inner) => !inner.fits(node),
        }
    }

    /// Noun phrase for what fits, used in messages and empty-slot text.
    pub fn describe(&self) -> String {
        match self {
            Fitter::Anything => "anything".to_string(),
            Fitter::Nothing => "nothing".to_string(),
            Fitter::Tag { category, subtype } => describe_tag(*category, subtype.as_deref()),
            Fitter::Actions => "action".to_string(),
            Fitter::Conditions | Fitter::BooleanExpressions => "condition".to_string(),
            Fitter::Triggers => "trigger".to_string(),
            Fitter::ScriptOwners => "scripted object".to_string(),
            Fitter::Union(members) => members
                .iter()
                .map(Fitter::describe)
                .collect::<Vec<_>>()
                .join(" or "),
            Fitter::Negate(inner) => format!("anything but {}", inner.describe()),
        }
    }

    /// Natural-language stand-in for an empty slot.
    pub fn placeholder_phrase(&self) -> String {
        match self {
            Fitter::Anything => "something".to_string(),
            _ => format!("some {}", self.describe()),
        }
    }

    /// Code stand-in for an empty slot. Keeps partial scripts well formed.
    pub fn placeholder_code(&self) -> &'static str {
        match self {
            Fitter::Tag {
                category: Category::Number,
                ..
            } => "0",
            Fitter::Tag {
                category: Category::String,
                ..
            } => "\"\"",
            Fitter::Tag {
                category: Category::Condition | Category::Boolean,
                ..
            }
            | Fitter::Conditions
            | Fitter::BooleanExpressions => "FALSE",
            Fitter::Actions | Fitter::Triggers | Fitter::Nothing => "",
            Fitter::Union(members) => members
                .first()
                .map_or("OBJECT_INVALID", Fitter::placeholder_code),
            _ => "OBJECT_INVALID",
        }
    }
}

fn describe_tag(category: Category, subtype: Option<&str>) -> String {
    match (category, subtype) {
        (Category::Number, _) => "number".to_string(),
        (Category::String, _) => "piece of text".to_string(),
        (Category::Module, _) => "module".to_string(),
        (Category::Area, _) => "area".to_string(),
        (Category::Player, _) => "player".to_string(),
        (Category::Instance, Some(t)) => t.to_lowercase(),
        (Category::Instance, None) => "object".to_string(),
        (Category::Blueprint, Some(t)) => format!("{} blueprint", t.to_lowercase()),
        (Category::Blueprint, None) => "blueprint".to_string(),
        (Category::Event, _) => "event".to_string(),
        (Category::Action, _) => "action".to_string(),
        (Category::Condition | Category::Boolean, _) => "condition".to_string(),
        (Category::Control, _) => "control structure".to_string(),
        (Category::Trigger, _) => "trigger".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::ObjectRef;

    fn goblin() -> Node {
        Node::object(ObjectRef::instance(InstanceType::Creature, "goblin", "goblin", "forest"))
    }

    fn chest() -> Node {
        Node::object(ObjectRef::instance(InstanceType::Placeable, "chest", "old chest", "forest"))
    }

    #[test]
    fn tag_fitter_checks_subtype() {
        let creatures = Fitter::instance(InstanceType::Creature);
        assert!(creatures.fits(&goblin()));
        assert!(!creatures.fits(&chest()));
        assert!(Fitter::any_instance().fits(&chest()));
    }

    #[test]
    fn union_and_negate_compose() {
        let f = Fitter::creature_or_player();
        assert!(f.fits(&goblin()));
        assert!(f.fits(&Node::object(ObjectRef::player())));
        assert!(!f.fits(&chest()));
        assert!(f.clone().negate().fits(&chest()));
        assert_eq!(f.clone().negate().negate(), f);
        assert_eq!(f.describe(), "creature or player");
    }

    #[test]
    fn numbers_accept_integers_and_floats() {
        assert!(Fitter::numbers().fits(&Node::integer(3)));
        assert!(Fitter::numbers().fits(&Node::float(2.5)));
        assert!(!Fitter::numbers().fits(&Node::text("3")));
    }

    #[test]
    fn structural_fitters() {
        assert!(Fitter::Actions.fits(&Node::if_block()));
        assert!(!Fitter::Actions.fits(&Node::not()));
        assert!(Fitter::BooleanExpressions.fits(&Node::not()));
        assert!(!Fitter::Conditions.fits(&Node::not()));
        assert!(Fitter::ScriptOwners.fits(&goblin()));
        assert!(!Fitter::ScriptOwners.fits(&Node::object(ObjectRef::player())));
    }

    #[test]
    fn placeholders_follow_category() {
        assert_eq!(Fitter::numbers().placeholder_code(), "0");
        assert_eq!(Fitter::creature_or_player().placeholder_code(), "OBJECT_INVALID");
        assert_eq!(Fitter::BooleanExpressions.placeholder_code(), "FALSE");
        assert_eq!(
            Fitter::creature_or_player().placeholder_phrase(),
            "some creature or player"
        );
    }
}
