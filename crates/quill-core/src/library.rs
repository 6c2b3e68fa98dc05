//! Statement library: the registry every statement block is created from.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::blocks::{
    Behaviour, Block, CompositionError, Fitter, InstanceType, LayoutPart, Node, Result, Statement,
    StatementDefinition, StatementKind, TemplateBehaviour,
};

/// Registered statement definitions keyed by stable id, in registration order.
#[derive(Debug, Default, Clone)]
pub struct Library {
    definitions: IndexMap<String, Arc<StatementDefinition>>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in actions and conditions.
    pub fn standard() -> Result<Self> {
        let mut library = Self::new();
        for definition in standard_definitions()? {
            library.register(definition)?;
        }
        Ok(library)
    }

    pub fn register(&mut self, definition: StatementDefinition) -> Result<()> {
        if self.definitions.contains_key(definition.id()) {
            return Err(CompositionError::DuplicateStatement(
                definition.id().to_string(),
            ));
        }
        debug!(statement = definition.id(), "registered statement");
        self.definitions
            .insert(definition.id().to_string(), Arc::new(definition));
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Arc<StatementDefinition>> {
        self.definitions.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Create a fresh statement block with every slot empty.
    pub fn create(&self, id: &str) -> Result<Node> {
        let definition = self
            .get(id)
            .ok_or_else(|| CompositionError::UnknownStatement(id.to_string()))?;
        Ok(Node::new(Block::Statement(Statement::instantiate(
            Arc::clone(definition),
        ))))
    }

    pub fn definitions(&self) -> impl Iterator<Item = &Arc<StatementDefinition>> {
        self.definitions.values()
    }

    pub fn actions(&self) -> impl Iterator<Item = &Arc<StatementDefinition>> {
        self.definitions()
            .filter(|d| d.kind() == StatementKind::Action)
    }

    pub fn conditions(&self) -> impl Iterator<Item = &Arc<StatementDefinition>> {
        self.definitions()
            .filter(|d| d.kind() == StatementKind::Condition)
    }
}

enum Part {
    L(&'static str),
    P(Fitter),
}

struct Template {
    id: &'static str,
    kind: StatementKind,
    layout: Vec<Part>,
    code: &'static str,
    natural_language: &'static str,
    asynchronous: bool,
}

impl Template {
    fn build(self) -> Result<StatementDefinition> {
        let parameters = self
            .layout
            .iter()
            .filter(|p| matches!(p, Part::P(_)))
            .count();
        let mut behaviour =
            TemplateBehaviour::new(self.id, parameters, self.code, self.natural_language)?;
        if self.asynchronous {
            behaviour = behaviour.asynchronous();
        }
        let layout = self
            .layout
            .into_iter()
            .map(|part| match part {
                Part::L(text) => LayoutPart::label(text),
                Part::P(fitter) => LayoutPart::Parameter(fitter),
            })
            .collect();
        let behaviour: Arc<dyn Behaviour> = Arc::new(behaviour);
        StatementDefinition::new(self.id, self.kind, layout, behaviour)
    }
}

fn door_or_placeable() -> Fitter {
    Fitter::instance(InstanceType::Door).union(Fitter::instance(InstanceType::Placeable))
}

fn creature() -> Fitter {
    Fitter::instance(InstanceType::Creature)
}

fn standard_definitions() -> Result<Vec<StatementDefinition>> {
    use Part::{L, P};
    use StatementKind::{Action, Condition};

    let templates = vec![
        Template {
            id: "give-gold",
            kind: Action,
            layout: vec![
                L("give"),
                P(Fitter::numbers()),
                L("gold to"),
                P(Fitter::creature_or_player()),
            ],
            code: "GiveGoldToCreature({1},{0},TRUE);",
            natural_language: "{1} gets {0} gold coins",
            asynchronous: false,
        },
        Template {
            id: "give-xp",
            kind: Action,
            layout: vec![
                L("give"),
                P(Fitter::numbers()),
                L("experience to"),
                P(Fitter::creature_or_player()),
            ],
            code: "GiveXPToCreature({1},{0});",
            natural_language: "{1} gains {0} experience points",
            asynchronous: false,
        },
        Template {
            id: "attack",
            kind: Action,
            layout: vec![P(creature()), L("attacks"), P(Fitter::creature_or_player())],
            code: "AssignCommand({0},ActionAttack({1}));",
            natural_language: "{0} attacks {1}",
            asynchronous: true,
        },
        Template {
            id: "walk-to",
            kind: Action,
            layout: vec![
                P(Fitter::creature_or_player()),
                L("walks to"),
                P(Fitter::any_instance()),
            ],
            code: "AssignCommand({0},ActionMoveToObject({1}));",
            natural_language: "{0} walks to {1}",
            asynchronous: true,
        },
        Template {
            id: "speak",
            kind: Action,
            layout: vec![P(creature()), L("says"), P(Fitter::strings())],
            code: "AssignCommand({0},ActionSpeakString({1}));",
            natural_language: "{0} says {1}",
            asynchronous: true,
        },
        Template {
            id: "kill",
            kind: Action,
            layout: vec![L("kill"), P(Fitter::creature_or_player())],
            code: "ApplyEffectToObject(DURATION_TYPE_INSTANT,EffectDeath(),{0});",
            natural_language: "{0} dies",
            asynchronous: false,
        },
        Template {
            id: "destroy",
            kind: Action,
            layout: vec![L("destroy"), P(Fitter::any_instance())],
            code: "DestroyObject({0});",
            natural_language: "{0} disappears",
            asynchronous: false,
        },
        Template {
            id: "open",
            kind: Action,
            layout: vec![
                P(Fitter::creature_or_player()),
                L("opens"),
                P(door_or_placeable()),
            ],
            code: "AssignCommand({0},ActionOpenDoor({1}));",
            natural_language: "{0} opens {1}",
            asynchronous: true,
        },
        Template {
            id: "lock",
            kind: Action,
            layout: vec![L("lock"), P(door_or_placeable())],
            code: "SetLocked({0},TRUE);",
            natural_language: "{0} becomes locked",
            asynchronous: false,
        },
        Template {
            id: "is-dead",
            kind: Condition,
            layout: vec![P(Fitter::creature_or_player()), L("is dead")],
            code: "GetIsDead({0})",
            natural_language: "{0} is dead",
            asynchronous: false,
        },
        Template {
            id: "is-locked",
            kind: Condition,
            layout: vec![P(door_or_placeable()), L("is locked")],
            code: "GetLocked({0})",
            natural_language: "{0} is locked",
            asynchronous: false,
        },
        Template {
            id: "has-gold",
            kind: Condition,
            layout: vec![
                P(Fitter::creature_or_player()),
                L("has at least"),
                P(Fitter::numbers()),
                L("gold"),
            ],
            code: "GetGold({0}) >= {1}",
            natural_language: "{0} has at least {1} gold coins",
            asynchronous: false,
        },
        Template {
            id: "in-combat",
            kind: Condition,
            layout: vec![P(Fitter::creature_or_player()), L("is in combat")],
            code: "GetIsInCombat({0})",
            natural_language: "{0} is in combat",
            asynchronous: false,
        },
    ];

    templates.into_iter().map(Template::build).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::Render;

    #[test]
    fn standard_library_lists_actions_before_conditions() {
        let library = Library::standard().unwrap();
        assert_eq!(library.len(), 13);
        assert_eq!(library.actions().count(), 9);
        assert_eq!(library.conditions().count(), 4);
        assert_eq!(library.definitions().next().unwrap().id(), "give-gold");
    }

    #[test]
    fn create_builds_empty_statement() {
        let library = Library::standard().unwrap();
        let node = library.create("give-gold").unwrap();
        let statement = node.as_statement().unwrap();
        assert_eq!(statement.parameter_count(), 2);
        assert!(!node.is_complete());
        assert_eq!(
            node.code().unwrap(),
            "GiveGoldToCreature(OBJECT_INVALID,0,TRUE);"
        );
        assert_eq!(
            node.natural_language().unwrap(),
            "some creature or player gets some number gold coins"
        );
    }

    #[test]
    fn unknown_and_duplicate_ids_are_rejected() {
        let mut library = Library::standard().unwrap();
        assert!(matches!(
            library.create("dance"),
            Err(CompositionError::UnknownStatement(_))
        ));
        let again = standard_definitions().unwrap().remove(0);
        assert!(matches!(
            library.register(again),
            Err(CompositionError::DuplicateStatement(_))
        ));
    }

    #[test]
    fn asynchronous_flag_comes_from_behaviour() {
        let library = Library::standard().unwrap();
        assert!(library.get("attack").unwrap().is_asynchronous());
        assert!(!library.get("give-gold").unwrap().is_asynchronous());
        assert_eq!(
            library.get("give-gold").unwrap().signature(),
            "give [number] gold to [creature or player]"
        );
    }
}
