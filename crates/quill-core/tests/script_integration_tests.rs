use pretty_assertions::assert_eq;
use quill_core::blocks::{InstanceType, ObjectRef, Trigger};
use quill_core::{
    Address, AttachedAs, ConversationAddress, Library, Node, NodeKind, Render, Script,
    ScriptSource, ScriptStats, XmlCodec,
};
use uuid::Uuid;

fn goblin() -> Node {
    Node::object(ObjectRef::instance(
        InstanceType::Creature,
        "goblin",
        "goblin",
        "forest",
    ))
}

fn statement(library: &Library, id: &str, arguments: Vec<Node>) -> Node {
    let mut node = library.create(id).unwrap();
    let statement = node.as_statement_mut().unwrap();
    for (index, argument) in arguments.into_iter().enumerate() {
        statement.fill(index, argument).unwrap();
    }
    node
}

fn on_death_of_goblin() -> Node {
    let mut trigger = Node::event_trigger();
    match trigger.as_trigger_mut().unwrap() {
        Trigger::Event(t) => {
            t.raiser_mut().assign(goblin()).unwrap();
            t.event_mut().assign(Node::event("OnDeath").unwrap()).unwrap();
        }
        Trigger::Conversation(_) => unreachable!(),
    }
    trigger
}

/// Death script with an if/else guarded by a compound condition.
fn guarded_reward(library: &Library) -> Script {
    let mut script = Script::with_trigger(on_death_of_goblin()).unwrap();

    let mut not = Node::not();
    not.as_boolean_mut().unwrap().operands_mut()[0]
        .assign(statement(library, "in-combat", vec![Node::object(ObjectRef::player())]))
        .unwrap();
    let mut and = Node::and(2).unwrap();
    {
        let operands = and.as_boolean_mut().unwrap().operands_mut();
        operands[0]
            .assign(statement(library, "is-dead", vec![goblin()]))
            .unwrap();
        operands[1].assign(not).unwrap();
    }

    let mut branch = Node::if_else_block();
    let control = branch.as_control_mut().unwrap();
    control.condition_mut().assign(and).unwrap();
    control
        .body_mut()
        .push(statement(
            library,
            "give-gold",
            vec![Node::integer(5), Node::object(ObjectRef::player())],
        ))
        .unwrap();
    control
        .otherwise_mut()
        .unwrap()
        .push(statement(
            library,
            "give-xp",
            vec![Node::integer(50), Node::object(ObjectRef::player())],
        ))
        .unwrap();

    script.spine_mut().push(branch).unwrap();
    script
}

#[test]
fn test_guarded_reward_compiles() {
    let library = Library::standard().unwrap();
    let script = guarded_reward(&library);
    assert!(script.is_complete());

    let source = script.compile().unwrap();
    assert_eq!(source.address.to_string(), "Creature|OnDeath|forest|goblin");
    assert_eq!(
        source.body(),
        "if ((GetIsDead(goblin) && !(GetIsInCombat(GetFirstPC())))) {\n    \
         GiveGoldToCreature(GetFirstPC(),5,TRUE);\n} else {\n    \
         GiveXPToCreature(GetFirstPC(),50);\n}"
    );
    assert_eq!(
        source.natural_language,
        "when goblin dies, if goblin is dead and it is not the case that the player is in combat, \
         then the player gets 5 gold coins, otherwise the player gains 50 experience points"
    );
    assert_eq!(ScriptSource::recover(&source.code).unwrap(), source.address);
}

#[test]
fn test_xml_round_trip_preserves_rendering() {
    let library = Library::standard().unwrap();
    let codec = XmlCodec::new(&library);
    let script = guarded_reward(&library);

    let xml = codec.script_to_xml(&script).unwrap();
    let restored = codec.script_from_xml(&xml).unwrap();

    assert_eq!(restored.code().unwrap(), script.code().unwrap());
    assert_eq!(
        restored.natural_language().unwrap(),
        script.natural_language().unwrap()
    );
    assert_eq!(restored.statistics(), script.statistics());
    // Saving again yields the same document.
    assert_eq!(codec.script_to_xml(&restored).unwrap(), xml);
}

#[test]
fn test_incomplete_script_survives_save_and_load() {
    let library = Library::standard().unwrap();
    let codec = XmlCodec::new(&library);
    let mut script = Script::new();
    script.spine_mut().push(library.create("give-gold").unwrap()).unwrap();
    script.spine_mut().push(Node::while_block()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("draft.xml");
    codec.save_script(&script, &path).unwrap();
    let restored = codec.load_script(&path).unwrap();

    assert!(!restored.is_complete());
    assert!(restored.trigger().is_empty());
    assert_eq!(restored.code().unwrap(), script.code().unwrap());
}

#[test]
fn test_conversation_script_round_trip() {
    let library = Library::standard().unwrap();
    let codec = XmlCodec::new(&library);
    let line = Uuid::new_v4();
    let address = ConversationAddress::new("innkeeper", line, AttachedAs::Conditional).unwrap();
    let mut script = Script::with_trigger(Node::conversation_trigger(address.clone())).unwrap();
    script
        .spine_mut()
        .push(statement(
            &library,
            "speak",
            vec![goblin(), Node::text("Welcome, \"friend\"")],
        ))
        .unwrap();

    let source = script.compile().unwrap();
    assert_eq!(source.address, Address::Conversation(address));
    assert!(source
        .natural_language
        .starts_with("when deciding whether to offer line"));

    let restored = codec
        .script_from_xml(&codec.script_to_xml(&script).unwrap())
        .unwrap();
    assert_eq!(restored.compile().unwrap(), source);
}

#[test]
fn test_statistics_accumulate_across_scripts() {
    let library = Library::standard().unwrap();
    let first = guarded_reward(&library);
    let second = guarded_reward(&library);

    let total: ScriptStats = [first.statistics(), second.statistics()].into_iter().sum();
    assert_eq!(total.scripts, 2);
    assert_eq!(total.statement_count("give-gold"), 2);
    assert_eq!(total.statement_count("in-combat"), 2);
    assert_eq!(total.total_nodes(), first.statistics().total_nodes() * 2);
}

#[test]
fn test_deep_copy_renders_identically_with_new_ids() {
    let library = Library::standard().unwrap();
    let script = guarded_reward(&library);
    let copy = script.deep_copy();

    assert_eq!(copy.code().unwrap(), script.code().unwrap());
    let mut originals = Vec::new();
    script.for_each_node(&mut |n| originals.push(n.id()));
    copy.for_each_node(&mut |n| assert!(!originals.contains(&n.id())));
}

/// One representative node per kind, with object references of every form.
fn node_of_every_kind(library: &Library) -> Vec<(&'static str, Node)> {
    let mut if_block = Node::if_block();
    if_block
        .as_control_mut()
        .unwrap()
        .body_mut()
        .push(statement(library, "kill", vec![goblin()]))
        .unwrap();

    let mut while_block = Node::while_block();
    {
        let control = while_block.as_control_mut().unwrap();
        control
            .condition_mut()
            .assign(statement(library, "in-combat", vec![goblin()]))
            .unwrap();
        control
            .body_mut()
            .push(statement(
                library,
                "attack",
                vec![goblin(), Node::object(ObjectRef::player())],
            ))
            .unwrap();
    }

    let mut or = Node::or(2).unwrap();
    {
        let operands = or.as_boolean_mut().unwrap().operands_mut();
        operands[0]
            .assign(statement(library, "is-dead", vec![goblin()]))
            .unwrap();
    }

    let mut and = Node::and(3).unwrap();
    and.as_boolean_mut().unwrap().operands_mut()[2]
        .assign(statement(library, "in-combat", vec![Node::object(ObjectRef::player())]))
        .unwrap();

    let mut not = Node::not();
    not.as_boolean_mut().unwrap().operands_mut()[0]
        .assign(statement(library, "is-dead", vec![Node::object(ObjectRef::player())]))
        .unwrap();

    let mut if_else = Node::if_else_block();
    if_else
        .as_control_mut()
        .unwrap()
        .otherwise_mut()
        .unwrap()
        .push(statement(library, "kill", vec![Node::object(ObjectRef::player())]))
        .unwrap();

    let line = ConversationAddress::new("intro", Uuid::new_v4(), AttachedAs::Conditional).unwrap();

    vec![
        ("integer", Node::integer(-12)),
        ("float", Node::float(2.5)),
        ("text", Node::text("a \"quoted\" line with <markup> & more")),
        ("module", Node::object(ObjectRef::module())),
        ("area", Node::object(ObjectRef::area("forest", "the dark forest"))),
        ("player", Node::object(ObjectRef::player())),
        ("instance", goblin()),
        (
            "blueprint",
            Node::object(ObjectRef::blueprint(InstanceType::Placeable, "chest_01", "a chest")),
        ),
        ("event", Node::event("OnHeartbeat").unwrap()),
        (
            "action",
            statement(library, "speak", vec![goblin(), Node::text("Grr!")]),
        ),
        ("condition", statement(library, "is-dead", vec![goblin()])),
        ("if", if_block),
        ("if-else", if_else),
        ("while", while_block),
        ("and", and),
        ("or", or),
        ("not", not),
        ("event trigger", on_death_of_goblin()),
        ("conversation trigger", Node::conversation_trigger(line)),
    ]
}

#[test]
fn test_every_node_kind_survives_xml() {
    let library = Library::standard().unwrap();
    let codec = XmlCodec::new(&library);
    let nodes = node_of_every_kind(&library);

    for kind in NodeKind::ALL {
        assert!(
            nodes.iter().any(|(_, node)| node.kind() == kind),
            "no sample for {kind}"
        );
    }

    for (label, node) in nodes {
        let xml = codec.node_to_xml(&node).unwrap();
        let back = codec.node_from_xml(&xml).unwrap();
        assert_eq!(back.kind(), node.kind(), "{label}");
        assert_eq!(back.code().unwrap(), node.code().unwrap(), "{label}");
        assert_eq!(
            back.natural_language().unwrap(),
            node.natural_language().unwrap(),
            "{label}"
        );
        assert_eq!(back.is_complete(), node.is_complete(), "{label}");
    }
}
