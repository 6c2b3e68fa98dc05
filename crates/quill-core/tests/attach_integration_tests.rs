use quill_core::blocks::{InstanceType, ObjectRef, Trigger};
use quill_core::{
    Address, AttachError, AttachedAs, Attacher, ConversationAddress, IdentityTranslator, Library,
    Node, ObjectAddress, QuillConfig, Script, ScriptSource, TargetType, Translator,
};
use uuid::Uuid;

/// Translator that upper-cases its input and refuses anything mentioning `forbidden`.
struct ShoutingTranslator;

impl Translator for ShoutingTranslator {
    fn target_language(&self) -> &str {
        "SHOUT"
    }

    fn translate(&self, source: &str) -> Result<String, AttachError> {
        if source.contains("forbidden") {
            return Err(AttachError::CompileRejected {
                name: String::new(),
                reason: "forbidden word".to_string(),
            });
        }
        Ok(source.to_uppercase())
    }
}

fn door_script(library: &Library) -> Script {
    let door = Node::object(ObjectRef::instance(
        InstanceType::Door,
        "cellar_door",
        "the cellar door",
        "tavern",
    ));
    let mut trigger = Node::event_trigger();
    if let Some(Trigger::Event(t)) = trigger.as_trigger_mut() {
        t.raiser_mut().assign(door.deep_copy()).unwrap();
        t.event_mut().assign(Node::event("OnOpen").unwrap()).unwrap();
    }
    let mut script = Script::with_trigger(trigger).unwrap();
    let mut lock = library.create("lock").unwrap();
    lock.as_statement_mut().unwrap().fill(0, door).unwrap();
    script.spine_mut().push(lock).unwrap();
    script
}

#[test]
fn test_compiled_script_attaches_at_its_own_address() {
    let library = Library::standard().unwrap();
    let source = door_script(&library).compile().unwrap();
    let mut attacher = QuillConfig::default()
        .memory_attacher(IdentityTranslator)
        .with_instance(TargetType::Door, "tavern", "cellar_door");

    let name = attacher.attach(&source, &source.address).unwrap();
    assert_eq!(name, "quill_1");
    assert_eq!(attacher.game().name, "Neverwinter Nights 2");
    assert_eq!(attacher.attached_at(&source.address), Some("quill_1"));
    assert!(attacher
        .script(&name)
        .unwrap()
        .code
        .ends_with("SetLocked(cellar_door,TRUE);"));
}

#[test]
fn test_removed_area_makes_target_unknown() {
    let library = Library::standard().unwrap();
    let source = door_script(&library).compile().unwrap();
    let mut attacher = QuillConfig::default()
        .memory_attacher(IdentityTranslator)
        .with_instance(TargetType::Door, "tavern", "cellar_door");
    attacher.remove_area("tavern");

    assert!(matches!(
        attacher.attach(&source, &source.address),
        Err(AttachError::TargetNotFound(_))
    ));
    assert_eq!(attacher.scripts().count(), 0);
}

#[test]
fn test_translator_rejection_names_the_script() {
    let address: Address = ObjectAddress::module("OnModuleLoad").unwrap().into();
    let source = ScriptSource {
        code: format!("// quill-address: {address}\nforbidden();"),
        natural_language: String::new(),
        address: address.clone(),
    };
    let mut attacher = QuillConfig::default().memory_attacher(ShoutingTranslator);

    match attacher.attach_named("startup", &source, &address) {
        Err(AttachError::CompileRejected { name, reason }) => {
            assert_eq!(name, "startup");
            assert_eq!(reason, "forbidden word");
        }
        other => panic!("expected a compile rejection, got {other:?}"),
    }
    assert!(attacher.resources().loaded().next().is_none());
}

#[test]
fn test_conversation_line_must_exist() {
    let line = Uuid::new_v4();
    let address: Address = ConversationAddress::new("innkeeper", line, AttachedAs::Standard)
        .unwrap()
        .into();
    let source = ScriptSource {
        code: format!("// quill-address: {address}\nfoo();"),
        natural_language: String::new(),
        address: address.clone(),
    };

    let mut attacher = QuillConfig::default()
        .memory_attacher(ShoutingTranslator)
        .with_conversation("innkeeper", [Uuid::new_v4()]);
    assert!(matches!(
        attacher.attach(&source, &address),
        Err(AttachError::TargetNotFound(_))
    ));

    let mut attacher = attacher.with_conversation("innkeeper", [line]);
    let name = attacher.attach(&source, &address).unwrap();
    assert!(attacher.script(&name).unwrap().code.ends_with("FOO();"));
}

#[test]
fn test_translate_to_file_writes_translation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.nss");
    ShoutingTranslator.translate_to_file("foo();", &path).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "FOO();");

    let err = ShoutingTranslator
        .translate_to_file("forbidden();", &dir.path().join("never.nss"))
        .unwrap_err();
    assert!(matches!(err, AttachError::CompileRejected { .. }));
    assert!(!dir.path().join("never.nss").exists());
}
