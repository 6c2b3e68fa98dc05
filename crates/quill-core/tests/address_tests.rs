use quill_core::address::hooks::{hook_phrase, targets_with_hook};
use quill_core::{Address, AddressError, AttachedAs, ConversationAddress, ObjectAddress, TargetType};
use uuid::Uuid;

#[test]
fn test_each_grammar_reparses_to_itself() {
    let line = Uuid::parse_str("6f9619ff-8b86-d011-b42d-00c04fc964ff").unwrap();
    let addresses: Vec<Address> = vec![
        ObjectAddress::module("OnModuleLoad").unwrap().into(),
        ObjectAddress::area("OnEnterScript", "forest").unwrap().into(),
        ObjectAddress::instance(TargetType::Placeable, "OnUsed", "forest", "chest")
            .unwrap()
            .into(),
        ConversationAddress::new("innkeeper", line, AttachedAs::Conditional)
            .unwrap()
            .into(),
    ];
    let expected = [
        "Module|OnModuleLoad",
        "Area|OnEnterScript|forest",
        "Placeable|OnUsed|forest|chest",
        "Conversation|innkeeper|6f9619ff-8b86-d011-b42d-00c04fc964ff|Conditional",
    ];

    for (address, text) in addresses.iter().zip(expected) {
        assert_eq!(address.to_string(), text);
        assert_eq!(&text.parse::<Address>().unwrap(), address);
        assert_eq!(Address::try_parse(text).as_ref(), Some(address));
    }
}

#[test]
fn test_wrong_field_counts_are_rejected() {
    for text in [
        "Module",
        "Module|OnModuleLoad|forest",
        "Area|OnEnterScript",
        "Creature|OnDeath|forest",
        "Creature|OnDeath|forest|goblin|extra",
        "Conversation|innkeeper|6f9619ff-8b86-d011-b42d-00c04fc964ff",
    ] {
        let err = text.parse::<Address>().unwrap_err();
        assert!(err.is_format_error(), "{text}: {err}");
        assert!(Address::try_parse(text).is_none());
    }
}

#[test]
fn test_conversation_fields_are_validated() {
    assert!(matches!(
        "Conversation|innkeeper|not-a-uuid|Standard".parse::<Address>(),
        Err(AddressError::Malformed { .. })
    ));
    assert!(matches!(
        "Conversation|innkeeper|6f9619ff-8b86-d011-b42d-00c04fc964ff|Sometimes"
            .parse::<Address>(),
        Err(AddressError::Malformed { .. })
    ));
    assert!(ConversationAddress::new("", Uuid::nil(), AttachedAs::Standard).is_err());
}

#[test]
fn test_slot_must_belong_to_target_type() {
    // Doors are never spawned.
    let err = ObjectAddress::instance(TargetType::Door, "OnSpawnIn", "keep", "gate").unwrap_err();
    assert_eq!(
        err,
        AddressError::UnrecognisedSlot {
            target_type: TargetType::Door,
            slot: "OnSpawnIn".to_string(),
        }
    );
    assert!(targets_with_hook("OnDeath").contains(&TargetType::Creature));
    assert_eq!(hook_phrase("OnDeath"), Some("dies"));
}
