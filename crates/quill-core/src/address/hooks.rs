//! Script hooks known to the host world.
//!
//! Every scriptable target type exposes a fixed set of named hooks
//! (`OnDeath`, `OnModuleLoad`, ...). Event blocks name one of these hooks and
//! addresses may only point at a hook the target type actually has.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::AddressError;

/// The closed set of things a script can be attached to by hook name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TargetType {
    Module,
    Area,
    Creature,
    Door,
    Placeable,
    Trigger,
    Encounter,
    Store,
}

const MODULE_SLOTS: &[&str] = &[
    "OnAcquireItem",
    "OnActivateItem",
    "OnChat",
    "OnClientEnter",
    "OnClientLeave",
    "OnCutsceneAbort",
    "OnHeartbeat",
    "OnModuleLoad",
    "OnModuleStart",
    "OnPCLoaded",
    "OnPlayerDeath",
    "OnPlayerDying",
    "OnPlayerEquipItem",
    "OnPlayerLevelUp",
    "OnPlayerRespawn",
    "OnPlayerRest",
    "OnPlayerUnequipItem",
    "OnUnacquireItem",
    "OnUserDefined",
];

const AREA_SLOTS: &[&str] = &[
    "OnClientEnterScript",
    "OnEnterScript",
    "OnExitScript",
    "OnHeartbeat",
    "OnUserDefined",
];

const CREATURE_SLOTS: &[&str] = &[
    "OnBlocked",
    "OnConversation",
    "OnDamaged",
    "OnDeath",
    "OnEndCombatRound",
    "OnHeartbeat",
    "OnInventoryDisturbed",
    "OnPerception",
    "OnPhysicalAttacked",
    "OnRested",
    "OnSpawnIn",
    "OnSpellCastAt",
    "OnUserDefined",
];

const DOOR_SLOTS: &[&str] = &[
    "OnClick",
    "OnClosed",
    "OnConversation",
    "OnDamaged",
    "OnDeath",
    "OnDisarm",
    "OnFailToOpen",
    "OnHeartbeat",
    "OnLock",
    "OnMeleeAttacked",
    "OnOpen",
    "OnSpellCastAt",
    "OnTrapTriggered",
    "OnUnlock",
    "OnUsed",
    "OnUserDefined",
];

const PLACEABLE_SLOTS: &[&str] = &[
    "OnClosed",
    "OnConversation",
    "OnDamaged",
    "OnDeath",
    "OnDisarm",
    "OnHeartbeat",
    "OnInvDisturbed",
    "OnLeftClick",
    "OnLock",
    "OnMeleeAttacked",
    "OnOpen",
    "OnSpellCastAt",
    "OnTrapTriggered",
    "OnUnlock",
    "OnUsed",
    "OnUserDefined",
];

const TRIGGER_SLOTS: &[&str] = &[
    "OnClick",
    "OnDisarm",
    "OnEnter",
    "OnExit",
    "OnHeartbeat",
    "OnTrapTriggered",
    "OnUserDefined",
];

const ENCOUNTER_SLOTS: &[&str] = &[
    "OnEntered",
    "OnExhausted",
    "OnExit",
    "OnHeartbeat",
    "OnUserDefined",
];

const STORE_SLOTS: &[&str] = &["OnOpenStore", "OnStoreClosed"];

/// Natural-language phrase for each hook, completing "when <subject> ...".
const HOOK_PHRASES: &[(&str, &str)] = &[
    ("OnAcquireItem", "acquires an item"),
    ("OnActivateItem", "has an item activated"),
    ("OnBlocked", "is blocked"),
    ("OnChat", "hears someone chat"),
    ("OnClick", "is clicked"),
    ("OnClientEnter", "is joined by a player"),
    ("OnClientEnterScript", "is entered by a player"),
    ("OnClientLeave", "is left by a player"),
    ("OnClosed", "is closed"),
    ("OnConversation", "is spoken to"),
    ("OnCutsceneAbort", "has a cutscene skipped"),
    ("OnDamaged", "is damaged"),
    ("OnDeath", "dies"),
    ("OnDisarm", "is disarmed"),
    ("OnEndCombatRound", "finishes a round of combat"),
    ("OnEnter", "is entered"),
    ("OnEnterScript", "is entered"),
    ("OnEntered", "is entered"),
    ("OnExhausted", "runs out of creatures"),
    ("OnExit", "is exited"),
    ("OnExitScript", "is exited"),
    ("OnFailToOpen", "fails to open"),
    ("OnHeartbeat", "has a heartbeat"),
    ("OnInvDisturbed", "has its inventory disturbed"),
    ("OnInventoryDisturbed", "has its inventory disturbed"),
    ("OnLeftClick", "is clicked"),
    ("OnLock", "is locked"),
    ("OnMeleeAttacked", "is attacked"),
    ("OnModuleLoad", "loads"),
    ("OnModuleStart", "starts"),
    ("OnOpen", "is opened"),
    ("OnOpenStore", "opens for business"),
    ("OnPCLoaded", "finishes loading a player"),
    ("OnPerception", "notices someone"),
    ("OnPhysicalAttacked", "is attacked"),
    ("OnPlayerDeath", "sees a player die"),
    ("OnPlayerDying", "sees a player start dying"),
    ("OnPlayerEquipItem", "sees a player equip an item"),
    ("OnPlayerLevelUp", "sees a player level up"),
    ("OnPlayerRespawn", "sees a player respawn"),
    ("OnPlayerRest", "sees a player rest"),
    ("OnPlayerUnequipItem", "sees a player unequip an item"),
    ("OnRested", "rests"),
    ("OnSpawnIn", "appears"),
    ("OnSpellCastAt", "is targeted by a spell"),
    ("OnStoreClosed", "closes for business"),
    ("OnTrapTriggered", "has its trap sprung"),
    ("OnUnacquireItem", "loses an item"),
    ("OnUnlock", "is unlocked"),
    ("OnUsed", "is used"),
    ("OnUserDefined", "receives a custom event"),
];

impl TargetType {
    pub const ALL: [TargetType; 8] = [
        TargetType::Module,
        TargetType::Area,
        TargetType::Creature,
        TargetType::Door,
        TargetType::Placeable,
        TargetType::Trigger,
        TargetType::Encounter,
        TargetType::Store,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TargetType::Module => "Module",
            TargetType::Area => "Area",
            TargetType::Creature => "Creature",
            TargetType::Door => "Door",
            TargetType::Placeable => "Placeable",
            TargetType::Trigger => "Trigger",
            TargetType::Encounter => "Encounter",
            TargetType::Store => "Store",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// True for target types that live inside an area and carry their own tag.
    pub fn is_instance(&self) -> bool {
        !matches!(self, TargetType::Module | TargetType::Area)
    }

    /// Number of delimited fields in the canonical address string.
    pub(crate) fn field_count(&self) -> usize {
        match self {
            TargetType::Module => 2,
            TargetType::Area => 3,
            _ => 4,
        }
    }

    pub fn script_slots(&self) -> &'static [&'static str] {
        match self {
            TargetType::Module => MODULE_SLOTS,
            TargetType::Area => AREA_SLOTS,
            TargetType::Creature => CREATURE_SLOTS,
            TargetType::Door => DOOR_SLOTS,
            TargetType::Placeable => PLACEABLE_SLOTS,
            TargetType::Trigger => TRIGGER_SLOTS,
            TargetType::Encounter => ENCOUNTER_SLOTS,
            TargetType::Store => STORE_SLOTS,
        }
    }

    pub fn has_slot(&self, slot: &str) -> bool {
        self.script_slots().contains(&slot)
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TargetType {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| AddressError::InvalidField {
            field: "target type",
            reason: format!("'{s}' is not a scriptable target type"),
        })
    }
}

/// Whether any target type exposes a hook of this name.
pub fn is_known_hook(hook: &str) -> bool {
    TargetType::ALL.iter().any(|t| t.has_slot(hook))
}

/// Phrase describing what happens when the hook fires ("dies", "is opened").
pub fn hook_phrase(hook: &str) -> Option<&'static str> {
    HOOK_PHRASES
        .iter()
        .find(|(name, _)| *name == hook)
        .map(|(_, phrase)| *phrase)
}

/// Target types which expose the given hook.
pub fn targets_with_hook(hook: &str) -> Vec<TargetType> {
    TargetType::ALL
        .into_iter()
        .filter(|t| t.has_slot(hook))
        .collect()
}
