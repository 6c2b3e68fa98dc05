use indexmap::{IndexMap, IndexSet};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{AttachError, Attacher, GameInfo, ResourceTracker, Translator};
use crate::address::{Address, TargetType};
use crate::blocks::ScriptSource;

pub const DEFAULT_SCRIPT_PREFIX: &str = "quill_";

/// Pass-through translator: the intermediate source is already the target.
#[derive(Debug, Clone, Default)]
pub struct IdentityTranslator;

impl Translator for IdentityTranslator {
    fn target_language(&self) -> &str {
        "NWScript"
    }

    fn translate(&self, source: &str) -> Result<String, AttachError> {
        Ok(source.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedScript {
    pub name: String,
    pub address: Address,
    pub code: String,
}

/// Attacher keeping its namespace and world in memory.
#[derive(Debug)]
pub struct MemoryAttacher<T: Translator> {
    translator: T,
    game: GameInfo,
    prefix: String,
    areas: IndexSet<String>,
    /// (area tag, instance tag) → target type
    instances: IndexMap<(String, String), TargetType>,
    conversations: IndexMap<String, IndexSet<Uuid>>,
    scripts: IndexMap<String, AttachedScript>,
    attachments: IndexMap<Address, String>,
    resources: ResourceTracker,
}

impl<T: Translator> MemoryAttacher<T> {
    pub fn new(translator: T) -> Self {
        Self {
            translator,
            game: GameInfo::default(),
            prefix: DEFAULT_SCRIPT_PREFIX.to_string(),
            areas: IndexSet::new(),
            instances: IndexMap::new(),
            conversations: IndexMap::new(),
            scripts: IndexMap::new(),
            attachments: IndexMap::new(),
            resources: ResourceTracker::new(),
        }
    }

    pub fn with_game(mut self, game: GameInfo) -> Self {
        self.game = game;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_area(mut self, area: impl Into<String>) -> Self {
        self.add_area(area);
        self
    }

    pub fn with_instance(
        mut self,
        target_type: TargetType,
        area: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        self.add_instance(target_type, area, tag);
        self
    }

    pub fn with_conversation(
        mut self,
        conversation: impl Into<String>,
        lines: impl IntoIterator<Item = Uuid>,
    ) -> Self {
        self.add_conversation(conversation, lines);
        self
    }

    pub fn add_area(&mut self, area: impl Into<String>) {
        self.areas.insert(area.into());
    }

    /// Known instance; its area becomes known too.
    pub fn add_instance(
        &mut self,
        target_type: TargetType,
        area: impl Into<String>,
        tag: impl Into<String>,
    ) {
        let area = area.into();
        self.areas.insert(area.clone());
        self.instances.insert((area, tag.into()), target_type);
    }

    /// Lines of a conversation; no lines means any line is accepted.
    pub fn add_conversation(
        &mut self,
        conversation: impl Into<String>,
        lines: impl IntoIterator<Item = Uuid>,
    ) {
        self.conversations
            .entry(conversation.into())
            .or_default()
            .extend(lines);
    }

    pub fn translator(&self) -> &T {
        &self.translator
    }

    pub fn resources(&self) -> &ResourceTracker {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut ResourceTracker {
        &mut self.resources
    }

    pub fn script(&self, name: &str) -> Option<&AttachedScript> {
        self.scripts.get(name)
    }

    pub fn scripts(&self) -> impl Iterator<Item = &AttachedScript> {
        self.scripts.values()
    }

    /// Name of the script currently hooked at `address`.
    pub fn attached_at(&self, address: &Address) -> Option<&str> {
        self.attachments.get(address).map(String::as_str)
    }

    /// Host objects went away: forget the area and everything in it.
    pub fn remove_area(&mut self, area: &str) {
        self.areas.shift_remove(area);
        self.instances.retain(|(a, _), _| a != area);
    }

    /// Forget every instance tagged `tag`, in any area.
    pub fn remove_instance(&mut self, tag: &str) {
        self.instances.retain(|(_, t), _| t != tag);
    }

    /// Retag an area or instance. Scripts already attached keep the address
    /// they were attached under.
    pub fn rename_object(&mut self, old_tag: &str, new_tag: &str) {
        if self.areas.shift_remove(old_tag) {
            self.areas.insert(new_tag.to_string());
        }
        let renamed: IndexMap<_, _> = self
            .instances
            .drain(..)
            .map(|((area, tag), target_type)| {
                let area = if area == old_tag { new_tag.to_string() } else { area };
                let tag = if tag == old_tag { new_tag.to_string() } else { tag };
                ((area, tag), target_type)
            })
            .collect();
        self.instances = renamed;
    }

    pub fn remove_conversation(&mut self, conversation: &str) {
        self.conversations.shift_remove(conversation);
    }

    /// First `<prefix><n>` not yet used.
    pub fn next_free_name(&self) -> String {
        (1..)
            .map(|n| format!("{}{n}", self.prefix))
            .find(|name| !self.scripts.contains_key(name))
            .unwrap_or_else(|| format!("{}{}", self.prefix, Uuid::new_v4().simple()))
    }

    pub fn attach_named(
        &mut self,
        name: &str,
        source: &ScriptSource,
        address: &Address,
    ) -> Result<String, AttachError> {
        if self.scripts.contains_key(name) {
            return Err(AttachError::NameExists(name.to_string()));
        }
        check_marker(source, address)?;
        self.check_target(address)?;

        let resource = resource_for(address);
        self.resources.demand(&resource);
        let translated = self.translator.translate(&source.code);
        self.resources.release(&resource)?;

        let code = translated.map_err(|e| match e {
            AttachError::CompileRejected { reason, .. } => AttachError::CompileRejected {
                name: name.to_string(),
                reason,
            },
            other => other,
        })?;

        if let Some(previous) = self.attachments.insert(address.clone(), name.to_string()) {
            debug!(previous = %previous, %address, "replacing attached script");
        }
        self.scripts.insert(
            name.to_string(),
            AttachedScript {
                name: name.to_string(),
                address: address.clone(),
                code,
            },
        );
        info!(name, %address, language = self.translator.target_language(), "script attached");
        Ok(name.to_string())
    }

    /// Remove a script from the namespace and unhook it.
    pub fn detach(&mut self, name: &str) -> Option<AttachedScript> {
        let script = self.scripts.shift_remove(name)?;
        if self.attachments.get(&script.address).map(String::as_str) == Some(name) {
            self.attachments.shift_remove(&script.address);
        }
        Some(script)
    }

    fn check_target(&self, address: &Address) -> Result<(), AttachError> {
        let found = match address {
            Address::Object(a) => match a.target_type() {
                TargetType::Module => true,
                TargetType::Area => a.area_tag().is_some_and(|t| self.areas.contains(t)),
                t => match (a.area_tag(), a.instance_tag()) {
                    (Some(area), Some(tag)) => self
                        .instances
                        .get(&(area.to_string(), tag.to_string()))
                        .is_some_and(|known| *known == t),
                    _ => false,
                },
            },
            Address::Conversation(a) => self
                .conversations
                .get(a.conversation())
                .is_some_and(|lines| lines.is_empty() || lines.contains(&a.line_id())),
        };
        if found {
            Ok(())
        } else {
            warn!(%address, "attach target not found");
            Err(AttachError::TargetNotFound(address.to_string()))
        }
    }
}

impl<T: Translator> Attacher for MemoryAttacher<T> {
    fn game(&self) -> &GameInfo {
        &self.game
    }

    fn attach(&mut self, source: &ScriptSource, address: &Address) -> Result<String, AttachError> {
        let name = self.next_free_name();
        self.attach_named(&name, source, address)
    }
}

/// The embedded marker must agree with the requested address.
fn check_marker(source: &ScriptSource, address: &Address) -> Result<(), AttachError> {
    let embedded = ScriptSource::recover(&source.code)
        .map_err(|e| AttachError::MalformedData(e.to_string()))?;
    if &embedded != address {
        return Err(AttachError::MalformedData(format!(
            "source is marked for {embedded} but was attached to {address}"
        )));
    }
    Ok(())
}

fn resource_for(address: &Address) -> String {
    match address {
        Address::Object(a) => a.area_tag().unwrap_or("module").to_string(),
        Address::Conversation(a) => a.conversation().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::ObjectAddress;
    use crate::blocks::ADDRESS_MARKER;

    fn source_for(address: &Address) -> ScriptSource {
        ScriptSource {
            address: address.clone(),
            code: format!("{ADDRESS_MARKER}{address}\nDestroyObject(goblin);"),
            natural_language: "goblin disappears".to_string(),
        }
    }

    fn goblin_death() -> Address {
        ObjectAddress::instance(TargetType::Creature, "OnDeath", "forest", "goblin")
            .unwrap()
            .into()
    }

    #[test]
    fn names_are_derived_from_prefix() {
        let mut attacher = MemoryAttacher::new(IdentityTranslator)
            .with_instance(TargetType::Creature, "forest", "goblin");
        let address = goblin_death();
        let source = source_for(&address);

        assert_eq!(attacher.attach(&source, &address).unwrap(), "quill_1");
        assert_eq!(attacher.attach(&source, &address).unwrap(), "quill_2");
        assert_eq!(attacher.attached_at(&address), Some("quill_2"));
        assert_eq!(attacher.script("quill_1").unwrap().code, source.code);
        assert!(!attacher.resources().is_loaded("forest"));
    }

    #[test]
    fn explicit_name_collision() {
        let mut attacher = MemoryAttacher::new(IdentityTranslator)
            .with_instance(TargetType::Creature, "forest", "goblin");
        let address = goblin_death();
        let source = source_for(&address);
        attacher.attach_named("death", &source, &address).unwrap();
        assert!(matches!(
            attacher.attach_named("death", &source, &address),
            Err(AttachError::NameExists(_))
        ));
    }

    #[test]
    fn unknown_target_is_reported() {
        let mut attacher = MemoryAttacher::new(IdentityTranslator).with_area("forest");
        let address = goblin_death();
        assert!(matches!(
            attacher.attach(&source_for(&address), &address),
            Err(AttachError::TargetNotFound(_))
        ));
    }

    #[test]
    fn marker_must_match_address() {
        let mut attacher = MemoryAttacher::new(IdentityTranslator).with_area("forest");
        let address: Address = ObjectAddress::area("OnEnterScript", "forest").unwrap().into();
        let source = source_for(&goblin_death());
        assert!(matches!(
            attacher.attach(&source, &address),
            Err(AttachError::MalformedData(_))
        ));
    }

    #[test]
    fn detach_unhooks() {
        let mut attacher = MemoryAttacher::new(IdentityTranslator)
            .with_instance(TargetType::Creature, "forest", "goblin");
        let address = goblin_death();
        let name = attacher.attach(&source_for(&address), &address).unwrap();
        assert!(attacher.detach(&name).is_some());
        assert_eq!(attacher.attached_at(&address), None);
        assert!(attacher.detach(&name).is_none());
    }

    #[test]
    fn world_follows_renames_and_removals() {
        let mut attacher = MemoryAttacher::new(IdentityTranslator);
        attacher.add_instance(TargetType::Creature, "forest", "orc");
        attacher.rename_object("orc", "goblin");
        let address = goblin_death();
        assert!(attacher.attach(&source_for(&address), &address).is_ok());

        attacher.remove_instance("goblin");
        assert!(matches!(
            attacher.attach(&source_for(&address), &address),
            Err(AttachError::TargetNotFound(_))
        ));
    }
}
