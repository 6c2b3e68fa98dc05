//! REPL (Read-Eval-Print Loop) functionality for Quill
//!
//! This module provides interactive command-line interface components that wrap
//! an editing session with user-friendly features like:
//! - Command history and editing
//! - Multi-line XML block input
//! - REPL commands (.help, .add, .fill, .code, ...)
//! - A stand-in host world to attach scripts to
//! - Output formatting and notifications

use std::path::Path;
use std::time::Instant;

use anyhow::{anyhow, bail, Result};
use quill_core::blocks::{InstanceType, ObjectKind, ObjectRef, Trigger};
use quill_core::{
    Address, Attacher, HostEvent, IdentityTranslator, MemoryAttacher, Node, QuillConfig, Render,
    Script, Session, Slot, Translator, XmlCodec,
};
use uuid::Uuid;

pub mod commands;
pub mod multiline;
pub mod notifier;

pub use commands::{parse_literal, parse_object, Branch, NodePath, PathRoot, ReplCommand, Step};
pub use multiline::{LineProcessResult, MultiLineCollector};
pub use notifier::{BufferedNotifier, DefaultNotifier, Notice, ReplNotifier};

/// Interactive REPL for composing Quill scripts
pub struct Repl {
    /// Script, library, clipboard and host event queue
    session: Session,
    /// Stand-in host world scripts are attached to
    attacher: MemoryAttacher<IdentityTranslator>,
    /// Current notifier for output
    notifier: Box<dyn ReplNotifier>,
    /// Whether the REPL is running
    running: bool,
    /// Quiet mode (suppress timing info)
    quiet: bool,
    /// Debug mode
    debug: bool,
}

impl Repl {
    /// Create a new REPL over the standard statement library
    pub fn new(config: QuillConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            session: Session::with_standard_library()?,
            attacher: config.memory_attacher(IdentityTranslator),
            notifier: Box::new(DefaultNotifier::new()),
            running: true,
            quiet: false,
            debug: config.debug,
        })
    }

    /// Set the notifier for this REPL
    pub fn set_notifier(&mut self, notifier: Box<dyn ReplNotifier>) {
        self.notifier = notifier;
    }

    /// Get a reference to the current notifier
    pub fn notifier(&self) -> &dyn ReplNotifier {
        self.notifier.as_ref()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn attacher(&self) -> &MemoryAttacher<IdentityTranslator> {
        &self.attacher
    }

    /// Check if the REPL is still running
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Set quiet mode
    pub fn set_quiet(&mut self, quiet: bool) {
        self.quiet = quiet;
    }

    /// Set debug mode
    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// Parse REPL input into a command
    pub fn parse_input(&self, input: &str) -> Result<ReplCommand> {
        commands::parse_command(input)
    }

    /// Handle a REPL command
    pub fn handle_command(&mut self, command: ReplCommand) -> Result<String> {
        match command {
            ReplCommand::Help => Ok(self.get_help_text()),
            ReplCommand::Quit => {
                self.running = false;
                Ok("Goodbye!".to_string())
            }
            ReplCommand::Clear => {
                print!("\x1B[2J\x1B[1;1H");
                Ok("Screen cleared.".to_string())
            }
            ReplCommand::Quiet => {
                self.quiet = !self.quiet;
                Ok(format!(
                    "Quiet mode: {}",
                    if self.quiet { "on" } else { "off" }
                ))
            }
            ReplCommand::Debug => {
                self.debug = !self.debug;
                Ok(format!(
                    "Debug mode: {}",
                    if self.debug { "on" } else { "off" }
                ))
            }
            ReplCommand::New => {
                self.session.set_script(Script::new());
                Ok("Started a new script.".to_string())
            }
            ReplCommand::Library => Ok(self.list_library()),
            ReplCommand::Add { block, target } => self.add(&block, target),
            ReplCommand::Fill { path, value } => self.fill(&path, &value),
            ReplCommand::Trigger(address) => self.set_trigger(&address),
            ReplCommand::Remove(path) => {
                let id = self.node_at(&path)?.id();
                let node = self.session.remove(id)?;
                Ok(format!("Removed {path}: {}", node.natural_language()?))
            }
            ReplCommand::Copy(path) => {
                let id = self.node_at(&path)?.id();
                self.session.copy(id)?;
                Ok(format!("Copied {path}"))
            }
            ReplCommand::Cut(path) => {
                let id = self.node_at(&path)?.id();
                self.session.cut(id)?;
                Ok(format!("Cut {path}"))
            }
            ReplCommand::Paste(path) => self.paste(path),
            ReplCommand::Code => Ok(self.session.script().code()?),
            ReplCommand::Nl => Ok(self.session.script().natural_language()?),
            ReplCommand::Stats => self.show_stats(),
            ReplCommand::Address => {
                let address = self.session.script().address()?;
                Ok(describe_address(&address))
            }
            ReplCommand::Load(file) => {
                self.session.load(Path::new(&file))?;
                Ok(format!(
                    "Loaded {file}: {} top-level block(s)",
                    self.session.script().spine().len()
                ))
            }
            ReplCommand::Save(file) => {
                self.session.save(Path::new(&file))?;
                Ok(format!("Saved {file}"))
            }
            ReplCommand::Export(file) => {
                let source = self.session.compile()?;
                self.attacher
                    .translator()
                    .translate_to_file(&source.code, Path::new(&file))?;
                Ok(format!(
                    "Wrote {} source for {} to {file}",
                    self.attacher.translator().target_language(),
                    source.address
                ))
            }
            ReplCommand::Parse(text) => match text.parse::<Address>() {
                Ok(address) => Ok(describe_address(&address)),
                Err(e) if e.is_format_error() => Err(anyhow!("Not an address: {e}")),
                Err(e) => Err(anyhow!("Well-formed but invalid: {e}")),
            },
            ReplCommand::Place(object) => self.place(&object),
            ReplCommand::Attach(name) => self.attach(name),
            ReplCommand::Rename { old_tag, new_tag } => {
                self.session.event_sender().send(HostEvent::ObjectRenamed {
                    old_tag: old_tag.clone(),
                    new_tag: new_tag.clone(),
                })?;
                self.session.drain_events();
                self.attacher.rename_object(&old_tag, &new_tag);
                Ok(format!("Renamed {old_tag} to {new_tag}"))
            }
            ReplCommand::Delete(tag) => {
                let removed = self
                    .session
                    .apply_event(&HostEvent::ObjectRemoved { tag: tag.clone() });
                self.attacher.remove_area(&tag);
                self.attacher.remove_instance(&tag);
                Ok(format!(
                    "Deleted {tag}; cleared {} slot(s)",
                    removed.len()
                ))
            }
        }
    }

    /// Build an XML block, append it to the script and return its reading with timing
    pub fn execute(&mut self, xml: &str) -> Result<(String, u64)> {
        let start = Instant::now();

        let node = XmlCodec::new(self.session.library()).node_from_xml(xml)?;
        let reading = node.natural_language()?;
        let spine = self.session.script_mut().spine_mut();
        spine.push(node)?;
        let index = spine.len() - 1;

        let duration = start.elapsed().as_millis() as u64;
        Ok((format!("[{index}] {reading}"), duration))
    }

    /// A control structure, boolean composite, library statement or literal.
    fn build_block(&self, text: &str) -> Result<Node> {
        Ok(match text {
            "if" => Node::if_block(),
            "if-else" => Node::if_else_block(),
            "while" => Node::while_block(),
            "and" => Node::and(2)?,
            "or" => Node::or(2)?,
            "not" => Node::not(),
            id if self.session.library().contains(id) => self.session.create(id)?,
            literal => parse_literal(literal)?,
        })
    }

    fn node_at(&mut self, path: &NodePath) -> Result<&mut Node> {
        let script = self.session.script_mut();
        let mut node = match path.root {
            PathRoot::Trigger => script.trigger_mut().contents_mut(),
            PathRoot::Statement(index) => script.spine_mut().get_mut(index),
        }
        .ok_or_else(|| anyhow!("Nothing at {path}"))?;

        for step in &path.steps {
            node = match *step {
                Step::Slot(index) => node
                    .slots_mut()
                    .into_iter()
                    .nth(index)
                    .and_then(Slot::contents_mut),
                Step::Body(index) => node
                    .as_control_mut()
                    .and_then(|c| c.body_mut().get_mut(index)),
                Step::Else(index) => node
                    .as_control_mut()
                    .and_then(|c| c.otherwise_mut())
                    .and_then(|s| s.get_mut(index)),
            }
            .ok_or_else(|| anyhow!("Nothing at {path}"))?;
        }
        Ok(node)
    }

    /// The slot a path's last step names; `t` alone is the trigger slot.
    fn slot_at(&mut self, path: &NodePath) -> Result<&mut Slot> {
        let Some((parent, last)) = path.split_last() else {
            return match path.root {
                PathRoot::Trigger => Ok(self.session.script_mut().trigger_mut()),
                PathRoot::Statement(_) => bail!("{path} is a statement, not a slot"),
            };
        };
        let Step::Slot(index) = last else {
            bail!("{path} is a statement, not a slot");
        };
        self.node_at(&parent)?
            .slots_mut()
            .into_iter()
            .nth(index)
            .ok_or_else(|| anyhow!("{parent} has no slot {index}"))
    }

    fn add(&mut self, block: &str, target: Option<(Branch, NodePath)>) -> Result<String> {
        let node = self.build_block(block)?;
        let Some((branch, path)) = target else {
            let spine = self.session.script_mut().spine_mut();
            spine.push(node)?;
            return Ok(format!("Added {block} at {}", spine.len() - 1));
        };

        let control = self
            .node_at(&path)?
            .as_control_mut()
            .ok_or_else(|| anyhow!("{path} is not a control structure"))?;
        let spine = match branch {
            Branch::Body => control.body_mut(),
            Branch::Else => control
                .otherwise_mut()
                .ok_or_else(|| anyhow!("{path} has no else branch"))?,
        };
        spine.push(node)?;
        let last = spine.len() - 1;
        let mut added = path.clone();
        added.steps.push(match branch {
            Branch::Body => Step::Body(last),
            Branch::Else => Step::Else(last),
        });
        Ok(format!("Added {block} at {added}"))
    }

    fn fill(&mut self, path: &NodePath, value: &str) -> Result<String> {
        let node = self.build_block(value)?;
        let reading = node.natural_language()?;
        let slot = self.slot_at(path)?;
        let replaced = slot.assign(node)?;
        Ok(match replaced {
            Some(old) => format!("{path} = {reading} (was {})", old.natural_language()?),
            None => format!("{path} = {reading}"),
        })
    }

    fn set_trigger(&mut self, text: &str) -> Result<String> {
        let trigger = match text.parse::<Address>()? {
            Address::Conversation(address) => Node::conversation_trigger(address),
            Address::Object(address) => {
                let raiser = match (address.area_tag(), address.instance_tag()) {
                    (None, _) => ObjectRef::module(),
                    (Some(area), None) => ObjectRef::area(area, area),
                    (Some(area), Some(tag)) => {
                        let instance_type = InstanceType::ALL
                            .into_iter()
                            .find(|t| t.target_type() == Some(address.target_type()))
                            .ok_or_else(|| {
                                anyhow!("No object type owns {} scripts", address.target_type())
                            })?;
                        ObjectRef::instance(instance_type, tag, tag, area)
                    }
                };
                let mut node = Node::event_trigger();
                if let Some(Trigger::Event(t)) = node.as_trigger_mut() {
                    t.raiser_mut().assign(Node::object(raiser))?;
                    t.event_mut().assign(Node::event(address.target_slot())?)?;
                }
                node
            }
        };
        let reading = trigger.natural_language()?;
        self.session.script_mut().trigger_mut().assign(trigger)?;
        Ok(format!("Trigger: {reading}"))
    }

    fn paste(&mut self, path: Option<NodePath>) -> Result<String> {
        let Some(path) = path else {
            let end = self.session.script().spine().len();
            self.session.paste_at(end)?;
            return Ok(format!("Pasted at {end}"));
        };

        match path.split_last() {
            None => match path.root {
                PathRoot::Statement(index) => {
                    self.session.paste_at(index)?;
                }
                PathRoot::Trigger => {
                    let node = self
                        .session
                        .clipboard()
                        .paste()
                        .ok_or_else(|| anyhow!("Clipboard is empty"))?;
                    self.session.script_mut().trigger_mut().assign(node)?;
                }
            },
            Some((parent, Step::Slot(index))) => {
                let parent_id = self.node_at(&parent)?.id();
                self.session.paste_into_slot(parent_id, index)?;
            }
            Some((parent, Step::Body(index))) => {
                self.paste_into_branch(&parent, Branch::Body, index)?;
            }
            Some((parent, Step::Else(index))) => {
                self.paste_into_branch(&parent, Branch::Else, index)?;
            }
        }
        Ok(format!("Pasted at {path}"))
    }

    fn paste_into_branch(&mut self, parent: &NodePath, branch: Branch, index: usize) -> Result<()> {
        let node = self
            .session
            .clipboard()
            .paste()
            .ok_or_else(|| anyhow!("Clipboard is empty"))?;
        let control = self
            .node_at(parent)?
            .as_control_mut()
            .ok_or_else(|| anyhow!("{parent} is not a control structure"))?;
        let spine = match branch {
            Branch::Body => control.body_mut(),
            Branch::Else => control
                .otherwise_mut()
                .ok_or_else(|| anyhow!("{parent} has no else branch"))?,
        };
        spine.insert(index, node)?;
        Ok(())
    }

    fn place(&mut self, text: &str) -> Result<String> {
        if let Some(conversation) = text.strip_prefix("conversation:") {
            self.attacher
                .add_conversation(conversation, std::iter::empty::<Uuid>());
            return Ok(format!("Placed conversation {conversation}"));
        }
        let object = parse_object(text)?;
        match object.kind {
            ObjectKind::Area => self.attacher.add_area(object.tag.as_str()),
            ObjectKind::Instance(instance_type) => {
                let target_type = instance_type
                    .target_type()
                    .ok_or_else(|| anyhow!("{} objects have no scripts", instance_type.name()))?;
                let area = object.area_tag.clone().unwrap_or_default();
                self.attacher
                    .add_instance(target_type, area, object.tag.as_str());
            }
            _ => bail!("Only areas, instances and conversations can be placed"),
        }
        Ok(format!("Placed {text}"))
    }

    fn attach(&mut self, name: Option<String>) -> Result<String> {
        let source = self.session.compile()?;
        let name = match name {
            Some(name) => self
                .attacher
                .attach_named(&name, &source, &source.address)?,
            None => self.attacher.attach(&source, &source.address)?,
        };
        Ok(format!(
            "Attached {name} at {} in {}",
            source.address,
            self.attacher.game().name
        ))
    }

    fn list_library(&self) -> String {
        let library = self.session.library();
        let mut lines = vec!["Actions:".to_string()];
        lines.extend(
            library
                .actions()
                .map(|d| format!("  {:<12} {}", d.id(), d.signature())),
        );
        lines.push("Conditions:".to_string());
        lines.extend(
            library
                .conditions()
                .map(|d| format!("  {:<12} {}", d.id(), d.signature())),
        );
        lines.join("\n")
    }

    /// Show script statistics
    fn show_stats(&self) -> Result<String> {
        let stats = self.session.statistics();
        let mut report = format!(
            "{stats}\n  Complete: {}\n  Attached scripts: {}",
            self.session.script().is_complete(),
            self.attacher.scripts().count()
        );
        if self.debug {
            report.push('\n');
            report.push_str(&serde_json::to_string_pretty(&stats)?);
        }
        Ok(report)
    }

    /// Get help text
    fn get_help_text(&self) -> String {
        r#"Quill REPL Commands:
  .help    - Show this help message
  .quit    - Exit the REPL
  .clear   - Clear the screen
  .quiet   - Toggle quiet mode (hide timing info)
  .debug   - Toggle debug mode

Composing:
  .new                          - Start an empty script
  .library                      - List the statements that can be added
  .add <block> [in|else <path>] - Append a statement, if, if-else or while
  .fill <path> <value>          - Put a block or literal into a slot
  .trigger <address>            - Set what runs the script
  .remove/.copy/.cut <path>     - Edit blocks
  .paste [path]                 - Paste the clipboard

Inspecting:
  .code  .nl  .stats  .address
  .parse <address>              - Check an address string

Files and host:
  .load <file>  .save <file>    - Read or write the script as XML
  .export <file>                - Write translated source
  .place <object>               - Make an object known to the host
  .attach [name]                - Compile and attach the script
  .rename <old> <new>           - Host renamed an object
  .delete <tag>                 - Host deleted an object or area

Paths: 0 (first statement), 0.1 (its second slot), 0.b0 (first statement
in its body), 0.e0 (first in its else branch), t (the trigger), t.0.
Values: 5, 2.5, "text", player, module, area:forest,
creature:goblin@forest, placeable:chest01, event:OnDeath, and, or, not,
or any library statement. Lines starting with '<' are read as XML blocks."#
            .to_string()
    }

    /// Show exit statistics
    pub fn show_exit_stats(&self) {
        if !self.quiet {
            self.notifier
                .on_output(&format!("\nSession complete. {}", self.session.statistics()));
        }
    }
}

fn describe_address(address: &Address) -> String {
    match address {
        Address::Object(a) => {
            let mut text = format!(
                "Object address {address}\n  Target type: {}\n  Script slot: {}",
                a.target_type(),
                a.target_slot()
            );
            if let Some(area) = a.area_tag() {
                text.push_str(&format!("\n  Area: {area}"));
            }
            if let Some(instance) = a.instance_tag() {
                text.push_str(&format!("\n  Instance: {instance}"));
            }
            text
        }
        Address::Conversation(a) => format!(
            "Conversation address {address}\n  Conversation: {}\n  Line: {}\n  Attached as: {}",
            a.conversation(),
            a.line_id(),
            a.attached_as()
        ),
    }
}
