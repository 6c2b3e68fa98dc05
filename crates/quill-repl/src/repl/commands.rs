//! REPL command parsing and definitions
//!
//! Handles parsing of dot-commands (.help, .quit, etc.), block paths and
//! the literal syntax used to fill slots.

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, bail, Result};
use quill_core::blocks::{InstanceType, ObjectRef};
use quill_core::Node;

/// Where a node sits in the script: the trigger or a top-level statement,
/// then a chain of steps descending from it.
///
/// Written `0.1` (slot 1 of statement 0), `t.0` (the trigger's raiser),
/// `2.b0.1` (slot 1 of the first body statement of statement 2) or `2.e0`
/// (the first statement of its else branch).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePath {
    pub root: PathRoot,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRoot {
    Trigger,
    Statement(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Slot(usize),
    Body(usize),
    Else(usize),
}

impl NodePath {
    /// Path to the node owning the last step, plus that step.
    pub fn split_last(&self) -> Option<(NodePath, Step)> {
        let (&last, parent) = self.steps.split_last()?;
        Some((
            NodePath {
                root: self.root,
                steps: parent.to_vec(),
            },
            last,
        ))
    }
}

impl FromStr for NodePath {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut segments = s.split('.');
        let root = match segments.next() {
            Some("t") => PathRoot::Trigger,
            Some(n) => PathRoot::Statement(
                n.parse()
                    .map_err(|_| anyhow!("Bad path '{s}': expected 't' or an index"))?,
            ),
            None => bail!("Empty path"),
        };
        let steps = segments
            .map(|segment| {
                let bad = || anyhow!("Bad path '{s}': '{segment}' is not a step");
                if let Some(n) = segment.strip_prefix('b') {
                    n.parse().map(Step::Body).map_err(|_| bad())
                } else if let Some(n) = segment.strip_prefix('e') {
                    n.parse().map(Step::Else).map_err(|_| bad())
                } else {
                    segment.parse().map(Step::Slot).map_err(|_| bad())
                }
            })
            .collect::<Result<_>>()?;
        Ok(Self { root, steps })
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root {
            PathRoot::Trigger => f.write_str("t")?,
            PathRoot::Statement(n) => write!(f, "{n}")?,
        }
        for step in &self.steps {
            match step {
                Step::Slot(n) => write!(f, ".{n}")?,
                Step::Body(n) => write!(f, ".b{n}")?,
                Step::Else(n) => write!(f, ".e{n}")?,
            }
        }
        Ok(())
    }
}

/// Which body of a control structure a new block goes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Body,
    Else,
}

/// Available REPL commands
#[derive(Debug, Clone)]
pub enum ReplCommand {
    /// Show help information
    Help,
    /// Exit the REPL
    Quit,
    /// Clear the screen
    Clear,
    /// Toggle quiet mode
    Quiet,
    /// Toggle debug mode
    Debug,
    /// Start an empty script
    New,
    /// List the statement library
    Library,
    /// Append a block to the script or to a control structure's body
    Add {
        block: String,
        target: Option<(Branch, NodePath)>,
    },
    /// Put a block or literal into a slot
    Fill { path: NodePath, value: String },
    /// Set the trigger from an address
    Trigger(String),
    Remove(NodePath),
    Copy(NodePath),
    Cut(NodePath),
    /// Paste at the end, at a top-level index, or into a slot
    Paste(Option<NodePath>),
    /// Show generated code
    Code,
    /// Show the natural-language reading
    Nl,
    /// Show script statistics
    Stats,
    /// Show the address the script attaches at
    Address,
    Load(String),
    Save(String),
    /// Translate the compiled script into a file
    Export(String),
    /// Parse and describe an address string
    Parse(String),
    /// Register a host object the attacher can target
    Place(String),
    /// Compile and attach, optionally under a given name
    Attach(Option<String>),
    /// Host object renamed
    Rename { old_tag: String, new_tag: String },
    /// Host object or area deleted
    Delete(String),
}

/// Parse a command string into a ReplCommand
pub fn parse_command(input: &str) -> Result<ReplCommand> {
    let trimmed = input.trim();

    let Some(rest) = trimmed.strip_prefix('.') else {
        bail!("Commands must start with '.'");
    };

    let parts: Vec<&str> = rest.split_whitespace().collect();

    if parts.is_empty() {
        bail!("Empty command");
    }

    let one = |usage: &str| -> Result<String> {
        if parts.len() != 2 {
            bail!("Usage: {usage}");
        }
        Ok(parts[1].to_string())
    };

    match parts[0] {
        "help" | "h" => Ok(ReplCommand::Help),
        "quit" | "q" | "exit" => Ok(ReplCommand::Quit),
        "clear" | "cls" => Ok(ReplCommand::Clear),
        "quiet" => Ok(ReplCommand::Quiet),
        "debug" => Ok(ReplCommand::Debug),
        "new" => Ok(ReplCommand::New),
        "library" | "lib" => Ok(ReplCommand::Library),
        "add" => {
            let target = match parts.len() {
                2 => None,
                4 => {
                    let branch = match parts[2] {
                        "in" => Branch::Body,
                        "else" => Branch::Else,
                        other => bail!("Expected 'in' or 'else', found '{other}'"),
                    };
                    Some((branch, parts[3].parse()?))
                }
                _ => bail!("Usage: .add <block> [in|else <path>]"),
            };
            Ok(ReplCommand::Add {
                block: parts[1].to_string(),
                target,
            })
        }
        "fill" => {
            if parts.len() < 3 {
                bail!("Usage: .fill <path> <value>");
            }
            // Text literals may contain spaces.
            let value = rest
                .trim_start()
                .splitn(3, char::is_whitespace)
                .nth(2)
                .unwrap_or_default()
                .trim()
                .to_string();
            Ok(ReplCommand::Fill {
                path: parts[1].parse()?,
                value,
            })
        }
        "trigger" => Ok(ReplCommand::Trigger(one(".trigger <address>")?)),
        "remove" | "rm" => Ok(ReplCommand::Remove(one(".remove <path>")?.parse()?)),
        "copy" => Ok(ReplCommand::Copy(one(".copy <path>")?.parse()?)),
        "cut" => Ok(ReplCommand::Cut(one(".cut <path>")?.parse()?)),
        "paste" => match parts.len() {
            1 => Ok(ReplCommand::Paste(None)),
            2 => Ok(ReplCommand::Paste(Some(parts[1].parse()?))),
            _ => bail!("Usage: .paste [path]"),
        },
        "code" => Ok(ReplCommand::Code),
        "nl" | "read" => Ok(ReplCommand::Nl),
        "stats" | "statistics" => Ok(ReplCommand::Stats),
        "address" => Ok(ReplCommand::Address),
        "load" => Ok(ReplCommand::Load(one(".load <file>")?)),
        "save" => Ok(ReplCommand::Save(one(".save <file>")?)),
        "export" => Ok(ReplCommand::Export(one(".export <file>")?)),
        "parse" => Ok(ReplCommand::Parse(one(".parse <address>")?)),
        "place" => Ok(ReplCommand::Place(one(".place <object>")?)),
        "attach" => match parts.len() {
            1 => Ok(ReplCommand::Attach(None)),
            2 => Ok(ReplCommand::Attach(Some(parts[1].to_string()))),
            _ => bail!("Usage: .attach [name]"),
        },
        "rename" => {
            if parts.len() != 3 {
                bail!("Usage: .rename <old_tag> <new_tag>");
            }
            Ok(ReplCommand::Rename {
                old_tag: parts[1].to_string(),
                new_tag: parts[2].to_string(),
            })
        }
        "delete" => Ok(ReplCommand::Delete(one(".delete <tag>")?)),
        _ => Err(anyhow!("Unknown command: .{}", parts[0])),
    }
}

/// An object written as `player`, `module`, `area:<tag>`,
/// `<type>:<tag>@<area>` (an instance) or `<type>:<resref>` (a blueprint).
pub fn parse_object(text: &str) -> Result<ObjectRef> {
    match text {
        "player" => return Ok(ObjectRef::player()),
        "module" => return Ok(ObjectRef::module()),
        _ => {}
    }
    let (kind, rest) = text
        .split_once(':')
        .ok_or_else(|| anyhow!("Not an object: '{text}'"))?;
    if kind.eq_ignore_ascii_case("area") {
        return Ok(ObjectRef::area(rest, rest));
    }
    let instance_type = InstanceType::ALL
        .into_iter()
        .find(|t| t.name().eq_ignore_ascii_case(kind))
        .ok_or_else(|| anyhow!("Unknown object type '{kind}'"))?;
    Ok(match rest.split_once('@') {
        Some((tag, area)) => ObjectRef::instance(instance_type, tag, tag, area),
        None => ObjectRef::blueprint(instance_type, rest, rest),
    })
}

/// A terminal block: number, quoted text, `event:<Hook>` or an object.
pub fn parse_literal(text: &str) -> Result<Node> {
    if let Ok(n) = text.parse::<i64>() {
        return Ok(Node::integer(n));
    }
    if let Ok(f) = text.parse::<f64>() {
        return Ok(Node::float(f));
    }
    if let Some(inner) = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
    {
        return Ok(Node::text(inner));
    }
    if let Some(hook) = text.strip_prefix("event:") {
        return Ok(Node::event(hook)?);
    }
    Ok(Node::object(parse_object(text)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::blocks::ObjectKind;
    use quill_core::Render;

    #[test]
    fn test_parse_help() {
        assert!(matches!(parse_command(".help").unwrap(), ReplCommand::Help));
        assert!(matches!(parse_command(".h").unwrap(), ReplCommand::Help));
    }

    #[test]
    fn test_parse_quit() {
        assert!(matches!(parse_command(".quit").unwrap(), ReplCommand::Quit));
        assert!(matches!(parse_command(".q").unwrap(), ReplCommand::Quit));
        assert!(matches!(parse_command(".exit").unwrap(), ReplCommand::Quit));
    }

    #[test]
    fn test_parse_add_into_body() {
        match parse_command(".add give-gold else 0.2").unwrap() {
            ReplCommand::Add {
                block,
                target: Some((Branch::Else, path)),
            } => {
                assert_eq!(block, "give-gold");
                assert_eq!(path.to_string(), "0.2");
            }
            other => panic!("Expected Add command, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_fill_keeps_spaces_in_text() {
        match parse_command(".fill 1.1  \"well met, stranger\"").unwrap() {
            ReplCommand::Fill { path, value } => {
                assert_eq!(path.root, PathRoot::Statement(1));
                assert_eq!(path.steps, vec![Step::Slot(1)]);
                assert_eq!(value, "\"well met, stranger\"");
            }
            other => panic!("Expected Fill command, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_paths() {
        let path: NodePath = "t.0".parse().unwrap();
        assert_eq!(path.root, PathRoot::Trigger);
        let (parent, last) = path.split_last().unwrap();
        assert_eq!(parent.to_string(), "t");
        assert_eq!(last, Step::Slot(0));

        let nested: NodePath = "2.b0.e3.1".parse().unwrap();
        assert_eq!(
            nested.steps,
            vec![Step::Body(0), Step::Else(3), Step::Slot(1)]
        );
        assert_eq!(nested.to_string(), "2.b0.e3.1");

        assert!("x.1".parse::<NodePath>().is_err());
        assert!("0.a".parse::<NodePath>().is_err());
        assert!("0.b".parse::<NodePath>().is_err());
        assert!("3".parse::<NodePath>().unwrap().split_last().is_none());
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse_literal("5").unwrap().code().unwrap(), "5");
        assert_eq!(parse_literal("2.5").unwrap().code().unwrap(), "2.5");
        assert_eq!(parse_literal("\"hi\"").unwrap().code().unwrap(), "\"hi\"");
        assert_eq!(
            parse_literal("event:OnDeath").unwrap().natural_language().unwrap(),
            "dies"
        );
        assert!(parse_literal("event:OnTeaTime").is_err());

        let goblin = parse_object("creature:goblin@forest").unwrap();
        assert_eq!(goblin.kind, ObjectKind::Instance(InstanceType::Creature));
        assert_eq!(goblin.area_tag.as_deref(), Some("forest"));
        let chest = parse_object("Placeable:chest01").unwrap();
        assert_eq!(chest.kind, ObjectKind::Blueprint(InstanceType::Placeable));
        assert!(parse_object("dragon:smaug@lair").is_err());
    }

    #[test]
    fn test_parse_invalid_command() {
        assert!(parse_command(".invalid").is_err());
        assert!(parse_command("help").is_err()); // Missing dot
        assert!(parse_command(".load").is_err()); // Missing argument
        assert!(parse_command(".add if on 0").is_err());
    }
}
