//! Node counts aggregated over one or more script trees.

use std::collections::BTreeMap;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

use crate::blocks::{Node, NodeKind, Script};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptStats {
    /// Number of script documents recorded
    pub scripts: usize,
    pub kinds: BTreeMap<NodeKind, usize>,
    /// Statement usage by statement id
    pub statements: BTreeMap<String, usize>,
}

impl ScriptStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count `node` and every descendant exactly once.
    pub fn record(&mut self, node: &Node) {
        node.for_each_node(&mut |n| self.record_one(n));
    }

    pub fn record_script(&mut self, script: &Script) {
        self.scripts += 1;
        script.for_each_node(&mut |n| self.record_one(n));
    }

    fn record_one(&mut self, node: &Node) {
        *self.kinds.entry(node.kind()).or_default() += 1;
        if let Some(statement) = node.as_statement() {
            *self.statements.entry(statement.id().to_string()).or_default() += 1;
        }
    }

    pub fn count(&self, kind: NodeKind) -> usize {
        self.kinds.get(&kind).copied().unwrap_or(0)
    }

    pub fn statement_count(&self, id: &str) -> usize {
        self.statements.get(id).copied().unwrap_or(0)
    }

    pub fn total_nodes(&self) -> usize {
        self.kinds.values().sum()
    }

    pub fn merge(&mut self, other: &ScriptStats) {
        self.scripts += other.scripts;
        for (kind, n) in &other.kinds {
            *self.kinds.entry(*kind).or_default() += n;
        }
        for (id, n) in &other.statements {
            *self.statements.entry(id.clone()).or_default() += n;
        }
    }
}

impl Add for ScriptStats {
    type Output = ScriptStats;

    fn add(mut self, rhs: ScriptStats) -> ScriptStats {
        self.merge(&rhs);
        self
    }
}

impl AddAssign for ScriptStats {
    fn add_assign(&mut self, rhs: ScriptStats) {
        self.merge(&rhs);
    }
}

impl AddAssign<&ScriptStats> for ScriptStats {
    fn add_assign(&mut self, rhs: &ScriptStats) {
        self.merge(rhs);
    }
}

impl Sum for ScriptStats {
    fn sum<I: Iterator<Item = ScriptStats>>(iter: I) -> Self {
        iter.fold(ScriptStats::new(), Add::add)
    }
}

impl fmt::Display for ScriptStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} script(s), {} block(s)",
            self.scripts,
            self.total_nodes()
        )?;
        for (kind, n) in &self.kinds {
            writeln!(f, "  {:<20} {n}", kind.element_name())?;
        }
        if !self.statements.is_empty() {
            writeln!(f, "statements:")?;
            for (id, n) in &self.statements {
                writeln!(f, "  {id:<20} {n}")?;
            }
        }
        Ok(())
    }
}
