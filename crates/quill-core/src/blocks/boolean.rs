use serde::{Deserialize, Serialize};

use super::{Channel, CompositionError, Fitter, Render, Result, Slot};

const MIN_OPERANDS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BooleanOp {
    And,
    Or,
    Not,
}

impl BooleanOp {
    pub fn name(&self) -> &'static str {
        match self {
            BooleanOp::And => "And",
            BooleanOp::Or => "Or",
            BooleanOp::Not => "Not",
        }
    }

    fn code_operator(&self) -> &'static str {
        match self {
            BooleanOp::And => " && ",
            BooleanOp::Or => " || ",
            BooleanOp::Not => "!",
        }
    }

    fn conjunction(&self) -> &'static str {
        match self {
            BooleanOp::And => "and",
            BooleanOp::Or => "or",
            BooleanOp::Not => "not",
        }
    }
}

/// Boolean composite over condition-like operands.
///
/// `And`/`Or` hold two or more operand slots, `Not` exactly one.
#[derive(Debug)]
pub struct BooleanExpr {
    op: BooleanOp,
    operands: Vec<Slot>,
}

impl BooleanExpr {
    pub fn and(operands: usize) -> Result<Self> {
        Self::variadic(BooleanOp::And, operands)
    }

    pub fn or(operands: usize) -> Result<Self> {
        Self::variadic(BooleanOp::Or, operands)
    }

    pub fn not() -> Self {
        Self {
            op: BooleanOp::Not,
            operands: vec![Slot::new(Fitter::BooleanExpressions)],
        }
    }

    fn variadic(op: BooleanOp, operands: usize) -> Result<Self> {
        if operands < MIN_OPERANDS {
            return Err(CompositionError::OperandCount {
                operator: op.name(),
                minimum: MIN_OPERANDS,
                actual: operands,
            });
        }
        Ok(Self {
            op,
            operands: (0..operands)
                .map(|_| Slot::new(Fitter::BooleanExpressions))
                .collect(),
        })
    }

    pub fn op(&self) -> BooleanOp {
        self.op
    }

    pub fn operands(&self) -> &[Slot] {
        &self.operands
    }

    pub fn operands_mut(&mut self) -> &mut [Slot] {
        &mut self.operands
    }

    /// Append an empty operand slot. `Not` stays unary.
    pub fn add_operand(&mut self) -> Result<usize> {
        if self.op == BooleanOp::Not {
            return Err(CompositionError::TooManyOperands {
                operator: self.op.name(),
                maximum: 1,
                actual: self.operands.len() + 1,
            });
        }
        self.operands.push(Slot::new(Fitter::BooleanExpressions));
        Ok(self.operands.len() - 1)
    }

    /// Remove the operand slot at `index` along with whatever it holds.
    pub fn remove_operand(&mut self, index: usize) -> Result<Slot> {
        let minimum = match self.op {
            BooleanOp::Not => 1,
            _ => MIN_OPERANDS,
        };
        if index >= self.operands.len() {
            return Err(CompositionError::IndexOutOfRange {
                index,
                len: self.operands.len(),
            });
        }
        if self.operands.len() <= minimum {
            return Err(CompositionError::OperandCount {
                operator: self.op.name(),
                minimum,
                actual: self.operands.len() - 1,
            });
        }
        Ok(self.operands.remove(index))
    }

    pub fn is_complete(&self) -> bool {
        self.operands.iter().all(Slot::is_complete_deep)
    }

    pub fn deep_copy(&self) -> BooleanExpr {
        BooleanExpr {
            op: self.op,
            operands: self.operands.iter().map(Slot::deep_copy).collect(),
        }
    }
}

impl Render for BooleanExpr {
    fn render(&self, channel: Channel) -> Result<String> {
        let parts = self
            .operands
            .iter()
            .map(|s| s.render(channel))
            .collect::<Result<Vec<_>>>()?;

        Ok(match (channel, self.op) {
            (Channel::Code, BooleanOp::Not) => format!("!({})", parts.join("")),
            (Channel::Code, op) => format!("({})", parts.join(op.code_operator())),
            (Channel::NaturalLanguage, BooleanOp::Not) => {
                format!("it is not the case that {}", parts.join(""))
            }
            (Channel::NaturalLanguage, op) => join_phrases(&parts, op.conjunction()),
        })
    }
}

/// "a and b", "a, b and c"
fn join_phrases(parts: &[String], conjunction: &str) -> String {
    match parts.split_last() {
        None => String::new(),
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} {conjunction} {last}", rest.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variadic_operators_need_two_operands() {
        assert!(matches!(
            BooleanExpr::and(1),
            Err(CompositionError::OperandCount { minimum: 2, actual: 1, .. })
        ));
        assert_eq!(BooleanExpr::or(3).unwrap().operands().len(), 3);
        assert_eq!(BooleanExpr::not().operands().len(), 1);
    }

    #[test]
    fn empty_operands_render_placeholders() {
        let and = BooleanExpr::and(2).unwrap();
        assert_eq!(and.code().unwrap(), "(FALSE && FALSE)");
        assert_eq!(and.natural_language().unwrap(), "some condition and some condition");

        let not = BooleanExpr::not();
        assert_eq!(not.code().unwrap(), "!(FALSE)");
        assert_eq!(
            not.natural_language().unwrap(),
            "it is not the case that some condition"
        );
    }

    #[test]
    fn three_way_or_uses_commas() {
        let or = BooleanExpr::or(3).unwrap();
        assert_eq!(
            or.natural_language().unwrap(),
            "some condition, some condition or some condition"
        );
        assert_eq!(or.code().unwrap(), "(FALSE || FALSE || FALSE)");
    }

    #[test]
    fn operands_can_grow_and_shrink_within_bounds() {
        let mut and = BooleanExpr::and(2).unwrap();
        assert_eq!(and.add_operand().unwrap(), 2);
        and.remove_operand(0).unwrap();
        assert!(and.remove_operand(0).is_err());
        let err = BooleanExpr::not().add_operand().unwrap_err();
        assert_eq!(err.to_string(), "Not takes at most 1 operands, got 2");
    }
}
