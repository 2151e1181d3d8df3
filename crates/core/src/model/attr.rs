use std::collections::BTreeMap;
use std::fmt;

use super::validate::MemberPath;
use super::value::Value;
use crate::error::ValidationError;

/// Attribute operators. Declaration order is evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttrOp {
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
    LenLt,
    LenLte,
    LenGt,
    LenGte,
    LenEq,
}

impl AttrOp {
    pub fn symbol(self) -> &'static str {
        match self {
            AttrOp::Lt => "<",
            AttrOp::Lte => "<=",
            AttrOp::Gt => ">",
            AttrOp::Gte => ">=",
            AttrOp::Eq => "==",
            AttrOp::LenLt => "len <",
            AttrOp::LenLte => "len <=",
            AttrOp::LenGt => "len >",
            AttrOp::LenGte => "len >=",
            AttrOp::LenEq => "len ==",
        }
    }

    pub fn is_length(self) -> bool {
        matches!(
            self,
            AttrOp::LenLt | AttrOp::LenLte | AttrOp::LenGt | AttrOp::LenGte | AttrOp::LenEq
        )
    }

    fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            AttrOp::Lt | AttrOp::LenLt => lhs < rhs,
            AttrOp::Lte | AttrOp::LenLte => lhs <= rhs,
            AttrOp::Gt | AttrOp::LenGt => lhs > rhs,
            AttrOp::Gte | AttrOp::LenGte => lhs >= rhs,
            AttrOp::Eq | AttrOp::LenEq => lhs == rhs,
        }
    }
}

/// Which operator families a type kind accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrSupport {
    Value,
    Length,
    None,
}

impl AttrSupport {
    pub fn allows(self, op: AttrOp) -> bool {
        match self {
            AttrSupport::Value => !op.is_length(),
            AttrSupport::Length => op.is_length(),
            AttrSupport::None => false,
        }
    }
}

/// Render a numeric operand with six decimals, trailing zeros and point stripped.
pub fn format_operand(value: f64) -> String {
    let text = format!("{:.6}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_owned()
    } else {
        text.to_owned()
    }
}

/// A set of value and length constraints attached to a type usage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attr {
    ops: BTreeMap<AttrOp, f64>,
}

impl Attr {
    pub fn new() -> Self {
        Attr::default()
    }

    /// Set an operator; a repeated operator keeps the last operand.
    pub fn set(&mut self, op: AttrOp, operand: f64) {
        self.ops.insert(op, operand);
    }

    pub fn get(&self, op: AttrOp) -> Option<f64> {
        self.ops.get(&op).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> impl Iterator<Item = (AttrOp, f64)> + '_ {
        self.ops.iter().map(|(op, v)| (*op, *v))
    }

    /// First operator the given kind does not accept, rendered as `<op> <operand>`.
    pub fn first_unsupported(&self, support: AttrSupport) -> Option<String> {
        self.ops()
            .find(|(op, _)| !support.allows(*op))
            .map(|(op, v)| constraint_syntax(op, v))
    }

    pub fn validate(&self, value: &Value, path: &MemberPath) -> Result<(), ValidationError> {
        for (op, operand) in self.ops() {
            let lhs = if op.is_length() {
                value.length().map(|n| n as f64)
            } else {
                value.as_f64()
            };
            let ok = matches!(lhs, Some(lhs) if op.holds(lhs, operand));
            if !ok {
                return Err(ValidationError::new(
                    format!(
                        "Invalid value {} (type '{}'){} [{}]",
                        value.repr(),
                        value.type_name(),
                        path.for_member(),
                        constraint_syntax(op, operand)
                    ),
                    path.render(),
                ));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.ops().map(|(op, v)| constraint_syntax(op, v)).collect();
        write!(f, "{}", parts.join(", "))
    }
}

fn constraint_syntax(op: AttrOp, operand: f64) -> String {
    format!("{} {}", op.symbol(), format_operand(operand))
}
