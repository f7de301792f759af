//! Query domains: ordered filter clauses over a record type.
//!
//! A domain arrives as literal text (`[('email', '!=', None)]`), is checked
//! for shape here, and is converted back to a [`Value`] for the wire. Field
//! names and operators are not checked against the remote schema; the service
//! reports those.

use crate::error::{OdqError, Result};
use crate::literal;
use crate::value::Value;
use std::fmt;

/// Prefix operators combining the clauses that follow them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
    Not,
}

impl LogicOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            LogicOp::And => "&",
            LogicOp::Or => "|",
            LogicOp::Not => "!",
        }
    }

    fn from_symbol(s: &str) -> Option<Self> {
        match s {
            "&" => Some(LogicOp::And),
            "|" => Some(LogicOp::Or),
            "!" => Some(LogicOp::Not),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DomainTerm {
    Clause {
        field: String,
        operator: String,
        value: Value,
    },
    /// `(1, '=', 1)` matches everything, `(0, '=', 1)` nothing.
    Constant(bool),
    Logic(LogicOp),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Domain {
    terms: Vec<DomainTerm>,
}

impl Domain {
    /// The unrestricted domain.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Result<Self> {
        let value = literal::parse(text)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let items = match value {
            Value::Array(items) => items,
            other => {
                return Err(OdqError::Domain(format!(
                    "expected a list of clauses, found {}",
                    other.kind()
                )))
            }
        };

        let terms = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| term_from_value(i, item))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { terms })
    }

    pub fn with_clause(
        mut self,
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.terms.push(DomainTerm::Clause {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
        });
        self
    }

    pub fn terms(&self) -> &[DomainTerm] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Array(
            self.terms
                .iter()
                .map(|term| match term {
                    DomainTerm::Clause {
                        field,
                        operator,
                        value,
                    } => Value::Array(vec![
                        Value::from(field.as_str()),
                        Value::from(operator.as_str()),
                        value.clone(),
                    ]),
                    DomainTerm::Constant(truth) => Value::Array(vec![
                        Value::Int(i64::from(*truth)),
                        Value::from("="),
                        Value::Int(1),
                    ]),
                    DomainTerm::Logic(op) => Value::from(op.symbol()),
                })
                .collect(),
        )
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&literal::to_literal(&self.to_value()))
    }
}

fn term_from_value(index: usize, item: Value) -> Result<DomainTerm> {
    match item {
        Value::String(s) => LogicOp::from_symbol(&s).map(DomainTerm::Logic).ok_or_else(|| {
            OdqError::Domain(format!(
                "term {}: '{}' is not one of '&', '|', '!'",
                index, s
            ))
        }),
        Value::Array(parts) => {
            let [field, operator, value]: [Value; 3] = parts.try_into().map_err(|p: Vec<Value>| {
                OdqError::Domain(format!(
                    "term {}: a clause needs 3 elements, found {}",
                    index,
                    p.len()
                ))
            })?;
            if let Some(truth) = constant_leaf(&field, &operator, &value) {
                return Ok(DomainTerm::Constant(truth));
            }
            let field = match field {
                Value::String(s) if !s.is_empty() => s,
                other => {
                    return Err(OdqError::Domain(format!(
                        "term {}: field must be a non-empty string, found {}",
                        index,
                        other.kind()
                    )))
                }
            };
            let operator = match operator {
                Value::String(s) if !s.trim().is_empty() => s,
                other => {
                    return Err(OdqError::Domain(format!(
                        "term {}: operator must be a string, found {}",
                        index,
                        other.kind()
                    )))
                }
            };
            Ok(DomainTerm::Clause {
                field,
                operator,
                value,
            })
        }
        other => Err(OdqError::Domain(format!(
            "term {}: expected a clause or '&', '|', '!', found {}",
            index,
            other.kind()
        ))),
    }
}

fn constant_leaf(field: &Value, operator: &Value, value: &Value) -> Option<bool> {
    match (field, operator.as_str(), value) {
        (Value::Int(flag @ (0 | 1)), Some("="), Value::Int(1)) => Some(*flag == 1),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clauses_in_order() {
        let domain = Domain::parse("[('email', '!=', None), ('name', 'ilike', 'acme')]").unwrap();
        assert_eq!(domain.terms().len(), 2);
        assert_eq!(
            domain.terms()[0],
            DomainTerm::Clause {
                field: "email".into(),
                operator: "!=".into(),
                value: Value::Nil,
            }
        );
    }

    #[test]
    fn parses_prefix_operators() {
        let domain = Domain::parse("['|', ('a', '=', 1), ('b', '=', 2)]").unwrap();
        assert_eq!(domain.terms()[0], DomainTerm::Logic(LogicOp::Or));
    }

    #[test]
    fn empty_list_is_unrestricted() {
        let domain = Domain::parse("[]").unwrap();
        assert!(domain.is_empty());
        assert_eq!(domain, Domain::all());
        assert_eq!(domain.to_value(), Value::Array(vec![]));
    }

    #[test]
    fn wire_form_uses_arrays() {
        let domain = Domain::all().with_clause("id", "in", vec![1i64, 2]);
        assert_eq!(domain.to_string(), "[['id', 'in', [1, 2]]]");
    }

    #[test]
    fn rejects_bad_shapes() {
        assert!(matches!(Domain::parse("('a', '=', 1)"), Err(OdqError::Domain(_))));
        assert!(matches!(Domain::parse("[('a', '=')]"), Err(OdqError::Domain(_))));
        assert!(matches!(Domain::parse("[(2, '=', 1)]"), Err(OdqError::Domain(_))));
        assert!(matches!(Domain::parse("[(1, '!=', 1)]"), Err(OdqError::Domain(_))));
        assert!(matches!(Domain::parse("['^']"), Err(OdqError::Domain(_))));
        assert!(matches!(Domain::parse("[42]"), Err(OdqError::Domain(_))));
    }

    #[test]
    fn accepts_constant_leaves() {
        let domain = Domain::parse("['|', (0, '=', 1), (1, '=', 1)]").unwrap();
        assert_eq!(
            domain.terms()[1..],
            [DomainTerm::Constant(false), DomainTerm::Constant(true)]
        );
        assert_eq!(domain.to_string(), "['|', [0, '=', 1], [1, '=', 1]]");
    }

    #[test]
    fn literal_errors_surface_as_literal() {
        assert!(matches!(Domain::parse("[eval('1')]"), Err(OdqError::Literal(_))));
    }
}
