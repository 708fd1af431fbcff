//! Boolean formulas over feature variables.
//!
//! Rules carry their constraint as a small expression tree. The JSON form is
//! externally tagged:
//!
//! ```text
//! {"const": true}            {"var": "A"}           {"not": f}
//! {"and": [f, ..]}           {"or": [f, ..]}
//! {"implies": [f, g]}        {"equiv": [f, g]}
//! ```
//!
//! Additional constraints on a request are plain literal conjunctions such as
//! `A & -B & C`; see [`parse_constraint`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Formula {
    Const(bool),
    Var(String),
    Not(Box<Formula>),
    And(Vec<Formula>),
    Or(Vec<Formula>),
    Implies(Box<Formula>, Box<Formula>),
    Equiv(Box<Formula>, Box<Formula>),
}

impl Formula {
    pub fn var(name: impl Into<String>) -> Self {
        Formula::Var(name.into())
    }

    pub fn not(f: Formula) -> Self {
        Formula::Not(Box::new(f))
    }

    pub fn implies(a: Formula, b: Formula) -> Self {
        Formula::Implies(Box::new(a), Box::new(b))
    }

    /// Evaluate under `assignment`; unassigned variables are false.
    pub fn evaluate(&self, assignment: &Assignment) -> bool {
        match self {
            Formula::Const(b) => *b,
            Formula::Var(v) => assignment.value(v),
            Formula::Not(f) => !f.evaluate(assignment),
            Formula::And(fs) => fs.iter().all(|f| f.evaluate(assignment)),
            Formula::Or(fs) => fs.iter().any(|f| f.evaluate(assignment)),
            Formula::Implies(a, b) => !a.evaluate(assignment) || b.evaluate(assignment),
            Formula::Equiv(a, b) => a.evaluate(assignment) == b.evaluate(assignment),
        }
    }

    pub fn variables(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut BTreeSet<String>) {
        match self {
            Formula::Const(_) => {}
            Formula::Var(v) => {
                out.insert(v.clone());
            }
            Formula::Not(f) => f.collect_variables(out),
            Formula::And(fs) | Formula::Or(fs) => fs.iter().for_each(|f| f.collect_variables(out)),
            Formula::Implies(a, b) | Formula::Equiv(a, b) => {
                a.collect_variables(out);
                b.collect_variables(out);
            }
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, parts: &[Formula], op: &str, neutral: &str) -> fmt::Result {
            if parts.is_empty() {
                return f.write_str(neutral);
            }
            f.write_str("(")?;
            for (idx, part) in parts.iter().enumerate() {
                if idx > 0 {
                    write!(f, " {op} ")?;
                }
                write!(f, "{part}")?;
            }
            f.write_str(")")
        }
        match self {
            Formula::Const(true) => f.write_str("$true"),
            Formula::Const(false) => f.write_str("$false"),
            Formula::Var(v) => f.write_str(v),
            Formula::Not(inner) => write!(f, "-{inner}"),
            Formula::And(parts) => join(f, parts, "&", "$true"),
            Formula::Or(parts) => join(f, parts, "|", "$false"),
            Formula::Implies(a, b) => write!(f, "({a} => {b})"),
            Formula::Equiv(a, b) => write!(f, "({a} <=> {b})"),
        }
    }
}

/// A variable with a phase: `A` (positive) or `-A` (negative).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    pub variable: String,
    pub phase: bool,
}

impl Literal {
    pub fn to_formula(&self) -> Formula {
        let var = Formula::var(self.variable.clone());
        if self.phase { var } else { Formula::not(var) }
    }
}

/// Truth values for a set of variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Assignment(BTreeMap<String, bool>);

impl Assignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, variable: impl Into<String>, value: bool) {
        self.0.insert(variable.into(), value);
    }

    pub fn get(&self, variable: &str) -> Option<bool> {
        self.0.get(variable).copied()
    }

    pub fn value(&self, variable: &str) -> bool {
        self.get(variable).unwrap_or(false)
    }

    /// Variables assigned `true`, in sorted order.
    pub fn positive(&self) -> Vec<&str> {
        self.0.iter().filter(|(_, v)| **v).map(|(k, _)| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parse `lit & lit & ...` where `lit` is an identifier optionally prefixed by `-`.
pub fn parse_constraint(input: &str) -> Result<Vec<Literal>, String> {
    if input.trim().is_empty() {
        return Err("empty constraint".to_string());
    }
    input
        .split('&')
        .map(|token| {
            let token = token.trim();
            let caps = regex!(r"^(-?)\s*([A-Za-z_][A-Za-z0-9_.\-]*)$")
                .captures(token)
                .ok_or_else(|| format!("unexpected token '{token}'"))?;
            Ok(Literal { variable: caps[2].to_string(), phase: caps[1].is_empty() })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_form() {
        let f: Formula = serde_json::from_str(r#"{"implies": [{"var": "A"}, {"not": {"var": "B"}}]}"#).unwrap();
        assert_eq!(f, Formula::implies(Formula::var("A"), Formula::not(Formula::var("B"))));
        assert_eq!(f.to_string(), "(A => -B)");
        let c: Formula = serde_json::from_str(r#"{"const": false}"#).unwrap();
        assert_eq!(c, Formula::Const(false));
    }

    #[test]
    fn evaluation() {
        let f = Formula::Or(vec![Formula::var("A"), Formula::And(vec![Formula::var("B"), Formula::var("C")])]);
        let mut a = Assignment::new();
        assert!(!f.evaluate(&a));
        a.set("B", true);
        a.set("C", true);
        assert!(f.evaluate(&a));
        assert_eq!(f.variables().into_iter().collect::<Vec<_>>(), vec!["A", "B", "C"]);
        assert!(Formula::And(vec![]).evaluate(&a));
        assert!(!Formula::Or(vec![]).evaluate(&a));
    }

    #[test]
    fn constraint_literals() {
        let lits = parse_constraint("A & -B &  C").unwrap();
        assert_eq!(
            lits,
            vec![
                Literal { variable: "A".into(), phase: true },
                Literal { variable: "B".into(), phase: false },
                Literal { variable: "C".into(), phase: true },
            ]
        );
        assert!(parse_constraint("").is_err());
        assert!(parse_constraint("A | B").is_err());
        assert!(parse_constraint("A & ").is_err());
    }
}
