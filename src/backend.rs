//! Translation and solving backends.
//!
//! The engine never looks inside rules itself. For every slice set it asks a
//! [`Backend`] to transpile the active rules into formulas, to translate the
//! request's additional constraints and to hand out a fresh [`Solver`].
//!
//! [`ReferenceBackend`] is a small, exact implementation meant for modest
//! models and tests: formulas are checked by enumerating the truth table over
//! at most `max_variables` variables.

use crate::error::{EngineError, Result};
use crate::formula::{Assignment, Formula, Literal, parse_constraint};
use crate::model::{Activation, RuleModel};
use std::collections::{BTreeMap, BTreeSet};

/// Formulas for one slice set.
#[derive(Debug, Clone, Default)]
pub struct Translation {
    /// Codes of the features active in the slice set.
    pub features: BTreeSet<String>,
    /// Active rules, plus `-X` for every rule variable whose feature is not active.
    pub formulas: Vec<Formula>,
}

pub trait Backend {
    fn transpile(&self, model: &RuleModel, activation: &Activation) -> Translation;

    /// Translate one additional-constraint string against a transpiled slice set.
    fn translate_constraint(&self, constraint: &str, translation: &Translation) -> Result<Formula>;

    fn new_solver(&self) -> Box<dyn Solver>;
}

pub trait Solver {
    fn add(&mut self, formula: Formula);

    /// Find a satisfying assignment under `assumptions`, or `None` if there is none.
    fn solve(&mut self, assumptions: &[Literal]) -> Result<Option<Assignment>>;
}

// --- Reference backend -------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct ReferenceBackend {
    max_variables: usize,
}

impl ReferenceBackend {
    pub fn new(max_variables: usize) -> Self {
        ReferenceBackend { max_variables }
    }
}

impl Backend for ReferenceBackend {
    fn transpile(&self, _model: &RuleModel, activation: &Activation) -> Translation {
        let features = activation.feature_codes();
        let mut formulas: Vec<Formula> = activation.rules.iter().map(|r| r.formula.clone()).collect();
        let inactive: BTreeSet<String> =
            formulas.iter().flat_map(Formula::variables).filter(|v| !features.contains(v)).collect();
        formulas.extend(inactive.into_iter().map(|v| Formula::not(Formula::Var(v))));
        Translation { features, formulas }
    }

    fn translate_constraint(&self, constraint: &str, translation: &Translation) -> Result<Formula> {
        let fail = |reason: String| EngineError::ConstraintTranslation { constraint: constraint.to_string(), reason };
        let literals = parse_constraint(constraint).map_err(fail)?;
        if let Some(unknown) = literals.iter().find(|l| !translation.features.contains(&l.variable)) {
            return Err(fail(format!("unknown feature '{}'", unknown.variable)));
        }
        Ok(Formula::And(literals.iter().map(Literal::to_formula).collect()))
    }

    fn new_solver(&self) -> Box<dyn Solver> {
        Box::new(TruthTableSolver::new(self.max_variables))
    }
}

/// Exhaustive solver. Assignments are tried in ascending binary order over the
/// sorted variables, so the first model found is deterministic.
#[derive(Debug, Clone)]
pub struct TruthTableSolver {
    max_variables: usize,
    formulas: Vec<Formula>,
}

impl TruthTableSolver {
    pub fn new(max_variables: usize) -> Self {
        TruthTableSolver { max_variables, formulas: Vec::new() }
    }
}

impl Solver for TruthTableSolver {
    fn add(&mut self, formula: Formula) {
        self.formulas.push(formula);
    }

    fn solve(&mut self, assumptions: &[Literal]) -> Result<Option<Assignment>> {
        let mut variables: BTreeSet<String> = self.formulas.iter().flat_map(Formula::variables).collect();
        variables.extend(assumptions.iter().map(|l| l.variable.clone()));
        let limit = self.max_variables.min(usize::BITS as usize - 1);
        if variables.len() > limit {
            return Err(EngineError::Solver(format!(
                "{} variables exceed the truth-table limit of {}",
                variables.len(),
                self.max_variables
            )));
        }

        let index: BTreeMap<&str, usize> = variables.iter().enumerate().map(|(i, v)| (v.as_str(), i)).collect();
        let compiled: Vec<Node> = self.formulas.iter().map(|f| Node::compile(f, &index)).collect();
        let fixed: Vec<(usize, bool)> =
            assumptions.iter().filter_map(|l| index.get(l.variable.as_str()).map(|i| (*i, l.phase))).collect();

        let mut values = vec![false; variables.len()];
        for bits in 0usize..(1usize << variables.len()) {
            for (i, value) in values.iter_mut().enumerate() {
                *value = bits & (1 << i) != 0;
            }
            if fixed.iter().any(|(i, phase)| values[*i] != *phase) {
                continue;
            }
            if compiled.iter().all(|n| n.eval(&values)) {
                let mut assignment = Assignment::new();
                for (name, value) in variables.iter().zip(&values) {
                    assignment.set(name.clone(), *value);
                }
                return Ok(Some(assignment));
            }
        }
        Ok(None)
    }
}

/// Formula with variables replaced by indices into the value vector.
enum Node {
    Const(bool),
    Var(usize),
    Not(Box<Node>),
    And(Vec<Node>),
    Or(Vec<Node>),
    Implies(Box<Node>, Box<Node>),
    Equiv(Box<Node>, Box<Node>),
}

impl Node {
    fn compile(formula: &Formula, index: &BTreeMap<&str, usize>) -> Node {
        match formula {
            Formula::Const(b) => Node::Const(*b),
            Formula::Var(v) => index.get(v.as_str()).map_or(Node::Const(false), |i| Node::Var(*i)),
            Formula::Not(f) => Node::Not(Box::new(Node::compile(f, index))),
            Formula::And(fs) => Node::And(fs.iter().map(|f| Node::compile(f, index)).collect()),
            Formula::Or(fs) => Node::Or(fs.iter().map(|f| Node::compile(f, index)).collect()),
            Formula::Implies(a, b) => Node::Implies(Box::new(Node::compile(a, index)), Box::new(Node::compile(b, index))),
            Formula::Equiv(a, b) => Node::Equiv(Box::new(Node::compile(a, index)), Box::new(Node::compile(b, index))),
        }
    }

    fn eval(&self, values: &[bool]) -> bool {
        match self {
            Node::Const(b) => *b,
            Node::Var(i) => values[*i],
            Node::Not(n) => !n.eval(values),
            Node::And(ns) => ns.iter().all(|n| n.eval(values)),
            Node::Or(ns) => ns.iter().any(|n| n.eval(values)),
            Node::Implies(a, b) => !a.eval(values) || b.eval(values),
            Node::Equiv(a, b) => a.eval(values) == b.eval(values),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slice::Slice;

    fn lit(variable: &str, phase: bool) -> Literal {
        Literal { variable: variable.to_string(), phase }
    }

    #[test]
    fn solver_finds_first_model() {
        let mut solver = TruthTableSolver::new(8);
        solver.add(Formula::Or(vec![Formula::var("A"), Formula::var("B")]));
        let model = solver.solve(&[]).unwrap().unwrap();
        assert!(model.value("A"));
        assert!(!model.value("B"));
        let with_assumption = solver.solve(&[lit("A", false)]).unwrap().unwrap();
        assert!(with_assumption.value("B"));
        assert!(solver.solve(&[lit("A", false), lit("B", false)]).unwrap().is_none());
    }

    #[test]
    fn solver_enforces_variable_limit() {
        let mut solver = TruthTableSolver::new(1);
        solver.add(Formula::And(vec![Formula::var("A"), Formula::var("B")]));
        assert!(matches!(solver.solve(&[]), Err(EngineError::Solver(_))));
    }

    #[test]
    fn inactive_rule_variables_are_forced_false() {
        let model = RuleModel::from_json(
            r#"{ "features": [{ "code": "A" }, { "code": "B" }],
                 "rules": [{ "formula": { "or": [{ "var": "A" }, { "var": "B" }] } }] }"#,
        )
        .unwrap();
        let mut activation = model.activation(&Slice::empty());
        activation.features.retain(|f| f.code == "A");
        let translation = ReferenceBackend::new(8).transpile(&model, &activation);
        assert_eq!(translation.formulas.len(), 2);
        assert_eq!(translation.formulas[1], Formula::not(Formula::var("B")));
    }

    #[test]
    fn constraints_must_name_active_features() {
        let backend = ReferenceBackend::new(8);
        let translation = Translation { features: BTreeSet::from(["A".to_string()]), formulas: vec![] };
        assert_eq!(
            backend.translate_constraint("-A", &translation).unwrap(),
            Formula::And(vec![Formula::not(Formula::var("A"))])
        );
        let err = backend.translate_constraint("A & Z", &translation).unwrap_err();
        assert!(matches!(err, EngineError::ConstraintTranslation { ref reason, .. } if reason.contains("'Z'")));
    }
}
