//! Predicate and function symbols with their arities.

use std::collections::BTreeMap;

use super::clause::{Clause, EQUALITY};
use super::formula::{Atom, Formula};
use super::term::Term;
use crate::error::FormulaError;

/// The non-logical symbols of a formula set.
///
/// Predicates and functions live in separate namespaces; constants are
/// functions of arity zero. Equality is built in and never recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    pub predicates: BTreeMap<String, usize>,
    pub functions: BTreeMap<String, usize>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signature of a set of formulas, rejecting inconsistent arities.
    pub fn of_formulas<'a>(
        formulas: impl IntoIterator<Item = &'a Formula>,
    ) -> Result<Signature, FormulaError> {
        let mut sig = Signature::new();
        for formula in formulas {
            sig.add_formula(formula)?;
        }
        Ok(sig)
    }

    /// Signature of a clause set.
    pub fn of_clauses(clauses: &[Clause]) -> Result<Signature, FormulaError> {
        let mut sig = Signature::new();
        for clause in clauses {
            for lit in &clause.literals {
                sig.add_atom(&lit.atom)?;
            }
        }
        Ok(sig)
    }

    pub fn add_formula(&mut self, formula: &Formula) -> Result<(), FormulaError> {
        match formula {
            Formula::Atom(atom) => self.add_atom(atom),
            Formula::Eq(l, r) => {
                self.add_term(l)?;
                self.add_term(r)
            }
            Formula::Not(inner) => self.add_formula(inner),
            Formula::And(l, r)
            | Formula::Or(l, r)
            | Formula::Implies(l, r)
            | Formula::Iff(l, r) => {
                self.add_formula(l)?;
                self.add_formula(r)
            }
            Formula::Forall(_, body) | Formula::Exists(_, body) => self.add_formula(body),
        }
    }

    fn add_atom(&mut self, atom: &Atom) -> Result<(), FormulaError> {
        if atom.predicate != EQUALITY {
            record(&mut self.predicates, &atom.predicate, atom.args.len())?;
        }
        for arg in &atom.args {
            self.add_term(arg)?;
        }
        Ok(())
    }

    fn add_term(&mut self, term: &Term) -> Result<(), FormulaError> {
        if let Term::App(name, args) = term {
            record(&mut self.functions, name, args.len())?;
            for arg in args {
                self.add_term(arg)?;
            }
        }
        Ok(())
    }

    /// Merge another signature into this one.
    pub fn merge(&mut self, other: &Signature) -> Result<(), FormulaError> {
        for (name, &arity) in &other.predicates {
            record(&mut self.predicates, name, arity)?;
        }
        for (name, &arity) in &other.functions {
            record(&mut self.functions, name, arity)?;
        }
        Ok(())
    }

    /// Constants (0-ary function symbols).
    pub fn constants(&self) -> impl Iterator<Item = &str> {
        self.functions
            .iter()
            .filter(|(_, arity)| **arity == 0)
            .map(|(name, _)| name.as_str())
    }
}

fn record(table: &mut BTreeMap<String, usize>, name: &str, arity: usize) -> Result<(), FormulaError> {
    match table.get(name) {
        Some(&existing) if existing != arity => Err(FormulaError::ArityConflict {
            symbol: name.to_string(),
            first: existing,
            second: arity,
        }),
        Some(_) => Ok(()),
        None => {
            table.insert(name.to_string(), arity);
            Ok(())
        }
    }
}
