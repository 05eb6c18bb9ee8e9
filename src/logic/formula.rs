//! First-order formulas as supplied by the formula source.
//!
//! A [`Formula`] is immutable and compared structurally. Its `Display` form is
//! the canonical text used in logs, reports and serialized scenarios, and it
//! parses back to the same formula.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::parser;
use super::term::Term;
use crate::error::FormulaError;

/// A predicate applied to argument terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Atom {
    pub predicate: String,
    pub args: Vec<Term>,
}

impl Atom {
    pub fn new(predicate: impl Into<String>, args: Vec<Term>) -> Self {
        Self {
            predicate: predicate.into(),
            args,
        }
    }

    pub fn collect_variables(&self, out: &mut BTreeSet<String>) {
        for arg in &self.args {
            arg.collect_variables(out);
        }
    }

    fn substitute(&self, var: &str, replacement: &Term) -> Atom {
        Atom {
            predicate: self.predicate.clone(),
            args: self
                .args
                .iter()
                .map(|a| a.substitute(var, replacement))
                .collect(),
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            return write!(f, "{}", self.predicate);
        }
        write!(f, "{}(", self.predicate)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")
    }
}

/// A first-order logic statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Formula {
    Atom(Atom),
    /// Equality between two terms.
    Eq(Term, Term),
    Not(Box<Formula>),
    And(Box<Formula>, Box<Formula>),
    Or(Box<Formula>, Box<Formula>),
    Implies(Box<Formula>, Box<Formula>),
    Iff(Box<Formula>, Box<Formula>),
    Forall(String, Box<Formula>),
    Exists(String, Box<Formula>),
}

impl Formula {
    /// Parse a formula from its textual form.
    pub fn parse(source: &str) -> Result<Formula, FormulaError> {
        parser::parse_formula(source)
    }

    pub fn atom(predicate: impl Into<String>, args: Vec<Term>) -> Self {
        Formula::Atom(Atom::new(predicate, args))
    }

    /// A 0-ary predicate (proposition).
    pub fn prop(name: impl Into<String>) -> Self {
        Formula::Atom(Atom::new(name, Vec::new()))
    }

    pub fn eq(left: Term, right: Term) -> Self {
        Formula::Eq(left, right)
    }

    pub fn not(inner: Formula) -> Self {
        Formula::Not(Box::new(inner))
    }

    pub fn and(left: Formula, right: Formula) -> Self {
        Formula::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Formula, right: Formula) -> Self {
        Formula::Or(Box::new(left), Box::new(right))
    }

    pub fn implies(left: Formula, right: Formula) -> Self {
        Formula::Implies(Box::new(left), Box::new(right))
    }

    pub fn iff(left: Formula, right: Formula) -> Self {
        Formula::Iff(Box::new(left), Box::new(right))
    }

    pub fn forall(var: impl Into<String>, body: Formula) -> Self {
        Formula::Forall(var.into(), Box::new(body))
    }

    pub fn exists(var: impl Into<String>, body: Formula) -> Self {
        Formula::Exists(var.into(), Box::new(body))
    }

    /// Logical negation of this formula.
    pub fn negate(&self) -> Formula {
        Formula::not(self.clone())
    }

    /// Variables occurring outside the scope of any binding quantifier.
    pub fn free_variables(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_free(&mut Vec::new(), &mut out);
        out
    }

    fn collect_free(&self, bound: &mut Vec<String>, out: &mut BTreeSet<String>) {
        match self {
            Formula::Atom(atom) => {
                for arg in &atom.args {
                    free_in_term(arg, bound, out);
                }
            }
            Formula::Eq(l, r) => {
                free_in_term(l, bound, out);
                free_in_term(r, bound, out);
            }
            Formula::Not(inner) => inner.collect_free(bound, out),
            Formula::And(l, r)
            | Formula::Or(l, r)
            | Formula::Implies(l, r)
            | Formula::Iff(l, r) => {
                l.collect_free(bound, out);
                r.collect_free(bound, out);
            }
            Formula::Forall(v, body) | Formula::Exists(v, body) => {
                bound.push(v.clone());
                body.collect_free(bound, out);
                bound.pop();
            }
        }
    }

    /// Replace free occurrences of `var` with `replacement`.
    ///
    /// Callers must ensure `replacement` contains no variable that a quantifier
    /// inside `self` binds; clausification standardises bound variables apart first.
    pub fn substitute(&self, var: &str, replacement: &Term) -> Formula {
        match self {
            Formula::Atom(atom) => Formula::Atom(atom.substitute(var, replacement)),
            Formula::Eq(l, r) => Formula::Eq(
                l.substitute(var, replacement),
                r.substitute(var, replacement),
            ),
            Formula::Not(inner) => Formula::not(inner.substitute(var, replacement)),
            Formula::And(l, r) => Formula::and(
                l.substitute(var, replacement),
                r.substitute(var, replacement),
            ),
            Formula::Or(l, r) => Formula::or(
                l.substitute(var, replacement),
                r.substitute(var, replacement),
            ),
            Formula::Implies(l, r) => Formula::implies(
                l.substitute(var, replacement),
                r.substitute(var, replacement),
            ),
            Formula::Iff(l, r) => Formula::iff(
                l.substitute(var, replacement),
                r.substitute(var, replacement),
            ),
            Formula::Forall(v, _) | Formula::Exists(v, _) if v == var => self.clone(),
            Formula::Forall(v, body) => {
                Formula::forall(v.clone(), body.substitute(var, replacement))
            }
            Formula::Exists(v, body) => {
                Formula::exists(v.clone(), body.substitute(var, replacement))
            }
        }
    }

    fn is_quantified(&self) -> bool {
        match self {
            Formula::Forall(..) | Formula::Exists(..) => true,
            Formula::Not(inner) => inner.is_quantified(),
            _ => false,
        }
    }
}

fn free_in_term(term: &Term, bound: &[String], out: &mut BTreeSet<String>) {
    let mut vars = BTreeSet::new();
    term.collect_variables(&mut vars);
    out.extend(vars.into_iter().filter(|v| !bound.contains(v)));
}

/// Quantifier bodies extend to the right, so a quantified left operand needs
/// its own parentheses to read back unchanged.
fn fmt_operand(f: &mut fmt::Formatter<'_>, operand: &Formula) -> fmt::Result {
    if operand.is_quantified() {
        write!(f, "({operand})")
    } else {
        write!(f, "{operand}")
    }
}

fn fmt_binary(f: &mut fmt::Formatter<'_>, l: &Formula, op: &str, r: &Formula) -> fmt::Result {
    write!(f, "(")?;
    fmt_operand(f, l)?;
    write!(f, " {op} ")?;
    fmt_operand(f, r)?;
    write!(f, ")")
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::Atom(atom) => write!(f, "{atom}"),
            Formula::Eq(l, r) => write!(f, "({l} = {r})"),
            Formula::Not(inner) => match inner.as_ref() {
                Formula::Eq(l, r) => write!(f, "({l} != {r})"),
                other => write!(f, "-{other}"),
            },
            Formula::And(l, r) => fmt_binary(f, l, "&", r),
            Formula::Or(l, r) => fmt_binary(f, l, "|", r),
            Formula::Implies(l, r) => fmt_binary(f, l, "->", r),
            Formula::Iff(l, r) => fmt_binary(f, l, "<->", r),
            Formula::Forall(v, body) => write!(f, "all {v}.{body}"),
            Formula::Exists(v, body) => write!(f, "exists {v}.{body}"),
        }
    }
}

impl FromStr for Formula {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Formula::parse(s)
    }
}

impl Serialize for Formula {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Formula {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Formula::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn young_not_read() -> Formula {
        Formula::forall(
            "x",
            Formula::implies(
                Formula::atom("Young", vec![Term::var("x")]),
                Formula::not(Formula::atom("Read", vec![Term::var("x")])),
            ),
        )
    }

    #[test]
    fn display_matches_canonical_syntax() {
        assert_eq!(young_not_read().to_string(), "all x.(Young(x) -> -Read(x))");
        let goal = Formula::not(Formula::atom("Read", vec![Term::constant("h")]));
        assert_eq!(goal.to_string(), "-Read(h)");
    }

    #[test]
    fn negated_equality_renders_as_inequality() {
        let f = Formula::not(Formula::eq(Term::constant("a"), Term::constant("b")));
        assert_eq!(f.to_string(), "(a != b)");
    }

    #[test]
    fn quantified_left_operand_is_parenthesised() {
        let f = Formula::and(
            Formula::forall("x", Formula::atom("P", vec![Term::var("x")])),
            Formula::prop("Q"),
        );
        assert_eq!(f.to_string(), "((all x.P(x)) & Q)");
        assert_eq!(Formula::parse(&f.to_string()).unwrap(), f);
    }

    #[test]
    fn negate_wraps_in_not() {
        let f = young_not_read();
        assert_eq!(f.negate(), Formula::Not(Box::new(f.clone())));
        assert_ne!(f.negate(), f);
    }

    #[test]
    fn free_variables_ignore_bound_ones() {
        assert!(young_not_read().free_variables().is_empty());
        let open = Formula::atom("P", vec![Term::var("x"), Term::var("y")]);
        let closed_x = Formula::forall("x", open);
        let free: Vec<_> = closed_x.free_variables().into_iter().collect();
        assert_eq!(free, vec!["y".to_string()]);
    }

    #[test]
    fn substitute_stops_at_rebinding_quantifier() {
        let inner = Formula::forall("x", Formula::atom("P", vec![Term::var("x")]));
        let f = Formula::and(Formula::atom("P", vec![Term::var("x")]), inner.clone());
        let s = f.substitute("x", &Term::constant("a"));
        assert_eq!(
            s,
            Formula::and(Formula::atom("P", vec![Term::constant("a")]), inner)
        );
    }

    #[test]
    fn serde_round_trips_through_text() {
        let f = young_not_read();
        let json = serde_json::to_string(&f).unwrap();
        assert_eq!(json, "\"all x.(Young(x) -> -Read(x))\"");
        let back: Formula = serde_json::from_str(&json).unwrap();
        assert_eq!(back, f);
    }
}
