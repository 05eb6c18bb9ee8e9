//! Clauses: disjunctions of literals with implicitly universal variables.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::formula::Atom;
use super::term::Term;

/// Reserved predicate name for equality literals.
pub const EQUALITY: &str = "=";

/// A possibly negated atom.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    pub positive: bool,
    pub atom: Atom,
}

impl Literal {
    pub fn new(positive: bool, atom: Atom) -> Self {
        Self { positive, atom }
    }

    pub fn equality(positive: bool, left: Term, right: Term) -> Self {
        Self::new(positive, Atom::new(EQUALITY, vec![left, right]))
    }

    pub fn is_equality(&self) -> bool {
        self.atom.predicate == EQUALITY && self.atom.args.len() == 2
    }

    pub fn complement(&self) -> Literal {
        Literal {
            positive: !self.positive,
            atom: self.atom.clone(),
        }
    }

    /// Whether the two literals have the same atom and opposite signs.
    pub fn is_complement_of(&self, other: &Literal) -> bool {
        self.positive != other.positive && self.atom == other.atom
    }

    pub fn weight(&self) -> usize {
        1 + self.atom.args.iter().map(Term::weight).sum::<usize>()
    }

    pub fn map_variables(&self, f: &mut impl FnMut(&str) -> String) -> Literal {
        Literal {
            positive: self.positive,
            atom: Atom::new(
                self.atom.predicate.clone(),
                self.atom.args.iter().map(|a| a.map_variables(f)).collect(),
            ),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_equality() {
            let op = if self.positive { "=" } else { "!=" };
            return write!(f, "{} {op} {}", self.atom.args[0], self.atom.args[1]);
        }
        if !self.positive {
            write!(f, "-")?;
        }
        write!(f, "{}", self.atom)
    }
}

/// A disjunction of literals. The empty clause is falsum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Clause {
    pub literals: Vec<Literal>,
}

impl Clause {
    /// Build a clause, dropping duplicate literals and renaming variables to
    /// `_0`, `_1`, ... in order of first occurrence.
    pub fn new(literals: Vec<Literal>) -> Self {
        let mut unique: Vec<Literal> = Vec::with_capacity(literals.len());
        for lit in literals {
            if !unique.contains(&lit) {
                unique.push(lit);
            }
        }
        Clause { literals: unique }.normalize_variables()
    }

    pub fn empty() -> Self {
        Clause {
            literals: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    /// A clause containing complementary literals, or a positive `t = t`.
    pub fn is_tautology(&self) -> bool {
        self.literals.iter().enumerate().any(|(i, lit)| {
            (lit.positive && lit.is_equality() && lit.atom.args[0] == lit.atom.args[1])
                || self.literals[i + 1..].iter().any(|o| lit.is_complement_of(o))
        })
    }

    pub fn weight(&self) -> usize {
        self.literals.iter().map(Literal::weight).sum()
    }

    pub fn variables(&self) -> BTreeSet<String> {
        let mut vars = BTreeSet::new();
        for lit in &self.literals {
            lit.atom.collect_variables(&mut vars);
        }
        vars
    }

    pub fn is_ground(&self) -> bool {
        self.literals
            .iter()
            .all(|l| l.atom.args.iter().all(Term::is_ground))
    }

    /// Rename every variable with `suffix` appended, to separate this clause
    /// from another before unification.
    pub fn rename_apart(&self, suffix: &str) -> Clause {
        let mut rename = |v: &str| format!("{v}{suffix}");
        Clause {
            literals: self
                .literals
                .iter()
                .map(|l| l.map_variables(&mut rename))
                .collect(),
        }
    }

    fn normalize_variables(self) -> Clause {
        let mut names: BTreeMap<String, String> = BTreeMap::new();
        let mut rename = |v: &str| {
            let next = names.len();
            names
                .entry(v.to_string())
                .or_insert_with(|| format!("_{next}"))
                .clone()
        };
        Clause {
            literals: self
                .literals
                .iter()
                .map(|l| l.map_variables(&mut rename))
                .collect(),
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.literals.is_empty() {
            return write!(f, "$F");
        }
        for (i, lit) in self.literals.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{lit}")?;
        }
        Ok(())
    }
}
