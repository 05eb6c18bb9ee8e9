//! Conversion of formulas to clausal normal form.
//!
//! One pass pushes negations inward, eliminates `->` and `<->`, renames bound
//! variables apart and replaces existentials by Skolem terms; a second pass
//! distributes disjunction over conjunction. Skolem symbols are named `$sk0`,
//! `$sk1`, ... which the formula lexer cannot produce, so they never collide
//! with user symbols.

use super::clause::{Clause, Literal};
use super::formula::{Atom, Formula};
use super::signature::Signature;
use super::term::Term;

/// Clausify a formula set with a single Skolem symbol generator.
pub fn clausify<'a>(formulas: impl IntoIterator<Item = &'a Formula>) -> Vec<Clause> {
    let mut clausifier = Clausifier::new();
    let mut out = Vec::new();
    for formula in formulas {
        for clause in clausifier.clauses(formula) {
            if !out.contains(&clause) {
                out.push(clause);
            }
        }
    }
    out
}

/// Quantifier-free negation normal form.
#[derive(Debug)]
enum Nnf {
    Lit(Literal),
    And(Vec<Nnf>),
    Or(Vec<Nnf>),
}

/// Stateful clausifier; keeps Skolem and variable counters across formulas.
#[derive(Debug, Default)]
pub struct Clausifier {
    skolems: usize,
    fresh: usize,
}

impl Clausifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clauses of `formula`, with tautologies removed.
    pub fn clauses(&mut self, formula: &Formula) -> Vec<Clause> {
        let nnf = self.nnf(formula, true, &mut Vec::new(), &mut Vec::new());
        let mut out: Vec<Clause> = Vec::new();
        for literals in distribute(nnf) {
            let clause = Clause::new(literals);
            if !clause.is_tautology() && !out.contains(&clause) {
                out.push(clause);
            }
        }
        out
    }

    /// `env` maps bound variable names to their replacement, innermost last;
    /// `universals` lists the fresh variables of enclosing universal quantifiers.
    fn nnf(
        &mut self,
        formula: &Formula,
        positive: bool,
        env: &mut Vec<(String, Term)>,
        universals: &mut Vec<Term>,
    ) -> Nnf {
        match formula {
            Formula::Atom(atom) => Nnf::Lit(Literal::new(
                positive,
                Atom::new(
                    atom.predicate.clone(),
                    atom.args.iter().map(|a| resolve(a, env)).collect(),
                ),
            )),
            Formula::Eq(l, r) => Nnf::Lit(Literal::equality(
                positive,
                resolve(l, env),
                resolve(r, env),
            )),
            Formula::Not(inner) => self.nnf(inner, !positive, env, universals),
            Formula::And(l, r) if positive => Nnf::And(vec![
                self.nnf(l, true, env, universals),
                self.nnf(r, true, env, universals),
            ]),
            Formula::And(l, r) => Nnf::Or(vec![
                self.nnf(l, false, env, universals),
                self.nnf(r, false, env, universals),
            ]),
            Formula::Or(l, r) if positive => Nnf::Or(vec![
                self.nnf(l, true, env, universals),
                self.nnf(r, true, env, universals),
            ]),
            Formula::Or(l, r) => Nnf::And(vec![
                self.nnf(l, false, env, universals),
                self.nnf(r, false, env, universals),
            ]),
            Formula::Implies(l, r) if positive => Nnf::Or(vec![
                self.nnf(l, false, env, universals),
                self.nnf(r, true, env, universals),
            ]),
            Formula::Implies(l, r) => Nnf::And(vec![
                self.nnf(l, true, env, universals),
                self.nnf(r, false, env, universals),
            ]),
            Formula::Iff(l, r) => {
                // positive: (-l | r) & (l | -r); negative: (l | r) & (-l | -r)
                let first = Nnf::Or(vec![
                    self.nnf(l, !positive, env, universals),
                    self.nnf(r, true, env, universals),
                ]);
                let second = Nnf::Or(vec![
                    self.nnf(l, positive, env, universals),
                    self.nnf(r, false, env, universals),
                ]);
                Nnf::And(vec![first, second])
            }
            Formula::Forall(var, body) | Formula::Exists(var, body) => {
                let universal = matches!(formula, Formula::Forall(..)) == positive;
                let replacement = if universal {
                    let fresh = Term::Var(format!("{var}#{}", self.fresh));
                    self.fresh += 1;
                    fresh
                } else {
                    let skolem = Term::App(format!("$sk{}", self.skolems), universals.clone());
                    self.skolems += 1;
                    skolem
                };
                env.push((var.clone(), replacement.clone()));
                if universal {
                    universals.push(replacement);
                }
                let result = self.nnf(body, positive, env, universals);
                if universal {
                    universals.pop();
                }
                env.pop();
                result
            }
        }
    }
}

fn resolve(term: &Term, env: &[(String, Term)]) -> Term {
    match term {
        Term::Var(name) => env
            .iter()
            .rev()
            .find(|(bound, _)| bound == name)
            .map_or_else(|| term.clone(), |(_, replacement)| replacement.clone()),
        Term::App(name, args) => {
            Term::App(name.clone(), args.iter().map(|a| resolve(a, env)).collect())
        }
    }
}

fn distribute(nnf: Nnf) -> Vec<Vec<Literal>> {
    match nnf {
        Nnf::Lit(lit) => vec![vec![lit]],
        Nnf::And(parts) => parts.into_iter().flat_map(distribute).collect(),
        Nnf::Or(parts) => parts.into_iter().fold(vec![Vec::new()], |acc, part| {
            let part = distribute(part);
            let mut product = Vec::with_capacity(acc.len() * part.len());
            for left in &acc {
                for right in &part {
                    let mut merged = left.clone();
                    merged.extend(right.iter().cloned());
                    product.push(merged);
                }
            }
            product
        }),
    }
}

// ---------------------------------------------------------------------------
// Equality axioms
// ---------------------------------------------------------------------------

/// Whether any clause mentions equality.
pub fn uses_equality(clauses: &[Clause]) -> bool {
    clauses
        .iter()
        .any(|c| c.literals.iter().any(Literal::is_equality))
}

/// Reflexivity, symmetry, transitivity and congruence axioms for `sig`.
pub fn equality_axioms(sig: &Signature) -> Vec<Clause> {
    let x = || Term::var("x");
    let y = || Term::var("y");
    let z = || Term::var("z");

    let mut axioms = vec![
        Clause::new(vec![Literal::equality(true, x(), x())]),
        Clause::new(vec![
            Literal::equality(false, x(), y()),
            Literal::equality(true, y(), x()),
        ]),
        Clause::new(vec![
            Literal::equality(false, x(), y()),
            Literal::equality(false, y(), z()),
            Literal::equality(true, x(), z()),
        ]),
    ];

    let args_with = |arity: usize, position: usize, at: Term| -> Vec<Term> {
        (0..arity)
            .map(|i| {
                if i == position {
                    at.clone()
                } else {
                    Term::var(format!("a{i}"))
                }
            })
            .collect()
    };

    for (name, &arity) in &sig.functions {
        for i in 0..arity {
            axioms.push(Clause::new(vec![
                Literal::equality(false, x(), y()),
                Literal::equality(
                    true,
                    Term::app(name.clone(), args_with(arity, i, x())),
                    Term::app(name.clone(), args_with(arity, i, y())),
                ),
            ]));
        }
    }
    for (name, &arity) in &sig.predicates {
        for i in 0..arity {
            axioms.push(Clause::new(vec![
                Literal::equality(false, x(), y()),
                Literal::new(false, Atom::new(name.clone(), args_with(arity, i, x()))),
                Literal::new(true, Atom::new(name.clone(), args_with(arity, i, y()))),
            ]));
        }
    }
    axioms
}
