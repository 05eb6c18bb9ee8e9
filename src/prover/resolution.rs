//! Given-clause resolution: the proof-search side of the race.
//!
//! Clauses wait in the set of support until picked as the given clause, which
//! is then resolved and factored against every processed clause. Selection
//! alternates between the lightest waiting clause and the oldest one, so every
//! clause is eventually picked and saturation means satisfiability.

use std::fmt;

use super::cancel::CancelToken;
use super::unify::{subsumes, unify_atoms};
use crate::logic::cnf::{equality_axioms, uses_equality};
use crate::error::FormulaError;
use crate::logic::{Clause, Literal, Signature};

/// Budget for one proof search.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionLimits {
    /// Processed plus waiting clauses at which the search gives up.
    pub max_clauses: usize,
    /// Lightest-first picks per oldest-first pick.
    pub pick_given_ratio: usize,
}

/// Counters reported with every outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProofStats {
    pub given: usize,
    pub generated: usize,
    pub kept: usize,
}

impl fmt::Display for ProofStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} given, {} generated, {} kept",
            self.given, self.generated, self.kept
        )
    }
}

/// How a proof search ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofOutcome {
    /// The empty clause was derived: the clause set is unsatisfiable.
    Refutation(ProofStats),
    /// No new clause can be derived: the clause set is satisfiable.
    Saturated(ProofStats),
    /// The clause budget ran out.
    ResourceLimit(ProofStats),
    Cancelled,
}

/// Run the search over `clauses`. Equality axioms are added when any clause
/// mentions `=`; building them fails if a symbol is used with two arities.
pub fn search(
    clauses: Vec<Clause>,
    limits: ResolutionLimits,
    cancel: &CancelToken,
) -> Result<ProofOutcome, FormulaError> {
    let mut input = clauses;
    if uses_equality(&input) {
        let sig = Signature::of_clauses(&input)?;
        input.extend(equality_axioms(&sig));
    }

    let mut state = SearchState {
        usable: Vec::new(),
        sos: Vec::new(),
        stats: ProofStats::default(),
        limits,
    };

    for clause in input {
        if clause.is_empty() {
            return Ok(ProofOutcome::Refutation(state.stats));
        }
        state.keep(clause);
    }

    let mut picks = 0usize;
    loop {
        if cancel.is_cancelled() {
            return Ok(ProofOutcome::Cancelled);
        }
        let Some(given) = state.pick(picks) else {
            tracing::debug!(stats = %state.stats, "proof search saturated");
            return Ok(ProofOutcome::Saturated(state.stats));
        };
        picks += 1;
        state.stats.given += 1;

        if state.usable.iter().any(|u| subsumes(u, &given)) {
            continue;
        }

        let mut inferred = factors(&given);
        let renamed = given.rename_apart("'");
        inferred.extend(resolvents(&renamed, &given));
        for other in &state.usable {
            inferred.extend(resolvents(&renamed, other));
        }
        state.usable.push(given);

        for clause in inferred {
            state.stats.generated += 1;
            if clause.is_empty() {
                tracing::debug!(stats = %state.stats, "proof search found refutation");
                return Ok(ProofOutcome::Refutation(state.stats));
            }
            if clause.is_tautology() || state.is_subsumed(&clause) {
                continue;
            }
            state.keep(clause);
            if state.usable.len() + state.sos.len() > state.limits.max_clauses {
                tracing::debug!(stats = %state.stats, "proof search hit clause limit");
                return Ok(ProofOutcome::ResourceLimit(state.stats));
            }
        }
    }
}

struct SearchState {
    usable: Vec<Clause>,
    sos: Vec<Clause>,
    stats: ProofStats,
    limits: ResolutionLimits,
}

impl SearchState {
    fn keep(&mut self, clause: Clause) {
        if clause.is_tautology() {
            return;
        }
        self.stats.kept += 1;
        self.sos.push(clause);
    }

    fn is_subsumed(&self, clause: &Clause) -> bool {
        self.usable
            .iter()
            .chain(&self.sos)
            .any(|existing| subsumes(existing, clause))
    }

    fn pick(&mut self, picks: usize) -> Option<Clause> {
        if self.sos.is_empty() {
            return None;
        }
        let by_age = picks % (self.limits.pick_given_ratio + 1) == self.limits.pick_given_ratio;
        let index = if by_age {
            0
        } else {
            self.sos
                .iter()
                .enumerate()
                .min_by_key(|(i, c)| (c.weight(), *i))
                .map_or(0, |(i, _)| i)
        };
        Some(self.sos.remove(index))
    }
}

/// Binary resolvents of `left` and `right`, which must not share variables.
fn resolvents(left: &Clause, right: &Clause) -> Vec<Clause> {
    let mut out = Vec::new();
    for (i, l) in left.literals.iter().enumerate() {
        for (j, r) in right.literals.iter().enumerate() {
            if l.positive == r.positive {
                continue;
            }
            let Some(subst) = unify_atoms(&l.atom, &r.atom) else {
                continue;
            };
            let literals: Vec<Literal> = left
                .literals
                .iter()
                .enumerate()
                .filter(|&(k, _)| k != i)
                .map(|(_, lit)| lit)
                .chain(
                    right
                        .literals
                        .iter()
                        .enumerate()
                        .filter(|&(k, _)| k != j)
                        .map(|(_, lit)| lit),
                )
                .map(|lit| subst.apply_literal(lit))
                .collect();
            out.push(Clause::new(literals));
        }
    }
    out
}

/// Factors of `clause`: unify two literals of the same sign.
fn factors(clause: &Clause) -> Vec<Clause> {
    let mut out = Vec::new();
    for (i, a) in clause.literals.iter().enumerate() {
        for b in &clause.literals[i + 1..] {
            if a.positive != b.positive {
                continue;
            }
            if let Some(subst) = unify_atoms(&a.atom, &b.atom) {
                let literals = clause
                    .literals
                    .iter()
                    .map(|lit| subst.apply_literal(lit))
                    .collect();
                out.push(Clause::new(literals));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::Formula;
    use crate::logic::cnf::clausify;

    fn limits() -> ResolutionLimits {
        ResolutionLimits {
            max_clauses: 5_000,
            pick_given_ratio: 4,
        }
    }

    fn run(formulas: &[&str]) -> ProofOutcome {
        let parsed: Vec<Formula> = formulas.iter().map(|f| Formula::parse(f).unwrap()).collect();
        search(clausify(&parsed), limits(), &CancelToken::new()).unwrap()
    }

    #[test]
    fn refutes_direct_contradiction() {
        assert!(matches!(run(&["P(a)", "-P(a)"]), ProofOutcome::Refutation(_)));
    }

    #[test]
    fn refutes_through_universal_rule() {
        let outcome = run(&[
            "UnitedStates(h)",
            "Young(h)",
            "all x.(Young(x) -> -Read(x))",
            "all x.(UnitedStates(x) -> Read(x))",
        ]);
        assert!(matches!(outcome, ProofOutcome::Refutation(_)));
    }

    #[test]
    fn saturates_on_satisfiable_set() {
        let outcome = run(&["P(a)", "all x.(P(x) -> Q(x))"]);
        assert!(matches!(outcome, ProofOutcome::Saturated(_)));
    }

    #[test]
    fn factoring_is_needed_for_this_refutation() {
        // {P(x) | P(y)}, {-P(u) | -P(v)} has no refutation without factoring.
        let outcome = run(&["all x y.(P(x) | P(y))", "all u v.(-P(u) | -P(v))"]);
        assert!(matches!(outcome, ProofOutcome::Refutation(_)));
    }

    #[test]
    fn uses_equality_axioms() {
        let outcome = run(&["a = b", "P(a)", "-P(b)"]);
        assert!(matches!(outcome, ProofOutcome::Refutation(_)));
    }

    #[test]
    fn infinite_herbrand_universe_hits_limit() {
        let tight = ResolutionLimits {
            max_clauses: 50,
            pick_given_ratio: 4,
        };
        let parsed = vec![
            Formula::parse("P(a)").unwrap(),
            Formula::parse("all x.(P(x) -> P(f(x)))").unwrap(),
        ];
        let outcome = search(clausify(&parsed), tight, &CancelToken::new()).unwrap();
        assert!(matches!(outcome, ProofOutcome::ResourceLimit(_)));
    }

    #[test]
    fn stops_when_cancelled() {
        let token = CancelToken::new();
        token.cancel();
        let parsed = vec![Formula::parse("P(a)").unwrap()];
        assert_eq!(
            search(clausify(&parsed), limits(), &token).unwrap(),
            ProofOutcome::Cancelled
        );
    }

    #[test]
    fn equality_axioms_reject_arity_conflicts() {
        let parsed: Vec<Formula> = ["a = b", "P(a)", "-P(a, b)"]
            .iter()
            .map(|t| Formula::parse(t).unwrap())
            .collect();
        let err = search(clausify(&parsed), limits(), &CancelToken::new()).unwrap_err();
        assert!(matches!(err, FormulaError::ArityConflict { .. }));
    }
}
