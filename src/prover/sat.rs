//! A small DPLL solver with unit propagation, used to decide the predicate
//! part of a candidate finite interpretation.

use super::cancel::CancelToken;

/// A propositional literal over variable `var`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SatLit {
    pub var: usize,
    pub positive: bool,
}

impl SatLit {
    pub fn new(var: usize, positive: bool) -> Self {
        Self { var, positive }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatResult {
    /// A satisfying assignment; variables left open by the search are false.
    Sat(Vec<bool>),
    Unsat,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reason {
    Decision,
    /// Either propagated, or the second branch of a decision.
    Forced,
}

enum Propagation {
    Ok,
    Conflict,
}

/// Decide satisfiability of `clauses` over variables `0..num_vars`.
pub fn solve(num_vars: usize, clauses: &[Vec<SatLit>], cancel: &CancelToken) -> SatResult {
    let mut assign: Vec<Option<bool>> = vec![None; num_vars];
    let mut trail: Vec<(usize, Reason)> = Vec::new();

    loop {
        if cancel.is_cancelled() {
            return SatResult::Cancelled;
        }
        match propagate(clauses, &mut assign, &mut trail) {
            Propagation::Conflict => {
                if !backtrack(&mut assign, &mut trail) {
                    return SatResult::Unsat;
                }
            }
            Propagation::Ok => match choose(clauses, &assign) {
                Some(lit) => {
                    assign[lit.var] = Some(lit.positive);
                    trail.push((lit.var, Reason::Decision));
                }
                None => {
                    return SatResult::Sat(assign.into_iter().map(|v| v.unwrap_or(false)).collect());
                }
            },
        }
    }
}

fn value(assign: &[Option<bool>], lit: SatLit) -> Option<bool> {
    assign[lit.var].map(|v| v == lit.positive)
}

fn propagate(
    clauses: &[Vec<SatLit>],
    assign: &mut [Option<bool>],
    trail: &mut Vec<(usize, Reason)>,
) -> Propagation {
    loop {
        let mut changed = false;
        for clause in clauses {
            let mut open = None;
            let mut open_count = 0;
            let mut satisfied = false;
            for &lit in clause {
                match value(assign, lit) {
                    Some(true) => {
                        satisfied = true;
                        break;
                    }
                    Some(false) => {}
                    None => {
                        open_count += 1;
                        open = Some(lit);
                    }
                }
            }
            if satisfied {
                continue;
            }
            match (open_count, open) {
                (0, _) => return Propagation::Conflict,
                (1, Some(lit)) => {
                    assign[lit.var] = Some(lit.positive);
                    trail.push((lit.var, Reason::Forced));
                    changed = true;
                }
                _ => {}
            }
        }
        if !changed {
            return Propagation::Ok;
        }
    }
}

/// Undo to the most recent untried decision and flip it.
fn backtrack(assign: &mut [Option<bool>], trail: &mut Vec<(usize, Reason)>) -> bool {
    while let Some((var, reason)) = trail.pop() {
        let previous = assign[var].take();
        if reason == Reason::Decision {
            let flipped = !previous.unwrap_or(true);
            assign[var] = Some(flipped);
            trail.push((var, Reason::Forced));
            return true;
        }
    }
    false
}

/// First open literal of the first clause not yet satisfied.
fn choose(clauses: &[Vec<SatLit>], assign: &[Option<bool>]) -> Option<SatLit> {
    clauses
        .iter()
        .filter(|clause| !clause.iter().any(|&l| value(assign, l) == Some(true)))
        .find_map(|clause| clause.iter().copied().find(|&l| value(assign, l).is_none()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(v: usize) -> SatLit {
        SatLit::new(v, true)
    }
    fn neg(v: usize) -> SatLit {
        SatLit::new(v, false)
    }

    fn satisfies(assignment: &[bool], clauses: &[Vec<SatLit>]) -> bool {
        clauses
            .iter()
            .all(|c| c.iter().any(|l| assignment[l.var] == l.positive))
    }

    #[test]
    fn finds_assignment() {
        let clauses = vec![vec![pos(0), pos(1)], vec![neg(0)], vec![neg(1), pos(2)]];
        match solve(3, &clauses, &CancelToken::new()) {
            SatResult::Sat(a) => assert!(satisfies(&a, &clauses)),
            other => panic!("expected sat, got {other:?}"),
        }
    }

    #[test]
    fn detects_unsatisfiable_core() {
        let clauses = vec![
            vec![pos(0), pos(1)],
            vec![pos(0), neg(1)],
            vec![neg(0), pos(1)],
            vec![neg(0), neg(1)],
        ];
        assert_eq!(solve(2, &clauses, &CancelToken::new()), SatResult::Unsat);
    }

    #[test]
    fn empty_clause_is_unsat() {
        assert_eq!(solve(1, &[vec![]], &CancelToken::new()), SatResult::Unsat);
    }

    #[test]
    fn no_clauses_is_sat() {
        assert_eq!(
            solve(2, &[], &CancelToken::new()),
            SatResult::Sat(vec![false, false])
        );
    }

    #[test]
    fn pigeonhole_three_into_two_is_unsat() {
        // p(i,h) = pigeon i in hole h, var = 2*i + h
        let mut clauses = Vec::new();
        for i in 0..3 {
            clauses.push(vec![pos(2 * i), pos(2 * i + 1)]);
        }
        for h in 0..2 {
            for i in 0..3 {
                for j in i + 1..3 {
                    clauses.push(vec![neg(2 * i + h), neg(2 * j + h)]);
                }
            }
        }
        assert_eq!(solve(6, &clauses, &CancelToken::new()), SatResult::Unsat);
    }

    #[test]
    fn honours_cancellation() {
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(solve(1, &[vec![pos(0)]], &token), SatResult::Cancelled);
    }
}
