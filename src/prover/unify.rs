//! Robinson unification with occurs check, and one-way matching.

use std::collections::HashMap;

use crate::logic::{Atom, Clause, Literal, Term};

/// A mapping from variable names to terms. Bindings may chain; `apply`
/// resolves them fully.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Substitution {
    bindings: HashMap<String, Term>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn apply(&self, term: &Term) -> Term {
        match term {
            Term::Var(v) => match self.bindings.get(v) {
                Some(bound) => self.apply(bound),
                None => term.clone(),
            },
            Term::App(name, args) => {
                Term::App(name.clone(), args.iter().map(|a| self.apply(a)).collect())
            }
        }
    }

    pub fn apply_atom(&self, atom: &Atom) -> Atom {
        Atom::new(
            atom.predicate.clone(),
            atom.args.iter().map(|a| self.apply(a)).collect(),
        )
    }

    pub fn apply_literal(&self, lit: &Literal) -> Literal {
        Literal::new(lit.positive, self.apply_atom(&lit.atom))
    }

    /// Follow variable bindings until reaching an unbound variable or an application.
    fn walk<'a>(&'a self, term: &'a Term) -> &'a Term {
        let mut current = term;
        while let Term::Var(v) = current {
            match self.bindings.get(v) {
                Some(next) => current = next,
                None => break,
            }
        }
        current
    }

    fn occurs(&self, var: &str, term: &Term) -> bool {
        match self.walk(term) {
            Term::Var(v) => v == var,
            Term::App(_, args) => args.iter().any(|a| self.occurs(var, a)),
        }
    }
}

/// Extend `subst` so that `a` and `b` become equal. On failure `subst` may
/// hold partial bindings; callers unify into a clone.
pub fn unify(a: &Term, b: &Term, subst: &mut Substitution) -> bool {
    let a = subst.walk(a).clone();
    let b = subst.walk(b).clone();
    match (&a, &b) {
        (Term::Var(x), Term::Var(y)) if x == y => true,
        (Term::Var(x), other) | (other, Term::Var(x)) => {
            if subst.occurs(x, other) {
                return false;
            }
            subst.bindings.insert(x.clone(), other.clone());
            true
        }
        (Term::App(f, fa), Term::App(g, ga)) => {
            f == g
                && fa.len() == ga.len()
                && fa.iter().zip(ga).all(|(s, t)| unify(s, t, subst))
        }
    }
}

/// Most general unifier of two atoms, if any.
pub fn unify_atoms(a: &Atom, b: &Atom) -> Option<Substitution> {
    if a.predicate != b.predicate || a.args.len() != b.args.len() {
        return None;
    }
    let mut subst = Substitution::new();
    a.args
        .iter()
        .zip(&b.args)
        .all(|(s, t)| unify(s, t, &mut subst))
        .then_some(subst)
}

/// One-way matching: bind variables of `general` only, so that it becomes
/// identical to `specific`.
fn match_term(general: &Term, specific: &Term, subst: &mut HashMap<String, Term>) -> bool {
    match general {
        Term::Var(v) => match subst.get(v) {
            Some(bound) => bound == specific,
            None => {
                subst.insert(v.clone(), specific.clone());
                true
            }
        },
        Term::App(f, fa) => match specific {
            Term::App(g, ga) if f == g && fa.len() == ga.len() => {
                fa.iter().zip(ga).all(|(s, t)| match_term(s, t, subst))
            }
            _ => false,
        },
    }
}

fn match_literal(general: &Literal, specific: &Literal, subst: &mut HashMap<String, Term>) -> bool {
    general.positive == specific.positive
        && general.atom.predicate == specific.atom.predicate
        && general.atom.args.len() == specific.atom.args.len()
        && general
            .atom
            .args
            .iter()
            .zip(&specific.atom.args)
            .all(|(s, t)| match_term(s, t, subst))
}

/// Whether `general` subsumes `specific`: some instance of `general` has all
/// its literals in `specific`. Both clauses are assumed to be variable-disjoint
/// or `specific` treated as ground.
pub fn subsumes(general: &Clause, specific: &Clause) -> bool {
    if general.len() > specific.len() {
        return false;
    }
    subsumes_from(&general.literals, specific, &HashMap::new())
}

fn subsumes_from(remaining: &[Literal], specific: &Clause, subst: &HashMap<String, Term>) -> bool {
    let Some((first, rest)) = remaining.split_first() else {
        return true;
    };
    specific.literals.iter().any(|candidate| {
        let mut extended = subst.clone();
        match_literal(first, candidate, &mut extended) && subsumes_from(rest, specific, &extended)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(pred: &str, args: Vec<Term>) -> Atom {
        Atom::new(pred, args)
    }

    #[test]
    fn unifies_variable_with_constant() {
        let s = unify_atoms(
            &atom("P", vec![Term::var("x"), Term::constant("b")]),
            &atom("P", vec![Term::constant("a"), Term::var("y")]),
        )
        .unwrap();
        assert_eq!(s.apply(&Term::var("x")), Term::constant("a"));
        assert_eq!(s.apply(&Term::var("y")), Term::constant("b"));
    }

    #[test]
    fn occurs_check_rejects_cyclic_binding() {
        let f_x = Term::app("f", vec![Term::var("x")]);
        assert!(unify_atoms(&atom("P", vec![Term::var("x")]), &atom("P", vec![f_x])).is_none());
    }

    #[test]
    fn clash_of_function_symbols_fails() {
        assert!(unify_atoms(
            &atom("P", vec![Term::constant("a")]),
            &atom("P", vec![Term::constant("b")])
        )
        .is_none());
        assert!(unify_atoms(&atom("P", vec![]), &atom("Q", vec![])).is_none());
    }

    #[test]
    fn chained_bindings_resolve_fully() {
        let s = unify_atoms(
            &atom("P", vec![Term::var("x"), Term::var("y")]),
            &atom("P", vec![Term::var("y"), Term::app("g", vec![Term::constant("c")])]),
        )
        .unwrap();
        assert_eq!(
            s.apply(&Term::var("x")),
            Term::app("g", vec![Term::constant("c")])
        );
    }

    #[test]
    fn general_clause_subsumes_instance() {
        let general = Clause::new(vec![Literal::new(true, atom("P", vec![Term::var("x")]))]);
        let specific = Clause::new(vec![
            Literal::new(true, atom("P", vec![Term::constant("a")])),
            Literal::new(false, atom("Q", vec![Term::constant("a")])),
        ]);
        assert!(subsumes(&general, &specific));
        assert!(!subsumes(&specific, &general));
    }

    #[test]
    fn matching_respects_repeated_variables() {
        let general = Clause::new(vec![Literal::new(
            true,
            atom("R", vec![Term::var("x"), Term::var("x")]),
        )]);
        let specific = Clause::new(vec![Literal::new(
            true,
            atom("R", vec![Term::constant("a"), Term::constant("b")]),
        )]);
        assert!(!subsumes(&general, &specific));
    }
}
