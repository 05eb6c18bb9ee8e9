//! First-order terms: variables and function applications (constants are 0-ary).

use std::collections::BTreeSet;
use std::fmt;

/// A first-order term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    /// A variable, bound by a quantifier (or implicitly universal inside a clause).
    Var(String),
    /// Function application `f(t1, ..., tn)`; constants have no arguments.
    App(String, Vec<Term>),
}

impl Term {
    /// Create a variable term.
    pub fn var(name: impl Into<String>) -> Self {
        Term::Var(name.into())
    }

    /// Create a constant (0-ary application).
    pub fn constant(name: impl Into<String>) -> Self {
        Term::App(name.into(), Vec::new())
    }

    /// Create a function application.
    pub fn app(name: impl Into<String>, args: Vec<Term>) -> Self {
        Term::App(name.into(), args)
    }

    /// Whether the term contains no variables.
    pub fn is_ground(&self) -> bool {
        match self {
            Term::Var(_) => false,
            Term::App(_, args) => args.iter().all(Term::is_ground),
        }
    }

    /// Whether `var` occurs anywhere in this term.
    pub fn occurs(&self, var: &str) -> bool {
        match self {
            Term::Var(v) => v == var,
            Term::App(_, args) => args.iter().any(|a| a.occurs(var)),
        }
    }

    /// Collect the variables of this term into `out`.
    pub fn collect_variables(&self, out: &mut BTreeSet<String>) {
        match self {
            Term::Var(v) => {
                out.insert(v.clone());
            }
            Term::App(_, args) => {
                for arg in args {
                    arg.collect_variables(out);
                }
            }
        }
    }

    /// Number of symbol occurrences; used as clause weight by the proof search.
    pub fn weight(&self) -> usize {
        match self {
            Term::Var(_) => 1,
            Term::App(_, args) => 1 + args.iter().map(Term::weight).sum::<usize>(),
        }
    }

    /// Rename every variable through `f`.
    pub fn map_variables(&self, f: &mut impl FnMut(&str) -> String) -> Term {
        match self {
            Term::Var(v) => Term::Var(f(v)),
            Term::App(name, args) => Term::App(
                name.clone(),
                args.iter().map(|a| a.map_variables(f)).collect(),
            ),
        }
    }

    /// Replace free occurrences of `var` with `replacement`.
    pub fn substitute(&self, var: &str, replacement: &Term) -> Term {
        match self {
            Term::Var(v) if v == var => replacement.clone(),
            Term::Var(_) => self.clone(),
            Term::App(name, args) => Term::App(
                name.clone(),
                args.iter().map(|a| a.substitute(var, replacement)).collect(),
            ),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Var(v) => write!(f, "{v}"),
            Term::App(name, args) if args.is_empty() => write!(f, "{name}"),
            Term::App(name, args) => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_is_ground_variable_is_not() {
        assert!(Term::constant("henry").is_ground());
        assert!(!Term::var("x").is_ground());
        assert!(!Term::app("f", vec![Term::constant("a"), Term::var("x")]).is_ground());
    }

    #[test]
    fn occurs_finds_nested_variable() {
        let t = Term::app("f", vec![Term::app("g", vec![Term::var("x")])]);
        assert!(t.occurs("x"));
        assert!(!t.occurs("y"));
    }

    #[test]
    fn substitute_replaces_only_target() {
        let t = Term::app("f", vec![Term::var("x"), Term::var("y")]);
        let s = t.substitute("x", &Term::constant("a"));
        assert_eq!(s, Term::app("f", vec![Term::constant("a"), Term::var("y")]));
    }

    #[test]
    fn display_uses_comma_separated_arguments() {
        let t = Term::app("f", vec![Term::constant("a"), Term::var("x")]);
        assert_eq!(t.to_string(), "f(a,x)");
        assert_eq!(Term::constant("henry").to_string(), "henry");
    }

    #[test]
    fn weight_counts_symbols() {
        let t = Term::app("f", vec![Term::constant("a"), Term::var("x")]);
        assert_eq!(t.weight(), 3);
    }
}
