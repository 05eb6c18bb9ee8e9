//! First-order logic: terms, formulas, parsing and clausal normal form.

pub mod clause;
pub mod cnf;
pub mod formula;
pub mod lexer;
pub mod parser;
pub mod signature;
pub mod term;

pub use clause::{Clause, Literal};
pub use formula::{Atom, Formula};
pub use signature::Signature;
pub use term::Term;
