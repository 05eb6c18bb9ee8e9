//! Inference backend: proof search raced against finite model search.
//!
//! The default-theory layer only sees the [`InferenceEngine`] capability; the
//! concrete [`RacingEngine`] clausifies each query and runs both searches on
//! their own threads, taking whichever reaches a definitive answer first.

pub mod cancel;
pub mod model;
pub mod race;
pub mod resolution;
pub mod sat;
pub mod unify;

use std::fmt;
use std::time::Duration;

use crate::error::InferError;
use crate::logic::Formula;

pub use cancel::CancelToken;
pub use model::Model;
pub use race::RacingEngine;

/// The two questions the default-theory layer asks.
///
/// Implementations must be reentrant: distinct queries may run concurrently.
/// A query the engine cannot settle within its budget fails with
/// [`InferError::Inconclusive`]; it is never reported as `false`.
pub trait InferenceEngine: Send + Sync {
    /// Whether `assumptions` entail `goal`.
    fn prove(&self, goal: &Formula, assumptions: &[Formula]) -> Result<bool, InferError>;

    /// Whether `formulas` have a model.
    fn is_consistent(&self, formulas: &[Formula]) -> Result<bool, InferError>;
}

/// A question for the racing engine.
#[derive(Debug, Clone, Copy)]
pub enum Query<'a> {
    Prove {
        goal: &'a Formula,
        assumptions: &'a [Formula],
    },
    Consistency(&'a [Formula]),
}

impl fmt::Display for Query<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Prove { goal, assumptions } => {
                write!(f, "{goal} from {} assumption(s)", assumptions.len())
            }
            Query::Consistency(formulas) => {
                write!(f, "consistency of {} formula(s)", formulas.len())
            }
        }
    }
}

/// Which search settled a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    ProofSearch,
    ModelSearch,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::ProofSearch => write!(f, "proof search"),
            Strategy::ModelSearch => write!(f, "model search"),
        }
    }
}

/// A settled query with the evidence behind it.
#[derive(Debug, Clone)]
pub struct Decision {
    /// Provable for [`Query::Prove`], satisfiable for [`Query::Consistency`].
    pub verdict: bool,
    pub strategy: Strategy,
    /// The model found, if the model search won: a countermodel for a proof
    /// query, a witness for a consistency query.
    pub model: Option<Model>,
    /// Search counters of the winning side.
    pub detail: String,
    pub elapsed: Duration,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} by {} ({}) in {} ms",
            self.verdict,
            self.strategy,
            self.detail,
            self.elapsed.as_millis()
        )?;
        if let Some(model) = &self.model {
            write!(f, "\n{model}")?;
        }
        Ok(())
    }
}
