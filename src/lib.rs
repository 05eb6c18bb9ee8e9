// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # ooa-reason
//!
//! Order-of-application default logic over first-order formulas.
//!
//! A [`DefaultTheory`] pairs background facts with default rules ranked by
//! priority. Its preferred extension is built by applying the rules strictly
//! in order: each rule is adopted when the current theory neither entails it
//! nor becomes inconsistent with it, and the first rule that fails either
//! test ends the process. Goals are then proved against that extension.
//!
//! ## Architecture
//!
//! - **Formulas** (`logic`): terms, formulas, a text parser and clausal normal form
//! - **Inference** (`prover`): resolution and finite model search raced on two threads
//! - **Default theories** (`theory`): extension building and goal queries
//! - **Scenarios** (`scenario`): TOML theory files and the built-in examples
//!
//! ## Library usage
//!
//! ```no_run
//! use ooa_reason::{DefaultTheory, Formula};
//!
//! let parse = |s: &str| Formula::parse(s).unwrap();
//! let theory = DefaultTheory::with_default_engine(
//!     vec![parse("UnitedStates(Henry)"), parse("Young(Henry)")],
//!     vec![
//!         parse("all x.(Young(x) -> -Read(x))"),
//!         parse("all x.(UnitedStates(x) -> Read(x))"),
//!     ],
//! )
//! .unwrap();
//! assert!(theory.prove(&parse("-Read(Henry)")).unwrap());
//! ```

pub mod config;
pub mod error;
pub mod logic;
pub mod prover;
pub mod scenario;
pub mod theory;

pub use config::{EngineConfig, EngineOverrides};
pub use error::{OoaError, OoaResult};
pub use logic::Formula;
pub use prover::{InferenceEngine, RacingEngine};
pub use scenario::{Scenario, ScenarioReport};
pub use theory::{DefaultTheory, GoalDecision, PreferredExtension, RuleOutcome};
