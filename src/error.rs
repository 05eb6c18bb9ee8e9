//! Rich diagnostic error types for the ooa-reason engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::theory::InferenceTest;

/// Top-level error type for the ooa-reason engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, source spans) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum OoaError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Formula(#[from] FormulaError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Infer(#[from] InferError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Theory(#[from] TheoryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Scenario(#[from] ScenarioError),
}

// ---------------------------------------------------------------------------
// Formula errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum FormulaError {
    #[error("formula parse error: {message}")]
    #[diagnostic(
        code(ooa::formula::parse),
        help(
            "Formulas use the syntax `all x.(Young(x) -> -Read(x))`: \
             connectives `-`, `&`, `|`, `->`, `<->`, quantifiers `all`/`exists` \
             followed by variables and a dot, atoms written `Pred(arg, ...)`."
        )
    )]
    Parse {
        message: String,
        #[source_code]
        src: String,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("symbol `{symbol}` used with arity {first} and arity {second}")]
    #[diagnostic(
        code(ooa::formula::arity_conflict),
        help(
            "Every predicate and function symbol must take the same number of \
             arguments everywhere in a theory. Rename one of the uses."
        )
    )]
    ArityConflict {
        symbol: String,
        first: usize,
        second: usize,
    },

    #[error("variable `{variable}` is free in `{formula}`")]
    #[diagnostic(
        code(ooa::formula::free_variable),
        help(
            "Theory formulas must be closed. Bind the variable with `all` or \
             `exists`, or rename it so it reads as a constant."
        )
    )]
    FreeVariable { formula: String, variable: String },
}

// ---------------------------------------------------------------------------
// Inference errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum InferError {
    #[error("inference inconclusive for `{query}`: no proof or model within budget")]
    #[diagnostic(
        code(ooa::infer::inconclusive),
        help(
            "Neither the proof search nor the finite model search (domain sizes \
             up to {max_domain_size}, {timeout_ms} ms) reached a definitive answer. \
             Raise `max_domain_size`, `max_candidates` or `timeout_ms` in the \
             engine configuration."
        )
    )]
    Inconclusive {
        query: String,
        max_domain_size: usize,
        timeout_ms: u64,
    },

    #[error("inference backend unavailable: {message}")]
    #[diagnostic(
        code(ooa::infer::unavailable),
        help(
            "A search worker could not be started or terminated abnormally. \
             The query was not retried; re-run it once the cause is fixed."
        )
    )]
    Unavailable { message: String },

    #[error("malformed query: {source}")]
    #[diagnostic(
        code(ooa::infer::malformed),
        help("Every predicate and function symbol in a query must keep one arity.")
    )]
    Malformed {
        #[source]
        #[diagnostic_source]
        source: FormulaError,
    },
}

// ---------------------------------------------------------------------------
// Theory errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum TheoryError {
    #[error("malformed input: {message}")]
    #[diagnostic(
        code(ooa::theory::malformed_input),
        help("Background facts and default rules must be closed, well-formed formulas.")
    )]
    MalformedInput { message: String },

    #[error("inference inconclusive during {test} of `{subject}`")]
    #[diagnostic(
        code(ooa::theory::inconclusive),
        help(
            "The engine could not decide this test, so no extension or answer was \
             produced. Adjust the engine budget and retry."
        )
    )]
    InferenceInconclusive {
        subject: String,
        test: InferenceTest,
        #[source]
        source: InferError,
    },

    #[error("inference engine unavailable during {test} of `{subject}`: {message}")]
    #[diagnostic(
        code(ooa::theory::engine_unavailable),
        help("The inference backend failed. The computation was aborted and not retried.")
    )]
    EngineUnavailable {
        subject: String,
        test: InferenceTest,
        message: String,
    },
}

impl TheoryError {
    /// Attribute an engine failure to the test and formula that triggered it.
    pub fn from_infer(err: InferError, subject: String, test: InferenceTest) -> Self {
        match err {
            InferError::Unavailable { message } => TheoryError::EngineUnavailable {
                subject,
                test,
                message,
            },
            inconclusive @ InferError::Inconclusive { .. } => TheoryError::InferenceInconclusive {
                subject,
                test,
                source: inconclusive,
            },
            InferError::Malformed { source } => TheoryError::MalformedInput {
                message: format!("{test} of `{subject}`: {source}"),
            },
        }
    }
}

impl From<FormulaError> for TheoryError {
    fn from(err: FormulaError) -> Self {
        TheoryError::MalformedInput {
            message: err.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(ooa::config::invalid),
        help("Check the EngineConfig fields. {message}")
    )]
    Invalid { message: String },

    #[error("failed to read engine config: {path}")]
    #[diagnostic(
        code(ooa::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse engine config: {path}: {message}")]
    #[diagnostic(
        code(ooa::config::parse),
        help("Check the TOML syntax in the config file.")
    )]
    Parse { path: String, message: String },
}

// ---------------------------------------------------------------------------
// Scenario errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ScenarioError {
    #[error("failed to read scenario: {path}")]
    #[diagnostic(
        code(ooa::scenario::read),
        help("Ensure the scenario file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse scenario: {path}: {message}")]
    #[diagnostic(
        code(ooa::scenario::parse),
        help(
            "A scenario is TOML with `name`, `background`, `rules` and `goals` \
             arrays of formula strings, plus an optional `[engine]` table."
        )
    )]
    Parse { path: String, message: String },

    #[error("{section}[{index}] in scenario `{scenario}` is not a valid formula")]
    #[diagnostic(code(ooa::scenario::formula))]
    Formula {
        scenario: String,
        section: &'static str,
        index: usize,
        #[source]
        #[diagnostic_source]
        source: FormulaError,
    },

    #[error("unknown built-in scenario: {name}")]
    #[diagnostic(
        code(ooa::scenario::unknown_builtin),
        help("Run `ooa examples` without a name to list the built-in scenarios.")
    )]
    UnknownBuiltin { name: String },
}

/// Convenience alias for functions returning ooa-reason results.
pub type OoaResult<T> = std::result::Result<T, OoaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_error_converts_to_ooa_error() {
        let err = InferError::Unavailable {
            message: "worker panicked".into(),
        };
        let ooa: OoaError = err.into();
        assert!(matches!(ooa, OoaError::Infer(InferError::Unavailable { .. })));
    }

    #[test]
    fn inconclusive_is_attributed_to_its_rule() {
        let err = InferError::Inconclusive {
            query: "P(a)".into(),
            max_domain_size: 4,
            timeout_ms: 100,
        };
        let theory = TheoryError::from_infer(
            err,
            "all x.(P(x) -> Q(x))".into(),
            InferenceTest::Consistency { rule: 1 },
        );
        assert!(matches!(
            theory,
            TheoryError::InferenceInconclusive {
                test: InferenceTest::Consistency { rule: 1 },
                ..
            }
        ));
        let msg = theory.to_string();
        assert!(msg.contains("consistency test of rule #1"));
        assert!(msg.contains("all x.(P(x) -> Q(x))"));
    }

    #[test]
    fn unavailable_maps_to_engine_unavailable() {
        let err = InferError::Unavailable {
            message: "spawn failed".into(),
        };
        let theory = TheoryError::from_infer(err, "Read(h)".into(), InferenceTest::Query);
        assert!(matches!(theory, TheoryError::EngineUnavailable { .. }));
    }

    #[test]
    fn malformed_query_maps_to_malformed_input() {
        let err = InferError::Malformed {
            source: FormulaError::ArityConflict {
                symbol: "P".into(),
                first: 1,
                second: 2,
            },
        };
        let theory = TheoryError::from_infer(err, "P(a,b)".into(), InferenceTest::Query);
        match theory {
            TheoryError::MalformedInput { message } => {
                assert!(message.contains("goal query"));
                assert!(message.contains("arity 1 and arity 2"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn formula_error_becomes_malformed_input() {
        let err = FormulaError::ArityConflict {
            symbol: "P".into(),
            first: 1,
            second: 2,
        };
        let theory: TheoryError = err.into();
        assert!(matches!(theory, TheoryError::MalformedInput { .. }));
        assert!(theory.to_string().contains("arity 1 and arity 2"));
    }
}
