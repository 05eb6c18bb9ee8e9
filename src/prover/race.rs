//! The racing engine: proof search and model search on two threads.
//!
//! Both workers share one [`CancelToken`] and report over a channel. The first
//! definitive report wins and cancels the other worker, which is left to
//! unwind on its own rather than joined. A non-definitive report (clause
//! budget spent, domain sizes exhausted) waits for the other side.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Instant;

use super::cancel::CancelToken;
use super::model::{self, ModelLimits, ModelOutcome};
use super::resolution::{self, ProofOutcome, ResolutionLimits};
use super::{Decision, InferenceEngine, Model, Query, Strategy};
use crate::config::EngineConfig;
use crate::error::{ConfigError, FormulaError, InferError};
use crate::logic::cnf::clausify;
use crate::logic::{Clause, Formula, Signature};

/// Inference engine racing resolution against finite model search.
#[derive(Debug, Clone, Default)]
pub struct RacingEngine {
    config: EngineConfig,
}

enum Report {
    Proof(Result<ProofOutcome, FormulaError>),
    Model(Result<ModelOutcome, FormulaError>),
}

enum Satisfiability {
    Unsatisfiable,
    Satisfiable(Option<Model>),
}

struct Win {
    result: Satisfiability,
    strategy: Strategy,
    detail: String,
}

impl RacingEngine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Settle `query`, reporting which search won and its evidence.
    pub fn decide(&self, query: Query<'_>) -> Result<Decision, InferError> {
        let start = Instant::now();
        let clauses = match query {
            Query::Prove { goal, assumptions } => {
                let negated = goal.negate();
                clausify(assumptions.iter().chain(std::iter::once(&negated)))
            }
            Query::Consistency(formulas) => clausify(formulas),
        };

        // Both searches index symbol tables by arity; reject conflicts up front.
        Signature::of_clauses(&clauses).map_err(|source| InferError::Malformed { source })?;

        let win = self.race(clauses, &query)?;
        let (satisfiable, model) = match win.result {
            Satisfiability::Unsatisfiable => (false, None),
            Satisfiability::Satisfiable(model) => (true, model),
        };
        let verdict = match query {
            // assumptions & -goal unsatisfiable means the goal follows
            Query::Prove { .. } => !satisfiable,
            Query::Consistency(_) => satisfiable,
        };
        let decision = Decision {
            verdict,
            strategy: win.strategy,
            model,
            detail: win.detail,
            elapsed: start.elapsed(),
        };
        tracing::debug!(
            query = %query,
            verdict = decision.verdict,
            winner = %decision.strategy,
            elapsed_ms = decision.elapsed.as_millis() as u64,
            "race decided"
        );
        Ok(decision)
    }

    fn race(&self, clauses: Vec<Clause>, query: &Query<'_>) -> Result<Win, InferError> {
        let proof_limits = ResolutionLimits {
            max_clauses: self.config.max_clauses,
            pick_given_ratio: self.config.pick_given_ratio,
        };
        let model_limits = ModelLimits {
            max_domain_size: self.config.max_domain_size,
            max_candidates: self.config.max_candidates,
        };
        let proof_clauses = clauses.clone();
        self.run(
            query,
            move |cancel| Report::Proof(resolution::search(proof_clauses, proof_limits, cancel)),
            move |cancel| Report::Model(model::search(&clauses, model_limits, cancel)),
        )
    }

    /// Spawn both workers and wait for the first definitive report.
    fn run<P, M>(&self, query: &Query<'_>, proof: P, model: M) -> Result<Win, InferError>
    where
        P: FnOnce(&CancelToken) -> Report + Send + 'static,
        M: FnOnce(&CancelToken) -> Report + Send + 'static,
    {
        let cancel = CancelToken::new();
        let (tx, rx) = mpsc::channel();

        let proof_tx = tx.clone();
        let proof_cancel = cancel.clone();
        thread::Builder::new()
            .name("ooa-proof-search".into())
            .spawn(move || {
                let _ = proof_tx.send(proof(&proof_cancel));
            })
            .map_err(|e| unavailable(&cancel, format!("cannot spawn proof search: {e}")))?;

        let model_cancel = cancel.clone();
        thread::Builder::new()
            .name("ooa-model-search".into())
            .spawn(move || {
                let _ = tx.send(model(&model_cancel));
            })
            .map_err(|e| unavailable(&cancel, format!("cannot spawn model search: {e}")))?;

        let deadline = Instant::now() + self.config.timeout();
        let mut pending = 2;
        while pending > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let report = match rx.recv_timeout(remaining) {
                Ok(report) => report,
                Err(RecvTimeoutError::Timeout) => {
                    cancel.cancel();
                    tracing::warn!(query = %query, timeout_ms = self.config.timeout_ms, "race timed out");
                    return Err(self.inconclusive(query));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(unavailable(
                        &cancel,
                        "a search worker terminated without reporting".into(),
                    ));
                }
            };

            let win = match report {
                Report::Proof(Err(source)) | Report::Model(Err(source)) => {
                    cancel.cancel();
                    return Err(InferError::Malformed { source });
                }
                Report::Proof(Ok(ProofOutcome::Refutation(stats))) => Win {
                    result: Satisfiability::Unsatisfiable,
                    strategy: Strategy::ProofSearch,
                    detail: format!("refutation: {stats}"),
                },
                Report::Proof(Ok(ProofOutcome::Saturated(stats))) => Win {
                    result: Satisfiability::Satisfiable(None),
                    strategy: Strategy::ProofSearch,
                    detail: format!("saturated: {stats}"),
                },
                Report::Model(Ok(ModelOutcome::Found(model, stats))) => Win {
                    detail: format!(
                        "model of size {} after {} candidate(s)",
                        model.domain_size, stats.candidates
                    ),
                    result: Satisfiability::Satisfiable(Some(model)),
                    strategy: Strategy::ModelSearch,
                },
                Report::Proof(Ok(other)) => {
                    tracing::debug!(outcome = ?other, "proof search gave up");
                    pending -= 1;
                    continue;
                }
                Report::Model(Ok(other)) => {
                    tracing::debug!(outcome = ?other, "model search gave up");
                    pending -= 1;
                    continue;
                }
            };
            cancel.cancel();
            return Ok(win);
        }

        tracing::warn!(query = %query, "both searches gave up");
        Err(self.inconclusive(query))
    }

    fn inconclusive(&self, query: &Query<'_>) -> InferError {
        InferError::Inconclusive {
            query: query.to_string(),
            max_domain_size: self.config.max_domain_size,
            timeout_ms: self.config.timeout_ms,
        }
    }
}

fn unavailable(cancel: &CancelToken, message: String) -> InferError {
    cancel.cancel();
    InferError::Unavailable { message }
}

impl InferenceEngine for RacingEngine {
    fn prove(&self, goal: &Formula, assumptions: &[Formula]) -> Result<bool, InferError> {
        self.decide(Query::Prove { goal, assumptions })
            .map(|d| d.verdict)
    }

    fn is_consistent(&self, formulas: &[Formula]) -> Result<bool, InferError> {
        self.decide(Query::Consistency(formulas)).map(|d| d.verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TheoryError;
    use crate::prover::model::ModelStats;
    use crate::prover::resolution::ProofStats;
    use crate::theory::{DefaultTheory, InferenceTest};

    fn parse_all(texts: &[&str]) -> Vec<Formula> {
        texts.iter().map(|t| Formula::parse(t).unwrap()).collect()
    }

    fn small() -> RacingEngine {
        RacingEngine::new(EngineConfig {
            max_domain_size: 4,
            max_candidates: 10_000,
            max_clauses: 2_000,
            timeout_ms: 10_000,
            pick_given_ratio: 4,
        })
        .unwrap()
    }

    #[test]
    fn proves_entailed_goal() {
        let assumptions = parse_all(&["Young(h)", "all x.(Young(x) -> -Read(x))"]);
        let goal = Formula::parse("-Read(h)").unwrap();
        assert!(small().prove(&goal, &assumptions).unwrap());
    }

    #[test]
    fn rejects_goal_with_countermodel() {
        let assumptions = parse_all(&["Young(h)"]);
        let goal = Formula::parse("Read(h)").unwrap();
        assert!(!small().prove(&goal, &assumptions).unwrap());
    }

    #[test]
    fn consistency_of_satisfiable_set() {
        let formulas = parse_all(&["UnitedStates(h)", "Young(h)", "all x.(Young(x) -> -Read(x))"]);
        assert!(small().is_consistent(&formulas).unwrap());
    }

    #[test]
    fn inconsistency_is_established_by_refutation() {
        let formulas = parse_all(&[
            "UnitedStates(h)",
            "Young(h)",
            "all x.(Young(x) -> -Read(x))",
            "all x.(UnitedStates(x) -> Read(x))",
        ]);
        let decision = small().decide(Query::Consistency(&formulas)).unwrap();
        assert!(!decision.verdict);
        assert_eq!(decision.strategy, Strategy::ProofSearch);
    }

    #[test]
    fn countermodel_is_reported_when_model_search_wins() {
        // An infinite Herbrand universe keeps resolution busy; the model search
        // settles the query.
        let assumptions = parse_all(&["P(a)", "all x.(P(x) -> P(f(x)))"]);
        let goal = Formula::parse("Q(a)").unwrap();
        let decision = small()
            .decide(Query::Prove {
                goal: &goal,
                assumptions: &assumptions,
            })
            .unwrap();
        assert!(!decision.verdict);
        assert_eq!(decision.strategy, Strategy::ModelSearch);
        assert!(decision.model.is_some());
    }

    #[test]
    fn undecidable_within_budget_is_inconclusive() {
        // Needs an infinite model: f injective, never reaching a.
        let formulas = parse_all(&[
            "all x.(f(x) != a)",
            "all x y.(f(x) = f(y) -> x = y)",
        ]);
        let engine = RacingEngine::new(EngineConfig {
            max_domain_size: 3,
            max_candidates: 1_000,
            max_clauses: 200,
            timeout_ms: 10_000,
            pick_given_ratio: 4,
        })
        .unwrap();
        let err = engine.is_consistent(&formulas).unwrap_err();
        assert!(matches!(err, InferError::Inconclusive { max_domain_size: 3, .. }));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = EngineConfig {
            max_domain_size: 0,
            ..EngineConfig::default()
        };
        assert!(RacingEngine::new(config).is_err());
    }

    #[test]
    fn arity_conflict_is_malformed_not_false() {
        let goal = Formula::parse("P(a,b)").unwrap();
        let assumptions = parse_all(&["P(a)"]);
        let err = RacingEngine::default().prove(&goal, &assumptions).unwrap_err();
        assert!(matches!(err, InferError::Malformed { .. }));

        let assumptions = parse_all(&["P(a)", "all x.(P(x) -> P(f(x)))"]);
        let engine = RacingEngine::new(EngineConfig {
            max_clauses: 1,
            ..EngineConfig::default()
        })
        .unwrap();
        let err = engine.prove(&goal, &assumptions).unwrap_err();
        assert!(matches!(err, InferError::Malformed { .. }));
    }

    fn model_gives_up(_: &CancelToken) -> Report {
        Report::Model(Ok(ModelOutcome::Exhausted(ModelStats::default())))
    }

    #[test]
    fn crashed_workers_make_the_engine_unavailable() {
        let formulas = parse_all(&["P(a)"]);
        let query = Query::Consistency(&formulas);

        let both = small().run(
            &query,
            |_| panic!("proof search crashed"),
            |_| panic!("model search crashed"),
        );
        assert!(matches!(both, Err(InferError::Unavailable { .. })));

        let one = small().run(&query, |_| panic!("proof search crashed"), model_gives_up);
        assert!(matches!(one, Err(InferError::Unavailable { .. })));
    }

    #[test]
    fn surviving_worker_still_decides() {
        let formulas = parse_all(&["P(a)"]);
        let query = Query::Consistency(&formulas);
        let win = small()
            .run(
                &query,
                |_| Report::Proof(Ok(ProofOutcome::Refutation(ProofStats::default()))),
                |_| panic!("model search crashed"),
            )
            .map(|win| win.strategy);
        assert!(matches!(win, Ok(Strategy::ProofSearch)));
    }

    /// Racing engine whose proof search gives up and whose model search crashes.
    struct Crashing(RacingEngine);

    impl Crashing {
        fn settle(&self, query: Query<'_>) -> Result<bool, InferError> {
            self.0
                .run(
                    &query,
                    |_| Report::Proof(Ok(ProofOutcome::ResourceLimit(ProofStats::default()))),
                    |_| panic!("model search crashed"),
                )
                .map(|_| true)
        }
    }

    impl InferenceEngine for Crashing {
        fn prove(&self, goal: &Formula, assumptions: &[Formula]) -> Result<bool, InferError> {
            self.settle(Query::Prove { goal, assumptions })
        }

        fn is_consistent(&self, formulas: &[Formula]) -> Result<bool, InferError> {
            self.settle(Query::Consistency(formulas))
        }
    }

    #[test]
    fn crashed_engine_aborts_extension_naming_the_rule() {
        let engine = Crashing(small());
        let goal = Formula::parse("Q(a)").unwrap();
        let err = engine.prove(&goal, &parse_all(&["P(a)"])).unwrap_err();
        assert!(matches!(err, InferError::Unavailable { .. }));

        let theory = DefaultTheory::new(parse_all(&["P(a)"]), parse_all(&["Q(a)"]), engine).unwrap();
        match theory.preferred_extension().unwrap_err() {
            TheoryError::EngineUnavailable { subject, test, .. } => {
                assert_eq!(subject, "Q(a)");
                assert_eq!(test, InferenceTest::Novelty { rule: 0 });
            }
            other => panic!("expected engine unavailable, got {other:?}"),
        }
    }
}
