//! Prioritized default theories and their preferred extension.
//!
//! A [`DefaultTheory`] holds background facts and default rules ranked by
//! position (index 0 first). Its [`PreferredExtension`] is computed on first
//! demand by applying the rules in order until one is either already entailed
//! or inconsistent with what has been adopted so far, then cached for the
//! lifetime of the theory. Goals are answered against that extension.
//!
//! # Architecture
//!
//! - [`DefaultRule`]: a formula with its priority
//! - [`extension::build`]: the order-of-application loop
//! - [`DefaultTheory::prove`] / [`DefaultTheory::decide`]: goal queries
//! - [`InferenceTest`]: which engine call failed, for error reports

pub mod extension;

use std::fmt;
use std::sync::{Mutex, OnceLock, PoisonError};

use serde::Serialize;

use crate::error::{FormulaError, TheoryError};
use crate::logic::{Formula, Signature};
use crate::prover::{InferenceEngine, RacingEngine};

pub use extension::PreferredExtension;

// ---------------------------------------------------------------------------
// Rules and outcomes
// ---------------------------------------------------------------------------

/// A defeasible generalization and its rank; priority 0 is tried first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefaultRule {
    pub priority: usize,
    pub formula: Formula,
}

/// What happened to a rule when the extension builder examined it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOutcome {
    /// New and consistent: appended to the extension.
    Adopted,
    /// Already entailed by the extension so far.
    NotNew,
    /// Contradicts the extension so far.
    Inconsistent,
}

impl fmt::Display for RuleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleOutcome::Adopted => write!(f, "adopted"),
            RuleOutcome::NotNew => write!(f, "not new"),
            RuleOutcome::Inconsistent => write!(f, "inconsistent"),
        }
    }
}

/// The engine call an error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceTest {
    Novelty { rule: usize },
    Consistency { rule: usize },
    Query,
}

impl fmt::Display for InferenceTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceTest::Novelty { rule } => write!(f, "novelty test of rule #{rule}"),
            InferenceTest::Consistency { rule } => write!(f, "consistency test of rule #{rule}"),
            InferenceTest::Query => write!(f, "goal query"),
        }
    }
}

/// Answer for a goal and its negation together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalDecision {
    /// The goal is provable and its negation is not.
    Holds,
    /// The negation is provable and the goal is not.
    Fails,
    /// Neither is provable: the extension does not settle the goal.
    Open,
    /// Both are provable: the extension is inconsistent.
    Contradictory,
}

impl GoalDecision {
    pub fn from_proofs(goal: bool, negation: bool) -> Self {
        match (goal, negation) {
            (true, false) => GoalDecision::Holds,
            (false, true) => GoalDecision::Fails,
            (false, false) => GoalDecision::Open,
            (true, true) => GoalDecision::Contradictory,
        }
    }

    /// Whether exactly one of goal and negation is provable.
    pub fn is_settled(&self) -> bool {
        matches!(self, GoalDecision::Holds | GoalDecision::Fails)
    }
}

impl fmt::Display for GoalDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoalDecision::Holds => write!(f, "SUCCESS"),
            GoalDecision::Fails => write!(f, "FAILURE"),
            GoalDecision::Open => write!(f, "OPEN"),
            GoalDecision::Contradictory => write!(f, "CONTRADICTORY"),
        }
    }
}

// ---------------------------------------------------------------------------
// DefaultTheory
// ---------------------------------------------------------------------------

/// Background facts, ranked default rules and the engine that judges them.
pub struct DefaultTheory<E = RacingEngine> {
    background: Vec<Formula>,
    rules: Vec<DefaultRule>,
    signature: Signature,
    engine: E,
    extension: OnceLock<PreferredExtension>,
    building: Mutex<()>,
}

impl DefaultTheory<RacingEngine> {
    /// Theory judged by a racing engine with the default budget.
    pub fn with_default_engine(
        background: Vec<Formula>,
        rules: Vec<Formula>,
    ) -> Result<Self, TheoryError> {
        Self::new(background, rules, RacingEngine::default())
    }
}

impl<E: InferenceEngine> DefaultTheory<E> {
    /// Validate and assemble a theory. Rule priorities follow `rules` order.
    ///
    /// Every formula must be closed, and every symbol must be used with one
    /// arity throughout; otherwise the theory is rejected as malformed.
    pub fn new(
        background: Vec<Formula>,
        rules: Vec<Formula>,
        engine: E,
    ) -> Result<Self, TheoryError> {
        for formula in background.iter().chain(&rules) {
            ensure_closed(formula)?;
        }
        let signature = Signature::of_formulas(background.iter().chain(&rules))?;

        let rules = rules
            .into_iter()
            .enumerate()
            .map(|(priority, formula)| DefaultRule { priority, formula })
            .collect();

        Ok(Self {
            background,
            rules,
            signature,
            engine,
            extension: OnceLock::new(),
            building: Mutex::new(()),
        })
    }

    pub fn background(&self) -> &[Formula] {
        &self.background
    }

    pub fn rules(&self) -> &[DefaultRule] {
        &self.rules
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The preferred extension, computed on first call and cached.
    ///
    /// Fails without caching anything if an engine call is inconclusive or
    /// the engine is unavailable.
    pub fn preferred_extension(&self) -> Result<&PreferredExtension, TheoryError> {
        if let Some(extension) = self.extension.get() {
            return Ok(extension);
        }
        let _guard = self.building.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(extension) = self.extension.get() {
            return Ok(extension);
        }
        let built = extension::build(&self.background, &self.rules, &self.engine)?;
        Ok(self.extension.get_or_init(|| built))
    }

    /// Whether `goal` follows from the preferred extension.
    pub fn prove(&self, goal: &Formula) -> Result<bool, TheoryError> {
        self.check_goal(goal)?;
        let extension = self.preferred_extension()?;
        let provable = self
            .engine
            .prove(goal, extension.formulas())
            .map_err(|e| TheoryError::from_infer(e, goal.to_string(), InferenceTest::Query))?;
        tracing::info!(goal = %goal, provable, "goal evaluated");
        Ok(provable)
    }

    /// Prove both `goal` and its negation and classify the pair.
    pub fn decide(&self, goal: &Formula) -> Result<GoalDecision, TheoryError> {
        let holds = self.prove(goal)?;
        let fails = self.prove(&goal.negate())?;
        let decision = GoalDecision::from_proofs(holds, fails);
        if !decision.is_settled() {
            tracing::warn!(goal = %goal, decision = %decision, "goal not settled by the extension");
        }
        Ok(decision)
    }

    fn check_goal(&self, goal: &Formula) -> Result<(), TheoryError> {
        ensure_closed(goal)?;
        let mut combined = self.signature.clone();
        combined.add_formula(goal)?;
        Ok(())
    }
}

impl<E> fmt::Debug for DefaultTheory<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultTheory")
            .field("background", &self.background)
            .field("rules", &self.rules)
            .field("extension_cached", &self.extension.get().is_some())
            .finish_non_exhaustive()
    }
}

fn ensure_closed(formula: &Formula) -> Result<(), FormulaError> {
    match formula.free_variables().into_iter().next() {
        Some(variable) => Err(FormulaError::FreeVariable {
            formula: formula.to_string(),
            variable,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::InferError;
    use crate::logic::Term;

    /// Answers from fixed tables keyed on formula text.
    #[derive(Default)]
    struct Scripted {
        provable: HashSet<String>,
        inconsistent: HashSet<String>,
        inconclusive: HashSet<String>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn provable(mut self, text: &str) -> Self {
            self.provable.insert(text.into());
            self
        }
        fn inconsistent(mut self, text: &str) -> Self {
            self.inconsistent.insert(text.into());
            self
        }
        fn inconclusive(mut self, text: &str) -> Self {
            self.inconclusive.insert(text.into());
            self
        }
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl InferenceEngine for Scripted {
        fn prove(&self, goal: &Formula, _assumptions: &[Formula]) -> Result<bool, InferError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.provable.contains(&goal.to_string()))
        }

        fn is_consistent(&self, formulas: &[Formula]) -> Result<bool, InferError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let last = formulas.last().map(ToString::to_string).unwrap_or_default();
            if self.inconclusive.contains(&last) {
                return Err(InferError::Inconclusive {
                    query: last,
                    max_domain_size: 1,
                    timeout_ms: 1,
                });
            }
            Ok(!self.inconsistent.contains(&last))
        }
    }

    fn p(text: &str) -> Formula {
        Formula::parse(text).unwrap()
    }

    #[test]
    fn extension_is_cached_after_first_call() {
        let theory = DefaultTheory::new(vec![p("A")], vec![p("B"), p("C")], Scripted::default()).unwrap();
        let first = theory.preferred_extension().unwrap().clone();
        let calls = theory.engine().calls();
        assert_eq!(calls, 4);
        let second = theory.preferred_extension().unwrap();
        assert_eq!(&first, second);
        assert_eq!(theory.engine().calls(), calls);
    }

    #[test]
    fn adopted_rules_follow_priority_order() {
        let theory = DefaultTheory::new(vec![p("A")], vec![p("B"), p("C")], Scripted::default()).unwrap();
        let ext = theory.preferred_extension().unwrap();
        assert_eq!(ext.formulas(), &[p("A"), p("B"), p("C")]);
        assert_eq!(ext.background(), &[p("A")]);
        assert_eq!(ext.stopped_at(), None);
    }

    #[test]
    fn inconsistent_rule_stops_the_loop() {
        let engine = Scripted::default().inconsistent("C");
        let theory = DefaultTheory::new(vec![p("A")], vec![p("B"), p("C"), p("D")], engine).unwrap();
        let ext = theory.preferred_extension().unwrap();
        assert_eq!(ext.adopted_rules(), &[p("B")]);
        assert_eq!(ext.stopped_at(), Some((1, RuleOutcome::Inconsistent)));
        assert_eq!(ext.outcomes().len(), 2);
        // D was never examined: two calls for B, two for C.
        assert_eq!(theory.engine().calls(), 4);
    }

    #[test]
    fn entailed_rule_is_not_new_and_not_added() {
        let engine = Scripted::default().provable("B");
        let theory = DefaultTheory::new(vec![p("A")], vec![p("B"), p("C")], engine).unwrap();
        let ext = theory.preferred_extension().unwrap();
        assert_eq!(ext.formulas(), &[p("A")]);
        assert_eq!(ext.stopped_at(), Some((0, RuleOutcome::NotNew)));
        // the consistency test is skipped for a rule that is not new
        assert_eq!(theory.engine().calls(), 1);
    }

    #[test]
    fn inconclusive_consistency_test_names_the_rule() {
        let engine = Scripted::default().inconclusive("C");
        let theory = DefaultTheory::new(vec![p("A")], vec![p("B"), p("C")], engine).unwrap();
        let err = theory.preferred_extension().unwrap_err();
        match err {
            TheoryError::InferenceInconclusive { subject, test, .. } => {
                assert_eq!(subject, "C");
                assert_eq!(test, InferenceTest::Consistency { rule: 1 });
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(theory.extension.get().is_none());
    }

    #[test]
    fn free_variable_is_malformed_input() {
        let open = Formula::atom("P", vec![Term::var("x")]);
        let err = DefaultTheory::new(vec![], vec![open], Scripted::default()).unwrap_err();
        assert!(matches!(err, TheoryError::MalformedInput { .. }));
    }

    #[test]
    fn arity_conflict_is_malformed_input() {
        let err = DefaultTheory::new(vec![p("P(a)")], vec![p("P(a,b)")], Scripted::default()).unwrap_err();
        assert!(matches!(err, TheoryError::MalformedInput { .. }));
    }

    #[test]
    fn goal_is_validated_against_theory_signature() {
        let theory = DefaultTheory::new(vec![p("P(a)")], vec![], Scripted::default()).unwrap();
        let err = theory.prove(&p("P(a,a)")).unwrap_err();
        assert!(matches!(err, TheoryError::MalformedInput { .. }));
    }

    #[test]
    fn decide_classifies_goal_and_negation() {
        let engine = Scripted::default().provable("-Read(h)");
        let theory = DefaultTheory::new(vec![p("Young(h)")], vec![], engine).unwrap();
        assert_eq!(theory.decide(&p("Read(h)")).unwrap(), GoalDecision::Fails);
        assert_eq!(theory.decide(&p("-Read(h)")).unwrap(), GoalDecision::Holds);
        assert_eq!(theory.decide(&p("Young(h)")).unwrap(), GoalDecision::Open);
    }

    #[test]
    fn goal_decision_from_proofs() {
        assert_eq!(GoalDecision::from_proofs(true, false), GoalDecision::Holds);
        assert_eq!(GoalDecision::from_proofs(true, true), GoalDecision::Contradictory);
        assert!(!GoalDecision::Open.is_settled());
        assert_eq!(GoalDecision::Holds.to_string(), "SUCCESS");
    }
}
