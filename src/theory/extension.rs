//! Order-of-application extension building.

use serde::Serialize;

use super::{DefaultRule, InferenceTest, RuleOutcome};
use crate::error::TheoryError;
use crate::logic::Formula;
use crate::prover::InferenceEngine;

/// The background facts plus the adopted prefix of the default rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreferredExtension {
    formulas: Vec<Formula>,
    background_len: usize,
    outcomes: Vec<RuleOutcome>,
}

impl PreferredExtension {
    /// Background facts followed by adopted rules, in priority order.
    pub fn formulas(&self) -> &[Formula] {
        &self.formulas
    }

    pub fn background(&self) -> &[Formula] {
        &self.formulas[..self.background_len]
    }

    pub fn adopted_rules(&self) -> &[Formula] {
        &self.formulas[self.background_len..]
    }

    /// One outcome per rule examined, in priority order. Every outcome but
    /// the last is [`RuleOutcome::Adopted`]; rules after a rejected one are
    /// never examined.
    pub fn outcomes(&self) -> &[RuleOutcome] {
        &self.outcomes
    }

    /// Priority and reason of the rule that stopped the loop, if any.
    pub fn stopped_at(&self) -> Option<(usize, RuleOutcome)> {
        self.outcomes
            .iter()
            .enumerate()
            .find(|(_, o)| **o != RuleOutcome::Adopted)
            .map(|(i, o)| (i, *o))
    }

    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }
}

/// Apply `rules` to `background` strictly in priority order.
///
/// A rule is adopted when the current theory neither proves it nor becomes
/// inconsistent with it. The first rule that is not adopted ends the loop.
/// Adopted rules are never revisited.
pub fn build<E: InferenceEngine + ?Sized>(
    background: &[Formula],
    rules: &[DefaultRule],
    engine: &E,
) -> Result<PreferredExtension, TheoryError> {
    let mut current: Vec<Formula> = background.to_vec();
    let mut outcomes = Vec::with_capacity(rules.len());

    for rule in rules {
        let outcome = examine(rule, &current, engine)?;
        outcomes.push(outcome);
        if outcome != RuleOutcome::Adopted {
            tracing::info!(
                rule = rule.priority,
                formula = %rule.formula,
                reason = %outcome,
                "default rule inactive, stopping"
            );
            break;
        }
        tracing::info!(rule = rule.priority, formula = %rule.formula, "default rule adopted");
        current.push(rule.formula.clone());
    }

    let extension = PreferredExtension {
        formulas: current,
        background_len: background.len(),
        outcomes,
    };
    tracing::info!(
        formulas = extension.len(),
        adopted = extension.adopted_rules().len(),
        rules = rules.len(),
        "preferred extension computed"
    );
    Ok(extension)
}

fn examine<E: InferenceEngine + ?Sized>(
    rule: &DefaultRule,
    current: &[Formula],
    engine: &E,
) -> Result<RuleOutcome, TheoryError> {
    let subject = || rule.formula.to_string();

    let entailed = engine.prove(&rule.formula, current).map_err(|e| {
        TheoryError::from_infer(e, subject(), InferenceTest::Novelty { rule: rule.priority })
    })?;
    if entailed {
        return Ok(RuleOutcome::NotNew);
    }

    let mut extended = current.to_vec();
    extended.push(rule.formula.clone());
    let consistent = engine.is_consistent(&extended).map_err(|e| {
        TheoryError::from_infer(e, subject(), InferenceTest::Consistency { rule: rule.priority })
    })?;
    Ok(if consistent {
        RuleOutcome::Adopted
    } else {
        RuleOutcome::Inconsistent
    })
}
