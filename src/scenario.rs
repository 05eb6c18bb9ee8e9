//! Scenario files: a default theory plus the goals to ask of it.
//!
//! ```toml
//! name = "henry"
//! background = ["UnitedStates(Henry)", "Young(Henry)"]
//! rules = ["all x.(Young(x) -> -Read(x))", "all x.(UnitedStates(x) -> Read(x))"]
//! goals = ["-Read(Henry)"]
//!
//! [engine]
//! max_domain_size = 6
//! ```
//!
//! Independent scenarios share no state, so [`evaluate_all`] runs them on the
//! rayon pool.

use std::fmt;
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, EngineOverrides};
use crate::error::{OoaResult, ScenarioError, TheoryError};
use crate::logic::Formula;
use crate::prover::RacingEngine;
use crate::theory::{DefaultTheory, GoalDecision, RuleOutcome};

const BUILTIN: &[(&str, &str)] = &[
    ("henry.toml", include_str!("../scenarios/henry.toml")),
    (
        "qualified_residence_interest.toml",
        include_str!("../scenarios/qualified_residence_interest.toml"),
    ),
];

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioFile {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    background: Vec<String>,
    #[serde(default)]
    rules: Vec<String>,
    #[serde(default)]
    goals: Vec<String>,
    #[serde(default)]
    engine: EngineOverrides,
}

/// A parsed scenario.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    pub background: Vec<Formula>,
    /// Default rules, highest priority first.
    pub rules: Vec<Formula>,
    pub goals: Vec<Formula>,
    /// Budget adjustments applied on top of the caller's engine config.
    pub engine: EngineOverrides,
}

impl Scenario {
    /// Parse a scenario from TOML; `origin` names the source in errors.
    pub fn from_toml(content: &str, origin: &str) -> Result<Self, ScenarioError> {
        let file: ScenarioFile = toml::from_str(content).map_err(|e| ScenarioError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        let parse = |section: &'static str, texts: &[String]| -> Result<Vec<Formula>, ScenarioError> {
            texts
                .iter()
                .enumerate()
                .map(|(index, text)| {
                    Formula::parse(text).map_err(|source| ScenarioError::Formula {
                        scenario: file.name.clone(),
                        section,
                        index,
                        source,
                    })
                })
                .collect()
        };
        Ok(Scenario {
            background: parse("background", &file.background)?,
            rules: parse("rules", &file.rules)?,
            goals: parse("goals", &file.goals)?,
            name: file.name.clone(),
            description: file.description.clone(),
            engine: file.engine.clone(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let content = std::fs::read_to_string(path).map_err(|e| ScenarioError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&content, &path.display().to_string())
    }

    /// The worked examples shipped with the crate.
    pub fn builtins() -> Result<Vec<Self>, ScenarioError> {
        BUILTIN
            .iter()
            .map(|(origin, content)| Self::from_toml(content, origin))
            .collect()
    }

    pub fn builtin(name: &str) -> Result<Self, ScenarioError> {
        Self::builtins()?
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ScenarioError::UnknownBuiltin {
                name: name.to_string(),
            })
    }

    /// The engine this scenario runs with: `base`, then the scenario's own
    /// `[engine]` table, then `overrides`.
    pub fn engine_config(
        &self,
        base: &EngineConfig,
        overrides: &EngineOverrides,
    ) -> OoaResult<EngineConfig> {
        Ok(base.with_overrides(&self.engine)?.with_overrides(overrides)?)
    }

    pub fn theory(&self, engine: RacingEngine) -> Result<DefaultTheory, TheoryError> {
        DefaultTheory::new(self.background.clone(), self.rules.clone(), engine)
    }

    /// Build the extension and decide every goal (or just `goals`, if given).
    pub fn evaluate(&self, config: EngineConfig, goals: Option<&[Formula]>) -> OoaResult<ScenarioReport> {
        let engine = RacingEngine::new(config)?;
        let theory = self.theory(engine)?;
        let _span = tracing::info_span!("scenario", name = %self.name).entered();

        let extension = theory.preferred_extension()?;
        let outcomes = self
            .rules
            .iter()
            .zip(extension.outcomes())
            .map(|(rule, outcome)| RuleReport {
                rule: rule.clone(),
                outcome: *outcome,
            })
            .collect();

        let goal_reports = goals
            .unwrap_or(&self.goals)
            .iter()
            .map(|goal| {
                Ok(GoalReport {
                    goal: goal.clone(),
                    decision: theory.decide(goal)?,
                })
            })
            .collect::<Result<Vec<_>, TheoryError>>()?;

        Ok(ScenarioReport {
            name: self.name.clone(),
            description: self.description.clone(),
            background: self.background.clone(),
            rules: self.rules.clone(),
            outcomes,
            extension: extension.formulas().to_vec(),
            goals: goal_reports,
        })
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RuleReport {
    pub rule: Formula,
    pub outcome: RuleOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoalReport {
    pub goal: Formula,
    pub decision: GoalDecision,
}

/// Everything computed for one scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub background: Vec<Formula>,
    pub rules: Vec<Formula>,
    /// One entry per rule examined; unexamined rules are absent.
    pub outcomes: Vec<RuleReport>,
    pub extension: Vec<Formula>,
    pub goals: Vec<GoalReport>,
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "*".repeat(25);
        writeln!(f, "{rule}")?;
        writeln!(f, "SCENARIO {}", self.name)?;
        if let Some(description) = &self.description {
            writeln!(f, "{description}")?;
        }
        writeln!(f, "Background Theory:")?;
        for formula in &self.background {
            writeln!(f, "\t{formula}")?;
        }
        writeln!(f, "Default Rules:")?;
        for (i, formula) in self.rules.iter().enumerate() {
            match self.outcomes.get(i) {
                Some(report) => writeln!(f, "\t{formula}\t[{}]", report.outcome)?,
                None => writeln!(f, "\t{formula}\t[not examined]")?,
            }
        }
        writeln!(f, "Preferred Extension:")?;
        for formula in &self.extension {
            writeln!(f, "\t{formula}")?;
        }
        for goal in &self.goals {
            writeln!(f, "Goal:")?;
            writeln!(f, "\t{}", goal.goal)?;
            writeln!(f, "Result:")?;
            writeln!(f, "\t{}", goal.decision)?;
        }
        write!(f, "{rule}")
    }
}

/// Evaluate scenarios concurrently, returning results in input order.
pub fn evaluate_all(
    scenarios: &[Scenario],
    base: &EngineConfig,
    overrides: &EngineOverrides,
    goals: Option<&[Formula]>,
) -> Vec<OoaResult<ScenarioReport>> {
    scenarios
        .par_iter()
        .map(|scenario| {
            let config = scenario.engine_config(base, overrides)?;
            scenario.evaluate(config, goals)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OoaError;

    #[test]
    fn builtins_parse() {
        let builtins = Scenario::builtins().unwrap();
        let names: Vec<&str> = builtins.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["henry", "qualified-residence-interest"]);
        assert_eq!(builtins[1].rules.len(), 3);
        assert_eq!(builtins[1].engine.max_domain_size, Some(6));
    }

    #[test]
    fn unknown_builtin_is_reported() {
        let err = Scenario::builtin("nope").unwrap_err();
        assert!(matches!(err, ScenarioError::UnknownBuiltin { .. }));
    }

    #[test]
    fn bad_formula_names_section_and_index() {
        let toml = r#"
            name = "broken"
            background = ["P(a)"]
            rules = ["all x.(P(x) -> Q(x))", "P(a) &"]
        "#;
        let err = Scenario::from_toml(toml, "inline").unwrap_err();
        match err {
            ScenarioError::Formula { section, index, .. } => {
                assert_eq!(section, "rules");
                assert_eq!(index, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_key_is_parse_error() {
        let err = Scenario::from_toml("name = \"x\"\nfacts = []\n", "inline").unwrap_err();
        assert!(matches!(err, ScenarioError::Parse { .. }));
    }

    #[test]
    fn engine_table_sits_between_base_and_overrides() {
        let scenario = Scenario::builtin("qualified-residence-interest").unwrap();
        let base = EngineConfig::default();
        let config = scenario.engine_config(&base, &EngineOverrides::default()).unwrap();
        assert_eq!(config.max_domain_size, 6);

        let cli = EngineOverrides {
            max_domain_size: Some(3),
            ..EngineOverrides::default()
        };
        let config = scenario.engine_config(&base, &cli).unwrap();
        assert_eq!(config.max_domain_size, 3);
    }

    #[test]
    fn henry_goal_succeeds() {
        let scenario = Scenario::builtin("henry").unwrap();
        let report = scenario.evaluate(EngineConfig::default(), None).unwrap();
        assert_eq!(report.extension.len(), 3);
        assert_eq!(report.outcomes[1].outcome, RuleOutcome::Inconsistent);
        assert_eq!(report.goals[0].decision, GoalDecision::Holds);
        let text = report.to_string();
        assert!(text.contains("SCENARIO henry\nYoung people generally do not read"));
        assert!(text.contains("SUCCESS"));
    }

    #[test]
    fn malformed_theory_surfaces_as_theory_error() {
        let scenario = Scenario::from_toml(
            "name = \"bad\"\nbackground = [\"P(a)\"]\nrules = [\"P(a,b)\"]\n",
            "inline",
        )
        .unwrap();
        let err = scenario.evaluate(EngineConfig::default(), None).unwrap_err();
        assert!(matches!(err, OoaError::Theory(TheoryError::MalformedInput { .. })));
    }

    #[test]
    fn missing_description_is_left_out() {
        let scenario = Scenario::from_toml(
            "name = \"plain\"\nbackground = [\"P(a)\"]\nrules = [\"Q(a)\"]\n",
            "inline",
        )
        .unwrap();
        let report = scenario.evaluate(EngineConfig::default(), Some(&[][..])).unwrap();
        assert_eq!(report.description, None);
        assert!(report.to_string().contains("SCENARIO plain\nBackground Theory:"));
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("description").is_none());
    }
}
