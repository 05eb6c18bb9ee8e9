//! ooa CLI: order-of-application default reasoning.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use ooa_reason::config::{EngineConfig, EngineOverrides};
use ooa_reason::logic::Formula;
use ooa_reason::logic::cnf::clausify;
use ooa_reason::prover::{Query, RacingEngine};
use ooa_reason::scenario::{self, Scenario, ScenarioReport};

#[derive(Parser)]
#[command(name = "ooa", version, about = "Order-of-application default logic")]
struct Cli {
    /// Engine budget file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Largest domain size tried by the model search.
    #[arg(long, global = true)]
    max_domain_size: Option<usize>,

    /// Wall-clock limit per inference call, in milliseconds.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Show which search settled each goal, with its countermodel if any.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the preferred extension of a scenario.
    Extension {
        /// Scenario file (TOML).
        file: PathBuf,

        /// Emit the full report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Evaluate goals against one or more scenarios.
    Prove {
        /// Scenario files (TOML); evaluated concurrently.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Goal to evaluate instead of the scenarios' own goals.
        #[arg(long)]
        goal: Option<String>,

        /// Emit the reports as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Run the built-in example scenarios.
    Examples {
        /// Run only the named example.
        #[arg(long)]
        name: Option<String>,

        /// Emit the reports as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Parse a formula and print its canonical form and clauses.
    Parse {
        /// Formula text, e.g. "all x.(Young(x) -> -Read(x))".
        formula: String,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let base = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let overrides = EngineOverrides {
        max_domain_size: cli.max_domain_size,
        timeout_ms: cli.timeout_ms,
        ..EngineOverrides::default()
    };

    match cli.command {
        Commands::Extension { file, json } => {
            let scenario = Scenario::load(&file)?;
            let config = scenario.engine_config(&base, &overrides)?;
            let report = scenario.evaluate(config, Some(&[][..]))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
            } else {
                for outcome in &report.outcomes {
                    println!("# {} [{}]", outcome.rule, outcome.outcome);
                }
                for formula in &report.extension {
                    println!("{formula}");
                }
            }
        }

        Commands::Prove { files, goal, json } => {
            let goal = goal.map(|text| Formula::parse(&text)).transpose()?;
            let goals = goal.as_ref().map(std::slice::from_ref);
            let scenarios = files
                .iter()
                .map(|path| Scenario::load(path))
                .collect::<Result<Vec<_>, _>>()?;
            let results = scenario::evaluate_all(&scenarios, &base, &overrides, goals);
            let reports = results.into_iter().collect::<Result<Vec<_>, _>>()?;
            print_reports(&reports, json, cli.verbose, &base, &overrides, &scenarios)?;
        }

        Commands::Examples { name, json } => {
            let scenarios = match name {
                Some(name) => vec![Scenario::builtin(&name)?],
                None => Scenario::builtins()?,
            };
            let results = scenario::evaluate_all(&scenarios, &base, &overrides, None);
            let reports = results.into_iter().collect::<Result<Vec<_>, _>>()?;
            print_reports(&reports, json, cli.verbose, &base, &overrides, &scenarios)?;
        }

        Commands::Parse { formula } => {
            let formula = Formula::parse(&formula)?;
            println!("{formula}");
            for clause in clausify([&formula]) {
                println!("  {clause}");
            }
        }
    }

    Ok(())
}

fn print_reports(
    reports: &[ScenarioReport],
    json: bool,
    verbose: bool,
    base: &EngineConfig,
    overrides: &EngineOverrides,
    scenarios: &[Scenario],
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(reports).into_diagnostic()?);
        return Ok(());
    }
    for (report, scenario) in reports.iter().zip(scenarios) {
        println!("{report}");
        if verbose {
            let engine = RacingEngine::new(scenario.engine_config(base, overrides)?)?;
            for goal in &report.goals {
                let decision = engine.decide(Query::Prove {
                    goal: &goal.goal,
                    assumptions: &report.extension,
                })?;
                println!("{}: {decision}", goal.goal);
            }
        }
    }
    Ok(())
}
