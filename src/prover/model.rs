//! Finite model search: the model-building side of the race.
//!
//! For each domain size the search enumerates interpretations of the function
//! symbols, grounds every clause over the domain and hands the remaining
//! predicate constraints to the SAT solver. Constants are enumerated with the
//! least-number heuristic: a constant may only name an element at most one
//! above every element already named, which skips isomorphic relabellings.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::cancel::CancelToken;
use super::sat::{self, SatLit, SatResult};
use crate::error::FormulaError;
use crate::logic::clause::EQUALITY;
use crate::logic::{Clause, Term};

/// Budget for one model search.
#[derive(Debug, Clone, Copy)]
pub struct ModelLimits {
    pub max_domain_size: usize,
    pub max_candidates: u64,
}

/// A finite interpretation over the domain `0..domain_size`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    pub domain_size: usize,
    /// Function tables, indexed by the argument tuple read as a base-`domain_size` number.
    pub functions: BTreeMap<String, (usize, Vec<usize>)>,
    /// For each predicate, the argument tuples it holds of.
    pub relations: BTreeMap<String, (usize, Vec<Vec<usize>>)>,
}

impl Model {
    /// Value of a 0-ary function symbol.
    pub fn constant(&self, name: &str) -> Option<usize> {
        match self.functions.get(name) {
            Some((0, table)) => table.first().copied(),
            _ => None,
        }
    }

    /// Whether `predicate` holds of `args`.
    pub fn holds(&self, predicate: &str, args: &[usize]) -> bool {
        self.relations
            .get(predicate)
            .is_some_and(|(_, tuples)| tuples.iter().any(|t| t == args))
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "domain size {}", self.domain_size)?;
        for (name, (arity, table)) in &self.functions {
            if *arity == 0 {
                writeln!(f, "  {name} = {}", table.first().copied().unwrap_or_default())?;
                continue;
            }
            for (index, value) in table.iter().enumerate() {
                let args = decode(index, *arity, self.domain_size);
                writeln!(f, "  {name}({}) = {value}", join(&args))?;
            }
        }
        for (name, (arity, tuples)) in &self.relations {
            if *arity == 0 {
                writeln!(f, "  {name} = {}", !tuples.is_empty())?;
            } else {
                let rendered: Vec<String> =
                    tuples.iter().map(|t| format!("({})", join(t))).collect();
                writeln!(f, "  {name} = {{{}}}", rendered.join(", "))?;
            }
        }
        Ok(())
    }
}

fn join(values: &[usize]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Counters reported with every outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModelStats {
    pub candidates: u64,
    pub largest_domain: usize,
    /// Whether the candidate budget, rather than the domain bound, ended the search.
    pub budget_exhausted: bool,
}

/// How a model search ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelOutcome {
    Found(Model, ModelStats),
    /// No model within the bounds; says nothing about larger domains.
    Exhausted(ModelStats),
    Cancelled,
}

/// Cells one domain size may allocate, for tables, SAT variables or the
/// ground instances of a single clause. Larger domains are not tried.
const MAX_CELLS: usize = 1 << 22;

/// Ground instances between two polls of the cancellation token.
const CANCEL_POLL: usize = 4096;

/// Search for a finite model of `clauses`.
///
/// Fails only if a symbol is used with two arities.
pub fn search(
    clauses: &[Clause],
    limits: ModelLimits,
    cancel: &CancelToken,
) -> Result<ModelOutcome, FormulaError> {
    let problem = Problem::compile(clauses)?;
    let mut stats = ModelStats::default();

    for n in 1..=limits.max_domain_size {
        let Some(layout) = problem.layout(n) else {
            tracing::debug!(domain_size = n, "domain too large to ground, stopping");
            break;
        };
        stats.largest_domain = n;
        let mut tables = layout.initial_tables();
        loop {
            if cancel.is_cancelled() {
                return Ok(ModelOutcome::Cancelled);
            }
            if stats.candidates >= limits.max_candidates {
                stats.budget_exhausted = true;
                tracing::debug!(candidates = stats.candidates, "model search budget spent");
                return Ok(ModelOutcome::Exhausted(stats));
            }
            stats.candidates += 1;
            match problem.solve(n, &layout, &tables, cancel) {
                Solved::Model(model) => {
                    tracing::debug!(
                        domain_size = n,
                        candidates = stats.candidates,
                        "model search found model"
                    );
                    return Ok(ModelOutcome::Found(model, stats));
                }
                Solved::Cancelled => return Ok(ModelOutcome::Cancelled),
                Solved::NoModel => {}
            }
            if !problem.advance(&mut tables, n) {
                break;
            }
        }
    }
    tracing::debug!(candidates = stats.candidates, "model search exhausted domain sizes");
    Ok(ModelOutcome::Exhausted(stats))
}

// ---------------------------------------------------------------------------
// Compiled clauses
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum CTerm {
    Var(usize),
    App(usize, Vec<CTerm>),
}

#[derive(Debug)]
enum CAtom {
    Eq(CTerm, CTerm),
    Pred(usize, Vec<CTerm>),
}

#[derive(Debug)]
struct CLiteral {
    positive: bool,
    atom: CAtom,
}

#[derive(Debug)]
struct CClause {
    num_vars: usize,
    literals: Vec<CLiteral>,
}

/// Names numbered in order of first use, each with the arity it was first seen at.
#[derive(Debug, Default)]
struct Symbols {
    entries: Vec<(String, usize)>,
    index: HashMap<String, usize>,
}

impl Symbols {
    fn intern(&mut self, name: &str, arity: usize) -> Result<usize, FormulaError> {
        if let Some(&i) = self.index.get(name) {
            let first = self.entries[i].1;
            if first != arity {
                return Err(FormulaError::ArityConflict {
                    symbol: name.to_string(),
                    first,
                    second: arity,
                });
            }
            return Ok(i);
        }
        let i = self.entries.len();
        self.entries.push((name.to_string(), arity));
        self.index.insert(name.to_string(), i);
        Ok(i)
    }
}

#[derive(Debug)]
struct Problem {
    functions: Vec<(String, usize)>,
    /// Indices into `functions` of the 0-ary symbols.
    constants: Vec<usize>,
    predicates: Vec<(String, usize)>,
    clauses: Vec<CClause>,
}

/// Table and SAT variable sizes for one domain size.
#[derive(Debug)]
struct Layout {
    function_cells: Vec<usize>,
    predicate_cells: Vec<usize>,
    /// First SAT variable of each predicate.
    offsets: Vec<usize>,
    num_vars: usize,
}

impl Layout {
    fn initial_tables(&self) -> Tables {
        self.function_cells.iter().map(|cells| vec![0; *cells]).collect()
    }
}

enum Solved {
    Model(Model),
    NoModel,
    Cancelled,
}

/// Interpretation: one table per function symbol, in `Problem::functions` order.
type Tables = Vec<Vec<usize>>;

impl Problem {
    fn compile(clauses: &[Clause]) -> Result<Problem, FormulaError> {
        let mut functions = Symbols::default();
        let mut predicates = Symbols::default();
        let mut compiled = Vec::with_capacity(clauses.len());

        for clause in clauses {
            let mut vars = Symbols::default();
            let mut literals = Vec::with_capacity(clause.literals.len());
            for lit in &clause.literals {
                let args = lit
                    .atom
                    .args
                    .iter()
                    .map(|t| compile_term(t, &mut vars, &mut functions))
                    .collect::<Result<Vec<_>, _>>()?;
                let atom = if lit.is_equality() {
                    match <[CTerm; 2]>::try_from(args) {
                        Ok([l, r]) => CAtom::Eq(l, r),
                        Err(args) => {
                            return Err(FormulaError::ArityConflict {
                                symbol: EQUALITY.to_string(),
                                first: 2,
                                second: args.len(),
                            });
                        }
                    }
                } else {
                    CAtom::Pred(predicates.intern(&lit.atom.predicate, args.len())?, args)
                };
                literals.push(CLiteral {
                    positive: lit.positive,
                    atom,
                });
            }
            compiled.push(CClause {
                num_vars: vars.entries.len(),
                literals,
            });
        }

        let functions = functions.entries;
        let constants = functions
            .iter()
            .enumerate()
            .filter(|(_, (_, arity))| *arity == 0)
            .map(|(i, _)| i)
            .collect();
        Ok(Problem {
            functions,
            constants,
            predicates: predicates.entries,
            clauses: compiled,
        })
    }

    /// Sizes for domain size `n`, or `None` if anything exceeds [`MAX_CELLS`].
    fn layout(&self, n: usize) -> Option<Layout> {
        let cells = |arity: usize| -> Option<usize> {
            n.checked_pow(u32::try_from(arity).ok()?)
                .filter(|c| *c <= MAX_CELLS)
        };
        let function_cells = self
            .functions
            .iter()
            .map(|(_, arity)| cells(*arity))
            .collect::<Option<Vec<_>>>()?;
        let predicate_cells = self
            .predicates
            .iter()
            .map(|(_, arity)| cells(*arity))
            .collect::<Option<Vec<_>>>()?;

        let mut offsets = Vec::with_capacity(predicate_cells.len());
        let mut num_vars = 0usize;
        for c in &predicate_cells {
            offsets.push(num_vars);
            num_vars = num_vars.checked_add(*c)?;
        }
        let table_cells = function_cells
            .iter()
            .try_fold(0usize, |acc, c| acc.checked_add(*c))?;
        if num_vars > MAX_CELLS || table_cells > MAX_CELLS {
            return None;
        }
        for clause in &self.clauses {
            cells(clause.num_vars)?;
        }

        Some(Layout {
            function_cells,
            predicate_cells,
            offsets,
            num_vars,
        })
    }

    /// Step to the next interpretation; false once all have been visited.
    ///
    /// Non-constant tables run as an odometer. Constants only ever take
    /// least-number assignments: each names at most one more than the largest
    /// element named by the constants before it.
    fn advance(&self, tables: &mut Tables, n: usize) -> bool {
        for (table, (_, arity)) in tables.iter_mut().zip(&self.functions).rev() {
            if *arity == 0 {
                continue;
            }
            for cell in table.iter_mut().rev() {
                *cell += 1;
                if *cell < n {
                    return true;
                }
                *cell = 0;
            }
        }

        for pos in (0..self.constants.len()).rev() {
            let ceiling = self.constants[..pos]
                .iter()
                .map(|c| tables[*c][0] + 1)
                .max()
                .unwrap_or(0)
                .min(n - 1);
            let slot = self.constants[pos];
            if tables[slot][0] < ceiling {
                tables[slot][0] += 1;
                for c in &self.constants[pos + 1..] {
                    tables[*c][0] = 0;
                }
                return true;
            }
        }
        false
    }

    fn solve(&self, n: usize, layout: &Layout, tables: &Tables, cancel: &CancelToken) -> Solved {
        let mut ground: Vec<Vec<SatLit>> = Vec::new();
        for clause in &self.clauses {
            let mut env = vec![0usize; clause.num_vars];
            let mut steps = 0usize;
            loop {
                if steps % CANCEL_POLL == 0 && cancel.is_cancelled() {
                    return Solved::Cancelled;
                }
                steps += 1;
                match ground_clause(clause, &env, n, tables, &layout.offsets) {
                    Grounded::Satisfied => {}
                    Grounded::Falsified => return Solved::NoModel,
                    Grounded::Open(lits) => ground.push(lits),
                }
                if !advance_env(&mut env, n) {
                    break;
                }
            }
        }

        match sat::solve(layout.num_vars, &ground, cancel) {
            SatResult::Sat(assignment) => Solved::Model(self.model(n, layout, tables, &assignment)),
            SatResult::Unsat => Solved::NoModel,
            SatResult::Cancelled => Solved::Cancelled,
        }
    }

    fn model(&self, n: usize, layout: &Layout, tables: &Tables, assignment: &[bool]) -> Model {
        let functions = self
            .functions
            .iter()
            .zip(tables)
            .map(|((name, arity), table)| (name.clone(), (*arity, table.clone())))
            .collect();
        let relations = self
            .predicates
            .iter()
            .enumerate()
            .map(|(p, (name, arity))| {
                let offset = layout.offsets[p];
                let tuples = (0..layout.predicate_cells[p])
                    .filter(|i| assignment[offset + i])
                    .map(|i| decode(i, *arity, n))
                    .collect();
                (name.clone(), (*arity, tuples))
            })
            .collect();
        Model {
            domain_size: n,
            functions,
            relations,
        }
    }
}

fn compile_term(
    term: &Term,
    vars: &mut Symbols,
    functions: &mut Symbols,
) -> Result<CTerm, FormulaError> {
    match term {
        Term::Var(v) => Ok(CTerm::Var(vars.intern(v, 0)?)),
        Term::App(name, args) => {
            let args = args
                .iter()
                .map(|a| compile_term(a, vars, functions))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(CTerm::App(functions.intern(name, args.len())?, args))
        }
    }
}

fn eval(term: &CTerm, env: &[usize], n: usize, tables: &Tables) -> usize {
    match term {
        CTerm::Var(i) => env[*i],
        CTerm::App(f, args) => {
            let index = args
                .iter()
                .fold(0, |acc, a| acc * n + eval(a, env, n, tables));
            tables[*f][index]
        }
    }
}

enum Grounded {
    Satisfied,
    Falsified,
    Open(Vec<SatLit>),
}

fn ground_clause(clause: &CClause, env: &[usize], n: usize, tables: &Tables, offsets: &[usize]) -> Grounded {
    let mut open = Vec::new();
    for lit in &clause.literals {
        match &lit.atom {
            CAtom::Eq(l, r) => {
                let equal = eval(l, env, n, tables) == eval(r, env, n, tables);
                if equal == lit.positive {
                    return Grounded::Satisfied;
                }
            }
            CAtom::Pred(p, args) => {
                let index = args
                    .iter()
                    .fold(0, |acc, a| acc * n + eval(a, env, n, tables));
                let sat_lit = SatLit::new(offsets[*p] + index, lit.positive);
                if !open.contains(&sat_lit) {
                    open.push(sat_lit);
                }
            }
        }
    }
    if open.is_empty() {
        Grounded::Falsified
    } else {
        Grounded::Open(open)
    }
}

/// Base-`n` digits of `index`, most significant first.
fn decode(mut index: usize, arity: usize, n: usize) -> Vec<usize> {
    let mut digits = vec![0; arity];
    for slot in digits.iter_mut().rev() {
        *slot = index % n;
        index /= n;
    }
    digits
}

fn advance_env(env: &mut [usize], n: usize) -> bool {
    for slot in env.iter_mut().rev() {
        *slot += 1;
        if *slot < n {
            return true;
        }
        *slot = 0;
    }
    false
}
