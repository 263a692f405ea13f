//! The binary integer-program oracle behind every cycle-cover solve.
//!
//! Each index solver reduces its removal semantics to the same shape: a
//! cost per candidate item and a set of *cover rows*, each row listing the
//! items that can break one discovered cycle. The oracle solves
//!
//! ```text
//! minimize    Σ cᵢ·xᵢ
//! subject to  Σ_{i ∈ row} xᵢ ≥ 1      for every cover row
//!             Σ_{i ∈ group} xᵢ ≤ 1    for every at-most-one group
//!             Σ xᵢ ≤ k                optional cardinality bound
//!             xᵢ ∈ {0, 1}
//! ```
//!
//! Built on the `good_lp` abstraction with the HiGHS backend — the one
//! bundled backend that handles integrality. The boundary is kept narrow:
//! costs in, sparse rows in, a selection vector and the unperturbed
//! objective out. No solver handle leaks above this module.
//!
//! Determinism: ties between optimal covers are broken lexicographically
//! on column index by an objective perturbation well below any meaningful
//! cost difference; the reported objective is recomputed from the clean
//! costs.

use good_lp::solvers::highs::highs;
use good_lp::{constraint, variable, variables, Expression, Solution, SolverModel, Variable};

use mrt_core::{MrtError, MrtResult};

/// One cover instance. Rows and groups hold column indices into `costs`.
#[derive(Debug, Clone, Copy)]
pub struct CoverProblem<'a> {
    /// Cost of selecting each column. May be negative (the α = 0
    /// geometric-mean stage minimizes log-weights).
    pub costs: &'a [f64],
    /// "At least one of these columns" rows.
    pub rows: &'a [Vec<u32>],
    /// "At most one of these columns" groups.
    pub at_most_one: &'a [Vec<u32>],
    /// Optional bound on the total number of selected columns.
    pub cardinality: Option<usize>,
}

/// Oracle output: the chosen columns and their unperturbed total cost.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverSolution {
    pub selected: Vec<bool>,
    pub objective: f64,
}

/// Solve a cover instance to optimality.
///
/// An instance with no rows short-circuits to the empty selection without
/// touching the backend. Backend failure, infeasibility, or unboundedness
/// surfaces as [`MrtError::Ilp`].
pub fn solve_cover(problem: &CoverProblem) -> MrtResult<CoverSolution> {
    let n = problem.costs.len();
    if problem.rows.is_empty() {
        return Ok(CoverSolution {
            selected: vec![false; n],
            objective: 0.0,
        });
    }

    let tie_break = 1e-9 / (n as f64 + 1.0);
    let mut vars = variables!();
    let xs: Vec<Variable> = (0..n).map(|_| vars.add(variable().binary())).collect();

    let mut objective = Expression::from(0.0);
    for (i, (&c, &x)) in problem.costs.iter().zip(&xs).enumerate() {
        objective += (c + tie_break * i as f64) * x;
    }

    let mut model = vars.minimise(objective).using(highs);
    for row in problem.rows {
        let mut lhs = Expression::from(0.0);
        for &j in row {
            lhs += xs[j as usize];
        }
        model = model.with(constraint!(lhs >= 1.0));
    }
    for group in problem.at_most_one {
        let mut lhs = Expression::from(0.0);
        for &j in group {
            lhs += xs[j as usize];
        }
        model = model.with(constraint!(lhs <= 1.0));
    }
    if let Some(k) = problem.cardinality {
        let mut lhs = Expression::from(0.0);
        for &x in &xs {
            lhs += x;
        }
        model = model.with(constraint!(lhs <= k as f64));
    }

    let sol = model
        .solve()
        .map_err(|e| MrtError::Ilp(e.to_string()))?;

    let selected: Vec<bool> = xs.iter().map(|&x| sol.value(x) > 0.5).collect();
    let objective = problem
        .costs
        .iter()
        .zip(&selected)
        .filter(|(_, &s)| s)
        .map(|(&c, _)| c)
        .sum();

    Ok(CoverSolution {
        selected,
        objective,
    })
}
