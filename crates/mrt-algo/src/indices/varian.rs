//! Varian's index and its inverse: per-observation removal levels.
//!
//! Varian perturbs each observation's income by a level e_t ∈ [0, 1];
//! raising e_t to the weight of one of t's out-edges deletes that edge
//! *and every cheaper out-edge of t*. The inverse index mirrors the
//! construction along in-edges, which needs the reverse adjacency (the
//! ordering must be by weight on the incoming side).
//!
//! Encoding: one binary column per strict edge, "e_t is raised to at
//! least this edge's weight". A cycle's cover row expands each of its
//! strict edges i into every same-side edge of i's anchor vertex with
//! weight ≥ w(i) — any of them buys i's removal. Because a higher level
//! subsumes a lower one at the same vertex, an optimal pick never stacks
//! two columns on one vertex and the objective equals Σ e_t^α.
//!
//! A strict self-loop at t (symmetric graphs) forces e_t to the loop's
//! weight before the component solve starts; the flat 1-cycle scan has
//! already charged that *floor*. Columns at or below the floor are
//! pre-covered, costs above it are marginal (w^α − floor^α), and the
//! reported contribution is Σ (e_t^α − floor_t^α).
//!
//! The residual weight handed back to the cycle search is the *extra*
//! level an edge still needs: w(i) − max(e_anchor, floor_anchor).
//!
//! α = 0 swaps the power cost for the lexicographic hybrid
//! (|S| + (∏ e_t)^(1/|S|))/T: a unit-cost stage fixes the minimal support
//! size k*, then a log-cost stage under Σx ≤ k* and one-column-per-vertex
//! groups finds the cheapest geometric mean at that support.

use mrt_core::{MrtResult, ReverseAdjacency, RpGraph, STRICT_TOL};

use super::CoverModel;
use crate::ilp::{solve_cover, CoverProblem, CoverSolution};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LevelSide {
    /// Varian: levels act on out-edges, anchored at the tail.
    Out,
    /// Inverse Varian: levels act on in-edges, anchored at the head.
    In,
}

pub(crate) struct LevelModel<'a> {
    graph: &'a RpGraph,
    side: LevelSide,
    alpha: f64,
    /// Column → edge id.
    columns: Vec<u32>,
    /// Edge id → column, `usize::MAX` for non-candidates.
    edge_col: Vec<usize>,
    /// Per vertex: its candidate columns, weight-ascending.
    vertex_cols: Vec<Vec<u32>>,
    /// Forced baseline level per vertex (strict self-loop weight).
    floor: Vec<f64>,
    /// Current removal level per vertex, on top of the floor.
    level: Vec<f64>,
}

impl<'a> LevelModel<'a> {
    pub(crate) fn varian(
        graph: &'a RpGraph,
        labels: &[usize],
        comp: usize,
        loop_floor: &[f64],
        alpha: f64,
    ) -> Self {
        let mut model = Self::empty(graph, LevelSide::Out, loop_floor, alpha);
        for v in 0..graph.vertex_count() {
            for e in graph.out_edges(v) {
                model.try_add_column(e, labels, comp);
            }
        }
        model
    }

    pub(crate) fn inv_varian(
        graph: &'a RpGraph,
        labels: &[usize],
        comp: usize,
        rev: &ReverseAdjacency,
        loop_floor: &[f64],
        alpha: f64,
    ) -> Self {
        let mut model = Self::empty(graph, LevelSide::In, loop_floor, alpha);
        for v in 0..graph.vertex_count() {
            for &e in rev.in_edges(v) {
                model.try_add_column(e as usize, labels, comp);
            }
        }
        model
    }

    fn empty(graph: &'a RpGraph, side: LevelSide, loop_floor: &[f64], alpha: f64) -> Self {
        Self {
            graph,
            side,
            alpha,
            columns: Vec::new(),
            edge_col: vec![usize::MAX; graph.edge_count()],
            vertex_cols: vec![Vec::new(); graph.vertex_count()],
            floor: loop_floor.to_vec(),
            level: vec![0.0; graph.vertex_count()],
        }
    }

    /// Columns arrive in per-vertex weight-ascending order because both
    /// the forward CSR and the reverse adjacency are sorted that way.
    /// Edges the floor already removes are not candidates.
    fn try_add_column(&mut self, e: usize, labels: &[usize], comp: usize) {
        if self.graph.is_strict(e)
            && !self.graph.is_self_loop(e)
            && labels[self.graph.tail(e)] == comp
            && labels[self.graph.head(e)] == comp
            && self.graph.weight(e) > self.floor[self.anchor(e)] + STRICT_TOL
        {
            let col = self.columns.len() as u32;
            self.edge_col[e] = col as usize;
            self.columns.push(e as u32);
            self.vertex_cols[self.anchor(e)].push(col);
        }
    }

    #[inline]
    fn anchor(&self, e: usize) -> usize {
        match self.side {
            LevelSide::Out => self.graph.tail(e),
            LevelSide::In => self.graph.head(e),
        }
    }

    #[inline]
    fn effective(&self, v: usize) -> f64 {
        self.level[v].max(self.floor[v])
    }

    /// Support-size and log-sum *corrections* relative to the flat scan's
    /// baseline (which already counted every floored vertex at its floor),
    /// for the α = 0 aggregation.
    pub(crate) fn support_and_logsum(&self) -> (usize, f64) {
        let mut support = 0;
        let mut logsum = 0.0;
        for v in 0..self.level.len() {
            let floor = self.floor[v];
            let level = self.level[v];
            if floor > STRICT_TOL {
                if level > floor {
                    logsum += level.ln() - floor.ln();
                }
            } else if level > STRICT_TOL {
                support += 1;
                logsum += level.ln();
            }
        }
        (support, logsum)
    }
}

impl CoverModel for LevelModel<'_> {
    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn cost(&self, col: usize) -> f64 {
        let e = self.columns[col] as usize;
        let floor = self.floor[self.anchor(e)];
        self.graph.weight(e).powf(self.alpha) - floor.powf(self.alpha)
    }

    fn row_for_cycle(&self, cycle: &[u32], row: &mut Vec<u32>) {
        row.clear();
        for &e in cycle {
            let e = e as usize;
            if self.edge_col[e] == usize::MAX {
                // Strict but below the anchor's floor: the forced level
                // already breaks this cycle.
                if self.graph.is_strict(e)
                    && self.graph.weight(e) <= self.floor[self.anchor(e)] + STRICT_TOL
                {
                    row.clear();
                    return;
                }
                // Weak edges cannot cover a violation.
                continue;
            }
            let anchor = self.anchor(e);
            let needed = self.graph.weight(e);
            for &col in &self.vertex_cols[anchor] {
                if self.graph.weight(self.columns[col as usize] as usize) >= needed - STRICT_TOL {
                    row.push(col);
                }
            }
        }
        row.sort_unstable();
        row.dedup();
    }

    fn apply(&mut self, selected: &[bool]) {
        self.level.fill(0.0);
        for (col, &on) in selected.iter().enumerate() {
            if on {
                let e = self.columns[col] as usize;
                let anchor = self.anchor(e);
                self.level[anchor] = self.level[anchor].max(self.graph.weight(e));
            }
        }
    }

    fn residual(&self, e: usize) -> f64 {
        (self.graph.weight(e) - self.effective(self.anchor(e))).max(0.0)
    }

    fn edge_removed(&self, e: usize) -> bool {
        let level = self.effective(self.anchor(e));
        level > STRICT_TOL && self.graph.weight(e) <= level + STRICT_TOL
    }

    fn value(&self, objective: f64) -> f64 {
        if self.alpha == 0.0 {
            objective
        } else {
            (0..self.level.len())
                .map(|v| {
                    let eff = self.effective(v);
                    if eff > STRICT_TOL {
                        eff.powf(self.alpha) - self.floor[v].powf(self.alpha)
                    } else {
                        0.0
                    }
                })
                .sum()
        }
    }

    fn solve(&self, rows: &[Vec<u32>]) -> MrtResult<CoverSolution> {
        let n = self.column_count();
        if self.alpha > 0.0 {
            let costs: Vec<f64> = (0..n).map(|c| self.cost(c)).collect();
            return solve_cover(&CoverProblem {
                costs: &costs,
                rows,
                at_most_one: &[],
                cardinality: None,
            });
        }

        // α = 0, stage 1: minimal support size. Raising a floored vertex
        // further is free in support terms.
        let unit: Vec<f64> = self
            .columns
            .iter()
            .map(|&e| {
                if self.floor[self.anchor(e as usize)] > STRICT_TOL {
                    0.0
                } else {
                    1.0
                }
            })
            .collect();
        let first = solve_cover(&CoverProblem {
            costs: &unit,
            rows,
            at_most_one: &[],
            cardinality: None,
        })?;
        let support = first
            .selected
            .iter()
            .zip(&unit)
            .filter(|(&s, &c)| s && c > 0.0)
            .count();

        // Stage 2: cheapest geometric mean at that support. One column
        // per vertex keeps the log objective honest; floored vertices pay
        // only the log increment over their floor.
        let logs: Vec<f64> = self
            .columns
            .iter()
            .map(|&e| {
                let e = e as usize;
                let floor = self.floor[self.anchor(e)];
                if floor > STRICT_TOL {
                    self.graph.weight(e).ln() - floor.ln()
                } else {
                    self.graph.weight(e).ln()
                }
            })
            .collect();
        let groups: Vec<Vec<u32>> = self
            .vertex_cols
            .iter()
            .filter(|cols| cols.len() > 1)
            .cloned()
            .collect();
        let all_unfloored = unit.iter().all(|&c| c > 0.0);
        let second = if all_unfloored {
            solve_cover(&CoverProblem {
                costs: &logs,
                rows,
                at_most_one: &groups,
                cardinality: Some(support),
            })?
        } else {
            // Floored columns are support-free, so a plain cardinality
            // bound would miscount them. Penalize each unfloored pick by
            // more than the whole log range instead: minimal support
            // wins first, log cost second.
            let big = 32.0 * (n as f64 + 1.0);
            let penalized: Vec<f64> = logs
                .iter()
                .zip(&unit)
                .map(|(&l, &c)| l + big * c)
                .collect();
            solve_cover(&CoverProblem {
                costs: &penalized,
                rows,
                at_most_one: &groups,
                cardinality: None,
            })?
        };
        Ok(CoverSolution {
            selected: second.selected,
            objective: support as f64,
        })
    }
}
