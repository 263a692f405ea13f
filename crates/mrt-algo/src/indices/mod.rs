//! The six rationality indices and their shared cycle-cover engine.
//!
//! Every ILP-backed index is an instance of one outer loop run per
//! nontrivial SCC:
//!
//! ```text
//! seed rows from the cheap 2-cycle scan
//! repeat:
//!     solve the cover ILP over the rows collected so far
//!     expand the pick into removal state
//!     hunt cycles that survive the removals (residual DFS; Johnson
//!         fallback when the component carries weak edges)
//!     none found → the removal state rationalizes the component; done
//!     otherwise → reduce the new cycles to rows and go again
//! ```
//!
//! What varies per index is the *reduction*: what a column is (vertex,
//! edge, or removal level), what it costs, and which columns cover a
//! cycle. That contract is the [`CoverModel`] trait; the solvers plug
//! into the loop the way formulations plug into a dispatcher. Components
//! don't interact, so their optima add (Afriat, a max-min, takes the
//! maximum instead), and strict self-loops — trivial 1-cycles that only
//! the symmetric extension produces — are charged by a flat scan outside
//! the SCC loop.
//!
//! Cycles discovered for one index are kept and re-reduced for the next
//! (and for the next α): a cycle is a violation for every index, only its
//! row differs. Warm-starting this way is an optimization; each loop
//! converges from any seed.

mod edge_removal;
mod houtman_maks;
mod varian;

use serde::{Deserialize, Serialize};

use mrt_core::{CancelToken, EdgeMask, MrtError, MrtResult, Observations, RpGraph};

use crate::cycles::{afriat_estimate, critical_cycles, has_cycle, two_cycles, CycleSet};
use crate::ilp::{solve_cover, CoverProblem, CoverSolution};
use crate::johnson::break_strict_cycles;
use crate::scc::strongly_connected_components;

use edge_removal::EdgeRemovalModel;
use houtman_maks::HmModel;
use varian::LevelModel;

/// Reduction contract between an index and the shared cover loop.
pub(crate) trait CoverModel {
    fn column_count(&self) -> usize;
    fn cost(&self, col: usize) -> f64;
    /// Reduce a cycle to its cover row (the columns that can break it).
    fn row_for_cycle(&self, cycle: &[u32], row: &mut Vec<u32>);
    /// Expand an ILP pick into removal state.
    fn apply(&mut self, selected: &[bool]);
    /// Residual weight of an edge under the current state; ≤ tolerance
    /// means gone for the cycle search.
    fn residual(&self, e: usize) -> f64;
    /// Whether the current state removes this edge (Johnson mask).
    fn edge_removed(&self, e: usize) -> bool;
    /// Component contribution once the loop converges.
    fn value(&self, objective: f64) -> f64;

    fn solve(&self, rows: &[Vec<u32>]) -> MrtResult<CoverSolution> {
        let costs: Vec<f64> = (0..self.column_count()).map(|c| self.cost(c)).collect();
        solve_cover(&CoverProblem {
            costs: &costs,
            rows,
            at_most_one: &[],
            cardinality: None,
        })
    }
}

/// Knobs shared by every measure run.
#[derive(Debug, Clone)]
pub struct MeasuresConfig {
    /// Checked between outer iterations.
    pub cancel: CancelToken,
    /// The outer loop aborts after `factor · T + 5` iterations. Each
    /// iteration adds at least one violated row, so hitting the cap
    /// indicates an oracle defect, not slow data.
    pub iteration_cap_factor: usize,
}

impl Default for MeasuresConfig {
    fn default() -> Self {
        Self {
            cancel: CancelToken::new(),
            iteration_cap_factor: 5,
        }
    }
}

/// The Varian / Inverse-Varian / NMCI triple at one α.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlphaMeasures {
    pub alpha: f64,
    pub varian: f64,
    pub inv_varian: f64,
    pub nmci: f64,
}

/// The full index battery of one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasuresReport {
    /// Afriat's index: the largest cycle-minimum weight, in [0, 1].
    pub afriat: f64,
    /// Fraction of observations that must be dropped.
    pub houtman_maks: f64,
    /// Removed strict preferences per observation.
    pub swaps: f64,
    /// One entry per requested α, in request order.
    pub per_alpha: Vec<AlphaMeasures>,
}

impl MeasuresReport {
    /// Flat layout [Afriat, HM, Swaps, (Varian, InvVarian, NMCI)…],
    /// length 3 + 3·|alphas|.
    pub fn into_vec(self) -> Vec<f64> {
        let mut out = Vec::with_capacity(3 + 3 * self.per_alpha.len());
        out.push(self.afriat);
        out.push(self.houtman_maks);
        out.push(self.swaps);
        for a in self.per_alpha {
            out.push(a.varian);
            out.push(a.inv_varian);
            out.push(a.nmci);
        }
        out
    }

    /// One-line human-readable summary.
    pub fn summary(&self) -> String {
        let mut s = format!(
            "afriat={:.4} hm={:.4} swaps={:.4}",
            self.afriat, self.houtman_maks, self.swaps
        );
        for a in &self.per_alpha {
            s.push_str(&format!(
                " [α={}] varian={:.4} inv={:.4} nmci={:.4}",
                a.alpha, a.varian, a.inv_varian, a.nmci
            ));
        }
        s
    }
}

/// Whether the data admits a utility rationalization (GARP): no cycle of
/// revealed preferences contains a strict edge. All-weak cycles are
/// permitted.
pub fn data_rationalizable(obs: &Observations) -> MrtResult<bool> {
    Ok(graph_rationalizable(&RpGraph::build(obs)))
}

pub(crate) fn graph_rationalizable(graph: &RpGraph) -> bool {
    let scc = strongly_connected_components(graph);
    !(0..graph.edge_count()).any(|e| {
        graph.is_strict(e)
            && scc.labels[graph.tail(e)] != 0
            && scc.labels[graph.tail(e)] == scc.labels[graph.head(e)]
    })
}

/// Compute the full index battery for a dataset.
pub fn rationality_measures(obs: &Observations, alphas: &[f64]) -> MrtResult<MeasuresReport> {
    rationality_measures_with(obs, alphas, &MeasuresConfig::default())
}

/// [`rationality_measures`] with explicit configuration.
pub fn rationality_measures_with(
    obs: &Observations,
    alphas: &[f64],
    config: &MeasuresConfig,
) -> MrtResult<MeasuresReport> {
    measures_on_graph(&RpGraph::build(obs), alphas, config)
}

/// The index battery under the symmetric-utility assumption: weights are
/// first augmented by the best permutation of each compared bundle.
pub fn rationality_measures_symmetric(
    obs: &Observations,
    alphas: &[f64],
) -> MrtResult<MeasuresReport> {
    rationality_measures_symmetric_with(obs, alphas, &MeasuresConfig::default())
}

/// [`rationality_measures_symmetric`] with explicit configuration.
pub fn rationality_measures_symmetric_with(
    obs: &Observations,
    alphas: &[f64],
    config: &MeasuresConfig,
) -> MrtResult<MeasuresReport> {
    measures_on_graph(&RpGraph::build_symmetric(obs)?, alphas, config)
}

#[derive(Debug, Clone, Copy, Default)]
struct AlphaAcc {
    varian: f64,
    inv_varian: f64,
    nmci: f64,
    varian_support: usize,
    varian_logsum: f64,
    inv_support: usize,
    inv_logsum: f64,
}

/// The α = 0 hybrid: (|S| + geometric mean of the levels) / T.
fn hybrid(support: usize, logsum: f64, t: f64) -> f64 {
    if support == 0 {
        0.0
    } else {
        (support as f64 + (logsum / support as f64).exp()) / t
    }
}

pub(crate) fn measures_on_graph(
    graph: &RpGraph,
    alphas: &[f64],
    config: &MeasuresConfig,
) -> MrtResult<MeasuresReport> {
    for &alpha in alphas {
        if !alpha.is_finite() || alpha < 0.0 {
            return Err(MrtError::InvalidInput(format!(
                "alpha values must be finite and non-negative, got {alpha}"
            )));
        }
    }

    let t = graph.vertex_count();
    let t_f = t as f64;
    let scc = strongly_connected_components(graph);
    let members = scc.members();
    let rev = (!alphas.is_empty()).then(|| graph.reverse());

    // Strict self-loops are trivial 1-cycles with a fixed per-index
    // charge; they only exist in symmetric graphs. The per-vertex floor
    // feeds the vertex-anchored models so a loop vertex inside a
    // nontrivial SCC is not charged twice.
    let mut loop_weights: Vec<f64> = Vec::new();
    let mut loop_floor = vec![0.0f64; t];
    for e in 0..graph.edge_count() {
        if graph.is_self_loop(e) && graph.is_strict(e) {
            let v = graph.tail(e);
            loop_weights.push(graph.weight(e));
            loop_floor[v] = loop_floor[v].max(graph.weight(e));
        }
    }
    let loop_vertex_count = loop_floor.iter().filter(|&&f| f > 0.0).count();

    let mut afriat = loop_weights.iter().copied().fold(0.0, f64::max);
    let mut hm_raw = loop_vertex_count as f64;
    let mut swaps_raw = loop_weights.len() as f64;
    let mut accs = vec![AlphaAcc::default(); alphas.len()];
    for (j, &alpha) in alphas.iter().enumerate() {
        for &w in &loop_weights {
            if alpha == 0.0 {
                accs[j].varian_support += 1;
                accs[j].varian_logsum += w.ln();
                accs[j].inv_support += 1;
                accs[j].inv_logsum += w.ln();
                accs[j].nmci += 1.0;
            } else {
                let c = w.powf(alpha);
                accs[j].varian += c;
                accs[j].inv_varian += c;
                accs[j].nmci += c;
            }
        }
    }

    for (ci, comp_vertices) in members.iter().enumerate() {
        let comp = ci + 1;

        let mut base_mask = EdgeMask::new(graph.edge_count());
        let mut has_weak = false;
        for e in 0..graph.edge_count() {
            let intra = !graph.is_self_loop(e)
                && scc.labels[graph.tail(e)] == comp
                && scc.labels[graph.head(e)] == comp;
            if !intra {
                base_mask.set(e);
            } else if !graph.is_strict(e) {
                has_weak = true;
            }
        }

        let mut cycles = CycleSet::new();
        two_cycles(graph, &scc.labels, comp, comp_vertices, &mut cycles);

        afriat = afriat.max(afriat_estimate(graph, &scc.labels, comp, comp_vertices));

        for (j, &alpha) in alphas.iter().enumerate() {
            let mut varian = LevelModel::varian(graph, &scc.labels, comp, &loop_floor, alpha);
            let contrib = cover_scc(
                graph,
                &scc.labels,
                comp,
                comp_vertices,
                has_weak,
                &base_mask,
                &mut varian,
                &mut cycles,
                config,
            )?;
            if alpha == 0.0 {
                let (support, logsum) = varian.support_and_logsum();
                accs[j].varian_support += support;
                accs[j].varian_logsum += logsum;
            } else {
                accs[j].varian += contrib;
            }

            let rev = rev.as_ref().expect("reverse adjacency exists when alphas do");
            let mut inv = LevelModel::inv_varian(graph, &scc.labels, comp, rev, &loop_floor, alpha);
            let contrib = cover_scc(
                graph,
                &scc.labels,
                comp,
                comp_vertices,
                has_weak,
                &base_mask,
                &mut inv,
                &mut cycles,
                config,
            )?;
            if alpha == 0.0 {
                let (support, logsum) = inv.support_and_logsum();
                accs[j].inv_support += support;
                accs[j].inv_logsum += logsum;
            } else {
                accs[j].inv_varian += contrib;
            }

            let mut nmci = EdgeRemovalModel::nmci(graph, &scc.labels, comp, alpha);
            accs[j].nmci += cover_scc(
                graph,
                &scc.labels,
                comp,
                comp_vertices,
                has_weak,
                &base_mask,
                &mut nmci,
                &mut cycles,
                config,
            )?;
        }

        let mut hm = HmModel::new(graph, comp_vertices, &loop_floor);
        hm_raw += cover_scc(
            graph,
            &scc.labels,
            comp,
            comp_vertices,
            has_weak,
            &base_mask,
            &mut hm,
            &mut cycles,
            config,
        )?;

        let mut swaps = EdgeRemovalModel::swaps(graph, &scc.labels, comp);
        swaps_raw += cover_scc(
            graph,
            &scc.labels,
            comp,
            comp_vertices,
            has_weak,
            &base_mask,
            &mut swaps,
            &mut cycles,
            config,
        )?;
    }

    let per_alpha = alphas
        .iter()
        .zip(&accs)
        .map(|(&alpha, acc)| {
            let (varian, inv_varian) = if alpha == 0.0 {
                (
                    hybrid(acc.varian_support, acc.varian_logsum, t_f),
                    hybrid(acc.inv_support, acc.inv_logsum, t_f),
                )
            } else {
                (acc.varian / t_f, acc.inv_varian / t_f)
            };
            AlphaMeasures {
                alpha,
                varian,
                inv_varian,
                nmci: acc.nmci / t_f,
            }
        })
        .collect();

    Ok(MeasuresReport {
        afriat,
        houtman_maks: hm_raw / t_f,
        swaps: swaps_raw / t_f,
        per_alpha,
    })
}

/// The shared outer loop: one component, one index.
#[allow(clippy::too_many_arguments)]
fn cover_scc<M: CoverModel>(
    graph: &RpGraph,
    labels: &[usize],
    comp: usize,
    comp_vertices: &[usize],
    has_weak: bool,
    base_mask: &EdgeMask,
    model: &mut M,
    cycles: &mut CycleSet,
    config: &MeasuresConfig,
) -> MrtResult<f64> {
    let mut rows: Vec<Vec<u32>> = Vec::new();
    let mut row: Vec<u32> = Vec::new();
    for cycle in cycles.iter() {
        model.row_for_cycle(cycle, &mut row);
        if !row.is_empty() {
            rows.push(row.clone());
        }
    }

    let cap = config.iteration_cap_factor * graph.vertex_count() + 5;
    for _ in 0..cap {
        config.cancel.check()?;

        let solution = model.solve(&rows)?;
        model.apply(&solution.selected);

        let mut fresh = CycleSet::new();
        critical_cycles(
            graph,
            labels,
            comp,
            comp_vertices,
            |e| model.residual(e),
            &mut fresh,
        );
        if fresh.is_empty() && has_weak {
            // Violations that lean on weak edges are invisible to the
            // residual search; confirm a live cycle exists before paying
            // for enumeration.
            let mut mask = base_mask.clone();
            for e in 0..graph.edge_count() {
                if !mask.contains(e) && model.edge_removed(e) {
                    mask.set(e);
                }
            }
            if has_cycle(graph, labels, comp, comp_vertices, |e| !mask.contains(e)) {
                break_strict_cycles(graph, &mask, &mut fresh);
            }
        }

        if fresh.is_empty() {
            return Ok(model.value(solution.objective));
        }
        for cycle in fresh.iter() {
            model.row_for_cycle(cycle, &mut row);
            if !row.is_empty() {
                rows.push(row.clone());
            }
        }
        cycles.extend_from(&fresh);
    }
    Err(MrtError::NonConvergence { iterations: cap })
}
