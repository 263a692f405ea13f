//! Per-edge removal: the Swaps count and the normalized minimum cost
//! index.
//!
//! Both indices delete individual strict revealed preferences until no
//! violation cycle survives; they differ only in what a deletion costs —
//! 1 for Swaps, w(i)^α for NMCI-α. A cycle's cover row holds its strict
//! edges: weak relations are already boundary cases and deleting one
//! repairs nothing, so they never enter the candidate set.
//!
//! With every strict weight equal to 1, NMCI-1 and Swaps coincide.

use mrt_core::RpGraph;

use super::CoverModel;

pub(crate) struct EdgeRemovalModel<'a> {
    graph: &'a RpGraph,
    /// Column → edge id.
    columns: Vec<u32>,
    /// Edge id → column, `usize::MAX` for non-candidates.
    edge_col: Vec<usize>,
    costs: Vec<f64>,
    removed: Vec<bool>,
}

impl<'a> EdgeRemovalModel<'a> {
    /// Candidate columns are the component's strict non-self-loop edges.
    fn build(graph: &'a RpGraph, labels: &[usize], comp: usize, cost: impl Fn(f64) -> f64) -> Self {
        let mut columns = Vec::new();
        let mut edge_col = vec![usize::MAX; graph.edge_count()];
        let mut costs = Vec::new();
        for e in 0..graph.edge_count() {
            if graph.is_strict(e)
                && !graph.is_self_loop(e)
                && labels[graph.tail(e)] == comp
                && labels[graph.head(e)] == comp
            {
                edge_col[e] = columns.len();
                columns.push(e as u32);
                costs.push(cost(graph.weight(e)));
            }
        }
        let removed = vec![false; columns.len()];
        Self {
            graph,
            columns,
            edge_col,
            costs,
            removed,
        }
    }

    /// Unit-cost variant: the Swaps index.
    pub(crate) fn swaps(graph: &'a RpGraph, labels: &[usize], comp: usize) -> Self {
        Self::build(graph, labels, comp, |_| 1.0)
    }

    /// Weighted variant: NMCI-α. α = 0 degrades to unit costs, its
    /// natural limit.
    pub(crate) fn nmci(graph: &'a RpGraph, labels: &[usize], comp: usize, alpha: f64) -> Self {
        if alpha == 0.0 {
            Self::build(graph, labels, comp, |_| 1.0)
        } else {
            Self::build(graph, labels, comp, |w| w.powf(alpha))
        }
    }
}

impl CoverModel for EdgeRemovalModel<'_> {
    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn cost(&self, col: usize) -> f64 {
        self.costs[col]
    }

    fn row_for_cycle(&self, cycle: &[u32], row: &mut Vec<u32>) {
        row.clear();
        for &e in cycle {
            let col = self.edge_col[e as usize];
            if col != usize::MAX {
                row.push(col as u32);
            }
        }
        row.sort_unstable();
        row.dedup();
    }

    fn apply(&mut self, selected: &[bool]) {
        self.removed.copy_from_slice(selected);
    }

    fn residual(&self, e: usize) -> f64 {
        match self.edge_col[e] {
            usize::MAX => 0.0,
            col if self.removed[col] => 0.0,
            _ => self.graph.weight(e),
        }
    }

    fn edge_removed(&self, e: usize) -> bool {
        matches!(self.edge_col[e], col if col != usize::MAX && self.removed[col])
    }

    fn value(&self, objective: f64) -> f64 {
        objective
    }
}
