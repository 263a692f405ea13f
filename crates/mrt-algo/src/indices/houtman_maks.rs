//! Houtman–Maks: the fewest observations whose removal rationalizes the
//! data.
//!
//! Removal granularity is the *vertex*. Every vertex costs 1; a cycle's
//! cover row holds the vertices it passes through (each is the head of
//! exactly one cycle edge). The removal state masks every edge incident
//! to a removed vertex. The residual search runs on the original weights,
//! so only all-strict cycles surface there; violations that lean on weak
//! edges come from the Johnson fallback.
//!
//! Vertices carrying a strict self-loop (symmetric graphs only) are
//! already paid for by the flat 1-cycle scan: nothing else can cover a
//! self-loop, so the model starts with them removed and cycles through
//! them need no row.

use mrt_core::{RpGraph, STRICT_TOL};

use super::CoverModel;

pub(crate) struct HmModel<'a> {
    graph: &'a RpGraph,
    /// Vertex → column, `usize::MAX` outside the component and for
    /// pre-removed vertices.
    vertex_col: Vec<usize>,
    columns: usize,
    removed: Vec<bool>,
}

impl<'a> HmModel<'a> {
    /// `loop_floor[v] > 0` marks v as carrying a strict self-loop,
    /// pre-removed at a cost the 1-cycle scan has already charged.
    pub(crate) fn new(graph: &'a RpGraph, comp_vertices: &[usize], loop_floor: &[f64]) -> Self {
        let mut vertex_col = vec![usize::MAX; graph.vertex_count()];
        let mut removed = vec![false; graph.vertex_count()];
        let mut columns = 0;
        for &v in comp_vertices {
            if loop_floor[v] > STRICT_TOL {
                removed[v] = true;
            } else {
                vertex_col[v] = columns;
                columns += 1;
            }
        }
        Self {
            graph,
            vertex_col,
            columns,
            removed,
        }
    }
}

impl CoverModel for HmModel<'_> {
    fn column_count(&self) -> usize {
        self.columns
    }

    fn cost(&self, _col: usize) -> f64 {
        1.0
    }

    fn row_for_cycle(&self, cycle: &[u32], row: &mut Vec<u32>) {
        row.clear();
        for &e in cycle {
            let v = self.graph.head(e as usize);
            let col = self.vertex_col[v];
            if col == usize::MAX {
                // A pre-removed vertex already breaks this cycle.
                row.clear();
                return;
            }
            row.push(col as u32);
        }
        row.sort_unstable();
        row.dedup();
    }

    fn apply(&mut self, selected: &[bool]) {
        for (v, &col) in self.vertex_col.iter().enumerate() {
            if col != usize::MAX {
                self.removed[v] = selected[col];
            }
        }
    }

    fn residual(&self, e: usize) -> f64 {
        if self.edge_removed(e) {
            0.0
        } else {
            self.graph.weight(e)
        }
    }

    fn edge_removed(&self, e: usize) -> bool {
        self.removed[self.graph.head(e)] || self.removed[self.graph.tail(e)]
    }

    fn value(&self, objective: f64) -> f64 {
        objective
    }
}
