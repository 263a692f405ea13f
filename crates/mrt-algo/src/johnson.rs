//! Elementary-cycle enumeration (Johnson 1975).
//!
//! Johnson's algorithm walks the graph one root at a time: the root is the
//! smallest vertex of the least nontrivial SCC in the subgraph of vertices
//! ≥ the current start bound (see [`crate::scc::min_vertex_scc`]), circuits
//! through the root are enumerated with blocked-set bookkeeping, and the
//! root is then retired. Every elementary cycle is produced exactly once,
//! anchored at its minimum vertex.
//!
//! Two consumers with different needs share the core:
//!
//! - [`enumerate_cycles`] hands every elementary cycle to a visitor
//!   (money-pump statistics; brute-force checks in tests). Worst-case
//!   exponential in the cycle count, as the caller is expected to know.
//! - [`break_strict_cycles`] hunts violations: each enumerated cycle that
//!   still contains a strict edge is recorded and its *last* strict edge
//!   is masked before the hunt restarts. Weak cycles — all weights zero —
//!   are passed over; they are not violations and removing their edges
//!   repairs nothing. This catches the mixed strict/weak cycles the
//!   residual-weight DFS cannot see, at a polynomial number of restarts.

use hashbrown::HashSet;

use mrt_core::{EdgeMask, RpGraph};

use crate::cycles::CycleSet;
use crate::scc::min_vertex_scc;

struct Circuits<'a, F> {
    graph: &'a RpGraph,
    removed: &'a EdgeMask,
    in_comp: Vec<bool>,
    blocked: Vec<bool>,
    block_lists: Vec<HashSet<u32>>,
    path: Vec<usize>,
    root: usize,
    visit: F,
}

impl<'a, F: FnMut(&[usize]) -> bool> Circuits<'a, F> {
    /// Explore circuits through the root starting at `v`. Returns
    /// (found a cycle below v, visitor asked to abort).
    fn circuit(&mut self, v: usize) -> (bool, bool) {
        self.blocked[v] = true;
        let mut found = false;
        for e in self.graph.out_edges(v) {
            if self.removed.contains(e) {
                continue;
            }
            let u = self.graph.head(e);
            if !self.in_comp[u] {
                continue;
            }
            if u == self.root {
                self.path.push(e);
                let keep_going = (self.visit)(&self.path);
                self.path.pop();
                found = true;
                if !keep_going {
                    return (found, true);
                }
            } else if !self.blocked[u] {
                self.path.push(e);
                let (f, abort) = self.circuit(u);
                self.path.pop();
                if abort {
                    return (true, true);
                }
                found |= f;
            }
        }
        if found {
            self.unblock(v);
        } else {
            for e in self.graph.out_edges(v) {
                if self.removed.contains(e) {
                    continue;
                }
                let u = self.graph.head(e);
                if self.in_comp[u] && u != v {
                    self.block_lists[u].insert(v as u32);
                }
            }
        }
        (found, false)
    }

    fn unblock(&mut self, v: usize) {
        self.blocked[v] = false;
        let waiters = std::mem::take(&mut self.block_lists[v]);
        for u in waiters {
            if self.blocked[u as usize] {
                self.unblock(u as usize);
            }
        }
    }
}

/// Enumerate every elementary cycle of the graph not touching a removed
/// edge, as an edge-id slice in path order. The visitor returns `false`
/// to abort the whole enumeration. Self-loops are 1-cycles.
pub fn enumerate_cycles<F: FnMut(&[usize]) -> bool>(
    graph: &RpGraph,
    removed: &EdgeMask,
    mut visit: F,
) {
    let t = graph.vertex_count();
    let mut start = 0;
    while start < t {
        let comp = min_vertex_scc(graph, start, removed);
        let Some(&root) = comp.last() else {
            return;
        };

        let mut ctx = Circuits {
            graph,
            removed,
            in_comp: vec![false; t],
            blocked: vec![false; t],
            block_lists: vec![HashSet::new(); t],
            path: Vec::new(),
            root,
            visit: &mut visit,
        };
        for &v in &comp {
            ctx.in_comp[v] = true;
        }

        // A self-loop at the root closes against the root like any other
        // edge, so the circuit search emits it as a 1-cycle; self-loops
        // elsewhere in the component surface once their vertex becomes
        // the root of its own (then singleton) component.
        let (_, aborted) = ctx.circuit(root);
        if aborted {
            return;
        }
        start = root + 1;
    }
}

/// Record violations until none remain: every enumerated cycle containing
/// at least one strict unmasked edge is appended to `out`, its last strict
/// edge is masked on top of `removed`, and the enumeration restarts.
/// Returns the number of cycles recorded.
///
/// The solvers call this when a component carries weak edges, after the
/// residual DFS has run dry; termination needs at most one restart per
/// strict edge.
pub fn break_strict_cycles(graph: &RpGraph, removed: &EdgeMask, out: &mut CycleSet) -> usize {
    let mut scratch = removed.clone();
    let mut recorded = 0;
    loop {
        let mut hit: Option<(Vec<usize>, usize)> = None;
        enumerate_cycles(graph, &scratch, |path| {
            match path.iter().rev().copied().find(|&e| graph.is_strict(e)) {
                Some(last_strict) => {
                    hit = Some((path.to_vec(), last_strict));
                    false
                }
                None => true,
            }
        });
        match hit {
            Some((cycle, cut)) => {
                out.push(&cycle);
                scratch.set(cut);
                recorded += 1;
            }
            None => return recorded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mrt_core::Observations;

    fn collect_cycles(graph: &RpGraph) -> Vec<Vec<usize>> {
        let mask = EdgeMask::new(graph.edge_count());
        let mut all = Vec::new();
        enumerate_cycles(graph, &mask, |path| {
            all.push(path.to_vec());
            true
        });
        all
    }

    #[test]
    fn test_enumerates_single_two_cycle() {
        let obs =
            Observations::new(2, 2, vec![2.0, 1.0, 1.0, 2.0], vec![2.0, 1.0, 1.0, 2.0]).unwrap();
        let g = RpGraph::build(&obs);
        let cycles = collect_cycles(&g);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 2);
    }

    #[test]
    fn test_enumerates_self_loop_as_one_cycle() {
        let obs = Observations::new(2, 1, vec![1.0, 2.0], vec![1.0, 2.0]).unwrap();
        let g = RpGraph::build_symmetric(&obs).unwrap();
        let cycles = collect_cycles(&g);
        assert_eq!(cycles, vec![vec![0]]);
    }

    #[test]
    fn test_enumeration_covers_disjoint_components() {
        let obs = Observations::new(
            2,
            4,
            vec![2.0, 1.0, 1.0, 2.0, 2.0, 1.0, 1.0, 2.0],
            vec![2.0, 1.0, 1.0, 2.0, 20.0, 10.0, 10.0, 20.0],
        )
        .unwrap();
        let g = RpGraph::build(&obs);
        let cycles = collect_cycles(&g);
        assert_eq!(cycles.len(), 2);
        assert!(cycles.iter().all(|c| c.len() == 2));
    }

    #[test]
    fn test_visitor_abort_stops_enumeration() {
        let obs = Observations::new(
            2,
            4,
            vec![2.0, 1.0, 1.0, 2.0, 2.0, 1.0, 1.0, 2.0],
            vec![2.0, 1.0, 1.0, 2.0, 20.0, 10.0, 10.0, 20.0],
        )
        .unwrap();
        let g = RpGraph::build(&obs);
        let mask = EdgeMask::new(g.edge_count());
        let mut seen = 0;
        enumerate_cycles(&g, &mask, |_| {
            seen += 1;
            false
        });
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_break_strict_cycles_records_and_terminates() {
        let obs =
            Observations::new(2, 2, vec![2.0, 1.0, 1.0, 2.0], vec![2.0, 1.0, 1.0, 2.0]).unwrap();
        let g = RpGraph::build(&obs);
        let mask = EdgeMask::new(g.edge_count());
        let mut out = CycleSet::new();
        assert_eq!(break_strict_cycles(&g, &mask, &mut out), 1);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_break_strict_cycles_ignores_all_weak_cycle() {
        let obs =
            Observations::new(2, 2, vec![1.0, 1.0, 1.0, 1.0], vec![2.0, 0.0, 0.0, 2.0]).unwrap();
        let g = RpGraph::build(&obs);
        assert!(g.has_weak_edges());
        let mask = EdgeMask::new(g.edge_count());
        let mut out = CycleSet::new();
        assert_eq!(break_strict_cycles(&g, &mask, &mut out), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_break_strict_cycles_catches_mixed_cycle() {
        // 0→1 strict, 1→0 weak: one violation, cut at the strict edge.
        let obs =
            Observations::new(2, 2, vec![1.0, 1.0, 2.0, 1.0], vec![1.0, 1.0, 1.5, 0.0]).unwrap();
        let g = RpGraph::build(&obs);
        let e01 = g.find_edge(0, 1).unwrap();
        let e10 = g.find_edge(1, 0).unwrap();
        assert!(g.is_strict(e01) && !g.is_strict(e10));
        let mask = EdgeMask::new(g.edge_count());
        let mut out = CycleSet::new();
        assert_eq!(break_strict_cycles(&g, &mask, &mut out), 1);
        let cycle = out.iter().next().unwrap();
        assert!(cycle.contains(&(e01 as u32)));
        assert!(cycle.contains(&(e10 as u32)));
    }
}
