//! Strongly connected components over the CSR graph (Tarjan 1972).
//!
//! Two variants with identical traversal cores:
//!
//! - [`strongly_connected_components`] partitions all vertices. Trivial
//!   components (a single vertex without a surviving self-loop) receive
//!   label 0 and are skipped by every consumer; nontrivial components are
//!   numbered 1..=K.
//! - [`min_vertex_scc`] restricts the search to vertices ≥ a lower bound
//!   and to edges whose removal bit is clear, and returns *the* nontrivial
//!   component containing the smallest reachable vertex — the subproblem
//!   Johnson's enumeration asks for at every step.
//!
//! Both are iterative with an explicit stack; the recursion depth of the
//! textbook formulation is a liability at larger T.

use mrt_core::{EdgeMask, RpGraph};

const UNVISITED: u32 = u32::MAX;

/// Partition of the vertex set into strongly connected components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SccPartition {
    /// Per-vertex component label: 0 for trivial components, 1..=count for
    /// nontrivial ones.
    pub labels: Vec<usize>,
    /// Number of nontrivial components.
    pub count: usize,
}

impl SccPartition {
    /// Vertex lists of the nontrivial components; entry k holds the
    /// members of component k+1, ascending.
    pub fn members(&self) -> Vec<Vec<usize>> {
        let mut out = vec![Vec::new(); self.count];
        for (v, &label) in self.labels.iter().enumerate() {
            if label > 0 {
                out[label - 1].push(v);
            }
        }
        out
    }
}

struct Tarjan<'a> {
    graph: &'a RpGraph,
    removed: Option<&'a EdgeMask>,
    min_vertex: usize,
    index: Vec<u32>,
    low: Vec<u32>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    next_index: u32,
}

impl<'a> Tarjan<'a> {
    fn new(graph: &'a RpGraph, removed: Option<&'a EdgeMask>, min_vertex: usize) -> Self {
        let t = graph.vertex_count();
        Self {
            graph,
            removed,
            min_vertex,
            index: vec![UNVISITED; t],
            low: vec![0; t],
            on_stack: vec![false; t],
            stack: Vec::new(),
            next_index: 0,
        }
    }

    #[inline]
    fn edge_live(&self, e: usize) -> bool {
        self.graph.head(e) >= self.min_vertex
            && !self.graph.is_self_loop(e)
            && self.removed.map_or(true, |m| !m.contains(e))
    }

    fn has_live_self_loop(&self, v: usize) -> bool {
        self.graph
            .out_edges(v)
            .any(|e| self.graph.is_self_loop(e) && self.removed.map_or(true, |m| !m.contains(e)))
    }

    fn visit(&mut self, v: usize) {
        self.index[v] = self.next_index;
        self.low[v] = self.next_index;
        self.next_index += 1;
        self.stack.push(v);
        self.on_stack[v] = true;
    }

    /// DFS from `root`, appending each completed component to `sink`.
    fn run<F: FnMut(Vec<usize>)>(&mut self, root: usize, sink: &mut F) {
        let mut frames: Vec<(usize, std::ops::Range<usize>)> = Vec::new();
        self.visit(root);
        frames.push((root, self.graph.out_edges(root)));

        while !frames.is_empty() {
            let descend = {
                let (v, cursor) = frames.last_mut().expect("nonempty frame stack");
                let v = *v;
                let mut descend = None;
                for e in cursor.by_ref() {
                    if !self.edge_live(e) {
                        continue;
                    }
                    let u = self.graph.head(e);
                    if self.index[u] == UNVISITED {
                        descend = Some(u);
                        break;
                    } else if self.on_stack[u] {
                        self.low[v] = self.low[v].min(self.index[u]);
                    }
                }
                descend
            };

            match descend {
                Some(u) => {
                    self.visit(u);
                    frames.push((u, self.graph.out_edges(u)));
                }
                None => {
                    let (v, _) = frames.pop().expect("nonempty frame stack");
                    if let Some((parent, _)) = frames.last() {
                        let parent = *parent;
                        self.low[parent] = self.low[parent].min(self.low[v]);
                    }
                    if self.low[v] == self.index[v] {
                        let mut component = Vec::new();
                        loop {
                            let w = self.stack.pop().expect("tarjan stack underflow");
                            self.on_stack[w] = false;
                            component.push(w);
                            if w == v {
                                break;
                            }
                        }
                        sink(component);
                    }
                }
            }
        }
    }
}

/// Full Tarjan SCC partition of the graph.
///
/// Self-loops do not participate in the traversal but promote a singleton
/// component to nontrivial, matching their role as trivial 1-cycles.
pub fn strongly_connected_components(graph: &RpGraph) -> SccPartition {
    let t = graph.vertex_count();
    let mut labels = vec![0usize; t];
    let mut count = 0;
    let mut tarjan = Tarjan::new(graph, None, 0);
    for v in 0..t {
        if tarjan.index[v] != UNVISITED {
            continue;
        }
        let mut pending: Vec<Vec<usize>> = Vec::new();
        tarjan.run(v, &mut |component| pending.push(component));
        for component in pending {
            let nontrivial = component.len() > 1 || tarjan.has_live_self_loop(component[0]);
            if nontrivial {
                count += 1;
                for &w in &component {
                    labels[w] = count;
                }
            }
        }
    }
    SccPartition { labels, count }
}

/// The nontrivial SCC with the smallest vertex in the subgraph induced by
/// vertices ≥ `start` and edges not in `removed`.
///
/// Returns the component's vertices with the smallest one *last* (the
/// position Johnson's circuit search pops its root from), or an empty
/// vector when the subgraph is acyclic. Roots are tried in ascending
/// order; the scan stops as soon as no later root can produce a component
/// with a smaller minimum vertex.
pub fn min_vertex_scc(graph: &RpGraph, start: usize, removed: &EdgeMask) -> Vec<usize> {
    let t = graph.vertex_count();
    let mut tarjan = Tarjan::new(graph, Some(removed), start);
    let mut best: Option<Vec<usize>> = None;
    let mut best_min = usize::MAX;

    for root in start..t {
        // Components discovered from this root onward contain only
        // unvisited vertices, all ≥ root; a standing candidate below root
        // can no longer be beaten.
        if best_min < root {
            break;
        }
        if tarjan.index[root] != UNVISITED {
            continue;
        }
        let mut pending: Vec<Vec<usize>> = Vec::new();
        tarjan.run(root, &mut |component| pending.push(component));
        for component in pending {
            let nontrivial = component.len() > 1 || tarjan.has_live_self_loop(component[0]);
            if !nontrivial {
                continue;
            }
            let min = *component.iter().min().expect("nonempty component");
            if min < best_min {
                best_min = min;
                best = Some(component);
            }
        }
    }

    match best {
        Some(mut out) => {
            let pos = out
                .iter()
                .position(|&v| v == best_min)
                .expect("min vertex in component");
            let last = out.len() - 1;
            out.swap(pos, last);
            out
        }
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mrt_core::Observations;

    fn crossing_pair() -> RpGraph {
        let obs =
            Observations::new(2, 2, vec![2.0, 1.0, 1.0, 2.0], vec![2.0, 1.0, 1.0, 2.0]).unwrap();
        RpGraph::build(&obs)
    }

    #[test]
    fn test_two_cycle_is_one_component() {
        let g = crossing_pair();
        let scc = strongly_connected_components(&g);
        assert_eq!(scc.count, 1);
        assert_eq!(scc.labels, vec![1, 1]);
        assert_eq!(scc.members(), vec![vec![0, 1]]);
    }

    #[test]
    fn test_acyclic_data_is_all_trivial() {
        // Strictly shrinking purchases: edges only from richer to poorer.
        let obs = Observations::new(1, 3, vec![1.0, 1.0, 1.0], vec![3.0, 2.0, 1.0]).unwrap();
        let g = RpGraph::build(&obs);
        let scc = strongly_connected_components(&g);
        assert_eq!(scc.count, 0);
        assert_eq!(scc.labels, vec![0, 0, 0]);
    }

    #[test]
    fn test_self_loop_singleton_is_nontrivial() {
        let obs = Observations::new(2, 1, vec![1.0, 2.0], vec![1.0, 2.0]).unwrap();
        let g = RpGraph::build_symmetric(&obs).unwrap();
        let scc = strongly_connected_components(&g);
        assert_eq!(scc.count, 1);
        assert_eq!(scc.labels, vec![1]);
    }

    #[test]
    fn test_min_vertex_scc_returns_min_last() {
        let g = crossing_pair();
        let mask = EdgeMask::new(g.edge_count());
        let comp = min_vertex_scc(&g, 0, &mask);
        assert_eq!(comp.len(), 2);
        assert_eq!(comp.last(), Some(&0));
    }

    #[test]
    fn test_min_vertex_scc_respects_start_and_mask() {
        let g = crossing_pair();
        let mut mask = EdgeMask::new(g.edge_count());
        assert!(min_vertex_scc(&g, 1, &mask).is_empty());
        mask.set(0);
        assert!(min_vertex_scc(&g, 0, &mask).is_empty());
    }

    #[test]
    fn test_min_vertex_scc_walks_disjoint_components() {
        // Two disjoint strict 2-cycles: {0,1} and {2,3}.
        let obs = Observations::new(
            2,
            4,
            vec![2.0, 1.0, 1.0, 2.0, 2.0, 1.0, 1.0, 2.0],
            vec![2.0, 1.0, 1.0, 2.0, 20.0, 10.0, 10.0, 20.0],
        )
        .unwrap();
        let g = RpGraph::build(&obs);
        let mask = EdgeMask::new(g.edge_count());
        assert_eq!(min_vertex_scc(&g, 0, &mask).last(), Some(&0));
        assert_eq!(min_vertex_scc(&g, 1, &mask).last(), Some(&2));
        assert_eq!(min_vertex_scc(&g, 2, &mask).last(), Some(&2));
        assert!(min_vertex_scc(&g, 3, &mask).is_empty());
    }
}
