//! Money-pump statistics over the full elementary-cycle set.
//!
//! A cycle of revealed preferences with at least one strict edge is an
//! arbitrage opportunity against the consumer: buying each bundle just
//! before it was chosen and selling it at the next period's prices nets
//! the cycle's total saving. Two per-cycle statistics are accumulated —
//!
//! - average MPI: Σᵢ p_{tᵢ}·(x_{tᵢ} − x_{tᵢ₊₁}) / Σᵢ p_{tᵢ}·x_{tᵢ}, the
//!   pump's take as a share of the money that flowed through it;
//! - normalized MPI: the mean edge weight, each leg's saving already
//!   scaled by that period's income
//!
//! — and averaged over the cycle count. All-weak cycles pump nothing and
//! are skipped. Enumeration is Johnson's, each elementary cycle counted
//! once, anchored at its minimum vertex; the run time is exponential in
//! the worst case and callers opt in knowing that.

use serde::{Deserialize, Serialize};

use mrt_core::{EdgeMask, MrtResult, Observations, RpGraph};

use crate::johnson::enumerate_cycles;

/// Aggregate money-pump statistics of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoneyPumpStats {
    /// Mean over cycles of (cycle saving / cycle turnover).
    pub avg_mpi: f64,
    /// Mean over cycles of the mean edge weight.
    pub normalized_mpi: f64,
    /// Number of elementary cycles with at least one strict edge.
    pub cycles: usize,
}

/// Enumerate every elementary revealed-preference cycle and accumulate
/// money-pump statistics. Returns zeros when the data admits no pump.
pub fn money_pump_index(obs: &Observations) -> MrtResult<MoneyPumpStats> {
    let graph = RpGraph::build(obs);
    let mask = EdgeMask::new(graph.edge_count());

    let mut avg_sum = 0.0;
    let mut norm_sum = 0.0;
    let mut cycles = 0usize;

    enumerate_cycles(&graph, &mask, |cycle| {
        if cycle.iter().any(|&e| graph.is_strict(e)) {
            let mut saving = 0.0;
            let mut turnover = 0.0;
            let mut weight_sum = 0.0;
            for &e in cycle {
                let t = graph.tail(e);
                saving += graph.weight(e) * obs.income(t);
                turnover += obs.income(t);
                weight_sum += graph.weight(e);
            }
            avg_sum += saving / turnover;
            norm_sum += weight_sum / cycle.len() as f64;
            cycles += 1;
        }
        true
    });

    if cycles == 0 {
        return Ok(MoneyPumpStats {
            avg_mpi: 0.0,
            normalized_mpi: 0.0,
            cycles: 0,
        });
    }
    Ok(MoneyPumpStats {
        avg_mpi: avg_sum / cycles as f64,
        normalized_mpi: norm_sum / cycles as f64,
        cycles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_observation_has_no_pump() {
        let obs = Observations::new(2, 1, vec![1.0, 2.0], vec![3.0, 1.0]).unwrap();
        let stats = money_pump_index(&obs).unwrap();
        assert_eq!(
            stats,
            MoneyPumpStats {
                avg_mpi: 0.0,
                normalized_mpi: 0.0,
                cycles: 0
            }
        );
    }

    #[test]
    fn test_strict_two_cycle_pump() {
        // Both incomes 5, both edges weight 0.2: the pump extracts 2 of
        // the 10 units that pass through it.
        let obs =
            Observations::new(2, 2, vec![2.0, 1.0, 1.0, 2.0], vec![2.0, 1.0, 1.0, 2.0]).unwrap();
        let stats = money_pump_index(&obs).unwrap();
        assert_eq!(stats.cycles, 1);
        assert!((stats.avg_mpi - 0.2).abs() < 1e-12);
        assert!((stats.normalized_mpi - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_all_weak_cycle_pumps_nothing() {
        let obs =
            Observations::new(2, 2, vec![1.0, 1.0, 1.0, 1.0], vec![2.0, 0.0, 0.0, 2.0]).unwrap();
        let stats = money_pump_index(&obs).unwrap();
        assert_eq!(stats.cycles, 0);
        assert_eq!(stats.avg_mpi, 0.0);
    }
}
