//! Randomized cross-checks of the solvers against exhaustive baselines.
//!
//! Small random datasets keep the brute forces tractable: Afriat's index
//! is checked against the max-min over every elementary cycle, and
//! Houtman–Maks against the largest rationalizable subset found by
//! enumerating all 2^T observation subsets.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use mrt_algo::johnson::enumerate_cycles;
use mrt_algo::{data_rationalizable, rationality_measures, rationality_measures_symmetric};
use mrt_core::{EdgeMask, Observations, RpGraph};

fn random_obs(rng: &mut StdRng, goods: usize, periods: usize) -> Observations {
    let n = goods * periods;
    let prices: Vec<f64> = (0..n).map(|_| 0.5 + 1.5 * rng.gen::<f64>()).collect();
    let mut quantities: Vec<f64> = (0..n).map(|_| 2.0 * rng.gen::<f64>()).collect();
    for t in 0..periods {
        // Continuous draws never sum to zero, but keep the invariant
        // explicit.
        let col = &mut quantities[t * goods..(t + 1) * goods];
        if col.iter().sum::<f64>() <= 0.0 {
            col[0] = 1.0;
        }
    }
    Observations::new(goods, periods, prices, quantities).unwrap()
}

/// Max over elementary cycles of the minimum edge weight.
fn afriat_by_enumeration(graph: &RpGraph) -> f64 {
    let mask = EdgeMask::new(graph.edge_count());
    let mut best: f64 = 0.0;
    enumerate_cycles(graph, &mask, |cycle| {
        let min = cycle
            .iter()
            .map(|&e| graph.weight(e))
            .fold(f64::INFINITY, f64::min);
        best = best.max(min);
        true
    });
    best
}

/// Largest subset of observations that satisfies GARP, by 2^T search.
fn largest_rationalizable_subset(obs: &Observations) -> usize {
    let goods = obs.goods();
    let periods = obs.periods();
    let mut best = 0;
    for subset in 1u32..(1 << periods) {
        let size = subset.count_ones() as usize;
        if size <= best {
            continue;
        }
        let mut prices = Vec::new();
        let mut quantities = Vec::new();
        for t in 0..periods {
            if subset & (1 << t) != 0 {
                prices.extend_from_slice(obs.price(t));
                quantities.extend_from_slice(obs.quantity(t));
            }
        }
        let sub = Observations::new(goods, size, prices, quantities).unwrap();
        if data_rationalizable(&sub).unwrap() {
            best = size;
        }
    }
    best
}

#[test]
fn afriat_matches_cycle_enumeration() {
    let mut rng = StdRng::seed_from_u64(2024);
    for case in 0..30 {
        let periods = 2 + (case % 5);
        let goods = 1 + (case % 3);
        let obs = random_obs(&mut rng, goods, periods);
        let graph = RpGraph::build(&obs);
        let expected = afriat_by_enumeration(&graph);
        let report = rationality_measures(&obs, &[]).unwrap();
        assert!(
            (report.afriat - expected).abs() < 1e-9,
            "case {case}: afriat {} vs enumeration {expected}",
            report.afriat
        );
    }
}

#[test]
fn houtman_maks_matches_subset_enumeration() {
    let mut rng = StdRng::seed_from_u64(77);
    for case in 0..20 {
        let periods = 2 + (case % 5);
        let goods = 1 + (case % 3);
        let obs = random_obs(&mut rng, goods, periods);
        let report = rationality_measures(&obs, &[]).unwrap();
        let best = largest_rationalizable_subset(&obs);
        let expected = (periods - best) as f64 / periods as f64;
        assert!(
            (report.houtman_maks - expected).abs() < 1e-9,
            "case {case}: hm {} vs subsets {expected}",
            report.houtman_maks
        );
    }
}

#[test]
fn index_relations_hold_on_random_data() {
    let mut rng = StdRng::seed_from_u64(5150);
    for case in 0..15 {
        let periods = 2 + (case % 4);
        let obs = random_obs(&mut rng, 2, periods);
        let report = rationality_measures(&obs, &[1.0]).unwrap();
        let t = periods as f64;

        // Ordinal indices are integer counts over T.
        let hm = report.houtman_maks * t;
        let swaps = report.swaps * t;
        assert!((hm - hm.round()).abs() < 1e-9, "case {case}");
        assert!((swaps - swaps.round()).abs() < 1e-9, "case {case}");

        // NMCI-1 removes the same edges at weight ≤ 1 cost.
        assert!(
            report.per_alpha[0].nmci <= report.swaps + 1e-9,
            "case {case}: nmci {} > swaps {}",
            report.per_alpha[0].nmci,
            report.swaps
        );

        // A violation shows up in every index; a clean dataset in none.
        let rational = data_rationalizable(&obs).unwrap();
        let zero = report.clone().into_vec().iter().all(|&v| v == 0.0);
        if rational {
            assert!(zero, "case {case}: rational data scored {report:?}");
        }
        assert!(
            report.afriat <= 1.0 + 1e-9,
            "case {case}: afriat out of range"
        );
    }
}

#[test]
fn symmetric_indices_dominate_on_random_data() {
    let mut rng = StdRng::seed_from_u64(31337);
    for case in 0..10 {
        let periods = 2 + (case % 3);
        let obs = random_obs(&mut rng, 2, periods);
        let base = rationality_measures(&obs, &[1.0]).unwrap().into_vec();
        let sym = rationality_measures_symmetric(&obs, &[1.0])
            .unwrap()
            .into_vec();
        for (i, (b, s)) in base.iter().zip(&sym).enumerate() {
            assert!(
                s + 1e-9 >= *b,
                "case {case}, index {i}: symmetric {s} < base {b}"
            );
        }
    }
}
