//! Percentile scoring against uniform budget-line draws.
//!
//! How irrational is the dataset compared to a consumer who picks bundles
//! at random? Each draw replaces every observed bundle with one sampled
//! uniformly from that period's budget simplex {x ≥ 0 : p_t·x = w_t}:
//! G i.i.d. Exp(1) variates normalized to income shares, divided
//! componentwise by prices. The full index battery is recomputed per draw
//! and tallied against the observed values.
//!
//! Draws are prepared up front from one seeded RNG, so the evaluation
//! loop is embarrassingly parallel and a fixed seed reproduces the score
//! exactly regardless of worker count. A draw that fails to solve (the
//! oracle can reject pathological synthetic data) is isolated: it drops
//! out of the denominator and shows up in [`PercentileScore::failed_draws`]
//! instead of aborting the run.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use mrt_core::{CancelToken, MrtError, MrtResult, Observations};

use crate::indices::{
    data_rationalizable, rationality_measures_with, MeasuresConfig,
};

/// Configuration of a percentile run.
#[derive(Debug, Clone, Default)]
pub struct PercentileConfig {
    /// Seed of the draw generator; a fixed seed pins the whole score.
    pub seed: u64,
    /// Checked before each draw and inside each draw's solver loops.
    pub cancel: CancelToken,
}

/// Tallies of a percentile run. Probabilities are k/N over completed
/// draws; the index layout matches [`crate::MeasuresReport::into_vec`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileScore {
    /// Per index: share of draws at least as irrational as the data.
    pub prob_weakly_less_rational_than_random: Vec<f64>,
    /// Per index: share of draws strictly more irrational than the data.
    pub prob_strictly_less_rational_than_random: Vec<f64>,
    /// Share of draws satisfying GARP outright.
    pub prob_random_satisfies_garp: f64,
    pub draws_requested: usize,
    pub draws_completed: usize,
    pub failed_draws: usize,
}

/// Indices of HM and Swaps in the flat value layout; these are counts
/// divided by T and compare at integer resolution.
const ORDINAL_SLOTS: [usize; 2] = [1, 2];

fn ordinal(value: f64, t: f64) -> i64 {
    (value * t).round() as i64
}

/// Score the dataset against `draws` uniform budget-line draws.
pub fn percentile_score(
    obs: &Observations,
    alphas: &[f64],
    draws: usize,
    config: &PercentileConfig,
) -> MrtResult<PercentileScore> {
    if draws == 0 {
        return Err(MrtError::InvalidInput(
            "percentile scoring needs at least one draw".into(),
        ));
    }

    let measures_config = MeasuresConfig {
        cancel: config.cancel.clone(),
        ..MeasuresConfig::default()
    };
    let observed = rationality_measures_with(obs, alphas, &measures_config)?.into_vec();

    let goods = obs.goods();
    let periods = obs.periods();
    let t_f = periods as f64;

    // All randomness happens here, before the parallel section.
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut shares = vec![0.0; goods];
    let quantity_sets: Vec<Vec<f64>> = (0..draws)
        .map(|_| {
            let mut quantities = vec![0.0; goods * periods];
            for t in 0..periods {
                let mut total = 0.0;
                for share in shares.iter_mut() {
                    let u: f64 = rng.gen();
                    *share = -(1.0 - u).ln();
                    total += *share;
                }
                let prices = obs.price(t);
                let income = obs.income(t);
                for g in 0..goods {
                    quantities[t * goods + g] = income * shares[g] / (total * prices[g]);
                }
            }
            quantities
        })
        .collect();

    let outcomes: Vec<Option<(Vec<f64>, bool)>> = quantity_sets
        .into_par_iter()
        .map(|quantities| {
            if config.cancel.is_cancelled() {
                return None;
            }
            let synthetic = obs.with_quantities(quantities).ok()?;
            let values = rationality_measures_with(&synthetic, alphas, &measures_config)
                .ok()?
                .into_vec();
            let garp = data_rationalizable(&synthetic).ok()?;
            Some((values, garp))
        })
        .collect();
    config.cancel.check()?;

    let k = observed.len();
    let mut weak = vec![0usize; k];
    let mut strict = vec![0usize; k];
    let mut garp_hits = 0usize;
    let mut completed = 0usize;

    for outcome in outcomes.iter().flatten() {
        let (values, garp) = outcome;
        completed += 1;
        if *garp {
            garp_hits += 1;
        }
        for i in 0..k {
            let (ge, gt) = if ORDINAL_SLOTS.contains(&i) {
                let (d, o) = (ordinal(values[i], t_f), ordinal(observed[i], t_f));
                (d >= o, d > o)
            } else {
                (values[i] >= observed[i], values[i] > observed[i])
            };
            if ge {
                weak[i] += 1;
            }
            if gt {
                strict[i] += 1;
            }
        }
    }

    if completed == 0 {
        return Err(MrtError::Other(
            "every Monte-Carlo draw failed to solve".into(),
        ));
    }

    let n = completed as f64;
    Ok(PercentileScore {
        prob_weakly_less_rational_than_random: weak.iter().map(|&c| c as f64 / n).collect(),
        prob_strictly_less_rational_than_random: strict.iter().map(|&c| c as f64 / n).collect(),
        prob_random_satisfies_garp: garp_hits as f64 / n,
        draws_requested: draws,
        draws_completed: completed,
        failed_draws: draws - completed,
    })
}
