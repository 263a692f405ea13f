//! # mrt-algo: Rationality Indices for Revealed-Preference Data
//!
//! This crate quantifies how far a demand dataset deviates from
//! utility-maximizing behavior. Every index is an optimum over ways of
//! repairing the revealed-preference graph built by `mrt-core`:
//!
//! | Index | Removes | Cost | Solved by |
//! |-------|---------|------|-----------|
//! | Afriat | a common income share | max-min | estimate-raising DFS (exact) |
//! | Houtman–Maks | observations | 1 per vertex | cycle-cover ILP |
//! | Swaps | strict preferences | 1 per edge | cycle-cover ILP |
//! | Varian-α | per-period income shares | e_t^α | cycle-cover ILP |
//! | Inverse-Varian-α | mirrored along in-edges | e_t^α | cycle-cover ILP |
//! | NMCI-α | strict preferences | w^α per edge | cycle-cover ILP |
//!
//! ## Architecture
//!
//! The ILP-backed indices share one outer loop ([`indices`]): discovered
//! cycles accumulate as cover rows, the binary oracle ([`ilp`], `good_lp`
//! over HiGHS) picks removals, and the cycle finders ([`cycles`],
//! [`johnson`]) hunt survivors under the index's residual weights until
//! the graph is rationalized. Work is dispatched per strongly connected
//! component ([`scc`]); what varies per index is only the reduction from
//! cycles to rows, expressed as a strategy trait the solvers implement.
//!
//! ## Beyond the indices
//!
//! - [`money_pump`] — arbitrage statistics over every elementary cycle
//! - [`monte_carlo`] — percentile score against uniform budget-line
//!   draws, parallelized with rayon
//!
//! ## Example
//!
//! ```no_run
//! use mrt_core::Observations;
//! use mrt_algo::rationality_measures;
//!
//! let obs = Observations::new(
//!     2,
//!     2,
//!     vec![2.0, 1.0, 1.0, 2.0],
//!     vec![2.0, 1.0, 1.0, 2.0],
//! )?;
//! let report = rationality_measures(&obs, &[1.0])?;
//! println!("{}", report.summary());
//! # Ok::<(), mrt_core::MrtError>(())
//! ```

pub mod cycles;
pub mod ilp;
pub mod indices;
pub mod johnson;
pub mod money_pump;
pub mod monte_carlo;
pub mod scc;

pub use indices::{
    data_rationalizable, rationality_measures, rationality_measures_symmetric,
    rationality_measures_symmetric_with, rationality_measures_with, AlphaMeasures,
    MeasuresConfig, MeasuresReport,
};
pub use money_pump::{money_pump_index, MoneyPumpStats};
pub use monte_carlo::{percentile_score, PercentileConfig, PercentileScore};
