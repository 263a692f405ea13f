//! # mrt-core: Revealed-Preference Data Model
//!
//! Provides the fundamental data structures for measuring the rationality
//! of consumer choice data.
//!
//! ## Design Philosophy
//!
//! A demand dataset is T observations of (price vector, purchased bundle)
//! over G goods. Its revealed-preference structure is a **directed weighted
//! graph** with one vertex per observation:
//! - **Edge v→u**: bundle u was affordable when v was chosen
//! - **Weight**: the fraction of v's income the switch would have saved
//!   (0 = weak preference, > 0 = strict)
//!
//! The graph lives in immutable CSR arrays ([`RpGraph`]); subgraph
//! restriction happens through [`EdgeMask`] bitmasks rather than rebuilt
//! structures, so the strongly-connected-component, cycle-search, and
//! enumeration passes in `mrt-algo` all share one allocation.
//!
//! ## Quick Start
//!
//! ```rust
//! use mrt_core::{Observations, RpGraph};
//!
//! // Two crossing budget lines: a strict 2-cycle.
//! let obs = Observations::new(
//!     2,
//!     2,
//!     vec![2.0, 1.0, 1.0, 2.0],
//!     vec![2.0, 1.0, 1.0, 2.0],
//! )
//! .unwrap();
//!
//! let graph = RpGraph::build(&obs);
//! assert_eq!(graph.vertex_count(), 2);
//! assert_eq!(graph.edge_count(), 2);
//! ```
//!
//! ## Modules
//!
//! - [`dataset`] - Validated observation matrices and incomes
//! - [`graph`] - CSR revealed-preference graph, symmetric extension,
//!   reverse adjacency, edge bitmasks
//! - [`cancel`] - Cooperative cancellation token
//! - [`error`] - Unified error type
//!
//! ## Integration with mrt-algo
//!
//! The mrt-algo crate consumes these structures to compute the rationality
//! indices (Afriat, Houtman–Maks, Swaps, Varian-α, Inverse-Varian-α,
//! NMCI-α), money-pump statistics, and Monte-Carlo percentile scores.

pub mod cancel;
pub mod dataset;
pub mod error;
pub mod graph;

pub use cancel::CancelToken;
pub use dataset::Observations;
pub use error::{MrtError, MrtResult};
pub use graph::{EdgeMask, ReverseAdjacency, RpGraph, STRICT_TOL};
