//! Consumer choice observations: prices, bundles, and eager validation.
//!
//! An [`Observations`] value holds T periods of a demand dataset over G
//! goods: a strictly positive price matrix P and a non-negative quantity
//! matrix Q, both G×T in column-major storage (column t = period t).
//! Validation happens once, at construction; every downstream algorithm can
//! then assume finite values, positive prices, and positive per-period
//! income w_t = p_t·q_t.

use serde::{Deserialize, Serialize};

use crate::{MrtError, MrtResult};

/// A validated demand dataset: G goods observed over T periods.
///
/// Prices and quantities are stored column-major, so the slice for period t
/// is `data[t * goods .. (t + 1) * goods]`. Incomes are precomputed at
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observations {
    goods: usize,
    periods: usize,
    prices: Vec<f64>,
    quantities: Vec<f64>,
    incomes: Vec<f64>,
}

impl Observations {
    /// Build a dataset from column-major G×T price and quantity matrices.
    ///
    /// Validates shapes, finiteness, strict positivity of prices,
    /// non-negativity of quantities, and positive income at every period.
    pub fn new(
        goods: usize,
        periods: usize,
        prices: Vec<f64>,
        quantities: Vec<f64>,
    ) -> MrtResult<Self> {
        if goods == 0 || periods == 0 {
            return Err(MrtError::InvalidInput(format!(
                "need at least one good and one period, got G={goods}, T={periods}"
            )));
        }
        let expected = goods * periods;
        if prices.len() != expected {
            return Err(MrtError::InvalidInput(format!(
                "price matrix has {} entries, expected {} (G={goods} × T={periods})",
                prices.len(),
                expected
            )));
        }
        if quantities.len() != expected {
            return Err(MrtError::InvalidInput(format!(
                "quantity matrix has {} entries, expected {} (G={goods} × T={periods})",
                quantities.len(),
                expected
            )));
        }
        for (i, &p) in prices.iter().enumerate() {
            if !p.is_finite() || p <= 0.0 {
                return Err(MrtError::InvalidInput(format!(
                    "price entry {i} is {p}; prices must be finite and strictly positive"
                )));
            }
        }
        for (i, &q) in quantities.iter().enumerate() {
            if !q.is_finite() || q < 0.0 {
                return Err(MrtError::InvalidInput(format!(
                    "quantity entry {i} is {q}; quantities must be finite and non-negative"
                )));
            }
        }

        let mut incomes = Vec::with_capacity(periods);
        for t in 0..periods {
            let col = t * goods..(t + 1) * goods;
            let w: f64 = prices[col.clone()]
                .iter()
                .zip(&quantities[col])
                .map(|(p, q)| p * q)
                .sum();
            if w <= 0.0 {
                return Err(MrtError::InvalidInput(format!(
                    "period {t} has zero expenditure; every period needs p_t·q_t > 0"
                )));
            }
            incomes.push(w);
        }

        Ok(Self {
            goods,
            periods,
            prices,
            quantities,
            incomes,
        })
    }

    /// Number of goods G.
    #[inline]
    pub fn goods(&self) -> usize {
        self.goods
    }

    /// Number of periods T.
    #[inline]
    pub fn periods(&self) -> usize {
        self.periods
    }

    /// Price vector of period t.
    #[inline]
    pub fn price(&self, t: usize) -> &[f64] {
        &self.prices[t * self.goods..(t + 1) * self.goods]
    }

    /// Bundle purchased in period t.
    #[inline]
    pub fn quantity(&self, t: usize) -> &[f64] {
        &self.quantities[t * self.goods..(t + 1) * self.goods]
    }

    /// Income (expenditure on the chosen bundle) at period t.
    #[inline]
    pub fn income(&self, t: usize) -> f64 {
        self.incomes[t]
    }

    /// Cost of period u's bundle at period v's prices, p_v·q_u.
    pub fn expenditure(&self, v: usize, u: usize) -> f64 {
        self.price(v)
            .iter()
            .zip(self.quantity(u))
            .map(|(p, q)| p * q)
            .sum()
    }

    /// Same prices, different bundles. Used by the Monte-Carlo driver to
    /// evaluate synthetic datasets on the observed budget lines.
    pub fn with_quantities(&self, quantities: Vec<f64>) -> MrtResult<Self> {
        Self::new(self.goods, self.periods, self.prices.clone(), quantities)
    }
}
