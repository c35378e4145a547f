//! Investment by asset over the full timeline
//!
//! Historical years split total investment by regime share. Forecast years
//! grow the last historical year with nominal GDP. Every non-land row is then
//! scaled so the pivot year matches the investment implied by the baseline
//! capital stock.

use crate::data::{ModelData, Regime};
use crate::error::{ModelError, Result};

/// Dense [asset][timeline year] investment amounts
#[derive(Debug, Clone, PartialEq)]
pub struct InvestmentMatrix {
    start_year: i32,
    rows: Vec<Vec<f64>>,
}

impl InvestmentMatrix {
    /// Wrap prebuilt rows; every row must cover the same years
    pub fn from_rows(start_year: i32, rows: Vec<Vec<f64>>) -> Result<Self> {
        if let Some(first) = rows.first() {
            if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != first.len()) {
                return Err(ModelError::config(format!(
                    "investment row {} has {} years, expected {}",
                    i,
                    row.len(),
                    first.len()
                )));
            }
        }
        if rows.iter().flatten().any(|v| !v.is_finite()) {
            return Err(ModelError::config("investment values must be finite"));
        }
        Ok(Self { start_year, rows })
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    pub fn n_assets(&self) -> usize {
        self.rows.len()
    }

    pub fn n_years(&self) -> usize {
        self.rows.first().map_or(0, |r| r.len())
    }

    pub fn row(&self, asset: usize) -> &[f64] {
        &self.rows[asset]
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Investment in `asset` at timeline index `year_index`
    pub fn get(&self, asset: usize, year_index: usize) -> f64 {
        self.rows[asset][year_index]
    }
}

/// Builds a regime's investment matrix from the historical series
#[derive(Debug, Clone, Copy)]
pub struct InvestmentMatrixBuilder<'a> {
    data: &'a ModelData,
}

impl<'a> InvestmentMatrixBuilder<'a> {
    pub fn new(data: &'a ModelData) -> Self {
        Self { data }
    }

    pub fn build(&self, regime: Regime) -> Result<InvestmentMatrix> {
        let data = self.data;
        data.validate()?;
        let t = &data.timeline;
        let n = t.len();
        let n_hist = t.history_len();
        let last = n_hist - 1;
        let pivot = t
            .index_of(t.pivot_year)
            .ok_or_else(|| ModelError::config(format!("pivot year {} outside timeline", t.pivot_year)))?;
        let ngdp = &data.growth.ngdp;
        let baseline = data.baseline_capital.for_regime(regime);

        let mut rows = Vec::with_capacity(data.assets.len());
        for asset in &data.assets {
            let history = &data.investment.by_asset[asset.index];
            let mut row = Vec::with_capacity(n);
            for (j, total) in history.iter().take(n_hist).enumerate() {
                row.push(total * data.investment.share(regime, j)?);
            }
            let last_value = row[last];
            row.extend((n_hist..n).map(|j| last_value * ngdp[j] / ngdp[last]));

            if !asset.is_land {
                let target = baseline[asset.index] * (ngdp[pivot] / ngdp[last] - 1.0 + asset.delta);
                let built = row[pivot];
                if built != 0.0 {
                    let scale = target / built;
                    row.iter_mut().for_each(|v| *v *= scale);
                    row[pivot] = target;
                } else if target != 0.0 {
                    return Err(ModelError::NumericAnomaly {
                        context: format!("{} investment rescaling", regime),
                        detail: format!(
                            "asset {} has no investment in {} but a baseline target of {}",
                            asset.index, t.pivot_year, target
                        ),
                    });
                }
            }
            rows.push(row);
        }

        log::debug!(
            "Built {} investment matrix: {} assets x {} years",
            regime,
            rows.len(),
            n
        );
        InvestmentMatrix::from_rows(t.history_start, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic;
    use approx::assert_relative_eq;

    #[test]
    fn test_pivot_matches_baseline_target() {
        let data = synthetic::data();
        let t = data.timeline;
        let pivot = t.index_of(t.pivot_year).unwrap();
        let last = t.history_len() - 1;
        let g = data.growth.ngdp[pivot] / data.growth.ngdp[last];

        for regime in Regime::ALL {
            let matrix = InvestmentMatrixBuilder::new(&data).build(regime).unwrap();
            for asset in data.assets.iter().filter(|a| !a.is_land) {
                let target = data.baseline_capital.for_regime(regime)[asset.index] * (g - 1.0 + asset.delta);
                assert_eq!(matrix.get(asset.index, pivot), target);
            }
        }
    }

    #[test]
    fn test_land_is_not_rescaled() {
        let mut data = synthetic::data();
        data.investment.by_asset[3] = vec![2.0; data.timeline.history_len()];
        let matrix = InvestmentMatrixBuilder::new(&data).build(Regime::Corporate).unwrap();
        assert_relative_eq!(matrix.get(3, 0), 2.0 * 0.7, epsilon = 1e-12);
        assert_relative_eq!(matrix.get(3, 10), 2.0 * 0.7, epsilon = 1e-12);
    }

    #[test]
    fn test_forecast_grows_with_nominal_gdp() {
        let data = synthetic::data();
        let matrix = InvestmentMatrixBuilder::new(&data).build(Regime::Noncorporate).unwrap();
        let pivot = data.timeline.index_of(2017).unwrap();
        for j in pivot..data.timeline.len() - 1 {
            assert_relative_eq!(matrix.get(0, j + 1) / matrix.get(0, j), 1.04, epsilon = 1e-12);
        }
        assert_eq!(matrix.n_years(), 75);
    }

    #[test]
    fn test_history_keeps_regime_shares() {
        let data = synthetic::data();
        let corp = InvestmentMatrixBuilder::new(&data).build(Regime::Corporate).unwrap();
        // Rescaling is a single factor per row, so year-over-year history growth survives
        assert_relative_eq!(corp.get(1, 21) / corp.get(1, 20), 1.03, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_investment_with_positive_target_is_anomaly() {
        let mut data = synthetic::data();
        data.investment.by_asset[0] = vec![0.0; data.timeline.history_len()];
        let result = InvestmentMatrixBuilder::new(&data).build(Regime::Corporate);
        assert!(matches!(result, Err(ModelError::NumericAnomaly { .. })));
    }

    #[test]
    fn test_missing_investment_history_is_configuration_error() {
        let mut data = synthetic::data();
        data.investment.by_asset.pop();
        let result = InvestmentMatrixBuilder::new(&data).build(Regime::Corporate);
        assert!(matches!(result, Err(ModelError::Configuration(_))));

        let mut data = synthetic::data();
        data.growth.ngdp.truncate(60);
        let result = InvestmentMatrixBuilder::new(&data).build(Regime::Noncorporate);
        assert!(matches!(result, Err(ModelError::Configuration(_))));
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        assert!(InvestmentMatrix::from_rows(1960, vec![vec![1.0, 2.0], vec![1.0]]).is_err());
    }
}
