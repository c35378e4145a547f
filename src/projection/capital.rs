//! Capital-stock roll by asset
//!
//! The stock is anchored to the baseline at the pivot year, filled backward
//! to the start of the policy window by inverting the roll, then rolled
//! forward to one year past the window end.

use crate::data::{ModelData, Regime};
use crate::error::{Anomaly, ModelError, Result};
use super::calibration::CalibrationContext;
use super::deductions::DeductionSchedule;
use super::investment::InvestmentMatrix;
use super::results::{CapitalPath, CapitalSummaryRow};
use super::ProjectionConfig;

/// Stock next year from this year's stock and investment
pub fn roll_forward(stock: f64, investment: f64, delta: f64, price: f64, next_price: f64) -> f64 {
    (stock + investment - stock * delta) * next_price / price
}

/// Inverse of [`roll_forward`]: this year's stock from next year's
pub fn roll_back(next_stock: f64, investment: f64, delta: f64, price: f64, next_price: f64) -> f64 {
    (next_stock * price / next_price - investment) / (1.0 - delta)
}

/// Rolls the per-asset capital stock over the policy window
#[derive(Debug, Clone, Copy)]
pub struct CapitalStockProjector<'a> {
    data: &'a ModelData,
    config: &'a ProjectionConfig,
}

impl<'a> CapitalStockProjector<'a> {
    pub fn new(data: &'a ModelData, config: &'a ProjectionConfig) -> Self {
        Self { data, config }
    }

    pub fn project(
        &self,
        investment: &InvestmentMatrix,
        deductions: &DeductionSchedule,
        regime: Regime,
        calibration: &CalibrationContext,
    ) -> Result<CapitalPath> {
        let data = self.data;
        let t = &data.timeline;
        let pce = &data.growth.pce;
        let baseline = data.baseline_capital.for_regime(regime);
        let rescale = calibration.rescale(regime);
        let adj = calibration.adj_factor(regime);

        let first = t
            .index_of(t.start_year)
            .ok_or_else(|| ModelError::config("policy window starts outside the timeline"))?;
        let window = t.window_len();
        let backfill = t.backfill_years();
        if rescale.len() != window {
            return Err(ModelError::config(format!(
                "{} rescaling has {} values, window has {} years",
                regime,
                rescale.len(),
                window
            )));
        }
        if investment.n_assets() != data.assets.len() {
            return Err(ModelError::config(format!(
                "investment matrix has {} assets, asset table has {}",
                investment.n_assets(),
                data.assets.len()
            )));
        }
        if investment.n_years() < t.len() {
            return Err(ModelError::config(format!(
                "investment matrix covers {} years, timeline has {}",
                investment.n_years(),
                t.len()
            )));
        }

        // stock[i][w] is the stock of asset i at the start of window year w
        let mut stock = vec![vec![0.0; window + 1]; data.assets.len()];
        let mut anomalies = Vec::new();

        for asset in &data.assets {
            let i = asset.index;
            let delta = asset.delta;
            let row = &mut stock[i];
            row[backfill] = baseline[i];

            for w in (0..backfill).rev() {
                if delta >= 1.0 {
                    return Err(ModelError::domain(format!(
                        "asset {} has economic rate {}; stock cannot be filled backward",
                        asset.code, delta
                    )));
                }
                let j = first + w;
                row[w] = roll_back(row[w + 1], investment.get(i, j), delta, pce[j], pce[j + 1]);
            }
            for w in backfill..window {
                let j = first + w;
                row[w + 1] = roll_forward(row[w], investment.get(i, j), delta, pce[j], pce[j + 1]);
            }

            for (w, &value) in row.iter().enumerate() {
                if value < 0.0 {
                    anomalies.push(Anomaly {
                        context: format!("{} capital stock", regime),
                        asset: Some(i),
                        year: t.start_year + w as i32,
                        value,
                    });
                }
            }
        }

        super::report_anomalies(&anomalies, self.config)?;

        let mut summary = Vec::with_capacity(window);
        for w in 0..window {
            let j = first + w;
            let year = t.year_at(j);
            let scale = adj * rescale[w];
            let mut row = CapitalSummaryRow {
                year,
                kstock: 0.0,
                fixed_k: 0.0,
                investment: 0.0,
                fixed_inv: 0.0,
                true_dep: 0.0,
                tax_dep: 0.0,
            };
            for asset in &data.assets {
                let k = stock[asset.index][w];
                let inv = investment.get(asset.index, j);
                row.kstock += k;
                row.investment += inv;
                row.true_dep += k * asset.delta;
                if asset.is_fixed() {
                    row.fixed_k += k;
                }
                if !asset.is_land {
                    row.fixed_inv += inv;
                }
            }
            row.tax_dep = deductions
                .total(year)
                .ok_or_else(|| ModelError::config(format!("no tax deductions for {}", year)))?;

            row.kstock *= scale;
            row.fixed_k *= scale;
            row.investment *= scale;
            row.fixed_inv *= scale;
            row.true_dep *= scale;
            row.tax_dep *= scale;
            summary.push(row);
        }

        log::debug!(
            "{} capital stock {:.1} in {}, {:.1} in {}",
            regime,
            summary.first().map_or(0.0, |r| r.kstock),
            t.start_year,
            summary.last().map_or(0.0, |r| r.kstock),
            t.end_year
        );

        Ok(CapitalPath {
            regime,
            summary,
            stock_start_year: t.start_year,
            stock,
            anomalies,
        })
    }
}
