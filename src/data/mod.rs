//! Asset table and economic data consumed by the engine
//!
//! Everything here is read-only for the duration of a run.

mod assets;
mod series;
pub mod loader;

pub use assets::{AssetCategory, AssetTable};
pub use series::{
    BaselineCapital, BonusHistory, DeductionHistory, GrowthFactors, InvestmentHistory, ReportedDeductions,
};

#[cfg(test)]
pub(crate) use assets::fixtures;

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::{ModelError, Result};
use crate::policy::PolicyParams;
use crate::timeline::Timeline;

/// Business sector the model is run for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Regime {
    Corporate,
    Noncorporate,
}

impl Regime {
    pub const ALL: [Regime; 2] = [Regime::Corporate, Regime::Noncorporate];
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::Corporate => f.write_str("corporate"),
            Regime::Noncorporate => f.write_str("noncorporate"),
        }
    }
}

/// Container for all inputs of a run
#[derive(Debug, Clone)]
pub struct ModelData {
    pub timeline: Timeline,
    pub assets: AssetTable,
    pub investment: InvestmentHistory,
    pub growth: GrowthFactors,
    pub baseline_capital: BaselineCapital,
    pub bonus_history: BonusHistory,
    pub reported_deductions: DeductionHistory,
    /// Current-law policy the calibration factors are computed under
    pub baseline_policy: PolicyParams,
}

impl ModelData {
    /// Load all data from CSV files in a specific directory
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let timeline = Timeline::default();
        let (assets, baseline_capital) = loader::load_assets(path)?;
        let data = Self {
            timeline,
            assets,
            investment: loader::load_investment(path, timeline.history_start)?,
            growth: loader::load_growth_factors(path, timeline.history_start)?,
            baseline_capital,
            bonus_history: loader::load_bonus_history(path)?,
            reported_deductions: loader::load_deduction_history(path)?,
            baseline_policy: crate::policy::loader::load_policy(path, &timeline)?,
        };
        data.validate()?;
        log::info!(
            "Loaded {} asset categories from {}",
            data.assets.len(),
            path.display()
        );
        Ok(data)
    }

    /// Check every series covers the years the engine will read
    pub fn validate(&self) -> Result<()> {
        let t = &self.timeline;
        t.validate()?;

        let n_assets = self.assets.len();
        if self.investment.by_asset.len() != n_assets {
            return Err(ModelError::config(format!(
                "investment history has {} assets, asset table has {}",
                self.investment.by_asset.len(),
                n_assets
            )));
        }
        if let Some((i, row)) = self
            .investment
            .by_asset
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() < t.history_len())
        {
            return Err(ModelError::config(format!(
                "investment history for asset {} has {} years, need {}",
                i,
                row.len(),
                t.history_len()
            )));
        }
        if self.investment.corporate_share.len() < t.history_len() {
            return Err(ModelError::config(format!(
                "corporate shares cover {} years, need {}",
                self.investment.corporate_share.len(),
                t.history_len()
            )));
        }
        if self.growth.ngdp.len() < t.len() {
            return Err(ModelError::config(format!(
                "nominal GDP index covers {} years, need {}",
                self.growth.ngdp.len(),
                t.len()
            )));
        }
        // Economic depreciation reads the deflator one year past the horizon
        if self.growth.pce.len() < t.len() + 1 {
            return Err(ModelError::config(format!(
                "price deflator covers {} years, need {}",
                self.growth.pce.len(),
                t.len() + 1
            )));
        }
        if self.growth.pce.iter().any(|p| *p <= 0.0) || self.growth.ngdp.iter().any(|g| *g <= 0.0) {
            return Err(ModelError::config("growth indices must be positive"));
        }
        for regime in Regime::ALL {
            if self.baseline_capital.for_regime(regime).len() != n_assets {
                return Err(ModelError::config(format!(
                    "{} baseline capital has {} assets, asset table has {}",
                    regime,
                    self.baseline_capital.for_regime(regime).len(),
                    n_assets
                )));
            }
        }
        for year in t.calibration_years() {
            if !self.reported_deductions.rows.iter().any(|r| r.year == year) {
                return Err(ModelError::config(format!("no reported deductions for {}", year)));
            }
        }
        self.baseline_policy.validate(t)?;
        Ok(())
    }
}
