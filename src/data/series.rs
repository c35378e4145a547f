//! Historical and forecast series feeding the projection

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::depreciation::ClassLife;
use crate::error::{ModelError, Result};
use super::Regime;

/// Investment by asset over the historical years, plus the corporate share
#[derive(Debug, Clone, Default)]
pub struct InvestmentHistory {
    /// Total investment, [asset][year since history start]
    pub by_asset: Vec<Vec<f64>>,

    /// Corporate share of investment for each historical year
    pub corporate_share: Vec<f64>,
}

impl InvestmentHistory {
    /// Fraction of a year's investment belonging to the regime
    pub fn share(&self, regime: Regime, year_index: usize) -> Result<f64> {
        let c_share = self.corporate_share.get(year_index).copied().ok_or_else(|| {
            ModelError::config(format!("no corporate share for history year index {}", year_index))
        })?;
        Ok(match regime {
            Regime::Corporate => c_share,
            Regime::Noncorporate => 1.0 - c_share,
        })
    }
}

/// Macro growth indices indexed from the first historical year
#[derive(Debug, Clone, Default)]
pub struct GrowthFactors {
    /// Nominal GDP index
    pub ngdp: Vec<f64>,

    /// Price deflator (PCE); one year longer than the timeline
    pub pce: Vec<f64>,
}

/// Baseline capital stock by asset at the pivot year
#[derive(Debug, Clone, Default)]
pub struct BaselineCapital {
    pub corporate: Vec<f64>,
    pub noncorporate: Vec<f64>,
}

impl BaselineCapital {
    pub fn for_regime(&self, regime: Regime) -> &[f64] {
        match regime {
            Regime::Corporate => &self.corporate,
            Regime::Noncorporate => &self.noncorporate,
        }
    }
}

/// Bonus depreciation rates actually in force before the policy window
#[derive(Debug, Clone, Default)]
pub struct BonusHistory {
    pub start_year: i32,
    pub rates: BTreeMap<ClassLife, Vec<f64>>,
}

impl BonusHistory {
    /// Bonus rate for a bucket in a historical year
    pub fn rate(&self, class_life: ClassLife, year: i32) -> Result<f64> {
        if !class_life.is_depreciable() {
            return Ok(0.0);
        }
        let series = self.rates.get(&class_life).ok_or_else(|| {
            ModelError::config(format!("bonus history has no column for {}", class_life.param_stem()))
        })?;
        usize::try_from(year - self.start_year)
            .ok()
            .and_then(|i| series.get(i).copied())
            .ok_or_else(|| {
                ModelError::config(format!(
                    "bonus history for {} does not cover {}",
                    class_life.param_stem(),
                    year
                ))
            })
    }
}

/// Depreciation deductions reported on tax returns for one year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportedDeductions {
    pub year: i32,
    #[serde(rename = "dep_Ccorp")]
    pub c_corp: f64,
    #[serde(rename = "dep_Scorp")]
    pub s_corp: f64,
    #[serde(rename = "dep_sp")]
    pub sole_prop: f64,
    #[serde(rename = "dep_partner")]
    pub partnership: f64,
}

impl ReportedDeductions {
    /// Corporate total is C corporations; pass-throughs make up the rest
    pub fn for_regime(&self, regime: Regime) -> f64 {
        match regime {
            Regime::Corporate => self.c_corp,
            Regime::Noncorporate => self.s_corp + self.sole_prop + self.partnership,
        }
    }
}

/// Reported deductions covering the calibration window
#[derive(Debug, Clone, Default)]
pub struct DeductionHistory {
    pub rows: Vec<ReportedDeductions>,
}

impl DeductionHistory {
    pub fn reported(&self, regime: Regime, year: i32) -> Option<f64> {
        self.rows.iter().find(|r| r.year == year).map(|r| r.for_regime(regime))
    }
}
