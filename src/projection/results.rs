//! Capital-stock output structures

use serde::{Deserialize, Serialize};

use crate::data::Regime;
use crate::error::Anomaly;

/// Aggregates for one year of the policy window, after calibration and rescaling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapitalSummaryRow {
    pub year: i32,

    /// Total capital stock
    #[serde(rename = "Kstock")]
    pub kstock: f64,

    /// Stock excluding land and inventories
    #[serde(rename = "K_fixed")]
    pub fixed_k: f64,

    #[serde(rename = "Investment")]
    pub investment: f64,

    /// Investment excluding land
    #[serde(rename = "I_fixed")]
    pub fixed_inv: f64,

    #[serde(rename = "trueDep")]
    pub true_dep: f64,

    #[serde(rename = "taxDep")]
    pub tax_dep: f64,
}

/// Capital-stock projection for one regime
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapitalPath {
    pub regime: Regime,

    /// One row per year of the policy window
    pub summary: Vec<CapitalSummaryRow>,

    /// First year of the per-asset stock table
    pub stock_start_year: i32,

    /// Unscaled stock, [asset][year]; one year longer than the summary
    pub stock: Vec<Vec<f64>>,

    /// Negative stocks found during the roll
    pub anomalies: Vec<Anomaly>,
}

impl CapitalPath {
    /// Summary row for a calendar year
    pub fn row(&self, year: i32) -> Option<&CapitalSummaryRow> {
        self.summary.iter().find(|r| r.year == year)
    }

    /// Calendar years covered by the per-asset stock table
    pub fn stock_years(&self) -> impl Iterator<Item = i32> + '_ {
        let n = self.stock.first().map_or(0, |r| r.len());
        (0..n).map(move |i| self.stock_start_year + i as i32)
    }

    pub fn final_stock(&self) -> f64 {
        self.summary.last().map(|r| r.kstock).unwrap_or(0.0)
    }
}
