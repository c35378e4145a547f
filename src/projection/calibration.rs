//! Calibration factors computed once under the baseline policy
//!
//! The factor for each regime is the mean ratio of reported to modeled
//! deductions over the calibration window. Every scenario scales its
//! aggregates by the same factors and by the per-year rescaling vectors.

use serde::Serialize;

use crate::data::{ModelData, Regime};
use crate::depreciation::{DeductionFormula, MethodResolver};
use crate::error::{ModelError, Result};
use super::deductions::DeductionAggregator;
use super::investment::InvestmentMatrix;

/// Immutable calibration shared by every scenario run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationContext {
    pub corporate: f64,
    pub noncorporate: f64,
    rescale_corp: Vec<f64>,
    rescale_noncorp: Vec<f64>,
}

impl CalibrationContext {
    /// Known factors with identity rescaling over `window_len` years
    pub fn new(corporate: f64, noncorporate: f64, window_len: usize) -> Self {
        Self {
            corporate,
            noncorporate,
            rescale_corp: vec![1.0; window_len],
            rescale_noncorp: vec![1.0; window_len],
        }
    }

    /// Solve both factors from the baseline policy and the regime investment matrices
    pub fn calibrate(
        data: &ModelData,
        corporate_investment: &InvestmentMatrix,
        noncorporate_investment: &InvestmentMatrix,
    ) -> Result<Self> {
        let t = &data.timeline;
        let resolver = MethodResolver::new(&data.assets, &data.baseline_policy, &data.bonus_history, t)?;
        let aggregator = DeductionAggregator::new(t, resolver, DeductionFormula::new(&data.growth.pce));

        let factor = |regime: Regime, investment: &InvestmentMatrix| -> Result<f64> {
            let schedule = aggregator.aggregate(investment, None)?;
            schedule.calibration_factor(&data.reported_deductions, regime, t)
        };
        let corporate = factor(Regime::Corporate, corporate_investment)?;
        let noncorporate = factor(Regime::Noncorporate, noncorporate_investment)?;

        log::info!(
            "Calibration complete: corporate factor {:.4}, noncorporate factor {:.4}",
            corporate,
            noncorporate
        );
        Ok(Self::new(corporate, noncorporate, t.window_len()))
    }

    /// Replace the identity rescaling vectors
    pub fn with_rescaling(mut self, corporate: Vec<f64>, noncorporate: Vec<f64>) -> Result<Self> {
        let window_len = self.rescale_corp.len();
        for (regime, values) in [(Regime::Corporate, &corporate), (Regime::Noncorporate, &noncorporate)] {
            if values.len() != window_len {
                return Err(ModelError::config(format!(
                    "{} rescaling has {} values, window has {} years",
                    regime,
                    values.len(),
                    window_len
                )));
            }
        }
        self.rescale_corp = corporate;
        self.rescale_noncorp = noncorporate;
        Ok(self)
    }

    pub fn adj_factor(&self, regime: Regime) -> f64 {
        match regime {
            Regime::Corporate => self.corporate,
            Regime::Noncorporate => self.noncorporate,
        }
    }

    pub fn rescale(&self, regime: Regime) -> &[f64] {
        match regime {
            Regime::Corporate => &self.rescale_corp,
            Regime::Noncorporate => &self.rescale_noncorp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic;
    use crate::projection::InvestmentMatrixBuilder;

    #[test]
    fn test_calibrate_synthetic_data() {
        let data = synthetic::data();
        let builder = InvestmentMatrixBuilder::new(&data);
        let corp = builder.build(Regime::Corporate).unwrap();
        let noncorp = builder.build(Regime::Noncorporate).unwrap();
        let context = CalibrationContext::calibrate(&data, &corp, &noncorp).unwrap();

        assert!(context.corporate.is_finite() && context.corporate > 0.0);
        assert!(context.noncorporate.is_finite() && context.noncorporate > 0.0);
        assert_eq!(context.rescale(Regime::Corporate), vec![1.0; 14].as_slice());
    }

    #[test]
    fn test_with_rescaling_checks_length() {
        let context = CalibrationContext::new(1.0, 1.0, 14);
        assert!(context.clone().with_rescaling(vec![1.1; 14], vec![0.9; 14]).is_ok());
        assert!(matches!(
            context.with_rescaling(vec![1.1; 13], vec![0.9; 14]),
            Err(ModelError::Configuration(_))
        ));
    }
}
