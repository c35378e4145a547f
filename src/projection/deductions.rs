//! Vintage accounting of tax deductions
//!
//! The tensor is stored jagged by vintage: `vintages[j][asset][k - j]` holds
//! the deduction in year k on investment placed in service in year j. Only
//! the k >= j triangle is materialized.

use rayon::prelude::*;

use crate::data::{DeductionHistory, Regime};
use crate::depreciation::{DeductionFormula, MethodResolver};
use crate::error::{Anomaly, ModelError, Result};
use crate::timeline::Timeline;
use super::investment::InvestmentMatrix;

/// Largest deduction fraction accepted without recording an anomaly
pub const FRACTION_TOLERANCE: f64 = 1e-9;

/// Disallow part of the remaining deductions on investment placed in
/// service before `year`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Haircut {
    pub fraction: f64,
    pub year: i32,
}

impl Haircut {
    pub fn new(fraction: f64, year: i32) -> Result<Self> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(ModelError::config(format!("haircut {} outside [0, 1]", fraction)));
        }
        Ok(Self { fraction, year })
    }
}

/// Deductions by asset, vintage and deduction year
#[derive(Debug, Clone, PartialEq)]
pub struct DeductionTensor {
    start_year: i32,
    n_years: usize,
    vintages: Vec<Vec<Vec<f64>>>,
}

impl DeductionTensor {
    /// Fill the tensor in parallel across vintages.
    ///
    /// Returns the tensor and every deduction fraction that fell outside
    /// [0, 1 + FRACTION_TOLERANCE].
    pub fn build(
        timeline: &Timeline,
        resolver: &MethodResolver<'_>,
        formula: &DeductionFormula<'_>,
        investment: &InvestmentMatrix,
    ) -> Result<(Self, Vec<Anomaly>)> {
        let n = timeline.len();
        if investment.n_years() < n {
            return Err(ModelError::config(format!(
                "investment matrix covers {} years, timeline has {}",
                investment.n_years(),
                n
            )));
        }

        let per_vintage = (0..n)
            .into_par_iter()
            .map(|j| {
                let specs = resolver.resolve(timeline.year_at(j))?;
                if specs.len() != investment.n_assets() {
                    return Err(ModelError::config(format!(
                        "resolver produced {} specifications for {} assets",
                        specs.len(),
                        investment.n_assets()
                    )));
                }
                let mut anomalies = Vec::new();
                let mut by_asset = Vec::with_capacity(specs.len());
                for (asset, spec) in specs.iter().enumerate() {
                    let amount = investment.get(asset, j);
                    let mut row = Vec::with_capacity(n - j);
                    for k in j..n {
                        let fraction = formula.fraction(j, k, spec)?;
                        if !(0.0..=1.0 + FRACTION_TOLERANCE).contains(&fraction) {
                            anomalies.push(Anomaly {
                                context: "deduction fraction".to_string(),
                                asset: Some(asset),
                                year: timeline.year_at(k),
                                value: fraction,
                            });
                        }
                        row.push(fraction * amount);
                    }
                    by_asset.push(row);
                }
                Ok((by_asset, anomalies))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut vintages = Vec::with_capacity(n);
        let mut anomalies = Vec::new();
        for (by_asset, found) in per_vintage {
            vintages.push(by_asset);
            anomalies.extend(found);
        }

        Ok((
            Self {
                start_year: timeline.history_start,
                n_years: n,
                vintages,
            },
            anomalies,
        ))
    }

    pub fn n_years(&self) -> usize {
        self.n_years
    }

    /// Deduction in `year` on `asset` investment placed in service in `vintage`
    pub fn get(&self, asset: usize, vintage: usize, year: usize) -> f64 {
        if year < vintage {
            return 0.0;
        }
        self.vintages
            .get(vintage)
            .and_then(|v| v.get(asset))
            .and_then(|row| row.get(year - vintage))
            .copied()
            .unwrap_or(0.0)
    }

    /// Scale deductions in and after the haircut year on earlier vintages
    pub fn apply_haircut(&mut self, haircut: &Haircut) {
        let keep = 1.0 - haircut.fraction;
        let cut = (haircut.year - self.start_year).clamp(0, self.n_years as i32) as usize;
        for (j, by_asset) in self.vintages.iter_mut().enumerate().take(cut) {
            for row in by_asset.iter_mut() {
                row.iter_mut().skip(cut - j).for_each(|d| *d *= keep);
            }
        }
    }

    /// Total deduction per year, summed in vintage then asset order
    pub fn annual_totals(&self) -> Vec<f64> {
        let mut totals = vec![0.0; self.n_years];
        for (j, by_asset) in self.vintages.iter().enumerate() {
            for row in by_asset {
                for (offset, d) in row.iter().enumerate() {
                    totals[j + offset] += d;
                }
            }
        }
        totals
    }
}

/// Annual tax deductions over the full timeline, before calibration
#[derive(Debug, Clone, PartialEq)]
pub struct DeductionSchedule {
    pub start_year: i32,
    pub totals: Vec<f64>,
    pub anomalies: Vec<Anomaly>,
}

impl DeductionSchedule {
    pub fn total(&self, year: i32) -> Option<f64> {
        usize::try_from(year - self.start_year)
            .ok()
            .and_then(|i| self.totals.get(i).copied())
    }

    /// Mean ratio of reported to modeled deductions over the calibration window
    pub fn calibration_factor(&self, reported: &DeductionHistory, regime: Regime, timeline: &Timeline) -> Result<f64> {
        let mut ratios = Vec::new();
        for year in timeline.calibration_years() {
            let actual = reported
                .reported(regime, year)
                .ok_or_else(|| ModelError::config(format!("no reported deductions for {}", year)))?;
            let modeled = self
                .total(year)
                .ok_or_else(|| ModelError::config(format!("no modeled deductions for {}", year)))?;
            if modeled == 0.0 {
                return Err(ModelError::NumericAnomaly {
                    context: format!("{} calibration", regime),
                    detail: format!("modeled deductions are zero in {}", year),
                });
            }
            ratios.push(actual / modeled);
        }
        if ratios.is_empty() {
            return Err(ModelError::config("calibration window is empty"));
        }
        Ok(ratios.iter().sum::<f64>() / ratios.len() as f64)
    }
}

/// Combines the resolver, formula and investment into annual deductions
#[derive(Debug, Clone, Copy)]
pub struct DeductionAggregator<'a> {
    timeline: &'a Timeline,
    resolver: MethodResolver<'a>,
    formula: DeductionFormula<'a>,
}

impl<'a> DeductionAggregator<'a> {
    pub fn new(timeline: &'a Timeline, resolver: MethodResolver<'a>, formula: DeductionFormula<'a>) -> Self {
        Self {
            timeline,
            resolver,
            formula,
        }
    }

    /// Build the tensor, apply the haircut and collapse to annual totals
    pub fn tensor(&self, investment: &InvestmentMatrix, haircut: Option<&Haircut>) -> Result<(DeductionTensor, Vec<Anomaly>)> {
        let (mut tensor, anomalies) = DeductionTensor::build(self.timeline, &self.resolver, &self.formula, investment)?;
        if let Some(haircut) = haircut {
            log::debug!(
                "Applying {:.0}% haircut from {}",
                haircut.fraction * 100.0,
                haircut.year
            );
            tensor.apply_haircut(haircut);
        }
        Ok((tensor, anomalies))
    }

    pub fn aggregate(&self, investment: &InvestmentMatrix, haircut: Option<&Haircut>) -> Result<DeductionSchedule> {
        let (tensor, anomalies) = self.tensor(investment, haircut)?;
        Ok(DeductionSchedule {
            start_year: self.timeline.history_start,
            totals: tensor.annual_totals(),
            anomalies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic;
    use crate::projection::InvestmentMatrixBuilder;
    use approx::assert_relative_eq;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    fn corporate_tensor(haircut: Option<&Haircut>) -> DeductionTensor {
        let data = synthetic::data();
        let investment = InvestmentMatrixBuilder::new(&data).build(Regime::Corporate).unwrap();
        let resolver = MethodResolver::new(
            &data.assets,
            &data.baseline_policy,
            &data.bonus_history,
            &data.timeline,
        )
        .unwrap();
        let aggregator = DeductionAggregator::new(&data.timeline, resolver, DeductionFormula::new(&data.growth.pce));
        aggregator.tensor(&investment, haircut).unwrap().0
    }

    #[test]
    fn test_totals_match_tensor_sum() {
        let tensor = corporate_tensor(None);
        let totals = tensor.annual_totals();
        let k = 40;
        let mut expected = 0.0;
        for j in 0..=k {
            for asset in 0..4 {
                expected += tensor.get(asset, j, k);
            }
        }
        assert_relative_eq!(totals[k], expected, max_relative = 1e-12);
        assert_eq!(tensor.get(0, 10, 9), 0.0);
    }

    #[test]
    fn test_land_and_inventories_never_deduct() {
        let tensor = corporate_tensor(None);
        for j in 0..tensor.n_years() {
            for k in j..tensor.n_years() {
                assert_eq!(tensor.get(2, j, k), 0.0);
                assert_eq!(tensor.get(3, j, k), 0.0);
            }
        }
    }

    #[test]
    fn test_parallel_build_is_reproducible() {
        assert_eq!(corporate_tensor(None).annual_totals(), corporate_tensor(None).annual_totals());
    }

    #[test]
    fn test_full_haircut_zeroes_legacy_deductions() {
        let base = corporate_tensor(None);
        let haircut = Haircut::new(1.0, 2018).unwrap();
        let cut = corporate_tensor(Some(&haircut));
        let y = 2018 - 1960;

        for asset in 0..2 {
            for j in 0..base.n_years() {
                for k in j..base.n_years() {
                    if j < y && k >= y {
                        assert_eq!(cut.get(asset, j, k), 0.0);
                    } else {
                        assert_eq!(cut.get(asset, j, k), base.get(asset, j, k));
                    }
                }
            }
        }
    }

    #[test]
    fn test_haircut_fraction_is_validated() {
        assert!(Haircut::new(1.2, 2018).is_err());
        assert!(Haircut::new(-0.1, 2018).is_err());
    }

    #[test]
    fn test_calibration_factor_averages_ratios() {
        let data = synthetic::data();
        let t = data.timeline;
        let schedule = DeductionSchedule {
            start_year: t.history_start,
            totals: (0..t.len()).map(|i| if i % 2 == 0 { 10.0 } else { 20.0 }).collect(),
            anomalies: Vec::new(),
        };
        // 2000..=2013 alternates 30/10 and 30/20, seven of each
        let factor = schedule
            .calibration_factor(&data.reported_deductions, Regime::Corporate, &t)
            .unwrap();
        assert_relative_eq!(factor, (3.0 + 1.5) / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_modeled_deduction_is_anomaly() {
        let data = synthetic::data();
        let schedule = DeductionSchedule {
            start_year: data.timeline.history_start,
            totals: vec![0.0; data.timeline.len()],
            anomalies: Vec::new(),
        };
        let result = schedule.calibration_factor(&data.reported_deductions, Regime::Noncorporate, &data.timeline);
        assert!(matches!(result, Err(ModelError::NumericAnomaly { .. })));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(16))]

        #[test]
        fn prop_haircut_scales_only_legacy_entries(fraction in 0.0f64..=1.0, year in 1990i32..2030) {
            let base = corporate_tensor(None);
            let haircut = Haircut::new(fraction, year).unwrap();
            let mut cut = base.clone();
            cut.apply_haircut(&haircut);
            let y = (year - 1960) as usize;

            for j in (0..base.n_years()).step_by(7) {
                for k in j..base.n_years() {
                    let expected = if j < y && k >= y {
                        base.get(0, j, k) * (1.0 - fraction)
                    } else {
                        base.get(0, j, k)
                    };
                    prop_assert_eq!(cut.get(0, j, k), expected);
                }
            }
            prop_assert!(cut.annual_totals().iter().zip(base.annual_totals()).all(|(c, b)| *c <= b + 1e-9));
        }
    }
}
