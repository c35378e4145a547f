//! Scenario runner for batch policy projections
//!
//! Validates the data, builds both investment matrices and solves both
//! calibration factors once, then runs any number of policy scenarios
//! against that fixed context.

use std::path::Path;

use rayon::prelude::*;
use serde::Serialize;

use crate::data::{ModelData, Regime};
use crate::depreciation::{DeductionFormula, MethodResolver};
use crate::error::Result;
use crate::policy::{PolicyParams, Reform};
use crate::projection::{
    report_anomalies, CalibrationContext, CapitalPath, CapitalStockProjector, DeductionAggregator,
    DeductionSchedule, Haircut, InvestmentMatrix, InvestmentMatrixBuilder, ProjectionConfig,
};

/// One policy to project
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub policy: PolicyParams,
    pub haircut: Option<Haircut>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, policy: PolicyParams) -> Self {
        Self {
            name: name.into(),
            policy,
            haircut: None,
        }
    }

    pub fn with_haircut(mut self, haircut: Haircut) -> Self {
        self.haircut = Some(haircut);
        self
    }
}

/// Projection of one scenario for both regimes
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub name: String,
    pub corporate: CapitalPath,
    pub noncorporate: CapitalPath,
    /// Annual deductions over the full timeline, before calibration
    #[serde(skip)]
    pub corporate_deductions: DeductionSchedule,
    #[serde(skip)]
    pub noncorporate_deductions: DeductionSchedule,
}

impl ScenarioResult {
    pub fn path(&self, regime: Regime) -> &CapitalPath {
        match regime {
            Regime::Corporate => &self.corporate,
            Regime::Noncorporate => &self.noncorporate,
        }
    }

    pub fn deductions(&self, regime: Regime) -> &DeductionSchedule {
        match regime {
            Regime::Corporate => &self.corporate_deductions,
            Regime::Noncorporate => &self.noncorporate_deductions,
        }
    }
}

/// Pre-initialized runner for policy scenarios
///
/// # Example
/// ```ignore
/// let runner = ScenarioRunner::from_csv_path(Path::new("data"), ProjectionConfig::default())?;
/// let baseline = runner.run(&runner.baseline())?;
///
/// let mut reform = runner.data().baseline_policy.clone();
/// reform.apply_reform(&changes)?;
/// let result = runner.run(&Scenario::new("reform", reform))?;
/// ```
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    data: ModelData,
    config: ProjectionConfig,
    corporate_investment: InvestmentMatrix,
    noncorporate_investment: InvestmentMatrix,
    calibration: CalibrationContext,
}

impl ScenarioRunner {
    /// Validate the data and compute the shared calibration
    pub fn new(data: ModelData, config: ProjectionConfig) -> Result<Self> {
        data.validate()?;
        let builder = InvestmentMatrixBuilder::new(&data);
        let corporate_investment = builder.build(Regime::Corporate)?;
        let noncorporate_investment = builder.build(Regime::Noncorporate)?;
        let calibration = CalibrationContext::calibrate(&data, &corporate_investment, &noncorporate_investment)?;

        Ok(Self {
            data,
            config,
            corporate_investment,
            noncorporate_investment,
            calibration,
        })
    }

    /// Load data from a directory and initialize
    pub fn from_csv_path(path: &Path, config: ProjectionConfig) -> Result<Self> {
        Self::new(ModelData::from_csv_path(path)?, config)
    }

    /// Replace the identity rescaling vectors
    pub fn with_rescaling(mut self, corporate: Vec<f64>, noncorporate: Vec<f64>) -> Result<Self> {
        self.calibration = self.calibration.with_rescaling(corporate, noncorporate)?;
        Ok(self)
    }

    pub fn data(&self) -> &ModelData {
        &self.data
    }

    pub fn calibration(&self) -> &CalibrationContext {
        &self.calibration
    }

    pub fn investment(&self, regime: Regime) -> &InvestmentMatrix {
        match regime {
            Regime::Corporate => &self.corporate_investment,
            Regime::Noncorporate => &self.noncorporate_investment,
        }
    }

    /// Current-law scenario
    pub fn baseline(&self) -> Scenario {
        Scenario::new("baseline", self.data.baseline_policy.clone())
    }

    /// Baseline policy with a reform applied
    pub fn reform(&self, name: impl Into<String>, reform: &Reform) -> Result<Scenario> {
        let mut policy = self.data.baseline_policy.clone();
        policy.apply_reform(reform)?;
        Ok(Scenario::new(name, policy))
    }

    /// Project one scenario for both regimes
    pub fn run(&self, scenario: &Scenario) -> Result<ScenarioResult> {
        let data = &self.data;
        let t = &data.timeline;
        let resolver = MethodResolver::new(&data.assets, &scenario.policy, &data.bonus_history, t)?;
        let aggregator = DeductionAggregator::new(t, resolver, DeductionFormula::new(&data.growth.pce));
        let projector = CapitalStockProjector::new(data, &self.config);

        let run_regime = |regime: Regime| -> Result<(CapitalPath, DeductionSchedule)> {
            let investment = self.investment(regime);
            let deductions = aggregator.aggregate(investment, scenario.haircut.as_ref())?;
            report_anomalies(&deductions.anomalies, &self.config)?;
            let path = projector.project(investment, &deductions, regime, &self.calibration)?;
            Ok((path, deductions))
        };
        let (corporate, corporate_deductions) = run_regime(Regime::Corporate)?;
        let (noncorporate, noncorporate_deductions) = run_regime(Regime::Noncorporate)?;

        log::info!(
            "Scenario '{}': corporate stock {:.1}, noncorporate stock {:.1} in {}",
            scenario.name,
            corporate.final_stock(),
            noncorporate.final_stock(),
            t.end_year
        );

        Ok(ScenarioResult {
            name: scenario.name.clone(),
            corporate,
            noncorporate,
            corporate_deductions,
            noncorporate_deductions,
        })
    }

    /// Run scenarios in parallel; results keep the input order
    pub fn run_scenarios(&self, scenarios: &[Scenario]) -> Result<Vec<ScenarioResult>> {
        scenarios.par_iter().map(|s| self.run(s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic;
    use crate::depreciation::{ClassLife, DepreciationSystem};
    use approx::assert_relative_eq;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn runner() -> ScenarioRunner {
        ScenarioRunner::new(synthetic::data(), ProjectionConfig::default()).unwrap()
    }

    #[test]
    fn test_baseline_reproduces_reported_deductions_on_average() {
        let runner = runner();
        let result = runner.run(&runner.baseline()).unwrap();
        let t = runner.data().timeline;

        for regime in Regime::ALL {
            let schedule = result.deductions(regime);
            let factor = runner.calibration().adj_factor(regime);
            let mean_ratio: f64 = t
                .calibration_years()
                .map(|y| runner.data().reported_deductions.reported(regime, y).unwrap() / schedule.total(y).unwrap())
                .sum::<f64>()
                / t.calibration_years().count() as f64;
            assert_relative_eq!(mean_ratio, factor, max_relative = 1e-12);
        }
        assert_eq!(result.corporate.summary.len(), 14);
        assert!(result.corporate.anomalies.is_empty());
    }

    #[test]
    fn test_expensing_raises_deductions_not_stock() {
        let runner = runner();
        let base = runner.run(&runner.baseline()).unwrap();

        let mut expensing = runner.data().baseline_policy.clone();
        for class_life in ClassLife::DEPRECIABLE {
            expensing = expensing.with_bucket(class_life, DepreciationSystem::Expensing, 0.0);
        }
        let reform = runner.run(&Scenario::new("expensing", expensing)).unwrap();

        let year = 2020;
        assert!(reform.corporate.row(year).unwrap().tax_dep > base.corporate.row(year).unwrap().tax_dep);
        assert_eq!(reform.corporate.stock, base.corporate.stock);
        // Years before the window keep their historical treatment
        assert_eq!(
            reform.deductions(Regime::Corporate).total(2013),
            base.deductions(Regime::Corporate).total(2013)
        );
    }

    #[test]
    fn test_haircut_lowers_later_deductions() {
        let runner = runner();
        let base = runner.run(&runner.baseline()).unwrap();
        let cut = runner
            .run(&runner.baseline().with_haircut(Haircut::new(0.5, 2020).unwrap()))
            .unwrap();

        assert_eq!(cut.corporate.row(2019), base.corporate.row(2019));
        assert!(cut.corporate.row(2020).unwrap().tax_dep < base.corporate.row(2020).unwrap().tax_dep);
    }

    #[test]
    fn test_run_scenarios_keeps_order() {
        let runner = runner();
        let mut changes = BTreeMap::new();
        changes.insert(2018, json!(1.0));
        let mut reform = Reform::new();
        reform.insert("depr_7yr_bonus".to_string(), changes);

        let scenarios = vec![runner.baseline(), runner.reform("bonus", &reform).unwrap()];
        let results = runner.run_scenarios(&scenarios).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name, "baseline");
        assert_eq!(results[1].name, "bonus");

        let single = runner.run(&scenarios[1]).unwrap();
        assert_eq!(results[1].corporate.summary, single.corporate.summary);
    }

    #[test]
    fn test_invalid_reform_is_rejected() {
        let runner = runner();
        let mut changes = BTreeMap::new();
        changes.insert(2018, json!("MACRS"));
        let mut reform = Reform::new();
        reform.insert("depr_7yr_method".to_string(), changes);
        assert!(runner.reform("bad", &reform).is_err());
    }

    #[test]
    fn test_rescaling_is_checked() {
        assert!(runner().with_rescaling(vec![1.0; 3], vec![1.0; 14]).is_err());
    }
}
