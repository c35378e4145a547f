//! Investment, deduction and capital-stock projection

mod calibration;
mod capital;
mod deductions;
mod investment;
mod results;

pub use calibration::CalibrationContext;
pub use capital::{roll_back, roll_forward, CapitalStockProjector};
pub use deductions::{DeductionAggregator, DeductionSchedule, DeductionTensor, Haircut, FRACTION_TOLERANCE};
pub use investment::{InvestmentMatrix, InvestmentMatrixBuilder};
pub use results::{CapitalPath, CapitalSummaryRow};

use crate::error::{Anomaly, Result};

/// Run-wide projection options
#[derive(Debug, Clone, Default)]
pub struct ProjectionConfig {
    /// Fail on the first numeric anomaly instead of recording it
    pub strict: bool,
}

/// Log every anomaly; in strict mode the first one becomes an error
pub(crate) fn report_anomalies(anomalies: &[Anomaly], config: &ProjectionConfig) -> Result<()> {
    for anomaly in anomalies {
        log::warn!(
            "{}: asset {:?} in {} has value {}",
            anomaly.context,
            anomaly.asset,
            anomaly.year,
            anomaly.value
        );
    }
    match anomalies.first() {
        Some(first) if config.strict => Err(first.clone().into_error()),
        _ => Ok(()),
    }
}
