//! Depreciation Engine - tax depreciation and capital-stock projection
//!
//! This library provides:
//! - Per-vintage deduction fractions for DB, SL, economic and expensing methods
//! - Resolution of yearly depreciation policy into per-asset specifications
//! - Investment matrices by regime, anchored to a baseline capital stock
//! - Vintage deduction aggregation with haircuts and calibration
//! - Capital-stock projection and a multi-scenario runner

pub mod data;
pub mod depreciation;
pub mod error;
pub mod policy;
pub mod projection;
pub mod scenario;
pub mod timeline;

// Re-export commonly used types
pub use data::{AssetCategory, AssetTable, ModelData, Regime};
pub use depreciation::{DeductionFormula, DepreciationMethod, DepreciationSpec, MethodResolver};
pub use error::{Anomaly, ModelError, Result};
pub use policy::PolicyParams;
pub use projection::{CalibrationContext, CapitalPath, CapitalSummaryRow, Haircut, ProjectionConfig};
pub use scenario::{Scenario, ScenarioResult, ScenarioRunner};
pub use timeline::Timeline;
