//! Tax depreciation: methods, the deduction formula and the method resolver

mod formula;
mod method;
mod resolver;

pub use formula::DeductionFormula;
pub use method::{
    ClassLife, DepreciationMethod, DepreciationSpec, DepreciationSystem, NO_DEPRECIATION_LIFE,
};
pub use resolver::MethodResolver;
