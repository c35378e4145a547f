//! Depreciation policy parameters, reforms and reclassification rules

mod params;
mod reclass;
pub mod loader;

pub use params::{BucketSchedule, PolicyParams, Reform};
pub use reclass::{reclassify, LifeOverride, ReclassRules};
pub use loader::{load_policy, load_reform};
