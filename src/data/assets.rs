//! Asset categories and their depreciation attributes

use serde::Serialize;

use crate::depreciation::{ClassLife, DepreciationMethod};
use crate::error::{ModelError, Result};

/// One BEA asset category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetCategory {
    /// Stable position in every per-asset vector and matrix
    pub index: usize,

    pub code: String,
    pub name: String,

    /// Economic (true) depreciation rate
    pub delta: f64,

    /// GDS class-life bucket that receives the policy's method and bonus
    pub class_life: ClassLife,

    /// Recovery period under the general depreciation system
    pub gds_life: f64,

    /// Recovery period under the alternative depreciation system
    pub ads_life: f64,

    /// Method the general system applies to this asset
    pub gds_method: DepreciationMethod,

    /// Excluded from fixed stock and fixed investment, and from investment rescaling
    pub is_land: bool,

    /// Excluded from fixed stock
    pub is_inventory: bool,
}

impl AssetCategory {
    /// Counted in fixed stock aggregates
    pub fn is_fixed(&self) -> bool {
        !self.is_land && !self.is_inventory
    }
}

/// All asset categories for a run, ordered by index
#[derive(Debug, Clone, Default)]
pub struct AssetTable {
    assets: Vec<AssetCategory>,
}

impl AssetTable {
    /// Build a table, checking indices are 0..n in order
    pub fn new(assets: Vec<AssetCategory>) -> Result<Self> {
        for (position, asset) in assets.iter().enumerate() {
            if asset.index != position {
                return Err(ModelError::config(format!(
                    "asset '{}' has index {} but sits at position {}",
                    asset.code, asset.index, position
                )));
            }
            if asset.delta.is_nan() || asset.delta < 0.0 {
                return Err(ModelError::config(format!(
                    "asset '{}' has negative economic depreciation rate {}",
                    asset.code, asset.delta
                )));
            }
            if asset.class_life.is_depreciable() && asset.gds_method.requires_life() && asset.gds_life <= 0.0 {
                return Err(ModelError::config(format!(
                    "asset '{}' uses {} with GDS life {}",
                    asset.code, asset.gds_method, asset.gds_life
                )));
            }
        }
        if !assets.iter().any(|a| a.is_land) {
            log::warn!("asset table has no land category");
        }
        Ok(Self { assets })
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AssetCategory> {
        self.assets.iter()
    }

    pub fn get(&self, index: usize) -> Option<&AssetCategory> {
        self.assets.get(index)
    }

    /// Distinct ADS lives present in the table
    pub fn ads_lives(&self) -> Vec<f64> {
        let mut lives: Vec<f64> = Vec::new();
        for asset in &self.assets {
            if asset.ads_life.is_finite() && !lives.iter().any(|l| (l - asset.ads_life).abs() < 1e-9) {
                lives.push(asset.ads_life);
            }
        }
        lives
    }
}

impl<'a> IntoIterator for &'a AssetTable {
    type Item = &'a AssetCategory;
    type IntoIter = std::slice::Iter<'a, AssetCategory>;

    fn into_iter(self) -> Self::IntoIter {
        self.assets.iter()
    }
}
