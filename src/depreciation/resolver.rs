//! Per-asset depreciation specifications for a year
//!
//! Years before the policy window use the assets' own GDS method and life
//! with the bonus rates actually in force. Years inside the window (and past
//! it, clamped to the last modeled year) read each class-life bucket's system
//! and bonus from the policy table and apply life reclassification.

use crate::data::{AssetCategory, AssetTable, BonusHistory};
use crate::error::{ModelError, Result};
use crate::policy::PolicyParams;
use crate::timeline::Timeline;
use super::method::{ClassLife, DepreciationMethod, DepreciationSpec, DepreciationSystem};

/// Turns yearly policy into per-asset depreciation specifications
#[derive(Debug, Clone, Copy)]
pub struct MethodResolver<'a> {
    assets: &'a AssetTable,
    policy: &'a PolicyParams,
    bonus_history: &'a BonusHistory,
    timeline: &'a Timeline,
}

impl<'a> MethodResolver<'a> {
    /// Validate the policy against the asset table and timeline
    pub fn new(
        assets: &'a AssetTable,
        policy: &'a PolicyParams,
        bonus_history: &'a BonusHistory,
        timeline: &'a Timeline,
    ) -> Result<Self> {
        policy.validate(timeline)?;

        for (year, life) in policy.reclassify_gds_life.source_lives() {
            if ClassLife::from_years(life).map_or(true, |c| !c.is_depreciable()) {
                return Err(ModelError::config(format!(
                    "GDS reclassification in {} maps from unknown life {}",
                    year, life
                )));
            }
        }
        let ads_lives = assets.ads_lives();
        for (year, life) in policy.reclassify_ads_life.source_lives() {
            if !ads_lives.iter().any(|l| (l - life).abs() < 1e-9) {
                return Err(ModelError::config(format!(
                    "ADS reclassification in {} maps from unknown life {}",
                    year, life
                )));
            }
        }

        Ok(Self {
            assets,
            policy,
            bonus_history,
            timeline,
        })
    }

    /// Specification of every asset for investment placed in service in `year`
    pub fn resolve(&self, year: i32) -> Result<Vec<DepreciationSpec>> {
        if year < self.timeline.start_year {
            self.assets.iter().map(|a| self.preset(a, year)).collect()
        } else {
            let year = year.min(self.timeline.end_year);
            self.assets.iter().map(|a| self.modeled(a, year)).collect()
        }
    }

    fn preset(&self, asset: &AssetCategory, year: i32) -> Result<DepreciationSpec> {
        if !asset.class_life.is_depreciable() || asset.gds_method == DepreciationMethod::None {
            return Ok(DepreciationSpec::none(asset.delta));
        }
        Ok(DepreciationSpec {
            method: asset.gds_method,
            life: asset.gds_life,
            delta: asset.delta,
            bonus: self.bonus_history.rate(asset.class_life, year)?,
        })
    }

    fn modeled(&self, asset: &AssetCategory, year: i32) -> Result<DepreciationSpec> {
        if !asset.class_life.is_depreciable() || asset.gds_method == DepreciationMethod::None {
            return Ok(DepreciationSpec::none(asset.delta));
        }
        let (system, bonus) = self.policy.setting(asset.class_life, year)?;

        let (method, life) = match system {
            DepreciationSystem::Gds => (
                asset.gds_method,
                self.policy.reclassify_gds_life.apply(year, asset.gds_life),
            ),
            DepreciationSystem::Ads => (
                DepreciationMethod::StraightLine,
                self.policy.reclassify_ads_life.apply(year, asset.ads_life),
            ),
            DepreciationSystem::Economic => (DepreciationMethod::Economic, asset.gds_life),
            DepreciationSystem::Expensing => (DepreciationMethod::Expensing, asset.gds_life),
            DepreciationSystem::None => return Ok(DepreciationSpec::none(asset.delta)),
        };

        Ok(DepreciationSpec {
            method,
            life,
            delta: asset.delta,
            bonus,
        })
    }
}
