//! Yearly business-tax depreciation parameters
//!
//! One value per year of the policy window for each class-life bucket's
//! depreciation system and bonus rate. Parameter names follow the
//! `depr_<stem>_method` / `depr_<stem>_bonus` convention.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::depreciation::{ClassLife, DepreciationSystem};
use crate::error::{ModelError, Result};
use crate::timeline::Timeline;
use super::reclass::{parse_life, ReclassRules};

/// Reform: `{parameter: {year: value}}`; each value holds from its year onward
pub type Reform = BTreeMap<String, BTreeMap<i32, Value>>;

/// Per-year system and bonus for one class-life bucket
#[derive(Debug, Clone, PartialEq)]
pub struct BucketSchedule {
    pub system: Vec<DepreciationSystem>,
    pub bonus: Vec<f64>,
}

impl BucketSchedule {
    pub fn flat(system: DepreciationSystem, bonus: f64, n_years: usize) -> Self {
        Self {
            system: vec![system; n_years],
            bonus: vec![bonus; n_years],
        }
    }
}

/// Policy parameter table for the modeling window
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyParams {
    start_year: i32,
    n_years: usize,
    buckets: BTreeMap<ClassLife, BucketSchedule>,
    pub reclassify_gds_life: ReclassRules,
    pub reclassify_ads_life: ReclassRules,
}

enum ParamKind {
    Method,
    Bonus,
}

fn parse_param_name(name: &str) -> Option<(ClassLife, ParamKind)> {
    let rest = name.strip_prefix("depr_")?;
    let (stem, kind) = if let Some(stem) = rest.strip_suffix("_method") {
        (stem, ParamKind::Method)
    } else if let Some(stem) = rest.strip_suffix("_bonus") {
        (stem, ParamKind::Bonus)
    } else {
        return None;
    };
    ClassLife::DEPRECIABLE
        .iter()
        .copied()
        .find(|c| c.param_stem() == stem)
        .map(|c| (c, kind))
}

impl PolicyParams {
    /// Empty table; every bucket must be set before use
    pub fn new(start_year: i32, n_years: usize) -> Self {
        Self {
            start_year,
            n_years,
            buckets: BTreeMap::new(),
            reclassify_gds_life: ReclassRules::new(),
            reclassify_ads_life: ReclassRules::new(),
        }
    }

    /// Every bucket on the same system and bonus in every year
    pub fn uniform(timeline: &Timeline, system: DepreciationSystem, bonus: f64) -> Self {
        let mut params = Self::new(timeline.start_year, timeline.window_len());
        for class_life in ClassLife::DEPRECIABLE {
            params.set_bucket(class_life, BucketSchedule::flat(system, bonus, params.n_years));
        }
        params
    }

    pub fn with_bucket(mut self, class_life: ClassLife, system: DepreciationSystem, bonus: f64) -> Self {
        let n_years = self.n_years;
        self.set_bucket(class_life, BucketSchedule::flat(system, bonus, n_years));
        self
    }

    pub fn set_bucket(&mut self, class_life: ClassLife, schedule: BucketSchedule) {
        self.buckets.insert(class_life, schedule);
    }

    pub fn remove_bucket(&mut self, class_life: ClassLife) -> Option<BucketSchedule> {
        self.buckets.remove(&class_life)
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    pub fn end_year(&self) -> i32 {
        self.start_year + self.n_years as i32 - 1
    }

    /// System and bonus for a bucket; years past the window use the last year
    pub fn setting(&self, class_life: ClassLife, year: i32) -> Result<(DepreciationSystem, f64)> {
        let schedule = self.buckets.get(&class_life).ok_or_else(|| {
            ModelError::config(format!("no method specified for class life {}", class_life.param_stem()))
        })?;
        let year = year.min(self.end_year());
        let i = usize::try_from(year - self.start_year)
            .map_err(|_| ModelError::config(format!("{} precedes policy start {}", year, self.start_year)))?;
        match (schedule.system.get(i), schedule.bonus.get(i)) {
            (Some(system), Some(bonus)) => Ok((*system, *bonus)),
            _ => Err(ModelError::config(format!(
                "parameters for class life {} do not cover {}",
                class_life.param_stem(),
                year
            ))),
        }
    }

    /// Reject tables the resolver cannot use
    pub fn validate(&self, timeline: &Timeline) -> Result<()> {
        if self.start_year != timeline.start_year || self.n_years != timeline.window_len() {
            return Err(ModelError::config(format!(
                "policy covers {}-{}, modeling window is {}-{}",
                self.start_year,
                self.end_year(),
                timeline.start_year,
                timeline.end_year
            )));
        }
        for class_life in ClassLife::DEPRECIABLE {
            let schedule = self.buckets.get(&class_life).ok_or_else(|| {
                ModelError::config(format!("no method specified for class life {}", class_life.param_stem()))
            })?;
            if schedule.system.len() != self.n_years || schedule.bonus.len() != self.n_years {
                return Err(ModelError::config(format!(
                    "{} has {} methods and {} bonus rates, window has {} years",
                    class_life.param_stem(),
                    schedule.system.len(),
                    schedule.bonus.len(),
                    self.n_years
                )));
            }
            if let Some(bad) = schedule.bonus.iter().find(|b| !(0.0..=1.0).contains(*b)) {
                return Err(ModelError::config(format!(
                    "{} bonus rate {} outside [0, 1]",
                    class_life.bonus_param(),
                    bad
                )));
            }
        }
        Ok(())
    }

    /// Apply a reform; each value holds from its year through the end of the window
    pub fn apply_reform(&mut self, reform: &Reform) -> Result<()> {
        for (name, changes) in reform {
            for (&year, value) in changes {
                if year < self.start_year || year > self.end_year() {
                    return Err(ModelError::config(format!(
                        "{} reform year {} outside {}-{}",
                        name,
                        year,
                        self.start_year,
                        self.end_year()
                    )));
                }
                self.apply_change(name, year, value)?;
            }
        }
        Ok(())
    }

    fn apply_change(&mut self, name: &str, year: i32, value: &Value) -> Result<()> {
        match name {
            "reclassify_gds_life" | "reclassify_ads_life" => {
                let map = value
                    .as_object()
                    .ok_or_else(|| ModelError::config(format!("{} expects {{old_life: new_life}}", name)))?;
                let rules = if name == "reclassify_gds_life" {
                    &mut self.reclassify_gds_life
                } else {
                    &mut self.reclassify_ads_life
                };
                for (from, to) in map {
                    let to = to
                        .as_f64()
                        .ok_or_else(|| ModelError::config(format!("{} target for {} is not a number", name, from)))?;
                    rules.insert(year, parse_life(from)?, to)?;
                }
                Ok(())
            }
            _ => {
                let (class_life, kind) = parse_param_name(name)
                    .ok_or_else(|| ModelError::config(format!("unknown policy parameter '{}'", name)))?;
                let start = (year - self.start_year) as usize;
                let schedule = self.buckets.get_mut(&class_life).ok_or_else(|| {
                    ModelError::config(format!("no method specified for class life {}", class_life.param_stem()))
                })?;
                match kind {
                    ParamKind::Method => {
                        let system: DepreciationSystem = value
                            .as_str()
                            .ok_or_else(|| ModelError::config(format!("{} expects a string", name)))?
                            .parse()?;
                        schedule.system.iter_mut().skip(start).for_each(|s| *s = system);
                    }
                    ParamKind::Bonus => {
                        let bonus = value
                            .as_f64()
                            .filter(|b| (0.0..=1.0).contains(b))
                            .ok_or_else(|| ModelError::config(format!("{} expects a rate in [0, 1]", name)))?;
                        schedule.bonus.iter_mut().skip(start).for_each(|b| *b = bonus);
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reform(name: &str, year: i32, value: Value) -> Reform {
        let mut changes = BTreeMap::new();
        changes.insert(year, value);
        let mut reform = Reform::new();
        reform.insert(name.to_string(), changes);
        reform
    }

    #[test]
    fn test_uniform_is_valid() {
        let t = Timeline::default();
        let params = PolicyParams::uniform(&t, DepreciationSystem::Gds, 0.5);
        assert!(params.validate(&t).is_ok());
        assert_eq!(params.end_year(), 2027);
        assert_eq!(
            params.setting(ClassLife::Year5, 2020).unwrap(),
            (DepreciationSystem::Gds, 0.5)
        );
    }

    #[test]
    fn test_years_past_window_use_last_year() {
        let t = Timeline::default();
        let mut params = PolicyParams::uniform(&t, DepreciationSystem::Gds, 0.0);
        params
            .apply_reform(&reform("depr_7yr_bonus", 2027, json!(0.4)))
            .unwrap();
        assert_eq!(params.setting(ClassLife::Year7, 2034).unwrap().1, 0.4);
        assert_eq!(params.setting(ClassLife::Year7, 2026).unwrap().1, 0.0);
    }

    #[test]
    fn test_missing_bucket_is_configuration_error() {
        let t = Timeline::default();
        let mut params = PolicyParams::uniform(&t, DepreciationSystem::Gds, 0.0);
        params.remove_bucket(ClassLife::Year15);
        assert!(matches!(params.validate(&t), Err(ModelError::Configuration(_))));
        assert!(params.setting(ClassLife::Year15, 2015).is_err());
    }

    #[test]
    fn test_length_mismatch_is_configuration_error() {
        let t = Timeline::default();
        let mut params = PolicyParams::uniform(&t, DepreciationSystem::Gds, 0.0);
        params.set_bucket(
            ClassLife::Year3,
            BucketSchedule::flat(DepreciationSystem::Gds, 0.0, t.window_len() - 1),
        );
        assert!(params.validate(&t).is_err());
    }

    #[test]
    fn test_reform_carries_forward() {
        let t = Timeline::default();
        let mut params = PolicyParams::uniform(&t, DepreciationSystem::Gds, 0.0);
        params
            .apply_reform(&reform("depr_39yr_method", 2020, json!("ADS")))
            .unwrap();

        assert_eq!(params.setting(ClassLife::Year39, 2019).unwrap().0, DepreciationSystem::Gds);
        assert_eq!(params.setting(ClassLife::Year39, 2020).unwrap().0, DepreciationSystem::Ads);
        assert_eq!(params.setting(ClassLife::Year39, 2027).unwrap().0, DepreciationSystem::Ads);
        assert_eq!(params.setting(ClassLife::Year27Half, 2027).unwrap().0, DepreciationSystem::Gds);
    }

    #[test]
    fn test_reform_reclassification() {
        let t = Timeline::default();
        let mut params = PolicyParams::uniform(&t, DepreciationSystem::Gds, 0.0);
        params
            .apply_reform(&reform("reclassify_gds_life", 2019, json!({"39": 25})))
            .unwrap();
        assert_eq!(params.reclassify_gds_life.apply(2019, 39.0), 25.0);
        assert_eq!(params.reclassify_gds_life.apply(2018, 39.0), 39.0);
    }

    #[test]
    fn test_invalid_reforms() {
        let t = Timeline::default();
        let mut params = PolicyParams::uniform(&t, DepreciationSystem::Gds, 0.0);
        assert!(params.apply_reform(&reform("depr_12yr_bonus", 2020, json!(0.5))).is_err());
        assert!(params.apply_reform(&reform("depr_5yr_bonus", 2040, json!(0.5))).is_err());
        assert!(params.apply_reform(&reform("depr_5yr_bonus", 2020, json!(1.5))).is_err());
        assert!(params.apply_reform(&reform("depr_5yr_method", 2020, json!("MACRS"))).is_err());
    }
}
