//! Tax-life reclassification rules
//!
//! Rules are keyed by the year they take effect. For a given year only the
//! rule set with the latest effective year at or before it applies.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{ModelError, Result};

/// Replace every life equal to `from` with `to`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifeOverride {
    pub from: f64,
    pub to: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReclassRules {
    rules: BTreeMap<i32, Vec<LifeOverride>>,
}

impl ReclassRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Add an override effective from `year`
    pub fn insert(&mut self, year: i32, from: f64, to: f64) -> Result<()> {
        if from.is_nan() || from <= 0.0 || to.is_nan() || to <= 0.0 || !to.is_finite() {
            return Err(ModelError::config(format!(
                "reclassification {} -> {} in {} must map positive lives",
                from, to, year
            )));
        }
        let overrides = self.rules.entry(year).or_default();
        match overrides.iter_mut().find(|o| (o.from - from).abs() < 1e-9) {
            Some(existing) => existing.to = to,
            None => overrides.push(LifeOverride { from, to }),
        }
        Ok(())
    }

    /// Overrides in force in `year`
    pub fn active(&self, year: i32) -> &[LifeOverride] {
        self.rules
            .range(..=year)
            .next_back()
            .map(|(_, overrides)| overrides.as_slice())
            .unwrap_or(&[])
    }

    /// Life after applying the overrides in force in `year`
    pub fn apply(&self, year: i32, life: f64) -> f64 {
        reclassify(self.active(year), life)
    }

    /// Every life some rule maps from
    pub fn source_lives(&self) -> impl Iterator<Item = (i32, f64)> + '_ {
        self.rules
            .iter()
            .flat_map(|(year, overrides)| overrides.iter().map(move |o| (*year, o.from)))
    }

    /// Build from `{year: {old_life: new_life}}` with string keys, as stored in JSON
    pub fn from_map(map: &BTreeMap<String, BTreeMap<String, f64>>) -> Result<Self> {
        let mut rules = Self::new();
        for (year, overrides) in map {
            let year: i32 = year
                .trim()
                .parse()
                .map_err(|_| ModelError::config(format!("invalid reclassification year '{}'", year)))?;
            for (from, to) in overrides {
                rules.insert(year, parse_life(from)?, *to)?;
            }
        }
        Ok(rules)
    }
}

/// First matching override wins; overrides never chain
pub fn reclassify(overrides: &[LifeOverride], life: f64) -> f64 {
    overrides
        .iter()
        .find(|o| (o.from - life).abs() < 1e-9)
        .map_or(life, |o| o.to)
}

pub(crate) fn parse_life(s: &str) -> Result<f64> {
    s.trim()
        .parse()
        .map_err(|_| ModelError::config(format!("invalid tax life '{}'", s)))
}

/// On-disk form of reclassification.json
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReclassFile {
    #[serde(default)]
    pub gds: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(default)]
    pub ads: BTreeMap<String, BTreeMap<String, f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_rule_before_effective_year() {
        let mut rules = ReclassRules::new();
        rules.insert(2018, 39.0, 25.0).unwrap();

        assert!(rules.active(2017).is_empty());
        assert_eq!(rules.apply(2017, 39.0), 39.0);
        assert_eq!(rules.apply(2018, 39.0), 25.0);
        assert_eq!(rules.apply(2025, 39.0), 25.0);
        assert_eq!(rules.apply(2025, 27.5), 27.5);
    }

    #[test]
    fn test_latest_effective_rule_wins() {
        let mut rules = ReclassRules::new();
        rules.insert(2018, 39.0, 25.0).unwrap();
        rules.insert(2021, 39.0, 20.0).unwrap();

        assert_eq!(rules.apply(2019, 39.0), 25.0);
        assert_eq!(rules.apply(2021, 39.0), 20.0);
    }

    #[test]
    fn test_overrides_do_not_chain() {
        let mut rules = ReclassRules::new();
        rules.insert(2018, 39.0, 25.0).unwrap();
        rules.insert(2018, 25.0, 15.0).unwrap();

        assert_eq!(rules.apply(2018, 39.0), 25.0);
        assert_eq!(rules.apply(2018, 25.0), 15.0);

        // Insertion order does not matter
        let mut rules = ReclassRules::new();
        rules.insert(2018, 5.0, 7.0).unwrap();
        rules.insert(2018, 3.0, 5.0).unwrap();
        assert_eq!(rules.apply(2018, 3.0), 5.0);
        assert_eq!(rules.apply(2018, 5.0), 7.0);
        assert_eq!(rules.apply(2018, 7.0), 7.0);
    }

    #[test]
    fn test_from_json_map() {
        let json = r#"{"2020": {"27.5": 25, "39": 30}}"#;
        let map: BTreeMap<String, BTreeMap<String, f64>> = serde_json::from_str(json).unwrap();
        let rules = ReclassRules::from_map(&map).unwrap();

        assert_eq!(rules.apply(2020, 27.5), 25.0);
        assert_eq!(rules.apply(2020, 39.0), 30.0);
        assert_eq!(rules.source_lives().count(), 2);
    }

    #[test]
    fn test_rejects_non_positive_target() {
        let mut rules = ReclassRules::new();
        assert!(rules.insert(2018, 39.0, 0.0).is_err());
    }
}
