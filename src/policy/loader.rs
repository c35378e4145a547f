//! Load depreciation policy from policy_params.csv and reclassification.json
//!
//! policy_params.csv has a `year` column followed by `depr_<stem>_method`
//! and `depr_<stem>_bonus` columns for each class-life bucket.
//! reclassification.json is optional.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::Reader;

use crate::depreciation::{ClassLife, DepreciationSystem};
use crate::error::{ModelError, Result};
use crate::timeline::Timeline;
use super::params::{BucketSchedule, PolicyParams, Reform};
use super::reclass::{ReclassFile, ReclassRules};

/// Load the baseline policy from a data directory
pub fn load_policy(path: &Path, timeline: &Timeline) -> Result<PolicyParams> {
    let mut params = load_policy_params_from_reader(File::open(path.join("policy_params.csv"))?, timeline)?;

    let reclass_path = path.join("reclassification.json");
    if reclass_path.exists() {
        let (gds, ads) = load_reclassification_from_reader(File::open(reclass_path)?)?;
        params.reclassify_gds_life = gds;
        params.reclassify_ads_life = ads;
    }
    params.validate(timeline)?;
    Ok(params)
}

/// Load the yearly parameter table from any reader
pub fn load_policy_params_from_reader<R: Read>(reader: R, timeline: &Timeline) -> Result<PolicyParams> {
    let mut csv_reader = Reader::from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| ModelError::config(format!("policy_params.csv has no '{}' column", name)))
    };
    let year_col = column("year")?;
    let columns = ClassLife::DEPRECIABLE
        .iter()
        .map(|&c| -> Result<(ClassLife, usize, usize)> {
            Ok((c, column(c.method_param().as_str())?, column(c.bonus_param().as_str())?))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut schedules: Vec<BucketSchedule> = columns
        .iter()
        .map(|_| BucketSchedule {
            system: Vec::new(),
            bonus: Vec::new(),
        })
        .collect();
    let mut n_years = 0usize;

    for result in csv_reader.records() {
        let record = result?;
        let year: i32 = record[year_col]
            .trim()
            .parse()
            .map_err(|_| ModelError::config(format!("invalid policy year '{}'", &record[year_col])))?;
        if year < timeline.start_year || year > timeline.end_year {
            continue;
        }
        let expected = timeline.start_year + n_years as i32;
        if year != expected {
            return Err(ModelError::config(format!(
                "policy parameters should continue with {}, found {}",
                expected, year
            )));
        }

        for (schedule, &(class_life, method_col, bonus_col)) in schedules.iter_mut().zip(&columns) {
            let system: DepreciationSystem = record[method_col].trim().parse()?;
            let bonus: f64 = record[bonus_col].trim().parse().map_err(|_| {
                ModelError::config(format!(
                    "invalid {} '{}' in {}",
                    class_life.bonus_param(),
                    &record[bonus_col],
                    year
                ))
            })?;
            schedule.system.push(system);
            schedule.bonus.push(bonus);
        }
        n_years += 1;
    }

    let mut params = PolicyParams::new(timeline.start_year, n_years);
    for (schedule, &(class_life, _, _)) in schedules.into_iter().zip(&columns) {
        params.set_bucket(class_life, schedule);
    }
    Ok(params)
}

/// GDS and ADS reclassification rules from reclassification.json
pub fn load_reclassification_from_reader<R: Read>(reader: R) -> Result<(ReclassRules, ReclassRules)> {
    let file: ReclassFile = serde_json::from_reader(reader)?;
    Ok((ReclassRules::from_map(&file.gds)?, ReclassRules::from_map(&file.ads)?))
}

/// Reform file: `{parameter: {year: value}}`
pub fn load_reform(path: &Path) -> Result<Reform> {
    load_reform_from_reader(File::open(path)?)
}

pub fn load_reform_from_reader<R: Read>(reader: R) -> Result<Reform> {
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy_csv(first_year: i32, last_year: i32, bonus: f64) -> String {
        let mut header = vec!["year".to_string()];
        for c in ClassLife::DEPRECIABLE {
            header.push(c.method_param());
            header.push(c.bonus_param());
        }
        let mut out = header.join(",");
        out.push('\n');
        for year in first_year..=last_year {
            let mut row = vec![year.to_string()];
            for c in ClassLife::DEPRECIABLE {
                let system = if c == ClassLife::Year39 { "ADS" } else { "GDS" };
                row.push(system.to_string());
                row.push(bonus.to_string());
            }
            out.push_str(&row.join(","));
            out.push('\n');
        }
        out
    }

    #[test]
    fn test_load_policy_params() {
        let t = Timeline::default();
        let csv = policy_csv(2010, 2030, 0.5);
        let params = load_policy_params_from_reader(csv.as_bytes(), &t).unwrap();

        assert!(params.validate(&t).is_ok());
        assert_eq!(params.start_year(), 2014);
        assert_eq!(params.end_year(), 2027);
        assert_eq!(params.setting(ClassLife::Year39, 2020).unwrap(), (DepreciationSystem::Ads, 0.5));
        assert_eq!(params.setting(ClassLife::Year5, 2014).unwrap().0, DepreciationSystem::Gds);
    }

    #[test]
    fn test_short_policy_table_fails_validation() {
        let t = Timeline::default();
        let csv = policy_csv(2014, 2020, 0.0);
        let params = load_policy_params_from_reader(csv.as_bytes(), &t).unwrap();
        assert!(matches!(params.validate(&t), Err(ModelError::Configuration(_))));
    }

    #[test]
    fn test_missing_column_is_configuration_error() {
        let t = Timeline::default();
        let csv = policy_csv(2014, 2027, 0.0).replace("depr_15yr_method", "depr_15yr_system");
        assert!(matches!(
            load_policy_params_from_reader(csv.as_bytes(), &t),
            Err(ModelError::Configuration(_))
        ));
    }

    #[test]
    fn test_unknown_system_is_rejected() {
        let t = Timeline::default();
        let csv = policy_csv(2014, 2027, 0.0).replace("ADS", "MACRS");
        assert!(load_policy_params_from_reader(csv.as_bytes(), &t).is_err());
    }

    #[test]
    fn test_load_reclassification() {
        let json = r#"{"gds": {"2018": {"39": 25}}}"#;
        let (gds, ads) = load_reclassification_from_reader(json.as_bytes()).unwrap();
        assert_eq!(gds.apply(2019, 39.0), 25.0);
        assert!(ads.is_empty());
    }

    #[test]
    fn test_load_reform() {
        let json = r#"{"depr_39yr_bonus": {"2018": 1.0}, "reclassify_gds_life": {"2019": {"39": 25}}}"#;
        let reform = load_reform_from_reader(json.as_bytes()).unwrap();
        assert_eq!(reform.len(), 2);
        assert!(reform["depr_39yr_bonus"].contains_key(&2018));

        let t = Timeline::default();
        let mut params = PolicyParams::uniform(&t, DepreciationSystem::Gds, 0.0);
        params.apply_reform(&reform).unwrap();
        assert_eq!(params.setting(ClassLife::Year39, 2018).unwrap().1, 1.0);
        assert_eq!(params.reclassify_gds_life.apply(2020, 39.0), 25.0);
    }
}
