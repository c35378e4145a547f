//! CSV loaders for asset and economic data
//!
//! Expected files in the data directory:
//! - assets.csv: one row per asset category
//! - investment_history.csv: asset index plus one column per historical year
//! - investment_shares.csv: corporate share of investment by year
//! - growth_factors.csv: nominal GDP and PCE deflator by year
//! - bonus_history.csv: bonus rates by class life for pre-window years
//! - irs_depreciation.csv: reported deductions by business type

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::Reader;

use crate::depreciation::{ClassLife, DepreciationMethod};
use crate::error::{ModelError, Result};
use super::assets::{AssetCategory, AssetTable};
use super::series::{
    BaselineCapital, BonusHistory, DeductionHistory, GrowthFactors, InvestmentHistory, ReportedDeductions,
};

/// Default path to the data directory
pub const DEFAULT_DATA_PATH: &str = "data";

/// Raw CSV row matching assets.csv columns
#[derive(Debug, serde::Deserialize)]
struct AssetRow {
    index: usize,
    code: String,
    name: String,
    delta: f64,
    class_life: String,
    gds_life: f64,
    ads_life: f64,
    gds_method: String,
    #[serde(default)]
    is_land: bool,
    #[serde(default)]
    is_inventory: bool,
    stock_corp: f64,
    stock_noncorp: f64,
}

impl AssetRow {
    fn into_parts(self) -> Result<(AssetCategory, f64, f64)> {
        let class_life: ClassLife = self.class_life.parse()?;
        let gds_method: DepreciationMethod = self
            .gds_method
            .parse()
            .map_err(|e| ModelError::config(format!("asset '{}': {}", self.code, e)))?;

        let asset = AssetCategory {
            index: self.index,
            code: self.code,
            name: self.name,
            delta: self.delta,
            class_life,
            gds_life: self.gds_life,
            ads_life: self.ads_life,
            gds_method,
            is_land: self.is_land,
            is_inventory: self.is_inventory,
        };
        Ok((asset, self.stock_corp, self.stock_noncorp))
    }
}

/// Load the asset table and baseline capital stocks from assets.csv
pub fn load_assets(path: &Path) -> Result<(AssetTable, BaselineCapital)> {
    load_assets_from_reader(File::open(path.join("assets.csv"))?)
}

pub fn load_assets_from_reader<R: Read>(reader: R) -> Result<(AssetTable, BaselineCapital)> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut assets = Vec::new();
    let mut baseline = BaselineCapital::default();

    for result in csv_reader.deserialize() {
        let row: AssetRow = result?;
        let (asset, corp, noncorp) = row.into_parts()?;
        assets.push(asset);
        baseline.corporate.push(corp);
        baseline.noncorporate.push(noncorp);
    }

    Ok((AssetTable::new(assets)?, baseline))
}

/// Load investment by asset from investment_history.csv
/// Columns after the first are years, optionally prefixed with "i" (i1960, i1961, ...)
pub fn load_investment_history(path: &Path, history_start: i32) -> Result<Vec<Vec<f64>>> {
    load_investment_history_from_reader(File::open(path.join("investment_history.csv"))?, history_start)
}

pub fn load_investment_history_from_reader<R: Read>(reader: R, history_start: i32) -> Result<Vec<Vec<f64>>> {
    let mut csv_reader = Reader::from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    for (offset, header) in headers.iter().skip(1).enumerate() {
        let year: i32 = header
            .trim_start_matches('i')
            .parse()
            .map_err(|_| ModelError::config(format!("investment history column '{}' is not a year", header)))?;
        if year != history_start + offset as i32 {
            return Err(ModelError::config(format!(
                "investment history column {} should be year {}, found {}",
                offset + 1,
                history_start + offset as i32,
                year
            )));
        }
    }

    let mut by_asset = Vec::new();
    for result in csv_reader.records() {
        let record = result?;
        let index: usize = record[0]
            .trim()
            .parse()
            .map_err(|_| ModelError::config(format!("invalid asset index '{}'", &record[0])))?;
        if index != by_asset.len() {
            return Err(ModelError::config(format!(
                "investment history rows out of order: expected asset {}, found {}",
                by_asset.len(),
                index
            )));
        }
        let values = record
            .iter()
            .skip(1)
            .map(|v| {
                v.trim()
                    .parse::<f64>()
                    .map_err(|_| ModelError::config(format!("invalid investment value '{}' for asset {}", v, index)))
            })
            .collect::<Result<Vec<f64>>>()?;
        by_asset.push(values);
    }

    Ok(by_asset)
}

#[derive(Debug, serde::Deserialize)]
struct ShareRow {
    year: i32,
    c_share: f64,
}

/// Load corporate investment shares from investment_shares.csv
pub fn load_investment_shares(path: &Path, history_start: i32) -> Result<Vec<f64>> {
    load_investment_shares_from_reader(File::open(path.join("investment_shares.csv"))?, history_start)
}

pub fn load_investment_shares_from_reader<R: Read>(reader: R, history_start: i32) -> Result<Vec<f64>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut shares = Vec::new();

    for result in csv_reader.deserialize() {
        let row: ShareRow = result?;
        let expected = history_start + shares.len() as i32;
        if row.year != expected {
            return Err(ModelError::config(format!(
                "investment shares should continue with {}, found {}",
                expected, row.year
            )));
        }
        shares.push(row.c_share);
    }

    Ok(shares)
}

#[derive(Debug, serde::Deserialize)]
struct GrowthRow {
    year: i32,
    ngdp: f64,
    pce: f64,
}

/// Load nominal GDP and PCE deflator indices from growth_factors.csv
pub fn load_growth_factors(path: &Path, history_start: i32) -> Result<GrowthFactors> {
    load_growth_factors_from_reader(File::open(path.join("growth_factors.csv"))?, history_start)
}

pub fn load_growth_factors_from_reader<R: Read>(reader: R, history_start: i32) -> Result<GrowthFactors> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut factors = GrowthFactors::default();

    for result in csv_reader.deserialize() {
        let row: GrowthRow = result?;
        let expected = history_start + factors.ngdp.len() as i32;
        if row.year != expected {
            return Err(ModelError::config(format!(
                "growth factors should continue with {}, found {}",
                expected, row.year
            )));
        }
        factors.ngdp.push(row.ngdp);
        factors.pce.push(row.pce);
    }

    Ok(factors)
}

/// Class-life bucket for a bonus_history.csv column (bonus3, ..., bonus27, bonus39)
fn bonus_column(header: &str) -> Option<ClassLife> {
    match header.trim() {
        "bonus3" => Some(ClassLife::Year3),
        "bonus5" => Some(ClassLife::Year5),
        "bonus7" => Some(ClassLife::Year7),
        "bonus10" => Some(ClassLife::Year10),
        "bonus15" => Some(ClassLife::Year15),
        "bonus20" => Some(ClassLife::Year20),
        "bonus25" => Some(ClassLife::Year25),
        "bonus27" | "bonus275" => Some(ClassLife::Year27Half),
        "bonus39" => Some(ClassLife::Year39),
        _ => None,
    }
}

/// Load historical bonus rates from bonus_history.csv
pub fn load_bonus_history(path: &Path) -> Result<BonusHistory> {
    load_bonus_history_from_reader(File::open(path.join("bonus_history.csv"))?)
}

pub fn load_bonus_history_from_reader<R: Read>(reader: R) -> Result<BonusHistory> {
    let mut csv_reader = Reader::from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let columns: Vec<(usize, ClassLife)> = headers
        .iter()
        .enumerate()
        .filter_map(|(i, h)| bonus_column(h).map(|c| (i, c)))
        .collect();

    let mut rates: BTreeMap<ClassLife, Vec<f64>> = BTreeMap::new();
    let mut start_year = None;

    for result in csv_reader.records() {
        let record = result?;
        let year: i32 = record[0]
            .trim()
            .parse()
            .map_err(|_| ModelError::config(format!("invalid bonus history year '{}'", &record[0])))?;
        let start = *start_year.get_or_insert(year);
        let expected = start + rates.values().next().map_or(0, |v| v.len()) as i32;
        if year != expected {
            return Err(ModelError::config(format!(
                "bonus history should continue with {}, found {}",
                expected, year
            )));
        }
        for &(i, class_life) in &columns {
            let rate: f64 = record[i]
                .trim()
                .parse()
                .map_err(|_| ModelError::config(format!("invalid bonus rate '{}' in {}", &record[i], year)))?;
            rates.entry(class_life).or_default().push(rate);
        }
    }

    Ok(BonusHistory {
        start_year: start_year.unwrap_or_default(),
        rates,
    })
}

/// Load reported deductions from irs_depreciation.csv
pub fn load_deduction_history(path: &Path) -> Result<DeductionHistory> {
    load_deduction_history_from_reader(File::open(path.join("irs_depreciation.csv"))?)
}

pub fn load_deduction_history_from_reader<R: Read>(reader: R) -> Result<DeductionHistory> {
    let mut csv_reader = Reader::from_reader(reader);
    let rows = csv_reader
        .deserialize()
        .collect::<std::result::Result<Vec<ReportedDeductions>, csv::Error>>()?;
    Ok(DeductionHistory { rows })
}

/// Investment history assembled from investment_history.csv and investment_shares.csv
pub fn load_investment(path: &Path, history_start: i32) -> Result<InvestmentHistory> {
    Ok(InvestmentHistory {
        by_asset: load_investment_history(path, history_start)?,
        corporate_share: load_investment_shares(path, history_start)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASSETS_CSV: &str = "\
index,code,name,delta,class_life,gds_life,ads_life,gds_method,is_land,is_inventory,stock_corp,stock_noncorp
0,EP1A,Mainframes,0.2729,5,5,6,DB 200%,false,false,10.5,2.5
1,SB31,Office,0.0247,39,39,40,SL,false,false,400.0,300.0
2,INVT,Inventories,0.0,inf,inf,inf,None,false,true,900.0,100.0
3,LAND,Land,0.0,inf,inf,inf,None,true,false,1200.0,800.0
";

    #[test]
    fn test_load_assets_from_reader() {
        let (table, baseline) = load_assets_from_reader(ASSETS_CSV.as_bytes()).unwrap();

        assert_eq!(table.len(), 4);
        let mainframes = table.get(0).unwrap();
        assert_eq!(mainframes.class_life, ClassLife::Year5);
        assert_eq!(mainframes.gds_method, DepreciationMethod::Db200);

        let land = table.get(3).unwrap();
        assert!(land.is_land);
        assert_eq!(land.class_life, ClassLife::Indefinite);
        assert!(land.gds_life.is_infinite());

        assert_eq!(baseline.corporate, vec![10.5, 400.0, 900.0, 1200.0]);
        assert_eq!(baseline.noncorporate[1], 300.0);
    }

    #[test]
    fn test_unknown_gds_method_is_rejected() {
        let csv = ASSETS_CSV.replace("DB 200%", "DB 175%");
        let result = load_assets_from_reader(csv.as_bytes());
        assert!(matches!(result, Err(ModelError::Configuration(_))));
    }

    #[test]
    fn test_load_investment_history() {
        let csv = "asset,i1960,i1961,i1962\n0,1.0,2.0,3.0\n1,4.0,5.0,6.0\n";
        let history = load_investment_history_from_reader(csv.as_bytes(), 1960).unwrap();
        assert_eq!(history, vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);

        let gap = "asset,1960,1962\n0,1.0,2.0\n";
        assert!(load_investment_history_from_reader(gap.as_bytes(), 1960).is_err());
    }

    #[test]
    fn test_load_growth_factors_requires_consecutive_years() {
        let csv = "year,ngdp,pce\n1960,1.0,1.0\n1961,1.05,1.02\n";
        let factors = load_growth_factors_from_reader(csv.as_bytes(), 1960).unwrap();
        assert_eq!(factors.ngdp, vec![1.0, 1.05]);
        assert_eq!(factors.pce, vec![1.0, 1.02]);

        let skipped = "year,ngdp,pce\n1960,1.0,1.0\n1962,1.05,1.02\n";
        assert!(load_growth_factors_from_reader(skipped.as_bytes(), 1960).is_err());
    }

    #[test]
    fn test_load_bonus_history() {
        let csv = "year,bonus3,bonus5,bonus7,bonus10,bonus15,bonus20,bonus25,bonus27,bonus39\n\
                   2001,0.3,0.3,0.3,0.3,0.3,0.3,0,0,0\n\
                   2002,0.3,0.3,0.3,0.3,0.3,0.3,0,0,0\n";
        let history = load_bonus_history_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(history.start_year, 2001);
        assert_eq!(history.rates.len(), 9);
        assert_eq!(history.rate(ClassLife::Year27Half, 2002).unwrap(), 0.0);
        assert_eq!(history.rate(ClassLife::Year7, 2001).unwrap(), 0.3);
    }

    #[test]
    fn test_load_deduction_history() {
        let csv = "year,dep_Ccorp,dep_Scorp,dep_sp,dep_partner\n2000,300,40,20,30\n";
        let history = load_deduction_history_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(history.reported(crate::data::Regime::Noncorporate, 2000), Some(90.0));
        assert_eq!(history.reported(crate::data::Regime::Corporate, 2001), None);
    }
}
