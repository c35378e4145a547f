//! Depreciation methods, class-life buckets and per-asset specifications

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Life assigned when no deduction is allowed; never read by the formula
pub const NO_DEPRECIATION_LIFE: f64 = 100.0;

/// Method used to compute the deduction schedule of one unit of investment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepreciationMethod {
    #[serde(rename = "DB 200%")]
    Db200,
    #[serde(rename = "DB 150%")]
    Db150,
    #[serde(rename = "SL")]
    StraightLine,
    Expensing,
    Economic,
    None,
}

impl DepreciationMethod {
    /// Declining-balance rate multiplier N, if this is a DB/SL method
    pub fn rate_multiplier(&self) -> Option<f64> {
        match self {
            DepreciationMethod::Db200 => Some(2.0),
            DepreciationMethod::Db150 => Some(1.5),
            DepreciationMethod::StraightLine => Some(1.0),
            _ => None,
        }
    }

    /// Whether the deduction formula divides by the tax life
    pub fn requires_life(&self) -> bool {
        self.rate_multiplier().is_some()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DepreciationMethod::Db200 => "DB 200%",
            DepreciationMethod::Db150 => "DB 150%",
            DepreciationMethod::StraightLine => "SL",
            DepreciationMethod::Expensing => "Expensing",
            DepreciationMethod::Economic => "Economic",
            DepreciationMethod::None => "None",
        }
    }
}

impl fmt::Display for DepreciationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DepreciationMethod {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "DB 200%" | "DB200" => Ok(DepreciationMethod::Db200),
            "DB 150%" | "DB150" => Ok(DepreciationMethod::Db150),
            "SL" => Ok(DepreciationMethod::StraightLine),
            "Expensing" => Ok(DepreciationMethod::Expensing),
            "Economic" => Ok(DepreciationMethod::Economic),
            "None" => Ok(DepreciationMethod::None),
            other => Err(ModelError::domain(format!("unsupported depreciation method '{}'", other))),
        }
    }
}

/// Depreciation system a policy assigns to a class-life bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepreciationSystem {
    /// General system: the asset's own GDS method and life
    #[serde(rename = "GDS")]
    Gds,
    /// Alternative system: straight-line over the ADS life
    #[serde(rename = "ADS")]
    Ads,
    Economic,
    Expensing,
    None,
}

impl FromStr for DepreciationSystem {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "GDS" => Ok(DepreciationSystem::Gds),
            "ADS" => Ok(DepreciationSystem::Ads),
            "Economic" => Ok(DepreciationSystem::Economic),
            "Expensing" => Ok(DepreciationSystem::Expensing),
            "None" => Ok(DepreciationSystem::None),
            other => Err(ModelError::config(format!("unknown depreciation system '{}'", other))),
        }
    }
}

impl fmt::Display for DepreciationSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DepreciationSystem::Gds => "GDS",
            DepreciationSystem::Ads => "ADS",
            DepreciationSystem::Economic => "Economic",
            DepreciationSystem::Expensing => "Expensing",
            DepreciationSystem::None => "None",
        };
        f.write_str(s)
    }
}

/// GDS class-life bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClassLife {
    Year3,
    Year5,
    Year7,
    Year10,
    Year15,
    Year20,
    Year25,
    Year27Half,
    Year39,
    /// Land and inventories: never depreciated
    Indefinite,
}

impl ClassLife {
    /// The nine buckets a policy assigns methods and bonus rates to
    pub const DEPRECIABLE: [ClassLife; 9] = [
        ClassLife::Year3,
        ClassLife::Year5,
        ClassLife::Year7,
        ClassLife::Year10,
        ClassLife::Year15,
        ClassLife::Year20,
        ClassLife::Year25,
        ClassLife::Year27Half,
        ClassLife::Year39,
    ];

    /// Recovery period in years (infinite for land/inventories)
    pub fn years(&self) -> f64 {
        match self {
            ClassLife::Year3 => 3.0,
            ClassLife::Year5 => 5.0,
            ClassLife::Year7 => 7.0,
            ClassLife::Year10 => 10.0,
            ClassLife::Year15 => 15.0,
            ClassLife::Year20 => 20.0,
            ClassLife::Year25 => 25.0,
            ClassLife::Year27Half => 27.5,
            ClassLife::Year39 => 39.0,
            ClassLife::Indefinite => f64::INFINITY,
        }
    }

    /// Bucket whose recovery period equals `years`
    pub fn from_years(years: f64) -> Option<Self> {
        if years.is_infinite() {
            return Some(ClassLife::Indefinite);
        }
        Self::DEPRECIABLE
            .iter()
            .copied()
            .find(|c| (c.years() - years).abs() < 1e-9)
    }

    /// Stem used in parameter names, e.g. `depr_275yr_method`
    pub fn param_stem(&self) -> &'static str {
        match self {
            ClassLife::Year3 => "3yr",
            ClassLife::Year5 => "5yr",
            ClassLife::Year7 => "7yr",
            ClassLife::Year10 => "10yr",
            ClassLife::Year15 => "15yr",
            ClassLife::Year20 => "20yr",
            ClassLife::Year25 => "25yr",
            ClassLife::Year27Half => "275yr",
            ClassLife::Year39 => "39yr",
            ClassLife::Indefinite => "inf",
        }
    }

    pub fn method_param(&self) -> String {
        format!("depr_{}_method", self.param_stem())
    }

    pub fn bonus_param(&self) -> String {
        format!("depr_{}_bonus", self.param_stem())
    }

    pub fn is_depreciable(&self) -> bool {
        !matches!(self, ClassLife::Indefinite)
    }
}

impl FromStr for ClassLife {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("inf") || s.eq_ignore_ascii_case("none") {
            return Ok(ClassLife::Indefinite);
        }
        let years: f64 = s
            .parse()
            .map_err(|_| ModelError::config(format!("invalid class life '{}'", s)))?;
        ClassLife::from_years(years)
            .ok_or_else(|| ModelError::config(format!("unknown class life {}", years)))
    }
}

/// How one asset category is depreciated for investment placed in one year
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DepreciationSpec {
    pub method: DepreciationMethod,
    /// Tax life L in years (irrelevant for Expensing, Economic and None)
    pub life: f64,
    /// Economic depreciation rate
    pub delta: f64,
    /// Bonus depreciation fraction taken in the placed-in-service year
    pub bonus: f64,
}

impl DepreciationSpec {
    pub fn none(delta: f64) -> Self {
        Self {
            method: DepreciationMethod::None,
            life: NO_DEPRECIATION_LIFE,
            delta,
            bonus: 0.0,
        }
    }
}
