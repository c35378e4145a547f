//! Deduction fraction for one unit of investment
//!
//! Years are timeline indices: `vintage` is the year the investment is placed
//! in service, `year` is the year the deduction is taken. DB and SL methods
//! are modeled as continuous exponential decay at rate N/L starting mid-year
//! (half-year convention), switching to straight-line once the remaining
//! basis falls to e^(1-N).

use crate::error::{ModelError, Result};
use super::method::{DepreciationMethod, DepreciationSpec};

/// Computes deduction fractions against a price-deflator series
#[derive(Debug, Clone, Copy)]
pub struct DeductionFormula<'a> {
    /// Price deflator indexed on the timeline; needs one year past the horizon
    deflator: &'a [f64],
}

impl<'a> DeductionFormula<'a> {
    pub fn new(deflator: &'a [f64]) -> Self {
        Self { deflator }
    }

    /// Fraction of one unit of `vintage` investment deducted in `year`
    pub fn fraction(&self, vintage: usize, year: usize, spec: &DepreciationSpec) -> Result<f64> {
        if !(0.0..=1.0).contains(&spec.bonus) {
            return Err(ModelError::domain(format!("bonus rate {} outside [0, 1]", spec.bonus)));
        }
        if spec.delta.is_nan() || spec.delta < 0.0 {
            return Err(ModelError::domain(format!("economic depreciation rate {} is negative", spec.delta)));
        }

        match spec.method {
            DepreciationMethod::None => Ok(0.0),
            DepreciationMethod::Expensing => Ok(if year == vintage { 1.0 } else { 0.0 }),
            DepreciationMethod::Economic => self.economic(vintage, year, spec.delta, spec.bonus),
            method => {
                // rate_multiplier is Some for every remaining method
                let n = method.rate_multiplier().unwrap_or(1.0);
                if spec.life.is_nan() || spec.life <= 0.0 || spec.life.is_infinite() {
                    return Err(ModelError::domain(format!(
                        "method {} requires a positive finite life, got {}",
                        method, spec.life
                    )));
                }
                Ok(declining_balance(vintage, year, n, spec.life, spec.bonus))
            }
        }
    }

    fn price(&self, index: usize) -> Result<f64> {
        self.deflator.get(index).copied().ok_or_else(|| {
            ModelError::domain(format!(
                "price deflator has {} years, index {} requested",
                self.deflator.len(),
                index
            ))
        })
    }

    /// Declining balance on the true rate, revalued with the deflator
    fn economic(&self, vintage: usize, year: usize, delta: f64, bonus: f64) -> Result<f64> {
        if year < vintage {
            return Ok(0.0);
        }

        let pi = self.price(year + 1)? / self.price(year)?;
        let annual_change = if pi == delta.exp() {
            1.0
        } else {
            let growth = pi.ln() - delta;
            if year == vintage {
                ((pi * (-delta).exp()).sqrt() - 1.0) / growth
            } else {
                (pi * (-delta).exp() - 1.0) / growth
            }
        };

        let survival = if year == vintage {
            1.0
        } else {
            let vintage_price = (self.price(vintage)? + self.price(vintage + 1)?) / 2.0;
            (-delta * (year - vintage) as f64).exp() * self.price(year)? / vintage_price
        };

        let ordinary = (1.0 - bonus) * delta * survival * annual_change;
        Ok(if year == vintage { bonus + ordinary } else { ordinary })
    }
}

/// DB 200%, DB 150% and SL with half-year convention
fn declining_balance(vintage: usize, year: usize, n: f64, life: f64, bonus: f64) -> f64 {
    let rate = n / life;
    let t0 = vintage as f64 + 0.5;
    let t1 = t0 + life * (1.0 - 1.0 / n);
    let expiry = t0 + life;
    let s1 = year as f64;
    let s2 = s1 + 1.0;

    // Straight-line rate after the switch point
    let sl_rate = rate * (1.0 - n).exp();

    if year < vintage || s1 > vintage as f64 + life {
        0.0
    } else if year == vintage {
        bonus + (1.0 - bonus) * (1.0 - (-rate * 0.5).exp())
    } else if s2 <= t1 {
        (1.0 - bonus) * ((-rate * (s1 - t0)).exp() - (-rate * (s2 - t0)).exp())
    } else if s1 >= t1 {
        (1.0 - bonus) * sl_rate * (s2.min(expiry) - s1).max(0.0)
    } else {
        let exponential = (-rate * (s1 - t0)).exp() - (-rate * (t1 - t0)).exp();
        let linear = sl_rate * (s2.min(expiry) - t1).max(0.0);
        (1.0 - bonus) * (exponential + linear)
    }
}
