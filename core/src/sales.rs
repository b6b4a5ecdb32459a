//! External sales targets and the weight tables derived from them.

use crate::types::{FIRST_YEAR, LAST_YEAR};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Monthly unit sales per calendar year, January first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesTargets {
    pub monthly_sales: BTreeMap<i32, [u64; 12]>,
    /// Year whose monthly shares drive the future allocation.
    pub future_year: i32,
}

/// Purchase-likelihood factors for the named special periods, derived from
/// how far each month's sales sit above the January–October average.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecialDayFactors {
    pub black_friday: f64,
    pub christmas: f64,
    pub valentines: f64,
    pub mothers_day: f64,
    pub back_to_school: f64,
}

impl SpecialDayFactors {
    pub fn by_name(&self, name: &str) -> Option<f64> {
        match name {
            "black_friday" => Some(self.black_friday),
            "christmas" => Some(self.christmas),
            "valentines" => Some(self.valentines),
            "mothers_day" => Some(self.mothers_day),
            "back_to_school" => Some(self.back_to_school),
            _ => None,
        }
    }
}

impl SalesTargets {
    /// (year, share of grand total) for every year in the purchase window.
    pub fn year_weights(&self) -> Vec<(i32, f64)> {
        let totals: Vec<(i32, f64)> = self
            .monthly_sales
            .iter()
            .filter(|(year, _)| (FIRST_YEAR..=LAST_YEAR).contains(*year))
            .map(|(year, months)| (*year, months.iter().sum::<u64>() as f64))
            .collect();
        let grand: f64 = totals.iter().map(|(_, t)| t).sum();
        if grand <= 0.0 {
            let uniform = 1.0 / totals.len().max(1) as f64;
            return totals.into_iter().map(|(y, _)| (y, uniform)).collect();
        }
        totals.into_iter().map(|(y, t)| (y, t / grand)).collect()
    }

    /// Mean sales per month across all years, normalized to sum 1.
    pub fn month_weights(&self) -> [f64; 12] {
        let mut means = self.month_means();
        let total: f64 = means.iter().sum();
        if total > 0.0 {
            means.iter_mut().for_each(|m| *m /= total);
        } else {
            means = [1.0 / 12.0; 12];
        }
        means
    }

    /// Month shares of `year`'s total, or None if the year has no row.
    pub fn target_ratios(&self, year: i32) -> Option<[f64; 12]> {
        let months = self.monthly_sales.get(&year)?;
        let total = months.iter().sum::<u64>() as f64;
        let mut ratios = [0.0; 12];
        if total > 0.0 {
            for (ratio, sales) in ratios.iter_mut().zip(months) {
                *ratio = *sales as f64 / total;
            }
        }
        Some(ratios)
    }

    pub fn special_day_factors(&self) -> SpecialDayFactors {
        let month = self.month_means();
        let baseline = month[..10].iter().sum::<f64>() / 10.0;
        let ratio = |v: f64| if baseline > 0.0 { v / baseline } else { 1.0 };
        SpecialDayFactors {
            black_friday: ratio(month[10]),
            christmas: ratio(month[11]),
            valentines: ratio(month[1]),
            mothers_day: ratio(month[4]),
            back_to_school: ratio((month[7] + month[8]) / 2.0),
        }
    }

    fn month_means(&self) -> [f64; 12] {
        let mut means = [0.0; 12];
        let years = self.monthly_sales.len().max(1) as f64;
        for months in self.monthly_sales.values() {
            for (slot, sales) in means.iter_mut().zip(months) {
                *slot += *sales as f64 / years;
            }
        }
        means
    }
}
