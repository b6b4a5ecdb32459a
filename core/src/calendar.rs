//! Season/month mapping and per-day purchase likelihood.
//!
//! A day's weight is its weekday weight multiplied by the weight of the
//! highest-priority calendar rule covering it: an exact-date holiday beats
//! a special period, and a special period beats the weekday fallback. The
//! fallback is the weekday weight itself, so ordinary days carry the
//! weekday weight squared.

use crate::{
    config::{CalendarConfig, EndBoost},
    error::{SynthError, SynthResult},
    sales::SpecialDayFactors,
    types::Season,
};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::BTreeMap;

/// Monday first.
pub const WEEKDAY_WEIGHTS: [f64; 7] = [0.084, 0.095, 0.116, 0.137, 0.189, 0.211, 0.168];

pub fn weekday_weight(date: NaiveDate) -> f64 {
    WEEKDAY_WEIGHTS[date.weekday().num_days_from_monday() as usize]
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn last_day_of_month(year: i32, month: u32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

pub fn date(year: i32, month: u32, day: u32) -> SynthResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or(SynthError::InvalidDate { year, month, day })
}

#[derive(Debug, Clone)]
pub enum CalendarRule {
    ExactDate {
        month: u32,
        day: u32,
        name: String,
        weight: f64,
    },
    /// Inclusive (month, day) window. An end month before the start month
    /// wraps into the next year.
    DateRange {
        name: String,
        start: (u32, u32),
        end: (u32, u32),
        weight: f64,
        boost: EndBoost,
    },
}

impl CalendarRule {
    pub fn name(&self) -> &str {
        match self {
            Self::ExactDate { name, .. } | Self::DateRange { name, .. } => name,
        }
    }

    /// Weight this rule assigns to `date`, or None if it does not cover it.
    pub fn weight_on(&self, date: NaiveDate) -> Option<f64> {
        match self {
            Self::ExactDate { month, day, weight, .. } => {
                (date.month() == *month && date.day() == *day).then_some(*weight)
            }
            Self::DateRange { start, end, weight, boost, .. } => {
                let start_date = NaiveDate::from_ymd_opt(date.year(), start.0, start.1)?;
                let end_year = if end.0 < start.0 { date.year() + 1 } else { date.year() };
                let end_date = NaiveDate::from_ymd_opt(end_year, end.0, end.1)?;
                if date < start_date || date > end_date {
                    return None;
                }
                let days_to_end = (end_date - date).num_days();
                if days_to_end <= i64::from(boost.within_days) {
                    Some(weight * boost.factor)
                } else {
                    Some(*weight)
                }
            }
        }
    }

    fn priority(&self) -> u8 {
        match self {
            Self::ExactDate { .. } => 0,
            Self::DateRange { .. } => 1,
        }
    }
}

/// A dated holiday used by the amount adjustment stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
    pub weight: f64,
}

#[derive(Debug, Clone)]
pub struct SeasonCalendar {
    season_months: BTreeMap<Season, Vec<u32>>,
    rules: Vec<CalendarRule>,
}

impl SeasonCalendar {
    pub fn from_config(config: &CalendarConfig, factors: &SpecialDayFactors) -> SynthResult<Self> {
        let mut rules = Vec::with_capacity(config.holidays.len() + config.special_periods.len());
        for h in &config.holidays {
            rules.push(CalendarRule::ExactDate {
                month: h.month,
                day: h.day,
                name: h.name.clone(),
                weight: h.weight,
            });
        }
        for p in &config.special_periods {
            let weight = factors.by_name(&p.factor).ok_or_else(|| {
                SynthError::config(format!("unknown special-day factor '{}' for {}", p.factor, p.name))
            })?;
            rules.push(CalendarRule::DateRange {
                name: p.name.clone(),
                start: p.start,
                end: p.end,
                weight,
                boost: config.end_boost,
            });
        }
        // Stable sort keeps document order within a priority class.
        rules.sort_by_key(CalendarRule::priority);
        Ok(Self {
            season_months: config.season_months.clone(),
            rules,
        })
    }

    pub fn months_for(&self, season: Season) -> SynthResult<&[u32]> {
        match self.season_months.get(&season) {
            Some(months) if !months.is_empty() => Ok(months),
            _ => Err(SynthError::empty(format!("months of {}", season.name()))),
        }
    }

    pub fn season_for_month(&self, month: u32) -> SynthResult<Season> {
        self.season_months
            .iter()
            .find(|(_, months)| months.contains(&month))
            .map(|(season, _)| *season)
            .ok_or(SynthError::UnmappedMonth { month })
    }

    pub fn rules(&self) -> &[CalendarRule] {
        &self.rules
    }

    /// Weight of the first covering rule in priority order.
    pub fn rule_weight(&self, date: NaiveDate) -> Option<f64> {
        self.rules.iter().find_map(|r| r.weight_on(date))
    }

    pub fn day_weight(&self, date: NaiveDate) -> f64 {
        let weekday = weekday_weight(date);
        weekday * self.rule_weight(date).unwrap_or(weekday)
    }

    /// Day weights for every valid day of (year, month), day 1 first.
    pub fn day_weights(&self, year: i32, month: u32) -> Vec<f64> {
        (1..=last_day_of_month(year, month))
            .map(|day| NaiveDate::from_ymd_opt(year, month, day).map_or(0.0, |d| self.day_weight(d)))
            .collect()
    }

    /// Fixed-date holidays of `year` plus the floating ones.
    pub fn holidays_for_year(&self, year: i32) -> Vec<Holiday> {
        let mut holidays: Vec<Holiday> = self
            .rules
            .iter()
            .filter_map(|rule| match rule {
                CalendarRule::ExactDate { month, day, name, weight } => {
                    NaiveDate::from_ymd_opt(year, *month, *day).map(|date| Holiday {
                        date,
                        name: name.clone(),
                        weight: *weight,
                    })
                }
                CalendarRule::DateRange { .. } => None,
            })
            .collect();
        holidays.extend(floating_holidays(year));
        holidays
    }
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
}

fn easter(year: i32) -> Option<NaiveDate> {
    match year {
        2022 => NaiveDate::from_ymd_opt(2022, 4, 17),
        2023 => NaiveDate::from_ymd_opt(2023, 4, 9),
        2024 => NaiveDate::from_ymd_opt(2024, 3, 31),
        _ => None,
    }
}

/// Holidays whose date moves every year.
pub fn floating_holidays(year: i32) -> Vec<Holiday> {
    let mut out = Vec::new();
    let mut push = |date: Option<NaiveDate>, name: &str, weight: f64| {
        if let Some(date) = date {
            out.push(Holiday { date, name: name.to_string(), weight });
        }
    };
    let thanksgiving = nth_weekday(year, 11, Weekday::Thu, 4);
    push(thanksgiving, "Thanksgiving", 2.2);
    push(thanksgiving.map(|d| d + Duration::days(1)), "Black Friday", 3.0);
    push(thanksgiving.map(|d| d + Duration::days(4)), "Cyber Monday", 2.5);
    push(nth_weekday(year, 5, Weekday::Sun, 2), "Mother's Day", 2.0);
    push(nth_weekday(year, 6, Weekday::Sun, 3), "Father's Day", 1.8);
    push(easter(year), "Easter", 1.8);
    out
}
