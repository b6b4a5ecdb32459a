//! Season and date sampling for purchase sequences.
//!
//! Years are weighted by yearly sales, months by their mean sales share
//! within the season, and days by the calendar's day weights. Draws that
//! a ReseedStrategy claims run on a keyed sub-generator; everything else
//! consumes the shared stream.

use crate::{
    calendar::{self, last_day_of_month, SeasonCalendar},
    config::ArchetypeTables,
    error::{SynthError, SynthResult},
    rng::{KeyedReseed, ReseedStrategy, SharedStream, SynthRng},
    sales::SalesTargets,
    sampler::{sample, sample_index, WeightTable},
    types::{CustomerId, Season, FIRST_YEAR, LAST_YEAR},
};
use chrono::{Datelike, NaiveDate};

pub struct TemporalDistributor {
    calendar: SeasonCalendar,
    archetypes: ArchetypeTables,
    years: WeightTable<i32>,
    month_weights: [f64; 12],
    future_year: i32,
    single_draw: Box<dyn ReseedStrategy>,
    sequence: Box<dyn ReseedStrategy>,
}

impl TemporalDistributor {
    pub fn new(calendar: SeasonCalendar, archetypes: ArchetypeTables, sales: &SalesTargets) -> Self {
        Self {
            calendar,
            archetypes,
            years: sales.year_weights().into_iter().collect(),
            month_weights: sales.month_weights(),
            future_year: sales.future_year,
            single_draw: Box::new(KeyedReseed),
            sequence: Box::new(SharedStream),
        }
    }

    /// Strategy for `date_for_season`. Defaults to KeyedReseed.
    pub fn with_single_draw_seeding(mut self, strategy: Box<dyn ReseedStrategy>) -> Self {
        self.single_draw = strategy;
        self
    }

    /// Strategy for `dates_for_sequence`. Defaults to SharedStream.
    pub fn with_sequence_seeding(mut self, strategy: Box<dyn ReseedStrategy>) -> Self {
        self.set_sequence_seeding(strategy);
        self
    }

    pub fn set_sequence_seeding(&mut self, strategy: Box<dyn ReseedStrategy>) {
        self.sequence = strategy;
    }

    pub fn calendar(&self) -> &SeasonCalendar {
        &self.calendar
    }

    pub fn future_year(&self) -> i32 {
        self.future_year
    }

    /// Pick an archetype with one roll, then draw `n` seasons from it.
    pub fn assign_seasons(&self, n: usize, rng: &mut SynthRng) -> SynthResult<Vec<Season>> {
        let table = self.archetypes.for_roll(rng.next_f64());
        (0..n).map(|_| sample(table, rng).copied()).collect()
    }

    pub fn sample_year(&self, rng: &mut SynthRng) -> SynthResult<i32> {
        if self.years.is_empty() {
            return Err(SynthError::empty("sales years"));
        }
        sample(&self.years, rng).copied()
    }

    /// Month of `season`, weighted by mean monthly sales.
    pub fn sample_month(&self, season: Season, rng: &mut SynthRng) -> SynthResult<u32> {
        let months = self.calendar.months_for(season)?;
        let weights: Vec<f64> = months
            .iter()
            .map(|m| self.month_weights.get(*m as usize - 1).copied().unwrap_or(0.0))
            .collect();
        Ok(months[sample_index(&weights, rng)?])
    }

    /// Day of (year, month), weighted by the calendar's day weights.
    pub fn sample_day(&self, year: i32, month: u32, rng: &mut SynthRng) -> SynthResult<NaiveDate> {
        let weights = self.calendar.day_weights(year, month);
        let day = sample_index(&weights, rng)? as u32 + 1;
        valid_or_resample(year, month, day, rng)
    }

    /// One (month, day) draw for a season in a fixed year.
    fn draw_in_year(&self, season: Season, year: i32, rng: &mut SynthRng) -> SynthResult<NaiveDate> {
        let month = self.sample_month(season, rng)?;
        self.sample_day(year, month, rng)
    }

    /// A single date for (season, year). Months are uniform over the
    /// season; days carry the rule weight alone (holiday, special period,
    /// or weekday).
    pub fn date_for_season(
        &self,
        season: Season,
        year: i32,
        customer_id: CustomerId,
        rng: &mut SynthRng,
    ) -> SynthResult<NaiveDate> {
        match self.single_draw.sub_rng(customer_id, season, year) {
            Some(mut keyed) => self.single_draw_on(season, year, &mut keyed),
            None => self.single_draw_on(season, year, rng),
        }
    }

    fn single_draw_on(&self, season: Season, year: i32, rng: &mut SynthRng) -> SynthResult<NaiveDate> {
        let months = self.calendar.months_for(season)?;
        let month = months[rng.next_u64_below(months.len() as u64) as usize];
        let weights: Vec<f64> = (1..=last_day_of_month(year, month))
            .map(|day| {
                NaiveDate::from_ymd_opt(year, month, day).map_or(0.0, |d| {
                    self.calendar
                        .rule_weight(d)
                        .unwrap_or_else(|| calendar::weekday_weight(d))
                })
            })
            .collect();
        let day = sample_index(&weights, rng)? as u32 + 1;
        valid_or_resample(year, month, day, rng).map(clamp_year)
    }

    /// One date per season in `seasons`, sorted ascending. The i-th date
    /// is not tied to the i-th season; callers pair them positionally.
    pub fn dates_for_sequence(
        &self,
        customer_id: CustomerId,
        seasons: &[Season],
        rng: &mut SynthRng,
    ) -> SynthResult<Vec<NaiveDate>> {
        let mut dates = Vec::with_capacity(seasons.len());
        for season in seasons {
            let year = self.sample_year(rng)?;
            let date = match self.sequence.sub_rng(customer_id, *season, year) {
                Some(mut keyed) => self.draw_in_year(*season, year, &mut keyed)?,
                None => self.draw_in_year(*season, year, rng)?,
            };
            dates.push(clamp_year(date));
        }
        dates.sort();
        Ok(dates)
    }

    /// A day in `month` of the future year. The back third of November
    /// and December is favoured 3:1 and 4:1.
    pub fn future_day(&self, month: u32, rng: &mut SynthRng) -> SynthResult<NaiveDate> {
        let year = self.future_year;
        let last = last_day_of_month(year, month);
        let late_weight = match month {
            11 => 3.0,
            12 => 4.0,
            _ => 1.0,
        };
        let weights: Vec<f64> = (1..=last)
            .map(|d| if d >= 20 { late_weight } else { 1.0 })
            .collect();
        let day = sample_index(&weights, rng)? as u32 + 1;
        valid_or_resample(year, month, day, rng)
    }
}

/// Resample uniformly from the month's valid days if (year, month, day)
/// is not a calendar date.
fn valid_or_resample(year: i32, month: u32, day: u32, rng: &mut SynthRng) -> SynthResult<NaiveDate> {
    if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
        return Ok(date);
    }
    let last = last_day_of_month(year, month);
    calendar::date(year, month, rng.range_inclusive(1, last))
}

/// Clamp the year into the purchase window, keeping month and day
/// (29 Feb falls back to 28 Feb).
pub fn clamp_year(date: NaiveDate) -> NaiveDate {
    let year = date.year().clamp(FIRST_YEAR, LAST_YEAR);
    if year == date.year() {
        return date;
    }
    date.with_year(year)
        .or_else(|| NaiveDate::from_ymd_opt(year, date.month(), 28))
        .unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HolidayConfig, SynthConfig};
    use std::collections::BTreeSet;

    fn distributor() -> TemporalDistributor {
        let config = SynthConfig::builtin().unwrap();
        let calendar =
            SeasonCalendar::from_config(&config.calendar, &config.sales.special_day_factors()).unwrap();
        TemporalDistributor::new(calendar, config.generation.archetypes.clone(), &config.sales)
    }

    #[test]
    fn clamp_moves_out_of_range_years() {
        let d = NaiveDate::from_ymd_opt(2021, 6, 3).unwrap();
        assert_eq!(clamp_year(d), NaiveDate::from_ymd_opt(2022, 6, 3).unwrap());
        let leap = NaiveDate::from_ymd_opt(2028, 2, 29).unwrap();
        assert_eq!(clamp_year(leap), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        let leap = NaiveDate::from_ymd_opt(2020, 2, 29).unwrap();
        assert_eq!(clamp_year(leap), NaiveDate::from_ymd_opt(2022, 2, 28).unwrap());
    }

    #[test]
    fn months_stay_within_season() {
        let dist = distributor();
        let mut rng = SynthRng::new(21);
        for _ in 0..300 {
            let m = dist.sample_month(Season::Summer, &mut rng).unwrap();
            assert!((6..=8).contains(&m), "month {m} outside Summer");
        }
    }

    #[test]
    fn sequence_is_sorted_and_sized() {
        let dist = distributor();
        let mut rng = SynthRng::new(4);
        let seasons = dist.assign_seasons(12, &mut rng).unwrap();
        let dates = dist.dates_for_sequence(99, &seasons, &mut rng).unwrap();
        assert_eq!(dates.len(), 12);
        assert!(dates.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn future_days_land_in_future_year() {
        let dist = distributor();
        let mut rng = SynthRng::new(8);
        for month in 1..=12 {
            let d = dist.future_day(month, &mut rng).unwrap();
            assert_eq!((d.year(), d.month()), (2024, month));
        }
    }

    #[test]
    fn impossible_day_resamples_within_the_month() {
        let mut rng = SynthRng::new(30);
        for _ in 0..50 {
            let d = valid_or_resample(2023, 2, 30, &mut rng).unwrap();
            assert_eq!((d.year(), d.month()), (2023, 2));
            assert!(d.day() <= 28);
        }
        let leap = valid_or_resample(2024, 2, 29, &mut rng).unwrap();
        assert_eq!(leap, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn all_zero_day_weights_fall_back_to_uniform() {
        let mut config = SynthConfig::builtin().unwrap();
        let muted: Vec<HolidayConfig> = (1..=29)
            .map(|day| HolidayConfig { month: 2, day, name: format!("Quiet {day}"), weight: 0.0 })
            .collect();
        config.calendar.holidays.splice(0..0, muted);
        let calendar =
            SeasonCalendar::from_config(&config.calendar, &config.sales.special_day_factors()).unwrap();
        assert!(calendar.day_weights(2023, 2).iter().all(|w| *w == 0.0));

        let dist = TemporalDistributor::new(calendar, config.generation.archetypes.clone(), &config.sales);
        let mut rng = SynthRng::new(14);
        let mut days = BTreeSet::new();
        for _ in 0..400 {
            let d = dist.sample_day(2023, 2, &mut rng).unwrap();
            assert_eq!((d.year(), d.month()), (2023, 2));
            days.insert(d.day());
        }
        assert!(days.len() > 20, "only {} distinct days", days.len());
    }
}
