//! Post-generation adjustments.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. HolidayEffect        amounts near holidays and in late Nov/Dec
//!   2. CovidEffect          2022 amounts, shipping and payment
//!   3. SalesRedistribution  future-year January excess to Nov/Dec
//!   4. PromoCodes           per-customer promo flags
//!   5. WeekdayAnnotation    weekday fields from the final date
//!
//! RULES:
//!   - Stages rewrite fields; the row count never changes.
//!   - After every stage amounts are clamped into [20, 100] and rounded
//!     to cents.
//!   - All randomness continues on the shared stream.

use crate::{
    attributes::{round2, MAX_AMOUNT, MIN_AMOUNT},
    calendar::{Holiday, SeasonCalendar},
    config::{CovidConfig, PromoConfig, RedistributionConfig, SynthConfig},
    error::{SynthError, SynthResult},
    record::{PurchaseRecord, WeekdayInfo},
    rng::SynthRng,
    sampler::{sample, sample_index},
    stage::{AdjustmentStage, StageReport},
    types::{CustomerId, FIRST_YEAR, LAST_YEAR},
};
use chrono::{Datelike, NaiveDate};
use log::{debug, info};
use std::any::Any;
use std::collections::BTreeMap;

// ── Holidays ────────────────────────────────────────────────────────

/// Days either side of a holiday that still feel its pull.
const HOLIDAY_REACH: i64 = 3;

pub struct HolidayEffect {
    holidays: Vec<Holiday>,
    black_friday_factor: f64,
    christmas_factor: f64,
}

impl HolidayEffect {
    pub fn new(holidays: Vec<Holiday>, black_friday_factor: f64, christmas_factor: f64) -> Self {
        Self { holidays, black_friday_factor, christmas_factor }
    }

    pub fn holidays(&self) -> &[Holiday] {
        &self.holidays
    }

    fn proximity(days: i64) -> f64 {
        match days {
            0 => 1.0,
            1 => 0.7,
            2 => 0.5,
            _ => 0.3,
        }
    }
}

impl AdjustmentStage for HolidayEffect {
    fn name(&self) -> &'static str {
        "holiday_effect"
    }

    fn apply(&mut self, records: &mut [PurchaseRecord], rng: &mut SynthRng) -> SynthResult<StageReport> {
        let mut report = StageReport::new(self.name(), records.len());
        for record in records.iter_mut() {
            // Every adjustment scales the amount the record entered with.
            let base = record.details.amount;
            let mut adjusted = None;

            let seasonal_factor = match (record.date.month(), record.date.day()) {
                (11, d) if d >= 20 => Some(self.black_friday_factor),
                (12, d) if d >= 20 => Some(self.christmas_factor),
                _ => None,
            };
            if let Some(factor) = seasonal_factor {
                let bump = 1.3 + rng.next_f64() * 0.3 * factor;
                adjusted = Some((base * bump).min(MAX_AMOUNT));
            }

            for holiday in &self.holidays {
                let distance = (record.date - holiday.date).num_days().abs();
                if distance > HOLIDAY_REACH {
                    continue;
                }
                let probability = holiday.weight * Self::proximity(distance) / 10.0;
                if rng.chance(probability) {
                    let bump = 1.3 + rng.next_f64() * 0.3;
                    adjusted = Some((base * bump).min(MAX_AMOUNT));
                }
            }

            if let Some(amount) = adjusted {
                record.details.amount = amount;
                report.rows_changed += 1;
            }
        }
        debug!("Holiday effect raised {} of {} amounts", report.rows_changed, report.rows_seen);
        Ok(report)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ── Pandemic year ───────────────────────────────────────────────────

pub struct CovidEffect {
    config: CovidConfig,
}

impl CovidEffect {
    pub fn new(config: CovidConfig) -> Self {
        Self { config }
    }
}

impl AdjustmentStage for CovidEffect {
    fn name(&self) -> &'static str {
        "covid_effect"
    }

    fn apply(&mut self, records: &mut [PurchaseRecord], rng: &mut SynthRng) -> SynthResult<StageReport> {
        let c = &self.config;
        let in_year: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.year() == c.year)
            .map(|(i, _)| i)
            .collect();
        let mut report = StageReport::new(self.name(), in_year.len());
        if in_year.is_empty() {
            return Ok(report.note(format!("no {} records", c.year)));
        }

        let n_reduce = (in_year.len() as f64 * c.reduce_ratio).floor() as usize;
        for pick in rng.sample_indices(in_year.len(), n_reduce) {
            let record = &mut records[in_year[pick]];
            record.details.amount *= rng.uniform(c.reduce_range.0, c.reduce_range.1);
        }

        let n_online = (in_year.len() as f64 * c.online_ratio).floor() as usize;
        for pick in rng.sample_indices(in_year.len(), n_online) {
            let record = &mut records[in_year[pick]];
            record.details.shipping_type = sample(&c.online_shipping, rng)?.clone();
            record.details.payment_method = sample(&c.online_payment, rng)?.clone();
            let bump = rng.uniform(c.online_increase_range.0, c.online_increase_range.1);
            record.details.amount = (record.details.amount * bump).min(MAX_AMOUNT);
        }

        report.rows_changed = n_reduce + n_online;
        Ok(report
            .note(format!("{n_reduce} reduced"))
            .note(format!("{n_online} moved online")))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ── Monthly redistribution ──────────────────────────────────────────

pub struct SalesRedistribution {
    year: i32,
    target_ratios: [f64; 12],
    config: RedistributionConfig,
    /// Records moved so far across every apply() call.
    moved_total: usize,
}

impl SalesRedistribution {
    pub fn new(year: i32, target_ratios: [f64; 12], config: RedistributionConfig) -> Self {
        Self { year, target_ratios, config, moved_total: 0 }
    }

    pub fn moved_total(&self) -> usize {
        self.moved_total
    }

    fn day_in(&self, month: u32, days: u32, rng: &mut SynthRng) -> SynthResult<NaiveDate> {
        let cfg = &self.config;
        let weights: Vec<f64> = (1..=days)
            .map(|d| if d < cfg.late_day_threshold { cfg.early_day_weight } else { cfg.late_day_weight })
            .collect();
        let day = sample_index(&weights, rng)? as u32 + 1;
        NaiveDate::from_ymd_opt(self.year, month, day).ok_or(SynthError::InvalidDate {
            year: self.year,
            month,
            day,
        })
    }
}

impl AdjustmentStage for SalesRedistribution {
    fn name(&self) -> &'static str {
        "sales_redistribution"
    }

    fn apply(&mut self, records: &mut [PurchaseRecord], rng: &mut SynthRng) -> SynthResult<StageReport> {
        let in_year: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.year() == self.year)
            .map(|(i, _)| i)
            .collect();
        let mut report = StageReport::new(self.name(), in_year.len());

        let january: Vec<usize> = in_year
            .iter()
            .copied()
            .filter(|i| records[*i].date.month() == 1)
            .collect();
        let target = (self.target_ratios[0] * in_year.len() as f64).floor() as usize;
        if january.len() <= target {
            return Ok(report.note(format!("January {} within target {target}", january.len())));
        }

        let to_move = (january.len() - target).min(self.config.max_moved);
        // Only move when January holds strictly more rows than the batch.
        if january.len() <= to_move {
            return Ok(report.note(format!("January {} too small to move {to_move}", january.len())));
        }
        let to_november = to_move / 2;
        let picks = rng.sample_indices(january.len(), to_move);
        for (n, pick) in picks.into_iter().enumerate() {
            let (month, days) = if n < to_november { (11, 30) } else { (12, 31) };
            records[january[pick]].date = self.day_in(month, days, rng)?;
        }

        self.moved_total += to_move;
        report.rows_changed = to_move;
        info!(
            "Moved {to_november} January records to November and {} to December",
            to_move - to_november
        );
        Ok(report.note(format!("moved {to_move}, running total {}", self.moved_total)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ── Promo codes ─────────────────────────────────────────────────────

pub struct PromoCodes {
    config: PromoConfig,
}

impl PromoCodes {
    pub fn new(config: PromoConfig) -> Self {
        Self { config }
    }

    pub fn ratio_for(&self, subscribed: bool) -> f64 {
        if subscribed {
            self.config.subscriber_ratio
        } else {
            self.config.non_subscriber_ratio
        }
    }
}

impl AdjustmentStage for PromoCodes {
    fn name(&self) -> &'static str {
        "promo_codes"
    }

    fn apply(&mut self, records: &mut [PurchaseRecord], rng: &mut SynthRng) -> SynthResult<StageReport> {
        let mut by_customer: BTreeMap<CustomerId, Vec<usize>> = BTreeMap::new();
        for (i, r) in records.iter().enumerate() {
            by_customer.entry(r.customer_id).or_default().push(i);
        }
        for r in records.iter_mut() {
            r.promo_used = false;
        }

        let mut report = StageReport::new(self.name(), records.len());
        for indices in by_customer.values() {
            let subscribed = records[indices[0]].subscribed;
            let n = (indices.len() as f64 * self.ratio_for(subscribed)).floor() as usize;
            for pick in rng.sample_indices(indices.len(), n) {
                records[indices[pick]].promo_used = true;
            }
            report.rows_changed += n;
        }

        for subscribed in [true, false] {
            let total = records.iter().filter(|r| r.subscribed == subscribed).count();
            let used = records
                .iter()
                .filter(|r| r.subscribed == subscribed && r.promo_used)
                .count();
            if total > 0 {
                let share = used as f64 / total as f64 * 100.0;
                info!("Subscribed={subscribed}: {used} of {total} purchases used a promo code ({share:.2}%)");
                report = report.note(format!("subscribed={subscribed} {used}/{total}"));
            }
        }
        Ok(report)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ── Weekday fields ──────────────────────────────────────────────────

#[derive(Default)]
pub struct WeekdayAnnotation;

impl AdjustmentStage for WeekdayAnnotation {
    fn name(&self) -> &'static str {
        "weekday_annotation"
    }

    fn apply(&mut self, records: &mut [PurchaseRecord], _rng: &mut SynthRng) -> SynthResult<StageReport> {
        let mut per_day = [0usize; 7];
        for record in records.iter_mut() {
            let info = WeekdayInfo::from_date(record.date);
            per_day[info.number as usize - 1] += 1;
            record.weekday = Some(info);
        }
        let total = records.len().max(1) as f64;
        let mut report = StageReport::new(self.name(), records.len());
        report.rows_changed = records.len();
        for (i, count) in per_day.iter().enumerate() {
            let name = WeekdayInfo::name_of(i as u32 + 1);
            debug!("{name}: {count} purchases ({:.1}%)", *count as f64 / total * 100.0);
        }
        Ok(report.note(format!("per weekday {per_day:?}")))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ── Pipeline ────────────────────────────────────────────────────────

pub struct DistributionAdjuster {
    stages: Vec<Box<dyn AdjustmentStage>>,
}

impl DistributionAdjuster {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Build the adjuster with every stage registered in the documented
    /// order.
    pub fn build(config: &SynthConfig) -> SynthResult<Self> {
        let factors = config.sales.special_day_factors();
        let calendar = SeasonCalendar::from_config(&config.calendar, &factors)?;
        let holidays: Vec<Holiday> = (FIRST_YEAR..=LAST_YEAR)
            .flat_map(|year| calendar.holidays_for_year(year))
            .collect();
        let future_year = config.sales.future_year;
        let target_ratios = config
            .sales
            .target_ratios(future_year)
            .ok_or_else(|| SynthError::config(format!("no sales for {future_year}")))?;

        let mut adjuster = Self::new();
        adjuster.register(Box::new(HolidayEffect::new(
            holidays,
            factors.black_friday,
            factors.christmas,
        )));
        adjuster.register(Box::new(CovidEffect::new(config.generation.covid.clone())));
        adjuster.register(Box::new(SalesRedistribution::new(
            future_year,
            target_ratios,
            config.generation.redistribution,
        )));
        adjuster.register(Box::new(PromoCodes::new(config.generation.promo)));
        adjuster.register(Box::new(WeekdayAnnotation));
        Ok(adjuster)
    }

    /// Register a stage. Call in the documented execution order.
    pub fn register(&mut self, stage: Box<dyn AdjustmentStage>) {
        self.stages.push(stage);
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn stage<T: 'static>(&self) -> Option<&T> {
        self.stages.iter().find_map(|s| s.as_any().downcast_ref::<T>())
    }

    pub fn apply_all(
        &mut self,
        records: &mut [PurchaseRecord],
        rng: &mut SynthRng,
    ) -> SynthResult<Vec<StageReport>> {
        let mut reports = Vec::with_capacity(self.stages.len());
        for stage in &mut self.stages {
            let report = stage.apply(records, rng)?;
            clamp_amounts(records);
            info!(
                "Stage {}: {} of {} rows changed",
                report.stage, report.rows_changed, report.rows_seen
            );
            reports.push(report);
        }
        Ok(reports)
    }
}

impl Default for DistributionAdjuster {
    fn default() -> Self {
        Self::new()
    }
}

pub fn clamp_amounts(records: &mut [PurchaseRecord]) {
    for r in records {
        r.details.amount = round2(r.details.amount.clamp(MIN_AMOUNT, MAX_AMOUNT));
    }
}
