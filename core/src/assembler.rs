//! Builds the raw purchase log: location assignment, past purchases,
//! the future-year allocation and the last-purchase-date reshaping.

use crate::{
    attributes::{AttributeSynthesizer, PurchaseContext},
    calendar::{self, last_day_of_month, SeasonCalendar},
    config::{LastPurchaseConfig, SynthConfig},
    customer::Customer,
    error::{SynthError, SynthResult},
    location::Geography,
    record::{PurchaseRecord, RecordOrigin},
    rng::SynthRng,
    temporal::TemporalDistributor,
    types::{CustomerId, Season},
};
use chrono::{Datelike, NaiveDate};
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Customer id → index into `Geography::locations`. Fixed for the run.
#[derive(Debug, Clone, Default)]
pub struct LocationAssignment {
    by_customer: BTreeMap<CustomerId, usize>,
}

impl LocationAssignment {
    pub fn get(&self, customer_id: CustomerId) -> Option<usize> {
        self.by_customer.get(&customer_id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_customer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_customer.is_empty()
    }

    /// Customers per location index.
    pub fn counts(&self, locations: usize) -> Vec<usize> {
        let mut counts = vec![0; locations];
        for idx in self.by_customer.values() {
            if let Some(c) = counts.get_mut(*idx) {
                *c += 1;
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LastDateReport {
    pub customers: usize,
    /// Customers selected to end in 2022.
    pub forced_2022: usize,
    /// Customers selected to end in 2023.
    pub forced_2023: usize,
    /// Records whose date actually changed.
    pub rewritten: usize,
}

pub struct Assembly {
    pub records: Vec<PurchaseRecord>,
    pub assignment: LocationAssignment,
    pub last_dates: LastDateReport,
}

pub struct PurchaseAssembler {
    temporal: TemporalDistributor,
    attributes: AttributeSynthesizer,
    future_ratios: [f64; 12],
    last_purchase: LastPurchaseConfig,
}

impl PurchaseAssembler {
    pub fn new(
        temporal: TemporalDistributor,
        attributes: AttributeSynthesizer,
        future_ratios: [f64; 12],
        last_purchase: LastPurchaseConfig,
    ) -> Self {
        Self { temporal, attributes, future_ratios, last_purchase }
    }

    pub fn from_config(config: &SynthConfig) -> SynthResult<Self> {
        let calendar = SeasonCalendar::from_config(&config.calendar, &config.sales.special_day_factors())?;
        let temporal =
            TemporalDistributor::new(calendar, config.generation.archetypes.clone(), &config.sales);
        let attributes = AttributeSynthesizer::new(
            config.catalog.clone(),
            Geography::from_config(&config.geography),
        );
        let future_ratios = config
            .sales
            .target_ratios(config.sales.future_year)
            .ok_or_else(|| SynthError::config(format!("no sales for {}", config.sales.future_year)))?;
        Ok(Self::new(temporal, attributes, future_ratios, config.generation.last_purchase))
    }

    pub fn temporal(&self) -> &TemporalDistributor {
        &self.temporal
    }

    pub fn temporal_mut(&mut self) -> &mut TemporalDistributor {
        &mut self.temporal
    }

    pub fn attributes(&self) -> &AttributeSynthesizer {
        &self.attributes
    }

    /// Split customers across locations in proportion to population.
    /// Rounding drift lands on the most populous location; roster order
    /// fills locations in table order.
    pub fn assign_customer_locations(
        &self,
        customers: &[Customer],
        rng: &mut SynthRng,
    ) -> SynthResult<LocationAssignment> {
        let locations = &self.attributes.geography().locations;
        if locations.is_empty() {
            return Err(SynthError::empty("locations"));
        }

        let mut ids: Vec<CustomerId> = Vec::with_capacity(customers.len());
        let mut seen = BTreeSet::new();
        for c in customers {
            if seen.insert(c.id) {
                ids.push(c.id);
            }
        }
        let total = ids.len() as i64;

        let mut targets: Vec<i64> = locations
            .iter()
            .map(|l| (total as f64 * l.weight).round_ties_even() as i64)
            .collect();
        let diff = total - targets.iter().sum::<i64>();
        if diff != 0 {
            if let Some(big) = self.attributes.geography().most_populous() {
                targets[big] = (targets[big] + diff).max(0);
                debug!("Location residual {diff:+} applied to {}", locations[big].name);
            }
        }

        let mut assignment = LocationAssignment::default();
        let mut next = ids.iter();
        'fill: for (loc_idx, target) in targets.iter().enumerate() {
            for _ in 0..*target {
                match next.next() {
                    Some(id) => {
                        assignment.by_customer.insert(*id, loc_idx);
                    }
                    None => break 'fill,
                }
            }
        }

        let mut fallback = 0;
        for id in next {
            let idx = rng.next_u64_below(locations.len() as u64) as usize;
            assignment.by_customer.insert(*id, idx);
            fallback += 1;
        }
        if fallback > 0 {
            warn!("{fallback} customers left over after proportional split; placed at random");
        }

        info!("Located {} customers across {} locations", assignment.len(), locations.len());
        Ok(assignment)
    }

    fn context<'a>(
        &'a self,
        customer: &Customer,
        season: Season,
        assignment: &LocationAssignment,
    ) -> PurchaseContext<'a> {
        PurchaseContext {
            season,
            gender: customer.gender,
            age_group: Some(customer.age_group()),
            location: assignment
                .get(customer.id)
                .and_then(|idx| self.attributes.geography().get(idx)),
        }
    }

    /// `previous_purchases` records per customer, dated in ascending order.
    pub fn process_past_purchases(
        &self,
        customers: &[Customer],
        assignment: &LocationAssignment,
        rng: &mut SynthRng,
    ) -> SynthResult<Vec<PurchaseRecord>> {
        let expected: usize = customers.iter().map(|c| c.previous_purchases as usize).sum();
        info!("Generating {expected} past purchase records");

        let mut records = Vec::with_capacity(expected);
        for customer in customers {
            let n = customer.previous_purchases as usize;
            let seasons = self.temporal.assign_seasons(n, rng)?;
            let dates = self.temporal.dates_for_sequence(customer.id, &seasons, rng)?;
            for (season, date) in seasons.into_iter().zip(dates) {
                let ctx = self.context(customer, season, assignment);
                let details = self.attributes.synthesize(&ctx, rng)?;
                records.push(PurchaseRecord {
                    customer_id: customer.id,
                    subscribed: customer.subscribed,
                    date,
                    season,
                    details,
                    promo_used: false,
                    weekday: None,
                    origin: RecordOrigin::Past,
                });
            }
        }
        Ok(records)
    }

    /// Customers per month of the future year. Floors of the sales
    /// shares; a shortfall goes half to November and the rest to
    /// December, a surplus comes out of January and then the following
    /// months in order. The quotas always sum to `customer_count`.
    pub fn future_month_quotas(&self, customer_count: usize) -> [usize; 12] {
        let mut quotas = [0usize; 12];
        for (q, ratio) in quotas.iter_mut().zip(self.future_ratios) {
            *q = (ratio * customer_count as f64).floor() as usize;
        }
        let assigned: usize = quotas.iter().sum();
        if assigned < customer_count {
            let remaining = customer_count - assigned;
            quotas[10] += remaining / 2;
            quotas[11] += remaining - remaining / 2;
        } else if assigned > customer_count {
            let mut excess = assigned - customer_count;
            for q in quotas.iter_mut() {
                let cut = excess.min(*q);
                *q -= cut;
                excess -= cut;
                if excess == 0 {
                    break;
                }
            }
        }
        debug_assert_eq!(quotas.iter().sum::<usize>(), customer_count);
        quotas
    }

    /// One future-year record per customer, months filled by quota from
    /// a shuffled roster.
    pub fn process_future_purchases(
        &self,
        customers: &[Customer],
        assignment: &LocationAssignment,
        rng: &mut SynthRng,
    ) -> SynthResult<Vec<PurchaseRecord>> {
        let quotas = self.future_month_quotas(customers.len());
        let mut order: Vec<usize> = (0..customers.len()).collect();
        rng.shuffle(&mut order);

        let calendar = self.temporal.calendar();
        let mut records = Vec::with_capacity(customers.len());
        let mut start = 0;
        for (month_idx, quota) in quotas.iter().enumerate() {
            let month = month_idx as u32 + 1;
            let end = (start + quota).min(order.len());
            let season = calendar.season_for_month(month)?;
            for &idx in &order[start..end] {
                let customer = &customers[idx];
                let date = self.temporal.future_day(month, rng)?;
                let ctx = self.context(customer, season, assignment);
                let details = self.attributes.synthesize(&ctx, rng)?;
                records.push(PurchaseRecord {
                    customer_id: customer.id,
                    subscribed: customer.subscribed,
                    date,
                    season,
                    details,
                    promo_used: false,
                    weekday: None,
                    origin: RecordOrigin::Future,
                });
            }
            debug!("Month {month}: {} future purchases", end - start);
            start = end;
        }
        info!("Generated {} future purchase records", records.len());
        Ok(records)
    }

    /// Move the chronologically last record of a random slice of
    /// customers into 2022 or 2023. Records come back grouped by customer
    /// in order of first appearance.
    pub fn adjust_last_purchase_dates(
        &self,
        records: &mut [PurchaseRecord],
        rng: &mut SynthRng,
    ) -> SynthResult<LastDateReport> {
        let mut order: Vec<CustomerId> = Vec::new();
        let mut by_customer: HashMap<CustomerId, Vec<usize>> = HashMap::new();
        for (i, r) in records.iter().enumerate() {
            by_customer
                .entry(r.customer_id)
                .or_insert_with(|| {
                    order.push(r.customer_id);
                    Vec::new()
                })
                .push(i);
        }

        let mut shuffled = order.clone();
        rng.shuffle(&mut shuffled);
        let n = shuffled.len();
        let n_2022 = ((n as f64 * self.last_purchase.year_2022_ratio).floor() as usize).min(n);
        let n_2023 = ((n as f64 * self.last_purchase.year_2023_ratio).floor() as usize).min(n - n_2022);

        let mut report = LastDateReport {
            customers: n,
            forced_2022: n_2022,
            forced_2023: n_2023,
            rewritten: 0,
        };

        for (pos, id) in shuffled.iter().take(n_2022 + n_2023).enumerate() {
            let indices = &by_customer[id];
            let Some(last) = last_by_date(records, indices) else { continue };
            let current = records[last].date;
            let new_date = if pos < n_2022 {
                if current.year() <= 2022 {
                    continue;
                }
                let month = if rng.chance(0.5) { 11 } else { 12 };
                random_day(2022, month, rng)?
            } else {
                if current.year() == 2023 {
                    continue;
                }
                let month = rng.range_inclusive(1, 12);
                random_day(2023, month, rng)?
            };
            records[last].date = new_date;
            report.rewritten += 1;
        }

        let rank: HashMap<CustomerId, usize> =
            order.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        records.sort_by_key(|r| rank[&r.customer_id]);

        info!(
            "Last purchase dates: {} customers, {} forced to 2022, {} forced to 2023, {} rewritten",
            report.customers, report.forced_2022, report.forced_2023, report.rewritten
        );
        Ok(report)
    }

    /// Past and future records for the roster, with last dates reshaped.
    pub fn assemble(&self, customers: &[Customer], rng: &mut SynthRng) -> SynthResult<Assembly> {
        let assignment = self.assign_customer_locations(customers, rng)?;
        let mut records = self.process_past_purchases(customers, &assignment, rng)?;
        records.extend(self.process_future_purchases(customers, &assignment, rng)?);
        let last_dates = self.adjust_last_purchase_dates(&mut records, rng)?;
        Ok(Assembly { records, assignment, last_dates })
    }
}

/// Index of the latest-dated record; ties resolve to the later index.
fn last_by_date(records: &[PurchaseRecord], indices: &[usize]) -> Option<usize> {
    indices
        .iter()
        .copied()
        .reduce(|best, i| if records[i].date >= records[best].date { i } else { best })
}

fn random_day(year: i32, month: u32, rng: &mut SynthRng) -> SynthResult<NaiveDate> {
    let day = rng.range_inclusive(1, last_day_of_month(year, month));
    calendar::date(year, month, day)
}
