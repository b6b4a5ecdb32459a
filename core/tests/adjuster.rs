//! Post-generation adjustment stages, alone and as a pipeline.

use chrono::{Datelike, NaiveDate};
use purchase_synth_core::{
    adjuster::{
        clamp_amounts, CovidEffect, DistributionAdjuster, HolidayEffect, PromoCodes, SalesRedistribution,
        WeekdayAnnotation,
    },
    calendar::Holiday,
    config::SynthConfig,
    customer::Customer,
    engine::SynthEngine,
    record::{PurchaseDetails, PurchaseRecord, RecordOrigin, WeekdayInfo},
    rng::SynthRng,
    stage::AdjustmentStage,
    types::{Gender, Season, Size},
};
use std::collections::HashMap;

fn record(customer_id: u64, subscribed: bool, date: NaiveDate) -> PurchaseRecord {
    PurchaseRecord {
        customer_id,
        subscribed,
        date,
        season: Season::Fall,
        details: PurchaseDetails {
            category: "Accessories".to_string(),
            item: "Belt".to_string(),
            amount: 50.0,
            color: "Black".to_string(),
            size: Size::L,
            rating: 3.5,
            shipping_type: "Standard".to_string(),
            payment_method: "Cash".to_string(),
        },
        promo_used: false,
        weekday: None,
        origin: RecordOrigin::Past,
    }
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn roster(n: u64) -> Vec<Customer> {
    (1..=n)
        .map(|id| {
            let gender = if id % 3 == 0 { None } else { Some(Gender::Female) };
            Customer::new(id, gender, 19 + (id as u32 * 5) % 50, id % 2 == 0, (id as u32 % 9) + 1)
        })
        .collect()
}

#[test]
fn builtin_pipeline_runs_stages_in_order() {
    let config = SynthConfig::builtin().expect("builtin");
    let adjuster = DistributionAdjuster::build(&config).expect("build");
    assert_eq!(
        adjuster.stage_names(),
        vec![
            "holiday_effect",
            "covid_effect",
            "sales_redistribution",
            "promo_codes",
            "weekday_annotation"
        ]
    );
    let holidays = adjuster.stage::<HolidayEffect>().expect("holiday stage");
    assert!(holidays.holidays().iter().any(|h| h.date == ymd(2023, 11, 24)), "Black Friday 2023");
}

#[test]
fn full_run_keeps_invariants() {
    let customers = roster(80);
    let run = SynthEngine::build_default(2024).expect("engine").run(&customers).expect("run");

    let expected: usize = customers.iter().map(|c| c.previous_purchases as usize + 1).sum();
    assert_eq!(run.records.len(), expected, "stages must not add or drop rows");

    let mut per_customer: HashMap<u64, (usize, usize, bool)> = HashMap::new();
    for r in &run.records {
        assert!((20.0..=100.0).contains(&r.details.amount), "amount {}", r.details.amount);
        assert_eq!(r.details.amount, (r.details.amount * 100.0).round() / 100.0);
        assert!((2022..=2024).contains(&r.year()));

        let info = r.weekday.expect("weekday annotated");
        assert_eq!(info, WeekdayInfo::from_date(r.date));
        assert_eq!(info.number, r.date.weekday().number_from_monday());
        assert_eq!(info.weekend, info.number >= 6);

        let entry = per_customer.entry(r.customer_id).or_insert((0, 0, r.subscribed));
        entry.0 += 1;
        if r.promo_used {
            entry.1 += 1;
        }
    }
    for (id, (count, promos, subscribed)) in per_customer {
        let ratio = if subscribed { 0.35 } else { 0.15 };
        assert_eq!(promos, (count as f64 * ratio).floor() as usize, "customer {id}");
    }
    assert_eq!(run.reports.len(), 5);
}

#[test]
fn covid_effect_touches_only_its_year() {
    let mut records: Vec<PurchaseRecord> = (0..100)
        .map(|i| record(i, false, ymd(2022, 5, 1 + (i % 28) as u32)))
        .chain((100..200).map(|i| record(i, false, ymd(2023, 5, 1 + (i % 28) as u32))))
        .collect();
    let config = SynthConfig::builtin().expect("builtin");
    let mut stage = CovidEffect::new(config.generation.covid.clone());
    let report = stage.apply(&mut records, &mut SynthRng::new(12)).expect("covid");

    assert_eq!(report.rows_seen, 100);
    assert_eq!(report.rows_changed, 15 + 25);
    let online = records[..100].iter().filter(|r| r.details.shipping_type != "Standard").count();
    assert_eq!(online, 25);
    let changed = records[..100].iter().filter(|r| r.details.amount != 50.0).count();
    assert!((25..=40).contains(&changed), "{changed} amounts changed");
    for r in &records[100..] {
        assert_eq!(r.details.amount, 50.0);
        assert_eq!(r.details.shipping_type, "Standard");
        assert_eq!(r.details.payment_method, "Cash");
    }
}

#[test]
fn redistribution_moves_january_excess_to_year_end() {
    let config = SynthConfig::builtin().expect("builtin");
    let ratios = config.sales.target_ratios(2024).expect("2024 sales");
    let mut records: Vec<PurchaseRecord> = (0..500)
        .map(|i| record(i, false, ymd(2024, 1, 1 + (i % 31) as u32)))
        .chain((500..1000).map(|i| record(i, false, ymd(2024, 6, 1 + (i % 30) as u32))))
        .collect();

    let mut stage = SalesRedistribution::new(2024, ratios, config.generation.redistribution);
    stage.apply(&mut records, &mut SynthRng::new(5)).expect("redistribute");

    let target = (ratios[0] * 1000.0).floor() as usize;
    let to_move = 500 - target;
    let in_month = |m| records.iter().filter(|r| r.date.month() == m).count();
    assert_eq!(in_month(1), target);
    assert_eq!(in_month(11), to_move / 2);
    assert_eq!(in_month(12), to_move - to_move / 2);
    assert_eq!(in_month(6), 500);
    assert_eq!(stage.moved_total(), to_move);
    assert!(records.iter().all(|r| r.year() == 2024));
}

#[test]
fn redistribution_leaves_balanced_january_alone() {
    let config = SynthConfig::builtin().expect("builtin");
    let ratios = config.sales.target_ratios(2024).expect("2024 sales");
    let mut records: Vec<PurchaseRecord> =
        (0..100).map(|i| record(i, false, ymd(2024, 3, 1 + (i % 31) as u32))).collect();
    let before = records.clone();
    let mut stage = SalesRedistribution::new(2024, ratios, config.generation.redistribution);
    let report = stage.apply(&mut records, &mut SynthRng::new(5)).expect("redistribute");
    assert_eq!(report.rows_changed, 0);
    assert_eq!(records, before);
}

#[test]
fn promo_counts_follow_subscription_ratios() {
    let config = SynthConfig::builtin().expect("builtin");
    let mut records: Vec<PurchaseRecord> = (0..10)
        .map(|d| record(1, true, ymd(2023, 2, 1 + d)))
        .chain((0..10).map(|d| record(2, false, ymd(2023, 2, 1 + d))))
        .chain((0..2).map(|d| record(3, true, ymd(2023, 2, 1 + d))))
        .collect();
    records[15].promo_used = true;

    let mut stage = PromoCodes::new(config.generation.promo);
    stage.apply(&mut records, &mut SynthRng::new(2)).expect("promo");

    let used = |id| records.iter().filter(|r| r.customer_id == id && r.promo_used).count();
    assert_eq!(used(1), 3);
    assert_eq!(used(2), 1);
    assert_eq!(used(3), 0);
}

#[test]
fn holiday_effect_raises_late_december_and_skips_quiet_days() {
    let christmas = Holiday { date: ymd(2023, 12, 25), name: "Christmas".to_string(), weight: 3.0 };
    let mut stage = HolidayEffect::new(vec![christmas], 2.5, 3.0);
    let mut records = vec![record(1, false, ymd(2023, 12, 24)), record(2, false, ymd(2023, 3, 8))];
    stage.apply(&mut records, &mut SynthRng::new(10)).expect("holiday");

    assert!(records[0].details.amount >= 65.0, "late December bump: {}", records[0].details.amount);
    assert!(records[0].details.amount <= 100.0);
    assert_eq!(records[1].details.amount, 50.0);
}

#[test]
fn weekday_annotation_matches_dates() {
    let mut records = vec![record(1, false, ymd(2024, 3, 2)), record(1, false, ymd(2024, 3, 4))];
    WeekdayAnnotation.apply(&mut records, &mut SynthRng::new(0)).expect("weekday");
    let saturday = records[0].weekday.expect("annotated");
    assert_eq!((saturday.number, saturday.name, saturday.weekend), (6, "Saturday", true));
    let monday = records[1].weekday.expect("annotated");
    assert_eq!((monday.number, monday.name, monday.weekend), (1, "Monday", false));
}

#[test]
fn final_clamp_lifts_discounted_amounts_to_the_floor() {
    let mut records =
        vec![record(1, false, ymd(2023, 7, 1)), record(2, false, ymd(2023, 7, 2)), record(3, false, ymd(2023, 7, 3))];
    records[0].details.amount = 18.4;
    records[1].details.amount = 104.25;
    records[2].details.amount = 37.5;
    clamp_amounts(&mut records);
    assert_eq!(records[0].details.amount, 20.0);
    assert_eq!(records[1].details.amount, 100.0);
    assert_eq!(records[2].details.amount, 37.5);
}
