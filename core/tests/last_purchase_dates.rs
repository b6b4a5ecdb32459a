//! Reshaping each customer's last purchase date.

use chrono::{Datelike, NaiveDate};
use purchase_synth_core::{
    assembler::PurchaseAssembler,
    config::SynthConfig,
    record::{PurchaseDetails, PurchaseRecord, RecordOrigin},
    rng::SynthRng,
    types::{Season, Size},
};

fn record(customer_id: u64, date: NaiveDate) -> PurchaseRecord {
    PurchaseRecord {
        customer_id,
        subscribed: false,
        date,
        season: Season::Summer,
        details: PurchaseDetails {
            category: "Clothing".to_string(),
            item: "Shirt".to_string(),
            amount: 50.0,
            color: "Blue".to_string(),
            size: Size::M,
            rating: 4.0,
            shipping_type: "Standard".to_string(),
            payment_method: "Cash".to_string(),
        },
        promo_used: false,
        weekday: None,
        origin: RecordOrigin::Future,
    }
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn assembler_with(ratio_2022: f64, ratio_2023: f64) -> PurchaseAssembler {
    let mut config = SynthConfig::builtin().expect("builtin");
    config.generation.last_purchase.year_2022_ratio = ratio_2022;
    config.generation.last_purchase.year_2023_ratio = ratio_2023;
    PurchaseAssembler::from_config(&config).expect("assembler")
}

#[test]
fn two_hundred_customers_split_five_and_eleven_percent() {
    let assembler = assembler_with(0.05, 0.11);
    let mut records: Vec<PurchaseRecord> =
        (1..=200).map(|id| record(id, ymd(2024, 6, 15))).collect();

    let report = assembler
        .adjust_last_purchase_dates(&mut records, &mut SynthRng::new(42))
        .expect("adjust");

    assert_eq!(report.customers, 200);
    assert_eq!(report.forced_2022, 10);
    assert_eq!(report.forced_2023, 22);
    assert_eq!(report.rewritten, 32);

    let in_year = |y| records.iter().filter(|r| r.year() == y).count();
    assert_eq!(in_year(2022), 10);
    assert_eq!(in_year(2023), 22);
    assert_eq!(in_year(2024), 168);
    for r in records.iter().filter(|r| r.year() == 2022) {
        assert!(matches!(r.date.month(), 11 | 12), "2022 rewrite landed in {}", r.date);
    }
    assert_eq!(records.len(), 200);
}

#[test]
fn only_the_last_record_moves() {
    let assembler = assembler_with(1.0, 0.0);
    let mut records = vec![
        record(7, ymd(2022, 3, 1)),
        record(7, ymd(2024, 5, 5)),
        record(7, ymd(2023, 8, 9)),
    ];
    let report = assembler
        .adjust_last_purchase_dates(&mut records, &mut SynthRng::new(3))
        .expect("adjust");

    assert_eq!(report.rewritten, 1);
    assert_eq!(records[0].date, ymd(2022, 3, 1));
    assert_eq!(records[2].date, ymd(2023, 8, 9));
    assert_eq!(records[1].year(), 2022);
    assert!(matches!(records[1].date.month(), 11 | 12));
    // Season is left as generated.
    assert_eq!(records[1].season, Season::Summer);
}

#[test]
fn customers_already_in_target_year_are_left_alone() {
    let assembler = assembler_with(0.0, 1.0);
    let mut records = vec![record(1, ymd(2023, 4, 4)), record(2, ymd(2024, 4, 4))];
    let report = assembler
        .adjust_last_purchase_dates(&mut records, &mut SynthRng::new(8))
        .expect("adjust");
    assert_eq!(report.forced_2023, 2);
    assert_eq!(report.rewritten, 1);
    assert_eq!(records[0].date, ymd(2023, 4, 4));
    assert_eq!(records[1].year(), 2023);
}

#[test]
fn records_come_back_grouped_by_customer() {
    let assembler = assembler_with(0.0, 0.0);
    let mut records = vec![
        record(2, ymd(2022, 1, 1)),
        record(1, ymd(2022, 2, 1)),
        record(2, ymd(2023, 1, 1)),
        record(1, ymd(2024, 2, 1)),
        record(3, ymd(2024, 3, 1)),
    ];
    assembler
        .adjust_last_purchase_dates(&mut records, &mut SynthRng::new(0))
        .expect("adjust");
    let ids: Vec<u64> = records.iter().map(|r| r.customer_id).collect();
    assert_eq!(ids, vec![2, 2, 1, 1, 3]);
    // Order within a customer is preserved.
    assert_eq!(records[0].date, ymd(2022, 1, 1));
    assert_eq!(records[1].date, ymd(2023, 1, 1));
}
