//! synth-runner: headless purchase-log synthesizer.
//!
//! Usage:
//!   synth-runner --seed 42 --roster customers.json --out purchases.jsonl
//!   synth-runner --data-dir ./data --roster customers.json --keyed-sequences

use anyhow::{Context, Result};
use chrono::Datelike;
use purchase_synth_core::{
    config::SynthConfig,
    customer::Customer,
    engine::SynthEngine,
    record::OutputRow,
    rng::KeyedReseed,
};
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs::File;
use std::io::{BufWriter, Write};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let keyed_sequences = args.iter().any(|a| a == "--keyed-sequences");
    let roster_path = str_arg(&args, "--roster", "./data/roster.json");
    let data_dir = str_arg(&args, "--data-dir", "./data");
    let out_path = str_arg(&args, "--out", "purchases.jsonl");

    let config = SynthConfig::load(data_dir)?;
    let seed = parse_arg(&args, "--seed", config.generation.seed);

    println!("purchase-synth — synth-runner");
    println!("  seed:      {seed}");
    println!("  roster:    {roster_path}");
    println!("  data_dir:  {data_dir}");
    println!("  out:       {out_path}");
    println!();

    let roster = std::fs::read_to_string(roster_path)
        .map_err(|e| anyhow::anyhow!("Cannot read {roster_path}: {e}"))?;
    let customers: Vec<Customer> =
        serde_json::from_str(&roster).with_context(|| format!("Cannot parse {roster_path}"))?;
    log::info!("Loaded {} customers from {roster_path}", customers.len());

    let mut engine = SynthEngine::new(seed, config)?;
    if keyed_sequences {
        engine = engine.with_sequence_seeding(Box::new(KeyedReseed));
    }
    let run = engine.run(&customers)?;

    let by_id: HashMap<u64, &Customer> = customers.iter().map(|c| (c.id, c)).collect();
    let file = File::create(out_path).map_err(|e| anyhow::anyhow!("Cannot create {out_path}: {e}"))?;
    let mut out = BufWriter::new(file);
    for record in &run.records {
        let customer = by_id
            .get(&record.customer_id)
            .with_context(|| format!("record for unknown customer {}", record.customer_id))?;
        serde_json::to_writer(&mut out, &OutputRow::new(customer, record))?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    let mut per_year: BTreeMap<i32, usize> = BTreeMap::new();
    for record in &run.records {
        *per_year.entry(record.date.year()).or_default() += 1;
    }
    let promo = run.records.iter().filter(|r| r.promo_used).count();

    println!("=== RUN SUMMARY ===");
    println!("  customers:      {}", customers.len());
    println!("  records:        {}", run.records.len());
    for (year, count) in &per_year {
        println!("  {year}:           {count}");
    }
    println!("  promo used:     {promo}");
    println!(
        "  last dates:     {} to 2022, {} to 2023 ({} rewritten)",
        run.last_dates.forced_2022, run.last_dates.forced_2023, run.last_dates.rewritten
    );
    println!();
    println!("=== STAGES ===");
    for report in &run.reports {
        println!(
            "  {:<22} {:>7} seen {:>7} changed  {}",
            report.stage,
            report.rows_seen,
            report.rows_changed,
            report.notes.join("; ")
        );
    }
    println!();
    println!("Wrote {out_path}");
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn str_arg<'a>(args: &'a [String], flag: &str, default: &'a str) -> &'a str {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
        .unwrap_or(default)
}
