//! The synthesis engine.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Location assignment        (PurchaseAssembler)
//!   2. Past purchases             (PurchaseAssembler)
//!   3. Future-year purchases      (PurchaseAssembler)
//!   4. Last-purchase-date reshape (PurchaseAssembler)
//!   5. Adjustment stages          (DistributionAdjuster, see adjuster.rs)
//!
//! RULES:
//!   - One SynthRng, seeded once here, flows through every step.
//!   - No step reads the wall clock or any platform RNG.
//!   - Any error aborts the run; there is no partial output.

use crate::{
    adjuster::DistributionAdjuster,
    assembler::{LastDateReport, LocationAssignment, PurchaseAssembler},
    config::SynthConfig,
    customer::Customer,
    error::SynthResult,
    record::PurchaseRecord,
    rng::{ReseedStrategy, SynthRng},
    stage::StageReport,
};
use log::info;

/// Everything a run produces.
pub struct SynthRun {
    pub records: Vec<PurchaseRecord>,
    pub assignment: LocationAssignment,
    pub last_dates: LastDateReport,
    pub reports: Vec<StageReport>,
}

pub struct SynthEngine {
    seed: u64,
    config: SynthConfig,
    assembler: PurchaseAssembler,
}

impl SynthEngine {
    pub fn new(seed: u64, config: SynthConfig) -> SynthResult<Self> {
        config.validate()?;
        let assembler = PurchaseAssembler::from_config(&config)?;
        Ok(Self { seed, config, assembler })
    }

    /// Engine over the built-in tables.
    pub fn build_default(seed: u64) -> SynthResult<Self> {
        Self::new(seed, SynthConfig::builtin()?)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn assembler(&self) -> &PurchaseAssembler {
        &self.assembler
    }

    /// Reseed sequence draws with `strategy` instead of the shared stream.
    pub fn with_sequence_seeding(mut self, strategy: Box<dyn ReseedStrategy>) -> Self {
        info!("Sequence date draws use {} seeding", strategy.name());
        self.assembler.temporal_mut().set_sequence_seeding(strategy);
        self
    }

    pub fn run(&self, customers: &[Customer]) -> SynthResult<SynthRun> {
        let mut rng = SynthRng::new(self.seed);
        info!("Synthesizing purchases for {} customers (seed {})", customers.len(), self.seed);

        let assembly = self.assembler.assemble(customers, &mut rng)?;
        let mut records = assembly.records;
        let generated = records.len();

        let mut adjuster = DistributionAdjuster::build(&self.config)?;
        let reports = adjuster.apply_all(&mut records, &mut rng)?;
        debug_assert_eq!(records.len(), generated);

        info!("Run complete: {} records", records.len());
        Ok(SynthRun {
            records,
            assignment: assembly.assignment,
            last_dates: assembly.last_dates,
            reports,
        })
    }
}
