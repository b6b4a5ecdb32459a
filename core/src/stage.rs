//! Adjustment stage trait.
//!
//! RULE: Every post-generation adjustment implements AdjustmentStage.
//! The adjuster calls apply() on each registered stage in registration
//! order, exactly once per run. Stages see the records as a slice, so
//! they can rewrite fields but never add or drop rows.

use crate::{error::SynthResult, record::PurchaseRecord, rng::SynthRng};
use std::any::Any;

/// What a stage did, for logs and tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageReport {
    pub stage: &'static str,
    pub rows_seen: usize,
    pub rows_changed: usize,
    pub notes: Vec<String>,
}

impl StageReport {
    pub fn new(stage: &'static str, rows_seen: usize) -> Self {
        Self { stage, rows_seen, ..Self::default() }
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

pub trait AdjustmentStage {
    /// Unique stable name for this stage.
    fn name(&self) -> &'static str;

    /// Rewrite fields of `records` in place.
    ///
    /// - `records`: every record of the run, past and future
    /// - `rng`:     the shared stream, continued from generation
    fn apply(&mut self, records: &mut [PurchaseRecord], rng: &mut SynthRng) -> SynthResult<StageReport>;

    /// For downcasting in tests and tooling only.
    fn as_any(&self) -> &dyn Any;
}
