//! Per-pass counters for filtered reads

use crate::models::{Observation, RejectReason, Verdict};
use std::collections::BTreeMap;
use std::time::Duration;

/// Counts of lines seen, accepted and rejected during one pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterStats {
    pub lines_read: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub rejections: BTreeMap<RejectReason, usize>,
    pub elapsed: Duration,
}

impl FilterStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the verdict of one line
    pub fn record(&mut self, verdict: &Verdict) {
        self.lines_read += 1;
        match verdict.reject_reason() {
            None => self.accepted += 1,
            Some(reason) => {
                self.rejected += 1;
                *self.rejections.entry(reason).or_insert(0) += 1;
            }
        }
    }

    pub fn rejections_for(&self, reason: RejectReason) -> usize {
        self.rejections.get(&reason).copied().unwrap_or(0)
    }

    /// Fraction of lines accepted, 0.0 for an empty pass
    pub fn acceptance_rate(&self) -> f64 {
        if self.lines_read == 0 {
            0.0
        } else {
            self.accepted as f64 / self.lines_read as f64
        }
    }

    /// Fold the counters of another pass into this one
    pub fn merge(&mut self, other: &FilterStats) {
        self.lines_read += other.lines_read;
        self.accepted += other.accepted;
        self.rejected += other.rejected;
        for (reason, count) in &other.rejections {
            *self.rejections.entry(*reason).or_insert(0) += count;
        }
        self.elapsed += other.elapsed;
    }

    pub fn summary(&self) -> String {
        format!(
            "{} lines read | {} accepted ({:.1}%) | {} rejected",
            self.lines_read,
            self.accepted,
            self.acceptance_rate() * 100.0,
            self.rejected
        )
    }
}

/// Observations collected by a filtered read
#[derive(Debug, Clone, Default)]
pub struct ReadOutcome {
    pub observations: Vec<Observation>,
    pub stats: FilterStats,
}

impl ReadOutcome {
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}
