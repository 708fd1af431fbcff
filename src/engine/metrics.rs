//! Computation status and statistics.
//!
//! A [`StatusBuilder`] travels through one computation. Slice computations
//! append errors, warnings and infos to it; the driver records counts and
//! timings. [`StatusBuilder::build`] freezes it into the serialisable
//! [`ComputationStatus`] of the response.
//!
//! Timings are wall-clock and kept as [`Duration`]s until the status is built;
//! the wire form reports whole milliseconds.

use crate::slice::Slice;
use serde::Serialize;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ComputationVariant {
    Single,
    List,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputationStatistics {
    pub computation_time_ms: u64,
    pub number_of_slices: usize,
    pub number_of_slice_computations: usize,
    pub avg_slice_computation_time_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputationStatus {
    pub success: bool,
    pub job_id: String,
    pub rule_file_id: String,
    pub computation_variant: ComputationVariant,
    pub statistics: ComputationStatistics,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub infos: Vec<String>,
    /// One entry per slice set, holding its SPLIT-projected slices. Reporting only.
    #[serde(skip)]
    pub slice_sets: Vec<Vec<Slice>>,
}

#[derive(Debug)]
pub struct StatusBuilder {
    job_id: String,
    rule_file_id: String,
    variant: ComputationVariant,
    started: Instant,
    solve_time: Duration,
    number_of_slices: usize,
    number_of_slice_computations: usize,
    errors: Vec<String>,
    warnings: Vec<String>,
    infos: Vec<String>,
    slice_sets: Vec<Vec<Slice>>,
}

impl StatusBuilder {
    pub fn new(job_id: impl Into<String>, rule_file_id: impl Into<String>, variant: ComputationVariant) -> Self {
        StatusBuilder {
            job_id: job_id.into(),
            rule_file_id: rule_file_id.into(),
            variant,
            started: Instant::now(),
            solve_time: Duration::ZERO,
            number_of_slices: 0,
            number_of_slice_computations: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            infos: Vec::new(),
            slice_sets: Vec::new(),
        }
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn add_info(&mut self, message: impl Into<String>) {
        self.infos.push(message.into());
    }

    pub fn successful(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn infos(&self) -> &[String] {
        &self.infos
    }

    pub(crate) fn record_slices(&mut self, count: usize) {
        self.number_of_slices = count;
    }

    pub(crate) fn record_slice_computation(&mut self, elapsed: Duration) {
        self.number_of_slice_computations += 1;
        self.solve_time += elapsed;
    }

    pub(crate) fn record_slice_sets(&mut self, slice_sets: Vec<Vec<Slice>>) {
        self.slice_sets = slice_sets;
    }

    pub fn build(self) -> ComputationStatus {
        let average = match self.number_of_slice_computations {
            0 => Duration::ZERO,
            n => self.solve_time / u32::try_from(n).unwrap_or(u32::MAX),
        };
        ComputationStatus {
            success: self.errors.is_empty(),
            job_id: self.job_id,
            rule_file_id: self.rule_file_id,
            computation_variant: self.variant,
            statistics: ComputationStatistics {
                computation_time_ms: millis(self.started.elapsed()),
                number_of_slices: self.number_of_slices,
                number_of_slice_computations: self.number_of_slice_computations,
                avg_slice_computation_time_ms: millis(average),
            },
            errors: self.errors,
            warnings: self.warnings,
            infos: self.infos,
            slice_sets: self.slice_sets,
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_is_per_slice_computation() {
        let mut status = StatusBuilder::new("job", "model", ComputationVariant::Single);
        status.record_slices(6);
        status.record_slice_computation(Duration::from_millis(10));
        status.record_slice_computation(Duration::from_millis(30));
        let built = status.build();
        assert!(built.success);
        assert_eq!(built.statistics.number_of_slices, 6);
        assert_eq!(built.statistics.number_of_slice_computations, 2);
        assert_eq!(built.statistics.avg_slice_computation_time_ms, 20);
    }

    #[test]
    fn errors_make_status_unsuccessful() {
        let mut status = StatusBuilder::new("job", "model", ComputationVariant::List);
        status.add_warning("careful");
        status.add_error("boom");
        let json = serde_json::to_value(status.build()).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["computationVariant"], "LIST");
        assert_eq!(json["statistics"]["avgSliceComputationTimeMs"], 0);
        assert_eq!(json["warnings"][0], "careful");
        assert!(json.get("sliceSets").is_none());
    }
}
