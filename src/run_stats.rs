//! Track stats for the whole gapsupport run
//!

use std::fs::File;

use camino::Utf8Path;
use log::info;
use serde::{Deserialize, Serialize};

use crate::errors::{GapSupportError, GapSupportResult};
use crate::filenames::RUN_STATS_FILENAME;
use crate::gap_support::GapSupportStatus;

#[derive(Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct GapSupportStats {
    /// All scaffolds visited, including those without gaps
    pub scaffold_count: usize,
    pub scaffolds_without_gaps: usize,

    pub gap_count: usize,
    pub supported_gap_count: usize,

    /// Gaps with too few reads aligned to both flanks
    pub unsupported_raw_gap_count: usize,

    /// Gaps with too few reads passing the span filter
    pub unsupported_wiggle_gap_count: usize,

    /// Total reads written for all supported gaps
    pub supporting_read_count: usize,
}

impl GapSupportStats {
    pub fn add_gap_status(&mut self, status: GapSupportStatus) {
        self.gap_count += 1;
        match status {
            GapSupportStatus::Supported => self.supported_gap_count += 1,
            GapSupportStatus::UnsupportedRaw => self.unsupported_raw_gap_count += 1,
            GapSupportStatus::UnsupportedWiggle => self.unsupported_wiggle_gap_count += 1,
        }
    }

    pub fn log_summary(&self) {
        info!(
            "Evaluated {} gaps on {} scaffolds ({} scaffolds without gaps)",
            self.gap_count,
            self.scaffold_count - self.scaffolds_without_gaps,
            self.scaffolds_without_gaps
        );
        info!(
            "Supported gaps: {} ({} supporting reads)",
            self.supported_gap_count, self.supporting_read_count
        );
        info!(
            "Unsupported gaps: {} with insufficient flank-pairing reads, {} with insufficient reads in the span window",
            self.unsupported_raw_gap_count, self.unsupported_wiggle_gap_count
        );
    }
}

/// Write run_stats structure out in json format
pub fn write_support_run_stats(
    output_dir: &Utf8Path,
    run_stats: &GapSupportStats,
) -> GapSupportResult<()> {
    let filename = output_dir.join(RUN_STATS_FILENAME);

    info!("Writing run statistics to file: '{filename}'");

    let f = File::create(&filename).map_err(|e| GapSupportError::io(&filename, e))?;
    serde_json::to_writer_pretty(&f, &run_stats)
        .map_err(|e| GapSupportError::io(&filename, e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_gap_status() {
        let mut stats = GapSupportStats::default();
        stats.add_gap_status(GapSupportStatus::Supported);
        stats.add_gap_status(GapSupportStatus::UnsupportedWiggle);
        stats.add_gap_status(GapSupportStatus::UnsupportedWiggle);
        stats.add_gap_status(GapSupportStatus::UnsupportedRaw);

        assert_eq!(stats.gap_count, 4);
        assert_eq!(stats.supported_gap_count, 1);
        assert_eq!(stats.unsupported_raw_gap_count, 1);
        assert_eq!(stats.unsupported_wiggle_gap_count, 2);
    }

    #[test]
    fn test_write_support_run_stats() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = Utf8Path::from_path(dir.path()).unwrap();

        let stats = GapSupportStats {
            scaffold_count: 3,
            gap_count: 2,
            supported_gap_count: 1,
            unsupported_raw_gap_count: 1,
            supporting_read_count: 4,
            ..Default::default()
        };
        write_support_run_stats(output_dir, &stats).unwrap();

        let file = File::open(output_dir.join(RUN_STATS_FILENAME)).unwrap();
        let read_stats: GapSupportStats = serde_json::from_reader(file).unwrap();
        assert_eq!(read_stats, stats);
    }
}
