//! Gap support evaluation
//!
//! Reads aligned to both the left and right flank of a gap are paired by read name, and each pair
//! implies a gap span from the end of the left flank alignment to the start of the right flank
//! alignment in read coordinates. A gap is supported when enough reads pair across it, and enough
//! of those pairs imply a span within the wiggle window around the nominal gap size.
//!

use std::collections::HashSet;

use itertools::iproduct;
use log::debug;

use crate::errors::GapSupportResult;
use crate::flank_alignment::{FlankAlignmentRecord, FlankAlignmentSource};
use crate::gap_index::{FlankSide, Gap, GapIndex};
use crate::log_utils::debug_msg;
use crate::run_stats::GapSupportStats;

pub struct EvaluationSettings {
    /// Minimum read count required both before and after the span filter
    pub min_reads: usize,

    /// Fractional span tolerance around the nominal gap size, in [0,1)
    pub wiggle: f64,

    /// If true, keep only the first candidate pair formed for each read name
    pub dedup_read_pairs: bool,

    /// Print span decisions for the gap with this label
    pub debug_gap_label: Option<String>,
}

/// Open interval of read span values accepted for one gap
///
#[derive(Debug)]
pub struct SpanWindow {
    pub min: f64,
    pub max: f64,
}

impl SpanWindow {
    pub fn new(gap_size: i64, wiggle: f64) -> Self {
        let gap_size = gap_size as f64;
        Self {
            min: gap_size - gap_size * wiggle,
            max: gap_size + gap_size * wiggle,
        }
    }

    /// True if span is strictly inside the window
    pub fn contains(&self, span: i64) -> bool {
        let span = span as f64;
        self.min < span && span < self.max
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
pub enum GapSupportStatus {
    Supported,

    /// Too few reads aligned to both flanks
    UnsupportedRaw,

    /// Too few flank-pairing reads implied a span within the wiggle window
    UnsupportedWiggle,
}

/// Read sequence bridging a gap
///
#[derive(Clone, Debug, PartialEq)]
pub struct SupportedRead {
    pub read_id: String,
    pub seq: Vec<u8>,

    /// Phred base quality values corresponding to `seq`
    pub qual: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SupportedGapRecord {
    pub gap_label: String,
    pub reads: Vec<SupportedRead>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SummaryEntry {
    pub gap_label: String,
    pub support_count: usize,
}

pub struct GapEvaluation {
    pub status: GapSupportStatus,

    /// Number of left/right flank record pairs sharing a read name
    pub candidate_pair_count: usize,

    /// Reads accepted by the span filter, only retained for supported gaps
    pub reads: Vec<SupportedRead>,
}

/// All supported gap output from one evaluation, in scaffold and gap order
///
#[derive(Default)]
pub struct GapSupportReport {
    pub supported_gaps: Vec<SupportedGapRecord>,
    pub summary: Vec<SummaryEntry>,
    pub stats: GapSupportStats,
}

/// Pair every left flank record with every right flank record from the same read
///
/// Pairs are returned in left-major order. Reads with multiple alignments to a flank contribute
/// one pair for each combination unless `dedup_read_pairs` is set, in which case only the first
/// pair formed for each read name is kept.
///
fn get_candidate_pairs<'a>(
    left_records: &'a [FlankAlignmentRecord],
    right_records: &'a [FlankAlignmentRecord],
    dedup_read_pairs: bool,
) -> Vec<(&'a FlankAlignmentRecord, &'a FlankAlignmentRecord)> {
    let pairs = iproduct!(left_records.iter(), right_records.iter())
        .filter(|(l, r)| l.read_id == r.read_id);

    if dedup_read_pairs {
        let mut observed_reads = HashSet::new();
        pairs
            .filter(|&(l, _)| observed_reads.insert(l.read_id.as_str()))
            .collect()
    } else {
        pairs.collect()
    }
}

/// Extract the read sequence between the left and right flank alignments
///
/// Sequence and qualities are always taken from the left flank record. The extraction range is
/// clipped to the end of the left record's sequence.
///
fn get_bridging_read(l: &FlankAlignmentRecord, r: &FlankAlignmentRecord) -> SupportedRead {
    let end = std::cmp::min(r.query_start, l.seq.len());
    let start = std::cmp::min(l.query_end, end);
    let qual_end = std::cmp::min(end, l.qual.len());
    let qual_start = std::cmp::min(start, qual_end);
    SupportedRead {
        read_id: l.read_id.clone(),
        seq: l.seq[start..end].to_vec(),
        qual: l.qual[qual_start..qual_end].to_vec(),
    }
}

/// Classify support for a single gap from its left and right flank alignment records
///
pub fn evaluate_gap(
    gap: &Gap,
    left_records: &[FlankAlignmentRecord],
    right_records: &[FlankAlignmentRecord],
    settings: &EvaluationSettings,
) -> GapEvaluation {
    let gap_label = gap.label();
    let debug = settings.debug_gap_label.as_deref() == Some(gap_label.as_str());

    let candidate_pairs =
        get_candidate_pairs(left_records, right_records, settings.dedup_read_pairs);
    let candidate_pair_count = candidate_pairs.len();

    debug_msg!(
        debug,
        "Gap {gap_label} size: {} left records: {} right records: {} candidate pairs: {candidate_pair_count}",
        gap.size(),
        left_records.len(),
        right_records.len()
    );

    if candidate_pair_count < settings.min_reads {
        return GapEvaluation {
            status: GapSupportStatus::UnsupportedRaw,
            candidate_pair_count,
            reads: Vec::new(),
        };
    }

    let span_window = SpanWindow::new(gap.size(), settings.wiggle);
    let mut reads = Vec::new();
    for (l, r) in candidate_pairs {
        let span = r.query_start as i64 - l.query_end as i64;
        let is_accepted = span_window.contains(span);

        debug_msg!(
            debug,
            "Gap {gap_label} read {} left end: {} ({}) right start: {} ({}) span: {span} window: {span_window:?} accepted: {is_accepted}",
            l.read_id,
            l.query_end,
            l.ref_name,
            r.query_start,
            r.ref_name
        );

        if is_accepted {
            reads.push(get_bridging_read(l, r));
        }
    }

    if reads.len() < settings.min_reads {
        return GapEvaluation {
            status: GapSupportStatus::UnsupportedWiggle,
            candidate_pair_count,
            reads: Vec::new(),
        };
    }

    GapEvaluation {
        status: GapSupportStatus::Supported,
        candidate_pair_count,
        reads,
    }
}

/// Evaluate support for every gap in the gap index
///
/// # Arguments
/// * `scaffold_names` - Scaffolds to evaluate, in output order. Scaffolds without gaps are skipped.
/// * `left_store` - Alignments to all left gap flanks
/// * `right_store` - Alignments to all right gap flanks
///
pub fn evaluate_gap_support(
    gap_index: &GapIndex,
    scaffold_names: &[String],
    left_store: &mut impl FlankAlignmentSource,
    right_store: &mut impl FlankAlignmentSource,
    settings: &EvaluationSettings,
) -> GapSupportResult<GapSupportReport> {
    let mut report = GapSupportReport::default();

    for scaffold in scaffold_names {
        report.stats.scaffold_count += 1;

        let gaps = match gap_index.get_scaffold_gaps(scaffold) {
            Some(x) if !x.is_empty() => x,
            _ => {
                report.stats.scaffolds_without_gaps += 1;
                continue;
            }
        };

        for gap in gaps {
            let left_records = left_store.fetch_flank_records(&gap.flank_ref_name(FlankSide::Left))?;
            let right_records =
                right_store.fetch_flank_records(&gap.flank_ref_name(FlankSide::Right))?;

            let evaluation = evaluate_gap(gap, &left_records, &right_records, settings);

            let gap_label = gap.label();
            debug!(
                "Gap {gap_label} status: {} candidate pairs: {} accepted reads: {}",
                evaluation.status,
                evaluation.candidate_pair_count,
                evaluation.reads.len()
            );

            report.stats.add_gap_status(evaluation.status);

            if evaluation.status == GapSupportStatus::Supported {
                report.stats.supporting_read_count += evaluation.reads.len();
                report.summary.push(SummaryEntry {
                    gap_label: gap_label.clone(),
                    support_count: evaluation.reads.len(),
                });
                report.supported_gaps.push(SupportedGapRecord {
                    gap_label,
                    reads: evaluation.reads,
                });
            }
        }
    }

    Ok(report)
}
