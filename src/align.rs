//! Flank alignment pipeline
//!
//! Reads are aligned to the left and right gap flank sequences, and each alignment file is
//! coordinate sorted and indexed to produce the two flank alignment stores used for gap support
//! evaluation. The stores' locations are recorded in the output directory so that the support step
//! can find them.
//!

use std::fs::File;

use camino::{Utf8Path, Utf8PathBuf};
use log::info;
use rust_htslib::bam;
use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, try_with};

use crate::cli;
use crate::errors::{GapSupportError, GapSupportResult};
use crate::external_tools::run_external_tool;
use crate::filenames::FLANK_STORES_FILENAME;
use crate::gap_index::FlankSide;

/// Locations of the indexed left and right flank alignment stores
///
/// Relative paths recorded in the align output directory are relative to that directory.
///
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct FlankStorePaths {
    pub left: Utf8PathBuf,
    pub right: Utf8PathBuf,
}

impl FlankStorePaths {
    pub fn get(&self, side: FlankSide) -> &Utf8Path {
        match side {
            FlankSide::Left => &self.left,
            FlankSide::Right => &self.right,
        }
    }
}

/// Write flank store locations to the align output directory in json format
pub fn write_flank_store_paths(
    align_dir: &Utf8Path,
    flank_stores: &FlankStorePaths,
) -> GapSupportResult<()> {
    let filename = align_dir.join(FLANK_STORES_FILENAME);

    info!("Writing flank alignment store locations to file: '{filename}'");

    let f = File::create(&filename).map_err(|e| GapSupportError::io(&filename, e))?;
    serde_json::to_writer_pretty(&f, flank_stores)
        .map_err(|e| GapSupportError::io(&filename, e.into()))
}

pub fn read_flank_store_paths(align_dir: &Utf8Path) -> SimpleResult<FlankStorePaths> {
    use std::io::BufReader;

    let filename = align_dir.join(FLANK_STORES_FILENAME);
    let file = try_with!(
        File::open(&filename),
        "Unable to read align-step flank store json file: '{filename}'"
    );

    let reader = BufReader::new(file);
    let flank_stores: FlankStorePaths = try_with!(
        serde_json::from_reader(reader),
        "Unable to parse align-step flank store locations from json file: '{filename}'"
    );

    // Absolute paths are kept as-is by join
    Ok(FlankStorePaths {
        left: align_dir.join(&flank_stores.left),
        right: align_dir.join(&flank_stores.right),
    })
}

/// File locations for all stages of one flank side's alignment
///
struct FlankAlignmentFiles {
    side: FlankSide,
    flanks: Utf8PathBuf,
    aligned: Utf8PathBuf,
    sorted: Utf8PathBuf,
}

impl FlankAlignmentFiles {
    fn new(output_dir: &Utf8Path, side: FlankSide, flanks: &Utf8Path) -> Self {
        Self {
            side,
            flanks: flanks.to_path_buf(),
            aligned: output_dir.join(format!("aligned_gaps.{side}.bam")),
            sorted: output_dir.join(get_sorted_filename(side)),
        }
    }
}

/// Name of the sorted and indexed flank alignment store within the align output directory
fn get_sorted_filename(side: FlankSide) -> String {
    format!("sorted_gaps.{side}.bam")
}

fn get_aligner_args(
    settings: &cli::AlignSettings,
    thread_count: usize,
    files: &FlankAlignmentFiles,
) -> Vec<String> {
    let mut args = vec![
        settings.reads_filename.to_string(),
        files.flanks.to_string(),
        "--nproc".to_string(),
        thread_count.to_string(),
        "--bam".to_string(),
        "--out".to_string(),
        files.aligned.to_string(),
        "--hitPolicy".to_string(),
        "allbest".to_string(),
    ];
    args.extend(settings.aligner_args.split_whitespace().map(String::from));
    args
}

fn get_sort_args(thread_count: usize, files: &FlankAlignmentFiles) -> Vec<String> {
    vec![
        "sort".to_string(),
        "-o".to_string(),
        files.sorted.to_string(),
        "-@".to_string(),
        thread_count.to_string(),
        files.aligned.to_string(),
    ]
}

fn index_flank_alignments(thread_count: usize, files: &FlankAlignmentFiles) -> GapSupportResult<()> {
    info!("Indexing {} flank alignments: '{}'", files.side, files.sorted);
    bam::index::build(&files.sorted, None, bam::index::Type::Bai, thread_count as u32).map_err(
        |e| GapSupportError::AlignmentStore {
            path: files.sorted.clone(),
            msg: format!("failed to build index: {e}"),
        },
    )
}

/// Align, sort and index reads for one flank side
///
fn build_flank_alignment_store(
    shared_settings: &cli::SharedSettings,
    settings: &cli::AlignSettings,
    files: &FlankAlignmentFiles,
) -> GapSupportResult<()> {
    let thread_count = shared_settings.thread_count;
    let side = files.side;

    run_external_tool(
        &format!("{side} flank read alignment"),
        &settings.aligner,
        &get_aligner_args(settings, thread_count, files),
    )?;

    run_external_tool(
        &format!("{side} flank alignment sort"),
        &settings.samtools,
        &get_sort_args(thread_count, files),
    )?;

    index_flank_alignments(thread_count, files)
}

pub fn run_align(
    shared_settings: &cli::SharedSettings,
    settings: &cli::AlignSettings,
) -> GapSupportResult<()> {
    cli::write_align_settings(&settings.output_dir, settings)?;

    let output_dir = settings.output_dir.as_path();
    let left_files = FlankAlignmentFiles::new(output_dir, FlankSide::Left, &settings.left_flanks);
    let right_files = FlankAlignmentFiles::new(output_dir, FlankSide::Right, &settings.right_flanks);

    for files in [&left_files, &right_files] {
        build_flank_alignment_store(shared_settings, settings, files)?;
    }

    // Stores are recorded relative to the align output directory, so that they can be found
    // from any working directory
    let flank_stores = FlankStorePaths {
        left: get_sorted_filename(FlankSide::Left).into(),
        right: get_sorted_filename(FlankSide::Right).into(),
    };
    write_flank_store_paths(output_dir, &flank_stores)
}
