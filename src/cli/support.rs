use std::fs::File;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use const_format::concatcp;
use log::info;
use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, bail};

use super::utils::{canonicalize_path, check_optional_filename, check_required_filename};
use crate::align::{FlankStorePaths, read_flank_store_paths};
use crate::errors::{GapSupportError, GapSupportResult};
use crate::filenames::SUPPORT_SETTINGS_FILENAME;

#[derive(Args, Default, Deserialize, Serialize)]
pub struct SupportSettings {
    /// Directory for all support command output (must not already exist)
    #[arg(long, value_name = "DIR", default_value = concatcp!(env!("CARGO_PKG_NAME"), "_support_output"))]
    pub output_dir: Utf8PathBuf,

    /// Gap coordinate table
    ///
    /// Tab-delimited text with one gap per line and no header, with fields: scaffold name, gap
    /// left coordinate, gap right coordinate. Gaps are numbered from 1 on each scaffold in the
    /// order given.
    ///
    #[arg(long = "gap-table", value_name = "FILE")]
    pub gap_table_filename: Utf8PathBuf,

    /// Scaffold assembly in FASTA format
    ///
    /// If given, scaffolds are evaluated in FASTA order, and only scaffolds in the FASTA are
    /// evaluated. Otherwise scaffolds are evaluated in gap table order.
    ///
    #[arg(long = "ref", value_name = "FILE")]
    pub ref_filename: Option<Utf8PathBuf>,

    /// Align command output directory, used to find the flank alignment files
    #[arg(long, value_name = "DIR", conflicts_with_all = ["left_bam", "right_bam"])]
    align_dir: Option<Utf8PathBuf>,

    /// Sorted and indexed alignments of reads to the left gap flanks
    #[arg(long, value_name = "FILE", requires = "right_bam")]
    left_bam: Option<Utf8PathBuf>,

    /// Sorted and indexed alignments of reads to the right gap flanks
    #[arg(long, value_name = "FILE", requires = "left_bam")]
    right_bam: Option<Utf8PathBuf>,

    /// This value will be filled in from align_dir or the left/right bam options
    #[arg(skip)]
    pub flank_stores: FlankStorePaths,

    /// Minimum number of reads required to support a gap
    ///
    /// This is checked both for reads aligning to both gap flanks, and again for the subset of
    /// those reads with a span matching the gap size.
    ///
    #[arg(long, default_value_t = 1)]
    pub min_reads: usize,

    /// Fractional tolerance on the difference between read span and gap size
    ///
    /// A read is accepted when its span across the gap is strictly between gap_size*(1-wiggle)
    /// and gap_size*(1+wiggle). Must be in [0,1).
    ///
    #[arg(long, default_value_t = 0.1)]
    pub wiggle: f64,

    /// Only count the first flank alignment pair of each read
    ///
    /// By default, a read with multiple alignments to either flank contributes one candidate for
    /// each left/right alignment combination.
    ///
    #[arg(long)]
    pub dedup_read_pairs: bool,

    /// Print all read span decisions for the gap with this label (e.g. "scaffold1.gap.2")
    #[arg(hide = true, long, value_name = "GAP_LABEL")]
    pub debug_gap: Option<String>,
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
/// Assumes that the logger is not setup
///
pub fn validate_and_fix_support_settings(
    mut settings: SupportSettings,
) -> SimpleResult<SupportSettings> {
    check_required_filename(&settings.gap_table_filename, "gap table")?;
    check_optional_filename(settings.ref_filename.as_ref(), "scaffold reference")?;

    settings.flank_stores = match (&settings.align_dir, &settings.left_bam, &settings.right_bam) {
        (Some(align_dir), _, _) => {
            if !align_dir.is_dir() {
                bail!("Can't find specified align output directory: '{align_dir}'");
            }
            read_flank_store_paths(&canonicalize_path(align_dir)?)?
        }
        (None, Some(left), Some(right)) => FlankStorePaths {
            left: left.clone(),
            right: right.clone(),
        },
        _ => {
            bail!("Must specify either --align-dir or both --left-bam and --right-bam");
        }
    };

    check_required_filename(&settings.flank_stores.left, "left flank alignment")?;
    check_required_filename(&settings.flank_stores.right, "right flank alignment")?;

    if !(0.0..1.0).contains(&settings.wiggle) {
        bail!(
            "--wiggle argument must be in the range [0,1), but is {}",
            settings.wiggle
        );
    }

    Ok(settings)
}

/// Write support settings out in json format
pub fn write_support_settings(
    output_dir: &Utf8Path,
    settings: &SupportSettings,
) -> GapSupportResult<()> {
    let filename = output_dir.join(SUPPORT_SETTINGS_FILENAME);

    info!("Writing support settings to file: '{filename}'");

    let f = File::create(&filename).map_err(|e| GapSupportError::io(&filename, e))?;
    serde_json::to_writer_pretty(&f, &settings)
        .map_err(|e| GapSupportError::io(&filename, e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestInput {
        _dir: tempfile::TempDir,
        dir: Utf8PathBuf,
    }

    fn get_test_input() -> TestInput {
        let tempdir = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(tempdir.path()).unwrap().to_path_buf();
        for name in ["gaps.txt", "left.bam", "right.bam"] {
            File::create(dir.join(name)).unwrap();
        }
        TestInput { _dir: tempdir, dir }
    }

    fn get_test_settings(input: &TestInput) -> SupportSettings {
        SupportSettings {
            gap_table_filename: input.dir.join("gaps.txt"),
            left_bam: Some(input.dir.join("left.bam")),
            right_bam: Some(input.dir.join("right.bam")),
            min_reads: 1,
            wiggle: 0.1,
            ..Default::default()
        }
    }

    #[test]
    fn test_direct_flank_stores() {
        let input = get_test_input();
        let settings = validate_and_fix_support_settings(get_test_settings(&input)).unwrap();
        assert_eq!(settings.flank_stores.left, input.dir.join("left.bam"));
        assert_eq!(settings.flank_stores.right, input.dir.join("right.bam"));
    }

    #[test]
    fn test_align_dir_flank_stores() {
        let input = get_test_input();
        let flank_stores = FlankStorePaths {
            left: input.dir.join("left.bam"),
            right: input.dir.join("right.bam"),
        };
        crate::align::write_flank_store_paths(&input.dir, &flank_stores).unwrap();

        let mut settings = get_test_settings(&input);
        settings.left_bam = None;
        settings.right_bam = None;
        settings.align_dir = Some(input.dir.clone());
        let settings = validate_and_fix_support_settings(settings).unwrap();
        assert_eq!(
            settings.flank_stores.left.canonicalize_utf8().unwrap(),
            flank_stores.left.canonicalize_utf8().unwrap()
        );
        assert_eq!(
            settings.flank_stores.right.canonicalize_utf8().unwrap(),
            flank_stores.right.canonicalize_utf8().unwrap()
        );
    }

    #[test]
    fn test_align_dir_relative_flank_stores() {
        let input = get_test_input();
        let flank_stores = FlankStorePaths {
            left: Utf8PathBuf::from("left.bam"),
            right: Utf8PathBuf::from("right.bam"),
        };
        crate::align::write_flank_store_paths(&input.dir, &flank_stores).unwrap();

        let mut settings = get_test_settings(&input);
        settings.left_bam = None;
        settings.right_bam = None;
        settings.align_dir = Some(input.dir.clone());
        let settings = validate_and_fix_support_settings(settings).unwrap();
        assert!(settings.flank_stores.left.is_absolute());
        assert!(settings.flank_stores.left.is_file());
        assert_eq!(settings.flank_stores.right.file_name(), Some("right.bam"));
    }

    #[test]
    fn test_missing_flank_stores() {
        let input = get_test_input();
        let mut settings = get_test_settings(&input);
        settings.right_bam = None;
        assert!(validate_and_fix_support_settings(settings).is_err());

        let mut settings = get_test_settings(&input);
        settings.right_bam = Some(input.dir.join("not_there.bam"));
        assert!(validate_and_fix_support_settings(settings).is_err());
    }

    #[test]
    fn test_wiggle_range() {
        let input = get_test_input();
        for (wiggle, is_valid) in [(0.0, true), (0.99, true), (1.0, false), (-0.1, false)] {
            let mut settings = get_test_settings(&input);
            settings.wiggle = wiggle;
            assert_eq!(
                validate_and_fix_support_settings(settings).is_ok(),
                is_valid,
                "Failed wiggle test case {wiggle}"
            );
        }

        let mut settings = get_test_settings(&input);
        settings.wiggle = f64::NAN;
        assert!(validate_and_fix_support_settings(settings).is_err());
    }
}
