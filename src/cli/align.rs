use std::fs::File;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use const_format::concatcp;
use log::info;
use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, bail};

use super::utils::{canonicalize_path, check_optional_filename, check_required_filename};
use crate::errors::{GapSupportError, GapSupportResult};
use crate::filenames::ALIGN_SETTINGS_FILENAME;
use crate::gap_index::FlankSide;

#[derive(Args, Default, Deserialize, Serialize)]
pub struct AlignSettings {
    /// Directory for all align command output (must not already exist)
    #[arg(long, value_name = "DIR", default_value = concatcp!(env!("CARGO_PKG_NAME"), "_align_output"))]
    pub output_dir: Utf8PathBuf,

    /// Scaffold assembly in FASTA format
    ///
    /// This is used to find the default left and right flank FASTA files, which are expected next
    /// to the scaffold file as "{scaffold_file_without_extension}_gaps.L.fa" and "_gaps.R.fa".
    ///
    #[arg(long = "ref", value_name = "FILE")]
    pub ref_filename: Option<Utf8PathBuf>,

    /// Long reads to align to the gap flanks, in any format accepted by the aligner
    #[arg(long = "reads", value_name = "FILE")]
    pub reads_filename: Utf8PathBuf,

    /// Left gap flank sequences in FASTA format, overriding the default derived from --ref
    #[arg(long = "left-flanks", value_name = "FILE")]
    left_flanks_option: Option<Utf8PathBuf>,

    /// Right gap flank sequences in FASTA format, overriding the default derived from --ref
    #[arg(long = "right-flanks", value_name = "FILE")]
    right_flanks_option: Option<Utf8PathBuf>,

    /// This value will be filled in by left_flanks_option or ref_filename
    #[arg(skip)]
    pub left_flanks: Utf8PathBuf,

    /// This value will be filled in by right_flanks_option or ref_filename
    #[arg(skip)]
    pub right_flanks: Utf8PathBuf,

    /// Additional arguments appended to the aligner command line
    #[arg(long, value_name = "ARGS", default_value = "", allow_hyphen_values = true)]
    pub aligner_args: String,

    /// Aligner executable
    #[arg(hide = true, long, default_value = "blasr")]
    pub aligner: String,

    /// Samtools executable used for alignment sorting
    #[arg(hide = true, long, default_value = "samtools")]
    pub samtools: String,
}

/// Default location of the flank FASTA for `side`, next to the scaffold FASTA
///
/// For scaffold file "dir/asm.fasta" the left flank file is "dir/asm_gaps.L.fa"
///
fn get_default_flanks_filename(ref_filename: &Utf8Path, side: FlankSide) -> Utf8PathBuf {
    let basename = ref_filename.with_extension("");
    Utf8PathBuf::from(format!("{basename}_gaps.{side}.fa"))
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
/// Assumes that the logger is not setup
///
pub fn validate_and_fix_align_settings(mut settings: AlignSettings) -> SimpleResult<AlignSettings> {
    check_required_filename(&settings.reads_filename, "reads")?;
    check_optional_filename(settings.ref_filename.as_ref(), "scaffold reference")?;

    let resolve_flanks = |flanks_option: Option<&Utf8PathBuf>,
                          side: FlankSide|
     -> SimpleResult<Utf8PathBuf> {
        let flanks = match (flanks_option, &settings.ref_filename) {
            (Some(x), _) => x.clone(),
            (None, Some(ref_filename)) => get_default_flanks_filename(ref_filename, side),
            (None, None) => {
                bail!("Must specify either --ref or both --left-flanks and --right-flanks");
            }
        };
        check_required_filename(&flanks, &format!("{side} flank"))?;
        canonicalize_path(&flanks)
    };

    let left_flanks = resolve_flanks(settings.left_flanks_option.as_ref(), FlankSide::Left)?;
    let right_flanks = resolve_flanks(settings.right_flanks_option.as_ref(), FlankSide::Right)?;
    settings.left_flanks = left_flanks;
    settings.right_flanks = right_flanks;

    settings.reads_filename = canonicalize_path(&settings.reads_filename)?;

    Ok(settings)
}

/// Write align settings out in json format
pub fn write_align_settings(output_dir: &Utf8Path, settings: &AlignSettings) -> GapSupportResult<()> {
    let filename = output_dir.join(ALIGN_SETTINGS_FILENAME);

    info!("Writing align settings to file: '{filename}'");

    let f = File::create(&filename).map_err(|e| GapSupportError::io(&filename, e))?;
    serde_json::to_writer_pretty(&f, &settings).map_err(|e| GapSupportError::io(&filename, e.into()))
}
