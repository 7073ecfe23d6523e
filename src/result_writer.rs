//! Write supported gap reads and the supported gap summary table
//!

use std::fs::File;
use std::io::{BufWriter, Write};

use camino::Utf8Path;
use log::info;

use crate::errors::{GapSupportError, GapSupportResult};
use crate::filenames::{GAP_READS_FILENAME, GAP_SUPPORT_DIRNAME, SUPPORTED_GAPS_FILENAME};
use crate::gap_support::{GapSupportReport, SummaryEntry, SupportedGapRecord, SupportedRead};

/// Highest phred value representable in a fastq quality string
const MAX_FASTQ_QUAL: u8 = 93;

fn get_fastq_qual_string(qual: &[u8]) -> Vec<u8> {
    qual.iter()
        .map(|&q| std::cmp::min(q, MAX_FASTQ_QUAL) + 33)
        .collect()
}

fn write_fastq_record<W: Write>(writer: &mut W, read: &SupportedRead) -> std::io::Result<()> {
    writeln!(writer, "@{}", read.read_id)?;
    writer.write_all(&read.seq)?;
    writer.write_all(b"\n+\n")?;
    writer.write_all(&get_fastq_qual_string(&read.qual))?;
    writer.write_all(b"\n")
}

/// Map create errors for a per-gap output path into the appropriate error type
fn get_gap_output_error(path: &Utf8Path, e: std::io::Error) -> GapSupportError {
    if e.kind() == std::io::ErrorKind::AlreadyExists {
        GapSupportError::OutputCollision(path.to_path_buf())
    } else {
        GapSupportError::io(path, e)
    }
}

/// Write the reads for one supported gap into a new directory named for the gap
///
/// Fails if the gap's directory already exists.
///
fn write_supported_gap_reads(
    gap_support_dir: &Utf8Path,
    supported_gap: &SupportedGapRecord,
) -> GapSupportResult<()> {
    let gap_dir = gap_support_dir.join(&supported_gap.gap_label);
    std::fs::create_dir(&gap_dir).map_err(|e| get_gap_output_error(&gap_dir, e))?;

    let filename = gap_dir.join(GAP_READS_FILENAME);
    let file = File::create_new(&filename).map_err(|e| get_gap_output_error(&filename, e))?;
    let mut writer = BufWriter::new(file);
    for read in supported_gap.reads.iter() {
        write_fastq_record(&mut writer, read).map_err(|e| GapSupportError::io(&filename, e))?;
    }
    writer.flush().map_err(|e| GapSupportError::io(&filename, e))
}

/// Write the supported gap table, one "gap_label<TAB>count" line per gap
///
pub fn write_supported_gap_summary(
    output_dir: &Utf8Path,
    summary: &[SummaryEntry],
) -> GapSupportResult<()> {
    let filename = output_dir.join(SUPPORTED_GAPS_FILENAME);

    info!("Writing supported gap summary to file: '{filename}'");

    let file = File::create(&filename).map_err(|e| GapSupportError::io(&filename, e))?;
    let mut writer = BufWriter::new(file);
    for entry in summary {
        writeln!(writer, "{}\t{}", entry.gap_label, entry.support_count)
            .map_err(|e| GapSupportError::io(&filename, e))?;
    }
    writer.flush().map_err(|e| GapSupportError::io(&filename, e))
}

/// Fail on the first supported gap whose output directory already exists
///
fn check_gap_output_collisions(
    gap_support_dir: &Utf8Path,
    supported_gaps: &[SupportedGapRecord],
) -> GapSupportResult<()> {
    for supported_gap in supported_gaps.iter() {
        let gap_dir = gap_support_dir.join(&supported_gap.gap_label);
        if gap_dir.exists() {
            return Err(GapSupportError::OutputCollision(gap_dir));
        }
    }
    Ok(())
}

/// Write all supported gap reads and the supported gap summary under `output_dir`
///
/// All gap output locations are checked before anything is written, so a collision leaves no
/// partial output.
///
pub fn write_gap_support_report(
    output_dir: &Utf8Path,
    report: &GapSupportReport,
) -> GapSupportResult<()> {
    let gap_support_dir = output_dir.join(GAP_SUPPORT_DIRNAME);

    info!(
        "Writing reads for {} supported gaps to directory: '{gap_support_dir}'",
        report.supported_gaps.len()
    );

    check_gap_output_collisions(&gap_support_dir, &report.supported_gaps)?;

    if !gap_support_dir.is_dir() {
        std::fs::create_dir(&gap_support_dir)
            .map_err(|e| GapSupportError::io(&gap_support_dir, e))?;
    }

    for supported_gap in report.supported_gaps.iter() {
        write_supported_gap_reads(&gap_support_dir, supported_gap)?;
    }

    write_supported_gap_summary(output_dir, &report.summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_report() -> GapSupportReport {
        let supported_gaps = vec![
            SupportedGapRecord {
                gap_label: "scfA.gap.1".to_string(),
                reads: vec![
                    SupportedRead {
                        read_id: "m1/100/ccs".to_string(),
                        seq: b"ACGTA".to_vec(),
                        qual: vec![0, 10, 20, 40, 99],
                    },
                    SupportedRead {
                        read_id: "m1/200/ccs".to_string(),
                        seq: b"GG".to_vec(),
                        qual: vec![30, 30],
                    },
                ],
            },
            SupportedGapRecord {
                gap_label: "scfB.gap.3".to_string(),
                reads: vec![SupportedRead {
                    read_id: "m1/300/ccs".to_string(),
                    seq: b"T".to_vec(),
                    qual: vec![1],
                }],
            },
        ];
        let summary = supported_gaps
            .iter()
            .map(|x| SummaryEntry {
                gap_label: x.gap_label.clone(),
                support_count: x.reads.len(),
            })
            .collect();

        GapSupportReport {
            supported_gaps,
            summary,
            stats: Default::default(),
        }
    }

    #[test]
    fn test_get_fastq_qual_string() {
        assert_eq!(get_fastq_qual_string(&[0, 10, 40, 93, 120]), b"!+I~~".to_vec());
    }

    #[test]
    fn test_write_gap_support_report() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = Utf8Path::from_path(dir.path()).unwrap();

        write_gap_support_report(output_dir, &get_test_report()).unwrap();

        let reads = std::fs::read_to_string(
            output_dir
                .join(GAP_SUPPORT_DIRNAME)
                .join("scfA.gap.1")
                .join(GAP_READS_FILENAME),
        )
        .unwrap();
        assert_eq!(reads, "@m1/100/ccs\nACGTA\n+\n!+5I~\n@m1/200/ccs\nGG\n+\n??\n");

        let reads = std::fs::read_to_string(
            output_dir
                .join(GAP_SUPPORT_DIRNAME)
                .join("scfB.gap.3")
                .join(GAP_READS_FILENAME),
        )
        .unwrap();
        assert_eq!(reads, "@m1/300/ccs\nT\n+\n\"\n");

        let summary = std::fs::read_to_string(output_dir.join(SUPPORTED_GAPS_FILENAME)).unwrap();
        assert_eq!(summary, "scfA.gap.1\t2\nscfB.gap.3\t1\n");
    }

    #[test]
    fn test_gap_output_collision() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = Utf8Path::from_path(dir.path()).unwrap();

        let existing_gap_dir = output_dir.join(GAP_SUPPORT_DIRNAME).join("scfB.gap.3");
        std::fs::create_dir_all(&existing_gap_dir).unwrap();

        match write_gap_support_report(output_dir, &get_test_report()) {
            Err(GapSupportError::OutputCollision(path)) => assert_eq!(path, existing_gap_dir),
            _ => panic!("expected output collision"),
        }

        // The colliding gap comes last, but nothing is written for the earlier gap
        assert!(!output_dir.join(GAP_SUPPORT_DIRNAME).join("scfA.gap.1").exists());
        assert!(!output_dir.join(SUPPORTED_GAPS_FILENAME).exists());
    }

    #[test]
    fn test_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = Utf8Path::from_path(dir.path()).unwrap();

        write_gap_support_report(output_dir, &GapSupportReport::default()).unwrap();

        assert!(output_dir.join(GAP_SUPPORT_DIRNAME).is_dir());
        let summary = std::fs::read_to_string(output_dir.join(SUPPORTED_GAPS_FILENAME)).unwrap();
        assert!(summary.is_empty());
    }
}
