use camino::Utf8Path;
use log::{info, warn};

use crate::cli;
use crate::errors::GapSupportResult;
use crate::flank_alignment::IndexedFlankStore;
use crate::gap_index::{FlankSide, GapIndex};
use crate::gap_support::{EvaluationSettings, evaluate_gap_support};
use crate::genome_ref_utils::get_scaffold_names_from_fasta;
use crate::result_writer::write_gap_support_report;
use crate::run_stats::write_support_run_stats;

/// Select the scaffolds to evaluate, in evaluation order
///
/// When scaffold names are available from the assembly fasta, its order is used and gap table
/// scaffolds missing from the fasta are reported and skipped. Otherwise gap table order is used.
///
fn get_scaffold_order(gap_index: &GapIndex, ref_scaffold_names: Option<Vec<String>>) -> Vec<String> {
    let Some(ref_scaffold_names) = ref_scaffold_names else {
        return gap_index.scaffold_names().to_vec();
    };

    let missing_scaffolds = gap_index
        .scaffold_names()
        .iter()
        .filter(|&x| !ref_scaffold_names.contains(x))
        .collect::<Vec<_>>();
    if !missing_scaffolds.is_empty() {
        warn!(
            "Skipping gaps on {} scaffolds not found in the scaffold fasta, including '{}'",
            missing_scaffolds.len(),
            missing_scaffolds[0]
        );
    }

    ref_scaffold_names
}

fn get_evaluation_settings(settings: &cli::SupportSettings) -> EvaluationSettings {
    EvaluationSettings {
        min_reads: settings.min_reads,
        wiggle: settings.wiggle,
        dedup_read_pairs: settings.dedup_read_pairs,
        debug_gap_label: settings.debug_gap.clone(),
    }
}

fn open_flank_store(
    settings: &cli::SupportSettings,
    side: FlankSide,
) -> GapSupportResult<IndexedFlankStore> {
    let path: &Utf8Path = settings.flank_stores.get(side);
    info!("Opening {side} flank alignment store: '{path}'");
    IndexedFlankStore::open(path, side)
}

pub fn run_support(settings: &cli::SupportSettings) -> GapSupportResult<()> {
    cli::write_support_settings(&settings.output_dir, settings)?;

    let gap_index = GapIndex::from_file(&settings.gap_table_filename)?;

    let ref_scaffold_names = match &settings.ref_filename {
        Some(ref_filename) => Some(get_scaffold_names_from_fasta(ref_filename)?),
        None => None,
    };
    let scaffold_names = get_scaffold_order(&gap_index, ref_scaffold_names);

    let mut left_store = open_flank_store(settings, FlankSide::Left)?;
    let mut right_store = open_flank_store(settings, FlankSide::Right)?;

    info!("Evaluating gap support");
    let report = evaluate_gap_support(
        &gap_index,
        &scaffold_names,
        &mut left_store,
        &mut right_store,
        &get_evaluation_settings(settings),
    )?;
    report.stats.log_summary();

    write_gap_support_report(&settings.output_dir, &report)?;
    write_support_run_stats(&settings.output_dir, &report.stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::FlankStorePaths;
    use crate::filenames::{GAP_READS_FILENAME, GAP_SUPPORT_DIRNAME, SUPPORTED_GAPS_FILENAME};
    use rust_htslib::bam::{self, Header, HeaderView, header};

    fn write_flank_store(path: &Utf8Path, flank_names: &[&str], sam_lines: &[&[u8]]) {
        let mut header = Header::new();
        for flank_name in flank_names {
            header.push_record(
                header::HeaderRecord::new(b"SQ")
                    .push_tag(b"SN", flank_name)
                    .push_tag(b"LN", 1000),
            );
        }
        let header_view = HeaderView::from_header(&header);
        {
            let mut writer = bam::Writer::from_path(path, &header, bam::Format::Bam).unwrap();
            for sam_line in sam_lines {
                let rec = bam::Record::from_sam(&header_view, sam_line).unwrap();
                writer.write(&rec).unwrap();
            }
        }
        bam::index::build(path, None, bam::index::Type::Bai, 1).unwrap();
    }

    #[test]
    fn test_run_support() {
        let dir = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(dir.path()).unwrap();

        let gap_table = dir.join("gaps.txt");
        std::fs::write(&gap_table, "scf1\t100\t110\nscf1\t500\t600\n").unwrap();

        // Both reads bridge gap 1 with a span of 10, and nothing aligns to gap 2's right flank
        let left = dir.join("sorted_gaps.L.bam");
        write_flank_store(
            &left,
            &["scf1.gap.1.L", "scf1.gap.2.L"],
            &[
                b"r1\t0\tscf1.gap.1.L\t1\t60\t5M15S\t*\t0\t0\tAAAAACCCCCCCCCCGGGGG\t*",
                b"r2\t0\tscf1.gap.1.L\t1\t60\t5M15S\t*\t0\t0\tTTTTTCCCCCCCCCCGGGGG\t*",
                b"r3\t0\tscf1.gap.2.L\t1\t60\t5M15S\t*\t0\t0\tTTTTTCCCCCCCCCCGGGGG\t*",
            ],
        );
        let right = dir.join("sorted_gaps.R.bam");
        write_flank_store(
            &right,
            &["scf1.gap.1.R", "scf1.gap.2.R"],
            &[
                b"r1\t0\tscf1.gap.1.R\t1\t60\t15S5M\t*\t0\t0\tAAAAACCCCCCCCCCGGGGG\t*",
                b"r2\t0\tscf1.gap.1.R\t1\t60\t15S5M\t*\t0\t0\tTTTTTCCCCCCCCCCGGGGG\t*",
            ],
        );

        let output_dir = dir.join("out");
        std::fs::create_dir(&output_dir).unwrap();

        let mut settings = cli::SupportSettings::default();
        settings.output_dir = output_dir.clone();
        settings.gap_table_filename = gap_table;
        settings.flank_stores = FlankStorePaths { left, right };
        settings.min_reads = 2;
        settings.wiggle = 0.1;

        run_support(&settings).unwrap();

        let summary = std::fs::read_to_string(output_dir.join(SUPPORTED_GAPS_FILENAME)).unwrap();
        assert_eq!(summary, "scf1.gap.1\t2\n");

        let reads = std::fs::read_to_string(
            output_dir
                .join(GAP_SUPPORT_DIRNAME)
                .join("scf1.gap.1")
                .join(GAP_READS_FILENAME),
        )
        .unwrap();
        assert_eq!(
            reads,
            "@r1\nCCCCCCCCCC\n+\n!!!!!!!!!!\n@r2\nCCCCCCCCCC\n+\n!!!!!!!!!!\n"
        );
        assert!(!output_dir.join(GAP_SUPPORT_DIRNAME).join("scf1.gap.2").exists());

        // A second run into the same output directory collides with the first run's gap output
        assert!(matches!(
            run_support(&settings),
            Err(crate::errors::GapSupportError::OutputCollision(_))
        ));
    }

    fn to_names(names: &[&str]) -> Vec<String> {
        names.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn test_get_scaffold_order() {
        let gap_index =
            GapIndex::from_table_content("test", "scfB\t10\t20\nscfA\t5\t9\nscfB\t30\t40\n")
                .unwrap();

        assert_eq!(get_scaffold_order(&gap_index, None), to_names(&["scfB", "scfA"]));

        let ref_names = to_names(&["scfA", "scfC", "scfB"]);
        assert_eq!(get_scaffold_order(&gap_index, Some(ref_names.clone())), ref_names);

        // Gap scaffolds missing from the fasta are dropped
        let ref_names = to_names(&["scfC", "scfA"]);
        assert_eq!(get_scaffold_order(&gap_index, Some(ref_names.clone())), ref_names);
    }
}
