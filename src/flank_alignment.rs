//! Access to read alignments against the gap flank sequences
//!
//! Each gap flank is a separate reference sequence in its flank alignment store, named with the
//! synthetic "{scaffold}.gap.{index}.{L|R}" convention. One store holds all left flanks and a
//! second holds all right flanks.
//!

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use rust_htslib::bam::{self, Read};

use crate::errors::{GapSupportError, GapSupportResult};
use crate::gap_index::FlankSide;

/// Quality value substituted for each base when a record has no stored base qualities
const MISSING_QUAL_VALUE: u8 = 0;

/// The information needed from one read alignment to a gap flank
///
#[derive(Clone, Debug, PartialEq)]
pub struct FlankAlignmentRecord {
    pub read_id: String,

    /// Zero-indexed read position of the first aligned base, in the orientation of `seq`
    pub query_start: usize,

    /// Zero-indexed read position after the last aligned base, in the orientation of `seq`
    pub query_end: usize,

    /// Full stored read sequence, excluding any hard-clipped bases
    pub seq: Vec<u8>,

    /// Phred base quality values corresponding to `seq`
    pub qual: Vec<u8>,

    /// Name of the flank reference sequence this record was fetched under
    pub ref_name: String,
}

impl FlankAlignmentRecord {
    pub fn from_bam_record(record: &bam::Record, ref_name: &str) -> Self {
        let cigar = record.cigar();
        let seq = record.seq().as_bytes();
        let query_start = std::cmp::min(cigar.leading_softclips() as usize, seq.len());
        let query_end = seq.len().saturating_sub(cigar.trailing_softclips() as usize);

        let qual = {
            let qual = record.qual();
            // htslib marks missing qualities with 0xff in the first position
            if qual.first() == Some(&0xff) {
                vec![MISSING_QUAL_VALUE; seq.len()]
            } else {
                qual.to_vec()
            }
        };

        Self {
            read_id: String::from_utf8_lossy(record.qname()).to_string(),
            query_start,
            query_end,
            seq,
            qual,
            ref_name: ref_name.to_string(),
        }
    }
}

/// Lookup of flank alignment records by flank reference name
///
pub trait FlankAlignmentSource {
    /// Return all alignment records for the flank `ref_name`, in store order
    ///
    /// An unknown flank name returns an empty record set.
    ///
    fn fetch_flank_records(
        &mut self,
        ref_name: &str,
    ) -> GapSupportResult<Vec<FlankAlignmentRecord>>;
}

/// Check that a BAM file has the expected EOF marker
///
fn check_bam_eof<T: bam::Read>(reader: &T, path: &Utf8Path) -> GapSupportResult<()> {
    use rust_htslib::htslib;

    // Return value info from htslib:
    //    3 for a non-EOF checkable filetype;
    //    2 for an unseekable file type where EOF cannot be checked;
    //    1 for a valid EOF block;
    //    0 for if the EOF marker is absent when it should be present;
    //   -1 (with errno set) on failure
    //
    let eof_check = unsafe { htslib::hts_check_EOF(reader.htsfile()) };
    match eof_check {
        1..=3 => Ok(()),
        0 => Err(GapSupportError::AlignmentStore {
            path: path.to_path_buf(),
            msg: "missing EOF marker".to_string(),
        }),
        _ => Err(GapSupportError::AlignmentStore {
            path: path.to_path_buf(),
            msg: format!("unexpected error ({eof_check}) while checking for EOF marker"),
        }),
    }
}

/// Indexed BAM file of read alignments to all flanks on one side of the gaps
///
pub struct IndexedFlankStore {
    side: FlankSide,
    path: Utf8PathBuf,
    reader: bam::IndexedReader,
}

impl IndexedFlankStore {
    /// Open the indexed alignment file at `path`
    ///
    /// Fails if the file or its index can't be opened.
    ///
    pub fn open(path: &Utf8Path, side: FlankSide) -> GapSupportResult<Self> {
        let reader =
            bam::IndexedReader::from_path(path).map_err(|e| GapSupportError::AlignmentStore {
                path: path.to_path_buf(),
                msg: e.to_string(),
            })?;
        check_bam_eof(&reader, path)?;

        debug!(
            "Opened {side} flank alignment store '{path}' with {} flank sequences",
            reader.header().target_count()
        );

        Ok(Self {
            side,
            path: path.to_path_buf(),
            reader,
        })
    }
}

impl FlankAlignmentSource for IndexedFlankStore {
    fn fetch_flank_records(
        &mut self,
        ref_name: &str,
    ) -> GapSupportResult<Vec<FlankAlignmentRecord>> {
        let store_error = |msg: String| GapSupportError::AlignmentStore {
            path: self.path.clone(),
            msg,
        };

        let tid = match self.reader.header().tid(ref_name.as_bytes()) {
            Some(x) => x,
            None => {
                debug!("No flank sequence '{ref_name}' in {} flank alignment store", self.side);
                return Ok(Vec::new());
            }
        };

        self.reader
            .fetch(bam::FetchDefinition::CompleteTid(tid as i32))
            .map_err(|e| store_error(format!("failed to fetch flank '{ref_name}': {e}")))?;

        let mut flank_records = Vec::new();
        let mut record = bam::Record::new();
        while let Some(r) = self.reader.read(&mut record) {
            r.map_err(|e| store_error(format!("failed to parse alignment record: {e}")))?;

            if record.is_unmapped() {
                continue;
            }

            flank_records.push(FlankAlignmentRecord::from_bam_record(&record, ref_name));
        }

        Ok(flank_records)
    }
}
