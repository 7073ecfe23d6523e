//! Scaffold gap coordinate table parsing
//!

use std::collections::HashMap;

use camino::Utf8Path;
use log::info;

use crate::errors::{GapSupportError, GapSupportResult};

/// Identifies which side of a gap a flank sequence is taken from
///
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
pub enum FlankSide {
    #[strum(serialize = "L")]
    Left,
    #[strum(serialize = "R")]
    Right,
}

/// A single assembly gap on a scaffold
///
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Gap {
    pub scaffold: String,

    /// 1-based index of the gap within its scaffold, in gap table order
    pub index: usize,

    pub left: i64,
    pub right: i64,
}

impl Gap {
    /// Nominal gap size, always positive
    pub fn size(&self) -> i64 {
        self.right - self.left
    }

    /// Gap identifier used for output naming, e.g. "scaffold1.gap.2"
    pub fn label(&self) -> String {
        format!("{}.gap.{}", self.scaffold, self.index)
    }

    /// Synthetic reference name of this gap's flank sequence in the flank alignment stores, e.g.
    /// "scaffold1.gap.2.L"
    pub fn flank_ref_name(&self, side: FlankSide) -> String {
        format!("{}.{}", self.label(), side)
    }
}

/// All gaps from the coordinate table, grouped by scaffold
///
#[derive(Default)]
pub struct GapIndex {
    /// Scaffold names in order of first appearance in the gap table
    scaffold_order: Vec<String>,

    /// Gaps for each scaffold, in gap table order
    scaffold_gaps: HashMap<String, Vec<Gap>>,
}

impl GapIndex {
    /// Read the gap table from `filename`
    ///
    /// The table can be plain text or bgzip/gzip compressed.
    ///
    pub fn from_file(filename: &Utf8Path) -> GapSupportResult<Self> {
        use rust_htslib::bgzf;
        use std::io::Read;

        info!("Reading gap coordinates from file '{filename}'");

        let mut reader = bgzf::Reader::from_path(filename)
            .map_err(|e| GapSupportError::io(filename, std::io::Error::other(e)))?;

        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .map_err(|e| GapSupportError::io(filename, e))?;

        let gap_index = Self::from_table_content(filename.as_str(), &content)?;

        info!(
            "Found {} gaps on {} scaffolds",
            gap_index.gap_count(),
            gap_index.scaffold_order.len()
        );

        Ok(gap_index)
    }

    /// Parse gap table text content
    ///
    /// # Arguments
    /// * `label` - Name of the gap table source used in error messages
    ///
    pub fn from_table_content(label: &str, content: &str) -> GapSupportResult<Self> {
        let format_error = |line_number: usize, msg: String| GapSupportError::Format {
            filename: label.to_string(),
            line_number,
            msg,
        };

        let mut gap_index = Self::default();

        // Only trailing blank lines are tolerated
        let content = content.trim_end_matches(['\n', '\r']);
        if content.is_empty() {
            return Ok(gap_index);
        }

        for (line_index, line) in content.split('\n').enumerate() {
            let line_number = line_index + 1;
            let line = line.strip_suffix('\r').unwrap_or(line);

            let words = line.split('\t').collect::<Vec<_>>();
            if words.len() != 3 {
                return Err(format_error(
                    line_number,
                    format!("expected 3 tab-delimited fields but found {}", words.len()),
                ));
            }

            let scaffold = words[0];
            let parse_coordinate = |word: &str, name: &str| {
                word.parse::<i64>().map_err(|_| {
                    format_error(
                        line_number,
                        format!("can't parse {name} coordinate '{word}' as an integer"),
                    )
                })
            };
            let left = parse_coordinate(words[1], "left")?;
            let right = parse_coordinate(words[2], "right")?;

            if right <= left {
                return Err(format_error(
                    line_number,
                    format!("gap right coordinate {right} is not greater than left coordinate {left}"),
                ));
            }

            gap_index.add_gap(scaffold, left, right);
        }

        Ok(gap_index)
    }

    /// Append a gap to the end of its scaffold's gap list
    ///
    fn add_gap(&mut self, scaffold: &str, left: i64, right: i64) {
        let gaps = self
            .scaffold_gaps
            .entry(scaffold.to_string())
            .or_insert_with(|| {
                self.scaffold_order.push(scaffold.to_string());
                Vec::new()
            });
        let index = gaps.len() + 1;
        gaps.push(Gap {
            scaffold: scaffold.to_string(),
            index,
            left,
            right,
        });
    }

    /// Gaps for `scaffold` in table order, or None if the scaffold has no gaps
    pub fn get_scaffold_gaps(&self, scaffold: &str) -> Option<&[Gap]> {
        self.scaffold_gaps.get(scaffold).map(|x| x.as_slice())
    }

    /// Scaffold names in order of first appearance in the gap table
    pub fn scaffold_names(&self) -> &[String] {
        &self.scaffold_order
    }

    pub fn gap_count(&self) -> usize {
        self.scaffold_gaps.values().map(|x| x.len()).sum()
    }
}
