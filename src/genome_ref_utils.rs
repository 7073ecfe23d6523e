use std::fs::File;

use bio::io::fasta;
use camino::Utf8Path;
use log::info;

use crate::errors::{GapSupportError, GapSupportResult};

/// Read scaffold names from a fasta file pointer, in file order
///
pub fn get_scaffold_names_from_fasta_fp(file: File) -> std::io::Result<Vec<String>> {
    let reader = fasta::Reader::new(file);

    let mut scaffold_names = Vec::new();
    for result in reader.records() {
        let record = result?;
        scaffold_names.push(record.id().to_string());
    }
    Ok(scaffold_names)
}

/// Read scaffold names from the scaffold fasta file, in file order
///
pub fn get_scaffold_names_from_fasta(filename: &Utf8Path) -> GapSupportResult<Vec<String>> {
    info!("Reading scaffold names from file '{filename}'");

    let file = File::open(filename).map_err(|e| GapSupportError::io(filename, e))?;
    get_scaffold_names_from_fasta_fp(file).map_err(|e| GapSupportError::io(filename, e))
}
