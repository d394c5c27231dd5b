//! CSV persistence for records and resolution maps
//!
//! One row per CID with `cid` as the first column, readable back into
//! `ChemicalRecord`.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use chemres_core::{ChemicalRecord, ResolutionMap};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("Failed to open {path}: {message}")]
    OpenFailed { path: String, message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type TableResult<T> = Result<T, TableError>;

pub fn write_records<W: Write>(writer: W, records: &[ChemicalRecord]) -> TableResult<()> {
    let mut csv = csv::Writer::from_writer(writer);
    if records.is_empty() {
        csv.write_record(["cid", "molecular_weight", "smiles", "iupac_name", "title"])?;
    }
    for record in records {
        csv.serialize(record)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn read_records<R: Read>(reader: R) -> TableResult<Vec<ChemicalRecord>> {
    let mut csv = csv::Reader::from_reader(reader);
    let records = csv.deserialize().collect::<Result<Vec<ChemicalRecord>, _>>()?;
    Ok(records)
}

pub fn write_resolution_map<W: Write>(writer: W, map: &ResolutionMap) -> TableResult<()> {
    let mut csv = csv::Writer::from_writer(writer);
    if map.is_empty() {
        csv.write_record(["identifier", "cid"])?;
    }
    for entry in map.entries() {
        csv.serialize(entry)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn read_records_file(path: &Path) -> TableResult<Vec<ChemicalRecord>> {
    let file = File::open(path).map_err(|e| TableError::OpenFailed {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    read_records(file)
}

/// Writer for `path`, or stdout when no path is given
pub fn output(path: Option<&Path>) -> TableResult<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path).map_err(|e| TableError::OpenFailed {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            Ok(Box::new(io::BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}
