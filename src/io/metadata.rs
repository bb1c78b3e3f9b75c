use csv::ReaderBuilder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::error::{LmdError, Result};
use crate::plate::scheme::PlateScheme;
use crate::plate::wells::{PlateType, Well};

/// Comma or tab, whichever the header line uses more. Defaults to comma.
fn detect_delimiter(first_line: &str) -> u8 {
    let tabs = first_line.matches('\t').count();
    let commas = first_line.matches(',').count();
    if tabs > commas {
        b'\t'
    } else {
        b','
    }
}

/// Per-sample metadata, one row per classification name. All cells are kept
/// as text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetadataTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl MetadataTable {
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(reader);
        let headers = rdr
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect::<Vec<_>>();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self { headers, rows })
    }

    /// Reads a CSV or TSV file, sniffing the delimiter from the first line.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut first_line = String::new();
        BufReader::new(File::open(path.as_ref())?).read_line(&mut first_line)?;
        let delimiter = detect_delimiter(&first_line);

        let table = Self::from_reader(File::open(path.as_ref())?, delimiter)?;
        log::info!(
            "Metadata {:?} loaded: {} rows, columns {:?}",
            path.as_ref(),
            table.rows.len(),
            table.headers
        );
        Ok(table)
    }

    pub fn from_csv_str(text: &str) -> Result<Self> {
        let first_line = text.lines().next().unwrap_or_default();
        Self::from_reader(text.as_bytes(), detect_delimiter(first_line))
    }

    fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name.trim())
            .ok_or_else(|| LmdError::MissingColumn {
                column: name.to_string(),
                available: self.headers.clone(),
            })
    }

    /// Values of one column; short rows yield empty cells.
    pub fn column(&self, name: &str) -> Result<Vec<&str>> {
        let idx = self.column_index(name)?;
        Ok(self
            .rows
            .iter()
            .map(|r| r.get(idx).map_or("", String::as_str))
            .collect())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Reads an edited plate grid back: header `,1,2,..`, one row per plate row
/// with its letter in the first column.
pub fn read_plate_scheme<R: Read>(reader: R, plate: PlateType) -> Result<PlateScheme> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let columns: Vec<Option<u16>> = rdr
        .headers()?
        .iter()
        .skip(1)
        .map(|h| h.trim().parse::<u16>().ok())
        .collect();

    let mut scheme = PlateScheme::empty(plate);
    for record in rdr.records() {
        let record = record?;
        let label = record.get(0).unwrap_or_default().trim();
        for (col, value) in columns.iter().zip(record.iter().skip(1)) {
            let value = value.trim();
            let Some(col) = col else { continue };
            if value.is_empty() {
                continue;
            }
            let well: Well = format!("{}{}", label, col).parse()?;
            if !scheme.set(well, value) {
                return Err(LmdError::InvalidWell(well.to_string()));
            }
        }
    }
    Ok(scheme)
}
