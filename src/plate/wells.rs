use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{LmdError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlateType {
    Wells96,
    Wells384,
}

impl PlateType {
    pub fn rows(&self) -> usize {
        match self {
            PlateType::Wells96 => 8,
            PlateType::Wells384 => 16,
        }
    }

    pub fn cols(&self) -> usize {
        match self {
            PlateType::Wells96 => 12,
            PlateType::Wells384 => 24,
        }
    }

    pub fn row_letters(&self) -> impl Iterator<Item = char> {
        (0..self.rows() as u8).map(|r| (b'A' + r) as char)
    }

    pub fn contains(&self, well: &Well) -> bool {
        (well.row as usize) < self.rows() && well.col >= 1 && (well.col as usize) <= self.cols()
    }
}

impl fmt::Display for PlateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                PlateType::Wells96 => "96",
                PlateType::Wells384 => "384",
            }
        )
    }
}

impl FromStr for PlateType {
    type Err = LmdError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "96" => Ok(PlateType::Wells96),
            "384" => Ok(PlateType::Wells384),
            other => Err(LmdError::InvalidPlate(other.to_string())),
        }
    }
}

/// Plate coordinate: row letter + 1-based column, e.g. `C5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Well {
    /// 0-based row index (`A` = 0).
    pub row: u8,
    /// 1-based column number.
    pub col: u16,
}

impl Well {
    pub fn new(row: u8, col: u16) -> Self {
        Self { row, col }
    }

    pub fn row_letter(&self) -> char {
        (b'A' + self.row) as char
    }
}

impl fmt::Display for Well {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row_letter(), self.col)
    }
}

impl FromStr for Well {
    type Err = LmdError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || LmdError::InvalidWell(s.to_string());
        let mut chars = s.chars();
        let row = match chars.next() {
            Some(c) if c.is_ascii_uppercase() => c as u8 - b'A',
            _ => return Err(invalid()),
        };
        let digits = chars.as_str();
        if digits.is_empty()
            || digits.starts_with('0')
            || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        let col: u16 = digits.parse().map_err(|_| invalid())?;
        Ok(Well { row, col })
    }
}

/// Parameters that generate the acceptable-well set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlateLayout {
    pub plate: PlateType,
    /// Rows and columns excluded at each edge of the plate.
    pub margin: usize,
    pub row_stride: usize,
    pub col_stride: usize,
}

impl Default for PlateLayout {
    fn default() -> Self {
        Self {
            plate: PlateType::Wells384,
            margin: 0,
            row_stride: 1,
            col_stride: 1,
        }
    }
}

impl PlateLayout {
    fn validate(&self) -> Result<()> {
        if self.row_stride == 0 || self.col_stride == 0 {
            return Err(LmdError::InvalidStride {
                row_stride: self.row_stride,
                col_stride: self.col_stride,
            });
        }
        let rows = self.plate.rows();
        let cols = self.plate.cols();
        if 2 * self.margin >= rows.min(cols) {
            return Err(LmdError::MarginTooLarge {
                margin: self.margin,
                rows,
                cols,
            });
        }
        Ok(())
    }

    /// Acceptable wells, enumerated row-major. The order is what default
    /// assignment pairs classes against, so it must stay stable.
    pub fn acceptable_wells(&self) -> Result<Vec<Well>> {
        self.validate()?;
        let rows = self.plate.rows();
        let cols = self.plate.cols();

        let mut wells = Vec::new();
        for row in (self.margin..rows - self.margin).step_by(self.row_stride) {
            for col in (1 + self.margin..=cols - self.margin).step_by(self.col_stride) {
                wells.push(Well::new(row as u8, col as u16));
            }
        }
        log::info!(
            "Created {} acceptable wells for {}-well plate (margin {}, strides {}x{})",
            wells.len(),
            self.plate,
            self.margin,
            self.row_stride,
            self.col_stride
        );
        Ok(wells)
    }

    /// Size of [`Self::acceptable_wells`] without enumerating it.
    pub fn expected_well_count(&self) -> Result<usize> {
        self.validate()?;
        let rows = self.plate.rows() - 2 * self.margin;
        let cols = self.plate.cols() - 2 * self.margin;
        Ok(rows.div_ceil(self.row_stride) * cols.div_ceil(self.col_stride))
    }
}

pub fn acceptable_wells(
    plate: PlateType,
    margin: usize,
    row_stride: usize,
    col_stride: usize,
) -> Result<Vec<Well>> {
    PlateLayout {
        plate,
        margin,
        row_stride,
        col_stride,
    }
    .acceptable_wells()
}

/// Collection-safe preset on a 384-well plate: rows C to N, columns 3 to 21.
pub fn default_acceptable_wells() -> Vec<Well> {
    let mut wells = Vec::with_capacity(12 * 19);
    for row in 2u8..14 {
        for col in 3u16..22 {
            wells.push(Well::new(row, col));
        }
    }
    wells
}

pub fn well_labels(wells: &[Well]) -> Vec<String> {
    wells.iter().map(|w| w.to_string()).collect()
}

#[cfg(test)]
mod wells_tests {
    use super::*;

    #[test]
    fn test_default_preset_is_228_wells_c3_to_n21() {
        let wells = default_acceptable_wells();
        assert_eq!(wells.len(), 228);
        assert_eq!(wells[0].to_string(), "C3");
        assert_eq!(wells[1].to_string(), "C4");
        assert_eq!(wells[wells.len() - 1].to_string(), "N21");
        assert!(!wells.contains(&"A1".parse().unwrap()));
    }

    #[test]
    fn test_full_384_plate() {
        let wells = acceptable_wells(PlateType::Wells384, 0, 1, 1).unwrap();
        assert_eq!(wells.len(), 384);
        assert_eq!(wells[0].to_string(), "A1");
        assert_eq!(wells[23].to_string(), "A24");
        assert_eq!(wells[24].to_string(), "B1");
        assert_eq!(wells[383].to_string(), "P24");
    }

    #[test]
    fn test_margin_trims_both_ends() {
        let wells = acceptable_wells(PlateType::Wells96, 1, 1, 1).unwrap();
        assert_eq!(wells.len(), 6 * 10);
        assert_eq!(wells[0].to_string(), "B2");
        assert_eq!(wells[wells.len() - 1].to_string(), "G11");
    }

    #[test]
    fn test_strides_subsample() {
        let wells = acceptable_wells(PlateType::Wells384, 0, 2, 2).unwrap();
        assert_eq!(wells.len(), 8 * 12);
        assert_eq!(well_labels(&wells[..3]), vec!["A1", "A3", "A5"]);
        assert_eq!(wells[12].to_string(), "C1");
    }

    #[test]
    fn test_count_matches_enumeration_for_all_layouts() {
        for plate in [PlateType::Wells96, PlateType::Wells384] {
            for margin in 0..plate.rows() / 2 {
                for row_stride in 1..4 {
                    for col_stride in 1..4 {
                        let layout = PlateLayout {
                            plate,
                            margin,
                            row_stride,
                            col_stride,
                        };
                        let wells = layout.acceptable_wells().unwrap();
                        assert_eq!(wells.len(), layout.expected_well_count().unwrap());
                        assert_eq!(wells, layout.acceptable_wells().unwrap());
                        assert!(wells.iter().all(|w| plate.contains(w)));
                    }
                }
            }
        }
    }

    #[test]
    fn test_margin_too_large() {
        assert!(matches!(
            acceptable_wells(PlateType::Wells96, 4, 1, 1),
            Err(LmdError::MarginTooLarge { .. })
        ));
        assert!(acceptable_wells(PlateType::Wells384, 7, 1, 1).is_ok());
        assert!(acceptable_wells(PlateType::Wells384, 8, 1, 1).is_err());
    }

    #[test]
    fn test_zero_stride_rejected() {
        assert!(matches!(
            acceptable_wells(PlateType::Wells384, 0, 0, 1),
            Err(LmdError::InvalidStride { .. })
        ));
    }

    #[test]
    fn test_plate_from_str() {
        assert_eq!("384".parse::<PlateType>().unwrap(), PlateType::Wells384);
        assert_eq!(" 96 ".parse::<PlateType>().unwrap(), PlateType::Wells96);
        assert!(matches!("48".parse::<PlateType>(), Err(LmdError::InvalidPlate(_))));
    }

    #[test]
    fn test_well_parsing() {
        assert_eq!("C5".parse::<Well>().unwrap(), Well::new(2, 5));
        assert_eq!("P24".parse::<Well>().unwrap().to_string(), "P24");
        for bad in ["", "5C", "C", "C05", "c5", "C5x", "C-1"] {
            assert!(bad.parse::<Well>().is_err(), "{} should not parse", bad);
        }
    }
}
