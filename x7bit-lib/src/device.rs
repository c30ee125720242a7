//! Zynq-7000 device catalogue.
//!
//! An immutable registry of device descriptors keyed by IDCODE. Each
//! descriptor carries its block RAM inventory as a per-column table;
//! RAMB18 primitives are not listed separately but derived as the two
//! halves of each RAMB36.

use crate::error::X7Error;
use std::fmt;
use std::str::FromStr;
use strum_macros::Display;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// IDCODE bits identifying the device family and part; the top four bits
/// carry the silicon revision and are ignored for catalogue lookups.
const IDCODE_PART_MASK: u32 = 0x0FFF_FFFF;

/// Block RAM primitive category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[strum(serialize_all = "lowercase")]
pub enum BramCategory {
    Ramb36,
    Ramb18,
}

impl FromStr for BramCategory {
    type Err = X7Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ramb36" => Ok(Self::Ramb36),
            "ramb18" => Ok(Self::Ramb18),
            other => Err(X7Error::InvalidArgument(format!(
                "unknown block ram category: {other}"
            ))),
        }
    }
}

/// One block RAM site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bram {
    pub category: BramCategory,
    /// Linear index within the device, column-major bottom to top.
    pub index: usize,
    pub x: u32,
    pub y: u32,
}

impl Bram {
    /// The Vivado site name, e.g. `RAMB36_X0Y5`.
    pub fn site_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Bram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let primitive = match self.category {
            BramCategory::Ramb36 => "RAMB36",
            BramCategory::Ramb18 => "RAMB18",
        };
        write!(f, "{}_X{}Y{}", primitive, self.x, self.y)
    }
}

/// A vertical run of RAMB36 sites sharing an X coordinate.
#[derive(Debug, Clone, Copy)]
struct BramColumn {
    x: u32,
    y0: u32,
    count: u32,
}

/// Description of a Zynq-7000 device.
#[derive(Debug)]
pub struct Zynq7 {
    name: &'static str,
    idcode: u32,
    bram_columns: &'static [BramColumn],
}

impl Zynq7 {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn idcode(&self) -> u32 {
        self.idcode
    }

    /// Number of block RAMs of the given category.
    pub fn num_brams(&self, category: BramCategory) -> usize {
        let ramb36: usize = self.bram_columns.iter().map(|c| c.count as usize).sum();
        match category {
            BramCategory::Ramb36 => ramb36,
            BramCategory::Ramb18 => 2 * ramb36,
        }
    }

    /// Gets a block RAM by its linear index.
    pub fn bram_at(&self, category: BramCategory, index: usize) -> Result<Bram, X7Error> {
        match category {
            BramCategory::Ramb36 => {
                let mut base = 0;
                for column in self.bram_columns {
                    let count = column.count as usize;
                    if index < base + count {
                        return Ok(Bram {
                            category,
                            index,
                            x: column.x,
                            y: column.y0 + (index - base) as u32,
                        });
                    }
                    base += count;
                }
                Err(X7Error::OutOfRange { index, limit: base })
            }
            BramCategory::Ramb18 => {
                let limit = self.num_brams(BramCategory::Ramb18);
                if index >= limit {
                    return Err(X7Error::OutOfRange { index, limit });
                }
                let host = self.bram_at(BramCategory::Ramb36, index / 2)?;
                Ok(Bram {
                    category,
                    index,
                    x: host.x,
                    y: 2 * host.y + (index & 1) as u32,
                })
            }
        }
    }

    /// Gets a block RAM by its X/Y site coordinates.
    pub fn bram_by_loc(&self, category: BramCategory, x: u32, y: u32) -> Result<Bram, X7Error> {
        match category {
            BramCategory::Ramb36 => {
                let mut base = 0;
                for column in self.bram_columns {
                    if column.x == x && (column.y0..column.y0 + column.count).contains(&y) {
                        return Ok(Bram {
                            category,
                            index: base + (y - column.y0) as usize,
                            x,
                            y,
                        });
                    }
                    base += column.count as usize;
                }
                Err(X7Error::InvalidArgument(format!(
                    "no RAMB36 site at X{x}Y{y} on {}",
                    self.name
                )))
            }
            BramCategory::Ramb18 => {
                let host = self
                    .bram_by_loc(BramCategory::Ramb36, x, y / 2)
                    .map_err(|_| {
                        X7Error::InvalidArgument(format!(
                            "no RAMB18 site at X{x}Y{y} on {}",
                            self.name
                        ))
                    })?;
                Ok(Bram {
                    category,
                    index: 2 * host.index + (y & 1) as usize,
                    x,
                    y,
                })
            }
        }
    }
}

static XC7Z010_BRAM_COLUMNS: [BramColumn; 3] = [
    BramColumn { x: 0, y0: 0, count: 20 },
    BramColumn { x: 1, y0: 0, count: 20 },
    BramColumn { x: 2, y0: 0, count: 20 },
];

static XC7Z020_BRAM_COLUMNS: [BramColumn; 5] = [
    BramColumn { x: 0, y0: 0, count: 30 },
    BramColumn { x: 1, y0: 0, count: 30 },
    BramColumn { x: 2, y0: 0, count: 30 },
    BramColumn { x: 3, y0: 0, count: 30 },
    BramColumn { x: 4, y0: 0, count: 20 },
];

/// All known Zynq-7000 devices.
pub static DEVICES: &[Zynq7] = &[
    Zynq7 {
        name: "xc7z010",
        idcode: 0x0372_2093,
        bram_columns: &XC7Z010_BRAM_COLUMNS,
    },
    Zynq7 {
        name: "xc7z020",
        idcode: 0x0372_7093,
        bram_columns: &XC7Z020_BRAM_COLUMNS,
    },
];

/// Looks up the device for a given IDCODE, ignoring the revision bits.
pub fn get_by_idcode(idcode: u32) -> Result<&'static Zynq7, X7Error> {
    DEVICES
        .iter()
        .find(|device| device.idcode & IDCODE_PART_MASK == idcode & IDCODE_PART_MASK)
        .ok_or(X7Error::UnknownDevice { idcode })
}
