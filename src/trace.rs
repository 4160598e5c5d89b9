//! CSV export of recorded register writes
//!
//! One row per data write: `time_us,address,value`, with the address and
//! value as `0x`-prefixed hex bytes.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ym2203::RegisterWrite;
use crate::Result;

/// One CSV row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRow {
    /// Bus time of the data phase in microseconds
    pub time_us: u64,
    /// Register address, `0xNN`
    pub address: String,
    /// Written value, `0xNN`
    pub value: String,
}

impl From<&RegisterWrite> for TraceRow {
    fn from(write: &RegisterWrite) -> Self {
        TraceRow {
            time_us: write.time_us,
            address: format!("0x{:02X}", write.address),
            value: format!("0x{:02X}", write.value),
        }
    }
}

/// Write `writes` as CSV (with header) to any writer
pub fn write_csv<W: Write>(writer: W, writes: &[RegisterWrite]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for write in writes {
        csv.serialize(TraceRow::from(write))?;
    }
    csv.flush()?;
    Ok(())
}

/// Write `writes` as CSV to a new file at `path`
pub fn save_csv(path: impl AsRef<Path>, writes: &[RegisterWrite]) -> Result<()> {
    let file = File::create(path)?;
    write_csv(file, writes)
}
