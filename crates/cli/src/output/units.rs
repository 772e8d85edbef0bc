//! Display units for usage totals

use std::fmt;
use std::str::FromStr;

use ossdu_core::Error;

/// Unit of the `total du size` line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlockSize {
    #[default]
    Byte,
    Kb,
    Mb,
    Gb,
    Tb,
}

impl BlockSize {
    /// Bytes per unit (powers of 1024)
    pub const fn bytes(self) -> i64 {
        match self {
            BlockSize::Byte => 1,
            BlockSize::Kb => 1 << 10,
            BlockSize::Mb => 1 << 20,
            BlockSize::Gb => 1 << 30,
            BlockSize::Tb => 1 << 40,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            BlockSize::Byte => "byte",
            BlockSize::Kb => "KB",
            BlockSize::Mb => "MB",
            BlockSize::Gb => "GB",
            BlockSize::Tb => "TB",
        }
    }

    /// Render a byte count in this unit
    ///
    /// Bytes print as an integer, every larger unit with four decimals.
    pub fn format(self, bytes: i64) -> String {
        match self {
            BlockSize::Byte => bytes.to_string(),
            _ => format!("{:.4}", bytes as f64 / self.bytes() as f64),
        }
    }
}

impl FromStr for BlockSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_ascii_lowercase().as_str() {
            "byte" => Ok(BlockSize::Byte),
            "kb" => Ok(BlockSize::Kb),
            "mb" => Ok(BlockSize::Mb),
            "gb" => Ok(BlockSize::Gb),
            "tb" => Ok(BlockSize::Tb),
            _ => Err(Error::Usage(format!(
                "block size must be byte, KB, MB, GB or TB, got '{s}'"
            ))),
        }
    }
}

impl fmt::Display for BlockSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Bytes as MiB with two decimals
pub fn format_mib(bytes: i64) -> String {
    format!("{:.2}", bytes as f64 / (1u64 << 20) as f64)
}
