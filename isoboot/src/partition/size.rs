//! Human-readable size parsing.

use isoboot_shared::errors::IsobootError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SizeParseError {
    #[error("empty size")]
    Empty,

    #[error("invalid number in size '{0}'")]
    InvalidNumber(String),

    #[error("unknown size unit '{0}' (use M, G or T)")]
    UnknownUnit(String),

    #[error("size '{0}' is not a whole number of MiB")]
    NotMibAligned(String),

    #[error("size '{0}' is too large")]
    Overflow(String),
}

impl From<SizeParseError> for IsobootError {
    fn from(err: SizeParseError) -> Self {
        IsobootError::Config(err.to_string())
    }
}

/// Parse a size into MiB.
///
/// A bare number is MiB. Units are binary and case-insensitive:
/// `K`/`KiB`, `M`/`MiB`, `G`/`GiB`, `T`/`TiB`. Kibibyte values must add up
/// to whole MiB.
pub fn parse_size_mib(input: &str) -> Result<u64, SizeParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SizeParseError::Empty);
    }

    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);
    let value: u64 = digits
        .parse()
        .map_err(|_| SizeParseError::InvalidNumber(trimmed.to_string()))?;

    let overflow = || SizeParseError::Overflow(trimmed.to_string());
    match unit.trim().to_ascii_lowercase().as_str() {
        "k" | "kib" => {
            if value % 1024 != 0 {
                return Err(SizeParseError::NotMibAligned(trimmed.to_string()));
            }
            Ok(value / 1024)
        }
        "" | "m" | "mib" => Ok(value),
        "g" | "gib" => value.checked_mul(1024).ok_or_else(overflow),
        "t" | "tib" => value.checked_mul(1024 * 1024).ok_or_else(overflow),
        other => Err(SizeParseError::UnknownUnit(other.to_string())),
    }
}
