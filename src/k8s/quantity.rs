//! Kubernetes quantity strings (`250m`, `16318480Ki`, `1.5Gi`, `123456789n`)

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;
pub const GIB: u64 = 1024 * MIB;

const NANOS_PER_UNIT: u128 = 1_000_000_000;

static QUANTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\+?(?P<whole>[0-9]*)(?:\.(?P<frac>[0-9]*))?(?:[eE](?P<exp>[+-]?[0-9]+)|(?P<suffix>Ki|Mi|Gi|Ti|Pi|Ei|n|u|m|k|M|G|T|P|E))?$",
    )
        .expect("quantity pattern is valid")
});

#[derive(Error, Debug, PartialEq, Eq)]
pub enum QuantityError {
    #[error("invalid quantity '{0}'")]
    Invalid(String),

    #[error("quantity '{0}' is out of range")]
    Overflow(String),
}

/// Parse a quantity into billionths of its base unit (cores or bytes)
fn parse_nanos(input: &str) -> Result<u128, QuantityError> {
    let trimmed = input.trim();
    let caps = QUANTITY_RE
        .captures(trimmed)
        .ok_or_else(|| QuantityError::Invalid(input.to_string()))?;
    let overflow = || QuantityError::Overflow(input.to_string());

    let whole = &caps["whole"];
    let frac = caps.name("frac").map(|m| m.as_str()).unwrap_or_default();
    // A bare sign or dot has no digits at all
    if whole.is_empty() && frac.is_empty() {
        return Err(QuantityError::Invalid(input.to_string()));
    }

    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| overflow())?
    };
    let mut mantissa = whole.checked_mul(NANOS_PER_UNIT).ok_or_else(overflow)?;

    // Fraction digits beyond nano precision are dropped
    let digits: String = frac.chars().take(9).collect();
    if !digits.is_empty() {
        let scale = 10u128.pow(9 - digits.len() as u32);
        let value: u128 = digits.parse().map_err(|_| overflow())?;
        mantissa += value * scale;
    }

    let (num, den): (u128, u128) = if let Some(exp) = caps.name("exp") {
        let exp: i32 = exp.as_str().parse().map_err(|_| overflow())?;
        if exp.unsigned_abs() > 30 {
            return Err(overflow());
        }
        let factor = 10u128.pow(exp.unsigned_abs());
        if exp >= 0 { (factor, 1) } else { (1, factor) }
    } else {
        match caps.name("suffix").map(|m| m.as_str()) {
            None => (1, 1),
            Some("n") => (1, 1_000_000_000),
            Some("u") => (1, 1_000_000),
            Some("m") => (1, 1_000),
            Some("k") => (1_000, 1),
            Some("M") => (1_000_000, 1),
            Some("G") => (1_000_000_000, 1),
            Some("T") => (1_000_000_000_000, 1),
            Some("P") => (1_000_000_000_000_000, 1),
            Some("E") => (1_000_000_000_000_000_000, 1),
            Some("Ki") => (1 << 10, 1),
            Some("Mi") => (1 << 20, 1),
            Some("Gi") => (1 << 30, 1),
            Some("Ti") => (1 << 40, 1),
            Some("Pi") => (1 << 50, 1),
            Some("Ei") => (1 << 60, 1),
            Some(_) => return Err(QuantityError::Invalid(input.to_string())),
        }
    };

    Ok(mantissa.checked_mul(num).ok_or_else(overflow)? / den)
}

fn narrow(value: u128, input: &str) -> Result<u64, QuantityError> {
    u64::try_from(value).map_err(|_| QuantityError::Overflow(input.to_string()))
}

/// CPU quantity in millicores, truncating sub-millicore precision
pub fn cpu_millis(input: &str) -> Result<u64, QuantityError> {
    narrow(parse_nanos(input)? / 1_000_000, input)
}

/// Memory or storage quantity in bytes
pub fn memory_bytes(input: &str) -> Result<u64, QuantityError> {
    narrow(parse_nanos(input)? / NANOS_PER_UNIT, input)
}

pub fn mebibytes(bytes: u64) -> u64 {
    bytes / MIB
}

pub fn gibibytes(bytes: u64) -> u64 {
    bytes / GIB
}

/// `used / capacity * 100`, rounded to the nearest integer; 0 when capacity is 0
pub fn percent(used: u64, capacity: u64) -> u64 {
    if capacity == 0 {
        return 0;
    }
    let scaled = used as u128 * 100;
    let capacity = capacity as u128;
    ((scaled + capacity / 2) / capacity) as u64
}
