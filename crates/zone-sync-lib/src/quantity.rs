//! Best-effort parsing of resource quantity strings
//!
//! Clusters report capacity as Kubernetes-style quantities (`16`, `64Gi`,
//! `500GB`, `4000m`). These helpers normalize them to whole cores or whole
//! GB, rounding toward zero. Malformed input yields 0; nothing here errors.

const BYTES_PER_DECIMAL_GB: u128 = 1_000_000_000;
const BYTES_PER_BINARY_GB: u128 = 1 << 30;

/// Multiplier family of a unit suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    /// Power of 1000 (K, M, G, T)
    Decimal(u32),
    /// Power of 1024 (Ki, Mi, Gi, Ti)
    Binary(u32),
}

impl Unit {
    fn multiplier(self) -> u128 {
        match self {
            Unit::Decimal(exp) => 1000u128.pow(exp),
            Unit::Binary(exp) => 1024u128.pow(exp),
        }
    }
}

/// Parse a CPU quantity into whole cores
///
/// A bare number (or an unrecognized suffix) is taken as cores already.
/// Lowercase `m` means millicores.
pub fn parse_cpu_cores(input: &str) -> i64 {
    let Some((value, suffix)) = split_quantity(input) else {
        return 0;
    };

    if suffix == "m" {
        return clamp(value / 1000);
    }

    match parse_unit(suffix) {
        Some(unit) => clamp(value.saturating_mul(unit.multiplier())),
        None => clamp(value),
    }
}

/// Parse a memory quantity into whole GB
///
/// A quantity without a recognized unit is rejected (0).
pub fn parse_memory_gb(input: &str) -> i64 {
    parse_bytes_as_gb(input)
}

/// Parse a storage quantity into whole GB
pub fn parse_storage_gb(input: &str) -> i64 {
    parse_bytes_as_gb(input)
}

fn parse_bytes_as_gb(input: &str) -> i64 {
    let Some((value, suffix)) = split_quantity(input) else {
        return 0;
    };

    let Some(unit) = parse_unit(suffix) else {
        return 0;
    };

    let bytes = value.saturating_mul(unit.multiplier());
    let per_gb = match unit {
        Unit::Decimal(_) => BYTES_PER_DECIMAL_GB,
        Unit::Binary(_) => BYTES_PER_BINARY_GB,
    };

    clamp(bytes / per_gb)
}

/// Split a quantity into its leading integer and the trimmed suffix.
/// Any fractional digits are dropped.
fn split_quantity(input: &str) -> Option<(u128, &str)> {
    let trimmed = input.trim();
    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());

    if digits_end == 0 {
        return None;
    }

    let value = trimmed[..digits_end].bytes().fold(0u128, |acc, b| {
        acc.saturating_mul(10).saturating_add(u128::from(b - b'0'))
    });

    let mut rest = &trimmed[digits_end..];
    if let Some(fraction) = rest.strip_prefix('.') {
        let fraction_end = fraction
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(fraction.len());
        rest = &fraction[fraction_end..];
    }

    Some((value, rest.trim()))
}

fn parse_unit(suffix: &str) -> Option<Unit> {
    let lower = suffix.to_ascii_lowercase();
    let unit = match lower.strip_suffix('b') {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => lower.as_str(),
    };

    match unit {
        "k" => Some(Unit::Decimal(1)),
        "m" => Some(Unit::Decimal(2)),
        "g" => Some(Unit::Decimal(3)),
        "t" => Some(Unit::Decimal(4)),
        "ki" => Some(Unit::Binary(1)),
        "mi" => Some(Unit::Binary(2)),
        "gi" => Some(Unit::Binary(3)),
        "ti" => Some(Unit::Binary(4)),
        _ => None,
    }
}

fn clamp(value: u128) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
