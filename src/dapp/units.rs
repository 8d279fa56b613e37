//! Decimal string <-> smallest-unit integer conversion.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UnitsError {
    #[error("amount is empty")]
    Empty,
    #[error("invalid amount: {0}")]
    Invalid(String),
    #[error("too many decimals for {decimals}-decimal unit: {value}")]
    TooPrecise { value: String, decimals: u8 },
    #[error("amount overflows: {0}")]
    Overflow(String),
}

/// `"1.5"` with 18 decimals -> `1_500_000_000_000_000_000`.
pub fn parse_units(amount: &str, decimals: u8) -> Result<u128, UnitsError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(UnitsError::Empty);
    }
    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
        return Err(UnitsError::Invalid(amount.to_string()));
    }

    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > decimals as usize {
        return Err(UnitsError::TooPrecise { value: amount.to_string(), decimals });
    }

    let overflow = || UnitsError::Overflow(amount.to_string());
    let scale = 10u128.checked_pow(decimals as u32).ok_or_else(overflow)?;
    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| overflow())? };
    let fraction_value: u128 = if fraction.is_empty() {
        0
    } else {
        let padding = 10u128.pow((decimals as usize - fraction.len()) as u32);
        fraction.parse::<u128>().map_err(|_| overflow())? * padding
    };

    whole
        .checked_mul(scale)
        .and_then(|v| v.checked_add(fraction_value))
        .ok_or_else(overflow)
}

/// Inverse of [`parse_units`]; always keeps at least one fractional digit.
pub fn format_units(value: u128, decimals: u8) -> String {
    let digits = value.to_string();
    let decimals = decimals as usize;
    let (whole, fraction) = if digits.len() > decimals {
        let split = digits.len() - decimals;
        (digits[..split].to_string(), digits[split..].to_string())
    } else {
        ("0".to_string(), format!("{digits:0>decimals$}"))
    };
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        format!("{whole}.0")
    } else {
        format!("{whole}.{fraction}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_amounts() {
        assert_eq!(parse_units("1.5", 18), Ok(1_500_000_000_000_000_000));
        assert_eq!(parse_units("0.05", 8), Ok(5_000_000));
        assert_eq!(parse_units("12", 6), Ok(12_000_000));
        assert_eq!(parse_units(".5", 1), Ok(5));
        assert_eq!(parse_units("1.000", 0), Ok(1));
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(parse_units("  ", 18), Err(UnitsError::Empty));
        assert!(matches!(parse_units("-1", 18), Err(UnitsError::Invalid(_))));
        assert!(matches!(parse_units("1e18", 18), Err(UnitsError::Invalid(_))));
        assert!(matches!(parse_units("1.2.3", 18), Err(UnitsError::Invalid(_))));
        assert!(matches!(parse_units(".", 18), Err(UnitsError::Invalid(_))));
        assert!(matches!(parse_units("0.123", 2), Err(UnitsError::TooPrecise { decimals: 2, .. })));
        assert!(matches!(parse_units("1", 39), Err(UnitsError::Overflow(_))));
    }

    #[test]
    fn formats_like_ethers() {
        assert_eq!(format_units(1_500_000_000_000_000_000, 18), "1.5");
        assert_eq!(format_units(1_000_000, 6), "1.0");
        assert_eq!(format_units(5, 8), "0.00000005");
        assert_eq!(format_units(42, 0), "42.0");
    }
}
