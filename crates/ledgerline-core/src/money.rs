//! Decimal amount parsing and formatting.
//!
//! Form input arrives as strings. Malformed input is an error, never a silent
//! zero; only an absent or blank optional amount counts as zero.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is required")]
    Empty,
    #[error("'{0}' is not a valid amount")]
    Invalid(String),
}

pub fn parse_amount(raw: &str) -> Result<Decimal, AmountError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }

    Decimal::from_str(trimmed).map_err(|_| AmountError::Invalid(trimmed.to_string()))
}

pub fn parse_optional_amount(raw: Option<&str>) -> Result<Decimal, AmountError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Decimal::ZERO),
        Some(value) => parse_amount(value),
    }
}

/// Rounds half away from zero to cents.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// True when the amount has no fraction of a cent, e.g. `100.50` or
/// `100.500` but not `100.005`.
pub fn is_whole_cents(amount: Decimal) -> bool {
    amount.normalize().scale() <= 2
}

/// Two-decimal string used for submitted amounts, e.g. `105.00`.
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", round_money(amount))
}

/// Display string with thousands separators, e.g. `-1,234.50`.
pub fn format_display(amount: Decimal) -> String {
    let rounded = round_money(amount);
    let fixed = format!("{:.2}", rounded.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{fraction}")
}

pub fn format_currency(amount: Decimal, currency: &str) -> String {
    let display = format_display(amount);
    let (sign, digits) = match display.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", display.as_str()),
    };

    match currency.trim().to_ascii_uppercase().as_str() {
        "" | "USD" => format!("{sign}${digits}"),
        code => format!("{sign}{code} {digits}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_garbage_instead_of_defaulting() {
        assert_eq!(parse_amount("  "), Err(AmountError::Empty));
        assert_eq!(
            parse_amount("12abc"),
            Err(AmountError::Invalid("12abc".to_string()))
        );
        assert_eq!(parse_amount(" 200 ").unwrap(), Decimal::new(200, 0));
    }

    #[test]
    fn optional_amount_defaults_only_when_blank() {
        assert_eq!(parse_optional_amount(None).unwrap(), Decimal::ZERO);
        assert_eq!(parse_optional_amount(Some("")).unwrap(), Decimal::ZERO);
        assert_eq!(parse_optional_amount(Some("5")).unwrap(), Decimal::new(5, 0));
        assert!(parse_optional_amount(Some("five")).is_err());
    }

    #[test]
    fn sub_cent_amounts_are_detected() {
        assert!(is_whole_cents(Decimal::new(10050, 2)));
        assert!(is_whole_cents(Decimal::new(100500, 3)));
        assert!(is_whole_cents(Decimal::new(200, 0)));
        assert!(!is_whole_cents(Decimal::new(100005, 3)));
    }

    #[test]
    fn formats_two_decimals() {
        assert_eq!(format_amount(Decimal::new(105, 0)), "105.00");
        assert_eq!(format_amount(Decimal::new(12345, 3)), "12.35");
        assert_eq!(format_amount(Decimal::new(-5, 0)), "-5.00");
    }

    #[test]
    fn display_groups_thousands() {
        assert_eq!(format_display(Decimal::new(123456789, 2)), "1,234,567.89");
        assert_eq!(format_display(Decimal::new(-100050, 2)), "-1,000.50");
        assert_eq!(format_display(Decimal::new(999, 0)), "999.00");
        assert_eq!(format_display(Decimal::ZERO), "0.00");
    }

    #[test]
    fn currency_prefix() {
        assert_eq!(format_currency(Decimal::new(150000, 2), "usd"), "$1,500.00");
        assert_eq!(format_currency(Decimal::new(-2500, 2), "USD"), "-$25.00");
        assert_eq!(format_currency(Decimal::new(42, 0), "EUR"), "EUR 42.00");
    }
}
