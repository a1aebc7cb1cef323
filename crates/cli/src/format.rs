//! Currency and date rendering for terminal output.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

pub const CURRENCY_SYMBOL: char = '₱';

/// Peso amount with thousands separators and at most two fraction digits,
/// trailing zeros dropped: `₱1,150`, `₱29.5`, `₱1,234.57`.
pub fn currency(amount: Decimal) -> String {
    let rounded = amount
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    let text = rounded.abs().to_string();
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (text.as_str(), None),
    };

    let mut out = String::with_capacity(text.len() + text.len() / 3 + 2);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        out.push('-');
    }
    out.push(CURRENCY_SYMBOL);
    out.push_str(&group_thousands(whole));
    if let Some(fraction) = fraction {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `Oct 1, 2025`.
pub fn date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Interest rate as a percentage without trailing zeros: `15%`, `12.5%`.
pub fn percent(rate: Decimal) -> String {
    format!("{}%", rate.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn formats_currency() {
        assert_eq!(currency(dec!(1150)), "₱1,150");
        assert_eq!(currency(dec!(1150.00)), "₱1,150");
        assert_eq!(currency(dec!(29.5)), "₱29.5");
        assert_eq!(currency(dec!(1234.567)), "₱1,234.57");
        assert_eq!(currency(dec!(0)), "₱0");
        assert_eq!(currency(dec!(999)), "₱999");
        assert_eq!(currency(dec!(1000000)), "₱1,000,000");
        assert_eq!(currency(dec!(-250.125)), "-₱250.13");
    }

    #[test]
    fn formats_dates_and_rates() {
        assert_eq!(date(NaiveDate::from_ymd_opt(2025, 10, 1).unwrap()), "Oct 1, 2025");
        assert_eq!(date(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()), "Dec 31, 2025");
        assert_eq!(percent(dec!(15)), "15%");
        assert_eq!(percent(dec!(12.50)), "12.5%");
    }
}
