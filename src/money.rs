use rust_decimal::prelude::*;

/// Parses a price cell the way the usage export writes them: invariant culture, one optional
/// leading or trailing sign (`-100`, `100-`), `,` thousands separators, accounting parentheses
/// for negatives and exponent notation.
///
/// # Returns
/// `None` for empty or unparseable text, and for values outside `Decimal`'s range
/// (magnitude above roughly 7.9e28).
pub fn parse_amount(text: &str) -> Option<Decimal> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (negated, body) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner.trim()),
        None => (false, trimmed),
    };

    let (trailing_negative, body) = match body.strip_suffix(['-', '+']) {
        Some(rest) if rest.starts_with(['-', '+']) => return None,
        Some(rest) => (body.ends_with('-'), rest.trim_end()),
        None => (false, body),
    };

    let cleaned: String = body.chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }

    let value = cleaned
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()?;

    Some(if negated ^ trailing_negative { -value } else { value })
}

/// Renders an amount with `,` thousands grouping and a fixed number of decimals,
/// rounding midpoints away from zero.
pub fn group_thousands(amount: Decimal, decimals: u32) -> String {
    let rounded = amount.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let digits = format!("{:.*}", decimals as usize, rounded.abs());

    let (int_part, frac_part) = match digits.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (digits.as_str(), None),
    };

    let mut grouped = String::with_capacity(digits.len() + int_part.len() / 3 + 1);
    if negative {
        grouped.push('-');
    }
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac_part) = frac_part {
        grouped.push('.');
        grouped.push_str(frac_part);
    }
    grouped
}

/// `NT$` prefixed, grouped, no decimals. Used in draft bodies.
pub fn nt_dollars(amount: Decimal) -> String {
    format!("NT${}", group_thousands(amount, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;

    #[test]
    fn test_parse_plain_and_signed_values() {
        assert_eq!(parse_amount("100"), Some(dec!(100)));
        assert_eq!(parse_amount("  12.50 "), Some(dec!(12.50)));
        assert_eq!(parse_amount("-3.2"), Some(dec!(-3.2)));
    }

    #[test]
    fn test_parse_trailing_sign() {
        assert_eq!(parse_amount("100-"), Some(dec!(-100)));
        assert_eq!(parse_amount("1,250.5 -"), Some(dec!(-1250.5)));
        assert_eq!(parse_amount("100+"), Some(dec!(100)));
        assert_eq!(parse_amount("-100-"), None);
        assert_eq!(parse_amount("-"), None);
    }

    #[test]
    fn test_parse_out_of_range_is_none() {
        assert_eq!(parse_amount("99999999999999999999999999999999"), None);
    }

    #[test]
    fn test_parse_thousands_and_parentheses() {
        assert_eq!(parse_amount("1,234,567.89"), Some(dec!(1234567.89)));
        assert_eq!(parse_amount("(1,000)"), Some(dec!(-1000)));
    }

    #[test]
    fn test_parse_exponent() {
        assert_eq!(parse_amount("1.5e3"), Some(dec!(1500)));
    }

    #[test]
    fn test_parse_rejects_blank_and_garbage() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("   "), None);
        assert_eq!(parse_amount("N/A"), None);
        assert_eq!(parse_amount("()"), None);
    }

    #[test]
    fn test_group_thousands_without_decimals() {
        assert_eq!(group_thousands(dec!(0), 0), "0");
        assert_eq!(group_thousands(dec!(300), 0), "300");
        assert_eq!(group_thousands(dec!(1234), 0), "1,234");
        assert_eq!(group_thousands(dec!(1234567), 0), "1,234,567");
        assert_eq!(group_thousands(dec!(999.5), 0), "1,000");
        assert_eq!(group_thousands(dec!(-1234.4), 0), "-1,234");
    }

    #[test]
    fn test_group_thousands_with_decimals() {
        assert_eq!(group_thousands(dec!(1234.5), 2), "1,234.50");
        assert_eq!(group_thousands(dec!(0.125), 2), "0.13");
        assert_eq!(group_thousands(dec!(-0.001), 2), "0.00");
    }

    #[test]
    fn test_nt_dollars() {
        assert_eq!(nt_dollars(dec!(300)), "NT$300");
        assert_eq!(nt_dollars(dec!(45678.9)), "NT$45,679");
    }
}
