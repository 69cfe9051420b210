use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse a result value cell into a decimal.
///
/// Handles formats like:
/// - "12.8" -> 12.8
/// - "12.8 g/dL" or "12.8g/dL" -> 12.8 (trailing units text dropped)
/// - "1,234.5" -> 1234.5 (thousands separators)
/// - "12,8" -> 12.8 (lone decimal comma)
/// - "-0.5" -> -0.5
/// - "1.2e2" -> 120, "5E-3 mmol/L" -> 0.005 (scientific notation)
///
/// Returns None when no number leads the cell ("N/A", "<5", "", "pos") or
/// the number is outside the `Decimal` range.
pub fn parse_value(s: &str) -> Option<Decimal> {
    let s = s.trim();
    let (token, rest) = split_numeric_prefix(s)?;
    let (exponent, rest) = split_exponent(rest);

    // A digit glued to the rest means the prefix was cut mid-number.
    if rest.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }

    let mantissa = normalize_separators(token)?;
    match exponent {
        Some(exp) => Decimal::from_scientific(&format!("{mantissa}e{exp}")).ok(),
        None => Decimal::from_str(&mantissa).ok(),
    }
}

/// Parse an age cell into whole years.
///
/// Trailing text is allowed ("45 y"); negative or fractional ages are
/// treated as absent.
pub fn parse_age(s: &str) -> Option<u32> {
    let value = parse_value(s)?;
    if value.is_sign_negative() || !value.fract().is_zero() {
        return None;
    }
    value.to_u32()
}

/// Split off the leading run of sign, digit and separator characters.
fn split_numeric_prefix(s: &str) -> Option<(&str, &str)> {
    let mut end = 0;
    for (i, c) in s.char_indices() {
        let allowed = c.is_ascii_digit()
            || c == '.'
            || c == ','
            || ((c == '-' || c == '+') && i == 0);
        if !allowed {
            break;
        }
        end = i + c.len_utf8();
    }

    let token = s[..end].trim_end_matches([',', '.']);
    if !token.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((token, &s[token.len()..]))
}

/// Split a leading `e`/`E` exponent ("e2", "E-3") off the text after the
/// mantissa. A bare `e` not followed by digits is left as units text.
fn split_exponent(rest: &str) -> (Option<i32>, &str) {
    let Some(after) = rest.strip_prefix(['e', 'E']) else {
        return (None, rest);
    };
    let sign_len = usize::from(after.starts_with(['+', '-']));
    let digits = after[sign_len..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .count();
    if digits == 0 {
        return (None, rest);
    }

    let end = 1 + sign_len + digits;
    match rest[1..end].parse::<i32>() {
        Ok(exp) => (Some(exp), &rest[end..]),
        // Absurd exponent; leave a digit in front so the caller rejects it.
        Err(_) => (None, &rest[1 + sign_len..]),
    }
}

/// Resolve commas into either thousands separators or a decimal comma.
fn normalize_separators(token: &str) -> Option<String> {
    let commas = token.matches(',').count();
    if commas == 0 {
        return Some(token.to_string());
    }

    let has_dot = token.contains('.');
    let groups: Vec<&str> = token.split(',').collect();
    let thousands = groups[1..].iter().enumerate().all(|(i, g)| {
        let digits = if i == groups.len() - 2 {
            g.split('.').next().unwrap_or("")
        } else {
            g
        };
        digits.len() == 3 && digits.chars().all(|c| c.is_ascii_digit())
    });

    if thousands {
        Some(token.replace(',', ""))
    } else if commas == 1 && !has_dot {
        Some(token.replace(',', "."))
    } else {
        None
    }
}
