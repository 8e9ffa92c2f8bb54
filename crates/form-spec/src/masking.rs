//! Input formatting applied to raw keystrokes before they reach the store.

use crate::spec::field::{FieldDescriptor, FieldType};

const MAX_INTERNATIONAL_DIGITS: usize = 12;
const MAX_LOCAL_DIGITS: usize = 10;
const NIN_LENGTH: usize = 13;

/// Applies the masking rule declared for `field` to `raw`.
pub fn apply_input_mask(field: &FieldDescriptor, raw: &str) -> String {
    match (field.name.as_str(), field.kind) {
        ("mobile", _) => mask_mobile(raw),
        ("nin", _) => mask_nin(raw),
        (_, FieldType::Tel) => mask_tel(raw),
        (_, FieldType::Number) => format_number(raw),
        _ => raw.to_string(),
    }
}

/// Keeps a leading `+` and digits, capped at 12 digits for `+256…` and
/// 10 digits for local `0…` numbers.
pub fn mask_mobile(raw: &str) -> String {
    let international = raw.trim_start().starts_with('+');
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let limit = if !international && digits.starts_with('0') {
        MAX_LOCAL_DIGITS
    } else {
        MAX_INTERNATIONAL_DIGITS
    };
    let digits: String = digits.chars().take(limit).collect();
    if international {
        format!("+{}", digits)
    } else {
        digits
    }
}

/// Keeps a leading `+`, digits, spaces, and dashes.
pub fn mask_tel(raw: &str) -> String {
    let trimmed = raw.trim_start();
    let mut out = String::with_capacity(trimmed.len());
    for (idx, c) in trimmed.chars().enumerate() {
        if c.is_ascii_digit() || c == ' ' || c == '-' || (c == '+' && idx == 0) {
            out.push(c);
        }
    }
    out
}

pub fn mask_nin(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .take(NIN_LENGTH)
        .collect()
}

/// Normalizes a typed number and regroups its integer part with commas:
/// `"1234567.5"` becomes `"1,234,567.5"`.
pub fn format_number(raw: &str) -> String {
    let mut negative = false;
    let mut seen_dot = false;
    let mut int_part = String::new();
    let mut frac_part = String::new();

    for c in raw.chars() {
        match c {
            '-' if !negative && !seen_dot && int_part.is_empty() => negative = true,
            '.' if !seen_dot => seen_dot = true,
            d if d.is_ascii_digit() => {
                if seen_dot {
                    frac_part.push(d);
                } else {
                    int_part.push(d);
                }
            }
            _ => {}
        }
    }

    let trimmed = int_part.trim_start_matches('0');
    let int_part = if trimmed.is_empty() && (!int_part.is_empty() || seen_dot) {
        "0"
    } else {
        trimmed
    };

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if seen_dot {
        out.push('.');
        out.push_str(&frac_part);
    }
    out
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, c) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}
