use std::fmt::Write as _;

use rusqlite::types::ValueRef;

use crate::core::types::ColumnType;

/// Render a raw cell for display. SQL NULL stays `None`.
pub fn format_cell(kind: ColumnType, value: ValueRef<'_>) -> Option<String> {
    let out = match (kind, value) {
        (_, ValueRef::Null) => return None,
        (ColumnType::Integer, ValueRef::Integer(i)) => group_integer(i),
        (ColumnType::Integer, ValueRef::Real(f)) if is_integral(f) => group_integer(f as i64),
        (ColumnType::Real, ValueRef::Real(f)) => group_real(f),
        (ColumnType::Real, ValueRef::Integer(i)) => group_real(i as f64),
        (_, v) => natural(v),
    };
    Some(out)
}

/// The value's own string form, without any grouping.
pub fn natural(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => {
            let mut s = String::with_capacity(b.len() * 2 + 3);
            s.push_str("X'");
            for byte in b {
                let _ = write!(s, "{byte:02X}");
            }
            s.push('\'');
            s
        }
    }
}

fn is_integral(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64
}

/// `1234567` -> `1,234,567`
pub fn group_integer(i: i64) -> String {
    let digits = i.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if i < 0 {
        out.push('-');
    }
    push_grouped(&mut out, &digits);
    out
}

/// `1234.5` -> `1,234.50`
pub fn group_real(f: f64) -> String {
    if !f.is_finite() {
        return f.to_string();
    }
    let fixed = format!("{:.2}", f.abs());
    let (whole, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut out = String::with_capacity(fixed.len() + whole.len() / 3 + 1);
    // -0.001 rounds to 0.00 and must not keep its sign.
    if f.is_sign_negative() && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        out.push('-');
    }
    push_grouped(&mut out, whole);
    out.push('.');
    out.push_str(frac);
    out
}

fn push_grouped(out: &mut String, digits: &str) {
    let lead = digits.len() % 3;
    for (i, ch) in digits.chars().enumerate() {
        if i != 0 && (i + 3 - lead) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
}
