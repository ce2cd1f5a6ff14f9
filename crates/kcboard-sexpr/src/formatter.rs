//! Text-formatting helpers shared by the parser's `Display` impl and by
//! document encoders built on top of this crate.

use crate::{Sexpr, SexprKind};

/// Canonical float rendering: fixed six decimal places, then trailing zeros
/// stripped, then a bare trailing decimal point stripped.
///
/// `0.15` renders as `0.15`, `2.0` as `2`, `16.6666666666` as `16.666667`.
pub fn format_float(value: f64) -> String {
    trim_float(format!("{value:.6}"))
}

fn trim_float(mut s: String) -> String {
    if !s.contains('.') {
        return s;
    }

    while let Some(stripped) = s.strip_suffix('0') {
        s = stripped.to_string();
    }
    if let Some(stripped) = s.strip_suffix('.') {
        s = stripped.to_string();
    }

    if s.is_empty() { "0".to_string() } else { s }
}

/// Whether a string value must be emitted quoted.
///
/// Empty strings and strings containing whitespace, quotes, parentheses, or
/// backslashes cannot survive as bare atoms.
pub fn needs_quoting(value: &str) -> bool {
    value.is_empty()
        || value
            .chars()
            .any(|ch| ch.is_whitespace() || matches!(ch, '"' | '(' | ')' | '\\'))
}

/// Quote a string value, escaping special characters.
pub fn quote_string(value: &str) -> String {
    let escaped = escape_string(value);
    let mut quoted = String::with_capacity(escaped.len() + 2);
    quoted.push('"');
    quoted.push_str(&escaped);
    quoted.push('"');
    quoted
}

pub fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            _ => result.push(ch),
        }
    }
    result
}

/// Serialize a tree on a single line, space-separated.
///
/// Numeric atoms replay their source lexeme when one was captured, so a
/// parse-then-print of an untouched node is lossless.
pub fn write_compact(sexpr: &Sexpr, out: &mut String) {
    match &sexpr.kind {
        SexprKind::Symbol(s) => out.push_str(s),
        SexprKind::String(s) => out.push_str(&quote_string(s)),
        SexprKind::Int(n) => {
            if let Some(raw) = sexpr.raw_atom.as_deref() {
                out.push_str(raw);
            } else {
                out.push_str(&n.to_string());
            }
        }
        SexprKind::F64(f) => {
            if let Some(raw) = sexpr.raw_atom.as_deref() {
                out.push_str(raw);
            } else {
                out.push_str(&format_float(*f));
            }
        }
        SexprKind::List(items) => {
            out.push('(');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(' ');
                }
                write_compact(item, out);
            }
            out.push(')');
        }
    }
}
