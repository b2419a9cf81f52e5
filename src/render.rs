//! Text forms of result values.
//!
//! Console rows use a tuple rendering (`(1, 'a', None)`), CSV cells use the
//! plain string form of each value and NDJSON rows map column names to JSON
//! values.

use std::fmt::Write as _;

use serde_json::{Map, Number, Value as Json};
use unicode_general_category::{get_general_category, GeneralCategory};

use crate::sqlite::Value;

/// Render a row as a tuple: `(1,)`, `(1, 'a', None)`, `()`.
pub fn tuple(values: &[Value]) -> String {
    let mut out = String::from("(");
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&literal(value));
    }
    if values.len() == 1 {
        out.push(',');
    }
    out.push(')');
    out
}

/// The literal form of a value as it appears inside a tuple.
pub fn literal(value: &Value) -> String {
    match value {
        Value::Text(text) => quote_text(text),
        other => plain(other),
    }
}

/// The plain string form of a value: text is unquoted, NULL is `None`.
pub fn plain(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => float(*f),
        Value::Text(text) => text.clone(),
        Value::Blob(bytes) => quote_bytes(bytes),
    }
}

/// A CSV cell: the plain form with every newline written as `\n`.
pub fn csv_cell(value: &Value) -> String {
    plain(value).replace('\n', "\\n")
}

/// One NDJSON object, keys in column order.
///
/// A repeated column name keeps its first position and takes the last value.
pub fn json_row(columns: &[String], values: &[Value]) -> Map<String, Json> {
    let mut row = Map::with_capacity(columns.len());
    for (column, value) in columns.iter().zip(values) {
        row.insert(column.clone(), json_value(value));
    }
    row
}

pub fn json_value(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Integer(i) => Json::from(*i),
        // Non-finite reals have no JSON form.
        Value::Real(f) => Number::from_f64(*f).map_or(Json::Null, Json::Number),
        Value::Text(text) => Json::String(text.clone()),
        Value::Blob(bytes) => Json::String(hex::encode(bytes)),
    }
}

/// Shortest round-trip float text: `1.0`, `0.25`, `1e+16`, `1.5e-05`.
pub fn float(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    // `{:?}` already switches to exponent form outside [1e-4, 1e16).
    let debug = format!("{f:?}");
    let Some((mantissa, exponent)) = debug.split_once('e') else {
        return debug;
    };
    let exponent: i32 = exponent.parse().unwrap_or_default();
    let sign = if exponent < 0 { '-' } else { '+' };
    let mantissa = mantissa.strip_suffix(".0").unwrap_or(mantissa);
    format!("{mantissa}e{sign}{:02}", exponent.abs())
}

fn quote_text(text: &str) -> String {
    let quote = pick_quote(text.contains('\''), text.contains('"'));
    let mut out = String::with_capacity(text.len() + 2);
    out.push(quote);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if is_printable(c) => out.push(c),
            c => {
                let code = u32::from(c);
                let _ = match code {
                    0..=0xff => write!(out, "\\x{code:02x}"),
                    0x100..=0xffff => write!(out, "\\u{code:04x}"),
                    _ => write!(out, "\\U{code:08x}"),
                };
            }
        }
    }
    out.push(quote);
    out
}

fn quote_bytes(bytes: &[u8]) -> String {
    let quote = pick_quote(bytes.contains(&b'\''), bytes.contains(&b'"'));
    let mut out = String::with_capacity(bytes.len() + 3);
    out.push('b');
    out.push(quote);
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            b if char::from(b) == quote => {
                out.push('\\');
                out.push(quote);
            }
            0x20..=0x7e => out.push(char::from(b)),
            b => {
                let _ = write!(out, "\\x{b:02x}");
            }
        }
    }
    out.push(quote);
    out
}

/// Single quotes, unless the content has a single quote and no double quote.
fn pick_quote(has_single: bool, has_double: bool) -> char {
    if has_single && !has_double {
        '"'
    } else {
        '\''
    }
}

/// Everything outside the Other and Separator categories, plus the ASCII space.
fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    !matches!(
        get_general_category(c),
        GeneralCategory::Control
            | GeneralCategory::Format
            | GeneralCategory::Surrogate
            | GeneralCategory::PrivateUse
            | GeneralCategory::Unassigned
            | GeneralCategory::SpaceSeparator
            | GeneralCategory::LineSeparator
            | GeneralCategory::ParagraphSeparator
    )
}
