//! Display conversion for complex-valued datasets.
//!
//! The service encodes a complex number as a `[re, im]` pair, so a complex
//! block arrives with one more nesting level than its real counterpart.

use serde_json::{Number, Value};

/// Format a complex number as `<re>+<im>i` or `<re>-<im>i`.
pub fn format_complex(re: &Number, im: &Number) -> String {
    let im_text = format_number(im);
    let sign = if im_text.starts_with('-') { "" } else { "+" };
    format!("{}{}{}i", format_number(re), sign, im_text)
}

/// Replace every `[re, im]` pair in `value` by its display string.
///
/// Works on a single pair, a row of pairs or a block of rows. Values that
/// are not pairs are returned unchanged.
pub fn convert_values_to_string(value: &Value) -> Value {
    match value {
        Value::Array(items) => match items.as_slice() {
            [Value::Number(re), Value::Number(im)] => Value::String(format_complex(re, im)),
            _ => Value::Array(items.iter().map(convert_values_to_string).collect()),
        },
        other => other.clone(),
    }
}

/// Integral floats print without a fractional part.
fn format_number(n: &Number) -> String {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
                return format!("{}", f as i64);
            }
            return format!("{}", f);
        }
    }
    n.to_string()
}
