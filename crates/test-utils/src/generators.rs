//! Value generators for synthetic datasets.
//!
//! Every generator maps a full dataset index to a cell value, so tests can
//! compute the expected value of any cell without storing the data.

use serde_json::{json, Value};

/// Encodes the index positionally in base 1000.
///
/// For a 2-D dataset the value at `[row, col]` is `row * 1000 + col`; for
/// 3-D it is `i * 1_000_000 + j * 1000 + k`. A scalar is 0.
///
/// ```
/// use test_utils::positional_value;
///
/// assert_eq!(positional_value(&[12, 150]), 12150);
/// assert_eq!(positional_value(&[2, 0, 7]), 2_000_007);
/// ```
pub fn positional_value(index: &[u64]) -> u64 {
    index.iter().fold(0, |acc, i| acc * 1000 + i)
}

/// [`positional_value`] as a JSON number.
pub fn positional(index: &[u64]) -> Value {
    json!(positional_value(index))
}

/// A complex `[re, im]` pair with `re = v` and `im = -v`, where `v` is the
/// positional value.
pub fn complex_positional(index: &[u64]) -> Value {
    let v = positional_value(index) as i64;
    json!([v, -v])
}

/// A generator returning the same value everywhere.
pub fn constant(value: Value) -> impl Fn(&[u64]) -> Value + Send + Sync + 'static {
    move |_| value.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional() {
        assert_eq!(positional(&[]), json!(0));
        assert_eq!(positional(&[150]), json!(150));
        assert_eq!(positional(&[1, 2]), json!(1002));
    }

    #[test]
    fn test_complex_positional() {
        assert_eq!(complex_positional(&[0, 3]), json!([3, -3]));
        assert_eq!(complex_positional(&[0, 0]), json!([0, 0]));
    }

    #[test]
    fn test_constant() {
        let gen = constant(json!("x"));
        assert_eq!(gen(&[1, 2, 3]), json!("x"));
    }
}
