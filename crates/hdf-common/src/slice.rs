//! NumPy-style index slices.
//!
//! An [`IndexSlice`] is the normalized `{start, stop, step}` form of one axis
//! of an index expression such as `"0, 10:20, :"`. The server reports the
//! label slices of each visible axis in this form, and the viewer builds its
//! sub-index strings from it.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// One axis of a NumPy-style index expression.
///
/// `stop == None` means "to the extent of the axis", which is only known
/// once the slice is bound to a concrete length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexSlice {
    #[serde(default, deserialize_with = "null_as_zero")]
    pub start: i64,
    #[serde(default)]
    pub stop: Option<i64>,
    #[serde(default = "default_step", deserialize_with = "null_as_one")]
    pub step: i64,
}

fn default_step() -> i64 {
    1
}

fn null_as_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or(0))
}

fn null_as_one<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(Option::<i64>::deserialize(deserializer)?
        .filter(|step| *step != 0)
        .unwrap_or(1))
}

/// Shorthand for `IndexSlice::new(start, Some(stop), None)`.
pub fn slice(start: i64, stop: i64) -> IndexSlice {
    IndexSlice::new(start, Some(stop), None)
}

impl IndexSlice {
    /// Create a slice. A missing or zero step becomes 1.
    pub fn new(start: i64, stop: Option<i64>, step: Option<i64>) -> Self {
        Self {
            start,
            stop,
            step: step.filter(|s| *s != 0).unwrap_or(1),
        }
    }

    /// The whole axis, extent unknown until bound.
    pub fn all() -> Self {
        Self::new(0, None, None)
    }

    /// An explicitly empty axis.
    pub fn none() -> Self {
        Self::new(0, Some(0), None)
    }

    /// Resolve an open stop against an axis extent and clamp to it.
    pub fn bind(&self, extent: u64) -> Self {
        let extent = extent as i64;
        let stop = self.stop.map_or(extent, |stop| stop.min(extent));
        Self {
            start: self.start.min(extent),
            stop: Some(stop),
            step: self.step,
        }
    }

    /// Number of indices selected. An open stop counts as empty unless the
    /// slice is bound first.
    pub fn len(&self) -> u64 {
        let stop = self.stop.unwrap_or(self.start);
        let span = if self.step > 0 {
            stop - self.start
        } else {
            self.start - stop
        };
        if span <= 0 {
            return 0;
        }
        let step = self.step.abs();
        ((span + step - 1) / step) as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The label of the `index`-th selected element: `start + index * step`.
    pub fn label(&self, index: u64) -> i64 {
        self.start + index as i64 * self.step
    }
}

impl Default for IndexSlice {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Display for IndexSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stop {
            Some(stop) => write!(f, "{}:{}", self.start, stop)?,
            None => write!(f, "{}:", self.start)?,
        }
        if self.step != 1 {
            write!(f, ":{}", self.step)?;
        }
        Ok(())
    }
}

/// Parse one axis of an index expression.
///
/// A bare integer selects a single index. `start:stop` and
/// `start:stop:stride` select a contiguous range; the stride token is
/// accepted but ignored since the viewer only fetches contiguous blocks.
/// An empty start means 0 and an empty stop means "to extent".
pub fn parse_axis(text: &str) -> Option<IndexSlice> {
    let tokens: Vec<&str> = text.split(':').map(str::trim).collect();

    match tokens.len() {
        1 => {
            let index: i64 = tokens[0].parse().ok()?;
            let stop = index.checked_add(1)?;
            Some(slice(index, stop))
        }
        2 | 3 => {
            let start = if tokens[0].is_empty() {
                0
            } else {
                tokens[0].parse().ok()?
            };
            let stop = if tokens[1].is_empty() {
                None
            } else {
                Some(tokens[1].parse().ok()?)
            };
            Some(IndexSlice::new(start, stop, None))
        }
        _ => None,
    }
}

/// Parse a two-axis index expression such as `"10:20, 0:5"`.
///
/// An empty expression selects both axes whole. Anything that does not
/// produce exactly two valid axes is logged and collapses to a pair of empty
/// slices, so a bad expression shows an empty grid instead of failing.
pub fn parse_slices(text: &str) -> [IndexSlice; 2] {
    if text.trim().is_empty() {
        return [IndexSlice::all(), IndexSlice::all()];
    }

    let axes: Option<Vec<IndexSlice>> = text.split(',').map(parse_axis).collect();

    match axes.as_deref() {
        Some([row, col]) => [*row, *col],
        _ => {
            warn!(slices = %text, "Error parsing slices: invalid slices string input");
            [IndexSlice::none(), IndexSlice::none()]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_constructors() {
        assert_eq!(slice(2, 5), IndexSlice { start: 2, stop: Some(5), step: 1 });
        assert_eq!(IndexSlice::all().stop, None);
        assert!(IndexSlice::none().is_empty());
        assert_eq!(IndexSlice::new(0, Some(4), Some(0)).step, 1);
    }

    #[test]
    fn test_len_and_bind() {
        assert_eq!(slice(0, 10).len(), 10);
        assert_eq!(IndexSlice::new(0, Some(10), Some(3)).len(), 4);
        assert_eq!(slice(5, 2).len(), 0);
        assert_eq!(IndexSlice::all().len(), 0);
        assert_eq!(IndexSlice::all().bind(12).len(), 12);
        assert_eq!(slice(3, 100).bind(10), slice(3, 10));
    }

    #[test]
    fn test_label() {
        let labels = IndexSlice::new(10, Some(20), Some(2));
        assert_eq!(labels.label(0), 10);
        assert_eq!(labels.label(3), 16);
    }

    #[test]
    fn test_display() {
        assert_eq!(slice(100, 200).to_string(), "100:200");
        assert_eq!(IndexSlice::all().to_string(), "0:");
        assert_eq!(IndexSlice::new(1, Some(9), Some(2)).to_string(), "1:9:2");
    }

    #[test]
    fn test_parse_two_ranges() {
        assert_eq!(parse_slices("1:3, 4:9"), [slice(1, 3), slice(4, 9)]);
        assert_eq!(parse_slices(" 1 : 3 ,4:9 "), [slice(1, 3), slice(4, 9)]);
    }

    #[test]
    fn test_parse_ignores_stride() {
        assert_eq!(parse_slices("0:10:2, 5:6:3"), [slice(0, 10), slice(5, 6)]);
    }

    #[test]
    fn test_parse_single_index() {
        assert_eq!(parse_slices("4, 2:3"), [slice(4, 5), slice(2, 3)]);
        assert_eq!(parse_slices("0, 0"), [slice(0, 1), slice(0, 1)]);
    }

    #[test]
    fn test_parse_open_bounds() {
        assert_eq!(
            parse_slices(":, 3:"),
            [IndexSlice::all(), IndexSlice::new(3, None, None)]
        );
    }

    #[test]
    fn test_parse_empty_selects_all() {
        assert_eq!(parse_slices(""), [IndexSlice::all(), IndexSlice::all()]);
    }

    #[test]
    fn test_parse_invalid_collapses_to_none() {
        let none = [IndexSlice::none(), IndexSlice::none()];
        assert_eq!(parse_slices("1:2"), none);
        assert_eq!(parse_slices("1:2, 3:4, 5:6"), none);
        assert_eq!(parse_slices("a:2, 3:4"), none);
        assert_eq!(parse_slices("1:2, x"), none);
        assert_eq!(parse_slices("1:2:3:4, 0:1"), none);
    }

    #[test]
    fn test_deserialize_nullable_fields() {
        let parsed: IndexSlice =
            serde_json::from_str(r#"{"start": null, "stop": 8, "step": null}"#).unwrap();
        assert_eq!(parsed, slice(0, 8));

        let parsed: IndexSlice = serde_json::from_str(r#"{"start": 2, "stop": null}"#).unwrap();
        assert_eq!(parsed, IndexSlice::new(2, None, None));
    }
}
