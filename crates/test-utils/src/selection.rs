//! NumPy-style selection over an in-memory dataset.
//!
//! Mirrors what the real service does with `ixstr` and `subixstr`: a bare
//! integer pins an axis (dropping it from the view), `start:stop` keeps it,
//! and unlisted trailing axes are kept whole.

use hdf_common::{parse_axis, slice, IndexSlice};
use serde_json::Value;

/// Selection on one dataset axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Index(u64),
    Range { start: u64, stop: u64 },
}

impl Axis {
    pub fn len(&self) -> u64 {
        match self {
            Axis::Index(_) => 1,
            Axis::Range { start, stop } => stop.saturating_sub(*start),
        }
    }

    pub fn label(&self) -> Option<IndexSlice> {
        match self {
            Axis::Index(_) => None,
            Axis::Range { start, stop } => Some(slice(*start as i64, *stop as i64)),
        }
    }
}

/// Apply an index expression to `shape`.
pub fn select(shape: &[u64], ixstr: &str) -> Result<Vec<Axis>, String> {
    let full = |extent: u64| Axis::Range { start: 0, stop: extent };

    if ixstr.trim().is_empty() {
        return Ok(shape.iter().map(|extent| full(*extent)).collect());
    }

    let tokens: Vec<&str> = ixstr.split(',').map(str::trim).collect();
    if tokens.len() > shape.len() {
        return Err(format!(
            "too many indices for array: {} given for {} dimensions",
            tokens.len(),
            shape.len()
        ));
    }

    let mut axes = Vec::with_capacity(shape.len());
    for (token, extent) in tokens.iter().zip(shape) {
        if token.contains(':') {
            let bound = parse_axis(token)
                .ok_or_else(|| format!("invalid slice: {}", token))?
                .bind(*extent);
            let start = bound.start.max(0) as u64;
            let stop = bound.stop.unwrap_or(*extent as i64).max(0) as u64;
            axes.push(Axis::Range {
                start,
                stop: stop.max(start),
            });
        } else {
            let index: i64 = token
                .parse()
                .map_err(|_| format!("invalid index: {}", token))?;
            let resolved = if index < 0 { index + *extent as i64 } else { index };
            if resolved < 0 || resolved as u64 >= *extent {
                return Err(format!(
                    "index {} is out of bounds for axis with size {}",
                    index, extent
                ));
            }
            axes.push(Axis::Index(resolved as u64));
        }
    }
    axes.extend(shape[tokens.len()..].iter().map(|extent| full(*extent)));

    Ok(axes)
}

/// Narrow a selection by a second expression over its visible axes.
pub fn narrow(view: &[Axis], subixstr: &str) -> Result<Vec<Axis>, String> {
    let visible: Vec<u64> = view
        .iter()
        .filter(|axis| matches!(axis, Axis::Range { .. }))
        .map(Axis::len)
        .collect();
    let mut sub = select(&visible, subixstr)?.into_iter();

    Ok(view
        .iter()
        .map(|axis| match axis {
            Axis::Index(_) => *axis,
            Axis::Range { start, .. } => match sub.next() {
                Some(Axis::Index(i)) => Axis::Index(start + i),
                Some(Axis::Range { start: s, stop: e }) => Axis::Range {
                    start: start + s,
                    stop: start + e,
                },
                None => *axis,
            },
        })
        .collect())
}

/// Extents of the visible axes.
pub fn visible_shape(axes: &[Axis]) -> Vec<u64> {
    axes.iter()
        .filter(|axis| matches!(axis, Axis::Range { .. }))
        .map(Axis::len)
        .collect()
}

/// Build nested arrays of values for a selection.
pub fn materialize(axes: &[Axis], values: &dyn Fn(&[u64]) -> Value) -> Value {
    fn build(axes: &[Axis], index: &mut Vec<u64>, values: &dyn Fn(&[u64]) -> Value) -> Value {
        match axes.split_first() {
            None => values(index),
            Some((Axis::Index(i), rest)) => {
                index.push(*i);
                let value = build(rest, index, values);
                index.pop();
                value
            }
            Some((Axis::Range { start, stop }, rest)) => Value::Array(
                (*start..*stop)
                    .map(|i| {
                        index.push(i);
                        let value = build(rest, index, values);
                        index.pop();
                        value
                    })
                    .collect(),
            ),
        }
    }

    build(axes, &mut Vec::with_capacity(axes.len()), values)
}
