//! Projection of a dataset view onto a 2D grid.

use hdf_common::{slice, DatasetMeta, IndexSlice};
use serde::{Deserialize, Serialize};

/// The 2D projection of a dataset view: grid extent, header visibility and
/// the label slice of each displayed axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayShape {
    pub n_rows: u64,
    pub n_cols: u64,
    pub n_row_headers: u64,
    pub n_col_headers: u64,
    pub row_label: IndexSlice,
    pub col_label: IndexSlice,
    /// Whether rows and columns each map to a varying dataset axis. Only
    /// varying axes appear in the sub-index string of a block request.
    pub has_sub_axis: [bool; 2],
}

impl DisplayShape {
    /// A grid with nothing to show.
    pub fn empty() -> Self {
        Self {
            n_rows: 0,
            n_cols: 0,
            n_row_headers: 0,
            n_col_headers: 0,
            row_label: IndexSlice::none(),
            col_label: IndexSlice::none(),
            has_sub_axis: [false, false],
        }
    }

    pub fn contains(&self, row: u64, col: u64) -> bool {
        row < self.n_rows && col < self.n_cols
    }
}

impl Default for DisplayShape {
    fn default() -> Self {
        Self::empty()
    }
}

/// Derive the displayed grid of a dataset view of rank 0, 1 or 2.
///
/// - empty (`size == 0`): 0x0
/// - scalar: a single cell, no headers
/// - 1-D: one row of `size` columns, with a row header
/// - 2-D: `shape[0] x shape[1]` with both headers
///
/// Higher ranks are treated like 2-D using the first two axes; callers
/// reject them before getting here.
pub fn derive_display_shape(meta: &DatasetMeta) -> DisplayShape {
    if meta.size == 0 {
        return DisplayShape::empty();
    }

    match meta.shape.len() {
        0 => DisplayShape {
            n_rows: 1,
            n_cols: 1,
            n_row_headers: 0,
            n_col_headers: 0,
            row_label: slice(0, 1),
            col_label: slice(0, 1),
            has_sub_axis: [false, false],
        },
        1 => DisplayShape {
            n_rows: 1,
            n_cols: meta.size,
            n_row_headers: 1,
            n_col_headers: 0,
            row_label: slice(0, 1),
            col_label: meta.label(0),
            has_sub_axis: [false, true],
        },
        _ => DisplayShape {
            n_rows: meta.shape[0],
            n_cols: meta.shape[1],
            n_row_headers: 1,
            n_col_headers: 1,
            row_label: meta.label(0),
            col_label: meta.label(1),
            has_sub_axis: [true, true],
        },
    }
}
