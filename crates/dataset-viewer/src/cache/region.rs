//! Grid rectangle covered by a block.

use hdf_common::{slice, IndexSlice};

use super::BlockKey;
use crate::shape::DisplayShape;

/// Row and column ranges of one block, clamped to the grid extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRegion {
    pub rows: IndexSlice,
    pub cols: IndexSlice,
}

impl BlockRegion {
    pub fn for_block(key: BlockKey, block_size: u64, display: &DisplayShape) -> Self {
        let (row_block, col_block) = key;
        let row_start = row_block * block_size;
        let col_start = col_block * block_size;

        Self {
            rows: slice(
                row_start as i64,
                (row_start + block_size).min(display.n_rows) as i64,
            ),
            cols: slice(
                col_start as i64,
                (col_start + block_size).min(display.n_cols) as i64,
            ),
        }
    }

    pub fn row_span(&self) -> u64 {
        self.rows.len()
    }

    pub fn col_span(&self) -> u64 {
        self.cols.len()
    }

    /// Sub-index string for a `data` request, restricted to the axes that
    /// vary: `"r0:r1, c0:c1"` for a 2-D view, `"c0:c1"` for a 1-D view and
    /// `""` for a scalar.
    pub fn sub_index(&self, has_sub_axis: [bool; 2]) -> String {
        let axes: Vec<String> = [self.rows, self.cols]
            .iter()
            .zip(has_sub_axis)
            .filter(|(_, varies)| *varies)
            .map(|(axis, _)| axis.to_string())
            .collect();
        axes.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display(n_rows: u64, n_cols: u64, has_sub_axis: [bool; 2]) -> DisplayShape {
        DisplayShape {
            n_rows,
            n_cols,
            has_sub_axis,
            ..DisplayShape::empty()
        }
    }

    #[test]
    fn test_region_is_clamped() {
        let region = BlockRegion::for_block((2, 1), 100, &display(250, 120, [true, true]));
        assert_eq!(region.rows, slice(200, 250));
        assert_eq!(region.cols, slice(100, 120));
        assert_eq!((region.row_span(), region.col_span()), (50, 20));
    }

    #[test]
    fn test_sub_index_strings() {
        let grid = display(250, 120, [true, true]);
        let region = BlockRegion::for_block((0, 1), 100, &grid);
        assert_eq!(region.sub_index(grid.has_sub_axis), "0:100, 100:120");

        let row = display(1, 500, [false, true]);
        let region = BlockRegion::for_block((0, 1), 100, &row);
        assert_eq!(region.sub_index(row.has_sub_axis), "100:200");

        let scalar = display(1, 1, [false, false]);
        let region = BlockRegion::for_block((0, 0), 100, &scalar);
        assert_eq!(region.sub_index(scalar.has_sub_axis), "");
    }
}
