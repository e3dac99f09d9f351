//! Standard datasets and a sample file layout for tests.

use std::collections::BTreeMap;

use serde_json::json;

use crate::generators::{complex_positional, constant, positional};
use crate::mock::{MockDataset, MockHdfService};

/// In-file uris of the sample layout built by [`sample_service`].
pub mod uris {
    pub const ROOT: &str = "/";
    pub const NESTED: &str = "/nested";
    pub const SCALAR: &str = "/scalar";
    pub const LINE: &str = "/line";
    pub const GRID: &str = "/grid";
    pub const CUBE: &str = "/nested/cube";
    pub const COMPLEX: &str = "/complex";
    pub const EMPTY: &str = "/empty";
}

/// File path used by tests; the mock ignores it.
pub const SAMPLE_FPATH: &str = "sample.h5";

/// A scalar holding 42.5.
pub fn scalar_dataset() -> MockDataset {
    MockDataset::new("scalar", "<f8", vec![], constant(json!(42.5)))
}

/// 500 positional values.
pub fn line_dataset() -> MockDataset {
    MockDataset::new("line", "<i8", vec![500], positional)
}

/// A 250x120 grid where `[row, col]` holds `row * 1000 + col`.
pub fn grid_dataset() -> MockDataset {
    MockDataset::new("grid", "<i8", vec![250, 120], positional)
}

/// A 3x40x50 cube of positional values.
pub fn cube_dataset() -> MockDataset {
    MockDataset::new("cube", "<i8", vec![3, 40, 50], positional)
}

/// A 2x2 complex dataset where `[row, col]` holds `v - vi` with
/// `v = row * 1000 + col`.
pub fn complex_dataset() -> MockDataset {
    MockDataset::new("complex", "<c16", vec![2, 2], complex_positional)
}

/// A dataset with a zero-length axis.
pub fn empty_dataset() -> MockDataset {
    MockDataset::new("empty", "<f4", vec![0, 5], constant(json!(0)))
}

/// A mock service with every standard dataset under [`uris`].
pub fn sample_service() -> MockHdfService {
    let mut grid_attrs = BTreeMap::new();
    grid_attrs.insert("units".to_string(), json!("K"));
    grid_attrs.insert("scale".to_string(), json!(0.5));

    MockHdfService::new()
        .with_group(
            uris::ROOT,
            &[
                uris::NESTED,
                uris::SCALAR,
                uris::LINE,
                uris::GRID,
                uris::COMPLEX,
                uris::EMPTY,
            ],
        )
        .with_group(uris::NESTED, &[uris::CUBE])
        .with_dataset(uris::SCALAR, scalar_dataset())
        .with_dataset(uris::LINE, line_dataset())
        .with_dataset(uris::GRID, grid_dataset())
        .with_dataset(uris::CUBE, cube_dataset())
        .with_dataset(uris::COMPLEX, complex_dataset())
        .with_dataset(uris::EMPTY, empty_dataset())
        .with_attrs(uris::GRID, grid_attrs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdf_client::HdfService;
    use hdf_common::EntityKind;

    #[tokio::test]
    async fn test_sample_layout() {
        let service = sample_service();

        let root = service.get_contents(SAMPLE_FPATH, uris::ROOT).await.unwrap();
        assert_eq!(root.len(), 6);
        assert_eq!(root[0].kind, EntityKind::Group);
        assert_eq!(root[0].name, "nested");

        let cube = service.get_contents(SAMPLE_FPATH, uris::CUBE).await.unwrap();
        assert_eq!(cube[0].content.as_ref().map(|m| m.ndim), Some(3));

        let keys = vec!["units".to_string()];
        let attrs = service
            .get_attrs(SAMPLE_FPATH, uris::GRID, Some(&keys))
            .await
            .unwrap();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs["units"], "K");
    }

    #[test]
    fn test_empty_dataset_has_no_cells() {
        let meta = empty_dataset().meta(None).unwrap();
        assert_eq!(meta.size, 0);
        assert_eq!(meta.shape, vec![0, 5]);
    }
}
