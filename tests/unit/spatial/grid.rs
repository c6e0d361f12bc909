//! Tests for target grid partitioning and cell addressing

#[cfg(test)]
mod tests {
    use anncollage::spatial::grid::{GridCell, TargetGrid};
    use image::RgbImage;

    // Tests grid dimensions and whole-cell extent drop partial cells
    // Verified by including partial cells in the extent
    #[test]
    fn test_partition_dimensions() {
        let image = RgbImage::new(25, 17);

        let Ok(grid) = TargetGrid::partition(&image, 10, 5) else {
            unreachable!("25x17 image holds 10x5 cells");
        };

        assert_eq!(grid.columns(), 2);
        assert_eq!(grid.rows(), 3);
        assert_eq!(grid.cell_size(), (10, 5));
        assert_eq!(grid.extent(), (20, 15));
        assert_eq!(grid.len(), 6);
        assert!(!grid.is_empty());
        assert_eq!(grid.tiles().len(), grid.len());
    }

    // Tests cell lookup by row-major index
    // Verified by computing rows with modulo instead of division
    #[test]
    fn test_cell_lookup() {
        let image = RgbImage::new(25, 17);
        let Ok(grid) = TargetGrid::partition(&image, 10, 5) else {
            unreachable!("25x17 image holds 10x5 cells");
        };

        assert_eq!(
            grid.cell(3),
            Some(GridCell {
                index: 3,
                column: 1,
                row: 1,
                x: 10,
                y: 5,
            })
        );
        assert_eq!(grid.cell(6), None);
    }

    // Tests cell iteration agrees with tile origins
    // Verified by iterating cells column-major
    #[test]
    fn test_cells_match_tiles() {
        let image = RgbImage::new(30, 20);
        let Ok(grid) = TargetGrid::partition(&image, 10, 10) else {
            unreachable!("30x20 image holds 10x10 cells");
        };

        for (cell, tile) in grid.cells().zip(grid.tiles()) {
            assert_eq!((cell.x, cell.y), (tile.x, tile.y));
        }
        let indices: Vec<usize> = grid.cells().map(|cell| cell.index).collect();
        assert_eq!(indices, (0..6).collect::<Vec<_>>());
    }

    // Tests a cell larger than the image is rejected
    // Verified by allowing empty grids
    #[test]
    fn test_partition_too_small() {
        let image = RgbImage::new(5, 5);

        assert!(TargetGrid::partition(&image, 10, 10).is_err());
    }
}
