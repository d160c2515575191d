//! Partition of a matmul output among parallel tasks

use crate::runtime::split_range;
use std::ops::Range;

/// Grid `(rows, cols)` splitting an `m × n` output into at most `tasks`
/// rectangles
///
/// Among the grids with the most cells, picks the one whose cells are
/// closest to square, so the grid ratio follows `m : n`. A dimension is
/// never split finer than its length.
pub fn partition_grid(m: usize, n: usize, tasks: usize) -> (usize, usize) {
    if m == 0 || n == 0 || tasks <= 1 {
        return (1, 1);
    }

    let mut best = (1, 1);
    let mut best_cells = 0;
    let mut best_skew = f64::INFINITY;
    for rows in 1..=tasks.min(m) {
        let cols = (tasks / rows).min(n);
        let cells = rows * cols;
        let cell_ratio = (m as f64 / rows as f64) / (n as f64 / cols as f64);
        let skew = cell_ratio.ln().abs();
        if cells > best_cells || (cells == best_cells && skew < best_skew) {
            best = (rows, cols);
            best_cells = cells;
            best_skew = skew;
        }
    }
    best
}

/// The `(rows, cols)` rectangles of `grid` over an `m × n` output, row by row
pub fn grid_cells(
    m: usize,
    n: usize,
    grid: (usize, usize),
) -> impl Iterator<Item = (Range<usize>, Range<usize>)> {
    split_range(m, grid.0).flat_map(move |rows| {
        split_range(n, grid.1).map(move |cols| (rows.clone(), cols))
    })
}
