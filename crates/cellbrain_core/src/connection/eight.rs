use super::{ConnectionBuilder, Wiring};
use crate::model::Input;

/// Moore wiring: inputs are
/// `[left, upper-left, up, upper-right, right, lower-right, down, lower-left]`.
///
/// Direction `d` reads output `(d + 4) % 8` of its neighbor. Diagonal links
/// that leave the unit through one edge only shift a single axis; the corner
/// cell's diagonal shifts both.
#[derive(Debug, Clone, Copy, Default)]
pub struct EightNeighborConnections;

impl ConnectionBuilder for EightNeighborConnections {
    fn arity(&self) -> usize {
        8
    }

    fn connect(&self, wiring: &mut Wiring<'_>, row: usize, col: usize) -> Vec<Input> {
        let rows = wiring.row_count();
        let cols = wiring.col_count(row);
        let first_row = row == 0;
        let last_row = row + 1 == rows;
        let first_col = col == 0;
        let last_col = col + 1 == cols;

        let left = if !first_col {
            wiring.cell(row, col - 1, 4)
        } else {
            wiring.external(0, -1, row, cols - 1, 4)
        };

        let upper_left = match (first_row, first_col) {
            (false, false) => wiring.cell(row - 1, col - 1, 5),
            (true, true) => wiring.external(-1, -1, rows - 1, cols - 1, 5),
            (true, false) => wiring.external(-1, 0, rows - 1, col - 1, 5),
            (false, true) => wiring.external(0, -1, row - 1, cols - 1, 5),
        };

        let up = if !first_row {
            wiring.cell(row - 1, col, 6)
        } else {
            wiring.external(-1, 0, rows - 1, col, 6)
        };

        let upper_right = match (first_row, last_col) {
            (false, false) => wiring.cell(row - 1, col + 1, 7),
            (true, true) => wiring.external(-1, 1, rows - 1, 0, 7),
            (false, true) => wiring.external(0, 1, row - 1, 0, 7),
            (true, false) => wiring.external(-1, 0, rows - 1, col + 1, 7),
        };

        let right = if !last_col {
            wiring.cell(row, col + 1, 0)
        } else {
            wiring.external(0, 1, row, 0, 0)
        };

        let lower_right = match (last_row, last_col) {
            (false, false) => wiring.cell(row + 1, col + 1, 1),
            (true, true) => wiring.external(1, 1, 0, 0, 1),
            (false, true) => wiring.external(0, 1, row + 1, 0, 1),
            (true, false) => wiring.external(1, 0, 0, col + 1, 1),
        };

        let down = if !last_row {
            wiring.cell(row + 1, col, 2)
        } else {
            wiring.external(1, 0, 0, col, 2)
        };

        let lower_left = match (last_row, first_col) {
            (false, false) => wiring.cell(row + 1, col - 1, 3),
            (true, true) => wiring.external(1, -1, 0, cols - 1, 3),
            (false, true) => wiring.external(0, -1, row + 1, cols - 1, 3),
            (true, false) => wiring.external(1, 0, 0, col - 1, 3),
        };

        vec![
            left,
            upper_left,
            up,
            upper_right,
            right,
            lower_right,
            down,
            lower_left,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::tests::matrix;
    use crate::connection::ExternalCell;

    fn external_of<'a>(
        info: &'a crate::connection::ConnectionInfo,
        input: Input,
    ) -> &'a ExternalCell {
        match input {
            Input::External(idx) => &info.external_cells[idx],
            other => panic!("expected external input, got {other:?}"),
        }
    }

    #[test]
    fn test_single_cell_has_eight_distinct_externals() {
        let info = EightNeighborConnections.build(&matrix(1, 1, 8));
        assert_eq!(info.external_cells.len(), 8);
        let offsets: Vec<(i32, i32)> = info
            .external_cells
            .iter()
            .map(|e| (e.relative_unit_row, e.relative_unit_col))
            .collect();
        assert_eq!(
            offsets,
            vec![
                (0, -1),
                (-1, -1),
                (-1, 0),
                (-1, 1),
                (0, 1),
                (1, 1),
                (1, 0),
                (1, -1)
            ]
        );
    }

    #[test]
    fn test_top_edge_diagonal_shifts_rows_only() {
        let info = EightNeighborConnections.build(&matrix(2, 2, 8));
        // Cell (0, 1): upper-left leaves through the top edge only.
        let ext = external_of(&info, info.inputs[1][1]);
        assert_eq!((ext.relative_unit_row, ext.relative_unit_col), (-1, 0));
        assert_eq!(ext.cell_id, "3");
        assert_eq!(ext.output_id, "6");
    }

    #[test]
    fn test_left_edge_diagonal_shifts_columns_only() {
        let info = EightNeighborConnections.build(&matrix(2, 2, 8));
        // Cell (1, 0): upper-left leaves through the left edge only.
        let ext = external_of(&info, info.inputs[2][1]);
        assert_eq!((ext.relative_unit_row, ext.relative_unit_col), (0, -1));
        assert_eq!(ext.cell_id, "2");
    }

    #[test]
    fn test_corner_diagonal_shifts_both_axes() {
        let info = EightNeighborConnections.build(&matrix(2, 2, 8));
        let ext = external_of(&info, info.inputs[3][5]);
        assert_eq!((ext.relative_unit_row, ext.relative_unit_col), (1, 1));
        assert_eq!(ext.cell_id, "1");
        assert_eq!(ext.output_id, "2");
    }

    #[test]
    fn test_interior_reads_opposite_outputs() {
        let info = EightNeighborConnections.build(&matrix(3, 3, 8));
        let outputs: Vec<usize> = info.inputs[4]
            .iter()
            .map(|i| match i {
                Input::Cell { output, .. } => *output,
                Input::External(_) => usize::MAX,
            })
            .collect();
        assert_eq!(outputs, vec![4, 5, 6, 7, 0, 1, 2, 3]);
    }
}
