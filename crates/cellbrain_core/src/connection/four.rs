use super::{ConnectionBuilder, Wiring};
use crate::model::Input;

/// Von Neumann wiring: inputs are `[left, up, right, down]`.
///
/// A cell reads its left neighbor's output 3, the upper neighbor's output 4,
/// the right neighbor's output 1 and the lower neighbor's output 2 (1-based),
/// so output `k` of every cell faces the same way.
#[derive(Debug, Clone, Copy, Default)]
pub struct FourNeighborConnections;

impl ConnectionBuilder for FourNeighborConnections {
    fn arity(&self) -> usize {
        4
    }

    fn connect(&self, wiring: &mut Wiring<'_>, row: usize, col: usize) -> Vec<Input> {
        let rows = wiring.row_count();
        let cols = wiring.col_count(row);

        let left = if col > 0 {
            wiring.cell(row, col - 1, 2)
        } else {
            wiring.external(0, -1, row, cols - 1, 2)
        };
        let up = if row > 0 {
            wiring.cell(row - 1, col, 3)
        } else {
            wiring.external(-1, 0, rows - 1, col, 3)
        };
        let right = if col + 1 < cols {
            wiring.cell(row, col + 1, 0)
        } else {
            wiring.external(0, 1, row, 0, 0)
        };
        let down = if row + 1 < rows {
            wiring.cell(row + 1, col, 1)
        } else {
            wiring.external(1, 0, 0, col, 1)
        };
        vec![left, up, right, down]
    }
}
