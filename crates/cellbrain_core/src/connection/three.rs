use super::{ConnectionBuilder, Wiring};
use crate::model::Input;

/// Hexagonal-style wiring: inputs are `[left, vertical, right]`.
///
/// The vertical input alternates by parity: cells with `row % 2 == col % 2`
/// connect to the row above, the others to the row below.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreeNeighborConnections;

impl ConnectionBuilder for ThreeNeighborConnections {
    fn arity(&self) -> usize {
        3
    }

    fn connect(&self, wiring: &mut Wiring<'_>, row: usize, col: usize) -> Vec<Input> {
        let rows = wiring.row_count();
        let cols = wiring.col_count(row);

        let left = if col > 0 {
            wiring.cell(row, col - 1, 2)
        } else {
            wiring.external(0, -1, row, cols - 1, 2)
        };

        let vertical = if col % 2 == row % 2 {
            if row > 0 {
                wiring.cell(row - 1, col, 1)
            } else {
                wiring.external(-1, 0, rows - 1, col, 1)
            }
        } else if row + 1 < rows {
            wiring.cell(row + 1, col, 1)
        } else {
            wiring.external(1, 0, 0, col, 1)
        };

        let right = if col + 1 < cols {
            wiring.cell(row, col + 1, 0)
        } else {
            wiring.external(0, 1, row, 0, 0)
        };
        vec![left, vertical, right]
    }
}
