/// Asserts that the per-unit state indices of a model form `[0, state_size)`.
#[macro_export]
macro_rules! assert_state_bijection {
    ($model:expr) => {
        let unit = $model.logical_unit();
        let mut seen = vec![false; unit.state_size()];
        for name in unit.var_names() {
            let index = unit
                .state_index(name)
                .expect("every variable should have a state index");
            assert!(!seen[index], "State index {} assigned twice", index);
            seen[index] = true;
        }
        assert!(seen.iter().all(|&s| s), "State indices have gaps");
    };
}

/// Asserts that every cell of a model has one input per neighbor direction.
#[macro_export]
macro_rules! assert_full_arity {
    ($model:expr) => {
        let unit = $model.logical_unit();
        let arity = unit.neighbor_connections.arity();
        for cell in &unit.cells {
            assert_eq!(
                cell.inputs.len(),
                arity,
                "Cell {} has {} inputs, expected {}",
                cell.id,
                cell.inputs.len(),
                arity
            );
            for input in &cell.inputs {
                assert!(
                    unit.input_var_name(*input).is_some(),
                    "Cell {} has a dangling input {:?}",
                    cell.id,
                    input
                );
            }
        }
    };
}

/// Asserts the value of a cell output seen through a façade.
#[macro_export]
macro_rules! assert_output {
    ($automaton:expr, $row:expr, $col:expr, $output:expr, $expected:expr) => {
        let value = $automaton
            .cell($row, $col)
            .expect("cell should exist")
            .output($output)
            .expect("output should exist");
        assert_eq!(
            value, $expected,
            "Cell ({}, {}) output {} mismatch",
            $row, $col, $output
        );
    };
}
