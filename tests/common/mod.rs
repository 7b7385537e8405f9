pub mod macros;

use std::sync::Arc;

use cellbrain_core::automaton::{share, SharedSimulator, SimulatorCellularAutomaton};
use cellbrain_core::simulator::InterpretedSimulator;
use cellbrain_core::Model;
use cellbrain_data::{
    new_cellular_automaton, new_output, new_var, CellType, CellularAutomatonDescriptor,
    NeighborConnections, Output,
};

/// Fluent descriptor construction for tests.
#[allow(dead_code)]
pub struct DescriptorBuilder {
    width: usize,
    height: usize,
    unit_rows: usize,
    unit_cols: usize,
    connections: NeighborConnections,
    iterations: Option<usize>,
    cell_type: CellType,
}

#[allow(dead_code)]
impl DescriptorBuilder {
    pub fn new(cell_type: CellType) -> Self {
        Self {
            width: 1,
            height: 1,
            unit_rows: 1,
            unit_cols: 1,
            connections: NeighborConnections::Four,
            iterations: None,
            cell_type,
        }
    }

    pub fn with_grid(mut self, width: usize, height: usize) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_unit(mut self, rows: usize, cols: usize) -> Self {
        self.unit_rows = rows;
        self.unit_cols = cols;
        self
    }

    pub fn with_connections(mut self, connections: NeighborConnections) -> Self {
        self.connections = connections;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = Some(iterations);
        self
    }

    pub fn build(self) -> CellularAutomatonDescriptor {
        let mut descriptor = new_cellular_automaton(
            self.width,
            self.height,
            self.cell_type,
            self.unit_rows,
            self.unit_cols,
        );
        descriptor.logical_unit.neighbor_connections = Some(self.connections);
        descriptor.iterations_per_update = self.iterations;
        descriptor
    }

    pub fn build_model(self) -> Arc<Model> {
        Arc::new(Model::build(&self.build()).expect("descriptor should build"))
    }
}

/// One output per direction; every output is the OR of all inputs.
#[allow(dead_code)]
pub fn spread_cell_type(arity: usize) -> CellType {
    let expression = (1..=arity)
        .map(|n| format!("{{input{n}}}"))
        .collect::<Vec<_>>()
        .join(" | ");
    CellType {
        id: "spread".into(),
        outputs: (1..=arity)
            .map(|n| new_output(&n.to_string(), &expression, &[]))
            .collect(),
        params: Vec::new(),
        vars: Vec::new(),
    }
}

/// Exercises params, output params, vars, staging, constants and input reads.
#[allow(dead_code)]
pub fn mixed_cell_type() -> CellType {
    let mut cell_type = CellType::new("mixed");
    cell_type.params.push(cellbrain_data::new_param("bias"));
    cell_type.vars.push(new_var("acc"));
    cell_type.outputs.push(Output {
        before_update: Some("int {acc} = {input1} + {input2}; {acc} = {acc} ^ {bias};".into()),
        ..new_output("1", "{acc} > 0 ? {acc} * {gain} : -{acc}", &["gain"])
    });
    cell_type.outputs.push(new_output(
        "2",
        "({output1} << 1) | (automatonInput[{input3} & 3] & {mask})",
        &["mask"],
    ));
    cell_type.outputs.push(new_output("3", "{input4} - {output3} / 3", &[]));
    cell_type.outputs.push(Output {
        constant: true,
        ..new_output("4", "{bias} % 7 + 0x10", &[])
    });
    cell_type
}

/// Operators whose plain C forms are undefined for some operands: zero
/// divisors, oversized shifts, overflow and negative input indices.
#[allow(dead_code)]
pub fn hazard_cell_type() -> CellType {
    let mut cell_type = CellType::new("hazard");
    cell_type.outputs.push(new_output(
        "1",
        "{input1} / {output2} + {output1} % {input2}",
        &[],
    ));
    cell_type.outputs.push(new_output(
        "2",
        "({output1} << {input3}) ^ ({output2} >> {output4}) ^ {output4} / -1",
        &[],
    ));
    cell_type.outputs.push(new_output(
        "3",
        "automatonInput[{output1}] - {output3} * {output3}",
        &[],
    ));
    cell_type.outputs.push(Output {
        constant: true,
        ..new_output("4", "{input4} + {output4} * 65537", &[])
    });
    cell_type
}

#[allow(dead_code)]
pub fn interpreted(model: &Model, size: usize, io_size: usize) -> SharedSimulator {
    share(Box::new(
        InterpretedSimulator::new(model, size, io_size, io_size).expect("model should compile"),
    ))
}

#[allow(dead_code)]
pub fn automaton(model: &Arc<Model>, simulator: &SharedSimulator) -> SimulatorCellularAutomaton {
    SimulatorCellularAutomaton::new(std::rc::Rc::clone(simulator), Arc::clone(model))
        .expect("slot should be available")
}
