//! C-style compute kernel rendering of a [`Program`].
//!
//! Expressions are rendered from their evaluable tree, never from the
//! resolved text: every operation whose plain C form is undefined for some
//! operands goes through a helper from [`KERNEL_PRELUDE`] that matches the
//! interpreter's wrapping semantics.

use std::fmt::{self, Write};

use super::program::Program;
use crate::error::ModelResult;
use crate::expr::{BinaryOp, Node, UnaryOp, VarRef};
use crate::model::Model;

/// Name of the generated kernel entry point.
pub const KERNEL_NAME: &str = "automaton_update";

/// Helper functions emitted ahead of the kernel.
///
/// Arithmetic goes through `uint` so overflow wraps. Division and remainder
/// by zero yield 0, shift counts are masked to five bits, input indices wrap
/// modulo the input length and output map entries use their magnitude.
pub const KERNEL_PRELUDE: &str = "\
int cb_add(int a, int b) { return (int)((uint)a + (uint)b); }
int cb_sub(int a, int b) { return (int)((uint)a - (uint)b); }
int cb_mul(int a, int b) { return (int)((uint)a * (uint)b); }
int cb_neg(int a) { return (int)(0u - (uint)a); }
int cb_div(int a, int b) { return b == 0 ? 0 : (b == -1 ? cb_neg(a) : a / b); }
int cb_rem(int a, int b) { return (b == 0 || b == -1) ? 0 : a % b; }
int cb_shl(int a, int b) { return (int)((uint)a << (b & 31)); }
int cb_shr(int a, int b) { return a >> (b & 31); }
int cb_input(global const int* input, uint length, int idx) {
    if (length == 0u) { return 0; }
    long wrapped = (long)idx % (long)length;
    return input[wrapped < 0 ? wrapped + (long)length : wrapped];
}
uint cb_uabs(int a) { return a < 0 ? 0u - (uint)a : (uint)a; }
";

const LU_INDEX_EXPR: &str = "get_local_id(0)";
const AUTOMATON_INDEX_EXPR: &str = "get_global_id(0) / get_local_size(0)";

/// Emits source for an external executor.
pub trait SimulationGenerator {
    fn generate(&self, out: &mut dyn Write) -> fmt::Result;

    fn generate_string(&self) -> Result<String, fmt::Error> {
        let mut out = String::new();
        self.generate(&mut out)?;
        Ok(out)
    }
}

/// Renders the model as a compute kernel with one work item per logical
/// unit and one work group per automaton.
///
/// Outputs are double buffered: every update of an iteration writes a
/// `_next` local, and all outputs are committed together after a barrier.
/// External values are read into locals before each phase, and a barrier
/// separates those reads from the first store of the phase.
#[derive(Debug, Clone)]
pub struct KernelGenerator {
    program: Program,
    logical_unit_count: usize,
    state_size: usize,
}

impl KernelGenerator {
    pub fn new(model: &Model) -> ModelResult<Self> {
        Ok(Self::from_program(
            Program::compile(model)?,
            model.logical_unit_count(),
        ))
    }

    #[must_use]
    pub fn from_program(program: Program, logical_unit_count: usize) -> Self {
        let state_size = program.unit_state_size * logical_unit_count;
        Self {
            program,
            logical_unit_count,
            state_size,
        }
    }

    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// C rendering of one expression of the program.
    pub fn render(&self, node: &Node) -> Result<String, fmt::Error> {
        let mut out = String::new();
        self.write_node(&mut out, node)?;
        Ok(out)
    }

    fn var_name(&self, var: VarRef) -> Result<&str, fmt::Error> {
        let program = &self.program;
        let name = match var {
            VarRef::State(idx) => program.state_var_names.get(idx),
            VarRef::External(idx) => program.external_reads.get(idx).map(|r| &r.var_name),
            VarRef::Temp(idx) => program.temp_names.get(idx),
        };
        name.map(String::as_str).ok_or(fmt::Error)
    }

    fn write_node(&self, out: &mut dyn Write, node: &Node) -> fmt::Result {
        match node {
            Node::Const(i32::MIN) => out.write_str("(-2147483647 - 1)"),
            Node::Const(value) if *value < 0 => write!(out, "({value})"),
            Node::Const(value) => write!(out, "{value}"),
            Node::Var(var) => out.write_str(self.var_name(*var)?),
            Node::Input(index) => {
                out.write_str("cb_input(automatonInput, automatonInputLength, ")?;
                self.write_node(out, index)?;
                out.write_str(")")
            }
            Node::InputLength => out.write_str("((int)automatonInputLength)"),
            Node::Unary(UnaryOp::Plus, operand) => self.write_node(out, operand),
            Node::Unary(UnaryOp::Neg, operand) => self.write_call(out, "cb_neg", &[&**operand]),
            Node::Unary(op, operand) => {
                write!(out, "({}", op.symbol())?;
                self.write_node(out, operand)?;
                out.write_str(")")
            }
            Node::Binary(op, lhs, rhs) => match guarded_helper(*op) {
                Some(helper) => self.write_call(out, helper, &[&**lhs, &**rhs]),
                None => {
                    out.write_str("(")?;
                    self.write_node(out, lhs)?;
                    write!(out, " {} ", op.symbol())?;
                    self.write_node(out, rhs)?;
                    out.write_str(")")
                }
            },
            Node::Select(cond, then, otherwise) => {
                out.write_str("(")?;
                self.write_node(out, cond)?;
                out.write_str(" ? ")?;
                self.write_node(out, then)?;
                out.write_str(" : ")?;
                self.write_node(out, otherwise)?;
                out.write_str(")")
            }
        }
    }

    fn write_call(&self, out: &mut dyn Write, helper: &str, args: &[&Node]) -> fmt::Result {
        write!(out, "{helper}(")?;
        for (idx, arg) in args.iter().enumerate() {
            if idx > 0 {
                out.write_str(", ")?;
            }
            self.write_node(out, arg)?;
        }
        out.write_str(")")
    }

    fn write_assignment(
        &self,
        out: &mut dyn Write,
        indent: &str,
        target: &str,
        value: &Node,
    ) -> fmt::Result {
        write!(out, "{indent}{target} = ")?;
        self.write_node(out, value)?;
        writeln!(out, ";")
    }

    fn state_index_expr(&self, state_index: usize, lu_index_expr: &str) -> String {
        format!("({state_index} * {}) + {lu_index_expr}", self.logical_unit_count)
    }

    fn write_header(&self, out: &mut dyn Write) -> fmt::Result {
        writeln!(out, "{KERNEL_PRELUDE}")?;
        writeln!(out, "void kernel {KERNEL_NAME}(")?;
        writeln!(
            out,
            "    global const int* automatonInputs, global const int* automatonInputMaps, \
             global int* automatonStates, global const int* automatonOutputMaps, \
             global int* automatonOutputs, const unsigned int automatonInputLength, \
             const unsigned int automatonOutputLength) {{"
        )?;
        writeln!(
            out,
            "    global int* automatonState = &automatonStates[{AUTOMATON_INDEX_EXPR} * {}];",
            self.state_size
        )?;
        for (local, global, length) in [
            ("automatonInput", "automatonInputs", "automatonInputLength"),
            ("automatonInputMap", "automatonInputMaps", "automatonInputLength"),
            ("automatonOutputMap", "automatonOutputMaps", "automatonOutputLength"),
            ("automatonOutput", "automatonOutputs", "automatonOutputLength"),
        ] {
            let qualifier = if local == "automatonOutput" { "" } else { "const " };
            writeln!(
                out,
                "    global {qualifier}int* {local} = &{global}[{AUTOMATON_INDEX_EXPR} * {length}];"
            )?;
        }
        writeln!(out)
    }

    fn write_input_map(&self, out: &mut dyn Write) -> fmt::Result {
        writeln!(
            out,
            "    for (int idx = {LU_INDEX_EXPR}; idx < automatonInputLength; idx += get_local_size(0)) {{"
        )?;
        writeln!(out, "        if (automatonInputMap[idx] >= 0) {{")?;
        writeln!(
            out,
            "            automatonState[automatonInputMap[idx] % {}] = automatonInput[idx];",
            self.state_size.max(1)
        )?;
        writeln!(out, "        }}")?;
        writeln!(out, "    }}")?;
        writeln!(out, "    barrier(CLK_GLOBAL_MEM_FENCE);")?;
        writeln!(out)
    }

    fn write_locals(&self, out: &mut dyn Write) -> fmt::Result {
        let program = &self.program;
        writeln!(out, "    int luRow = {LU_INDEX_EXPR} / {};", program.width)?;
        writeln!(out, "    int luCol = {LU_INDEX_EXPR} % {};", program.width)?;
        for (idx, name) in program.state_var_names.iter().enumerate() {
            writeln!(
                out,
                "    int {name} = automatonState[{}];",
                self.state_index_expr(idx, LU_INDEX_EXPR)
            )?;
        }
        for read in &program.external_reads {
            let unit_expr = format!(
                "((luRow + {} + {h}) % {h}) * {w} + (luCol + {} + {w}) % {w}",
                read.relative_unit_row,
                read.relative_unit_col,
                h = program.height,
                w = program.width,
            );
            writeln!(
                out,
                "    int {}_idx = {};",
                read.var_name,
                self.state_index_expr(read.source_state_index, &unit_expr)
            )?;
            writeln!(out, "    int {} = 0;", read.var_name)?;
        }
        for name in &program.temp_names {
            writeln!(out, "    int {name} = 0;")?;
        }
        writeln!(out)
    }

    fn write_external_reads(&self, out: &mut dyn Write, indent: &str) -> fmt::Result {
        for read in &self.program.external_reads {
            writeln!(
                out,
                "{indent}{name} = automatonState[{name}_idx];",
                name = read.var_name
            )?;
        }
        Ok(())
    }

    fn write_store_outputs(&self, out: &mut dyn Write, indent: &str) -> fmt::Result {
        let mut stored: Vec<usize> = self
            .program
            .constant_updates
            .iter()
            .chain(&self.program.updates)
            .map(|u| u.state_index)
            .collect();
        stored.sort_unstable();
        stored.dedup();
        for idx in stored {
            writeln!(
                out,
                "{indent}automatonState[{}] = {};",
                self.state_index_expr(idx, LU_INDEX_EXPR),
                self.program.state_var_names[idx]
            )?;
        }
        writeln!(out, "{indent}barrier(CLK_GLOBAL_MEM_FENCE);")
    }

    fn write_constants(&self, out: &mut dyn Write) -> fmt::Result {
        let program = &self.program;
        if program.constant_staging.is_empty() && program.constant_updates.is_empty() {
            return Ok(());
        }
        if !program.external_reads.is_empty() {
            self.write_external_reads(out, "    ")?;
            writeln!(out, "    barrier(CLK_GLOBAL_MEM_FENCE);")?;
        }
        for statement in &program.constant_staging {
            self.write_assignment(out, "    ", &statement.target, &statement.value)?;
        }
        for statement in &program.constant_updates {
            self.write_assignment(out, "    ", &statement.target, &statement.value)?;
        }
        self.write_store_outputs(out, "    ")?;
        writeln!(out)
    }

    fn write_iterations(&self, out: &mut dyn Write) -> fmt::Result {
        let program = &self.program;
        writeln!(
            out,
            "    for (int cnt = 0; cnt < {}; cnt++) {{",
            program.iterations_per_update
        )?;
        self.write_external_reads(out, "        ")?;
        for name in &program.temp_names {
            writeln!(out, "        {name} = 0;")?;
        }
        for statement in &program.staging {
            self.write_assignment(out, "        ", &statement.target, &statement.value)?;
        }
        for statement in &program.updates {
            let next = format!("int {}_next", statement.target);
            self.write_assignment(out, "        ", &next, &statement.value)?;
        }
        writeln!(out, "        barrier(CLK_GLOBAL_MEM_FENCE);")?;
        for statement in &program.updates {
            writeln!(out, "        {name} = {name}_next;", name = statement.target)?;
        }
        self.write_store_outputs(out, "        ")?;
        writeln!(out, "    }}")?;
        writeln!(out)
    }

    fn write_output_map(&self, out: &mut dyn Write) -> fmt::Result {
        writeln!(
            out,
            "    for (int idx = {LU_INDEX_EXPR}; idx < automatonOutputLength; idx += get_local_size(0)) {{"
        )?;
        writeln!(
            out,
            "        automatonOutput[idx] = automatonState[cb_uabs(automatonOutputMap[idx]) % {}];",
            self.state_size.max(1)
        )?;
        writeln!(out, "    }}")?;
        writeln!(out, "}}")
    }
}

/// Prelude helper for operators whose plain C form is not total.
fn guarded_helper(op: BinaryOp) -> Option<&'static str> {
    match op {
        BinaryOp::Add => Some("cb_add"),
        BinaryOp::Sub => Some("cb_sub"),
        BinaryOp::Mul => Some("cb_mul"),
        BinaryOp::Div => Some("cb_div"),
        BinaryOp::Rem => Some("cb_rem"),
        BinaryOp::Shl => Some("cb_shl"),
        BinaryOp::Shr => Some("cb_shr"),
        _ => None,
    }
}

impl SimulationGenerator for KernelGenerator {
    fn generate(&self, out: &mut dyn Write) -> fmt::Result {
        self.write_header(out)?;
        self.write_input_map(out)?;
        self.write_locals(out)?;
        self.write_constants(out)?;
        self.write_iterations(out)?;
        self.write_output_map(out)
    }
}
