mod common;

use std::collections::HashMap;
use std::sync::Arc;

use cellbrain_core::codegen::{Program, SimulationGenerator};
use cellbrain_core::simulator::{InterpretedSimulator, Simulator};
use cellbrain_core::{KernelGenerator, Model};
use cellbrain_data::NeighborConnections;
use common::{hazard_cell_type, mixed_cell_type, DescriptorBuilder};
use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Statement lines lifted out of generated kernel source.
#[derive(Debug, Default)]
struct KernelText {
    constants: Vec<(String, String)>,
    staging: Vec<(String, String)>,
    updates: Vec<(String, String)>,
    output_index: String,
}

fn is_identifier(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn assignment(line: &str) -> Option<(&str, &str)> {
    let (target, value) = line.split_once(" = ")?;
    Some((target, value.strip_suffix(';')?))
}

impl KernelText {
    fn parse(kernel: &str) -> Self {
        let mut text = Self::default();
        let mut in_loop = false;
        for line in kernel.lines() {
            if let Some(index) = line
                .trim()
                .strip_prefix("automatonOutput[idx] = automatonState[")
            {
                text.output_index = index.trim_end_matches("];").to_string();
                continue;
            }
            if line.starts_with("    for (int cnt") {
                in_loop = true;
                continue;
            }
            if in_loop && line == "    }" {
                in_loop = false;
                continue;
            }
            let indent = if in_loop { "        " } else { "    " };
            let Some(body) = line.strip_prefix(indent) else {
                continue;
            };
            if body.starts_with(' ') {
                continue;
            }
            let Some((target, value)) = assignment(body) else {
                continue;
            };
            if value.starts_with("automatonState[") {
                continue;
            }
            if in_loop {
                if let Some(next) = target.strip_prefix("int ").and_then(|t| t.strip_suffix("_next")) {
                    text.updates.push((next.to_string(), value.to_string()));
                } else if is_identifier(target) && value != format!("{target}_next") {
                    text.staging.push((target.to_string(), value.to_string()));
                }
            } else if is_identifier(target) {
                text.constants.push((target.to_string(), value.to_string()));
            }
        }
        text
    }
}

/// Evaluates the C expressions the kernel emits, with the prelude helpers
/// implemented from their C definitions.
struct CExpr<'a> {
    tokens: Vec<String>,
    pos: usize,
    vars: &'a HashMap<String, i64>,
    arrays: &'a HashMap<&'static str, Vec<i32>>,
}

const PUNCTUATION: [&str; 27] = [
    "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "(", ")", ",", "?", ":", "[", "]", "&", "|",
    "^", "+", "-", "*", "/", "%", "<", ">", "~", "!",
];

fn tokenize(source: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut rest = source.trim_start();
    while !rest.is_empty() {
        let word: String = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        let token = if word.is_empty() {
            PUNCTUATION
                .iter()
                .find(|p| rest.starts_with(**p))
                .unwrap_or_else(|| panic!("unexpected kernel text {rest}"))
                .to_string()
        } else {
            word
        };
        rest = rest[token.len()..].trim_start();
        tokens.push(token);
    }
    tokens
}

fn binding_power(op: &str) -> Option<u8> {
    Some(match op {
        "||" => 1,
        "&&" => 2,
        "|" => 3,
        "^" => 4,
        "&" => 5,
        "==" | "!=" => 6,
        "<" | "<=" | ">" | ">=" => 7,
        "<<" | ">>" => 8,
        "+" | "-" => 9,
        "*" | "/" | "%" => 10,
        _ => return None,
    })
}

fn helper(name: &str, args: &[i64], input: &[i32]) -> i64 {
    let arg = |idx: usize| args[idx] as i32;
    let value = match name {
        "cb_add" => (i64::from(arg(0)) + i64::from(arg(1))) as i32,
        "cb_sub" => (i64::from(arg(0)) - i64::from(arg(1))) as i32,
        "cb_mul" => (i64::from(arg(0)) * i64::from(arg(1))) as i32,
        "cb_neg" => (-i64::from(arg(0))) as i32,
        "cb_div" => match arg(1) {
            0 => 0,
            -1 => (-i64::from(arg(0))) as i32,
            b => arg(0) / b,
        },
        "cb_rem" => match arg(1) {
            0 | -1 => 0,
            b => arg(0) % b,
        },
        "cb_shl" => ((arg(0) as u32 as u64) << (arg(1) & 31)) as u32 as i32,
        "cb_shr" => arg(0) >> (arg(1) & 31),
        "cb_input" => {
            let length = input.len() as i64;
            if length == 0 {
                return 0;
            }
            let wrapped = i64::from(arg(2)) % length;
            let idx = if wrapped < 0 { wrapped + length } else { wrapped };
            input[idx as usize]
        }
        "cb_uabs" => return i64::from(arg(0)).abs(),
        other => panic!("unknown helper {other}"),
    };
    i64::from(value)
}

impl<'a> CExpr<'a> {
    fn eval(
        source: &str,
        vars: &'a HashMap<String, i64>,
        arrays: &'a HashMap<&'static str, Vec<i32>>,
    ) -> i64 {
        let mut expr = Self {
            tokens: tokenize(source),
            pos: 0,
            vars,
            arrays,
        };
        let value = expr.ternary();
        assert_eq!(expr.pos, expr.tokens.len(), "trailing kernel text in {source}");
        value
    }

    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn next(&mut self) -> String {
        self.pos += 1;
        self.tokens[self.pos - 1].clone()
    }

    fn expect(&mut self, token: &str) {
        assert_eq!(self.next(), token);
    }

    fn ternary(&mut self) -> i64 {
        let cond = self.binary(1);
        if self.peek() != Some("?") {
            return cond;
        }
        self.expect("?");
        let then = self.ternary();
        self.expect(":");
        let otherwise = self.ternary();
        if cond != 0 {
            then
        } else {
            otherwise
        }
    }

    fn binary(&mut self, min_power: u8) -> i64 {
        let mut lhs = self.unary();
        while let Some(power) = self.peek().and_then(binding_power) {
            if power < min_power {
                break;
            }
            let op = self.next();
            let rhs = self.binary(power + 1);
            lhs = match op.as_str() {
                "||" => i64::from(lhs != 0 || rhs != 0),
                "&&" => i64::from(lhs != 0 && rhs != 0),
                "|" => lhs | rhs,
                "^" => lhs ^ rhs,
                "&" => lhs & rhs,
                "==" => i64::from(lhs == rhs),
                "!=" => i64::from(lhs != rhs),
                "<" => i64::from(lhs < rhs),
                "<=" => i64::from(lhs <= rhs),
                ">" => i64::from(lhs > rhs),
                ">=" => i64::from(lhs >= rhs),
                "+" => lhs + rhs,
                "-" => lhs - rhs,
                "*" => lhs * rhs,
                "/" => lhs / rhs,
                "%" => lhs % rhs,
                other => panic!("raw {other} in kernel expression"),
            };
        }
        lhs
    }

    fn unary(&mut self) -> i64 {
        match self.peek() {
            Some("-") => {
                self.next();
                -self.unary()
            }
            Some("~") => {
                self.next();
                !self.unary()
            }
            Some("!") => {
                self.next();
                i64::from(self.unary() == 0)
            }
            Some("(")
                if self.tokens.get(self.pos + 1).map(String::as_str) == Some("int")
                    && self.tokens.get(self.pos + 2).map(String::as_str) == Some(")") =>
            {
                self.pos += 3;
                i64::from(self.unary() as i32)
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> i64 {
        let token = self.next();
        if token == "(" {
            let value = self.ternary();
            self.expect(")");
            return value;
        }
        if let Ok(value) = token.parse::<i64>() {
            return value;
        }
        match self.peek() {
            Some("(") => {
                self.next();
                let mut args = Vec::new();
                while self.peek() != Some(")") {
                    args.push(self.ternary());
                    if self.peek() == Some(",") {
                        self.next();
                    }
                }
                self.expect(")");
                helper(&token, &args, &self.arrays["automatonInput"])
            }
            Some("[") => {
                self.next();
                let idx = self.ternary();
                self.expect("]");
                i64::from(self.arrays[token.as_str()][idx as usize])
            }
            _ => match token.as_str() {
                "automatonInput" => 0,
                "automatonInputLength" => self.arrays["automatonInput"].len() as i64,
                name => *self
                    .vars
                    .get(name)
                    .unwrap_or_else(|| panic!("kernel reads undeclared {name}")),
            },
        }
    }
}

/// Runs the statements of a generated kernel one work item at a time, with
/// barriers modeled as phase boundaries.
struct KernelReference {
    text: KernelText,
    program: Program,
    lu_count: usize,
}

impl KernelReference {
    fn new(model: &Model) -> Self {
        let generator = KernelGenerator::new(model).unwrap();
        let kernel = generator.generate_string().unwrap();
        Self {
            text: KernelText::parse(&kernel),
            program: generator.program().clone(),
            lu_count: model.logical_unit_count(),
        }
    }

    fn state_index(&self, name: &str) -> usize {
        self.program
            .state_var_names
            .iter()
            .position(|n| n == name)
            .unwrap_or_else(|| panic!("{name} is not a state variable"))
    }

    /// `((luRow + dr + H) % H) * W + (luCol + dc + W) % W`
    fn locals(&self, state: &[i32], lu_index: usize) -> HashMap<String, i64> {
        let program = &self.program;
        let (h, w) = (program.height as i32, program.width as i32);
        let lu_row = lu_index as i32 / w;
        let lu_col = lu_index as i32 % w;
        let mut vars = HashMap::new();
        for (idx, name) in program.state_var_names.iter().enumerate() {
            vars.insert(name.clone(), i64::from(state[idx * self.lu_count + lu_index]));
        }
        for read in &program.external_reads {
            let (dr, dc) = (read.relative_unit_row, read.relative_unit_col);
            let unit = ((lu_row + dr + h) % h) * w + (lu_col + dc + w) % w;
            let value = state[read.source_state_index * self.lu_count + unit as usize];
            vars.insert(read.var_name.clone(), i64::from(value));
        }
        for name in &program.temp_names {
            vars.insert(name.clone(), 0);
        }
        vars
    }

    fn run(
        statements: &[(String, String)],
        vars: &mut HashMap<String, i64>,
        arrays: &HashMap<&'static str, Vec<i32>>,
    ) {
        for (target, value) in statements {
            let value = i64::from(CExpr::eval(value, vars, arrays) as i32);
            vars.insert(target.clone(), value);
        }
    }

    fn update(&self, state: &mut [i32], input: &[i32]) {
        let arrays = HashMap::from([("automatonInput", input.to_vec())]);

        if !self.text.constants.is_empty() {
            let before = state.to_vec();
            for lu_index in 0..self.lu_count {
                let mut vars = self.locals(&before, lu_index);
                for (idx, name) in self.program.state_var_names.iter().enumerate() {
                    vars.insert(name.clone(), i64::from(state[idx * self.lu_count + lu_index]));
                }
                Self::run(&self.text.constants, &mut vars, &arrays);
                for (target, _) in &self.text.constants {
                    if let Some(idx) = self.program.state_var_names.iter().position(|n| n == target) {
                        state[idx * self.lu_count + lu_index] = vars[target] as i32;
                    }
                }
            }
        }

        for _ in 0..self.program.iterations_per_update {
            let mut next = state.to_vec();
            for lu_index in 0..self.lu_count {
                let mut vars = self.locals(state, lu_index);
                Self::run(&self.text.staging, &mut vars, &arrays);
                for (target, value) in &self.text.updates {
                    let idx = self.state_index(target);
                    next[idx * self.lu_count + lu_index] =
                        CExpr::eval(value, &vars, &arrays) as i32;
                }
            }
            state.copy_from_slice(&next);
        }
    }

    fn output(&self, state: &[i32], output_map: &[i32]) -> Vec<i32> {
        let arrays = HashMap::from([
            ("automatonInput", Vec::new()),
            ("automatonOutputMap", output_map.to_vec()),
        ]);
        (0..output_map.len())
            .map(|idx| {
                let vars = HashMap::from([("idx".to_string(), idx as i64)]);
                state[CExpr::eval(&self.text.output_index, &vars, &arrays) as usize]
            })
            .collect()
    }
}

fn mixed_model(connections: NeighborConnections) -> Arc<Model> {
    DescriptorBuilder::new(mixed_cell_type())
        .with_grid(3, 2)
        .with_unit(2, 2)
        .with_connections(connections)
        .with_iterations(2)
        .build_model()
}

fn hazard_model() -> Arc<Model> {
    DescriptorBuilder::new(hazard_cell_type())
        .with_grid(2, 2)
        .with_unit(1, 2)
        .with_connections(NeighborConnections::Four)
        .with_iterations(2)
        .build_model()
}

/// Random values with small magnitudes mixed in so zero divisors and
/// in-range shifts occur.
fn random_state(rng: &mut ChaCha8Rng, size: usize) -> Vec<i32> {
    (0..size)
        .map(|_| {
            if rng.gen_bool(0.5) {
                rng.gen_range(-2..=2)
            } else {
                rng.gen()
            }
        })
        .collect()
}

fn compare(model: &Model, seed: u64, ticks: usize) {
    let reference = KernelReference::new(model);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut expected = random_state(&mut rng, model.state_size());
    let input: Vec<i32> = (0..4).map(|_| rng.gen_range(-64..64)).collect();

    let mut sim = InterpretedSimulator::new(model, 1, input.len(), 1).unwrap();
    sim.set_state(0, &expected).unwrap();
    sim.set_input(0, &input).unwrap();

    let mut actual = vec![0; model.state_size()];
    for tick in 0..ticks {
        reference.update(&mut expected, &input);
        sim.update().unwrap();
        sim.get_state(0, &mut actual).unwrap();
        assert_eq!(actual, expected, "diverged at tick {tick}");
    }
}

#[test]
fn test_kernel_commits_every_update_through_next_value() {
    for connections in [NeighborConnections::Four, NeighborConnections::Eight] {
        let model = mixed_model(connections);
        let generator = KernelGenerator::new(&model).unwrap();
        let kernel = generator.generate_string().unwrap();
        for update in &generator.program().updates {
            let line = format!(
                "int {}_next = {};",
                update.target,
                generator.render(&update.value).unwrap()
            );
            assert!(kernel.contains(&line), "missing {line}");
            let commit = format!("{name} = {name}_next;", name = update.target);
            assert!(kernel.contains(&commit), "missing {commit}");
        }
        for constant in &generator.program().constant_updates {
            assert!(!kernel.contains(&format!("{}_next", constant.target)));
        }
    }
}

#[test]
fn test_kernel_text_covers_every_statement() {
    let model = hazard_model();
    let reference = KernelReference::new(&model);
    assert_eq!(reference.text.updates.len(), reference.program.updates.len());
    assert_eq!(
        reference.text.constants.len(),
        reference.program.constant_staging.len() + reference.program.constant_updates.len()
    );
    assert!(reference.text.output_index.starts_with("cb_uabs("));
}

#[test]
fn test_interpreter_matches_kernel_semantics() {
    compare(&mixed_model(NeighborConnections::Four), 7, 5);
    compare(&mixed_model(NeighborConnections::Eight), 11, 5);
}

#[test]
fn test_zero_divisors_and_wide_shifts_match_kernel() {
    let model = hazard_model();
    let reference = KernelReference::new(&model);
    let input = [3, -4, 5];
    // Zero outputs divide by zero on the first tick; 40 and -1 are
    // oversized and negative shift counts and input indices.
    let mut expected: Vec<i32> = (0..model.state_size())
        .map(|idx| [0, 40, -1, i32::MIN][idx % 4])
        .collect();

    let mut sim = InterpretedSimulator::new(&model, 1, input.len(), 1).unwrap();
    sim.set_state(0, &expected).unwrap();
    sim.set_input(0, &input).unwrap();
    reference.update(&mut expected, &input);
    sim.update().unwrap();

    let mut actual = vec![0; model.state_size()];
    sim.get_state(0, &mut actual).unwrap();
    assert_eq!(actual, expected);
}

#[test]
fn test_negative_output_map_matches_kernel() {
    let model = hazard_model();
    let reference = KernelReference::new(&model);
    let map = [-1, i32::MIN, -7, 3];
    let state: Vec<i32> = (0..model.state_size() as i32).map(|v| v * 10).collect();

    let mut sim = InterpretedSimulator::new(&model, 1, 0, map.len()).unwrap();
    sim.set_state(0, &state).unwrap();
    sim.set_output_map(0, &map).unwrap();
    sim.update().unwrap();
    let mut updated = vec![0; model.state_size()];
    sim.get_state(0, &mut updated).unwrap();

    let mut output = vec![0; map.len()];
    sim.get_output(0, &mut output).unwrap();
    assert_eq!(output, reference.output(&updated, &map));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_interpreter_matches_kernel_from_random_states(
        seed in any::<u64>(),
        eight in any::<bool>(),
    ) {
        let connections = if eight {
            NeighborConnections::Eight
        } else {
            NeighborConnections::Four
        };
        compare(&mixed_model(connections), seed, 3);
    }

    #[test]
    fn prop_hazardous_operators_match_kernel(seed in any::<u64>()) {
        compare(&hazard_model(), seed, 3);
    }
}
