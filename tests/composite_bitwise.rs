mod common;

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cellbrain_core::simulator::{
    Allocator, BitwiseSimulator, CompositeSimulator, InterpretedSimulator, NoOpSimulator,
    Simulator,
};
use cellbrain_core::{Result, SimulatorConfig, SimulatorFactory, SimulatorKind};
use cellbrain_data::toggle_cell_type;
use common::DescriptorBuilder;
use proptest::prelude::*;

/// Forwards to an inner simulator and counts `update` calls.
struct Counting {
    inner: Box<dyn Simulator>,
    updates: Arc<AtomicUsize>,
}

impl Simulator for Counting {
    fn allocator(&mut self) -> &mut Allocator {
        self.inner.allocator()
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn state_size(&self) -> usize {
        self.inner.state_size()
    }

    fn input_size(&self) -> usize {
        self.inner.input_size()
    }

    fn output_size(&self) -> usize {
        self.inner.output_size()
    }

    fn get_state(&mut self, index: usize, state: &mut [i32]) -> Result<()> {
        self.inner.get_state(index, state)
    }

    fn set_state(&mut self, index: usize, state: &[i32]) -> Result<()> {
        self.inner.set_state(index, state)
    }

    fn set_input_map(&mut self, index: usize, map: &[i32]) -> Result<()> {
        self.inner.set_input_map(index, map)
    }

    fn set_input(&mut self, index: usize, input: &[i32]) -> Result<()> {
        self.inner.set_input(index, input)
    }

    fn set_output_map(&mut self, index: usize, map: &[i32]) -> Result<()> {
        self.inner.set_output_map(index, map)
    }

    fn get_output(&mut self, index: usize, output: &mut [i32]) -> Result<()> {
        self.inner.get_output(index, output)
    }

    fn update(&mut self) -> Result<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update()
    }
}

fn counting(size: usize, updates: &Arc<AtomicUsize>) -> Box<dyn Simulator> {
    Box::new(Counting {
        inner: Box::new(NoOpSimulator::new(size, 4, 2, 2)),
        updates: Arc::clone(updates),
    })
}

#[test]
fn test_composite_capacity_is_sum_of_members() {
    let updates = Arc::new(AtomicUsize::new(0));
    let composite =
        CompositeSimulator::new(vec![counting(3, &updates), counting(5, &updates)]).unwrap();
    assert_eq!(composite.size(), 8);

    let resolved: Vec<(usize, usize)> = (0..8).map(|i| composite.resolve(i).unwrap()).collect();
    let unique: HashSet<_> = resolved.iter().copied().collect();
    assert_eq!(unique.len(), 8);
    assert_eq!(
        resolved,
        vec![(0, 0), (1, 0), (0, 1), (1, 1), (0, 2), (1, 2), (1, 3), (1, 4)]
    );
    assert!(composite.resolve(8).is_err());
}

#[test]
fn test_composite_update_reaches_each_member_once() {
    let updates = Arc::new(AtomicUsize::new(0));
    let mut composite = CompositeSimulator::new(vec![
        counting(2, &updates),
        counting(2, &updates),
        counting(1, &updates),
    ])
    .unwrap();
    composite.update().unwrap();
    assert_eq!(updates.load(Ordering::SeqCst), 3);
    composite.update().unwrap();
    assert_eq!(updates.load(Ordering::SeqCst), 6);
}

#[test]
fn test_composite_routes_state_to_member_slot() {
    let updates = Arc::new(AtomicUsize::new(0));
    let mut composite =
        CompositeSimulator::new(vec![counting(2, &updates), counting(2, &updates)]).unwrap();
    for index in 0..4 {
        composite
            .set_state(index, &[index as i32 + 1, 0, 0, 0])
            .unwrap();
    }
    for index in 0..4 {
        let mut state = [0; 4];
        composite.get_state(index, &mut state).unwrap();
        assert_eq!(state[0], index as i32 + 1);
    }
}

#[test]
fn test_empty_composite_is_rejected() {
    assert!(CompositeSimulator::new(Vec::new()).is_err());
}

#[test]
fn test_bitwise_toggle_inverts_low_bits() {
    let model = DescriptorBuilder::new(toggle_cell_type(2)).build_model();
    let inner = InterpretedSimulator::new(&model, 1, 1, 1).unwrap();
    let mut sim = BitwiseSimulator::new(Box::new(inner), 8).unwrap();
    assert_eq!(sim.size(), 4);

    let values = [0x00, 0x5A, 0xFF, 0x81];
    for (index, &value) in values.iter().enumerate() {
        sim.set_state(index, &[value, value ^ 0x0F]).unwrap();
    }
    sim.update().unwrap();
    for (index, &value) in values.iter().enumerate() {
        let mut state = [0; 2];
        sim.get_state(index, &mut state).unwrap();
        assert_eq!(state, [!value & 0xFF, !(value ^ 0x0F) & 0xFF]);
    }
}

#[test]
fn test_factory_stack_holds_requested_automata() {
    let model = DescriptorBuilder::new(toggle_cell_type(4)).build_model();
    let config = SimulatorConfig {
        num_automata: 100,
        kind: SimulatorKind::NoOp,
        bits_per_entity: Some(4),
        members: 3,
        ..SimulatorConfig::default()
    };
    let sim = SimulatorFactory::create(&config, &model).unwrap();
    assert!(sim.size() >= 100);
    assert_eq!(sim.state_size(), model.state_size());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_bitwise_lanes_do_not_interfere(
        bits in prop::sample::select(vec![1u32, 2, 4, 8, 16]),
        writes in prop::collection::vec((0usize..64, any::<i32>()), 1..40),
    ) {
        let mut sim = BitwiseSimulator::new(Box::new(NoOpSimulator::new(2, 2, 1, 1)), bits).unwrap();
        let mask = (1i64 << bits) as i32;
        let mask = mask.wrapping_sub(1);
        let mut expected = vec![0; sim.size()];
        for (index, value) in writes {
            let index = index % sim.size();
            sim.set_state(index, &[value, 0]).unwrap();
            expected[index] = value & mask;
        }
        sim.update().unwrap();
        for (index, &value) in expected.iter().enumerate() {
            let mut state = [0; 2];
            sim.get_state(index, &mut state).unwrap();
            prop_assert_eq!(state[0], value);
        }
    }
}
