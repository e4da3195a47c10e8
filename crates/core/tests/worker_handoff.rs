//! Tick protocol and double-buffer handoff with the worker thread

use fire_spread_core::{
    ComponentData, FireSpreadEngine, HandleAllocator, ObjectHandle, SpatialIndex, SpatialLookup,
    SpreadConfig, SpreadError, Vec3, WorkerPhase,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Grid lookup that can be told to panic or to stall
struct Faulty {
    inner: SpatialIndex,
    panic: Arc<AtomicBool>,
    stall: Duration,
}

impl Faulty {
    fn new(panic: Arc<AtomicBool>, stall: Duration) -> Self {
        Self {
            inner: SpatialIndex::new(4.0),
            panic,
            stall,
        }
    }
}

impl SpatialLookup for Faulty {
    fn rebuild(&mut self, records: &[ComponentData]) {
        thread::sleep(self.stall);
        self.inner.rebuild(records);
    }

    fn find_nearby(&self, center: Vec3, radius: f32, out: &mut Vec<usize>) {
        if self.panic.load(Ordering::SeqCst) {
            panic!("lookup failure injected by test");
        }
        self.inner.find_nearby(center, radius, out);
    }
}

fn populate<S: SpatialLookup>(engine: &mut FireSpreadEngine<S>) -> (ObjectHandle, ObjectHandle) {
    let sender = ObjectHandle::new(0, 0);
    let receiver = ObjectHandle::new(1, 0);
    *engine.add_new_component_data(sender) =
        ComponentData::sender(sender, Vec3::zeros(), 10.0, 2.0, 5.0).with_receiver(false);
    *engine.add_new_component_data(receiver) = ComponentData::receiver(receiver, Vec3::x());
    (sender, receiver)
}

#[test]
fn test_phase_transitions() {
    let mut engine = FireSpreadEngine::new(SpreadConfig::default()).unwrap();
    populate(&mut engine);
    assert_eq!(engine.phase(), WorkerPhase::Idle);

    engine.start_next_calculation_run(1.0).unwrap();
    assert!(matches!(
        engine.phase(),
        WorkerPhase::Computing | WorkerPhase::ResultReady
    ));
    assert_eq!(engine.get_calculation_result().len(), 2);
    assert_eq!(engine.phase(), WorkerPhase::Armed);

    // Fetching again without a new run returns the same buffer
    assert_eq!(engine.get_calculation_result().len(), 2);
    assert_eq!(engine.phase(), WorkerPhase::Armed);

    engine.stop_calculation();
    assert_eq!(engine.phase(), WorkerPhase::Stopped);
    assert!(matches!(
        engine.start_next_calculation_run(1.0),
        Err(SpreadError::Stopped)
    ));
    assert_eq!(engine.get_calculation_result().len(), 2);
}

#[test]
fn test_one_run_in_flight() {
    let panic = Arc::new(AtomicBool::new(false));
    let lookup = Faulty::new(panic, Duration::from_millis(100));
    let mut engine = FireSpreadEngine::with_lookup(SpreadConfig::default(), lookup).unwrap();
    populate(&mut engine);

    engine.start_next_calculation_run(1.0).unwrap();
    assert_eq!(engine.phase(), WorkerPhase::Computing);
    let err = engine.start_next_calculation_run(1.0).unwrap_err();
    assert!(matches!(err, SpreadError::RunInFlight));
    assert!(err.is_contract_violation());

    // Blocks until the stalled pass is done
    let result = engine.get_calculation_result();
    assert_eq!(result[1].calculated_spread_energy, 10.0);
}

#[test]
fn test_unfetched_result_blocks_next_run() {
    let mut engine = FireSpreadEngine::new(SpreadConfig::default()).unwrap();
    populate(&mut engine);
    engine.start_next_calculation_run(1.0).unwrap();

    while engine.phase() == WorkerPhase::Computing {
        thread::sleep(Duration::from_millis(1));
    }
    assert!(matches!(
        engine.start_next_calculation_run(1.0),
        Err(SpreadError::ResultNotFetched)
    ));
    engine.get_calculation_result();
    engine.start_next_calculation_run(1.0).unwrap();
}

#[test]
fn test_invalid_time_step_leaves_state_alone() {
    let mut engine = FireSpreadEngine::new(SpreadConfig::default()).unwrap();
    for seconds in [-1.0, f32::NAN, f32::INFINITY] {
        assert!(matches!(
            engine.start_next_calculation_run(seconds),
            Err(SpreadError::InvalidTimeStep(_))
        ));
    }
    assert_eq!(engine.phase(), WorkerPhase::Idle);
    engine.start_next_calculation_run(0.0).unwrap();
}

#[test]
fn test_stop_is_idempotent() {
    let mut engine = FireSpreadEngine::new(SpreadConfig::default()).unwrap();
    engine.stop_calculation();
    engine.stop_calculation();
    assert_eq!(engine.phase(), WorkerPhase::Stopped);

    let mut engine = FireSpreadEngine::new(SpreadConfig::default()).unwrap();
    populate(&mut engine);
    engine.start_next_calculation_run(1.0).unwrap();
    // Waits for the pass in flight
    engine.stop_calculation();
    engine.stop_calculation();
    assert_eq!(engine.phase(), WorkerPhase::Stopped);
}

#[test]
fn test_panicking_pass_keeps_previous_result() {
    let panic = Arc::new(AtomicBool::new(false));
    let lookup = Faulty::new(Arc::clone(&panic), Duration::ZERO);
    let mut engine = FireSpreadEngine::with_lookup(SpreadConfig::default(), lookup).unwrap();
    let (_, receiver) = populate(&mut engine);

    engine.start_next_calculation_run(1.0).unwrap();
    assert_eq!(engine.get_calculation_result()[1].calculated_spread_energy, 10.0);

    panic.store(true, Ordering::SeqCst);
    engine.prepare_next_calculation_run();
    engine.start_next_calculation_run(1.0).unwrap();
    let result = engine.get_calculation_result().to_vec();
    assert_eq!(result[1].calculated_spread_energy, 10.0);
    assert_eq!(engine.registry().get(receiver).unwrap().accumulated_energy, 10.0);
    assert_eq!(engine.phase(), WorkerPhase::Armed);

    // Worker survives and the next pass goes through
    panic.store(false, Ordering::SeqCst);
    engine.prepare_next_calculation_run();
    engine.start_next_calculation_run(1.0).unwrap();
    engine.get_calculation_result();
    assert_eq!(engine.registry().get(receiver).unwrap().accumulated_energy, 20.0);
}

#[test]
fn test_debug_lines_follow_debug_flag() {
    let mut engine = FireSpreadEngine::new(SpreadConfig::default()).unwrap();
    let (sender, receiver) = populate(&mut engine);

    engine.set_debug_active(true);
    engine.start_next_calculation_run(1.0).unwrap();
    engine.get_calculation_result();
    let lines = engine.get_debug_draw_requests();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].source, sender);
    assert_eq!(lines[0].target, receiver);
    assert_eq!(lines[0].fraction, 1.0);
    assert_eq!(lines[0].color, [1.0, 0.0, 0.0, 1.0]);

    engine.set_debug_active(false);
    assert!(engine.get_debug_draw_requests().is_empty());
    engine.start_next_calculation_run(1.0).unwrap();
    engine.get_calculation_result();
    assert!(engine.get_debug_draw_requests().is_empty());
}

#[test]
fn test_timing_reports_last_pass() {
    let panic = Arc::new(AtomicBool::new(false));
    let lookup = Faulty::new(panic, Duration::from_millis(5));
    let mut engine = FireSpreadEngine::with_lookup(SpreadConfig::default(), lookup).unwrap();
    populate(&mut engine);

    engine.start_next_calculation_run(0.25).unwrap();
    engine.get_calculation_result();
    assert!(engine.get_calculation_time() >= 5_000);
    assert_eq!(engine.get_time_passed(), Duration::from_millis(250));
}

#[test]
fn test_result_never_torn_under_random_interleavings() {
    let mut rng = StdRng::seed_from_u64(1234);
    let mut handles = HandleAllocator::new();
    let mut live: Vec<ObjectHandle> = Vec::new();
    let mut engine = FireSpreadEngine::new(SpreadConfig {
        spatial_cell_size: 4.0,
        ..Default::default()
    })
    .unwrap();

    let mut expected: Option<usize> = None;
    for tick in 0..1000 {
        // Edit the registry while the previous run may still be computing
        for _ in 0..rng.random_range(0..4) {
            let owner = handles.allocate();
            let position = Vec3::new(rng.random_range(-15.0..15.0), rng.random_range(-15.0..15.0), 0.0);
            *engine.add_new_component_data(owner) = if rng.random_bool(0.2) {
                ComponentData::sender(owner, position, rng.random_range(1.0..30.0), 1.0, 4.0)
            } else {
                ComponentData::receiver(owner, position)
            };
            live.push(owner);
        }
        if !live.is_empty() && rng.random_bool(0.3) {
            let owner = live.swap_remove(rng.random_range(0..live.len()));
            assert!(engine.invalidate_component(owner));
            assert!(handles.release(owner));
        }
        if rng.random_bool(0.5) {
            thread::yield_now();
        }

        let result = engine.get_calculation_result();
        assert_eq!(result.len(), expected.unwrap_or(0), "tick {tick}: torn result");
        let mut seen = FxHashSet::default();
        for record in result {
            let owner = record.owner.unwrap();
            assert!(seen.insert(owner), "tick {tick}: duplicate record for {owner}");
            assert!(record.calculated_spread_energy >= 0.0);
        }

        engine.prepare_next_calculation_run();
        assert_eq!(engine.registry().len(), live.len());
        expected = Some(live.len());
        engine.start_next_calculation_run(rng.random_range(0.0..0.1)).unwrap();
    }
    engine.stop_calculation();
}

#[test]
fn test_readded_record_ignores_in_flight_result() {
    let panic = Arc::new(AtomicBool::new(false));
    let lookup = Faulty::new(panic, Duration::from_millis(50));
    let mut engine = FireSpreadEngine::with_lookup(SpreadConfig::default(), lookup).unwrap();
    let (_, receiver) = populate(&mut engine);
    engine.get_calculation_result();
    engine.start_next_calculation_run(20.0).unwrap();

    // Game logic replaces the receiver while the pass runs
    *engine.add_new_component_data(receiver) =
        ComponentData::receiver(receiver, Vec3::new(100.0, 0.0, 0.0));

    let result = engine.get_calculation_result();
    let computed = result.iter().find(|r| r.owner == Some(receiver)).unwrap();
    assert!(computed.is_burning, "the in-flight pass still reports its own outcome");

    let fresh = engine.registry().get(receiver).unwrap();
    assert!(!fresh.is_burning);
    assert_eq!(fresh.accumulated_energy, 0.0);
    assert_eq!(fresh.source, None);
    assert_eq!(fresh.position, Some(Vec3::new(100.0, 0.0, 0.0)));

    // The next pass starts from the fresh record, out of the sender's reach
    engine.prepare_next_calculation_run();
    engine.start_next_calculation_run(1.0).unwrap();
    let result = engine.get_calculation_result();
    let next = result.iter().find(|r| r.owner == Some(receiver)).unwrap();
    assert!(!next.is_burning);
    assert_eq!(next.accumulated_energy, 0.0);
}
