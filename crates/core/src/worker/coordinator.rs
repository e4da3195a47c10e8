//! The fire spread engine: registry, result buffer and worker thread.
//!
//! The caller's tick drives a fixed cycle:
//!
//! 1. [`FireSpreadEngine::get_calculation_result`] fetches the previous run
//!    (blocking only while it is still computing) and merges it into the
//!    registry.
//! 2. Game logic adds, edits and invalidates records.
//! 3. [`FireSpreadEngine::prepare_next_calculation_run`] drops dead records.
//! 4. [`FireSpreadEngine::start_next_calculation_run`] hands a snapshot to the
//!    worker and returns immediately.
//!
//! At most one run is in flight. The snapshot and the result buffer are moved
//! between the threads whole under the mutex, so the caller never sees a
//! partly written result.

use crate::core_types::{ComponentData, ComponentDataRegistry, ObjectHandle, SpatialIndex, SpatialLookup};
use crate::error::SpreadError;
use crate::profiler::{PassTimer, ProfilerScope};
use crate::spread::{
    DebugLineRecord, DebugRequestCollector, DifficultyMode, PassSummary, SpreadCalculator,
    SpreadConfig,
};
use crate::worker::state::WorkerPhase;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Name of the background calculation thread
pub const WORKER_THREAD_NAME: &str = "fire-spread-worker";

/// One run handed to the worker
struct Job {
    records: Vec<ComponentData>,
    seconds_passed: f32,
    config: SpreadConfig,
    debug: bool,
}

/// What the worker hands back after a successful pass
struct PassOutput {
    records: Vec<ComponentData>,
    debug_lines: Option<Vec<DebugLineRecord>>,
    elapsed: Duration,
    seconds_passed: f32,
    summary: PassSummary,
}

/// State shared with the worker, only touched under the mutex
struct Shared {
    phase: WorkerPhase,
    running: bool,
    job: Option<Job>,
    /// `None` after a failed pass
    output: Option<PassOutput>,
}

type SharedState = Arc<(Mutex<Shared>, Condvar)>;

fn lock_shared(lock: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Multi-threaded fire spread engine.
///
/// Owns the record registry used to prepare the next pass, the last fetched
/// result and the worker thread running [`SpreadCalculator`] passes.
pub struct FireSpreadEngine<S: SpatialLookup + 'static = SpatialIndex> {
    config: SpreadConfig,
    registry: ComponentDataRegistry,
    shared: SharedState,
    worker: Option<JoinHandle<()>>,
    /// Moved onto the worker when it is spawned
    lookup: Option<S>,
    result: Vec<ComponentData>,
    staging: Vec<ComponentData>,
    debug_active: bool,
    debug_lines: Vec<DebugLineRecord>,
    timer: PassTimer,
    time_passed: Duration,
    last_summary: PassSummary,
}

impl FireSpreadEngine<SpatialIndex> {
    /// Engine using the default hash grid lookup.
    ///
    /// # Errors
    ///
    /// Returns [`SpreadError::InvalidConfig`] if `config` does not validate.
    pub fn new(config: SpreadConfig) -> Result<Self, SpreadError> {
        let lookup = SpatialIndex::new(config.spatial_cell_size);
        Self::with_lookup(config, lookup)
    }
}

impl<S: SpatialLookup + 'static> FireSpreadEngine<S> {
    /// Engine using a caller-supplied spatial lookup.
    ///
    /// The worker thread is not spawned until the first run is started.
    ///
    /// # Errors
    ///
    /// Returns [`SpreadError::InvalidConfig`] if `config` does not validate.
    pub fn with_lookup(config: SpreadConfig, lookup: S) -> Result<Self, SpreadError> {
        config.validate()?;
        Ok(Self {
            config,
            registry: ComponentDataRegistry::new(),
            shared: Arc::new((
                Mutex::new(Shared {
                    phase: WorkerPhase::Idle,
                    running: true,
                    job: None,
                    output: None,
                }),
                Condvar::new(),
            )),
            worker: None,
            lookup: Some(lookup),
            result: Vec::new(),
            staging: Vec::new(),
            debug_active: false,
            debug_lines: Vec::new(),
            timer: PassTimer::new(),
            time_passed: Duration::ZERO,
            last_summary: PassSummary::default(),
        })
    }

    /// Append a fresh record for `owner` to the registry for the next run.
    ///
    /// Never touches the snapshot a running pass works on.
    pub fn add_new_component_data(&mut self, owner: ObjectHandle) -> &mut ComponentData {
        self.registry.add_new(owner)
    }

    pub fn component_data_mut(&mut self, owner: ObjectHandle) -> Option<&mut ComponentData> {
        self.registry.get_mut(owner)
    }

    /// Mark `owner`'s record dead. It is excluded from every later run.
    pub fn invalidate_component(&mut self, owner: ObjectHandle) -> bool {
        self.registry.invalidate(owner)
    }

    /// Drop records whose owner is gone. Returns how many were dropped.
    pub fn prepare_next_calculation_run(&mut self) -> usize {
        let pruned = self.registry.prune_invalid();
        if pruned > 0 {
            debug!(pruned, remaining = self.registry.len(), "Pruned invalid component data");
        }
        pruned
    }

    /// Hand a snapshot of the registry to the worker and return immediately.
    ///
    /// # Errors
    ///
    /// - [`SpreadError::Stopped`] after [`FireSpreadEngine::stop_calculation`]
    /// - [`SpreadError::RunInFlight`] while the previous run is computing
    /// - [`SpreadError::ResultNotFetched`] if the previous result was not fetched
    /// - [`SpreadError::InvalidTimeStep`] for a negative or non-finite time
    /// - [`SpreadError::WorkerSpawn`] if the worker thread cannot be created
    pub fn start_next_calculation_run(&mut self, seconds_passed: f32) -> Result<(), SpreadError> {
        let phase = self.phase();
        if !phase.accepts_start() {
            let err = match phase {
                WorkerPhase::Computing => SpreadError::RunInFlight,
                WorkerPhase::ResultReady => SpreadError::ResultNotFetched,
                _ => SpreadError::Stopped,
            };
            return Err(contract_violation(err));
        }
        if !seconds_passed.is_finite() || seconds_passed < 0.0 {
            return Err(contract_violation(SpreadError::InvalidTimeStep(seconds_passed)));
        }

        if self.worker.is_none() {
            self.spawn_worker()?;
        }

        self.registry.take_snapshot(&mut self.staging);
        let job = Job {
            records: std::mem::take(&mut self.staging),
            seconds_passed,
            config: self.config.clone(),
            debug: self.debug_active,
        };

        let (lock, signal) = &*self.shared;
        let mut state = lock_shared(lock);
        state.job = Some(job);
        state.phase = WorkerPhase::Computing;
        signal.notify_all();
        Ok(())
    }

    /// Result of the most recent completed run.
    ///
    /// Blocks while a run is computing. A freshly completed result is merged
    /// into the registry before it is returned. After a failed pass the
    /// previous result is returned again.
    pub fn get_calculation_result(&mut self) -> &[ComponentData] {
        let started = Instant::now();
        let (lock, signal) = &*self.shared;
        let mut state = lock_shared(lock);
        let mut blocked = false;
        while state.phase == WorkerPhase::Computing {
            blocked = true;
            state = signal.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
        if state.phase != WorkerPhase::ResultReady {
            return &self.result;
        }
        let output = state.output.take();
        state.phase = WorkerPhase::Armed;
        drop(state);

        let waited = started.elapsed();
        if blocked && waited > Duration::from_millis(self.config.slow_pass_warning_ms) {
            warn!(
                waited_ms = waited.as_millis(),
                limit_ms = self.config.slow_pass_warning_ms,
                "Calculation result was late; the tick is shorter than a spread pass"
            );
        }

        match output {
            Some(output) => {
                self.registry.apply_result(&output.records);
                self.staging = std::mem::replace(&mut self.result, output.records);
                self.staging.clear();
                self.timer.record(output.elapsed);
                self.time_passed = Duration::try_from_secs_f32(output.seconds_passed).unwrap_or_default();
                self.last_summary = output.summary;
                match output.debug_lines {
                    Some(lines) => self.debug_lines = lines,
                    None => self.debug_lines.clear(),
                }
            }
            None => warn!("Calculation pass failed; keeping the previous result"),
        }
        &self.result
    }

    /// Stop and join the worker. Waits for a running pass to finish first.
    ///
    /// Safe to call repeatedly and before any run was started.
    pub fn stop_calculation(&mut self) {
        {
            let (lock, signal) = &*self.shared;
            let mut state = lock_shared(lock);
            if state.phase == WorkerPhase::Stopped {
                return;
            }
            state.running = false;
            signal.notify_all();
        }

        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!("Calculation worker terminated abnormally");
            }
        }

        let (lock, _) = &*self.shared;
        let mut state = lock_shared(lock);
        state.phase = WorkerPhase::Stopped;
        state.job = None;
        state.output = None;
        drop(state);
        self.lookup = None;
        info!(passes = self.timer.passes(), "Fire spread worker stopped");
    }

    /// Turn debug line collection on or off for subsequent runs.
    ///
    /// Turning it off drops the current lines.
    pub fn set_debug_active(&mut self, active: bool) {
        self.debug_active = active;
        if !active {
            self.debug_lines.clear();
        }
    }

    pub fn is_debug_active(&self) -> bool {
        self.debug_active
    }

    /// Debug lines of the last fetched run
    pub fn get_debug_draw_requests(&self) -> &[DebugLineRecord] {
        &self.debug_lines
    }

    /// Wall-clock duration of the last completed pass in microseconds
    pub fn get_calculation_time(&self) -> u64 {
        self.timer.last_us()
    }

    pub fn average_calculation_time(&self) -> u64 {
        self.timer.average_us()
    }

    /// Simulated time covered by the last completed pass
    pub fn get_time_passed(&self) -> Duration {
        self.time_passed
    }

    pub fn last_summary(&self) -> PassSummary {
        self.last_summary
    }

    /// Scale every transfer from the next run on.
    ///
    /// # Errors
    ///
    /// Returns [`SpreadError::InvalidConfig`] for a negative or non-finite
    /// multiplier, leaving the current one in place.
    pub fn set_fire_energy_multiplier(&mut self, multiplier: f32) -> Result<(), SpreadError> {
        let config = SpreadConfig {
            fire_energy_multiplier: multiplier,
            ..self.config.clone()
        };
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn set_difficulty(&mut self, mode: DifficultyMode) {
        mode.apply_to_config(&mut self.config);
        info!(?mode, "Difficulty changed");
    }

    pub fn config(&self) -> &SpreadConfig {
        &self.config
    }

    pub fn phase(&self) -> WorkerPhase {
        let (lock, _) = &*self.shared;
        lock_shared(lock).phase
    }

    pub fn registry(&self) -> &ComponentDataRegistry {
        &self.registry
    }

    fn spawn_worker(&mut self) -> Result<(), SpreadError> {
        let Some(lookup) = self.lookup.take() else {
            return Err(contract_violation(SpreadError::Stopped));
        };
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || worker_loop(&shared, lookup));

        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                info!(thread = WORKER_THREAD_NAME, "Fire spread worker started");
                Ok(())
            }
            Err(err) => {
                error!(%err, "Failed to spawn fire spread worker");
                let (lock, _) = &*self.shared;
                lock_shared(lock).phase = WorkerPhase::Stopped;
                Err(SpreadError::WorkerSpawn(err))
            }
        }
    }
}

impl<S: SpatialLookup + 'static> Drop for FireSpreadEngine<S> {
    fn drop(&mut self) {
        self.stop_calculation();
    }
}

fn contract_violation(err: SpreadError) -> SpreadError {
    error!(%err, "Fire spread engine misuse");
    err
}

fn worker_loop<S: SpatialLookup>(shared: &SharedState, mut lookup: S) {
    let (lock, signal) = &**shared;
    let mut calculator = SpreadCalculator::default();

    loop {
        let job = {
            let mut state = lock_shared(lock);
            while state.running && state.job.is_none() {
                state = signal.wait(state).unwrap_or_else(PoisonError::into_inner);
            }
            if !state.running {
                break;
            }
            let Some(job) = state.job.take() else {
                continue;
            };
            job
        };

        let output = run_pass(&mut calculator, &mut lookup, job);

        let mut state = lock_shared(lock);
        state.output = output;
        state.phase = WorkerPhase::ResultReady;
        signal.notify_all();
    }
    debug!("Fire spread worker exiting");
}

/// Run one pass, turning a panic into `None`
fn run_pass<S: SpatialLookup>(
    calculator: &mut SpreadCalculator,
    lookup: &mut S,
    job: Job,
) -> Option<PassOutput> {
    let Job {
        mut records,
        seconds_passed,
        config,
        debug,
    } = job;
    let mut collector = debug.then(|| DebugRequestCollector::new(config.debug_min_energy));
    calculator.set_config(config);

    let scope = ProfilerScope::new("spread_pass");
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        calculator.calculate(&mut records, &mut *lookup, seconds_passed, collector.as_mut())
    }));
    let elapsed = scope.elapsed();

    match outcome {
        Ok(summary) => Some(PassOutput {
            records,
            debug_lines: collector.map(|mut c| c.take_lines()),
            elapsed,
            seconds_passed,
            summary,
        }),
        Err(payload) => {
            error!(reason = panic_message(payload.as_ref()), "Spread pass panicked");
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}
