use clap::Parser;
use fire_spread_core::{
    ComponentData, DifficultyMode, FireSpreadEngine, HandleAllocator, ObjectHandle, SpreadConfig,
    Vec3,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Fire spread engine demo with configurable parameters
#[derive(Parser, Debug)]
#[command(name = "fire-spread-demo")]
#[command(about = "Headless fire spread engine demo", long_about = None)]
struct Args {
    /// Simulation duration in seconds
    #[arg(short, long, default_value_t = 60.0)]
    duration: f32,

    /// Tick length in seconds
    #[arg(long, default_value_t = 0.1)]
    tick: f32,

    /// JSON file with a spread config (missing fields take defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Difficulty preset (easy, normal, hard)
    #[arg(long)]
    difficulty: Option<String>,

    /// Override the fire energy multiplier
    #[arg(long)]
    multiplier: Option<f32>,

    /// Map size in meters (square map)
    #[arg(long, default_value_t = 200.0)]
    map_size: f32,

    /// Spacing of the ground cover grid in meters
    #[arg(long, default_value_t = 4.0)]
    spacing: f32,

    /// Number of crates that explode when they burn out
    #[arg(long, default_value_t = 10)]
    num_crates: u32,

    /// Random seed for the scene layout
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Report interval in seconds
    #[arg(short, long, default_value_t = 5.0)]
    report_interval: f32,

    /// Collect debug lines and report how many were produced
    #[arg(long)]
    debug_lines: bool,

    /// Print the effective config as JSON and exit
    #[arg(long)]
    print_config: bool,

    /// Run validation checks instead of the scene
    #[arg(short, long)]
    validate: bool,
}

/// What a scene object does once it catches fire
#[derive(Debug, Clone, Copy)]
struct Burnable {
    fire_energy: f32,
    hard_radius: f32,
    soft_radius: f32,
}

const GRASS: Burnable = Burnable {
    fire_energy: 60.0,
    hard_radius: 2.0,
    soft_radius: 6.0,
};

const CRATE: Burnable = Burnable {
    fire_energy: 200.0,
    hard_radius: 3.0,
    soft_radius: 10.0,
};

struct Scene {
    handles: HandleAllocator,
    objects: Vec<(ObjectHandle, Burnable)>,
}

fn load_config(args: &Args) -> Result<SpreadConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)?;
            let config: SpreadConfig = serde_json::from_str(&text)?;
            info!(path = %path.display(), "Loaded spread config");
            config
        }
        None => SpreadConfig {
            explosion_threshold: Some(4000.0),
            ..Default::default()
        },
    };

    if let Some(name) = &args.difficulty {
        match DifficultyMode::from_name(name) {
            Some(mode) => mode.apply_to_config(&mut config),
            None => warn!(name = %name, "Unknown difficulty, keeping config multipliers"),
        }
    }
    if let Some(multiplier) = args.multiplier {
        config.fire_energy_multiplier = multiplier;
    }

    config.validate()?;
    Ok(config)
}

fn build_scene(engine: &mut FireSpreadEngine, args: &Args) -> Scene {
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut scene = Scene {
        handles: HandleAllocator::new(),
        objects: Vec::new(),
    };

    let half_size = args.map_size / 2.0;
    let steps = (args.map_size / args.spacing).ceil() as i32;
    for x in 0..=steps {
        for y in 0..=steps {
            let position = Vec3::new(
                x as f32 * args.spacing - half_size + rng.random_range(-0.5..0.5),
                y as f32 * args.spacing - half_size + rng.random_range(-0.5..0.5),
                0.0,
            );
            let owner = scene.handles.allocate();
            *engine.add_new_component_data(owner) = ComponentData::receiver(owner, position)
                .with_resistance(rng.random_range(0.0..5.0))
                .with_cooling(rng.random_range(0.0..10.0));
            scene.objects.push((owner, GRASS));
        }
    }

    for _ in 0..args.num_crates {
        let position = Vec3::new(
            rng.random_range(-half_size..half_size),
            rng.random_range(-half_size..half_size),
            0.5,
        );
        let owner = scene.handles.allocate();
        *engine.add_new_component_data(owner) =
            ComponentData::receiver(owner, position).with_resistance(20.0);
        scene.objects.push((owner, CRATE));
    }

    // Light the ground at the origin
    let ignition = scene.handles.allocate();
    *engine.add_new_component_data(ignition) = ComponentData::sender(
        ignition,
        Vec3::zeros(),
        CRATE.fire_energy * 2.0,
        CRATE.hard_radius,
        CRATE.soft_radius,
    )
    .with_receiver(false);
    scene.objects.push((ignition, CRATE));

    scene
}

/// Game-side reaction to a fetched result: burning objects start sending,
/// destroyed ones are removed from the world.
fn react(engine: &mut FireSpreadEngine, scene: &mut Scene) -> usize {
    let mut removed = 0;
    let mut i = 0;
    while i < scene.objects.len() {
        let (owner, burnable) = scene.objects[i];
        let Some(record) = engine.component_data_mut(owner) else {
            i += 1;
            continue;
        };

        if record.is_destroyed {
            engine.invalidate_component(owner);
            scene.handles.release(owner);
            scene.objects.swap_remove(i);
            removed += 1;
            continue;
        }
        if record.is_burning && !record.is_fire_sender {
            record.is_fire_sender = true;
            record.fire_energy = burnable.fire_energy;
            record.hard_radius = burnable.hard_radius;
            record.soft_radius = burnable.soft_radius;
        }
        i += 1;
    }
    removed
}

fn run_scene(args: &Args, config: SpreadConfig) -> Result<(), Box<dyn Error>> {
    let mut engine = FireSpreadEngine::new(config)?;
    engine.set_debug_active(args.debug_lines);
    let mut scene = build_scene(&mut engine, args);

    println!("Scene: {} objects on a {:.0}m map", scene.objects.len(), args.map_size);
    println!("\nTime(s) | Burning | Destroyed | Exploded | Removed | Pass(us) | Lines");
    println!("--------|---------|-----------|----------|---------|----------|------");

    let started = Instant::now();
    let mut time = 0.0;
    let mut next_report = 0.0;
    let mut removed_total = 0;
    let mut exploded_total = 0;
    let mut destroyed_total = 0;
    let mut ticks = 0_u32;

    while time < args.duration {
        let result = engine.get_calculation_result();
        let burning = result.iter().filter(|r| r.is_burning).count();

        exploded_total += engine.last_summary().exploded;
        destroyed_total += engine.last_summary().destroyed;
        removed_total += react(&mut engine, &mut scene);
        engine.prepare_next_calculation_run();
        engine.start_next_calculation_run(args.tick)?;

        if time >= next_report {
            println!(
                "{:7.1} | {:7} | {:9} | {:8} | {:7} | {:8} | {:5}",
                time,
                burning,
                destroyed_total,
                exploded_total,
                removed_total,
                engine.get_calculation_time(),
                engine.get_debug_draw_requests().len()
            );
            next_report += args.report_interval;
        }

        time += args.tick;
        ticks += 1;
        if burning == 0 && ticks > 1 && engine.last_summary().senders == 0 {
            info!(time, "Fire burned out");
            break;
        }
    }
    engine.get_calculation_result();
    engine.stop_calculation();

    println!("\n=== Simulation Complete ===");
    println!("Simulated time: {:.1}s over {} ticks", time, ticks);
    println!("Wall time: {:.2}s", started.elapsed().as_secs_f32());
    println!("Average pass: {}us", engine.average_calculation_time());
    println!("Objects destroyed: {}", destroyed_total);
    println!("Objects exploded: {}", exploded_total);
    println!("Objects left standing: {}", scene.objects.len());
    Ok(())
}

fn run_validation_tests(config: &SpreadConfig) -> Result<(), Box<dyn Error>> {
    println!("\n=== Running Validation Tests ===\n");

    // Test 1: Hard radius
    println!("Test 1: Full transfer inside hard radius");
    let energy = single_transfer(config, 1.0, 0.0)?;
    let expected = 10.0 * config.fire_energy_multiplier;
    println!("  Receiver energy: {:.2} (expected {:.2})", energy, expected);
    report((energy - expected).abs() < 1e-3);

    // Test 2: Soft radius
    println!("\nTest 2: Nothing beyond soft radius");
    let energy = single_transfer(config, 8.0, 0.0)?;
    println!("  Receiver energy: {:.2}", energy);
    report(energy == 0.0);

    // Test 3: Resistance
    println!("\nTest 3: Resistance negates a small transfer");
    let energy = single_transfer(config, 1.0, 1000.0)?;
    println!("  Receiver energy: {:.2}", energy);
    report(energy == 0.0);

    println!("\n=== Validation Complete ===");
    Ok(())
}

/// Energy one receiver gets in one second from a 10/s sender with radii 2 and 5
fn single_transfer(config: &SpreadConfig, distance: f32, resistance: f32) -> Result<f32, Box<dyn Error>> {
    let mut engine = FireSpreadEngine::new(config.clone())?;
    let mut handles = HandleAllocator::new();
    let sender = handles.allocate();
    let receiver = handles.allocate();
    *engine.add_new_component_data(sender) =
        ComponentData::sender(sender, Vec3::zeros(), 10.0, 2.0, 5.0).with_receiver(false);
    *engine.add_new_component_data(receiver) =
        ComponentData::receiver(receiver, Vec3::new(distance, 0.0, 0.0)).with_resistance(resistance);

    engine.start_next_calculation_run(1.0)?;
    let energy = engine
        .get_calculation_result()
        .iter()
        .find(|r| r.owner == Some(receiver))
        .map_or(0.0, |r| r.calculated_spread_energy);
    Ok(energy)
}

fn report(pass: bool) {
    if pass {
        println!("  PASS");
    } else {
        println!("  FAIL");
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("=== Fire Spread Demo ===\n");
    println!(
        "Multiplier: {:.2}, Cooling: {:.2}, Ignition: {:.0}, Destruction: {:.0}",
        config.fire_energy_multiplier,
        config.cooling_multiplier,
        config.ignition_threshold,
        config.destruction_threshold
    );

    if args.validate {
        return run_validation_tests(&config);
    }
    run_scene(&args, config)
}
