mod simulation;

use clap::Parser;
use simulation::{GenerationConfig, ScenarioPreset, SimConfig, SimSession, ALL_DIRECTIONS};

#[derive(Parser)]
#[command(name = "intersection_sim")]
#[command(about = "Signalized intersection simulation with adaptive phase timing")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "3000")]
    ticks: u32,

    /// Time delta per tick in seconds
    #[arg(long, default_value = "0.1")]
    delta: f32,

    /// Seed for deterministic runs; omitted means a random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Fixed spawn interval in seconds; enables manual generation mode
    #[arg(long)]
    manual_interval: Option<f32>,

    /// Pre-load every approach with a traffic preset: smooth, normal or
    /// congested
    #[arg(long)]
    scenario: Option<ScenarioPreset>,

    /// Seconds of simulated time between state summaries
    #[arg(long, default_value = "10.0")]
    summary_every: f32,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = SimConfig::default();
    if let Some(interval) = cli.manual_interval {
        config.generation = GenerationConfig::manual(interval);
    }

    let mut session = match cli.seed {
        Some(seed) => SimSession::with_seed(config, seed),
        None => SimSession::new(config),
    };

    println!(
        "Running intersection simulation: {} ticks at {}s per tick",
        cli.ticks, cli.delta
    );
    session.start();
    if let Some(preset) = cli.scenario {
        for direction in ALL_DIRECTIONS {
            session.apply_scenario(direction, preset);
        }
    }

    let mut next_summary = cli.summary_every;
    for _ in 0..cli.ticks {
        session.tick(cli.delta);
        if session.sim_time() >= next_summary {
            next_summary += cli.summary_every;
            session.log_summary();
        }
    }

    session.stop();
    println!("=== Final State ===");
    session.log_summary();
    let stats = session.generation_stats();
    println!(
        "Spawned {} vehicles, completed {}, {} still on the road",
        stats.total,
        session.completed_count(),
        session.live_vehicle_count()
    );
}
