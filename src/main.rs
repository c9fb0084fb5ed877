//! Tribe Sim - headless runner
//!
//! Generates a world, advances it for a number of real seconds and prints
//! a summary, or the final snapshot, as JSON or text.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;

use tribe_sim::core::config::SimulationConfig;
use tribe_sim::core::error::Result;
use tribe_sim::simulation::{advance, GameOutcome, SimulationEvent};
use tribe_sim::tribe::tribe_leaders;
use tribe_sim::world::World;

#[derive(Parser, Debug)]
#[command(name = "tribe_sim")]
#[command(about = "Run a headless tribe simulation and report what happened")]
struct Args {
    /// TOML file overriding the default configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for world generation and every random decision
    #[arg(long)]
    seed: Option<u64>,

    /// Real seconds to simulate
    #[arg(long, default_value_t = 60.0)]
    seconds: f64,

    /// Founding tribes
    #[arg(long, default_value_t = 3)]
    tribes: usize,

    /// Output format (json or text)
    #[arg(long, default_value = "text")]
    format: String,

    /// Print the final world snapshot instead of the summary (json only)
    #[arg(long)]
    snapshot: bool,
}

#[derive(Serialize)]
struct RunSummary {
    seed: u64,
    game_hours: f64,
    day: u64,
    humans: usize,
    tribes: usize,
    births: u64,
    deaths: u64,
    game_over: bool,
    events: BTreeMap<&'static str, usize>,
}

fn event_name(event: &SimulationEvent) -> &'static str {
    match event {
        SimulationEvent::Birth { .. } => "birth",
        SimulationEvent::Death { .. } => "death",
        SimulationEvent::BuildingPlaced { .. } => "building_placed",
        SimulationEvent::BushPlanted { .. } => "bush_planted",
        SimulationEvent::LeaderSucceeded { .. } => "leader_succeeded",
        SimulationEvent::TribeMerged { .. } => "tribe_merged",
        SimulationEvent::TribeDissolved { .. } => "tribe_dissolved",
        SimulationEvent::SplitPhaseChanged { .. } => "split_phase_changed",
        SimulationEvent::SplitFailed { .. } => "split_failed",
        SimulationEvent::TribeSplit { .. } => "tribe_split",
        SimulationEvent::DiplomacyChanged { .. } => "diplomacy_changed",
        SimulationEvent::ObjectiveChanged { .. } => "objective_changed",
        SimulationEvent::GameOver { .. } => "game_over",
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tribe_sim=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    let seed = config.seed;

    let mut world = World::generate(config, args.tribes)?;
    tracing::info!(seconds = args.seconds, tribes = args.tribes, "simulation starting");

    // Advance in one-second slices so progress shows up in the log
    let mut events: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut elapsed = 0.0;
    while elapsed < args.seconds && !world.game_over {
        let slice = (args.seconds - elapsed).min(1.0);
        for event in advance(&mut world, slice) {
            if let SimulationEvent::GameOver {
                outcome: GameOutcome::Extinction { births, deaths },
                ..
            } = &event
            {
                tracing::warn!(births, deaths, "all humans died");
            }
            *events.entry(event_name(&event)).or_default() += 1;
        }
        elapsed += slice;
        tracing::debug!(
            hours = world.clock.now(),
            humans = world.living_humans(),
            "progress"
        );
    }

    if args.snapshot {
        println!("{}", world.snapshot(false).to_json()?);
        return Ok(());
    }

    let summary = RunSummary {
        seed,
        game_hours: world.clock.now(),
        day: world.clock.day(),
        humans: world.living_humans(),
        tribes: tribe_leaders(&world.entities).len(),
        births: world.births,
        deaths: world.deaths,
        game_over: world.game_over,
        events,
    };

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
        _ => {
            println!("=== TRIBE SIM ===");
            println!("Seed:       {}", summary.seed);
            println!("Game hours: {:.1} (day {})", summary.game_hours, summary.day);
            println!("Humans:     {}", summary.humans);
            println!("Tribes:     {}", summary.tribes);
            println!("Births:     {}", summary.births);
            println!("Deaths:     {}", summary.deaths);
            if summary.game_over {
                println!("Game over: every human has died");
            }
            for (name, count) in &summary.events {
                println!("  {:<20} {}", name, count);
            }
        }
    }
    Ok(())
}
