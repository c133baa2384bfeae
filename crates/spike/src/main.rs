use std::path::PathBuf;

use anyhow::Context;
use scenario_core::generator::control_length;
use scenario_core::geometry::{distance, turn_angle};
use scenario_core::{Evaluator, GeneratorConfig, Individual, Population};
use tracing_subscriber::EnvFilter;

const CYCLES: usize = 20;

/// Stand-in for the simulator: short, gently turning routes score best.
struct RouteEvaluator;

impl Evaluator for RouteEvaluator {
    fn evaluate(&mut self, individual: &Individual) -> f64 {
        let waypoints = individual
            .scenario
            .as_ref()
            .and_then(|s| s.ego())
            .map(|ego| ego.waypoints.iter().map(|w| w.position).collect::<Vec<_>>())
            .unwrap_or_default();
        if waypoints.len() < 3 {
            return control_length(individual);
        }
        let length: f64 = waypoints.windows(2).map(|w| distance(w[0], w[1])).sum();
        let turning: f64 = waypoints
            .windows(3)
            .map(|w| (turn_angle(w[0], w[1], w[2]) - 180.0).abs())
            .sum();
        length / 100.0 + turning / 90.0
    }
}

fn load_config() -> anyhow::Result<GeneratorConfig> {
    let Some(path) = std::env::args().nth(1).map(PathBuf::from) else {
        return Ok(GeneratorConfig::default());
    };
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scenario_core=info")),
        )
        .init();

    if cfg!(debug_assertions) {
        eprintln!("WARNING: running in debug mode. Timings are not representative.");
        eprintln!("         Use: cargo run -p scenario-spike --release");
        eprintln!();
    }

    let config = load_config()?;
    println!("=== Scenario Generator Spike ===");
    println!(
        "Population: {}, elites: {}, cycles: {CYCLES}, seed: {}",
        config.population_size, config.number_elites, config.seed
    );
    println!();

    let mut population = Population::new(config)?;
    let mut evaluator = RouteEvaluator;

    let mut total_ranking = 0u64;
    let mut total_mutation = 0u64;
    let mut total_derivation = 0u64;
    let mut total_time = 0u64;

    for cycle in 0..CYCLES {
        population.evaluate_with(&mut evaluator)?;
        let timings = population.evolve()?;
        total_ranking += timings.ranking_us;
        total_mutation += timings.mutation_us;
        total_derivation += timings.derivation_us;
        total_time += timings.total_us;

        let best = population.best().map_or(f64::NAN, |b| b.fitness);
        println!(
            "--- cycle {cycle:>3}: {} us, best fitness {best:.3} ---",
            timings.total_us
        );
    }

    population.evaluate_with(&mut evaluator)?;
    let avg_cycle_us = total_time as f64 / CYCLES as f64;
    println!();
    println!("  Avg cycle:     {avg_cycle_us:.0} us");
    println!(
        "  Breakdown:     ranking={:.0} us, mutation={:.0} us, derivation={:.0} us",
        total_ranking as f64 / CYCLES as f64,
        total_mutation as f64 / CYCLES as f64,
        total_derivation as f64 / CYCLES as f64,
    );
    if let Some(best) = population.best() {
        let scenario = best.scenario.as_ref();
        println!(
            "  Best:          fitness={:.3}, roads={}, intersections={}, obstacles={}, parked cars={}",
            best.fitness,
            best.roads.len(),
            best.intersections.len(),
            scenario.map_or(0, |s| s.obstacles.len()),
            scenario.map_or(0, |s| s.parked_cars.len()),
        );
    }
    Ok(())
}
