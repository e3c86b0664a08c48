use clap::Parser;

use converging_paths::batch_simulation::BatchSimulation;
use converging_paths::config::Config;
use converging_paths::simulation::Simulation;

fn main() {
    let config = Config::parse();

    let default_filter = if config.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    println!("Starting converging path simulation...");
    println!("Grid size: {}x{}", config.grid_size, config.grid_size);
    println!(
        "Walls: {}, Obstacles per drop: {}, Agents: {}",
        config.num_walls, config.num_obstacles, config.num_agents
    );
    println!(
        "Movement: {}",
        if config.diagonal { "8-connected" } else { "4-connected" }
    );

    if config.no_visualization || config.batch_mode {
        println!("Visualization disabled - running in fast mode");
    } else {
        println!("Visualization enabled with {}ms delay", config.delay_ms);
        println!("Press Ctrl+C to stop the simulation");
    }
    println!();

    if config.batch_mode {
        let mut batch_sim = BatchSimulation::new(config.clone());
        match batch_sim.run() {
            Ok(()) => {
                if !config.quiet {
                    batch_sim.print_summary();
                }
            }
            Err(e) => {
                eprintln!("Batch simulation failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let result = Simulation::new(config).and_then(|mut simulation| simulation.run());
    match result {
        Ok((stats, timing)) => {
            println!("\n=== FINAL RESULTS ===");
            println!("{}", stats);
            println!("=== TIMING ANALYSIS ===");
            println!("{}", timing);
        }
        Err(e) => {
            eprintln!("Simulation failed: {}", e);
            std::process::exit(1);
        }
    }
}
