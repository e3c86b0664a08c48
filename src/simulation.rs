use crate::agent::{Agent, StepOutcome};
use crate::algorithms::incremental::{build_tree, IncrementalPathfinder};
use crate::algorithms::reference::matches_reference;
use crate::config::Config;
use crate::error::{Result, SimulationError};
use crate::grid::{Cell, Connectivity, Grid, GridGraph, Position};
use crate::observer::LogObserver;
use crate::statistics::{Statistics, TimingData};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct ObstacleGroup {
    positions: Vec<Position>,
    cycles_remaining: usize,
}

#[derive(Debug, Clone)]
pub struct EnvironmentSetup {
    pub seed: u64,
    pub base_grid: Grid,
    pub target: Position,
    pub agent_starts: Vec<Position>,
    /// Candidate obstacle cells for each drop, in order.
    pub obstacle_timeline: Vec<Vec<Position>>,
    pub obstacle_cycle_interval: usize,
    pub obstacle_persistence_cycles: usize,
}

impl EnvironmentSetup {
    /// Generate a reproducible environment: walls, target, agent starts and
    /// the obstacle timeline all come from one seed.
    pub fn generate(config: &Config, seed: Option<u64>) -> Result<Self> {
        let seed = seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);

        let connectivity = if config.diagonal {
            Connectivity::Eight
        } else {
            Connectivity::Four
        };

        let base_grid = match &config.map {
            Some(path) => Grid::parse(&std::fs::read_to_string(path)?, connectivity)?,
            None => {
                let mut grid = Grid::new(config.grid_size, config.grid_size, connectivity);
                let mut walls_placed = 0;
                let mut attempts = 0;
                while walls_placed < config.num_walls && attempts < config.num_walls * 3 {
                    let pos = random_position(&mut rng, &grid);
                    if grid.contains(pos) && grid.set_wall(pos) {
                        walls_placed += 1;
                    }
                    attempts += 1;
                }
                grid
            }
        };

        let mut open: Vec<Position> = base_grid.open_positions().collect();
        if open.is_empty() {
            return Err(SimulationError::NoOpenCell);
        }
        open.shuffle(&mut rng);
        let target = open[0];
        let agent_starts: Vec<Position> = open
            .iter()
            .skip(1)
            .take(config.num_agents)
            .copied()
            .collect();

        // Obstacles persist across cycles, so a drop may land on a cell that
        // is already blocked; placement re-checks at run time.
        let max_cycles = config.ticks / config.obstacle_interval.max(1) + 1;
        let obstacle_timeline: Vec<Vec<Position>> = (0..max_cycles)
            .map(|_| {
                (0..config.num_obstacles)
                    .map(|_| random_position(&mut rng, &base_grid))
                    .filter(|&pos| pos != target && base_grid.contains(pos))
                    .collect()
            })
            .collect();

        log::info!(
            "generated environment: seed {}, target {:?}, {} open cells, {} obstacle cycles",
            seed,
            target,
            base_grid.node_count(),
            obstacle_timeline.len()
        );

        Ok(EnvironmentSetup {
            seed,
            base_grid,
            target,
            agent_starts,
            obstacle_timeline,
            obstacle_cycle_interval: config.obstacle_interval.max(1),
            obstacle_persistence_cycles: config.obstacle_lifetime.max(1),
        })
    }
}

fn random_position(rng: &mut StdRng, grid: &Grid) -> Position {
    Position {
        x: rng.gen_range(0..grid.width.max(1)),
        y: rng.gen_range(0..grid.height.max(1)),
    }
}

pub struct Simulation {
    engine: IncrementalPathfinder<Grid, (LogObserver, TimingData)>,
    agents: Vec<Agent>,
    config: Config,
    environment: EnvironmentSetup,
    active_obstacle_groups: Vec<ObstacleGroup>,
    cycles_since_last_obstacle: usize,
    current_obstacle_cycle: usize,
    stats: Statistics,
}

impl Simulation {
    pub fn new(config: Config) -> Result<Self> {
        let environment = EnvironmentSetup::generate(&config, config.seed)?;
        Self::new_with_environment(config, environment)
    }

    pub fn new_with_environment(config: Config, environment: EnvironmentSetup) -> Result<Self> {
        let mut engine = IncrementalPathfinder::with_observer(
            environment.base_grid.clone(),
            (LogObserver, TimingData::new()),
        );
        engine.generate_paths(environment.target)?;

        let agents: Vec<Agent> = environment
            .agent_starts
            .iter()
            .enumerate()
            .map(|(id, &start)| Agent::new(id, start))
            .collect();
        let stats = Statistics::new(agents.len());

        Ok(Simulation {
            engine,
            agents,
            config,
            environment,
            active_obstacle_groups: Vec::new(),
            cycles_since_last_obstacle: 0,
            current_obstacle_cycle: 0,
            stats,
        })
    }

    pub fn engine(&self) -> &IncrementalPathfinder<Grid, (LogObserver, TimingData)> {
        &self.engine
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn environment(&self) -> &EnvironmentSetup {
        &self.environment
    }

    pub fn run(&mut self) -> Result<(Statistics, TimingData)> {
        if !self.config.no_visualization {
            self.render(0);
        }

        for tick in 1..=self.config.ticks {
            if self.agents.iter().all(|agent| agent.arrived) {
                break;
            }
            self.stats.ticks = tick;

            self.update_obstacles_from_timeline();
            if self.config.verify {
                self.verify_tree(tick)?;
            }
            self.step_agents();

            if !self.config.no_visualization {
                self.render(tick);
            }
        }

        self.clear_all_obstacles();
        if self.config.verify {
            self.verify_tree(self.stats.ticks)?;
        }

        self.stats.agents_arrived = self.agents.iter().filter(|agent| agent.arrived).count();
        self.stats.total_moves = self.agents.iter().map(|agent| agent.moves).sum();
        self.stats.stalled_moves = self.agents.iter().map(|agent| agent.stalled).sum();

        if !self.config.quiet {
            println!("=== SIMULATION COMPLETE ===");
            println!(
                "Seed: {} | Target: ({}, {})",
                self.environment.seed, self.environment.target.x, self.environment.target.y
            );
        }

        Ok((self.stats.clone(), self.engine.observer().1.clone()))
    }

    fn step_agents(&mut self) {
        for agent in &mut self.agents {
            let start = Instant::now();
            let outcome = agent.step(&self.engine);
            self.engine
                .observer_mut()
                .1
                .find_path_times
                .push(start.elapsed());

            if outcome == StepOutcome::Stalled && !self.config.quiet {
                log::info!(
                    "agent {} has no route from ({}, {})",
                    agent.id,
                    agent.position.x,
                    agent.position.y
                );
            }
        }
    }

    /// Compare the repaired tree against a from-scratch rebuild and the
    /// `pathfinding` crate's costs.
    fn verify_tree(&mut self, tick: usize) -> Result<()> {
        let target = self.environment.target;
        let start = Instant::now();
        let (rebuilt, _) = build_tree(self.engine.grid(), target);
        self.engine
            .observer_mut()
            .1
            .rebuild_times
            .push(start.elapsed());

        self.stats.verification_checks += 1;
        let consistent = self.engine.tree() == Some(&rebuilt)
            && matches_reference(self.engine.grid(), &rebuilt);
        if !consistent {
            self.stats.verification_failures += 1;
            log::warn!("tick {}: repaired tree differs from a full rebuild", tick);
            return Err(SimulationError::VerificationFailed { tick });
        }
        Ok(())
    }

    /// Update obstacles using the pre-generated timeline
    fn update_obstacles_from_timeline(&mut self) {
        self.cycles_since_last_obstacle += 1;

        let mut expired = Vec::new();
        for group in &mut self.active_obstacle_groups {
            group.cycles_remaining = group.cycles_remaining.saturating_sub(1);
            if group.cycles_remaining == 0 {
                expired.extend(group.positions.iter().copied());
            }
        }
        self.active_obstacle_groups
            .retain(|group| group.cycles_remaining > 0);
        self.stats.obstacles_removed += self.engine.remove_obstacles(expired);

        if self.cycles_since_last_obstacle >= self.environment.obstacle_cycle_interval {
            if self.current_obstacle_cycle < self.environment.obstacle_timeline.len() {
                self.place_obstacle_group_from_timeline();
                self.current_obstacle_cycle += 1;
            }
            self.cycles_since_last_obstacle = 0;
        }
    }

    fn place_obstacle_group_from_timeline(&mut self) {
        let candidates = self.environment.obstacle_timeline[self.current_obstacle_cycle].clone();

        let mut group = ObstacleGroup {
            positions: Vec::new(),
            cycles_remaining: self.environment.obstacle_persistence_cycles,
        };
        for pos in candidates {
            if self.is_valid_obstacle_position(pos) && self.engine.add_obstacle(pos) {
                group.positions.push(pos);
            }
        }

        self.stats.obstacles_added += group.positions.len();
        if !group.positions.is_empty() {
            self.active_obstacle_groups.push(group);
        }
    }

    fn is_valid_obstacle_position(&self, pos: Position) -> bool {
        if pos == self.environment.target || self.agents.iter().any(|agent| agent.position == pos) {
            return false;
        }
        self.engine.grid().cell(pos) == Some(Cell::Empty)
    }

    fn clear_all_obstacles(&mut self) {
        let positions: Vec<Position> = self
            .active_obstacle_groups
            .drain(..)
            .flat_map(|group| group.positions)
            .collect();
        self.stats.obstacles_removed += self.engine.remove_obstacles(positions);
    }

    fn render(&self, tick: usize) {
        print!("\x1B[2J\x1B[1;1H");
        println!("=== CONVERGING PATHS ===");
        println!(
            "Tick: {} | Arrived: {}/{} | Active obstacle groups: {}",
            tick,
            self.agents.iter().filter(|agent| agent.arrived).count(),
            self.agents.len(),
            self.active_obstacle_groups.len()
        );
        for agent in &self.agents {
            match agent.remaining(&self.engine) {
                Some(left) => println!("Agent {}: {} steps to go", agent.id, left),
                None if agent.arrived => println!("Agent {}: arrived", agent.id),
                None => println!("Agent {}: no route", agent.id),
            }
        }
        let positions: Vec<Position> = self
            .agents
            .iter()
            .filter(|agent| !agent.arrived)
            .map(|agent| agent.position)
            .collect();
        self.engine
            .grid()
            .print_grid(Some(self.environment.target), &positions);
        thread::sleep(Duration::from_millis(self.config.delay_ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn quiet_config(extra: &[&str]) -> Config {
        let mut args = vec![
            "converging_paths",
            "--no-visualization",
            "--quiet",
            "--grid-size",
            "12",
            "--num-walls",
            "20",
            "--num-obstacles",
            "6",
            "--ticks",
            "120",
            "--verify",
        ];
        args.extend_from_slice(extra);
        Config::parse_from(args)
    }

    #[test]
    fn same_seed_gives_same_environment() {
        let config = quiet_config(&[]);
        let a = EnvironmentSetup::generate(&config, Some(11)).unwrap();
        let b = EnvironmentSetup::generate(&config, Some(11)).unwrap();
        assert_eq!(a.base_grid, b.base_grid);
        assert_eq!(a.target, b.target);
        assert_eq!(a.agent_starts, b.agent_starts);
        assert_eq!(a.obstacle_timeline, b.obstacle_timeline);
        assert!(a.base_grid.contains(a.target));
    }

    #[test]
    fn verified_run_never_diverges_from_rebuild() {
        for seed in 0..5 {
            let config = quiet_config(&[]);
            let mut simulation = Simulation::new_with_environment(
                config.clone(),
                EnvironmentSetup::generate(&config, Some(seed)).unwrap(),
            )
            .unwrap();
            let (stats, timing) = simulation.run().unwrap();
            assert_eq!(stats.verification_failures, 0);
            assert!(stats.verification_checks > 0);
            assert_eq!(timing.generate_times.len(), 1);
            assert_eq!(stats.obstacles_added, stats.obstacles_removed);
        }
    }

    #[test]
    fn diagonal_run_returns_grid_to_base_state() {
        let config = quiet_config(&["--diagonal"]);
        let environment = EnvironmentSetup::generate(&config, Some(3)).unwrap();
        let base = environment.base_grid.clone();
        let mut simulation = Simulation::new_with_environment(config, environment).unwrap();
        simulation.run().unwrap();
        assert_eq!(simulation.engine().grid(), &base);
    }
}
