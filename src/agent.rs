use crate::algorithms::incremental::IncrementalPathfinder;
use crate::grid::{GridGraph, Position};
use crate::observer::PathfindObserver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Moved(Position),
    Arrived,
    /// No route to the target this tick; the agent waits.
    Stalled,
}

/// A walker that converges on the engine's target one cell per tick.
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: usize,
    pub position: Position,
    pub moves: usize,
    pub stalled: usize,
    pub arrived: bool,
}

impl Agent {
    pub fn new(id: usize, start: Position) -> Self {
        Agent {
            id,
            position: start,
            moves: 0,
            stalled: 0,
            arrived: false,
        }
    }

    /// Advances one cell along the current best path.
    pub fn step<G, O>(&mut self, engine: &IncrementalPathfinder<G, O>) -> StepOutcome
    where
        G: GridGraph,
        O: PathfindObserver,
    {
        if self.arrived || engine.target() == Some(self.position) {
            self.arrived = true;
            return StepOutcome::Arrived;
        }

        match engine.find_path(self.position).get(1) {
            Some(&next) => {
                self.position = next;
                self.moves += 1;
                if engine.target() == Some(next) {
                    self.arrived = true;
                }
                StepOutcome::Moved(next)
            }
            None => {
                self.stalled += 1;
                StepOutcome::Stalled
            }
        }
    }

    /// Cells left to walk, if a route exists.
    pub fn remaining<G, O>(&self, engine: &IncrementalPathfinder<G, O>) -> Option<usize>
    where
        G: GridGraph,
        O: PathfindObserver,
    {
        let path = engine.find_path(self.position);
        path.len().checked_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Connectivity, Grid};

    #[test]
    fn walks_to_target_and_stalls_when_cut_off() {
        let mut engine = IncrementalPathfinder::new(Grid::new(3, 1, Connectivity::Four));
        engine.generate_paths(Position::new(2, 0)).unwrap();
        let mut agent = Agent::new(0, Position::new(0, 0));
        assert_eq!(agent.remaining(&engine), Some(2));

        engine.add_obstacle(Position::new(1, 0));
        assert_eq!(agent.step(&engine), StepOutcome::Stalled);
        assert_eq!(agent.remaining(&engine), None);

        engine.remove_obstacle(Position::new(1, 0));
        assert_eq!(agent.step(&engine), StepOutcome::Moved(Position::new(1, 0)));
        assert_eq!(agent.step(&engine), StepOutcome::Moved(Position::new(2, 0)));
        assert!(agent.arrived);
        assert_eq!(agent.step(&engine), StepOutcome::Arrived);
        assert_eq!((agent.moves, agent.stalled), (2, 1));
    }
}
