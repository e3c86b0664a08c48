use crate::algorithms::common::{Cost, Frontier, UNREACHABLE};
use crate::algorithms::path_tree::{PathNode, PathTree};
use crate::error::PathfindError;
use crate::grid::{GridGraph, Position};
use crate::observer::{NoopObserver, Operation, OperationReport, PathfindObserver};
use rustc_hash::FxHashSet;
use std::time::Instant;

/// Whether a path tree exists yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeState {
    Unbuilt,
    Built(PathTree),
}

/// Work done by one repair pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RepairSummary {
    pub settled: usize,
    pub invalidated: usize,
}

/// Shortest paths from every node of a grid to one shared target, kept up to
/// date as cells are blocked and cleared.
///
/// The engine owns the grid so every topology change goes through it. Once
/// [`generate_paths`](Self::generate_paths) has succeeded, blocking a cell
/// repairs only the nodes whose route used it and clearing a cell relaxes
/// outward from it. Before that, obstacle changes only touch the grid.
///
/// Predecessors are canonical: a node points at the first neighbor, in the
/// grid's enumeration order, that lies on a shortest route. A repaired tree
/// is therefore identical to one rebuilt from scratch.
pub struct IncrementalPathfinder<G, O = NoopObserver> {
    grid: G,
    state: TreeState,
    observer: O,
}

impl<G: GridGraph> IncrementalPathfinder<G> {
    pub fn new(grid: G) -> Self {
        Self::with_observer(grid, NoopObserver)
    }
}

impl<G: GridGraph, O: PathfindObserver> IncrementalPathfinder<G, O> {
    pub fn with_observer(grid: G, observer: O) -> Self {
        IncrementalPathfinder {
            grid,
            state: TreeState::Unbuilt,
            observer,
        }
    }

    pub fn grid(&self) -> &G {
        &self.grid
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn into_parts(self) -> (G, O) {
        (self.grid, self.observer)
    }

    pub fn state(&self) -> &TreeState {
        &self.state
    }

    pub fn is_generated(&self) -> bool {
        matches!(self.state, TreeState::Built(_))
    }

    pub fn tree(&self) -> Option<&PathTree> {
        match &self.state {
            TreeState::Built(tree) => Some(tree),
            TreeState::Unbuilt => None,
        }
    }

    pub fn target(&self) -> Option<Position> {
        self.tree().map(PathTree::target)
    }

    /// Tree annotation of a reachable node.
    pub fn node(&self, pos: Position) -> Option<PathNode> {
        self.tree().and_then(|tree| tree.get(pos).copied())
    }

    /// Builds the full tree converging to `target`, replacing any previous one.
    ///
    /// Fails with [`PathfindError::InvalidTarget`] if `target` is not a node;
    /// the previous tree, if any, is kept.
    pub fn generate_paths(&mut self, target: Position) -> Result<(), PathfindError> {
        let start = Instant::now();
        if !self.grid.contains(target) {
            return Err(PathfindError::InvalidTarget(target));
        }

        let (tree, summary) = build_tree(&self.grid, target);
        self.state = TreeState::Built(tree);
        self.report(Operation::GeneratePaths, target, start, summary, true);
        Ok(())
    }

    /// Blocks `pos` and repairs the tree if one is built.
    ///
    /// Returns `false` if `pos` was not a node, in which case nothing changes.
    pub fn add_obstacle(&mut self, pos: Position) -> bool {
        let start = Instant::now();
        if !self.grid.remove_node(pos) {
            return false;
        }
        let (summary, repaired) = match &mut self.state {
            TreeState::Built(tree) => (repair_after_removal(&self.grid, tree, pos), true),
            TreeState::Unbuilt => (RepairSummary::default(), false),
        };
        self.report(Operation::AddObstacle, pos, start, summary, repaired);
        true
    }

    /// Clears `pos` and repairs the tree if one is built.
    ///
    /// Returns `false` if `pos` was already a node or lies outside the grid.
    pub fn remove_obstacle(&mut self, pos: Position) -> bool {
        let start = Instant::now();
        if self.grid.contains(pos) || !self.grid.insert_node(pos) {
            return false;
        }
        let (summary, repaired) = match &mut self.state {
            TreeState::Built(tree) => (repair_after_insertion(&self.grid, tree, pos), true),
            TreeState::Unbuilt => (RepairSummary::default(), false),
        };
        self.report(Operation::RemoveObstacle, pos, start, summary, repaired);
        true
    }

    /// Blocks every listed cell in order. Returns how many were blocked.
    pub fn add_obstacles<I>(&mut self, positions: I) -> usize
    where
        I: IntoIterator<Item = Position>,
    {
        positions
            .into_iter()
            .filter(|&pos| self.add_obstacle(pos))
            .count()
    }

    /// Clears every listed cell in order. Returns how many were cleared.
    pub fn remove_obstacles<I>(&mut self, positions: I) -> usize
    where
        I: IntoIterator<Item = Position>,
    {
        positions
            .into_iter()
            .filter(|&pos| self.remove_obstacle(pos))
            .count()
    }

    /// Mutable grid access for hosts that change topology themselves and then
    /// call [`update_after_removing`](Self::update_after_removing) or
    /// [`update_after_inserting`](Self::update_after_inserting).
    pub fn grid_mut(&mut self) -> &mut G {
        &mut self.grid
    }

    /// Repairs the tree after `removed` was taken out of the grid.
    ///
    /// Nothing is repaired while `removed` is still a node.
    pub fn update_after_removing(
        &mut self,
        removed: Position,
    ) -> Result<RepairSummary, PathfindError> {
        let start = Instant::now();
        let TreeState::Built(tree) = &mut self.state else {
            return Err(PathfindError::NotGenerated);
        };
        if self.grid.contains(removed) {
            return Ok(RepairSummary::default());
        }
        let summary = repair_after_removal(&self.grid, tree, removed);
        self.report(Operation::AddObstacle, removed, start, summary, true);
        Ok(summary)
    }

    /// Repairs the tree after `inserted` was added to the grid.
    ///
    /// Nothing is repaired unless `inserted` is a node.
    pub fn update_after_inserting(
        &mut self,
        inserted: Position,
    ) -> Result<RepairSummary, PathfindError> {
        let start = Instant::now();
        let TreeState::Built(tree) = &mut self.state else {
            return Err(PathfindError::NotGenerated);
        };
        if !self.grid.contains(inserted) {
            return Ok(RepairSummary::default());
        }
        let summary = repair_after_insertion(&self.grid, tree, inserted);
        self.report(Operation::RemoveObstacle, inserted, start, summary, true);
        Ok(summary)
    }

    /// Positions from `from` to the target, both included.
    ///
    /// Empty when no tree is built, `from` is not a node, or the target
    /// cannot be reached from it.
    pub fn find_path(&self, from: Position) -> Vec<Position> {
        self.try_find_path(from).unwrap_or_default()
    }

    /// Like [`find_path`](Self::find_path), but reports a missing tree as
    /// [`PathfindError::NotGenerated`] instead of an empty path.
    pub fn try_find_path(&self, from: Position) -> Result<Vec<Position>, PathfindError> {
        let tree = self.tree().ok_or(PathfindError::NotGenerated)?;
        if !self.grid.contains(from) {
            return Ok(Vec::new());
        }
        Ok(tree.walk(from))
    }

    pub fn has_valid_path(&self, from: Position) -> bool {
        self.tree()
            .is_some_and(|tree| self.grid.contains(from) && tree.is_reachable(from))
    }

    /// Cost of the best route from `from`, `None` if there is none.
    pub fn path_cost(&self, from: Position) -> Result<Option<Cost>, PathfindError> {
        let tree = self.tree().ok_or(PathfindError::NotGenerated)?;
        Ok(tree.get(from).map(|node| node.cost))
    }

    fn report(
        &mut self,
        operation: Operation,
        position: Position,
        start: Instant,
        summary: RepairSummary,
        repaired: bool,
    ) {
        self.observer.on_operation(&OperationReport {
            operation,
            position,
            elapsed: start.elapsed(),
            settled: summary.settled,
            invalidated: summary.invalidated,
            repaired,
        });
    }
}

/// Dijkstra run backward from `target` over the whole grid.
pub fn build_tree<G: GridGraph>(grid: &G, target: Position) -> (PathTree, RepairSummary) {
    let mut tree = PathTree::new(target);
    let mut frontier = Frontier::new();
    let mut changed = FxHashSet::default();

    tree.set_cost(target, 0);
    frontier.push(target, 0);
    relax(grid, &mut tree, &mut frontier, &mut changed);

    let reached: Vec<Position> = tree.iter().map(|(pos, _)| pos).collect();
    assign_predecessors(grid, &mut tree, reached);

    let summary = RepairSummary {
        settled: frontier.settled_count(),
        invalidated: 0,
    };
    (tree, summary)
}

/// Repairs `tree` after `removed` left the grid.
///
/// Every node whose predecessor chain ran through `removed` is invalidated,
/// then re-seeded from its valid neighbors and relaxed.
fn repair_after_removal<G: GridGraph>(
    grid: &G,
    tree: &mut PathTree,
    removed: Position,
) -> RepairSummary {
    if tree.remove(removed).is_none() {
        // Unreachable nodes are nobody's predecessor.
        return RepairSummary::default();
    }

    let mut dirty: FxHashSet<Position> = FxHashSet::default();
    let mut order = Vec::new();
    let mut stack = vec![removed];
    while let Some(pos) = stack.pop() {
        for (next, _) in grid.neighbors(pos) {
            if tree.predecessor(next) == Some(pos) && dirty.insert(next) {
                order.push(next);
                stack.push(next);
            }
        }
    }
    for &pos in &order {
        tree.remove(pos);
    }

    let seeds: Vec<(Position, Cost)> = order
        .iter()
        .filter_map(|&pos| {
            grid.neighbors(pos)
                .into_iter()
                .filter(|(next, _)| !dirty.contains(next))
                .filter_map(|(next, weight)| step_cost(tree.cost(next), weight))
                .min()
                .map(|cost| (pos, cost))
        })
        .collect();

    let mut frontier = Frontier::new();
    let mut changed = FxHashSet::default();
    for (pos, cost) in seeds {
        tree.set_cost(pos, cost);
        changed.insert(pos);
        frontier.push(pos, cost);
    }
    relax(grid, tree, &mut frontier, &mut changed);

    let mut touched = dirty;
    touched.extend(changed);
    refresh_predecessors(grid, tree, &touched);

    log::trace!(
        "removal at ({}, {}): invalidated {}, settled {}",
        removed.x,
        removed.y,
        order.len(),
        frontier.settled_count()
    );
    RepairSummary {
        settled: frontier.settled_count(),
        invalidated: order.len(),
    }
}

/// Repairs `tree` after `inserted` joined the grid. Costs can only drop.
fn repair_after_insertion<G: GridGraph>(
    grid: &G,
    tree: &mut PathTree,
    inserted: Position,
) -> RepairSummary {
    let cost = if inserted == tree.target() {
        0
    } else {
        grid.neighbors(inserted)
            .into_iter()
            .filter_map(|(next, weight)| step_cost(tree.cost(next), weight))
            .min()
            .unwrap_or(UNREACHABLE)
    };
    if cost == UNREACHABLE {
        return RepairSummary::default();
    }

    let mut frontier = Frontier::new();
    let mut changed = FxHashSet::default();
    tree.set_cost(inserted, cost);
    changed.insert(inserted);
    frontier.push(inserted, cost);
    relax(grid, tree, &mut frontier, &mut changed);

    refresh_predecessors(grid, tree, &changed);

    log::trace!(
        "insertion at ({}, {}): settled {}",
        inserted.x,
        inserted.y,
        frontier.settled_count()
    );
    RepairSummary {
        settled: frontier.settled_count(),
        invalidated: 0,
    }
}

/// Pops settled nodes until the frontier is empty, lowering neighbor costs
/// through each one. Every lowered node is recorded in `changed`.
fn relax<G: GridGraph>(
    grid: &G,
    tree: &mut PathTree,
    frontier: &mut Frontier,
    changed: &mut FxHashSet<Position>,
) {
    while let Some((pos, cost)) = frontier.pop_settled(|p| tree.cost(p)) {
        for (next, weight) in grid.neighbors(pos) {
            if frontier.is_settled(next) {
                continue;
            }
            let Some(candidate) = step_cost(cost, weight) else {
                continue;
            };
            if candidate < tree.cost(next) {
                tree.set_cost(next, candidate);
                changed.insert(next);
                frontier.push(next, candidate);
            }
        }
    }
}

/// Re-derives predecessors for every node whose own cost or a neighbor's
/// cost may have changed.
fn refresh_predecessors<G: GridGraph>(
    grid: &G,
    tree: &mut PathTree,
    changed: &FxHashSet<Position>,
) {
    let mut affected: FxHashSet<Position> = changed.clone();
    for &pos in changed {
        affected.extend(grid.neighbors(pos).into_iter().map(|(next, _)| next));
    }
    assign_predecessors(grid, tree, affected);
}

fn assign_predecessors<G, I>(grid: &G, tree: &mut PathTree, positions: I)
where
    G: GridGraph,
    I: IntoIterator<Item = Position>,
{
    for pos in positions {
        let cost = tree.cost(pos);
        if cost == UNREACHABLE {
            continue;
        }
        let predecessor = if pos == tree.target() {
            None
        } else {
            grid.neighbors(pos)
                .into_iter()
                .find(|&(next, weight)| step_cost(tree.cost(next), weight) == Some(cost))
                .map(|(next, _)| next)
        };
        tree.set_predecessor(pos, predecessor);
    }
}

fn step_cost(cost: Cost, weight: Cost) -> Option<Cost> {
    if cost == UNREACHABLE {
        return None;
    }
    cost.checked_add(weight).filter(|&total| total != UNREACHABLE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Connectivity, Grid};

    fn open_5x5() -> IncrementalPathfinder<Grid> {
        IncrementalPathfinder::new(Grid::new(5, 5, Connectivity::Four))
    }

    #[test]
    fn starts_unbuilt() {
        let engine = open_5x5();
        assert!(!engine.is_generated());
        assert_eq!(engine.state(), &TreeState::Unbuilt);
        assert!(engine.find_path(Position::new(0, 0)).is_empty());
        assert!(!engine.has_valid_path(Position::new(0, 0)));
        assert_eq!(
            engine.try_find_path(Position::new(0, 0)),
            Err(PathfindError::NotGenerated)
        );
        assert_eq!(
            engine.path_cost(Position::new(0, 0)),
            Err(PathfindError::NotGenerated)
        );
    }

    #[test]
    fn full_build_on_open_grid_uses_manhattan_costs() {
        let mut engine = open_5x5();
        let target = Position::new(4, 4);
        engine.generate_paths(target).unwrap();

        let path = engine.find_path(Position::new(0, 0));
        assert_eq!(path.len(), 9);
        assert_eq!(path.first(), Some(&Position::new(0, 0)));
        assert_eq!(path.last(), Some(&target));
        assert_eq!(engine.path_cost(Position::new(0, 0)), Ok(Some(8)));
        assert_eq!(engine.find_path(target), vec![target]);
        assert_eq!(engine.node(target).and_then(|n| n.predecessor), None);
    }

    #[test]
    fn predecessor_is_first_optimal_neighbor_in_order() {
        let mut engine = open_5x5();
        engine.generate_paths(Position::new(4, 4)).unwrap();
        // From (0,0) both right (1,0) and down (0,1) are optimal; right comes
        // first in enumeration order.
        let node = engine.node(Position::new(0, 0)).unwrap();
        assert_eq!(node.predecessor, Some(Position::new(1, 0)));
    }

    #[test]
    fn invalid_target_keeps_previous_tree() {
        let mut engine = open_5x5();
        engine.generate_paths(Position::new(4, 4)).unwrap();
        let before = engine.tree().cloned();

        assert_eq!(
            engine.generate_paths(Position::new(7, 7)),
            Err(PathfindError::InvalidTarget(Position::new(7, 7)))
        );
        assert!(engine.add_obstacle(Position::new(0, 4)));
        assert!(engine.remove_obstacle(Position::new(0, 4)));
        assert_eq!(engine.tree().cloned(), before);

        engine.add_obstacle(Position::new(2, 2));
        assert_eq!(
            engine.generate_paths(Position::new(2, 2)),
            Err(PathfindError::InvalidTarget(Position::new(2, 2)))
        );
        assert_eq!(engine.target(), Some(Position::new(4, 4)));
    }

    #[test]
    fn obstacle_changes_before_build_only_touch_the_grid() {
        let mut engine = open_5x5();
        assert!(engine.add_obstacle(Position::new(1, 1)));
        assert!(!engine.add_obstacle(Position::new(1, 1)));
        assert!(!engine.is_generated());
        assert!(!engine.grid().contains(Position::new(1, 1)));
        assert!(engine.remove_obstacle(Position::new(1, 1)));
        assert!(!engine.remove_obstacle(Position::new(1, 1)));
        assert!(!engine.remove_obstacle(Position::new(-1, 0)));
        assert_eq!(
            engine.update_after_removing(Position::new(1, 1)),
            Err(PathfindError::NotGenerated)
        );
        assert_eq!(
            engine.update_after_inserting(Position::new(1, 1)),
            Err(PathfindError::NotGenerated)
        );
    }

    #[test]
    fn blocking_the_target_makes_everything_unreachable() {
        let mut engine = open_5x5();
        let target = Position::new(2, 2);
        engine.generate_paths(target).unwrap();

        assert!(engine.add_obstacle(target));
        assert!(engine.is_generated());
        assert!(engine.tree().is_some_and(PathTree::is_empty));
        assert!(!engine.has_valid_path(Position::new(0, 0)));

        assert!(engine.remove_obstacle(target));
        let rebuilt = build_tree(engine.grid(), target).0;
        assert_eq!(engine.tree(), Some(&rebuilt));
    }

    #[test]
    fn host_driven_updates_match_engine_driven_ones() {
        let mut engine = open_5x5();
        engine.generate_paths(Position::new(4, 4)).unwrap();

        let blocked = Position::new(3, 4);
        assert_eq!(
            engine.update_after_removing(blocked),
            Ok(RepairSummary::default())
        );
        engine.grid_mut().remove_node(blocked);
        let summary = engine.update_after_removing(blocked).unwrap();
        assert!(summary.invalidated > 0);
        assert_eq!(
            engine.tree(),
            Some(&build_tree(engine.grid(), Position::new(4, 4)).0)
        );

        engine.grid_mut().insert_node(blocked);
        engine.update_after_inserting(blocked).unwrap();
        assert_eq!(
            engine.tree(),
            Some(&build_tree(engine.grid(), Position::new(4, 4)).0)
        );
    }

    #[test]
    fn observer_receives_one_report_per_mutation() {
        let mut engine = IncrementalPathfinder::with_observer(
            Grid::new(4, 4, Connectivity::Four),
            Vec::<OperationReport>::new(),
        );
        engine.add_obstacle(Position::new(1, 1));
        engine.generate_paths(Position::new(0, 0)).unwrap();
        engine.add_obstacle(Position::new(2, 2));
        engine.remove_obstacle(Position::new(1, 1));
        engine.find_path(Position::new(3, 3));

        let ops: Vec<(Operation, bool)> = engine
            .observer()
            .iter()
            .map(|report: &OperationReport| (report.operation, report.repaired))
            .collect();
        assert_eq!(
            ops,
            vec![
                (Operation::AddObstacle, false),
                (Operation::GeneratePaths, true),
                (Operation::AddObstacle, true),
                (Operation::RemoveObstacle, true),
            ]
        );
        assert_eq!(engine.observer()[1].settled, 15);
    }

    impl PathfindObserver for Vec<OperationReport> {
        fn on_operation(&mut self, report: &OperationReport) {
            self.push(*report);
        }
    }
}
