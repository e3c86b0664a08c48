use crate::algorithms::common::Cost;
use crate::algorithms::path_tree::PathTree;
use crate::grid::{Grid, GridGraph, Position};
use pathfinding::prelude::{astar, dijkstra_all};
use rustc_hash::FxHashMap;

/// Costs to `target` from every node that can reach it, computed from
/// scratch with the `pathfinding` crate's Dijkstra.
///
/// Edges are symmetric, so distances from the target equal distances to it.
pub fn reference_costs<G: GridGraph>(grid: &G, target: Position) -> FxHashMap<Position, Cost> {
    let mut costs: FxHashMap<Position, Cost> = FxHashMap::default();
    if !grid.contains(target) {
        return costs;
    }
    costs.extend(
        dijkstra_all(&target, |p| grid.neighbors(*p))
            .into_iter()
            .map(|(pos, (_, cost))| (pos, cost)),
    );
    costs.insert(target, 0);
    costs
}

/// Whether `tree` holds exactly the reachable nodes of `grid` with their
/// true costs.
pub fn matches_reference<G: GridGraph>(grid: &G, tree: &PathTree) -> bool {
    let expected = reference_costs(grid, tree.target());
    expected.len() == tree.len()
        && expected
            .iter()
            .all(|(&pos, &cost)| tree.get(pos).is_some_and(|node| node.cost == cost))
}

/// A* between two cells using the grid's own metric as the heuristic.
pub fn astar_path(grid: &Grid, start: Position, goal: Position) -> Option<(Vec<Position>, Cost)> {
    if !grid.contains(start) || !grid.contains(goal) {
        return None;
    }
    astar(
        &start,
        |p| grid.neighbors(*p),
        |p| grid.connectivity.distance(*p, goal),
        |p| *p == goal,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::incremental::build_tree;
    use crate::grid::Connectivity;

    #[test]
    fn astar_and_dijkstra_agree_on_walled_map() {
        let grid = Grid::parse(
            "\
.....
.###.
...#.
##.#.
.....",
            Connectivity::Four,
        )
        .unwrap();
        let target = Position::new(0, 4);
        let costs = reference_costs(&grid, target);
        let (path, cost) = astar_path(&grid, Position::new(0, 0), target).unwrap();

        assert_eq!(costs.get(&Position::new(0, 0)), Some(&cost));
        assert_eq!(path.len() as Cost, cost + 1);
        assert_eq!(costs.get(&target), Some(&0));
        assert!(!costs.contains_key(&Position::new(1, 1)));
    }

    #[test]
    fn full_build_matches_reference() {
        let grid = Grid::parse("..#..\n..#..\n.....\n", Connectivity::Eight).unwrap();
        let (tree, _) = build_tree(&grid, Position::new(4, 0));
        assert!(matches_reference(&grid, &tree));
        assert_eq!(tree.cost(Position::new(0, 0)), 4);
    }

    #[test]
    fn unreachable_region_is_absent() {
        let grid = Grid::parse(".#.\n.#.\n", Connectivity::Eight).unwrap();
        let costs = reference_costs(&grid, Position::new(0, 0));
        assert_eq!(costs.len(), 2);
        assert!(astar_path(&grid, Position::new(0, 0), Position::new(2, 1)).is_none());
    }
}
