use crate::algorithms::common::{Cost, UNREACHABLE};
use crate::grid::Position;
use rustc_hash::FxHashMap;

/// Annotation stored for every node with a known path to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathNode {
    pub cost: Cost,
    /// Neighbor one step closer to the target. `None` only for the target.
    pub predecessor: Option<Position>,
}

/// Shortest-path tree converging to a single target.
///
/// Only reachable nodes are stored; a missing entry means the node is
/// unreachable (cost [`UNREACHABLE`], no predecessor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTree {
    target: Position,
    nodes: FxHashMap<Position, PathNode>,
}

impl PathTree {
    pub fn new(target: Position) -> Self {
        PathTree {
            target,
            nodes: FxHashMap::default(),
        }
    }

    pub fn target(&self) -> Position {
        self.target
    }

    pub fn get(&self, pos: Position) -> Option<&PathNode> {
        self.nodes.get(&pos)
    }

    pub fn cost(&self, pos: Position) -> Cost {
        self.nodes.get(&pos).map_or(UNREACHABLE, |node| node.cost)
    }

    pub fn predecessor(&self, pos: Position) -> Option<Position> {
        self.nodes.get(&pos).and_then(|node| node.predecessor)
    }

    pub fn is_reachable(&self, pos: Position) -> bool {
        self.nodes.contains_key(&pos)
    }

    /// Sets the cost of `pos`, keeping its predecessor. An [`UNREACHABLE`]
    /// cost drops the entry.
    pub(crate) fn set_cost(&mut self, pos: Position, cost: Cost) {
        if cost == UNREACHABLE {
            self.nodes.remove(&pos);
        } else {
            self.nodes
                .entry(pos)
                .and_modify(|node| node.cost = cost)
                .or_insert(PathNode {
                    cost,
                    predecessor: None,
                });
        }
    }

    pub(crate) fn set_predecessor(&mut self, pos: Position, predecessor: Option<Position>) {
        if let Some(node) = self.nodes.get_mut(&pos) {
            node.predecessor = predecessor;
        }
    }

    pub(crate) fn remove(&mut self, pos: Position) -> Option<PathNode> {
        self.nodes.remove(&pos)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Position, &PathNode)> {
        self.nodes.iter().map(|(&pos, node)| (pos, node))
    }

    /// Positions from `from` to the target by following predecessors.
    /// Empty when `from` is unreachable.
    pub fn walk(&self, from: Position) -> Vec<Position> {
        let mut path = Vec::new();
        let mut current = from;
        while let Some(node) = self.nodes.get(&current) {
            path.push(current);
            match node.predecessor {
                Some(next) => current = next,
                None => return path,
            }
            // Predecessor chains strictly decrease in cost, so a chain longer
            // than the tree means it is corrupt.
            if path.len() > self.nodes.len() {
                break;
            }
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_tree() -> PathTree {
        let mut tree = PathTree::new(Position::new(0, 0));
        tree.set_cost(Position::new(0, 0), 0);
        for x in 1..4 {
            tree.set_cost(Position::new(x, 0), x as Cost);
            tree.set_predecessor(Position::new(x, 0), Some(Position::new(x - 1, 0)));
        }
        tree
    }

    #[test]
    fn walk_follows_predecessors_to_target() {
        let tree = line_tree();
        assert_eq!(
            tree.walk(Position::new(3, 0)),
            vec![
                Position::new(3, 0),
                Position::new(2, 0),
                Position::new(1, 0),
                Position::new(0, 0),
            ]
        );
        assert_eq!(tree.walk(Position::new(0, 0)), vec![Position::new(0, 0)]);
        assert!(tree.walk(Position::new(9, 9)).is_empty());
    }

    #[test]
    fn unreachable_cost_drops_the_entry() {
        let mut tree = line_tree();
        tree.set_cost(Position::new(3, 0), UNREACHABLE);
        assert!(!tree.is_reachable(Position::new(3, 0)));
        assert_eq!(tree.cost(Position::new(3, 0)), UNREACHABLE);
        assert_eq!(tree.predecessor(Position::new(3, 0)), None);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn walk_stops_on_broken_chain() {
        let mut tree = line_tree();
        tree.remove(Position::new(1, 0));
        assert!(tree.walk(Position::new(3, 0)).is_empty());
    }
}
