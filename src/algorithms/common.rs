use crate::grid::Position;
use rustc_hash::FxHashSet;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Accumulated edge weight along a path toward the target.
pub type Cost = u32;

/// Cost of a node with no known path to the target.
pub const UNREACHABLE: Cost = Cost::MAX;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct QueueEntry {
    cost: Cost,
    pos: Position,
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so BinaryHeap pops the cheapest entry first, then the
        // smallest position.
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.pos.cmp(&self.pos))
    }
}

/// Priority frontier for one relaxation pass.
///
/// Entries are never decreased in place: a node is pushed again whenever its
/// cost improves and stale entries are skipped on pop. A popped node is
/// settled for the rest of the pass.
#[derive(Default)]
pub struct Frontier {
    queue: BinaryHeap<QueueEntry>,
    settled: FxHashSet<Position>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pos: Position, cost: Cost) {
        self.queue.push(QueueEntry { cost, pos });
    }

    /// Pops the cheapest unsettled node and settles it. `current_cost`
    /// reports the node's best known cost; entries that no longer match it
    /// are discarded.
    pub fn pop_settled<F>(&mut self, current_cost: F) -> Option<(Position, Cost)>
    where
        F: Fn(Position) -> Cost,
    {
        while let Some(QueueEntry { cost, pos }) = self.queue.pop() {
            if cost != current_cost(pos) || !self.settled.insert(pos) {
                continue;
            }
            return Some((pos, cost));
        }
        None
    }

    pub fn is_settled(&self, pos: Position) -> bool {
        self.settled.contains(&pos)
    }

    pub fn settled_count(&self) -> usize {
        self.settled.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_cheapest_first_and_skips_stale_entries() {
        let a = Position::new(0, 0);
        let b = Position::new(1, 0);
        let mut frontier = Frontier::new();
        frontier.push(a, 5);
        frontier.push(b, 3);
        frontier.push(a, 2);

        let cost = |pos: Position| if pos == a { 2 } else { 3 };
        assert_eq!(frontier.pop_settled(cost), Some((a, 2)));
        assert_eq!(frontier.pop_settled(cost), Some((b, 3)));
        assert_eq!(frontier.pop_settled(cost), None);
        assert!(frontier.is_settled(a));
        assert_eq!(frontier.settled_count(), 2);
    }

    #[test]
    fn equal_costs_pop_in_position_order() {
        let mut frontier = Frontier::new();
        frontier.push(Position::new(2, 0), 1);
        frontier.push(Position::new(0, 3), 1);
        frontier.push(Position::new(1, 1), 1);
        let order: Vec<Position> =
            std::iter::from_fn(|| frontier.pop_settled(|_| 1).map(|(pos, _)| pos)).collect();
        assert_eq!(
            order,
            vec![Position::new(0, 3), Position::new(1, 1), Position::new(2, 0)]
        );
    }
}
