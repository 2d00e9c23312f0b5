//! Keyframe timelines and the interned graph registry.
//!
//! A graph is an ordered, strictly ascending sequence of keyframe indices
//! (0..=65535). Graphs are immutable value objects identified by their
//! sequence; the registry deduplicates them structurally and curves hold a
//! [`GraphId`] into it, never a mutable alias. Ids are append-only and
//! stable; the encoder writes only reachable graphs.

use hashbrown::HashMap;

/// Maximum representable keyframe index.
pub const MAX_KEYFRAME: u16 = u16::MAX;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Graph {
    keyframes: Vec<u16>,
}

impl Graph {
    /// `keyframes` must be strictly ascending.
    pub fn new(keyframes: Vec<u16>) -> Self {
        debug_assert!(keyframes.windows(2).all(|w| w[0] < w[1]));
        Self { keyframes }
    }

    /// The single-keyframe timeline at frame 0.
    pub fn zero() -> Self {
        Self::new(vec![0])
    }

    pub fn keyframes(&self) -> &[u16] {
        &self.keyframes
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Last keyframe index, or 0 for an empty timeline.
    pub fn last(&self) -> u16 {
        self.keyframes.last().copied().unwrap_or(0)
    }

    /// Exact sample index of `frame`, if it is a native keyframe.
    pub fn index_of(&self, frame: u16) -> Option<usize> {
        self.keyframes.binary_search(&frame).ok()
    }

    /// Step-hold sample index: the latest native keyframe ≤ `frame`. Never
    /// interpolates, never looks ahead. Frames before the first keyframe
    /// clamp to sample 0.
    pub fn step_hold_index(&self, frame: u16) -> usize {
        let after = self.keyframes.partition_point(|&k| k <= frame);
        after.saturating_sub(1)
    }
}

/// Index into a [`GraphRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphId(usize);

impl GraphId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Structurally deduplicated graph storage.
#[derive(Debug, Clone, Default)]
pub struct GraphRegistry {
    graphs: Vec<Graph>,
    by_sequence: HashMap<Vec<u16>, GraphId>,
}

impl GraphRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a keyframe sequence, returning the id of the existing graph if
    /// an identical sequence is already stored.
    pub fn intern(&mut self, keyframes: Vec<u16>) -> GraphId {
        if let Some(&id) = self.by_sequence.get(&keyframes) {
            return id;
        }
        let id = GraphId(self.graphs.len());
        self.by_sequence.insert(keyframes.clone(), id);
        self.graphs.push(Graph::new(keyframes));
        id
    }

    pub fn get(&self, id: GraphId) -> &Graph {
        &self.graphs[id.0]
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedups_by_sequence() {
        let mut reg = GraphRegistry::new();
        let a = reg.intern(vec![0, 5, 10]);
        let b = reg.intern(vec![0, 5, 10]);
        let c = reg.intern(vec![0, 3]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_step_hold_index() {
        let g = Graph::new(vec![0, 5, 10]);
        assert_eq!(g.step_hold_index(0), 0);
        assert_eq!(g.step_hold_index(4), 0);
        assert_eq!(g.step_hold_index(5), 1);
        assert_eq!(g.step_hold_index(7), 1);
        assert_eq!(g.step_hold_index(10), 2);
        assert_eq!(g.step_hold_index(200), 2);
    }

    #[test]
    fn test_last_of_empty() {
        assert_eq!(Graph::new(vec![]).last(), 0);
        assert_eq!(Graph::zero().last(), 0);
    }
}
