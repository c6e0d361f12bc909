//! Forest of random projection trees for approximate nearest neighbor search
//!
//! Each tree recursively splits its entries with the hyperplane bisecting two
//! randomly drawn members until a node holds at most `leaf_size` entries.
//! Queries walk all trees best-first through a shared priority queue, where a
//! branch's priority is the smallest margin by which the query lies on its
//! side of any hyperplane along the path. Leaves are harvested until enough
//! candidates are collected; exact ranking happens in the caller.
//!
//! Construction draws from a `StdRng` seeded with [`IndexParams::seed`], so a
//! given entry set and parameter set always produce the same forest.

use crate::io::configuration::{
    DEFAULT_LEAF_SIZE, DEFAULT_SEED, DEFAULT_TREE_COUNT, MAX_SPLIT_ATTEMPTS,
};
use crate::io::error::{Result, invalid_parameter};
use crate::math::distance::{bisector, margin};
use bitvec::prelude::{BitVec, bitvec};
use ndarray::{Array2, ArrayView1};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Parameters controlling forest construction and search breadth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexParams {
    /// Number of independent trees
    pub tree_count: usize,
    /// Maximum entries per leaf
    pub leaf_size: usize,
    /// Seed for hyperplane sampling
    pub seed: u64,
    /// Candidates gathered per query before exact ranking; derived from
    /// `tree_count * k * leaf_size` when unset
    pub search_k: Option<usize>,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            tree_count: DEFAULT_TREE_COUNT,
            leaf_size: DEFAULT_LEAF_SIZE,
            seed: DEFAULT_SEED,
            search_k: None,
        }
    }
}

impl IndexParams {
    /// Check parameters before building
    ///
    /// # Errors
    ///
    /// Returns an error if the tree count or leaf size is zero
    pub fn validate(&self) -> Result<()> {
        if self.tree_count == 0 {
            return Err(invalid_parameter(
                "tree_count",
                &self.tree_count,
                &"at least one tree is required",
            ));
        }
        if self.leaf_size == 0 {
            return Err(invalid_parameter(
                "leaf_size",
                &self.leaf_size,
                &"leaves must hold at least one entry",
            ));
        }
        if self.search_k == Some(0) {
            return Err(invalid_parameter(
                "search_k",
                &0,
                &"queries must gather at least one candidate",
            ));
        }
        Ok(())
    }

    /// Number of candidates to gather for a `k`-nearest query
    pub fn search_breadth(&self, k: usize) -> usize {
        self.search_k
            .unwrap_or_else(|| self.tree_count * k * self.leaf_size)
            .max(k)
    }
}

/// One node of a projection tree, stored in a flat arena
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Terminal bucket of entry indices
    Leaf {
        /// Entry indices in insertion order
        items: Vec<u32>,
    },
    /// Hyperplane split; positive margins go right
    Split {
        /// Hyperplane normal (empty for an arbitrary split of identical points)
        normal: Vec<f32>,
        /// Hyperplane offset along the normal
        offset: f32,
        /// Arena index of the non-positive side
        left: u32,
        /// Arena index of the positive side
        right: u32,
    },
}

/// Random projection forest over the rows of a vector matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionForest {
    nodes: Vec<Node>,
    roots: Vec<u32>,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    priority: f32,
    node: u32,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    // Max-heap on priority; equal priorities pop the lower arena index first
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl ProjectionForest {
    /// Build a forest over every row of `vectors`
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are invalid or there are more rows
    /// than fit in a 32-bit entry index
    pub fn build(vectors: &Array2<f32>, params: &IndexParams) -> Result<Self> {
        params.validate()?;
        let count = u32::try_from(vectors.nrows())
            .map_err(|error| invalid_parameter("entries", &vectors.nrows(), &error))?;

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut forest = Self {
            nodes: Vec::new(),
            roots: Vec::with_capacity(params.tree_count),
        };

        for _ in 0..params.tree_count {
            let root = forest.build_tree(vectors, (0..count).collect(), params.leaf_size, &mut rng);
            forest.roots.push(root);
        }

        Ok(forest)
    }

    fn allocate(&mut self) -> u32 {
        self.nodes.push(Node::Leaf { items: Vec::new() });
        (self.nodes.len() - 1) as u32
    }

    fn build_tree(
        &mut self,
        vectors: &Array2<f32>,
        items: Vec<u32>,
        leaf_size: usize,
        rng: &mut StdRng,
    ) -> u32 {
        let root = self.allocate();
        // Explicit stack keeps degenerate trees from exhausting the call stack
        let mut stack = vec![(root, items)];

        while let Some((slot, items)) = stack.pop() {
            let node = if items.len() <= leaf_size {
                Node::Leaf { items }
            } else {
                let (normal, offset, left_items, right_items) = split(vectors, &items, rng);
                let left = self.allocate();
                let right = self.allocate();
                stack.push((right, right_items));
                stack.push((left, left_items));
                Node::Split {
                    normal,
                    offset,
                    left,
                    right,
                }
            };
            if let Some(entry) = self.nodes.get_mut(slot as usize) {
                *entry = node;
            }
        }

        root
    }

    /// Number of trees
    pub fn tree_count(&self) -> usize {
        self.roots.len()
    }

    /// Total number of arena nodes across all trees
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Gather up to roughly `search_k` distinct candidate rows for a query
    ///
    /// Whole leaves are harvested, so the result may exceed `search_k` by
    /// less than one leaf. Candidates are returned in discovery order.
    pub fn candidates(
        &self,
        query: ArrayView1<'_, f32>,
        row_count: usize,
        search_k: usize,
    ) -> Vec<usize> {
        let mut heap: BinaryHeap<Pending> = self
            .roots
            .iter()
            .map(|&node| Pending {
                priority: f32::INFINITY,
                node,
            })
            .collect();
        let mut seen: BitVec = bitvec![0; row_count];
        let mut found = Vec::with_capacity(search_k);

        while found.len() < search_k {
            let Some(Pending { priority, node }) = heap.pop() else {
                break;
            };
            match self.nodes.get(node as usize) {
                Some(Node::Leaf { items }) => {
                    for &item in items {
                        let item = item as usize;
                        if item < row_count && !seen.get(item).is_some_and(|bit| *bit) {
                            seen.set(item, true);
                            found.push(item);
                        }
                    }
                }
                Some(Node::Split {
                    normal,
                    offset,
                    left,
                    right,
                }) => {
                    let m = margin(normal, *offset, query);
                    let (near, far) = if m > 0.0 { (*right, *left) } else { (*left, *right) };
                    heap.push(Pending {
                        priority: priority.min(m.abs()),
                        node: near,
                    });
                    heap.push(Pending {
                        priority: priority.min(-m.abs()),
                        node: far,
                    });
                }
                None => {}
            }
        }

        found
    }

    /// Check that every node reference and entry index is in range and that
    /// the arena forms disjoint trees
    ///
    /// Children are always allocated after their parent, so every split must
    /// point to strictly higher arena indices.
    ///
    /// # Errors
    ///
    /// Returns a description of the first structural defect found
    pub fn validate(&self, row_count: usize, dimension: usize) -> std::result::Result<(), String> {
        if self.roots.is_empty() {
            return Err("forest has no trees".to_string());
        }
        let node_count = self.nodes.len();
        if let Some(root) = self.roots.iter().find(|&&r| r as usize >= node_count) {
            return Err(format!("tree root {root} is outside the node arena"));
        }
        self.validate_nodes(row_count, dimension)?;
        self.validate_shape()
    }

    fn validate_nodes(&self, row_count: usize, dimension: usize) -> std::result::Result<(), String> {
        let node_count = self.nodes.len();
        for (position, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { items } => {
                    if let Some(item) = items.iter().find(|&&i| i as usize >= row_count) {
                        return Err(format!("leaf {position} references missing entry {item}"));
                    }
                }
                Node::Split {
                    normal,
                    left,
                    right,
                    ..
                } => {
                    if *left as usize >= node_count || *right as usize >= node_count {
                        return Err(format!("split {position} references a missing child"));
                    }
                    if !normal.is_empty() && normal.len() != dimension {
                        return Err(format!(
                            "split {position} has a {}-dimensional normal, expected {dimension}",
                            normal.len()
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    // Walks every tree from its root; a node reached twice means two parents
    // share it or a split loops back on its own path
    fn validate_shape(&self) -> std::result::Result<(), String> {
        let mut visited: BitVec = bitvec![0; self.nodes.len()];
        for &root in &self.roots {
            let mut stack = vec![root];
            while let Some(node) = stack.pop() {
                if visited.get(node as usize).is_some_and(|bit| *bit) {
                    return Err(format!("node {node} is reachable more than once"));
                }
                visited.set(node as usize, true);
                if let Some(Node::Split { left, right, .. }) = self.nodes.get(node as usize) {
                    if *left <= node || *right <= node {
                        return Err(format!("split {node} points back to an earlier node"));
                    }
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }
        Ok(())
    }
}

type Partition = (Vec<f32>, f32, Vec<u32>, Vec<u32>);

// Draws random pairs first; if every draw is a duplicate pair, falls back to
// the first member that differs from the first entry, and only halves the
// node when all of its vectors are identical.
fn split(vectors: &Array2<f32>, items: &[u32], rng: &mut StdRng) -> Partition {
    for _ in 0..MAX_SPLIT_ATTEMPTS {
        let first = rng.random_range(0..items.len());
        let mut second = rng.random_range(0..items.len() - 1);
        if second >= first {
            second += 1;
        }
        if let (Some(&a), Some(&b)) = (items.get(first), items.get(second)) {
            if let Some(partition) = partition_by_pair(vectors, items, a, b) {
                return partition;
            }
        }
    }

    if let Some(&anchor) = items.first() {
        let anchor_row = vectors.row(anchor as usize);
        let distinct = items
            .iter()
            .copied()
            .find(|&other| vectors.row(other as usize) != anchor_row);
        if let Some(other) = distinct {
            if let Some(partition) = partition_by_pair(vectors, items, anchor, other) {
                return partition;
            }
        }
    }

    let middle = items.len() / 2;
    let (left, right) = items.split_at(middle);
    (Vec::new(), 0.0, left.to_vec(), right.to_vec())
}

fn partition_by_pair(vectors: &Array2<f32>, items: &[u32], a: u32, b: u32) -> Option<Partition> {
    let (normal, offset) = bisector(vectors.row(a as usize), vectors.row(b as usize));
    let (right, left): (Vec<u32>, Vec<u32>) = items
        .iter()
        .copied()
        .partition(|&item| margin(&normal, offset, vectors.row(item as usize)) > 0.0);
    (!left.is_empty() && !right.is_empty()).then_some((normal, offset, left, right))
}
