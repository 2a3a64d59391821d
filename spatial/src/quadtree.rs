//! Region quadtree for static bodies.
//!
//! Entries are stored by bounding box in every leaf they overlap; an entry
//! straddling a split line is duplicated, never split geometrically. Queries
//! are a broad phase: callers must still run exact overlap checks on the
//! returned handles.
//!
//! Nodes live in an arena. [`Quadtree::clear`] returns every child node to a
//! free list, and later splits reuse those slots together with the entry
//! buffers they already own, so a rebuild allocates nothing once warm.

use bastion_core::{Circle, Rect, Shape};
use glam::Vec2;

const ROOT: usize = 0;

/// Split parameters of a quadtree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuadtreeConfig {
    /// Entries a leaf holds before it splits.
    pub capacity: usize,
    /// Deepest level a node may split to. The root sits at depth zero.
    pub max_depth: u32,
}

impl Default for QuadtreeConfig {
    fn default() -> Self {
        Self {
            capacity: 8,
            max_depth: 6,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Entry<T> {
    handle: T,
    bounds: Rect,
}

#[derive(Debug)]
struct Node<T> {
    bounds: Rect,
    depth: u32,
    entries: Vec<Entry<T>>,
    children: Option<[usize; 4]>,
}

/// Quadtree over a fixed world rectangle.
#[derive(Debug)]
pub struct Quadtree<T> {
    config: QuadtreeConfig,
    nodes: Vec<Node<T>>,
    free: Vec<usize>,
    scratch: Vec<Entry<T>>,
    inserted: usize,
}

impl<T: Copy + Ord> Quadtree<T> {
    /// Creates an empty quadtree covering `bounds`.
    #[must_use]
    pub fn new(bounds: Rect, config: QuadtreeConfig) -> Self {
        Self {
            config,
            nodes: vec![Node {
                bounds,
                depth: 0,
                entries: Vec::new(),
                children: None,
            }],
            free: Vec::new(),
            scratch: Vec::new(),
            inserted: 0,
        }
    }

    /// Rectangle covered by the root node.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.nodes[ROOT].bounds
    }

    /// Number of insertions since the last clear.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inserted
    }

    /// Reports whether nothing was inserted since the last clear.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inserted == 0
    }

    /// Nodes currently linked into the tree, including the root.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Nodes parked in the free list awaiting reuse.
    #[must_use]
    pub fn pooled_nodes(&self) -> usize {
        self.free.len()
    }

    /// Inserts a handle with the given bounding box.
    ///
    /// Boxes reaching past the root rectangle are clamped onto it, so bodies
    /// outside the world are still stored along its border.
    pub fn insert(&mut self, handle: T, bounds: Rect) {
        self.inserted += 1;
        let bounds = bounds.clamped_to(&self.nodes[ROOT].bounds);
        self.insert_at(ROOT, Entry { handle, bounds });
    }

    /// Inserts a circular body using its bounding box.
    pub fn insert_circle(&mut self, handle: T, circle: Circle) {
        self.insert(handle, circle.bounds());
    }

    /// Removes every entry and returns child nodes to the pool.
    pub fn clear(&mut self) {
        if let Some(children) = self.nodes[ROOT].children.take() {
            for child in children {
                self.release(child);
            }
        }
        self.nodes[ROOT].entries.clear();
        self.inserted = 0;
    }

    /// Clears the tree and inserts every provided body.
    pub fn rebuild<I>(&mut self, bodies: I)
    where
        I: IntoIterator<Item = (T, Circle)>,
    {
        self.clear();
        for (handle, circle) in bodies {
            self.insert_circle(handle, circle);
        }
    }

    /// Candidates whose bounding boxes overlap the query shape.
    ///
    /// The result is deduplicated and sorted.
    #[must_use]
    pub fn retrieve(&self, shape: &Shape) -> Vec<T> {
        let mut out = Vec::new();
        self.retrieve_into(shape, &mut out);
        out
    }

    /// Candidates overlapping the circle centered at `center` with `radius`.
    #[must_use]
    pub fn retrieve_in_range(&self, center: Vec2, radius: f32) -> Vec<T> {
        self.retrieve(&Shape::Circle(Circle::new(center, radius)))
    }

    /// Writes candidates overlapping the query shape into `out`.
    ///
    /// `out` is cleared first.
    pub fn retrieve_into(&self, shape: &Shape, out: &mut Vec<T>) {
        out.clear();
        let query = shape.bounds().clamped_to(&self.nodes[ROOT].bounds);
        let mut stack = vec![ROOT];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            out.extend(
                node.entries
                    .iter()
                    .filter(|entry| entry.bounds.overlaps(&query))
                    .map(|entry| entry.handle),
            );
            if let Some(children) = node.children {
                stack.extend(
                    children
                        .into_iter()
                        .filter(|child| self.nodes[*child].bounds.overlaps(&query)),
                );
            }
        }
        out.sort_unstable();
        out.dedup();
    }

    fn insert_at(&mut self, index: usize, entry: Entry<T>) {
        if let Some(children) = self.nodes[index].children {
            for child in children {
                if self.nodes[child].bounds.overlaps(&entry.bounds) {
                    self.insert_at(child, entry);
                }
            }
            return;
        }

        let node = &mut self.nodes[index];
        node.entries.push(entry);
        if node.entries.len() > self.config.capacity && node.depth < self.config.max_depth {
            self.split(index);
        }
    }

    fn split(&mut self, index: usize) {
        let quadrants = self.nodes[index].bounds.quadrants();
        let depth = self.nodes[index].depth + 1;
        let mut children = [ROOT; 4];
        for (slot, bounds) in children.iter_mut().zip(quadrants) {
            *slot = self.allocate(bounds, depth);
        }
        self.nodes[index].children = Some(children);

        let mut pending = std::mem::take(&mut self.scratch);
        std::mem::swap(&mut pending, &mut self.nodes[index].entries);
        for entry in pending.drain(..) {
            self.insert_at(index, entry);
        }
        self.scratch = pending;
    }

    fn allocate(&mut self, bounds: Rect, depth: u32) -> usize {
        if let Some(index) = self.free.pop() {
            let node = &mut self.nodes[index];
            node.bounds = bounds;
            node.depth = depth;
            return index;
        }
        self.nodes.push(Node {
            bounds,
            depth,
            entries: Vec::new(),
            children: None,
        });
        self.nodes.len() - 1
    }

    fn release(&mut self, index: usize) {
        if let Some(children) = self.nodes[index].children.take() {
            for child in children {
                self.release(child);
            }
        }
        self.nodes[index].entries.clear();
        self.free.push(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn world() -> Rect {
        Rect::from_size(1_000.0, 1_000.0)
    }

    fn tree() -> Quadtree<u32> {
        Quadtree::new(
            world(),
            QuadtreeConfig {
                capacity: 2,
                max_depth: 4,
            },
        )
    }

    #[test]
    fn split_happens_once_capacity_is_exceeded() {
        let mut tree = tree();
        tree.insert_circle(1, Circle::new(Vec2::new(100.0, 100.0), 5.0));
        tree.insert_circle(2, Circle::new(Vec2::new(900.0, 100.0), 5.0));
        assert_eq!(tree.node_count(), 1);

        tree.insert_circle(3, Circle::new(Vec2::new(100.0, 900.0), 5.0));
        assert_eq!(tree.node_count(), 5);
        assert_eq!(tree.retrieve_in_range(Vec2::new(100.0, 100.0), 10.0), vec![1]);
    }

    #[test]
    fn straddling_entries_are_duplicated_but_returned_once() {
        let mut tree = tree();
        for id in 0..3 {
            tree.insert_circle(id, Circle::new(Vec2::new(100.0 + id as f32, 100.0), 1.0));
        }
        tree.insert_circle(99, Circle::new(Vec2::new(500.0, 500.0), 20.0));

        for corner in [
            Vec2::new(490.0, 490.0),
            Vec2::new(510.0, 490.0),
            Vec2::new(490.0, 510.0),
            Vec2::new(510.0, 510.0),
        ] {
            assert!(tree.retrieve_in_range(corner, 1.0).contains(&99));
        }
        assert_eq!(tree.retrieve_in_range(Vec2::new(500.0, 500.0), 1.0), vec![99]);
    }

    #[test]
    fn clear_returns_nodes_to_the_pool() {
        let mut tree = tree();
        for id in 0..32 {
            let position = Vec2::new(30.0 * id as f32, 25.0 * id as f32);
            tree.insert_circle(id, Circle::new(position, 4.0));
        }
        let linked = tree.node_count();
        assert!(linked > 1);

        tree.clear();
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.pooled_nodes(), linked - 1);
        assert!(tree.is_empty());
        assert!(tree.retrieve_in_range(Vec2::new(500.0, 500.0), 1_000.0).is_empty());

        for id in 0..32 {
            let position = Vec2::new(30.0 * id as f32, 25.0 * id as f32);
            tree.insert_circle(id, Circle::new(position, 4.0));
        }
        assert_eq!(tree.node_count(), linked, "rebuild reuses pooled nodes");
        assert_eq!(tree.pooled_nodes(), 0);
    }

    #[test]
    fn entries_outside_the_world_are_kept() {
        let mut tree = tree();
        tree.insert_circle(7, Circle::new(Vec2::new(-500.0, -500.0), 5.0));
        for id in 0..8 {
            tree.insert_circle(id + 10, Circle::new(Vec2::new(10.0 * id as f32, 10.0), 1.0));
        }
        assert!(tree.retrieve_in_range(Vec2::new(-500.0, -500.0), 1.0).contains(&7));
    }

    #[test]
    fn segment_queries_follow_the_segment_bounds() {
        let mut tree = tree();
        tree.insert_circle(1, Circle::new(Vec2::new(100.0, 100.0), 5.0));
        tree.insert_circle(2, Circle::new(Vec2::new(800.0, 800.0), 5.0));
        tree.insert_circle(3, Circle::new(Vec2::new(800.0, 100.0), 5.0));

        let shape = Shape::Segment(bastion_core::Segment::new(
            Vec2::new(90.0, 90.0),
            Vec2::new(300.0, 300.0),
        ));
        assert_eq!(tree.retrieve(&shape), vec![1]);
    }

    proptest! {
        #[test]
        fn retrieve_in_range_never_misses_overlapping_circles(
            bodies in prop::collection::vec((0.0f32..1_000.0, 0.0f32..1_000.0, 1.0f32..40.0), 1..64),
            qx in -50.0f32..1_050.0,
            qy in -50.0f32..1_050.0,
            qr in 0.0f32..200.0,
        ) {
            let mut tree = tree();
            for (id, (x, y, r)) in bodies.iter().enumerate() {
                tree.insert_circle(id as u32, Circle::new(Vec2::new(*x, *y), *r));
            }

            let query = Circle::new(Vec2::new(qx, qy), qr);
            let candidates = tree.retrieve_in_range(query.center, query.radius);
            for (id, (x, y, r)) in bodies.iter().enumerate() {
                if query.overlaps_circle(&Circle::new(Vec2::new(*x, *y), *r)) {
                    prop_assert!(candidates.contains(&(id as u32)));
                }
            }
        }
    }
}
