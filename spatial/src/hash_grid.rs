//! Uniform hash grid for moving bodies.
//!
//! Every body is binned into each cell its bounding box touches. Cell
//! coordinates come from floor division, so negative positions bin correctly,
//! and cell keys add a fixed margin to both axes before flattening:
//!
//! `key = (cell_y + margin) * columns + (cell_x + margin)`
//!
//! where `columns` spans the world plus the margin on both sides. Inside the
//! margin every key is unique and non-negative. Further out, keys may alias
//! another cell; aliasing only adds broad-phase candidates, it never hides a
//! body from a query covering its cells.
//!
//! Queries whose box covers more cells than there are indexed bodies test each
//! body's recorded cell span against the box instead of walking cell by cell,
//! so a query's cost is bounded by the population as well as by its extent.

use std::{collections::HashMap, hash::Hash};

use glam::Vec2;

use crate::pool::VecPool;

type CellKey = i64;

/// Inclusive range of cell coordinates covered by a box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CellSpan {
    low: (i64, i64),
    high: (i64, i64),
}

impl CellSpan {
    fn cell_count(&self) -> u128 {
        let extent = |low: i64, high: i64| (i128::from(high) - i128::from(low) + 1).max(0) as u128;
        extent(self.low.0, self.high.0).saturating_mul(extent(self.low.1, self.high.1))
    }

    fn overlaps(&self, other: &CellSpan) -> bool {
        self.low.0 <= other.high.0
            && other.low.0 <= self.high.0
            && self.low.1 <= other.high.1
            && other.low.1 <= self.high.1
    }
}

#[derive(Debug)]
struct Membership {
    span: CellSpan,
    keys: Vec<CellKey>,
}

/// Hash grid indexing bodies of type `K` by covering cell set.
#[derive(Debug)]
pub struct HashGrid<K> {
    cell_size: f32,
    margin: i64,
    columns: i64,
    cells: HashMap<CellKey, Vec<K>>,
    memberships: HashMap<K, Membership>,
    pool: VecPool<CellKey>,
    scratch: Vec<CellKey>,
}

impl<K: Copy + Eq + Hash + Ord> HashGrid<K> {
    /// Creates an empty grid for a world `world_width` units wide.
    ///
    /// `margin_cells` extra columns and rows on every side keep keys unique
    /// for bodies that wander outside the world.
    #[must_use]
    pub fn new(world_width: f32, cell_size: f32, margin_cells: u32) -> Self {
        let cell_size = if cell_size > 0.0 && cell_size.is_finite() {
            cell_size
        } else {
            1.0
        };
        let world_columns = (world_width.max(0.0) / cell_size).ceil().max(1.0) as i64;
        let margin = i64::from(margin_cells);
        Self {
            cell_size,
            margin,
            columns: world_columns + 2 * margin,
            cells: HashMap::new(),
            memberships: HashMap::new(),
            pool: VecPool::default(),
            scratch: Vec::new(),
        }
    }

    /// Side length of a cell.
    #[must_use]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of indexed bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.memberships.len()
    }

    /// Reports whether the grid indexes no bodies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.memberships.is_empty()
    }

    /// Reports whether the body is indexed.
    #[must_use]
    pub fn contains(&self, handle: K) -> bool {
        self.memberships.contains_key(&handle)
    }

    /// Cell keys currently recorded for the body, in ascending order.
    #[must_use]
    pub fn cells_of(&self, handle: K) -> Option<&[i64]> {
        self.memberships
            .get(&handle)
            .map(|membership| membership.keys.as_slice())
    }

    /// Number of cells holding at least one body.
    #[must_use]
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    /// Indexes a body. Inserting a known body updates it instead.
    pub fn insert(&mut self, handle: K, center: Vec2, radius: f32) {
        if self.memberships.contains_key(&handle) {
            self.update(handle, center, radius);
            return;
        }

        let mut keys = self.pool.take();
        let span = self.covered_keys(center, radius, &mut keys);
        for key in &keys {
            self.cells.entry(*key).or_default().push(handle);
        }
        let _ = self.memberships.insert(handle, Membership { span, keys });
    }

    /// Moves a body to its new cell set.
    ///
    /// Only vacated cells lose the body and only newly entered cells gain it;
    /// an unchanged cell set touches nothing. Unknown bodies are inserted.
    pub fn update(&mut self, handle: K, center: Vec2, radius: f32) {
        let mut next = std::mem::take(&mut self.scratch);
        let span = self.covered_keys(center, radius, &mut next);

        let Some(current) = self.memberships.get_mut(&handle) else {
            self.scratch = next;
            self.insert(handle, center, radius);
            return;
        };

        current.span = span;
        if current.keys == next {
            self.scratch = next;
            return;
        }

        for key in current
            .keys
            .iter()
            .filter(|key| next.binary_search(key).is_err())
        {
            detach(&mut self.cells, *key, handle);
        }
        for key in next
            .iter()
            .filter(|key| current.keys.binary_search(key).is_err())
        {
            self.cells.entry(*key).or_default().push(handle);
        }

        std::mem::swap(&mut current.keys, &mut next);
        next.clear();
        self.scratch = next;
    }

    /// Removes a body. Returns `false` when the body was not indexed.
    pub fn remove(&mut self, handle: K) -> bool {
        let Some(membership) = self.memberships.remove(&handle) else {
            return false;
        };
        for key in &membership.keys {
            detach(&mut self.cells, *key, handle);
        }
        self.pool.give(membership.keys);
        true
    }

    /// Removes every body for which `keep` returns `false`.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(K) -> bool,
    {
        let mut doomed: Vec<K> = self
            .memberships
            .keys()
            .copied()
            .filter(|handle| !keep(*handle))
            .collect();
        doomed.sort_unstable();
        for handle in doomed {
            let _ = self.remove(handle);
        }
    }

    /// Distinct bodies binned in any cell the query box touches, sorted.
    ///
    /// An infinite `radius` covers every indexed body.
    #[must_use]
    pub fn query_range(&self, center: Vec2, radius: f32) -> Vec<K> {
        let mut out = Vec::new();
        self.query_range_into(center, radius, &mut out);
        out
    }

    /// Writes the result of [`HashGrid::query_range`] into `out`.
    ///
    /// `out` is cleared first.
    pub fn query_range_into(&self, center: Vec2, radius: f32, out: &mut Vec<K>) {
        out.clear();
        if !center.is_finite() || radius.is_nan() {
            log::warn!("non-finite grid query {center:?} r={radius}, querying at the origin");
        }
        let radius = if radius.is_nan() { 0.0 } else { radius.abs() };
        let center = finite_or_origin(center);
        let span = self.cell_span(center, radius);

        if span.cell_count() > self.memberships.len() as u128 {
            out.extend(
                self.memberships
                    .iter()
                    .filter(|(_, membership)| membership.span.overlaps(&span))
                    .map(|(handle, _)| *handle),
            );
        } else {
            for cell_y in span.low.1..=span.high.1 {
                for cell_x in span.low.0..=span.high.0 {
                    if let Some(handles) = self.cells.get(&self.key(cell_x, cell_y)) {
                        out.extend_from_slice(handles);
                    }
                }
            }
        }
        out.sort_unstable();
        out.dedup();
    }

    fn covered_keys(&self, center: Vec2, radius: f32, out: &mut Vec<CellKey>) -> CellSpan {
        out.clear();
        if !center.is_finite() || !radius.is_finite() {
            log::warn!("non-finite grid input {center:?} r={radius}, binning at the origin");
        }
        let radius = if radius.is_finite() { radius.abs() } else { 0.0 };
        let span = self.cell_span(finite_or_origin(center), radius);
        for cell_y in span.low.1..=span.high.1 {
            for cell_x in span.low.0..=span.high.0 {
                out.push(self.key(cell_x, cell_y));
            }
        }
        out.sort_unstable();
        out.dedup();
        span
    }

    /// Cells touched by the box around `center`. Coordinates saturate, so an
    /// infinite radius spans every representable cell.
    fn cell_span(&self, center: Vec2, radius: f32) -> CellSpan {
        CellSpan {
            low: (
                self.cell_coord(center.x - radius),
                self.cell_coord(center.y - radius),
            ),
            high: (
                self.cell_coord(center.x + radius),
                self.cell_coord(center.y + radius),
            ),
        }
    }

    fn cell_coord(&self, value: f32) -> i64 {
        (value / self.cell_size).floor() as i64
    }

    fn key(&self, cell_x: i64, cell_y: i64) -> CellKey {
        cell_y
            .wrapping_add(self.margin)
            .wrapping_mul(self.columns)
            .wrapping_add(cell_x.wrapping_add(self.margin))
    }
}

fn finite_or_origin(center: Vec2) -> Vec2 {
    if center.is_finite() {
        center
    } else {
        Vec2::ZERO
    }
}

fn detach<K: Copy + Eq + Hash>(cells: &mut HashMap<CellKey, Vec<K>>, key: CellKey, handle: K) {
    let Some(handles) = cells.get_mut(&key) else {
        return;
    };
    if let Some(position) = handles.iter().position(|candidate| *candidate == handle) {
        let _ = handles.swap_remove(position);
    }
    if handles.is_empty() {
        let _ = cells.remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grid() -> HashGrid<u32> {
        HashGrid::new(1_000.0, 64.0, 4)
    }

    #[test]
    fn finds_inserted_body_and_nothing_far_away() {
        let mut grid = grid();
        grid.insert(1, Vec2::new(10.0, 10.0), 5.0);

        assert_eq!(grid.query_range(Vec2::new(10.0, 10.0), 1.0), vec![1]);
        assert!(grid.query_range(Vec2::new(1_000.0, 1_000.0), 1.0).is_empty());
    }

    #[test]
    fn body_spanning_cells_is_reported_once() {
        let mut grid = grid();
        grid.insert(3, Vec2::new(64.0, 64.0), 10.0);
        assert_eq!(grid.cells_of(3).map(<[i64]>::len), Some(4));
        assert_eq!(grid.query_range(Vec2::new(64.0, 64.0), 100.0), vec![3]);
    }

    #[test]
    fn large_bodies_cover_proportionally_many_cells() {
        let mut grid = grid();
        grid.insert(5, Vec2::new(320.0, 320.0), 150.0);
        // 170..=470 spans cells 2..=7 on both axes.
        assert_eq!(grid.cells_of(5).map(<[i64]>::len), Some(36));
    }

    #[test]
    fn negative_coordinates_bin_by_floor_division() {
        let mut grid = grid();
        grid.insert(7, Vec2::new(-10.0, -10.0), 2.0);
        grid.insert(8, Vec2::new(10.0, 10.0), 2.0);

        assert_eq!(grid.query_range(Vec2::new(-5.0, -5.0), 1.0), vec![7]);
        assert_eq!(grid.query_range(Vec2::new(5.0, 5.0), 1.0), vec![8]);
    }

    #[test]
    fn bodies_beyond_the_margin_are_still_found() {
        let mut grid = grid();
        let far = Vec2::new(-5_000.0, 9_000.0);
        grid.insert(9, far, 3.0);
        assert!(grid.query_range(far, 1.0).contains(&9));
    }

    #[test]
    fn update_moves_membership_incrementally() {
        let mut grid = grid();
        grid.insert(1, Vec2::new(10.0, 10.0), 5.0);
        grid.insert(2, Vec2::new(20.0, 20.0), 5.0);

        grid.update(1, Vec2::new(500.0, 500.0), 5.0);
        assert_eq!(grid.query_range(Vec2::new(10.0, 10.0), 1.0), vec![2]);
        assert_eq!(grid.query_range(Vec2::new(500.0, 500.0), 5.0), vec![1]);
        assert_eq!(grid.occupied_cells(), 2);
    }

    #[test]
    fn repeated_update_without_motion_is_idempotent() {
        let mut grid = grid();
        grid.insert(4, Vec2::new(100.0, 100.0), 40.0);
        grid.update(4, Vec2::new(130.0, 90.0), 40.0);
        let first = grid.cells_of(4).map(<[i64]>::to_vec);
        let occupied = grid.occupied_cells();

        grid.update(4, Vec2::new(130.0, 90.0), 40.0);
        assert_eq!(grid.cells_of(4).map(<[i64]>::to_vec), first);
        assert_eq!(grid.occupied_cells(), occupied);
    }

    #[test]
    fn double_removal_is_a_no_op() {
        let mut grid = grid();
        grid.insert(1, Vec2::new(10.0, 10.0), 5.0);
        assert!(grid.remove(1));
        assert!(!grid.remove(1));
        assert!(!grid.remove(42));
        assert!(grid.is_empty());
        assert_eq!(grid.occupied_cells(), 0);
    }

    #[test]
    fn retain_drops_rejected_bodies() {
        let mut grid = grid();
        for id in 0..6 {
            grid.insert(id, Vec2::new(50.0 * id as f32, 0.0), 2.0);
        }
        grid.retain(|id| id % 2 == 0);
        assert_eq!(grid.len(), 3);
        assert!(grid.contains(4));
        assert!(!grid.contains(5));
    }

    #[test]
    fn non_finite_input_does_not_corrupt_the_grid() {
        let mut grid = grid();
        grid.insert(1, Vec2::new(f32::NAN, 3.0), f32::INFINITY);
        assert!(grid.contains(1));
        assert!(grid.remove(1));
    }

    #[test]
    fn huge_radius_query_scans_bodies_not_cells() {
        let mut grid = grid();
        grid.insert(1, Vec2::new(300.0, 300.0), 5.0);
        grid.insert(2, Vec2::new(900.0, 40.0), 5.0);

        // Roughly 4e7 cells per axis; a cell-by-cell walk would never finish.
        assert_eq!(grid.query_range(Vec2::new(500.0, 500.0), 2.0e9), vec![1, 2]);
        assert_eq!(grid.query_range(Vec2::new(500.0, 500.0), 1.0e30), vec![1, 2]);
    }

    #[test]
    fn infinite_radius_query_reports_every_body() {
        let mut grid = grid();
        grid.insert(1, Vec2::new(300.0, 300.0), 5.0);
        grid.insert(2, Vec2::new(-4_000.0, 7_000.0), 5.0);

        assert_eq!(grid.query_range(Vec2::new(10.0, 10.0), f32::INFINITY), vec![1, 2]);
        assert_eq!(grid.query_range(Vec2::new(10.0, 10.0), f32::NEG_INFINITY), vec![1, 2]);
    }

    #[test]
    fn wide_queries_still_skip_bodies_outside_the_box() {
        let mut grid = grid();
        grid.insert(1, Vec2::new(100.0, 100.0), 5.0);
        grid.insert(2, Vec2::new(900.0, 900.0), 5.0);

        // 300 units around (100, 100) covers far more cells than two bodies.
        assert_eq!(grid.query_range(Vec2::new(100.0, 100.0), 300.0), vec![1]);
        grid.update(2, Vec2::new(150.0, 150.0), 5.0);
        assert_eq!(grid.query_range(Vec2::new(100.0, 100.0), 300.0), vec![1, 2]);
    }

    #[test]
    fn nan_query_radius_falls_back_to_a_point() {
        let mut grid = grid();
        grid.insert(1, Vec2::new(10.0, 10.0), 5.0);
        grid.insert(2, Vec2::new(800.0, 800.0), 5.0);
        assert_eq!(grid.query_range(Vec2::new(10.0, 10.0), f32::NAN), vec![1]);
    }

    proptest! {
        #[test]
        fn moved_bodies_are_found_at_their_new_position(
            start in (-200.0f32..1_200.0, -200.0f32..1_200.0),
            end in (-200.0f32..1_200.0, -200.0f32..1_200.0),
            radius in 0.5f32..150.0,
            extra in 0.0f32..50.0,
        ) {
            let mut grid = grid();
            grid.insert(1, Vec2::new(start.0, start.1), radius);
            let destination = Vec2::new(end.0, end.1);
            grid.update(1, destination, radius);

            prop_assert!(grid.query_range(destination, radius + extra).contains(&1));

            prop_assert!(grid.remove(1));
            prop_assert!(grid.query_range(destination, radius + extra).is_empty());
        }
    }
}
