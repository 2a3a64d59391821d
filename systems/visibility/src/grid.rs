//! Cached classification of world cells against the static sources.

use bastion_core::{Circle, Rect};
use glam::Vec2;

/// Cached answer for one cell of a [`VisibilityGrid`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellState {
    /// Not classified since the last invalidation.
    Unknown,
    /// A single source covers the whole cell.
    Visible,
    /// No source reaches any part of the cell.
    Hidden,
    /// Sources cover part of the cell; points need an exact check.
    Mixed,
}

/// Visibility cache for queries of one radius.
///
/// Sources are expanded by the query radius, so a circle query reduces to a
/// point test on its center.
#[derive(Clone, Debug)]
pub(crate) struct VisibilityGrid {
    reach: f32,
    origin: Vec2,
    far_corner: Vec2,
    cell_size: f32,
    columns: usize,
    rows: usize,
    cells: Vec<CellState>,
}

impl VisibilityGrid {
    pub(crate) fn new(bounds: Rect, cell_size: f32, reach: f32) -> Self {
        let columns = (bounds.width() / cell_size).ceil().max(1.0) as usize;
        let rows = (bounds.height() / cell_size).ceil().max(1.0) as usize;
        Self {
            reach,
            origin: bounds.min(),
            far_corner: bounds.max(),
            cell_size,
            columns,
            rows,
            cells: vec![CellState::Unknown; columns * rows],
        }
    }

    fn index(&self, point: Vec2) -> Option<usize> {
        if !point.is_finite()
            || point.x < self.origin.x
            || point.y < self.origin.y
            || point.x > self.far_corner.x
            || point.y > self.far_corner.y
        {
            return None;
        }
        let local = (point - self.origin) / self.cell_size;
        let column = (local.x as usize).min(self.columns - 1);
        let row = (local.y as usize).min(self.rows - 1);
        Some(row * self.columns + column)
    }

    fn cell_rect(&self, index: usize) -> Rect {
        let column = (index % self.columns) as f32;
        let row = (index / self.columns) as f32;
        let min = self.origin + Vec2::new(column, row) * self.cell_size;
        let max = (min + Vec2::splat(self.cell_size)).min(self.far_corner);
        Rect::new(min, max)
    }

    /// Cached state of the cell holding `point`, or `None` outside the grid.
    pub(crate) fn state_at(&self, point: Vec2) -> Option<CellState> {
        self.index(point).map(|index| self.cells[index])
    }

    /// Answers a point query, classifying the cell on first touch.
    ///
    /// The second value reports whether the cache settled the answer.
    pub(crate) fn lookup(&mut self, sources: &[Circle], point: Vec2) -> (bool, bool) {
        let Some(index) = self.index(point) else {
            return (reaches(sources, self.reach, point), false);
        };
        if self.cells[index] == CellState::Unknown {
            self.cells[index] = classify(sources, self.reach, &self.cell_rect(index));
        }
        match self.cells[index] {
            CellState::Visible => (true, true),
            CellState::Hidden => (false, true),
            CellState::Mixed | CellState::Unknown => (reaches(sources, self.reach, point), false),
        }
    }
}

fn classify(sources: &[Circle], reach: f32, cell: &Rect) -> CellState {
    let mut state = CellState::Hidden;
    for source in sources {
        let expanded = Circle::new(source.center, source.radius + reach);
        if expanded.covers_rect(cell) {
            return CellState::Visible;
        }
        if expanded.overlaps_rect(cell) {
            state = CellState::Mixed;
        }
    }
    state
}

/// Exact test: does any source, grown by `reach`, contain `point`?
pub(crate) fn reaches(sources: &[Circle], reach: f32, point: Vec2) -> bool {
    sources
        .iter()
        .any(|source| Circle::new(source.center, source.radius + reach).contains_point(point))
}
