//! # Uniform Collision Grid
//!
//! The level is split into equal cubic cells. Each cell stores indices of
//! the broadphase candidates whose world bounds touch it, so the narrowphase
//! only tests objects that share a cell.
//!
//! An AABB maps to the inclusive cell range
//! `floor((min - origin) / cell) ..= floor((max - origin) / cell)`, clamped to
//! the grid. Objects outside the level land in the border cells.

use kestrel_core::{Aabb, Vec3};

use crate::error::GridError;

/// Upper bound on the number of cells in one grid.
pub const MAX_GRID_CELLS: usize = 1 << 21;

/// Inclusive range of cell coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridBounds {
    /// Lowest cell on each axis.
    pub min: [usize; 3],
    /// Highest cell on each axis.
    pub max: [usize; 3],
}

impl GridBounds {
    /// Number of cells covered.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        (0..3).map(|axis| self.max[axis] - self.min[axis] + 1).product()
    }
}

/// Cells of candidate indices over the level bounds.
#[derive(Clone, Debug)]
pub struct CollisionGrid {
    bounds: Aabb,
    cell_size: f32,
    dims: [usize; 3],
    cells: Vec<Vec<u32>>,
}

impl CollisionGrid {
    /// Creates a grid over `bounds` with cubic cells of edge `cell_size`.
    ///
    /// # Errors
    ///
    /// Non-positive or non-finite cell size, bounds without volume, or more
    /// than [`MAX_GRID_CELLS`] cells.
    pub fn new(bounds: Aabb, cell_size: f32) -> Result<Self, GridError> {
        let (dims, total) = Self::layout(&bounds, cell_size)?;
        Ok(Self {
            bounds,
            cell_size,
            dims,
            cells: vec![Vec::new(); total],
        })
    }

    /// Number of cells a grid over `bounds` would have, without building it.
    ///
    /// # Errors
    ///
    /// Same as [`CollisionGrid::new`].
    pub fn cell_count_for(bounds: &Aabb, cell_size: f32) -> Result<usize, GridError> {
        Self::layout(bounds, cell_size).map(|(_, total)| total)
    }

    fn layout(bounds: &Aabb, cell_size: f32) -> Result<([usize; 3], usize), GridError> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(GridError::InvalidCellSize(cell_size));
        }
        if !bounds.is_valid() {
            return Err(GridError::EmptyBounds);
        }

        let size = bounds.size();
        let mut dims = [1usize; 3];
        for (axis, dim) in dims.iter_mut().enumerate() {
            // Float-to-int cast saturates; the value is positive here.
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let cells = (size.axis(axis) / cell_size).ceil() as usize;
            *dim = cells.max(1);
        }
        let total = dims
            .iter()
            .try_fold(1usize, |total, &dim| total.checked_mul(dim))
            .filter(|&total| total <= MAX_GRID_CELLS)
            .ok_or(GridError::TooManyCells {
                dims,
                max: MAX_GRID_CELLS,
            })?;
        Ok((dims, total))
    }

    /// Sizes cells so that `expected_population` objects spread over the
    /// level average roughly one object per cell.
    ///
    /// # Errors
    ///
    /// Bounds without volume.
    pub fn from_expected_population(
        bounds: Aabb,
        expected_population: usize,
    ) -> Result<Self, GridError> {
        if !bounds.is_valid() {
            return Err(GridError::EmptyBounds);
        }
        // Smallest k with k^3 >= population.
        let mut per_axis = 1usize;
        while per_axis.saturating_pow(3) < expected_population {
            per_axis += 1;
        }
        let size = bounds.size();
        let longest = size.x.max(size.y).max(size.z);
        #[allow(clippy::cast_precision_loss)]
        let cell_size = longest / per_axis as f32;
        Self::new(bounds, cell_size)
    }

    /// Level bounds covered by the grid.
    #[inline]
    #[must_use]
    pub const fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Cell edge length.
    #[inline]
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Cells along each axis.
    #[inline]
    #[must_use]
    pub const fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Total number of cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Cell range touched by a world-space box.
    #[must_use]
    pub fn world_bounds_to_grid_bounds(&self, bounds: &Aabb) -> GridBounds {
        GridBounds {
            min: self.cell_coords(bounds.min),
            max: self.cell_coords(bounds.max),
        }
    }

    fn cell_coords(&self, point: Vec3) -> [usize; 3] {
        let mut coords = [0usize; 3];
        for (axis, coord) in coords.iter_mut().enumerate() {
            let offset = (point.axis(axis) - self.bounds.min.axis(axis)) / self.cell_size;
            let last = self.dims[axis] - 1;
            *coord = if offset.is_nan() || offset <= 0.0 {
                0
            } else {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let cell = offset.floor() as usize;
                cell.min(last)
            };
        }
        coords
    }

    /// Flat index of a cell.
    #[inline]
    #[must_use]
    pub fn cell_index(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.dims[0] * (y + self.dims[1] * z)
    }

    /// Candidates stored in one cell.
    #[must_use]
    pub fn cell(&self, index: usize) -> &[u32] {
        self.cells.get(index).map_or(&[], Vec::as_slice)
    }

    /// Non-empty cells.
    pub fn occupied_cells(&self) -> impl Iterator<Item = &[u32]> + '_ {
        self.cells.iter().filter(|cell| !cell.is_empty()).map(Vec::as_slice)
    }

    /// Adds `candidate` to every cell of `range`.
    pub fn insert(&mut self, range: GridBounds, candidate: u32) {
        for z in range.min[2]..=range.max[2] {
            for y in range.min[1]..=range.max[1] {
                for x in range.min[0]..=range.max[0] {
                    let index = self.cell_index(x, y, z);
                    self.cells[index].push(candidate);
                }
            }
        }
    }

    /// Empties every cell, keeping allocations.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
    }
}
