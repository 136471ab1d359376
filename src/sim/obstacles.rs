// Collection of the obstacles placed in a simulation

use std::collections::VecDeque;

use na::DMatrix;

use crate::sim::{
    boundary::BoundaryKind,
    field::Field,
    segment::{ObstacleError, Segment},
};

/// Every obstacle of a grid, newest first.
#[derive(Clone, Debug, Default)]
pub struct ObstacleSet {
    width: usize,
    height: usize,
    segments: VecDeque<Segment>,
}

impl ObstacleSet {
    /// Create an empty set for fields of `width` x `height` cells
    pub fn new(width: usize, height: usize) -> Self {
        ObstacleSet {
            width,
            height,
            segments: VecDeque::new(),
        }
    }

    /// (width, height) of the grid the segments are validated against
    pub fn grid(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Validate a new segment against the grid and place it at the front of the set
    pub fn add_segment(
        &mut self,
        a: (usize, usize),
        b: (usize, usize),
        thickness: usize,
    ) -> Result<&Segment, ObstacleError> {
        let segment = Segment::new(self.grid(), a, b, thickness)?;
        self.segments.push_front(segment);
        Ok(&self.segments[0])
    }

    /// Remove every segment
    pub fn reset(&mut self) {
        self.segments.clear();
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether `(i, j)` lies in any obstacle or its skin
    #[inline]
    pub fn contains(&self, i: usize, j: usize) -> bool {
        self.segments.iter().any(|segment| segment.contains(i, j))
    }

    /// Patch the skin of every obstacle in `field`
    pub fn apply_boundaries(&self, kind: BoundaryKind, field: &mut Field) {
        for segment in &self.segments {
            segment.apply_boundary(kind, field);
        }
    }

    /// A boolean image of the obstacles: rows are y, columns are x
    pub fn mask(&self) -> DMatrix<bool> {
        DMatrix::from_fn(self.height, self.width, |j, i| self.contains(i, j))
    }
}
