// Axis-aligned rigid obstacles embedded in the grid

use std::ops::RangeInclusive;

use thiserror::Error;

use crate::sim::{boundary::BoundaryKind, field::Field};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObstacleError {
    #[error("segment endpoint {point:?} must lie at least two cells inside the {grid:?} grid")]
    OutOfBounds {
        point: (usize, usize),
        grid: (usize, usize),
    },

    #[error("segment {a:?}-{b:?} is neither horizontal nor vertical")]
    NotAxisAligned { a: (usize, usize), b: (usize, usize) },

    #[error("segment {a:?}-{b:?} with thickness {thickness} does not fit inside the {grid:?} grid")]
    FootprintExceedsGrid {
        a: (usize, usize),
        b: (usize, usize),
        thickness: usize,
        grid: (usize, usize),
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    /// Runs along x; thickness extends towards +y
    Horizontal,
    /// Runs along y; thickness extends towards +x
    Vertical,
}

/// An immovable obstacle spanning `a`..=`b` along one axis and extruded by
/// `thickness` cells along the other.
///
/// `a` is always the endpoint with the smaller coordinate along the
/// segment's axis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    a: (usize, usize),
    b: (usize, usize),
    thickness: usize,
    orientation: Orientation,
}

impl Segment {
    /// Validate and build a segment on a grid of `grid = (nx, ny)` cells
    ///
    /// Parameters
    /// - `grid` - The (width, height) of the fields the segment lives in
    /// - `a` - One endpoint, as (x, y)
    /// - `b` - The other endpoint, as (x, y)
    /// - `thickness` - How many cells the solid extends past the endpoints' line
    pub fn new(
        grid: (usize, usize),
        a: (usize, usize),
        b: (usize, usize),
        thickness: usize,
    ) -> Result<Self, ObstacleError> {
        let (nx, ny) = grid;
        let inside = |(x, y): (usize, usize)| {
            (2..nx.saturating_sub(1)).contains(&x) && (2..ny.saturating_sub(1)).contains(&y)
        };

        for point in [a, b] {
            if !inside(point) {
                return Err(ObstacleError::OutOfBounds { point, grid });
            }
        }

        let orientation = if a.1 == b.1 {
            Orientation::Horizontal
        } else if a.0 == b.0 {
            Orientation::Vertical
        } else {
            return Err(ObstacleError::NotAxisAligned { a, b });
        };

        let a_is_min = match orientation {
            Orientation::Horizontal => a.0 < b.0,
            Orientation::Vertical => a.1 < b.1,
        };
        let (lo, hi) = if a_is_min { (a, b) } else { (b, a) };

        // the patch reads one cell past the skin on every side
        let extruded_below = |start: usize, n: usize| {
            start.checked_add(thickness).is_some_and(|end| end < n - 2)
        };
        let fits = match orientation {
            Orientation::Horizontal => extruded_below(hi.1, ny) && hi.0 < nx - 2,
            Orientation::Vertical => extruded_below(hi.0, nx) && hi.1 < ny - 2,
        };
        if !fits {
            return Err(ObstacleError::FootprintExceedsGrid {
                a,
                b,
                thickness,
                grid,
            });
        }

        Ok(Segment {
            a: lo,
            b: hi,
            thickness,
            orientation,
        })
    }

    pub fn a(&self) -> (usize, usize) {
        self.a
    }

    pub fn b(&self) -> (usize, usize) {
        self.b
    }

    pub fn thickness(&self) -> usize {
        self.thickness
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// The solid cells of the obstacle as inclusive (x, y) ranges
    pub fn solid_bounds(&self) -> (RangeInclusive<usize>, RangeInclusive<usize>) {
        let ((ax, ay), (bx, by)) = (self.a, self.b);
        match self.orientation {
            Orientation::Horizontal => (ax..=bx, ay..=ay + self.thickness),
            Orientation::Vertical => (ax..=ax + self.thickness, ay..=by),
        }
    }

    /// Whether `(i, j)` is in the solid or in the one-cell skin around it
    #[inline]
    pub fn contains(&self, i: usize, j: usize) -> bool {
        let (xs, ys) = self.solid_bounds();
        i + 1 >= *xs.start() && i <= xs.end() + 1 && j + 1 >= *ys.start() && j <= ys.end() + 1
    }

    /// Rewrite the skin of the obstacle in `field` the way the outer grid
    /// walls are handled, and clear the solid.
    pub fn apply_boundary(&self, kind: BoundaryKind, field: &mut Field) {
        let (xs, ys) = self.solid_bounds();
        let (x0, x1) = (*xs.start(), *xs.end());
        let (y0, y1) = (*ys.start(), *ys.end());

        // faces normal to y
        for i in xs.clone() {
            field.set(i, y1 + 1, kind.mirror_y(field.get(i, y1 + 2)));
            for j in ys.clone() {
                field.set(i, j, 0.);
            }
            field.set(i, y0 - 1, kind.mirror_y(field.get(i, y0 - 2)));
        }

        // faces normal to x
        for j in ys {
            field.set(x0 - 1, j, kind.mirror_x(field.get(x0 - 2, j)));
            field.set(x1 + 1, j, kind.mirror_x(field.get(x1 + 2, j)));
        }

        // skin corners
        field.set(
            x0 - 1,
            y1 + 1,
            0.5 * (field.get(x0 - 1, y1) + field.get(x0, y1 + 1)),
        );
        field.set(
            x0 - 1,
            y0 - 1,
            0.5 * (field.get(x0 - 1, y0) + field.get(x0, y0 - 1)),
        );
        field.set(
            x1 + 1,
            y1 + 1,
            0.5 * (field.get(x1 + 1, y1) + field.get(x1, y1 + 1)),
        );
        field.set(
            x1 + 1,
            y0 - 1,
            0.5 * (field.get(x1 + 1, y0) + field.get(x1, y0 - 1)),
        );
    }
}
