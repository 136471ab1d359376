// Boundary operator shared by every solver stage

use crate::sim::{field::Field, obstacles::ObstacleSet};

/// How border and obstacle-skin samples of a field are rewritten.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryKind {
    /// Density or pressure; copied across every wall
    Scalar,
    /// The x velocity component; negated across walls whose normal is along x
    VelocityX,
    /// The y velocity component; negated across walls whose normal is along y
    VelocityY,
    /// Opposite edges wrap onto each other
    Periodic,
    /// Every border sample is zero
    Absorbing,
}

impl BoundaryKind {
    /// Value written on the far side of a wall whose normal is along x
    #[inline]
    pub fn mirror_x(self, value: f32) -> f32 {
        if self == BoundaryKind::VelocityX {
            -value
        } else {
            value
        }
    }

    /// Value written on the far side of a wall whose normal is along y
    #[inline]
    pub fn mirror_y(self, value: f32) -> f32 {
        if self == BoundaryKind::VelocityY {
            -value
        } else {
            value
        }
    }
}

/// Apply the boundary condition `kind` to the border of `field`, then to
/// the skin of every obstacle.
///
/// Periodic and absorbing borders skip the obstacle pass.
pub fn set_bnd(obstacles: &ObstacleSet, kind: BoundaryKind, field: &mut Field) {
    let (nx, ny) = field.shape();

    match kind {
        BoundaryKind::Periodic => {
            for i in 1..nx - 1 {
                field.set(i, 0, field.get(i, ny - 2));
                field.set(i, ny - 1, field.get(i, 1));
            }
            for j in 1..ny - 1 {
                field.set(0, j, field.get(nx - 2, j));
                field.set(nx - 1, j, field.get(1, j));
            }
            blend_corners(field);
            return;
        }
        BoundaryKind::Absorbing => {
            for i in 1..nx - 1 {
                field.set(i, 0, 0.);
                field.set(i, ny - 1, 0.);
            }
            for j in 1..ny - 1 {
                field.set(0, j, 0.);
                field.set(nx - 1, j, 0.);
            }
            blend_corners(field);
            return;
        }
        BoundaryKind::Scalar | BoundaryKind::VelocityX | BoundaryKind::VelocityY => {
            for i in 1..nx - 1 {
                field.set(i, 0, kind.mirror_y(field.get(i, 1)));
                field.set(i, ny - 1, kind.mirror_y(field.get(i, ny - 2)));
            }
            for j in 1..ny - 1 {
                field.set(0, j, kind.mirror_x(field.get(1, j)));
                field.set(nx - 1, j, kind.mirror_x(field.get(nx - 2, j)));
            }
            blend_corners(field);
        }
    }

    obstacles.apply_boundaries(kind, field);
}

/// Set each grid corner to the mean of its two edge neighbours
fn blend_corners(field: &mut Field) {
    let (nx, ny) = field.shape();

    field.set(0, 0, 0.5 * (field.get(1, 0) + field.get(0, 1)));
    field.set(0, ny - 1, 0.5 * (field.get(1, ny - 1) + field.get(0, ny - 2)));
    field.set(nx - 1, 0, 0.5 * (field.get(nx - 2, 0) + field.get(nx - 1, 1)));
    field.set(
        nx - 1,
        ny - 1,
        0.5 * (field.get(nx - 2, ny - 1) + field.get(nx - 1, ny - 2)),
    );
}
