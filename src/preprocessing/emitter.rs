use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::sim::solver::{FieldId, FluidSolver};

fn default_size() -> usize {
    10
}

/// A persistent source of density and momentum, painted into the solver's
/// source fields as a square centred on (x, y).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Emitter {
    pub x: usize,
    pub y: usize,

    /// Side of the square, in cells
    #[serde(default = "default_size")]
    pub size: usize,

    /// Density added per unit time
    #[serde(default)]
    pub density: f32,

    /// Velocity (x, y) added per unit time
    #[serde(default)]
    pub velocity: (f32, f32),
}

impl Emitter {
    /// The cells covered on a `grid = (width, height)` grid, clipped to the interior
    pub fn footprint(&self, grid: (usize, usize)) -> (Range<usize>, Range<usize>) {
        let (width, height) = grid;
        let half = self.size / 2;

        let clip = |centre: usize, n: usize| {
            let lo = centre.saturating_sub(half).max(1);
            let hi = centre.saturating_add(half).min(n - 1);
            lo..hi.max(lo)
        };

        (clip(self.x, width), clip(self.y, height))
    }

    /// Add this emitter to the source fields of `solver`, leaving obstacle cells alone
    pub fn apply(&self, solver: &mut FluidSolver) {
        let (xs, ys) = self.footprint(solver.shape());
        let (u, v) = self.velocity;

        for (id, value) in [
            (FieldId::DensitySource, self.density),
            (FieldId::VelocityXSource, u),
            (FieldId::VelocityYSource, v),
        ] {
            if value == 0. {
                continue;
            }
            for x in xs.clone() {
                for y in ys.clone() {
                    if solver.obstacles().contains(x, y) {
                        continue;
                    }
                    let field = solver.field_mut(id);
                    field.set(x, y, field.get(x, y) + value);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_footprint_is_centred() {
        let emitter = Emitter {
            x: 10,
            y: 12,
            size: 4,
            density: 1.,
            velocity: (0., 0.),
        };

        assert_eq!(emitter.footprint((30, 30)), (8..12, 10..14));
    }

    #[test]
    fn test_footprint_clips_to_interior() {
        let emitter = Emitter {
            x: 1,
            y: 28,
            size: 8,
            density: 1.,
            velocity: (0., 0.),
        };

        assert_eq!(emitter.footprint((30, 30)), (1..5, 24..29));
    }

    #[test]
    fn test_footprint_far_outside_is_empty() {
        let emitter = Emitter {
            x: usize::MAX,
            y: 5,
            size: 6,
            density: 1.,
            velocity: (0., 0.),
        };

        let (xs, ys) = emitter.footprint((20, 20));
        assert!(xs.is_empty());
        assert_eq!(ys, 2..8);

        let mut solver = FluidSolver::new(20, 20).unwrap();
        emitter.apply(&mut solver);
        assert_eq!(solver.field(FieldId::DensitySource).max_abs(), 0.);
    }

    #[test]
    fn test_apply_paints_sources() {
        let mut solver = FluidSolver::new(20, 20).unwrap();
        solver.obstacles_mut().add_segment((10, 4), (10, 8), 0).unwrap();

        let emitter = Emitter {
            x: 8,
            y: 12,
            size: 4,
            density: 2.,
            velocity: (0.5, -0.25),
        };
        emitter.apply(&mut solver);
        emitter.apply(&mut solver);

        let dens = solver.field(FieldId::DensitySource);
        assert_eq!(dens.get(6, 10), 4.);
        assert_eq!(dens.get(9, 13), 4.);
        assert_eq!(dens.get(10, 12), 0.);
        assert_eq!(solver.field(FieldId::VelocityXSource).get(7, 11), 1.);
        assert_eq!(solver.field(FieldId::VelocityYSource).get(7, 11), -0.5);
        assert_eq!(solver.field(FieldId::Density).get(7, 11), 0.);
    }

    #[test]
    fn test_apply_skips_obstacles() {
        let mut solver = FluidSolver::new(20, 20).unwrap();
        solver.obstacles_mut().add_segment((6, 6), (12, 6), 1).unwrap();

        Emitter {
            x: 9,
            y: 7,
            size: 6,
            density: 1.,
            velocity: (0., 0.),
        }
        .apply(&mut solver);

        let dens = solver.field(FieldId::DensitySource);
        // solid y 6..=7 and its skin up to y = 8
        assert_eq!(dens.get(9, 7), 0.);
        assert_eq!(dens.get(9, 8), 0.);
        assert_eq!(dens.get(9, 9), 1.);
    }

    #[test]
    fn test_serde_defaults() {
        let emitter: Emitter = serde_json::from_str(r#"{"x": 3, "y": 4}"#).unwrap();

        assert_eq!(emitter.size, 10);
        assert_eq!(emitter.density, 0.);
        assert_eq!(emitter.velocity, (0., 0.));
    }
}
