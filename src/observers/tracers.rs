// Massless particles carried along by the velocity field for display

use std::collections::VecDeque;

use na::DMatrix;
use rand::Rng;

/// Cells travelled per frame for a unit velocity
pub const MOVEMENT_FACTOR: f32 = 80.;

/// Positions remembered per particle when trails are drawn, head included
pub const TRAIL_LENGTH: usize = 100;

/// A set of particles, each with its newest position first.
///
/// Positions are in cell units with y growing upwards, so a particle at
/// `(x, y)` sits in cell `(x as usize, y as usize)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Tracers {
    particles: Vec<VecDeque<(f32, f32)>>,
    trail_length: usize,
}

impl Tracers {
    /// Scatter `count` particles uniformly over a `grid = (width, height)` grid
    pub fn seed(count: usize, grid: (usize, usize), trail: bool, rng: &mut impl Rng) -> Self {
        let (width, height) = (grid.0 as f32, grid.1 as f32);
        let positions: Vec<(f32, f32)> = (0..count)
            .map(|_| (rng.random_range(0.0..width), rng.random_range(0.0..height)))
            .collect();

        Tracers::from_positions(positions, trail)
    }

    pub fn from_positions(positions: impl IntoIterator<Item = (f32, f32)>, trail: bool) -> Self {
        let trail_length = if trail { TRAIL_LENGTH } else { 1 };
        let particles = positions
            .into_iter()
            .map(|head| {
                let mut positions = VecDeque::with_capacity(trail_length);
                positions.push_front(head);
                positions
            })
            .collect();

        Tracers {
            particles,
            trail_length,
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Current position of every particle
    pub fn heads(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.particles.iter().filter_map(|p| p.front().copied())
    }

    /// Move every particle by the velocity of the cell it sits in.
    ///
    /// `u` and `v` are indexed `(x, y)`. Particles that have left the grid
    /// stay where they are.
    pub fn advance(&mut self, u: &DMatrix<f32>, v: &DMatrix<f32>) {
        let (width, height) = u.shape();

        for positions in &mut self.particles {
            let Some(&(x, y)) = positions.front() else {
                continue;
            };
            if !(x.is_finite() && y.is_finite()) || x < 0. || y < 0. {
                continue;
            }

            let cell = (x as usize, y as usize);
            if cell.0 >= width || cell.1 >= height {
                continue;
            }

            let head = (x + u[cell] * MOVEMENT_FACTOR, y + v[cell] * MOVEMENT_FACTOR);
            positions.push_front(head);
            positions.truncate(self.trail_length);
        }
    }

    /// Every remembered position with its opacity, fading along the trail
    pub fn points(&self) -> impl Iterator<Item = ((f32, f32), f64)> + '_ {
        self.particles.iter().flat_map(|positions| {
            positions
                .iter()
                .enumerate()
                .map(|(age, &point)| (point, trail_alpha(age)))
        })
    }
}

/// Opacity of the position `age` frames behind the head
pub fn trail_alpha(age: usize) -> f64 {
    (1.5 / ((age + 1) as f64).sqrt()).min(1.)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_within_grid() {
        let tracers = Tracers::seed(200, (30, 12), true, &mut rand::rng());

        assert_eq!(tracers.len(), 200);
        assert!(
            tracers
                .heads()
                .all(|(x, y)| (0. ..30.).contains(&x) && (0. ..12.).contains(&y))
        );
    }

    #[test]
    fn test_advance_follows_cell_velocity() {
        let u = DMatrix::from_fn(10, 10, |x, _| if x == 3 { 0.01 } else { 0. });
        let v = DMatrix::from_fn(10, 10, |_, y| if y == 5 { -0.005 } else { 0. });
        let mut tracers = Tracers::from_positions([(3.5, 5.9), (6.2, 1.1)], false);

        tracers.advance(&u, &v);

        let heads: Vec<_> = tracers.heads().collect();
        assert!((heads[0].0 - 4.3).abs() < 1e-5);
        assert!((heads[0].1 - 5.5).abs() < 1e-5);
        assert_eq!(heads[1], (6.2, 1.1));
        assert_eq!(tracers.points().count(), 2);
    }

    #[test]
    fn test_escaped_particles_freeze() {
        let u = DMatrix::from_element(8, 8, 0.1);
        let v = DMatrix::from_element(8, 8, 0.);
        let mut tracers = Tracers::from_positions([(7.5, 2.), (-0.5, 2.), (f32::NAN, 1.)], true);

        tracers.advance(&u, &v);
        tracers.advance(&u, &v);

        let heads: Vec<_> = tracers.heads().collect();
        assert_eq!(heads[0], (15.5, 2.));
        assert_eq!(heads[1], (-0.5, 2.));
        assert!(heads[2].0.is_nan());
        // the first particle moved once before leaving the grid
        assert_eq!(tracers.points().count(), 2 + 1 + 1);
    }

    #[test]
    fn test_trail_is_bounded_and_fades() {
        let u = DMatrix::from_element(4, 4, 0.);
        let v = DMatrix::from_element(4, 4, 0.);
        let mut tracers = Tracers::from_positions([(1., 1.)], true);

        for _ in 0..TRAIL_LENGTH + 20 {
            tracers.advance(&u, &v);
        }

        let alphas: Vec<f64> = tracers.points().map(|(_, alpha)| alpha).collect();
        assert_eq!(alphas.len(), TRAIL_LENGTH);
        assert_eq!(alphas[0], 1.);
        assert!((alphas[3] - 0.75).abs() < 1e-9);
        assert!(alphas.windows(2).all(|w| w[1] <= w[0]));
    }
}
