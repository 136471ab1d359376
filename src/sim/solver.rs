// Stable-fluids solver owning every simulation field

use std::mem;

use tracing::debug;

use crate::sim::{
    boundary::BoundaryKind,
    field::{Field, FieldError},
    numeric,
    obstacles::ObstacleSet,
};

/// Names the nine fields owned by a [`FluidSolver`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldId {
    VelocityX,
    VelocityY,
    VelocityXPrev,
    VelocityYPrev,
    Density,
    DensityPrev,
    DensitySource,
    VelocityXSource,
    VelocityYSource,
}

impl FieldId {
    pub const ALL: [FieldId; 9] = [
        FieldId::VelocityX,
        FieldId::VelocityY,
        FieldId::VelocityXPrev,
        FieldId::VelocityYPrev,
        FieldId::Density,
        FieldId::DensityPrev,
        FieldId::DensitySource,
        FieldId::VelocityXSource,
        FieldId::VelocityYSource,
    ];
}

/// Grid-based stable-fluids solver with rigid obstacles.
///
/// Each frame the caller writes forcing into the `*Prev` fields (usually
/// through [`FluidSolver::reseed_sources`]), then runs
/// [`FluidSolver::velocity_step`] followed by [`FluidSolver::density_step`].
pub struct FluidSolver {
    /// The velocity field
    u: Field,
    v: Field,

    /// Velocity forcing for the next step; scratch space during a step
    u_prev: Field,
    v_prev: Field,

    /// The transported scalar
    dens: Field,

    /// Density forcing for the next step; scratch space during a step
    dens_prev: Field,

    /// Persistent sources copied into the `*_prev` fields every frame
    dens_src: Field,
    u_src: Field,
    v_src: Field,

    obstacles: ObstacleSet,
}

impl FluidSolver {
    /// Create a solver with all fields zeroed and no obstacles
    ///
    /// Parameters
    /// - `width` - The number of cells along x, border included
    /// - `height` - The number of cells along y, border included
    pub fn new(width: usize, height: usize) -> Result<Self, FieldError> {
        Self::with_obstacles(ObstacleSet::new(width, height))
    }

    /// Create a solver sized to the grid the obstacles were validated against
    pub fn with_obstacles(obstacles: ObstacleSet) -> Result<Self, FieldError> {
        let (width, height) = obstacles.grid();
        let zeros = Field::new(width, height)?;

        Ok(FluidSolver {
            u: zeros.clone(),
            v: zeros.clone(),
            u_prev: zeros.clone(),
            v_prev: zeros.clone(),
            dens: zeros.clone(),
            dens_prev: zeros.clone(),
            dens_src: zeros.clone(),
            u_src: zeros.clone(),
            v_src: zeros,
            obstacles,
        })
    }

    /// (width, height) of every field
    pub fn shape(&self) -> (usize, usize) {
        self.dens.shape()
    }

    pub fn field(&self, id: FieldId) -> &Field {
        match id {
            FieldId::VelocityX => &self.u,
            FieldId::VelocityY => &self.v,
            FieldId::VelocityXPrev => &self.u_prev,
            FieldId::VelocityYPrev => &self.v_prev,
            FieldId::Density => &self.dens,
            FieldId::DensityPrev => &self.dens_prev,
            FieldId::DensitySource => &self.dens_src,
            FieldId::VelocityXSource => &self.u_src,
            FieldId::VelocityYSource => &self.v_src,
        }
    }

    /// Mutable access to a field between steps. The field must keep its shape.
    pub fn field_mut(&mut self, id: FieldId) -> &mut Field {
        match id {
            FieldId::VelocityX => &mut self.u,
            FieldId::VelocityY => &mut self.v,
            FieldId::VelocityXPrev => &mut self.u_prev,
            FieldId::VelocityYPrev => &mut self.v_prev,
            FieldId::Density => &mut self.dens,
            FieldId::DensityPrev => &mut self.dens_prev,
            FieldId::DensitySource => &mut self.dens_src,
            FieldId::VelocityXSource => &mut self.u_src,
            FieldId::VelocityYSource => &mut self.v_src,
        }
    }

    pub fn density(&self) -> &Field {
        &self.dens
    }

    /// The (u, v) velocity components
    pub fn velocity(&self) -> (&Field, &Field) {
        (&self.u, &self.v)
    }

    pub fn obstacles(&self) -> &ObstacleSet {
        &self.obstacles
    }

    pub fn obstacles_mut(&mut self) -> &mut ObstacleSet {
        &mut self.obstacles
    }

    /// Swap in a rebuilt obstacle set; it must describe the same grid
    pub fn replace_obstacles(&mut self, obstacles: ObstacleSet) -> Result<ObstacleSet, FieldError> {
        if obstacles.grid() != self.shape() {
            return Err(FieldError::DimensionMismatch {
                expected: self.shape(),
                found: obstacles.grid(),
            });
        }
        Ok(mem::replace(&mut self.obstacles, obstacles))
    }

    /// Apply the boundary operator, obstacles included, to an external field
    pub fn set_bnd(&self, kind: BoundaryKind, field: &mut Field) {
        crate::sim::boundary::set_bnd(&self.obstacles, kind, field);
    }

    /// Advance the velocity field by `dt`: add forcing, diffuse, project,
    /// self-advect and project again.
    pub fn velocity_step(&mut self, viscosity: f32, dt: f32) {
        numeric::add_source(&mut self.u, &self.u_prev, dt);
        numeric::add_source(&mut self.v, &self.v_prev, dt);

        mem::swap(&mut self.u, &mut self.u_prev);
        numeric::diffuse(
            &self.obstacles,
            BoundaryKind::VelocityX,
            &mut self.u,
            &self.u_prev,
            viscosity,
            dt,
        );
        mem::swap(&mut self.v, &mut self.v_prev);
        numeric::diffuse(
            &self.obstacles,
            BoundaryKind::VelocityY,
            &mut self.v,
            &self.v_prev,
            viscosity,
            dt,
        );

        numeric::project(
            &self.obstacles,
            &mut self.u,
            &mut self.v,
            &mut self.u_prev,
            &mut self.v_prev,
        );

        // advect the projected pair by itself
        mem::swap(&mut self.u, &mut self.u_prev);
        mem::swap(&mut self.v, &mut self.v_prev);
        numeric::advect(
            &self.obstacles,
            BoundaryKind::VelocityX,
            &mut self.u,
            &self.u_prev,
            &self.u_prev,
            &self.v_prev,
            dt,
        );
        numeric::advect(
            &self.obstacles,
            BoundaryKind::VelocityY,
            &mut self.v,
            &self.v_prev,
            &self.u_prev,
            &self.v_prev,
            dt,
        );

        // advection reintroduces divergence
        numeric::project(
            &self.obstacles,
            &mut self.u,
            &mut self.v,
            &mut self.u_prev,
            &mut self.v_prev,
        );
    }

    /// Advance the density by `dt` along the current velocity field
    pub fn density_step(&mut self, diffusion: f32, dt: f32) {
        numeric::add_source(&mut self.dens, &self.dens_prev, dt);

        mem::swap(&mut self.dens, &mut self.dens_prev);
        numeric::diffuse(
            &self.obstacles,
            BoundaryKind::Scalar,
            &mut self.dens,
            &self.dens_prev,
            diffusion,
            dt,
        );

        mem::swap(&mut self.dens, &mut self.dens_prev);
        numeric::advect(
            &self.obstacles,
            BoundaryKind::Scalar,
            &mut self.dens,
            &self.dens_prev,
            &self.u,
            &self.v,
            dt,
        );
    }

    /// Clear the `*_prev` fields and refill them from the persistent sources
    pub fn reseed_sources(&mut self) {
        for (prev, src) in [
            (&mut self.dens_prev, &self.dens_src),
            (&mut self.u_prev, &self.u_src),
            (&mut self.v_prev, &self.v_src),
        ] {
            prev.as_mut_slice().copy_from_slice(src.as_slice());
        }
    }

    /// One full frame: velocity step, density step, then reseed the forcing
    pub fn advance(&mut self, viscosity: f32, diffusion: f32, dt: f32) {
        self.velocity_step(viscosity, dt);
        self.density_step(diffusion, dt);
        self.reseed_sources();
    }

    /// Zero the velocity and density fields, current and previous
    pub fn reset_fluid(&mut self) {
        debug!("resetting fluid fields");
        for field in [
            &mut self.u,
            &mut self.v,
            &mut self.u_prev,
            &mut self.v_prev,
            &mut self.dens,
            &mut self.dens_prev,
        ] {
            field.fill(0.);
        }
    }

    /// Zero the persistent sources
    pub fn reset_sources(&mut self) {
        debug!("resetting source fields");
        for field in [&mut self.dens_src, &mut self.u_src, &mut self.v_src] {
            field.fill(0.);
        }
    }

    pub fn reset(&mut self) {
        self.reset_fluid();
        self.reset_sources();
    }

    /// Whether every velocity and density sample is finite
    pub fn is_finite(&self) -> bool {
        [&self.u, &self.v, &self.dens]
            .iter()
            .all(|field| field.as_slice().iter().all(|s| s.is_finite()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_zero(field: &Field) -> bool {
        field.as_slice().iter().all(|&s| s == 0.)
    }

    #[test]
    fn test_fields_share_shape() {
        let solver = FluidSolver::new(14, 9).unwrap();

        for id in FieldId::ALL {
            assert_eq!(solver.field(id).shape(), (14, 9));
        }
        assert_eq!(solver.obstacles().grid(), (14, 9));
    }

    #[test]
    fn test_rejects_tiny_grid() {
        assert!(matches!(
            FluidSolver::new(2, 9),
            Err(FieldError::TooSmall { .. })
        ));
    }

    #[test]
    fn test_zero_state_is_stationary() {
        let mut solver = FluidSolver::new(16, 16).unwrap();

        for _ in 0..5 {
            solver.velocity_step(1e-4, 0.1);
            solver.density_step(1e-4, 0.1);
        }

        let (u, v) = solver.velocity();
        assert!(all_zero(u));
        assert!(all_zero(v));
        assert!(all_zero(solver.density()));
    }

    #[test]
    fn test_density_source_spreads() {
        let mut solver = FluidSolver::new(20, 20).unwrap();
        solver.field_mut(FieldId::DensityPrev).set(10, 10, 100.);

        solver.density_step(1e-3, 0.1);

        let dens = solver.density();
        assert!(dens.get(10, 10) > 0.);
        assert!(dens.get(11, 10) > 0.);
        assert!(dens.get(10, 10) > dens.get(11, 10));
        assert!(dens.as_slice().iter().all(|&s| s >= 0.));
    }

    #[test]
    fn test_velocity_forcing_moves_density() {
        let mut solver = FluidSolver::new(24, 24).unwrap();
        for y in 10..14 {
            solver.field_mut(FieldId::Density).set(6, y, 1.);
            solver.field_mut(FieldId::VelocityXSource).set(6, y, 0.5);
        }
        solver.reseed_sources();

        for _ in 0..4 {
            solver.advance(0., 0., 0.05);
        }

        let dens = solver.density();
        let downstream: f32 = (7..23)
            .flat_map(|x| (1..23).map(move |y| (x, y)))
            .map(|(x, y)| dens.get(x, y))
            .sum();
        assert!(downstream > 0.);
        assert!(solver.is_finite());
    }

    #[test]
    fn test_obstacle_solid_stays_empty() {
        let mut obstacles = ObstacleSet::new(24, 24);
        obstacles.add_segment((10, 6), (10, 16), 2).unwrap();
        let mut solver = FluidSolver::with_obstacles(obstacles).unwrap();

        solver.field_mut(FieldId::DensitySource).fill(1.);
        solver.field_mut(FieldId::VelocityXSource).fill(0.2);
        solver.reseed_sources();

        for _ in 0..3 {
            solver.advance(1e-4, 1e-4, 0.05);
        }

        // solid x 10..=12, y 6..=16
        let (u, v) = solver.velocity();
        for x in 10..=12 {
            for y in 6..=16 {
                assert_eq!(u.get(x, y), 0.);
                assert_eq!(v.get(x, y), 0.);
                assert_eq!(solver.density().get(x, y), 0.);
            }
        }
        assert!(solver.is_finite());
    }

    #[test]
    fn test_reseed_copies_sources() {
        let mut solver = FluidSolver::new(8, 8).unwrap();
        solver.field_mut(FieldId::DensitySource).set(3, 3, 2.);
        solver.field_mut(FieldId::VelocityYSource).set(4, 4, -1.);
        solver.field_mut(FieldId::DensityPrev).set(1, 1, 9.);

        solver.reseed_sources();

        assert_eq!(solver.field(FieldId::DensityPrev).get(3, 3), 2.);
        assert_eq!(solver.field(FieldId::DensityPrev).get(1, 1), 0.);
        assert_eq!(solver.field(FieldId::VelocityYPrev).get(4, 4), -1.);
        assert!(all_zero(solver.field(FieldId::VelocityXPrev)));
    }

    #[test]
    fn test_resets() {
        let mut solver = FluidSolver::new(8, 8).unwrap();
        for id in FieldId::ALL {
            solver.field_mut(id).fill(1.);
        }

        solver.reset_fluid();
        assert!(all_zero(solver.density()));
        assert!(all_zero(solver.field(FieldId::VelocityXPrev)));
        assert!(!all_zero(solver.field(FieldId::DensitySource)));

        solver.reset_sources();
        assert!(FieldId::ALL.iter().all(|&id| all_zero(solver.field(id))));

        for id in FieldId::ALL {
            solver.field_mut(id).fill(1.);
        }
        solver.reset();
        assert!(FieldId::ALL.iter().all(|&id| all_zero(solver.field(id))));
    }

    #[test]
    fn test_replace_obstacles_checks_grid() {
        let mut solver = FluidSolver::new(20, 20).unwrap();

        assert!(solver.replace_obstacles(ObstacleSet::new(20, 21)).is_err());

        let mut obstacles = ObstacleSet::new(20, 20);
        obstacles.add_segment((5, 5), (9, 5), 1).unwrap();
        let old = solver.replace_obstacles(obstacles).unwrap();
        assert!(old.is_empty());
        assert_eq!(solver.obstacles().len(), 1);
    }
}
