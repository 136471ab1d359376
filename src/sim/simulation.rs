// Frame-by-frame driver around the fluid solver

use na::DMatrix;
use tracing::error;

use crate::sim::solver::FluidSolver;

/// The state of the fluid after one frame
#[derive(Clone, Debug)]
pub struct Snapshot {
    /// The index of the frame, starting at zero
    pub frame: usize,

    /// Simulated time at the end of the frame
    pub time: f32,

    pub density: DMatrix<f32>,
    pub velocity_x: DMatrix<f32>,
    pub velocity_y: DMatrix<f32>,
}

/// Steps a [`FluidSolver`] one frame per iteration until the frame budget
/// runs out or the fluid blows up.
pub struct Simulation {
    solver: FluidSolver,

    /// Kinematic viscosity passed to the velocity step
    pub viscosity: f32,

    /// Diffusion rate passed to the density step
    pub diffusion: f32,

    /// Timestep of every frame
    pub dt: f32,

    /// How many frames to run; `None` runs until the solver blows up
    frames: Option<usize>,

    /// Iteration counter
    i: usize,

    /// Set once a non-finite sample is seen
    exploded: bool,
}

impl Simulation {
    pub fn new(
        solver: FluidSolver,
        viscosity: f32,
        diffusion: f32,
        dt: f32,
        frames: Option<usize>,
    ) -> Self {
        Simulation {
            solver,
            viscosity,
            diffusion,
            dt,
            frames,
            i: 0,
            exploded: false,
        }
    }

    pub fn solver(&self) -> &FluidSolver {
        &self.solver
    }

    pub fn solver_mut(&mut self) -> &mut FluidSolver {
        &mut self.solver
    }

    /// The total simulated time once every frame has run, if bounded
    pub fn duration(&self) -> Option<f32> {
        self.frames.map(|frames| frames as f32 * self.dt)
    }

    pub fn frames(&self) -> Option<usize> {
        self.frames
    }

    /// Whether iteration stopped on a non-finite sample
    pub fn exploded(&self) -> bool {
        self.exploded
    }

    /// Give back the solver, e.g. to persist its fields
    pub fn into_solver(self) -> FluidSolver {
        self.solver
    }
}

impl Iterator for Simulation {
    type Item = Snapshot;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exploded || self.frames.is_some_and(|frames| self.i >= frames) {
            return None;
        }

        self.solver.advance(self.viscosity, self.diffusion, self.dt);

        // check for simulation explosion
        if !self.solver.is_finite() {
            error!("Non-finite sample after frame {}; simulation exploded :(", self.i);
            self.exploded = true;
            return None;
        }

        let (u, v) = self.solver.velocity();
        let snapshot = Snapshot {
            frame: self.i,
            time: (self.i + 1) as f32 * self.dt,
            density: self.solver.density().as_matrix().clone(),
            velocity_x: u.as_matrix().clone(),
            velocity_y: v.as_matrix().clone(),
        };

        self.i += 1;
        Some(snapshot)
    }
}
