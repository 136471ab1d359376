// The stable-fluids core: fields, obstacles, stage kernels and the solver

pub mod boundary;
pub mod field;
pub mod numeric;
pub mod obstacles;
pub mod segment;
pub mod simulation;
pub mod solver;
pub mod task;
