// Stable-fluids stage kernels
//
// Every kernel works on fields that share one shape and skips interior
// cells covered by an obstacle (solid or skin), leaving them untouched.

use crate::sim::{
    boundary::{BoundaryKind, set_bnd},
    field::Field,
    obstacles::ObstacleSet,
};

/// Relaxation sweeps used by both the diffusion and the pressure solves
pub const RELAXATION_SWEEPS: usize = 10;

/// Add `source * dt` into `field`, obstacles included.
///
/// Panics when the two fields differ in shape.
pub fn add_source(field: &mut Field, source: &Field, dt: f32) {
    assert_eq!(field.shape(), source.shape(), "source field shape differs");

    for (sample, &added) in field.as_mut_slice().iter_mut().zip(source.as_slice()) {
        *sample += added * dt;
    }
}

/// Implicit diffusion of `x0` into `x` with a fixed number of Gauss-Seidel
/// sweeps. Mathematically, this approximates (I - a∇²) x = x0 with
/// a = dt · diff · (W-2)(H-2).
///
/// Parameters
/// - `obstacles` - Cells to leave alone
/// - `kind` - The boundary condition reapplied after every sweep
/// - `x` - The field to solve for; its current contents seed the iteration
/// - `x0` - The field before diffusion
/// - `diff` - The diffusion coefficient (or viscosity)
/// - `dt` - The timestep
pub fn diffuse(
    obstacles: &ObstacleSet,
    kind: BoundaryKind,
    x: &mut Field,
    x0: &Field,
    diff: f32,
    dt: f32,
) {
    assert_eq!(x.shape(), x0.shape(), "diffused field shape differs");
    let (nx, ny) = x.shape();
    let a = dt * diff * (nx - 2) as f32 * (ny - 2) as f32;

    for _ in 0..RELAXATION_SWEEPS {
        for i in 1..nx - 1 {
            for j in 1..ny - 1 {
                if obstacles.contains(i, j) {
                    continue;
                }

                let relaxed = if a == 0. {
                    x0.get(i, j)
                } else {
                    let neighbours =
                        x.get(i - 1, j) + x.get(i + 1, j) + x.get(i, j - 1) + x.get(i, j + 1);
                    (x0.get(i, j) + a * neighbours) / (1. + 4. * a)
                };
                x.set(i, j, relaxed);
            }
        }
        set_bnd(obstacles, kind, x);
    }
}

/// Semi-Lagrangian transport of `d0` along `(u, v)` into `d`.
///
/// Each interior cell is traced back one timestep and `d0` is bilinearly
/// interpolated there. When any of the four interpolation cells lies in an
/// obstacle the cell keeps `d0` at its own position instead.
pub fn advect(
    obstacles: &ObstacleSet,
    kind: BoundaryKind,
    d: &mut Field,
    d0: &Field,
    u: &Field,
    v: &Field,
    dt: f32,
) {
    let shape = d.shape();
    assert!(
        d0.shape() == shape && u.shape() == shape && v.shape() == shape,
        "advected field shapes differ"
    );

    let (nx, ny) = shape;
    let (inner_x, inner_y) = ((nx - 2) as f32, (ny - 2) as f32);
    let (dt0_x, dt0_y) = (dt * inner_x, dt * inner_y);

    for i in 1..nx - 1 {
        for j in 1..ny - 1 {
            if obstacles.contains(i, j) {
                continue;
            }

            let x = (i as f32 - dt0_x * u.get(i, j)).clamp(0.5, inner_x + 0.5);
            let y = (j as f32 - dt0_y * v.get(i, j)).clamp(0.5, inner_y + 0.5);

            let (i0, j0) = (x as usize, y as usize);
            let (i1, j1) = (i0 + 1, j0 + 1);

            let blocked = obstacles.contains(i0, j0)
                || obstacles.contains(i1, j1)
                || obstacles.contains(i0, j1)
                || obstacles.contains(i1, j0);

            if blocked {
                d.set(i, j, d0.get(i, j));
                continue;
            }

            let s1 = x - i0 as f32;
            let s0 = 1. - s1;
            let t1 = y - j0 as f32;
            let t0 = 1. - t1;

            d.set(
                i,
                j,
                s0 * (t0 * d0.get(i0, j0) + t1 * d0.get(i0, j1))
                    + s1 * (t0 * d0.get(i1, j0) + t1 * d0.get(i1, j1)),
            );
        }
    }
    set_bnd(obstacles, kind, d);
}

/// Remove the divergent part of `(u, v)`.
///
/// Solves the pressure Poisson equation ∇²p = ∇⋅u with a fixed number of
/// relaxation sweeps, then subtracts ∇p. `p` and `div` are scratch fields
/// and are overwritten.
pub fn project(obstacles: &ObstacleSet, u: &mut Field, v: &mut Field, p: &mut Field, div: &mut Field) {
    let shape = u.shape();
    assert!(
        v.shape() == shape && p.shape() == shape && div.shape() == shape,
        "projected field shapes differ"
    );

    let (nx, ny) = shape;
    let h_x = 1. / (nx - 2) as f32;
    let h_y = 1. / (ny - 2) as f32;

    for i in 1..nx - 1 {
        for j in 1..ny - 1 {
            if obstacles.contains(i, j) {
                continue;
            }

            div.set(
                i,
                j,
                -0.5 * h_x * (u.get(i + 1, j) - u.get(i - 1, j))
                    - 0.5 * h_y * (v.get(i, j + 1) - v.get(i, j - 1)),
            );
            p.set(i, j, 0.);
        }
    }
    set_bnd(obstacles, BoundaryKind::Scalar, div);
    set_bnd(obstacles, BoundaryKind::Scalar, p);

    for _ in 0..RELAXATION_SWEEPS {
        for i in 1..nx - 1 {
            for j in 1..ny - 1 {
                if obstacles.contains(i, j) {
                    continue;
                }

                let neighbours =
                    p.get(i - 1, j) + p.get(i + 1, j) + p.get(i, j - 1) + p.get(i, j + 1);
                p.set(i, j, (div.get(i, j) + neighbours) / 4.);
            }
        }
        set_bnd(obstacles, BoundaryKind::Scalar, p);
    }

    for i in 1..nx - 1 {
        for j in 1..ny - 1 {
            if obstacles.contains(i, j) {
                continue;
            }

            u.set(i, j, u.get(i, j) - 0.5 * (p.get(i + 1, j) - p.get(i - 1, j)) / h_x);
            v.set(i, j, v.get(i, j) - 0.5 * (p.get(i, j + 1) - p.get(i, j - 1)) / h_y);
        }
    }
    set_bnd(obstacles, BoundaryKind::VelocityX, u);
    set_bnd(obstacles, BoundaryKind::VelocityY, v);
}
