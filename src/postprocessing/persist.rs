// Saving solver state so that a configuration can resume from it

use std::{error::Error, fs, path::Path};

use tracing::info;

use crate::{
    preprocessing::{SimulationInput, StateFiles, serial_segment::SegmentSpec},
    sim::solver::{FieldId, FluidSolver},
};

/// File suffix of every persisted field
const STATE_SUFFIXES: [(FieldId, &str); 6] = [
    (FieldId::Density, "density"),
    (FieldId::VelocityX, "velX"),
    (FieldId::VelocityY, "velY"),
    (FieldId::DensitySource, "density_src"),
    (FieldId::VelocityXSource, "velX_src"),
    (FieldId::VelocityYSource, "velY_src"),
];

/// Write the six state fields of `solver` to `<dir>/<name>_<field>` and
/// point `input` at them, along with the solver's current obstacles.
pub fn persist_state(
    solver: &FluidSolver,
    input: &mut SimulationInput,
    dir: &Path,
) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(dir)?;

    let mut state = StateFiles::default();
    for (id, suffix) in STATE_SUFFIXES {
        let path = dir.join(format!("{}_{}", input.name, suffix));
        solver.field(id).save(&path)?;

        let slot = match id {
            FieldId::Density => &mut state.density,
            FieldId::VelocityX => &mut state.velocity_x,
            FieldId::VelocityY => &mut state.velocity_y,
            FieldId::DensitySource => &mut state.density_source,
            FieldId::VelocityXSource => &mut state.velocity_x_source,
            FieldId::VelocityYSource => &mut state.velocity_y_source,
            _ => continue,
        };
        *slot = Some(path);
    }

    info!("Saved the state of '{}' to {:?}", input.name, dir);
    input.state = state;
    input.segments = SegmentSpec::list_from(solver.obstacles());

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{env, process};

    use super::*;

    #[test]
    fn test_persisted_state_reloads() {
        let dir = env::temp_dir().join(format!("stable-fluids-persist-{}", process::id()));

        let mut input = SimulationInput {
            name: "tank".into(),
            width: 20,
            height: 20,
            segments: vec![SegmentSpec {
                ax: 5,
                ay: 5,
                bx: 5,
                by: 12,
                thickness: 1,
            }],
            ..Default::default()
        };

        let mut solver = input.build_solver().unwrap();
        solver.field_mut(FieldId::Density).set(10, 10, 0.75);
        solver.field_mut(FieldId::VelocityYSource).set(12, 3, -0.5);

        persist_state(&solver, &mut input, &dir).unwrap();

        assert_eq!(input.state.density, Some(dir.join("tank_density")));
        assert_eq!(input.state.velocity_x_source, Some(dir.join("tank_velX_src")));
        assert_eq!(input.state.entries().len(), 6);
        assert_eq!(input.segments.len(), 1);

        let reloaded = input.build_solver().unwrap();
        assert_eq!(reloaded.density().get(10, 10), 0.75);
        assert_eq!(reloaded.field(FieldId::VelocityYSource).get(12, 3), -0.5);
        assert_eq!(reloaded.field(FieldId::VelocityYPrev).get(12, 3), -0.5);

        fs::remove_dir_all(&dir).unwrap();
    }
}
