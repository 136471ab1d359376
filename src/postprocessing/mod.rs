// Contains post-processers for analyzing simulation results

pub mod display;
pub mod persist;

use crate::{
    preprocessing::{InterfaceMode, RunSettings, SimulationInput, store::ConfigStore},
    sim::task::SimulationOutput,
};
use std::{error::Error, fs, path::Path};
use tracing::{info, warn};

/// Play back, persist and clean up after a finished run
pub fn postprocess(
    mut sim_input: SimulationInput,
    settings: RunSettings,
    sim_output: SimulationOutput,
    store: &mut ConfigStore,
) -> Result<(), Box<dyn Error>> {
    if sim_output.exploded {
        warn!(
            "Simulation stopped after {} frames",
            sim_output.temporal_map.len()
        );
    }

    if let InterfaceMode::ImageStream(image_settings) = &settings.mode {
        let elapsed_time = sim_output.temporal_map.last().copied().unwrap_or(0.);

        if image_settings.display_video {
            if let Err(err) = display::play_video(
                elapsed_time,
                sim_input.fps,
                &sim_output.temporal_map,
                &image_settings.frames_dir,
            ) {
                warn!("Unable to play back the simulation: {err}");
            }
        }

        if !image_settings.retain_frames {
            _ = fs::remove_dir_all(&image_settings.frames_dir)
                .inspect_err(|err| warn!("Unable to cleanup frames output: {:?}", err));
        }
    };

    if settings.save {
        let state_dir = store
            .path()
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .join("states");

        persist::persist_state(&sim_output.solver, &mut sim_input, &state_dir)?;
        if store.write(sim_input)? {
            info!("Configuration written to {:?}", store.path());
        }
    }

    Ok(())
}
