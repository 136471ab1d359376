/// Task runner for the solver thread

use std::{
    sync::mpsc,
    thread::{self, JoinHandle},
};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, warn};

use crate::{
    observers::imgstream::{self, DisplayPacket, FrameRenderer},
    preprocessing::{ImageStreamSettings, InterfaceMode},
    sim::{simulation::Simulation, solver::FluidSolver},
};

pub struct SimulationOutput {
    /// The solver as it was after the last frame
    pub solver: FluidSolver,
    pub temporal_map: Vec<f32>, // maps idx->timestamp
    pub exploded: bool,
}

fn progress_bar(frames: Option<usize>) -> ProgressBar {
    let bar = match frames {
        Some(frames) => ProgressBar::new(frames as u64),
        None => ProgressBar::new_spinner(),
    };

    match ProgressStyle::with_template(
        "[Elapsed: {elapsed_precise}] [{bar:40.cyan/blue}] {percent}% (Remaining: {eta_precise})",
    ) {
        Ok(style) => bar.set_style(style.progress_chars("##-")),
        Err(err) => warn!("Falling back to the default progress style: {err}"),
    }
    bar
}

fn finish(sim: Simulation, temporal_map: Vec<f32>, bar: ProgressBar) -> SimulationOutput {
    bar.finish();
    let exploded = sim.exploded();

    SimulationOutput {
        solver: sim.into_solver(),
        temporal_map,
        exploded,
    }
}

/// The solver thread task to run in ImageStream mode
pub fn imgstream_task(
    settings: &ImageStreamSettings,
    mut sim: Simulation,
    window_scale: usize,
) -> SimulationOutput {
    let bar = progress_bar(sim.frames());

    let (sender, receiver) = mpsc::channel();

    // spawn image io thread
    let settings_clone = settings.clone();
    let mask = sim.solver().obstacles().mask();
    let writer = thread::spawn(move || {
        let renderer = FrameRenderer::from_settings(mask, &settings_clone, window_scale);
        if let Err(err) = imgstream::image_io_loop(receiver, renderer, &settings_clone.frames_dir)
        {
            error!("Frame writer failed: {err}");
        }
    });

    let mut sender = Some(sender);
    let mut temporal_map: Vec<f32> = Vec::new();
    for snapshot in sim.by_ref() {
        if let Some(tx) = &sender {
            let packet = DisplayPacket {
                density: snapshot.density,
                velocity_x: snapshot.velocity_x,
                velocity_y: snapshot.velocity_y,
                i: snapshot.frame,
            };
            if tx.send(packet).is_err() {
                warn!("Frame writer stopped; continuing without frames");
                sender = None;
            }
        }

        bar.inc(1);
        temporal_map.push(snapshot.time);
    }

    // hang up so the writer drains and exits
    drop(sender);
    if writer.join().is_err() {
        error!("Frame writer thread panicked");
    }

    finish(sim, temporal_map, bar)
}

/// The solver thread task when no frames are rendered
pub fn headless_task(mut sim: Simulation) -> SimulationOutput {
    let bar = progress_bar(sim.frames());

    let mut temporal_map: Vec<f32> = Vec::new();
    for snapshot in sim.by_ref() {
        bar.inc(1);
        temporal_map.push(snapshot.time);
    }

    finish(sim, temporal_map, bar)
}

/// Spawns the simulation thread and starts the corresponding task
pub fn spawn_sim_thread(
    sim: Simulation,
    mode: InterfaceMode,
    window_scale: usize,
) -> JoinHandle<SimulationOutput> {
    thread::spawn(move || match &mode {
        InterfaceMode::ImageStream(settings) => imgstream_task(settings, sim, window_scale),
        InterfaceMode::Headless => headless_task(sim),
    })
}
