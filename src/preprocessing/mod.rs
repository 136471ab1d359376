use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    observers::imgstream::Palette,
    preprocessing::{emitter::Emitter, serial_segment::SegmentSpec},
    sim::{
        field::FieldError,
        obstacles::ObstacleSet,
        solver::{FieldId, FluidSolver},
    },
};

pub mod cli;
pub mod emitter;
pub mod serial_segment;
pub mod store;

/// Stored viscosities are in units of this many m²/s
pub const VISCOSITY_UNIT: f32 = 1e-5;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ImageStreamSettings {
    pub frames_dir: PathBuf,
    pub retain_frames: bool,
    pub display_video: bool,
    pub palette: Palette,

    /// Draw a velocity arrow over every cell
    #[serde(default)]
    pub vectors: bool,

    /// Number of tracer particles carried by the flow
    #[serde(default)]
    pub particles: usize,

    /// Draw the fading path behind each tracer
    #[serde(default)]
    pub particle_trails: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum InterfaceMode {
    ImageStream(ImageStreamSettings),
    Headless,
}

/// How a single invocation runs; not part of a stored configuration
#[derive(Clone, Debug, PartialEq)]
pub struct RunSettings {
    pub mode: InterfaceMode,

    /// Frames to simulate
    pub frames: usize,

    /// Persist the final state into the configuration store
    pub save: bool,
}

/// Files holding an initial state, one per field; any may be absent
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct StateFiles {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub density: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity_x: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity_y: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub density_source: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity_x_source: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity_y_source: Option<PathBuf>,
}

impl StateFiles {
    /// Every (field, path) pair that is set
    pub fn entries(&self) -> Vec<(FieldId, &Path)> {
        [
            (FieldId::Density, &self.density),
            (FieldId::VelocityX, &self.velocity_x),
            (FieldId::VelocityY, &self.velocity_y),
            (FieldId::DensitySource, &self.density_source),
            (FieldId::VelocityXSource, &self.velocity_x_source),
            (FieldId::VelocityYSource, &self.velocity_y_source),
        ]
        .into_iter()
        .filter_map(|(id, path)| path.as_deref().map(|p| (id, p)))
        .collect()
    }
}

/// A named simulation configuration
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SimulationInput {
    pub name: String,
    pub description: String,

    /// Protected configurations are never rewritten on disk
    pub protected: bool,

    pub width: usize,
    pub height: usize,

    /// Pixels per grid cell in rendered frames
    pub window_scale: usize,

    /// Playback frames per second
    pub fps: usize,

    /// Viscosity in units of [`VISCOSITY_UNIT`]
    pub viscosity: f32,

    pub diffusion: f32,
    pub dt: f32,

    pub segments: Vec<SegmentSpec>,
    pub emitters: Vec<Emitter>,
    pub state: StateFiles,
}

impl Default for SimulationInput {
    fn default() -> Self {
        SimulationInput {
            name: "default".into(),
            description: "Empty 130x130 tank".into(),
            protected: false,
            width: 130,
            height: 130,
            window_scale: 3,
            fps: 60,
            viscosity: 1.,
            diffusion: 0.,
            dt: 1.,
            segments: Vec::new(),
            emitters: Vec::new(),
            state: StateFiles::default(),
        }
    }
}

impl SimulationInput {
    /// The viscosity handed to the solver
    pub fn kinematic_viscosity(&self) -> f32 {
        self.viscosity * VISCOSITY_UNIT
    }

    /// Build the obstacle set, skipping segments that do not fit the grid
    pub fn obstacles(&self) -> ObstacleSet {
        let mut obstacles = ObstacleSet::new(self.width, self.height);

        for (i, spec) in self.segments.iter().enumerate() {
            if let Err(err) = spec.add_to(&mut obstacles) {
                warn!("Skipping segment {i} of '{}': {err}", self.name);
            }
        }

        obstacles
    }

    /// Build a solver with the configured obstacles, initial state and
    /// sources, ready for its first frame
    pub fn build_solver(&self) -> Result<FluidSolver, FieldError> {
        let mut solver = FluidSolver::with_obstacles(self.obstacles())?;

        for (id, path) in self.state.entries() {
            if let Err(err) = solver.field_mut(id).load(path) {
                warn!("Unable to load {:?} from {:?}: {}", id, path, err);
            }
        }

        for emitter in &self.emitters {
            emitter.apply(&mut solver);
        }
        solver.reseed_sources();

        Ok(solver)
    }

    pub fn log(&self) {
        info!(
            "Simulation is shown below:\n\n\
        \t name:        {}\n\
        \t description: {}\n\
        \t grid:        {} x {} cells\n\
        \t timestep:    {}\n\
        \t viscosity:   {} x 1e-5\n\
        \t diffusion:   {}\n\
        \t obstacles:   {}\n\
        \t emitters:    {}\n\
        \t playback:    {} fps, {}x scale\n\n\
        ",
            self.name,
            self.description,
            self.width,
            self.height,
            self.dt,
            self.viscosity,
            self.diffusion,
            self.segments.len(),
            self.emitters.len(),
            self.fps,
            self.window_scale,
        );
    }
}

impl RunSettings {
    pub fn log(&self) {
        match serde_json::to_string_pretty(&self.mode) {
            Ok(mode_str) => info!("Running {} frames; mode parameters are:\n\n{}", self.frames, mode_str),
            Err(err) => warn!("Unable to display mode parameters: {err}"),
        }
    }
}
