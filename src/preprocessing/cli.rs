use std::{
    error::Error,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use clap::{Parser, command};
use tracing::info;

use crate::{
    observers::imgstream::Palette,
    preprocessing::{
        ImageStreamSettings, InterfaceMode, RunSettings, SimulationInput, StateFiles,
        serial_segment::SegmentSpec, store::ConfigStore,
    },
};

static DEFAULT_FRAMES_PATH: LazyLock<&Path> = LazyLock::new(|| Path::new("sim-frames"));

// Raw, CLI input
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    #[arg(
        long,
        help = "The JSON file holding the named configurations.",
        default_value = "configs.json"
    )]
    pub config_file: PathBuf,

    #[arg(
        short,
        long,
        help = "The configuration to run, by index or name. Defaults to the first one."
    )]
    pub config: Option<String>,

    #[arg(
        long,
        help = "Store the resulting configuration under a new name before running."
    )]
    pub new_config: Option<String>,

    #[arg(long, help = "List the stored configurations and exit.")]
    pub list_configs: bool,

    #[arg(long, help = "Remove a configuration, by index or name, and exit.")]
    pub remove_config: Option<String>,

    #[arg(
        long,
        help = "Restore the default grid size, scale, fps, timestep, viscosity and diffusion before applying any other option."
    )]
    pub reset: bool,

    #[arg(long, help = "Ignore any stored initial state and start from still, empty fluid.")]
    pub clear_state: bool,

    #[arg(long, help = "Grid width in cells, border included.")]
    pub width: Option<usize>,

    #[arg(long, help = "Grid height in cells, border included.")]
    pub height: Option<usize>,

    #[arg(long, help = "Pixels per grid cell in rendered frames.")]
    pub scale: Option<usize>,

    #[arg(long, help = "Playback frames per second.")]
    pub fps: Option<usize>,

    #[arg(long, help = "Timestep per frame.")]
    pub dt: Option<f32>,

    #[arg(long, help = "Viscosity, in units of 1e-5.")]
    pub visc: Option<f32>,

    #[arg(long, help = "Density diffusion rate.")]
    pub diff: Option<f32>,

    #[arg(
        long = "segment",
        help = "An extra obstacle as ax,ay,bx,by,thickness. May be repeated."
    )]
    pub segments: Vec<SegmentSpec>,

    #[arg(long, help = "The number of frames to simulate.", default_value = "300")]
    pub frames: usize,

    #[arg(
        long,
        help = "The mode to run the simulation in: `video` or `headless`",
        default_value = "video"
    )]
    pub mode: String,

    #[arg(
        long,
        help = "An optional directory pointing to where frames should be saved."
    )]
    pub frames_dir: Option<PathBuf>,

    #[arg(
        short,
        long,
        help = "Whether or not frames should be retained after saving.",
        default_value = "false"
    )]
    pub retain_frames: bool,

    #[arg(
        short,
        long,
        help = "Whether the frame animation should play after solving."
    )]
    pub display_video: bool,

    #[arg(
        long,
        help = "Frame colours: `gray` or `heat`",
        default_value = "gray"
    )]
    pub palette: String,

    #[arg(long, help = "Draw the velocity field as arrows over every frame.")]
    pub vectors: bool,

    #[arg(
        short,
        long,
        help = "The number of tracer particles carried by the flow.",
        default_value = "0"
    )]
    pub particles: usize,

    #[arg(long, help = "Draw tracer particles without their trails.")]
    pub no_trails: bool,

    #[arg(
        long,
        help = "Save the final fields next to the configuration file and record them in it."
    )]
    pub save: bool,

    #[arg(long, help = "Only apply configuration changes; do not simulate.")]
    pub no_simulation: bool,
}

impl CliArgs {
    /// Pick the stored configuration and apply the command-line overrides
    pub fn create_input(&self, store: &ConfigStore) -> Result<SimulationInput, Box<dyn Error>> {
        let mut input = match &self.config {
            Some(key) => store
                .select(key)
                .cloned()
                .ok_or_else(|| format!("no configuration '{key}' in {:?}", store.path()))?,
            None => store.configs().first().cloned().unwrap_or_default(),
        };
        info!("Using configuration '{}'", input.name);

        if let Some(name) = &self.new_config {
            input.name = name.clone();
            input.protected = false;
        }

        if self.reset {
            let defaults = SimulationInput::default();
            input.width = defaults.width;
            input.height = defaults.height;
            input.window_scale = defaults.window_scale;
            input.fps = defaults.fps;
            input.dt = defaults.dt;
            input.viscosity = defaults.viscosity;
            input.diffusion = defaults.diffusion;
        }

        if let Some(width) = self.width {
            input.width = width;
        }
        if let Some(height) = self.height {
            input.height = height;
        }
        if let Some(scale) = self.scale {
            input.window_scale = scale;
        }
        if let Some(fps) = self.fps {
            input.fps = fps;
        }
        if let Some(dt) = self.dt {
            input.dt = dt;
        }
        if let Some(visc) = self.visc {
            input.viscosity = visc;
        }
        if let Some(diff) = self.diff {
            input.diffusion = diff;
        }
        input.segments.extend(self.segments.iter().copied());

        if self.clear_state {
            input.state = StateFiles::default();
        }

        Ok(input)
    }

    /// How this invocation should run
    pub fn run_settings(&self) -> Result<RunSettings, Box<dyn Error>> {
        let mode = match self.mode.as_str() {
            "video" => {
                let frames_dir = self
                    .frames_dir
                    .clone()
                    .unwrap_or((*DEFAULT_FRAMES_PATH).into());

                let palette = match self.palette.as_str() {
                    "gray" => Palette::Gray,
                    "heat" => Palette::Heat,
                    other => {
                        return Err(format!(
                            "'{other}' is not a valid palette. Use --help for info."
                        )
                        .into());
                    }
                };

                InterfaceMode::ImageStream(ImageStreamSettings {
                    frames_dir,
                    retain_frames: self.retain_frames,
                    display_video: self.display_video,
                    palette,
                    vectors: self.vectors,
                    particles: self.particles,
                    particle_trails: !self.no_trails,
                })
            }
            "headless" => InterfaceMode::Headless,
            other => {
                return Err(format!(
                    "'{other}' is not a valid interface mode. Use --help for info."
                )
                .into());
            }
        };

        Ok(RunSettings {
            mode,
            frames: self.frames,
            save: self.save,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("stable-fluids-2d").chain(args.iter().copied()))
            .unwrap()
    }

    fn store() -> ConfigStore {
        let channel = SimulationInput {
            name: "channel".into(),
            width: 60,
            state: StateFiles {
                density: Some("dens".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        ConfigStore::new(
            env::temp_dir().join("stable-fluids-cli-unused.json"),
            vec![SimulationInput::default(), channel],
        )
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        let settings = args.run_settings().unwrap();

        assert_eq!(settings.frames, 300);
        assert!(!settings.save);
        assert_eq!(
            settings.mode,
            InterfaceMode::ImageStream(ImageStreamSettings {
                frames_dir: PathBuf::from("sim-frames"),
                retain_frames: false,
                display_video: false,
                palette: Palette::Gray,
                vectors: false,
                particles: 0,
                particle_trails: true,
            })
        );
        assert_eq!(args.create_input(&store()).unwrap().name, "default");
    }

    #[test]
    fn test_overrides() {
        let args = parse(&[
            "--config",
            "channel",
            "--height",
            "40",
            "--visc",
            "2.5",
            "--segment",
            "5,5,5,20,1",
            "--segment",
            "10,8,30,8,0",
            "--clear-state",
        ]);
        let input = args.create_input(&store()).unwrap();

        assert_eq!(input.name, "channel");
        assert_eq!((input.width, input.height), (60, 40));
        assert_eq!(input.viscosity, 2.5);
        assert_eq!(input.segments.len(), 2);
        assert_eq!(input.segments[1].bx, 30);
        assert_eq!(input.state, StateFiles::default());
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut store = store();
        store.upsert(SimulationInput {
            name: "tuned".into(),
            width: 64,
            height: 48,
            window_scale: 6,
            fps: 24,
            viscosity: 4.,
            diffusion: 0.5,
            dt: 0.25,
            segments: vec!["5,5,5,20,1".parse().unwrap()],
            state: StateFiles {
                velocity_x: Some("velX".into()),
                ..Default::default()
            },
            ..Default::default()
        });

        let input = parse(&["--config", "tuned", "--reset", "--fps", "30"])
            .create_input(&store)
            .unwrap();

        let defaults = SimulationInput::default();
        assert_eq!(input.name, "tuned");
        assert_eq!((input.width, input.height), (defaults.width, defaults.height));
        assert_eq!(input.window_scale, defaults.window_scale);
        assert_eq!(input.fps, 30);
        assert_eq!(input.viscosity, defaults.viscosity);
        assert_eq!(input.diffusion, defaults.diffusion);
        assert_eq!(input.dt, defaults.dt);
        assert_eq!(input.segments.len(), 1);
        assert_eq!(input.state.velocity_x, Some(PathBuf::from("velX")));
    }

    #[test]
    fn test_overlay_flags() {
        let settings = parse(&["--vectors", "-p", "500", "--no-trails"])
            .run_settings()
            .unwrap();

        let InterfaceMode::ImageStream(image_settings) = settings.mode else {
            panic!("expected image stream mode");
        };
        assert!(image_settings.vectors);
        assert_eq!(image_settings.particles, 500);
        assert!(!image_settings.particle_trails);
    }

    #[test]
    fn test_new_config_renames() {
        let args = parse(&["--config", "1", "--new-config", "wide", "--width", "200"]);
        let input = args.create_input(&store()).unwrap();

        assert_eq!(input.name, "wide");
        assert_eq!(input.width, 200);
        assert_eq!(input.state.density, Some(PathBuf::from("dens")));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(parse(&["--config", "nope"]).create_input(&store()).is_err());
        assert!(parse(&["--mode", "stream"]).run_settings().is_err());
        assert!(parse(&["--palette", "neon"]).run_settings().is_err());
        assert!(
            CliArgs::try_parse_from(["stable-fluids-2d", "--segment", "1,2,3"]).is_err()
        );
    }

    #[test]
    fn test_headless() {
        let settings = parse(&["--mode", "headless", "--frames", "12", "--save"])
            .run_settings()
            .unwrap();

        assert_eq!(settings.mode, InterfaceMode::Headless);
        assert_eq!(settings.frames, 12);
        assert!(settings.save);
    }
}
