use na::DMatrix;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::{error::Error, fs, path::Path, sync::mpsc};
use tracing::{debug, info};

use crate::{observers::tracers::Tracers, preprocessing::ImageStreamSettings};

/// Colour of obstacle cells in rendered frames
const OBSTACLE_COLOR: RGBColor = RGBColor(80, 80, 200);

/// Colour of the velocity arrows and of their origins
const VECTOR_COLOR: RGBColor = RGBColor(0, 51, 255);
const VECTOR_ORIGIN_COLOR: RGBColor = RGBColor(0, 255, 0);

/// Velocity to arrow length gain, and the longest arrow, both as a
/// fraction of half the frame
const VECTOR_GAIN: f32 = 10.;
const VECTOR_LIMIT: f32 = 0.1;

/// Fields indexed (x, y), as they were at the end of frame `i`
#[derive(Clone)]
pub struct DisplayPacket {
    pub density: DMatrix<f32>,
    pub velocity_x: DMatrix<f32>,
    pub velocity_y: DMatrix<f32>,
    pub i: usize,
}

/// How density samples map to pixel colours
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Palette {
    /// White with the density as opacity
    #[default]
    Gray,
    /// Black through red and yellow to white at densities 1, 4 and 10
    Heat,
}

impl Palette {
    /// The colour of a cell holding `density`, composited over black
    pub fn color(self, density: f32) -> RGBColor {
        let channel = |x: f32| (255.0 * x.clamp(0., 1.)).round() as u8;

        match self {
            Palette::Gray => {
                let c = channel(density);
                RGBColor(c, c, c)
            }
            Palette::Heat => {
                if density < 1. {
                    let x = density.max(0.);
                    RGBColor(channel(x * x), 0, 0)
                } else if density < 4. {
                    RGBColor(255, channel((density - 1.) / 3.), 0)
                } else if density < 10. {
                    RGBColor(255, 255, channel((density - 4.) / 6.))
                } else {
                    RGBColor(255, 255, 255)
                }
            }
        }
    }
}

/// Pixel end points of the arrow drawn from the centre of every cell.
///
/// Arrows grow with the local velocity and are capped at a tenth of half
/// the frame in each direction.
pub fn velocity_arrows(
    u: &DMatrix<f32>,
    v: &DMatrix<f32>,
    scale: usize,
) -> Vec<((i32, i32), (i32, i32))> {
    let (width, height) = u.shape();
    let half_w = (width * scale) as f32 / 2.;
    let half_h = (height * scale) as f32 / 2.;
    let reach = |velocity: f32| (velocity * VECTOR_GAIN).clamp(-VECTOR_LIMIT, VECTOR_LIMIT);

    let mut arrows = Vec::with_capacity(width * height);
    for x in 0..width {
        for y in 0..height {
            let cx = (x * scale) as f32 + scale as f32 / 2.;
            let cy = ((height - 1 - y) * scale) as f32 + scale as f32 / 2.;

            let tip_x = cx + reach(u[(x, y)]) * half_w;
            let tip_y = cy - reach(v[(x, y)]) * half_h;

            arrows.push((
                (cx.floor() as i32, cy.floor() as i32),
                (tip_x.round() as i32, tip_y.round() as i32),
            ));
        }
    }
    arrows
}

/// Turns display packets into png frames, carrying the particle tracers
/// from one frame to the next.
pub struct FrameRenderer {
    /// Obstacle cells, indexed (y, x)
    mask: DMatrix<bool>,
    palette: Palette,
    scale: usize,
    vectors: bool,
    tracers: Option<Tracers>,
}

impl FrameRenderer {
    pub fn new(mask: DMatrix<bool>, palette: Palette, scale: usize) -> Self {
        FrameRenderer {
            mask,
            palette,
            scale: scale.max(1),
            vectors: false,
            tracers: None,
        }
    }

    /// A renderer with the overlays requested in `settings`
    pub fn from_settings(mask: DMatrix<bool>, settings: &ImageStreamSettings, scale: usize) -> Self {
        let grid = (mask.ncols(), mask.nrows());
        let mut renderer = FrameRenderer::new(mask, settings.palette, scale).with_vectors(settings.vectors);

        if settings.particles > 0 {
            info!("Tracing {} particles", settings.particles);
            renderer = renderer.with_tracers(Tracers::seed(
                settings.particles,
                grid,
                settings.particle_trails,
                &mut rand::rng(),
            ));
        }
        renderer
    }

    pub fn with_vectors(mut self, vectors: bool) -> Self {
        self.vectors = vectors;
        self
    }

    pub fn with_tracers(mut self, tracers: Tracers) -> Self {
        self.tracers = Some(tracers);
        self
    }

    pub fn tracers(&self) -> Option<&Tracers> {
        self.tracers.as_ref()
    }

    /// Advance the tracers with the packet's velocity, then draw the frame to `path`
    pub fn render(&mut self, packet: &DisplayPacket, path: &Path) -> Result<(), Box<dyn Error>> {
        let (width, height) = packet.density.shape();
        if self.mask.shape() != (height, width) {
            return Err(format!(
                "obstacle mask is {:?} but the density grid is {width}x{height}",
                self.mask.shape()
            )
            .into());
        }
        if packet.velocity_x.shape() != (width, height) || packet.velocity_y.shape() != (width, height)
        {
            return Err(format!(
                "velocity grids are {:?} and {:?} but the density grid is {width}x{height}",
                packet.velocity_x.shape(),
                packet.velocity_y.shape()
            )
            .into());
        }

        if let Some(tracers) = &mut self.tracers {
            tracers.advance(&packet.velocity_x, &packet.velocity_y);
        }

        let scale = self.scale;
        let root = BitMapBackend::new(path, ((width * scale) as u32, (height * scale) as u32))
            .into_drawing_area();
        root.fill(&BLACK)?;

        for x in 0..width {
            for y in 0..height {
                let color = if self.mask[(y, x)] {
                    OBSTACLE_COLOR
                } else {
                    self.palette.color(packet.density[(x, y)])
                };

                // y grows upwards in the grid
                let (px, py) = ((x * scale) as i32, ((height - 1 - y) * scale) as i32);
                let s = scale as i32;
                root.draw(&Rectangle::new(
                    [(px, py), (px + s - 1, py + s - 1)],
                    color.filled(),
                ))?;
            }
        }

        if self.vectors {
            for (origin, tip) in velocity_arrows(&packet.velocity_x, &packet.velocity_y, scale) {
                root.draw(&PathElement::new(vec![origin, tip], VECTOR_COLOR))?;
                root.draw_pixel(origin, &VECTOR_ORIGIN_COLOR)?;
            }
        }

        if let Some(tracers) = &self.tracers {
            let (w_px, h_px) = ((width * scale) as f32, (height * scale) as f32);
            for ((x, y), alpha) in tracers.points() {
                let (px, py) = (x * scale as f32, h_px - y * scale as f32);
                if !(0. ..w_px).contains(&px) || !(0. ..h_px).contains(&py) {
                    continue;
                }
                root.draw_pixel((px as i32, py as i32), &WHITE.mix(alpha))?;
            }
        }
        root.present()?;

        Ok(())
    }
}

/// Write every inbound frame to `<frames_dir>/<i>.png` until the sending
/// side hangs up.
pub fn image_io_loop(
    inbound_frames: mpsc::Receiver<DisplayPacket>,
    mut renderer: FrameRenderer,
    frames_dir: &Path,
) -> Result<(), Box<dyn Error>> {
    if frames_dir.exists() {
        fs::remove_dir_all(frames_dir)?;
    }
    fs::create_dir_all(frames_dir)?;

    while let Ok(inbound) = inbound_frames.recv() {
        let filename = frames_dir.join(format!("{}.png", inbound.i));
        renderer.render(&inbound, &filename)?;
    }
    debug!("frame channel closed");

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{env, thread};

    use super::*;

    fn packet(width: usize, height: usize, density: f32, i: usize) -> DisplayPacket {
        DisplayPacket {
            density: DMatrix::from_element(width, height, density),
            velocity_x: DMatrix::zeros(width, height),
            velocity_y: DMatrix::zeros(width, height),
            i,
        }
    }

    fn scratch_png(name: &str) -> std::path::PathBuf {
        env::temp_dir().join(format!("stable-fluids-frame-{}-{name}.png", std::process::id()))
    }

    #[test]
    fn test_gray_palette_clamps() {
        assert_eq!(Palette::Gray.color(-1.), RGBColor(0, 0, 0));
        assert_eq!(Palette::Gray.color(0.5), RGBColor(128, 128, 128));
        assert_eq!(Palette::Gray.color(7.), RGBColor(255, 255, 255));
    }

    #[test]
    fn test_heat_palette_bands() {
        assert_eq!(Palette::Heat.color(0.), RGBColor(0, 0, 0));
        assert_eq!(Palette::Heat.color(0.5), RGBColor(64, 0, 0));
        assert_eq!(Palette::Heat.color(2.2), RGBColor(255, 102, 0));
        assert_eq!(Palette::Heat.color(3.99), RGBColor(255, 254, 0));
        assert_eq!(Palette::Heat.color(4.25), RGBColor(255, 255, 11));
        assert_eq!(Palette::Heat.color(7.), RGBColor(255, 255, 128));
        assert_eq!(Palette::Heat.color(12.), RGBColor(255, 255, 255));
    }

    #[test]
    fn test_palette_serde() {
        assert_eq!(serde_json::to_string(&Palette::Heat).unwrap(), "\"heat\"");
        let palette: Palette = serde_json::from_str("\"gray\"").unwrap();
        assert_eq!(palette, Palette::Gray);
    }

    #[test]
    fn test_rejects_mismatched_mask() {
        let mut renderer = FrameRenderer::new(DMatrix::from_element(6, 4, false), Palette::Gray, 1);

        assert!(renderer.render(&packet(6, 4, 0., 0), &scratch_png("bad")).is_err());
    }

    #[test]
    fn test_velocity_arrows_are_capped() {
        let u = DMatrix::from_fn(4, 2, |x, _| [0., 0.005, 0.5, -0.5][x]);
        let v = DMatrix::from_fn(4, 2, |_, y| if y == 0 { 0.5 } else { 0. });

        let arrows = velocity_arrows(&u, &v, 10);
        assert_eq!(arrows.len(), 8);

        // cell (0, 1) is drawn at the top left, still
        assert_eq!(arrows[1], ((5, 5), (5, 5)));
        // half the cap, 0.05 of the 20 px half width
        assert_eq!(arrows[3], ((15, 5), (16, 5)));
        // capped at 2 px along x and 1 px upwards along y
        assert_eq!(arrows[4], ((25, 15), (27, 14)));
        assert_eq!(arrows[6], ((35, 15), (33, 14)));
    }

    #[test]
    fn test_overlays_render() {
        let mut data = packet(12, 8, 0.2, 0);
        data.velocity_x.fill(0.05);
        data.velocity_y.fill(-0.02);

        let mut renderer = FrameRenderer::new(DMatrix::from_element(8, 12, false), Palette::Heat, 3)
            .with_vectors(true)
            .with_tracers(Tracers::from_positions([(2.5, 4.5), (30., 1.)], true));
        let path = scratch_png("overlays");

        renderer.render(&data, &path).unwrap();
        renderer.render(&data, &path).unwrap();

        let heads: Vec<_> = renderer.tracers().unwrap().heads().collect();
        assert!((heads[0].0 - 10.5).abs() < 1e-4);
        assert!((heads[0].1 - 1.3).abs() < 1e-4);
        assert_eq!(heads[1], (30., 1.));
        assert_eq!(image::image_dimensions(&path).unwrap(), (36, 24));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_settings_seed_tracers() {
        let settings = ImageStreamSettings {
            frames_dir: env::temp_dir(),
            retain_frames: false,
            display_video: false,
            palette: Palette::Gray,
            vectors: true,
            particles: 25,
            particle_trails: false,
        };

        let renderer = FrameRenderer::from_settings(DMatrix::from_element(10, 20, false), &settings, 2);
        let tracers = renderer.tracers().unwrap();
        assert_eq!(tracers.len(), 25);
        assert!(tracers.heads().all(|(x, y)| x < 20. && y < 10.));

        let plain = FrameRenderer::from_settings(
            DMatrix::from_element(10, 20, false),
            &ImageStreamSettings {
                particles: 0,
                ..settings
            },
            2,
        );
        assert!(plain.tracers().is_none());
    }

    #[test]
    fn test_io_loop_writes_frames() {
        let frames_dir = env::temp_dir().join(format!("stable-fluids-frames-{}", std::process::id()));
        let (sender, receiver) = mpsc::channel();

        let dir = frames_dir.clone();
        let writer = thread::spawn(move || {
            let renderer = FrameRenderer::new(DMatrix::from_element(5, 6, false), Palette::Gray, 2);
            image_io_loop(receiver, renderer, &dir).map_err(|err| err.to_string())
        });

        for i in 0..3 {
            sender.send(packet(6, 5, 0.5, i)).unwrap();
        }
        drop(sender);

        writer.join().unwrap().unwrap();
        for i in 0..3 {
            let (w, h) = image::image_dimensions(frames_dir.join(format!("{i}.png"))).unwrap();
            assert_eq!((w, h), (12, 10));
        }
        fs::remove_dir_all(&frames_dir).unwrap();
    }
}
