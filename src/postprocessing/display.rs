/// Handles video playback post-solve

use std::{
    error::Error,
    fs,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use image::{DynamicImage, GenericImageView, imageops::FilterType};
use minifb::{Key, Window, WindowOptions};
use ndarray::Array1;
use screen_size::get_primary_screen_size as get_screen_size;
use tracing::warn;

/// Width used for the window when the screen size is unknown
const FALLBACK_WINDOW_WIDTH: u64 = 800;

/// Pick the frame index to show at each of `total` evenly spaced instants
/// over `[0, elapsed_time]`.
///
/// Parameters
/// - `elapsed_time` - The time domain of the simulation
/// - `total` - How many instants to sample
/// - `temporal_map` - The simulated time at the end of every frame, ascending
pub fn sample_frames(elapsed_time: f32, total: usize, temporal_map: &[f32]) -> Vec<usize> {
    let mut desired_frames: Vec<usize> = Vec::with_capacity(total);
    let Some(last) = temporal_map.len().checked_sub(1) else {
        return desired_frames;
    };

    for t in Array1::linspace(0., elapsed_time, total) {
        let idx = temporal_map.iter().position(|&f| f >= t).unwrap_or(last);
        desired_frames.push(idx);
    }
    desired_frames
}

/// The png frames of `frames_dir` named in `indices`, in the order given
fn frame_paths(frames_dir: &Path, indices: &[usize]) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let mut available: Vec<(usize, PathBuf)> = fs::read_dir(frames_dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("png"))
        .filter_map(|p| {
            let idx = p
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|f| f.parse::<usize>().ok())?;
            Some((idx, p))
        })
        .collect();
    available.sort_by_key(|(idx, _)| *idx);

    Ok(indices
        .iter()
        .filter_map(|i| {
            available
                .binary_search_by_key(i, |(idx, _)| *idx)
                .ok()
                .map(|pos| available[pos].1.clone())
        })
        .collect())
}

/// Open a window and play the simulation solution in realtime. Samples
/// simulation frames (png images) in such a way that the video plays
/// at true speed.
///
/// Parameters
/// - `elapsed_time` - The time domain of the simulation
/// - `fps` - The desired *video* frames per second
/// - `temporal_map` - A vector with indices pointing to the time-value in that iteration
/// - `frames_dir` - The directory that contains the frames (png images) to animate.
pub fn play_video(
    elapsed_time: f32,
    fps: usize,
    temporal_map: &[f32],
    frames_dir: &Path,
) -> Result<(), Box<dyn Error>> {
    let fps = fps.max(1);

    // determine which frame indices to sample
    let total_frames = ((elapsed_time * (fps as f32)).floor() as usize).max(1);
    let desired_frames = sample_frames(elapsed_time, total_frames, temporal_map);

    let paths = frame_paths(frames_dir, &desired_frames)?;
    if paths.is_empty() {
        return Err("no PNG frames found".into());
    }

    // load all frames as DynamicImage
    let originals: Vec<DynamicImage> = paths.iter().map(image::open).collect::<Result<_, _>>()?;

    // determine base dimensions
    let (w, h) = originals[0].dimensions();
    let screen_w: u64 = match get_screen_size() {
        Ok((screen_w, _)) => screen_w as u64,
        Err(err) => {
            warn!("Unable to read the screen size: {:?}", err);
            FALLBACK_WINDOW_WIDTH * 2
        }
    };
    let init_w = screen_w / 2;
    let init_h = (init_w as f32 * (h as f32 / w as f32)) as u64;

    // create window
    let mut window = Window::new(
        "Stable Fluids 2D",
        init_w as usize,
        init_h as usize,
        WindowOptions {
            resize: true,
            ..WindowOptions::default()
        },
    )?;

    let frame_time = Duration::from_secs_f64(1.0 / fps as f64);
    let start = Instant::now();

    while window.is_open() && !window.is_key_down(Key::Escape) {
        // get current window size
        let (win_w, win_h) = window.get_size();
        // current frame index
        let elapsed = Instant::now().duration_since(start);
        let tick = (elapsed.as_secs_f64() * fps as f64) as usize;
        let idx = tick % originals.len();

        // resize & convert to RGBA buffer
        let img = originals[idx]
            .resize_exact(win_w as u32, win_h as u32, FilterType::Nearest)
            .to_rgba8();

        let buffer: Vec<u32> = img
            .pixels()
            .map(|px| {
                ((px[3] as u32) << 24)
                    | ((px[0] as u32) << 16)
                    | ((px[1] as u32) << 8)
                    | (px[2] as u32)
            })
            .collect();

        window.update_with_buffer(&buffer, win_w, win_h)?;

        // throttle to fps
        let next = start + frame_time * (tick + 1) as u32;
        if let Some(d) = next.checked_duration_since(Instant::now()) {
            std::thread::sleep(d);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{env, process};

    use super::*;

    #[test]
    fn test_sample_frames_at_true_speed() {
        // one frame every 0.5 time units
        let temporal_map: Vec<f32> = (1..=8).map(|i| i as f32 * 0.5).collect();

        let frames = sample_frames(4., 5, &temporal_map);
        assert_eq!(frames, vec![0, 1, 3, 5, 7]);
    }

    #[test]
    fn test_sample_frames_clamps_to_last() {
        let frames = sample_frames(10., 3, &[1., 2.]);
        assert_eq!(frames, vec![0, 1, 1]);

        assert!(sample_frames(1., 4, &[]).is_empty());
    }

    #[test]
    fn test_frame_paths_follow_indices() {
        let dir = env::temp_dir().join(format!("stable-fluids-playback-{}", process::id()));
        fs::create_dir_all(&dir).unwrap();
        for name in ["0.png", "1.png", "2.png", "10.png", "notes.txt"] {
            fs::write(dir.join(name), b"").unwrap();
        }

        let paths = frame_paths(&dir, &[10, 0, 0, 5, 2]).unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_owned())
            .collect();
        assert_eq!(names, vec!["10.png", "0.png", "0.png", "2.png"]);

        fs::remove_dir_all(&dir).unwrap();
    }
}
