use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbaImage};
use log::{debug, info};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Config;
use crate::error::OutputError;
use crate::turntable::frame_path;

/// Assembles numbered frame files into a looping GIF
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationEncoder {
    frame_duration: Duration,
    loop_count: u16,
}

impl AnimationEncoder {
    /// `loop_count` 0 loops forever
    pub fn new(frame_duration: Duration, loop_count: u16) -> Self {
        Self {
            frame_duration,
            loop_count,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.frame_duration, config.loop_count)
    }

    pub fn repeat(&self) -> Repeat {
        match self.loop_count {
            0 => Repeat::Infinite,
            n => Repeat::Finite(n),
        }
    }

    /// Read frames `0..num_frames` back from `frames_dir` and encode them into `output`.
    ///
    /// Every frame is checked and decoded before `output` is created, so a missing
    /// frame leaves no partial animation behind.
    pub fn encode_directory(&self, frames_dir: &Path, num_frames: u32, output: &Path) -> Result<(), OutputError> {
        let paths: Vec<PathBuf> = (0..num_frames).map(|i| frame_path(frames_dir, i)).collect();
        for (index, path) in (0..num_frames).zip(&paths) {
            if !path.is_file() {
                return Err(OutputError::MissingFrame {
                    index,
                    path: path.clone(),
                });
            }
        }

        let frames = paths
            .iter()
            .map(|path| {
                image::open(path)
                    .map(|img| img.to_rgba8())
                    .map_err(|source| OutputError::Image {
                        path: path.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!("Decoded {} frames from {}", frames.len(), frames_dir.display());

        self.encode(frames, output)
    }

    /// Encode `frames` into `output`. The file is flushed before returning, so a
    /// short write on a full disk is an error rather than a truncated GIF.
    pub fn encode(&self, frames: Vec<RgbaImage>, output: &Path) -> Result<(), OutputError> {
        let count = frames.len();
        let gif_error = |source| OutputError::Image {
            path: output.to_path_buf(),
            source,
        };
        let write_error = |source| OutputError::Write {
            path: output.to_path_buf(),
            source,
        };

        let file = File::create(output).map_err(write_error)?;
        let mut writer = BufWriter::new(file);
        {
            let mut encoder = GifEncoder::new(&mut writer);
            encoder.set_repeat(self.repeat()).map_err(gif_error)?;

            let delay = Delay::from_saturating_duration(self.frame_duration);
            encoder
                .encode_frames(frames.into_iter().map(|buffer| Frame::from_parts(buffer, 0, 0, delay)))
                .map_err(gif_error)?;
        }
        // Dropping the encoder wrote the trailer into the buffer
        writer.flush().map_err(write_error)?;

        info!(
            "Encoded {} frames at {:?} per frame into {}",
            count,
            self.frame_duration,
            output.display()
        );
        Ok(())
    }
}
