use thiserror::Error;

use super::frame_processor::FrameProcessor;
use crate::compositing::compositor::OverlayMode;
use crate::detection::domain::face_detector::DetectionError;
use crate::media::infrastructure::image_codec::{gif_frames, AnimationFrame, GifWriter};
use crate::shared::constants::MAX_ANIMATION_FRAMES;

#[derive(Error, Debug)]
pub enum FrameEncodingError {
    #[error("failed to decode animation: {0}")]
    Decode(#[source] image::ImageError),
    #[error("detection failed on frame {index}: {source}")]
    Detection {
        index: usize,
        #[source]
        source: DetectionError,
    },
    #[error("failed to encode animation: {0}")]
    Encode(#[source] image::ImageError),
    #[error("animation has more than {limit} frames")]
    TooManyFrames { limit: usize },
}

/// Runs the single-frame pipeline over every frame of an animated GIF.
///
/// Frames are decoded, decorated and encoded one at a time.
#[derive(Clone)]
pub struct MultiFrameProcessor {
    frames: FrameProcessor,
    max_frames: usize,
}

impl MultiFrameProcessor {
    pub fn new(frames: FrameProcessor) -> Self {
        Self {
            frames,
            max_frames: MAX_ANIMATION_FRAMES,
        }
    }

    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Decorates each frame and re-encodes the animation with the source's
    /// frame order and delays. Frames without a face stay undecorated.
    pub fn process(
        &self,
        encoded_gif: &[u8],
        mode: &OverlayMode<'_>,
    ) -> Result<Vec<u8>, FrameEncodingError> {
        let frames = gif_frames(encoded_gif).map_err(FrameEncodingError::Decode)?;

        let mut out = Vec::new();
        let mut count = 0;
        {
            let mut writer = GifWriter::new(&mut out).map_err(FrameEncodingError::Encode)?;
            for (index, frame) in frames.enumerate() {
                if index >= self.max_frames {
                    return Err(FrameEncodingError::TooManyFrames {
                        limit: self.max_frames,
                    });
                }
                let frame = frame.map_err(FrameEncodingError::Decode)?;
                let image = self
                    .frames
                    .process(&frame.image, mode, false)
                    .map_err(|source| FrameEncodingError::Detection { index, source })?;
                writer
                    .push(AnimationFrame {
                        image,
                        delay: frame.delay,
                    })
                    .map_err(FrameEncodingError::Encode)?;
                count += 1;
            }
        }
        log::debug!("Processed {count} animation frame(s)");
        Ok(out)
    }
}
