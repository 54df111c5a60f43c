use std::io::{Cursor, Write};

use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::{AnimationDecoder, Delay, Frame, ImageFormat, ImageResult, RgbaImage};

/// GIF quantizer speed (1 = best quality, 30 = fastest).
const GIF_ENCODE_SPEED: i32 = 10;

/// One fully composited animation frame and how long it stays on screen.
#[derive(Clone, Debug)]
pub struct AnimationFrame {
    pub image: RgbaImage,
    pub delay: Delay,
}

/// Decodes any still format the `image` crate understands into RGBA.
pub fn decode_still(bytes: &[u8]) -> ImageResult<RgbaImage> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

pub fn encode_png(image: &RgbaImage) -> ImageResult<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

/// Lazily decodes GIF frames onto the full logical screen, in order.
///
/// Only the frame being yielded is held in memory.
pub fn gif_frames(
    bytes: &[u8],
) -> ImageResult<impl Iterator<Item = ImageResult<AnimationFrame>> + '_> {
    let decoder = GifDecoder::new(Cursor::new(bytes))?;
    Ok(decoder.into_frames().map(|frame| {
        frame.map(|frame| AnimationFrame {
            delay: frame.delay(),
            image: frame.into_buffer(),
        })
    }))
}

/// Decodes every GIF frame at once.
pub fn decode_gif(bytes: &[u8]) -> ImageResult<Vec<AnimationFrame>> {
    gif_frames(bytes)?.collect()
}

/// Writes full-screen frames to a looping GIF as they arrive.
pub struct GifWriter<W: Write> {
    encoder: GifEncoder<W>,
}

impl<W: Write> GifWriter<W> {
    pub fn new(out: W) -> ImageResult<Self> {
        let mut encoder = GifEncoder::new_with_speed(out, GIF_ENCODE_SPEED);
        encoder.set_repeat(Repeat::Infinite)?;
        Ok(Self { encoder })
    }

    pub fn push(&mut self, frame: AnimationFrame) -> ImageResult<()> {
        self.encoder
            .encode_frame(Frame::from_parts(frame.image, 0, 0, frame.delay))
    }
}

/// Encodes full-screen frames as a looping GIF.
pub fn encode_gif(frames: Vec<AnimationFrame>) -> ImageResult<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut writer = GifWriter::new(&mut buf)?;
        for frame in frames {
            writer.push(frame)?;
        }
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::time::Duration;

    fn solid(w: u32, h: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(color))
    }

    #[test]
    fn test_png_roundtrip_preserves_pixels() {
        let img = solid(12, 7, [10, 20, 30, 255]);
        let png = encode_png(&img).unwrap();
        assert_eq!(image::guess_format(&png).unwrap(), ImageFormat::Png);
        assert_eq!(decode_still(&png).unwrap(), img);
    }

    #[test]
    fn test_decode_still_rejects_garbage() {
        assert!(decode_still(b"not an image").is_err());
    }

    #[test]
    fn test_gif_keeps_frame_order_and_delays() {
        let colors = [[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255]];
        let frames: Vec<_> = colors
            .iter()
            .enumerate()
            .map(|(i, c)| AnimationFrame {
                image: solid(8, 6, *c),
                delay: Delay::from_numer_denom_ms(100 * (i as u32 + 1), 1),
            })
            .collect();

        let gif = encode_gif(frames).unwrap();
        let decoded = decode_gif(&gif).unwrap();

        assert_eq!(decoded.len(), 3);
        for (i, (frame, color)) in decoded.iter().zip(colors).enumerate() {
            assert_eq!(frame.image.dimensions(), (8, 6));
            assert_eq!(frame.image.get_pixel(3, 3).0, color);
            assert_eq!(
                Duration::from(frame.delay),
                Duration::from_millis(100 * (i as u64 + 1))
            );
        }
    }

    #[test]
    fn test_decode_gif_rejects_png() {
        let png = encode_png(&solid(4, 4, [0, 0, 0, 255])).unwrap();
        assert!(decode_gif(&png).is_err());
    }
}
