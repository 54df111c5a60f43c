use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use super::overlay_asset::{AntlerPair, OverlayAsset, Placement};
use crate::shared::region::Region;

/// Largest side, in pixels, a resampled overlay may have before it is skipped.
const MAX_SCALED_SIDE: f32 = 16_384.0;

const DEBUG_STROKE: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Which decorations to draw on each selected region.
#[derive(Clone, Copy, Debug, Default)]
pub struct OverlayMode<'a> {
    pub debug: bool,
    pub overlay: Option<&'a OverlayAsset>,
    pub antlers: Option<&'a AntlerPair>,
}

/// Draws overlays onto a canvas in place. Never fails: anything that cannot
/// be drawn (zero-sized or absurdly scaled) is skipped.
pub struct Compositor {
    stroke: Rgba<u8>,
}

impl Compositor {
    pub fn new(stroke: Rgba<u8>) -> Self {
        Self { stroke }
    }

    /// Decorates one region: debug outline, then overlay, then antlers.
    pub fn draw_overlay(&self, canvas: &mut RgbaImage, region: &Region, mode: &OverlayMode<'_>) {
        if mode.debug {
            stroke_rect(canvas, region, self.stroke);
        }
        if let Some(asset) = mode.overlay {
            if asset.anchor_height() > 0.0 {
                blit_scaled(canvas, asset.image(), &asset.placement(region));
            }
        }
        if let Some(antlers) = mode.antlers {
            if antlers.right().height() > 0 {
                let (left, right) = antlers.placements(region);
                blit_scaled(canvas, antlers.left(), &left);
                blit_scaled(canvas, antlers.right(), &right);
            }
        }
    }

    /// Centers `image` on the canvas at half the canvas's longer side,
    /// keeping the image's aspect ratio.
    pub fn draw_centered(&self, canvas: &mut RgbaImage, image: &RgbaImage) {
        if image.width() == 0 || image.height() == 0 {
            return;
        }
        let (cw, ch) = (canvas.width() as f32, canvas.height() as f32);
        let ratio = image.width() as f32 / image.height() as f32;
        let (width, height) = if cw > ch {
            let w = cw * 0.5;
            (w, w / ratio)
        } else {
            let h = ch * 0.5;
            (h * ratio, h)
        };
        let placement = Placement {
            x: (cw - width) / 2.0,
            y: (ch - height) / 2.0,
            width,
            height,
        };
        blit_scaled(canvas, image, &placement);
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(DEBUG_STROKE)
    }
}

/// Resamples `image` to the placement size and alpha-blends it onto the canvas.
fn blit_scaled(canvas: &mut RgbaImage, image: &RgbaImage, placement: &Placement) {
    if !(placement.width.is_finite() && placement.height.is_finite())
        || placement.width > MAX_SCALED_SIDE
        || placement.height > MAX_SCALED_SIDE
    {
        log::warn!("Skipping overlay with unusable size {placement:?}");
        return;
    }
    let width = placement.width.round() as u32;
    let height = placement.height.round() as u32;
    if width == 0 || height == 0 {
        return;
    }

    let x = placement.x.floor() as i64;
    let y = placement.y.floor() as i64;
    if image.dimensions() == (width, height) {
        imageops::overlay(canvas, image, x, y);
    } else {
        let scaled = imageops::resize(image, width, height, FilterType::Triangle);
        imageops::overlay(canvas, &scaled, x, y);
    }
}

/// One-pixel outline covering `x..=right` and `y..=bottom`, clipped to the canvas.
fn stroke_rect(canvas: &mut RgbaImage, region: &Region, color: Rgba<u8>) {
    let (w, h) = (canvas.width() as i64, canvas.height() as i64);
    let (x0, y0) = (region.x as i64, region.y as i64);
    let (x1, y1) = (region.right() as i64, region.bottom() as i64);
    let mut plot = |x: i64, y: i64| {
        if (0..w).contains(&x) && (0..h).contains(&y) {
            canvas.put_pixel(x as u32, y as u32, color);
        }
    };
    for x in x0.max(0)..=x1.min(w - 1) {
        plot(x, y0);
        plot(x, y1);
    }
    for y in y0.max(0)..=y1.min(h - 1) {
        plot(x0, y);
        plot(x1, y);
    }
}
