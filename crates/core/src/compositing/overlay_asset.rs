use image::{imageops, RgbaImage};

use crate::shared::region::Region;

/// Where a raster lands on the canvas, in canvas pixels (unrounded).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A decorative raster plus the anchor it should be pinned to a face with.
///
/// The anchor offsets locate the feature (e.g. the moose's muzzle) relative
/// to the asset's own top-left; `anchor_height` is that feature's height in
/// asset pixels and fixes the scale against a detected region.
#[derive(Clone, Debug)]
pub struct OverlayAsset {
    image: RgbaImage,
    anchor_left_offset: f32,
    anchor_top_offset: f32,
    anchor_height: f32,
}

impl OverlayAsset {
    pub fn new(
        image: RgbaImage,
        anchor_left_offset: f32,
        anchor_top_offset: f32,
        anchor_height: f32,
    ) -> Self {
        Self {
            image,
            anchor_left_offset,
            anchor_top_offset,
            anchor_height,
        }
    }

    /// Builds an overlay from the face found in a user-supplied image.
    ///
    /// The face is cropped out (clamped to the image) and anchored at its own
    /// top-left, so it lands exactly on the target region. Returns `None`
    /// when the clamped face is empty.
    pub fn from_face_crop(source: &RgbaImage, face: &Region) -> Option<Self> {
        let (w, h) = source.dimensions();
        let left = face.x.clamp(0, w as i32) as u32;
        let top = face.y.clamp(0, h as i32) as u32;
        let right = face.right().clamp(0, w as i32) as u32;
        let bottom = face.bottom().clamp(0, h as i32) as u32;
        if right <= left || bottom <= top {
            return None;
        }

        let crop = imageops::crop_imm(source, left, top, right - left, bottom - top).to_image();
        let crop_height = crop.height() as f32;
        Some(Self::new(crop, 0.0, 0.0, crop_height))
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn anchor_height(&self) -> f32 {
        self.anchor_height
    }

    /// Uniform scale and position that pins the anchor to the region's top-left.
    pub fn placement(&self, region: &Region) -> Placement {
        let scale = region.height as f32 / self.anchor_height;
        Placement {
            x: region.x as f32 - self.anchor_left_offset * scale,
            y: region.y as f32 - self.anchor_top_offset * scale,
            width: self.image.width() as f32 * scale,
            height: self.image.height() as f32 * scale,
        }
    }
}

/// Left and right antler rasters, scaled together off the right antler.
#[derive(Clone, Debug)]
pub struct AntlerPair {
    left: RgbaImage,
    right: RgbaImage,
}

impl AntlerPair {
    pub fn new(left: RgbaImage, right: RgbaImage) -> Self {
        Self { left, right }
    }

    pub fn left(&self) -> &RgbaImage {
        &self.left
    }

    pub fn right(&self) -> &RgbaImage {
        &self.right
    }

    /// Placements for `(left, right)` antlers on a face region.
    ///
    /// Antlers are half the face height tall (measured on the right antler)
    /// and sink a quarter of the face into its top corners.
    pub fn placements(&self, region: &Region) -> (Placement, Placement) {
        let scale = 0.5 * region.height as f32 / self.right.height() as f32;
        let inset_h = 0.25 * region.width as f32;
        let inset_v = 0.25 * region.height as f32;

        let left_w = self.left.width() as f32 * scale;
        let left_h = self.left.height() as f32 * scale;
        let right_w = self.right.width() as f32 * scale;
        let right_h = self.right.height() as f32 * scale;

        let left = Placement {
            x: region.x as f32 + inset_h - left_w,
            y: region.y as f32 + inset_v - left_h,
            width: left_w,
            height: left_h,
        };
        let right = Placement {
            x: region.right() as f32 - inset_h,
            y: region.y as f32 + inset_v - right_h,
            width: right_w,
            height: right_h,
        };
        (left, right)
    }
}
