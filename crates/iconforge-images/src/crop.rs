//! Smart crop: trim transparent margins, pad, and recenter on a square canvas.

use image::{imageops, RgbaImage};
use serde::{Deserialize, Serialize};

/// Smallest padding ever applied around the content.
pub const MIN_PADDING: u32 = 2;

/// Padding as a fraction of the larger content side.
pub const PADDING_RATIO: f64 = 0.10;

/// Crop rectangle in source-image coordinates. `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl CropBox {
    /// Box covering a whole `width`×`height` image.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            left: 0,
            top: 0,
            right: width,
            bottom: height,
        }
    }

    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    /// Whether `other` lies entirely inside this box.
    pub fn contains(&self, other: &CropBox) -> bool {
        self.left <= other.left
            && self.top <= other.top
            && self.right >= other.right
            && self.bottom >= other.bottom
    }

    /// `[left, top, right, bottom]`.
    pub fn to_array(&self) -> [u32; 4] {
        [self.left, self.top, self.right, self.bottom]
    }
}

/// Output of [`smart_crop`].
#[derive(Debug, Clone)]
pub struct CropOutcome {
    /// Square canvas with the content centred (or the untouched input when fully transparent)
    pub image: RgbaImage,
    /// Padded, clipped rectangle that was cut from the source
    pub crop_box: CropBox,
    /// Padding applied on every side before clipping
    pub padding: u32,
}

/// Padding for content whose larger side is `extent` pixels.
pub fn padding_for(extent: u32) -> u32 {
    // f64 arithmetic: ceil(30 * 0.1) is 4, not 3.
    let padded = (f64::from(extent) * PADDING_RATIO).ceil() as u32;
    padded.max(MIN_PADDING)
}

/// Tight bounding box of pixels with non-zero alpha, or `None` if fully transparent.
pub fn visible_bounds(image: &RgbaImage) -> Option<CropBox> {
    let mut bounds: Option<CropBox> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[3] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => CropBox {
                left: x,
                top: y,
                right: x + 1,
                bottom: y + 1,
            },
            Some(b) => CropBox {
                left: b.left.min(x),
                top: b.top.min(y),
                right: b.right.max(x + 1),
                bottom: b.bottom.max(y + 1),
            },
        });
    }
    bounds
}

/// Crop to visible content plus padding and recentre onto a transparent square.
///
/// Offsets use floor division, so odd differences place the content one pixel
/// towards the top-left.
pub fn smart_crop(image: &RgbaImage) -> CropOutcome {
    let (width, height) = image.dimensions();

    let Some(bounds) = visible_bounds(image) else {
        return CropOutcome {
            image: image.clone(),
            crop_box: CropBox::full(width, height),
            padding: padding_for(width.max(height)),
        };
    };

    let padding = padding_for(bounds.width().max(bounds.height()));
    let crop_box = CropBox {
        left: bounds.left.saturating_sub(padding),
        top: bounds.top.saturating_sub(padding),
        right: (bounds.right + padding).min(width),
        bottom: (bounds.bottom + padding).min(height),
    };

    let cropped = imageops::crop_imm(
        image,
        crop_box.left,
        crop_box.top,
        crop_box.width(),
        crop_box.height(),
    )
    .to_image();

    let side = cropped.width().max(cropped.height());
    let mut canvas = RgbaImage::new(side, side);
    let offset_x = (side - cropped.width()) / 2;
    let offset_y = (side - cropped.height()) / 2;
    imageops::replace(&mut canvas, &cropped, i64::from(offset_x), i64::from(offset_y));

    CropOutcome {
        image: canvas,
        crop_box,
        padding,
    }
}
