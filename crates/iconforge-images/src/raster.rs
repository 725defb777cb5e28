//! PNG encoding and RGBA decoding helpers shared by the pipeline stages.

use std::io::Cursor;

use image::{ImageFormat, RgbaImage};

use crate::error::{ForgeError, ForgeResult};

/// Encode an RGBA raster as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> ForgeResult<Vec<u8>> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| ForgeError::Processing(format!("failed to encode PNG: {}", e)))?;
    Ok(buffer)
}

/// Decode any supported container into an RGBA raster.
pub fn decode_rgba(bytes: &[u8]) -> ForgeResult<RgbaImage> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| ForgeError::InvalidImage(e.to_string()))?;
    Ok(image.to_rgba8())
}
