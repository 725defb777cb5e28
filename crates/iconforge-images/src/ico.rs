//! Multi-resolution ICO packing.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! header     reserved:u16=0  type:u16=1  count:u16=4
//! entry x4   width:u8 height:u8 colors:u8=0 reserved:u8=0
//!            planes:u16=1 bpp:u16=32 length:u32 offset:u32
//! payloads   PNG frames, same order as the entries
//! ```
//!
//! Frames are always written in the order 256, 48, 32, 16 regardless of how the
//! caller supplied them. A width/height byte of 0 means 256.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{ForgeError, ForgeResult};
use crate::raster::{decode_rgba, encode_png};

/// Required frame sizes, in the order they are written.
pub const ICON_SIZES: [u32; 4] = [256, 48, 32, 16];

const HEADER_LEN: u32 = 6;
const ENTRY_LEN: u32 = 16;
const ICON_TYPE: u16 = 1;
const PLANES: u16 = 1;
const BITS_PER_PIXEL: u16 = 32;

/// One decoded directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconDirectoryEntry {
    /// Width in pixels (the stored 0 is reported as 256)
    pub width: u32,
    /// Height in pixels (the stored 0 is reported as 256)
    pub height: u32,
    pub color_count: u8,
    pub planes: u16,
    pub bits_per_pixel: u16,
    /// Payload length in bytes
    pub length: u32,
    /// Payload offset from the start of the file
    pub offset: u32,
}

/// Validate the four required frames and pack them into an ICO byte stream.
///
/// Every missing size is reported in a single error. Each frame must decode to
/// a square of exactly its declared size; frames are re-encoded as PNG.
///
/// Blocking; call from a worker thread in async contexts.
pub fn pack_ico(frames: &HashMap<u32, Vec<u8>>) -> ForgeResult<Vec<u8>> {
    let mut missing: Vec<u32> = ICON_SIZES
        .iter()
        .copied()
        .filter(|size| !frames.contains_key(size))
        .collect();
    if !missing.is_empty() {
        missing.sort_unstable();
        return Err(ForgeError::MissingIconSizes(missing));
    }

    let mut payloads = Vec::with_capacity(ICON_SIZES.len());
    for size in ICON_SIZES {
        payloads.push((size, validate_frame(&frames[&size], size)?));
    }

    write_container(&payloads).map_err(|e| ForgeError::Processing(format!("failed to write ICO: {}", e)))
}

fn validate_frame(bytes: &[u8], expected: u32) -> ForgeResult<Vec<u8>> {
    let image = decode_rgba(bytes).map_err(|e| ForgeError::InvalidIconData {
        size: expected,
        reason: e.to_string(),
    })?;

    let (width, height) = image.dimensions();
    if width != height || width != expected {
        return Err(ForgeError::IconDimensions {
            expected,
            width,
            height,
        });
    }

    encode_png(&image)
}

fn write_container(payloads: &[(u32, Vec<u8>)]) -> std::io::Result<Vec<u8>> {
    let count = payloads.len() as u32;
    let total: usize = payloads.iter().map(|(_, data)| data.len()).sum();
    let mut out = Vec::with_capacity((HEADER_LEN + ENTRY_LEN * count) as usize + total);

    out.write_u16::<LittleEndian>(0)?;
    out.write_u16::<LittleEndian>(ICON_TYPE)?;
    out.write_u16::<LittleEndian>(count as u16)?;

    let mut offset = HEADER_LEN + ENTRY_LEN * count;
    for (size, data) in payloads {
        let dimension = if *size >= 256 { 0 } else { *size as u8 };
        out.write_u8(dimension)?;
        out.write_u8(dimension)?;
        out.write_u8(0)?;
        out.write_u8(0)?;
        out.write_u16::<LittleEndian>(PLANES)?;
        out.write_u16::<LittleEndian>(BITS_PER_PIXEL)?;
        out.write_u32::<LittleEndian>(data.len() as u32)?;
        out.write_u32::<LittleEndian>(offset)?;
        offset += data.len() as u32;
    }

    for (_, data) in payloads {
        out.extend_from_slice(data);
    }
    Ok(out)
}

/// Read the header and directory of an ICO byte stream.
pub fn parse_icon_directory(bytes: &[u8]) -> ForgeResult<Vec<IconDirectoryEntry>> {
    let invalid = |e: std::io::Error| ForgeError::InvalidImage(format!("truncated ICO: {}", e));
    let mut cursor = Cursor::new(bytes);

    let reserved = cursor.read_u16::<LittleEndian>().map_err(invalid)?;
    let kind = cursor.read_u16::<LittleEndian>().map_err(invalid)?;
    let count = cursor.read_u16::<LittleEndian>().map_err(invalid)?;
    if reserved != 0 || kind != ICON_TYPE {
        return Err(ForgeError::InvalidImage(format!(
            "not an icon container (reserved={}, type={})",
            reserved, kind
        )));
    }

    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let mut head = [0u8; 4];
        cursor.read_exact(&mut head).map_err(invalid)?;
        let entry = IconDirectoryEntry {
            width: if head[0] == 0 { 256 } else { u32::from(head[0]) },
            height: if head[1] == 0 { 256 } else { u32::from(head[1]) },
            color_count: head[2],
            planes: cursor.read_u16::<LittleEndian>().map_err(invalid)?,
            bits_per_pixel: cursor.read_u16::<LittleEndian>().map_err(invalid)?,
            length: cursor.read_u32::<LittleEndian>().map_err(invalid)?,
            offset: cursor.read_u32::<LittleEndian>().map_err(invalid)?,
        };
        if entry.offset as usize + entry.length as usize > bytes.len() {
            return Err(ForgeError::InvalidImage(format!(
                "icon payload at {} (+{}) runs past end of file",
                entry.offset, entry.length
            )));
        }
        entries.push(entry);
    }
    Ok(entries)
}
