//! Property-based tests for ICO packing.
//!
//! The container layout must not depend on how the caller built the frame map.

use std::collections::HashMap;

use iconforge_images::raster::encode_png;
use iconforge_images::{pack_ico, parse_icon_directory, ForgeError, ICON_SIZES};
use image::{Rgba, RgbaImage};
use proptest::prelude::*;

fn frame(size: u32, colour: [u8; 4]) -> Vec<u8> {
    encode_png(&RgbaImage::from_pixel(size, size, Rgba(colour))).unwrap()
}

/// Strategy for an insertion order of the four required sizes.
fn insertion_order() -> impl Strategy<Value = Vec<u32>> {
    Just(ICON_SIZES.to_vec()).prop_shuffle()
}

/// Entries and payloads always follow 256, 48, 32, 16.
#[test]
fn prop_layout_independent_of_insertion_order() {
    proptest!(|(
        order in insertion_order(),
        colour in any::<[u8; 4]>(),
    )| {
        let mut frames = HashMap::new();
        for size in &order {
            frames.insert(*size, frame(*size, colour));
        }

        let ico = pack_ico(&frames).expect("valid frames must pack");
        let entries = parse_icon_directory(&ico).unwrap();

        prop_assert_eq!(&ico[..6], &[0u8, 0, 1, 0, 4, 0][..]);
        let widths: Vec<u32> = entries.iter().map(|e| e.width).collect();
        prop_assert_eq!(widths, ICON_SIZES.to_vec());

        let payload_total: u32 = entries.iter().map(|e| e.length).sum();
        prop_assert_eq!(ico.len() as u32, 6 + 64 + payload_total);

        let mut offset = 70;
        for entry in &entries {
            prop_assert_eq!(entry.offset, offset);
            prop_assert_eq!(entry.width, entry.height);
            offset += entry.length;
        }
    });
}

/// Any strict subset of sizes fails, naming exactly the missing ones.
#[test]
fn prop_missing_sizes_enumerated() {
    proptest!(|(present in prop::collection::vec(any::<bool>(), 4))| {
        prop_assume!(present.iter().any(|p| !p));

        let frames: HashMap<u32, Vec<u8>> = ICON_SIZES
            .iter()
            .zip(&present)
            .filter(|(_, keep)| **keep)
            .map(|(size, _)| (*size, frame(*size, [1, 2, 3, 255])))
            .collect();

        let mut expected: Vec<u32> = ICON_SIZES
            .iter()
            .zip(&present)
            .filter(|(_, keep)| !**keep)
            .map(|(size, _)| *size)
            .collect();
        expected.sort_unstable();

        match pack_ico(&frames) {
            Err(ForgeError::MissingIconSizes(missing)) => {
                prop_assert_eq!(&missing, &expected);
                let message = ForgeError::MissingIconSizes(missing).to_string();
                for size in &expected {
                    prop_assert!(message.contains(&size.to_string()));
                }
            }
            other => prop_assert!(false, "expected missing sizes error, got {:?}", other.map(|b| b.len())),
        }
    });
}

/// Frames with the wrong dimensions are rejected for every slot.
#[test]
fn prop_wrong_dimensions_rejected() {
    proptest!(|(
        slot in 0usize..4,
        width in 1u32..64,
        height in 1u32..64,
    )| {
        let size = ICON_SIZES[slot];
        prop_assume!(!(width == size && height == size));

        let mut frames: HashMap<u32, Vec<u8>> =
            ICON_SIZES.iter().map(|&s| (s, frame(s, [0, 0, 0, 255]))).collect();
        frames.insert(
            size,
            encode_png(&RgbaImage::from_pixel(width, height, Rgba([9, 9, 9, 255]))).unwrap(),
        );

        let is_dimension_error = matches!(
            pack_ico(&frames),
            Err(ForgeError::IconDimensions { expected, .. }) if expected == size
        );
        prop_assert!(is_dimension_error);
    });
}
