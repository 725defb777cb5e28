//! Square resizing with a selectable resampling kernel.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use image::imageops::{self, FilterType};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::error::ForgeError;

/// Side length of every processed material.
pub const MATERIAL_SIZE: u32 = 256;

/// Resampling kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResampleAlgorithm {
    /// 3-lobe windowed sinc
    Lanczos,
    /// Sample duplication/dropping, no blending
    Nearest,
    /// Linear interpolation between neighbouring samples
    Bilinear,
}

impl ResampleAlgorithm {
    /// All algorithms, in wire order.
    pub const ALL: [ResampleAlgorithm; 3] = [
        ResampleAlgorithm::Lanczos,
        ResampleAlgorithm::Nearest,
        ResampleAlgorithm::Bilinear,
    ];

    /// The `image` crate filter implementing this kernel.
    pub fn filter_type(&self) -> FilterType {
        match self {
            ResampleAlgorithm::Lanczos => FilterType::Lanczos3,
            ResampleAlgorithm::Nearest => FilterType::Nearest,
            ResampleAlgorithm::Bilinear => FilterType::Triangle,
        }
    }

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResampleAlgorithm::Lanczos => "LANCZOS",
            ResampleAlgorithm::Nearest => "NEAREST",
            ResampleAlgorithm::Bilinear => "BILINEAR",
        }
    }
}

impl fmt::Display for ResampleAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResampleAlgorithm {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ForgeError::UnknownAlgorithm(s.to_string()))
    }
}

/// Square resizer with an invocation counter.
///
/// The counter lets callers observe how often raster work actually happened,
/// e.g. to confirm that cache hits skip recomputation.
#[derive(Debug, Default)]
pub struct Resizer {
    invocations: AtomicU64,
}

impl Resizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resize `image` to `size`×`size` with the selected kernel.
    pub fn resize(&self, image: &RgbaImage, size: u32, algorithm: ResampleAlgorithm) -> RgbaImage {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        imageops::resize(image, size, size, algorithm.filter_type())
    }

    /// Number of `resize` calls so far.
    pub fn invocation_count(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }
}
