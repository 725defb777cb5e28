//! Background removal stage.
//!
//! The engine behind this stage is treated as an opaque capability: an RGBA
//! raster goes in and an RGBA raster with background pixels at zero alpha comes
//! out. Engines are expensive to construct, so [`BackgroundRemover`] builds its
//! engine at most once, on first use or through [`BackgroundRemover::warm_up`].

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::config::BackgroundConfig;
use crate::error::{ForgeError, ForgeResult};

/// An engine that makes background pixels transparent.
pub trait BackgroundEngine: Send + Sync {
    /// Return a copy of `image` with background pixels set to zero alpha.
    fn remove_background(&self, image: RgbaImage) -> ForgeResult<RgbaImage>;

    /// Engine name for logs.
    fn name(&self) -> &str;
}

/// Builds an engine. Called at most once per successful initialization.
pub type EngineFactory = Arc<dyn Fn() -> ForgeResult<Arc<dyn BackgroundEngine>> + Send + Sync>;

/// Optional background removal with a lazily constructed engine.
pub struct BackgroundRemover {
    enabled: bool,
    factory: EngineFactory,
    engine: OnceCell<Arc<dyn BackgroundEngine>>,
}

impl BackgroundRemover {
    /// Create a remover that uses the built-in [`BorderKeyEngine`].
    pub fn new(config: &BackgroundConfig) -> Self {
        let tolerance = config.tolerance;
        Self::with_factory(
            config.enabled,
            Arc::new(move || Ok(Arc::new(BorderKeyEngine::new(tolerance)) as Arc<dyn BackgroundEngine>)),
        )
    }

    /// Create a remover backed by a custom engine factory.
    pub fn with_factory(enabled: bool, factory: EngineFactory) -> Self {
        Self {
            enabled,
            factory,
            engine: OnceCell::new(),
        }
    }

    /// A remover that always passes images through.
    pub fn disabled() -> Self {
        Self::with_factory(
            false,
            Arc::new(|| Err(ForgeError::EngineInit("background removal is disabled".to_string()))),
        )
    }

    /// Whether the stage runs at all.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Construct the engine ahead of the first request. No-op when disabled.
    pub fn warm_up(&self) -> ForgeResult<()> {
        if self.enabled {
            self.engine()?;
        }
        Ok(())
    }

    /// Run the stage. Disabled removers return the input unchanged.
    ///
    /// Blocking; call from a worker thread.
    pub fn apply(&self, image: RgbaImage) -> ForgeResult<RgbaImage> {
        if !self.enabled {
            return Ok(image);
        }

        let engine = self.engine()?;
        debug!(
            "Removing background with {} ({}x{})",
            engine.name(),
            image.width(),
            image.height()
        );
        engine.remove_background(image)
    }

    fn engine(&self) -> ForgeResult<&Arc<dyn BackgroundEngine>> {
        self.engine.get_or_try_init(|| {
            let engine = (self.factory)().map_err(|e| match e {
                ForgeError::EngineInit(_) => e,
                other => ForgeError::EngineInit(other.to_string()),
            })?;
            info!("Initialized background removal engine: {}", engine.name());
            Ok(engine)
        })
    }
}

impl fmt::Debug for BackgroundRemover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackgroundRemover")
            .field("enabled", &self.enabled)
            .field("initialized", &self.engine.get().is_some())
            .finish()
    }
}

/// Keys out the region connected to the image border that matches the corner colour.
///
/// The seed colour is the mean of the four corner pixels. Every pixel reachable
/// from the border through pixels within `tolerance` of the seed (Euclidean RGB
/// distance) becomes fully transparent. Pixels that are already transparent are
/// treated as background and also propagate the fill.
#[derive(Debug, Clone)]
pub struct BorderKeyEngine {
    tolerance: u8,
}

impl BorderKeyEngine {
    /// Create an engine with the given colour tolerance.
    pub fn new(tolerance: u8) -> Self {
        Self { tolerance }
    }

    fn seed_colour(image: &RgbaImage) -> [f64; 3] {
        let (w, h) = image.dimensions();
        let corners = [(0, 0), (w - 1, 0), (0, h - 1), (w - 1, h - 1)];
        let mut sum = [0.0f64; 3];
        for (x, y) in corners {
            let p = image.get_pixel(x, y);
            for c in 0..3 {
                sum[c] += f64::from(p[c]);
            }
        }
        sum.map(|s| s / 4.0)
    }

    fn is_background(&self, pixel: &Rgba<u8>, seed: &[f64; 3]) -> bool {
        if pixel[3] == 0 {
            return true;
        }
        let distance_sq: f64 = (0..3)
            .map(|c| {
                let d = f64::from(pixel[c]) - seed[c];
                d * d
            })
            .sum();
        distance_sq <= f64::from(self.tolerance).powi(2)
    }
}

impl BackgroundEngine for BorderKeyEngine {
    fn remove_background(&self, mut image: RgbaImage) -> ForgeResult<RgbaImage> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Ok(image);
        }

        let seed = Self::seed_colour(&image);
        let mut visited = vec![false; (w as usize) * (h as usize)];
        let mut queue = VecDeque::new();

        let border = (0..w)
            .flat_map(|x| [(x, 0), (x, h - 1)])
            .chain((0..h).flat_map(|y| [(0, y), (w - 1, y)]));
        for (x, y) in border {
            let idx = (y as usize) * (w as usize) + x as usize;
            if !visited[idx] && self.is_background(image.get_pixel(x, y), &seed) {
                visited[idx] = true;
                queue.push_back((x, y));
            }
        }

        while let Some((x, y)) = queue.pop_front() {
            image.get_pixel_mut(x, y)[3] = 0;

            let neighbours = [
                (x.wrapping_sub(1), y),
                (x + 1, y),
                (x, y.wrapping_sub(1)),
                (x, y + 1),
            ];
            for (nx, ny) in neighbours {
                if nx >= w || ny >= h {
                    continue;
                }
                let idx = (ny as usize) * (w as usize) + nx as usize;
                if !visited[idx] && self.is_background(image.get_pixel(nx, ny), &seed) {
                    visited[idx] = true;
                    queue.push_back((nx, ny));
                }
            }
        }

        Ok(image)
    }

    fn name(&self) -> &str {
        "border-key"
    }
}
