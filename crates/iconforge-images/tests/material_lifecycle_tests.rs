//! End-to-end tests for the material pipeline: upload, previews, expiry and forging.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use iconforge_images::raster::{decode_rgba, encode_png};
use iconforge_images::{
    parse_icon_directory, BackgroundEngine, BackgroundRemover, BorderKeyEngine, ErrorKind,
    ForgeConfig, ForgeError, ForgeResult, IconForge, ManualClock, ResampleAlgorithm,
};
use image::{Rgba, RgbaImage};
use tempfile::TempDir;

fn config(dir: &TempDir, ttl_seconds: u64) -> ForgeConfig {
    let mut config = ForgeConfig::default();
    config.storage.temp_dir = dir.path().join("materials");
    config.materials.ttl_seconds = ttl_seconds;
    config.background.enabled = false;
    config
}

fn png_with_block(size: u32, block: (u32, u32, u32, u32), colour: [u8; 4]) -> Vec<u8> {
    let mut image = RgbaImage::new(size, size);
    for x in block.0..block.2 {
        for y in block.1..block.3 {
            image.put_pixel(x, y, Rgba(colour));
        }
    }
    encode_png(&image).unwrap()
}

fn solid_png(size: u32, colour: [u8; 4]) -> Vec<u8> {
    encode_png(&RgbaImage::from_pixel(size, size, Rgba(colour))).unwrap()
}

#[tokio::test]
async fn test_upload_produces_256_material() {
    let dir = TempDir::new().unwrap();
    let forge = IconForge::new(&config(&dir, 60));
    forge.warm_up().await.unwrap();

    let record = forge
        .upload(png_with_block(64, (10, 10, 30, 30), [255, 0, 0, 255]), "test.png")
        .await
        .unwrap();

    assert_eq!(record.material_id.len(), 32);
    assert_eq!((record.width, record.height), (256, 256));
    let bytes = forge.material_bytes(&record.material_id).await.unwrap();
    assert_eq!(decode_rgba(&bytes).unwrap().dimensions(), (256, 256));
}

#[tokio::test]
async fn test_validation_errors_surface() {
    let dir = TempDir::new().unwrap();
    let forge = IconForge::new(&config(&dir, 60));

    let err = forge.upload(b"not an image".to_vec(), "fake.png").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("valid image"));

    let err = forge.upload(solid_png(4, [0, 255, 0, 255]), "photo.jpg").await.unwrap_err();
    assert!(matches!(err, ForgeError::FormatMismatch { .. }));
    assert!(forge.store().is_empty().await);
}

#[tokio::test]
async fn test_preview_cached_after_first_request() {
    let dir = TempDir::new().unwrap();
    let forge = IconForge::new(&config(&dir, 60));
    let record = forge
        .upload(png_with_block(64, (10, 10, 30, 30), [255, 0, 0, 255]), "test.png")
        .await
        .unwrap();

    let resizer = forge.store().resizer().clone();
    let before = resizer.invocation_count();
    let first = forge.preview(&record.material_id, ResampleAlgorithm::Nearest, 32).await.unwrap();
    let second = forge.preview(&record.material_id, ResampleAlgorithm::Nearest, 32).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(resizer.invocation_count() - before, 1);
}

#[tokio::test]
async fn test_expired_material_and_previews_are_removed() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new());
    let forge = IconForge::with_clock(
        &config(&dir, 1),
        Arc::new(BackgroundRemover::disabled()),
        clock.clone(),
    );

    let record = forge
        .upload(png_with_block(16, (2, 2, 5, 5), [0, 0, 255, 255]), "old.png")
        .await
        .unwrap();
    forge.preview(&record.material_id, ResampleAlgorithm::Lanczos, 8).await.unwrap();
    assert_eq!(forge.previews().len().await, 1);

    clock.advance(Duration::from_secs(2));

    let err = forge.material(&record.material_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.to_string().contains(&record.material_id));
    assert!(forge.previews().is_empty().await);
    assert!(!forge.store().namespace(&record.material_id).exists());
}

#[tokio::test]
async fn test_reads_within_ttl_keep_material_alive() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new());
    let forge = IconForge::with_clock(
        &config(&dir, 10),
        Arc::new(BackgroundRemover::disabled()),
        clock.clone(),
    );

    let kept = forge
        .upload(png_with_block(16, (2, 2, 5, 5), [0, 0, 255, 255]), "kept.png")
        .await
        .unwrap();
    let dropped = forge
        .upload(png_with_block(16, (3, 3, 6, 6), [0, 255, 0, 255]), "dropped.png")
        .await
        .unwrap();

    for _ in 0..4 {
        clock.advance(Duration::from_secs(6));
        forge.preview(&kept.material_id, ResampleAlgorithm::Bilinear, 32).await.unwrap();
    }

    assert!(forge.material(&kept.material_id).await.is_ok());
    assert!(matches!(
        forge.material(&dropped.material_id).await,
        Err(ForgeError::MaterialNotFound(_))
    ));
}

#[tokio::test]
async fn test_concurrent_uploads_do_not_mix() {
    let dir = TempDir::new().unwrap();
    let forge = IconForge::new(&config(&dir, 60));

    let mut handles = Vec::new();
    for i in 0..8u32 {
        let forge = forge.clone();
        handles.push(tokio::spawn(async move {
            // Each upload has its block at a different place with a different colour.
            let block = (i, i, i + 20, i + 20);
            let colour = [(i * 30) as u8, 0, 255 - (i * 30) as u8, 255];
            let record = forge
                .upload(png_with_block(40, block, colour), &format!("upload-{}.png", i))
                .await
                .unwrap();
            (i, block, colour, record)
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        let (i, block, colour, record) = handle.await.unwrap();
        assert!(ids.insert(record.material_id.clone()));
        assert_eq!(record.filename, format!("upload-{}.png", i));

        let crop = record.crop_box;
        assert!(crop.left <= block.0 && crop.top <= block.1);
        assert!(crop.right >= block.2 && crop.bottom >= block.3);

        let processed = decode_rgba(&forge.material_bytes(&record.material_id).await.unwrap()).unwrap();
        let centre = processed.get_pixel(128, 128);
        assert_eq!([centre[0], centre[1], centre[2]], [colour[0], colour[1], colour[2]]);
    }
    assert_eq!(ids.len(), 8);
    assert_eq!(forge.store().len().await, 8);
}

#[tokio::test]
async fn test_forge_icon_end_to_end() {
    let dir = TempDir::new().unwrap();
    let forge = IconForge::new(&config(&dir, 60));
    let record = forge
        .upload(solid_png(96, [0, 0, 255, 255]), "source.png")
        .await
        .unwrap();

    let ico = forge
        .forge_icon(&record.material_id, ResampleAlgorithm::Nearest, solid_png(16, [0, 255, 0, 255]))
        .await
        .unwrap();

    let entries = parse_icon_directory(&ico).unwrap();
    let sizes: Vec<u32> = entries.iter().map(|e| e.width).collect();
    assert_eq!(sizes, vec![256, 48, 32, 16]);
    assert_eq!(forge.previews().len().await, 2);
}

#[tokio::test]
async fn test_forge_icon_rejects_bad_tiny_frame() {
    let dir = TempDir::new().unwrap();
    let forge = IconForge::new(&config(&dir, 60));
    let record = forge
        .upload(solid_png(32, [0, 0, 255, 255]), "source.png")
        .await
        .unwrap();

    let err = forge
        .forge_icon(&record.material_id, ResampleAlgorithm::Lanczos, solid_png(24, [0, 0, 0, 255]))
        .await
        .unwrap_err();
    assert!(matches!(err, ForgeError::IconDimensions { expected: 16, .. }));
}

#[tokio::test]
async fn test_forge_icon_unknown_material() {
    let dir = TempDir::new().unwrap();
    let forge = IconForge::new(&config(&dir, 60));
    let err = forge
        .forge_icon("0123456789abcdef0123456789abcdef", ResampleAlgorithm::Nearest, solid_png(16, [0; 4]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

struct CountingEngine {
    calls: Arc<AtomicUsize>,
}

impl BackgroundEngine for CountingEngine {
    fn remove_background(&self, image: RgbaImage) -> ForgeResult<RgbaImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        BorderKeyEngine::new(10).remove_background(image)
    }

    fn name(&self) -> &str {
        "counting"
    }
}

#[tokio::test]
async fn test_background_removal_runs_when_enabled() {
    let dir = TempDir::new().unwrap();
    let builds = Arc::new(AtomicUsize::new(0));
    let calls = Arc::new(AtomicUsize::new(0));
    let (b, c) = (builds.clone(), calls.clone());
    let remover = BackgroundRemover::with_factory(
        true,
        Arc::new(move || {
            b.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(CountingEngine { calls: c.clone() }) as Arc<dyn BackgroundEngine>)
        }),
    );
    let forge = IconForge::with_remover(&config(&dir, 60), Arc::new(remover));
    forge.warm_up().await.unwrap();

    // White frame around a red square: the frame should be keyed out.
    let mut image = RgbaImage::from_pixel(40, 40, Rgba([255, 255, 255, 255]));
    for x in 15..25 {
        for y in 15..25 {
            image.put_pixel(x, y, Rgba([220, 0, 0, 255]));
        }
    }
    let record = forge.upload(encode_png(&image).unwrap(), "framed.png").await.unwrap();
    forge.upload(encode_png(&image).unwrap(), "again.png").await.unwrap();

    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    // Crop tightened to the red square plus the minimum padding.
    assert_eq!(record.crop_box.to_array(), [13, 13, 27, 27]);
}

#[tokio::test]
async fn test_background_removal_skipped_when_disabled() {
    let dir = TempDir::new().unwrap();
    let remover = BackgroundRemover::with_factory(
        false,
        Arc::new(|| -> ForgeResult<Arc<dyn BackgroundEngine>> {
            panic!("engine must not be built when removal is disabled")
        }),
    );
    let forge = IconForge::with_remover(&config(&dir, 60), Arc::new(remover));
    forge.warm_up().await.unwrap();

    let record = forge.upload(solid_png(20, [255, 255, 255, 255]), "plain.png").await.unwrap();
    // Nothing was removed, so the whole opaque frame is the content.
    assert_eq!(record.crop_box.to_array(), [0, 0, 20, 20]);
}

#[tokio::test]
async fn test_engine_init_failure_fails_upload() {
    let dir = TempDir::new().unwrap();
    let remover = BackgroundRemover::with_factory(
        true,
        Arc::new(|| Err(ForgeError::EngineInit("model file missing".to_string()))),
    );
    let forge = IconForge::with_remover(&config(&dir, 60), Arc::new(remover));

    let err = forge.upload(solid_png(8, [1, 2, 3, 255]), "x.png").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(forge.store().is_empty().await);
}
