use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use iconforge_images::raster::encode_png;
use iconforge_images::{
    pack_ico, smart_crop, BackgroundEngine, BorderKeyEngine, ResampleAlgorithm, Resizer,
    ICON_SIZES,
};
use image::{Rgba, RgbaImage};

fn sample_image() -> RgbaImage {
    let mut image = RgbaImage::new(512, 384);
    for x in 120..380 {
        for y in 60..300 {
            image.put_pixel(x, y, Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255]));
        }
    }
    image
}

fn benchmark_smart_crop(c: &mut Criterion) {
    let image = sample_image();

    c.bench_function("smart_crop_512x384", |b| b.iter(|| smart_crop(black_box(&image))));
}

fn benchmark_background_key(c: &mut Criterion) {
    let mut image = RgbaImage::from_pixel(256, 256, Rgba([250, 250, 250, 255]));
    for x in 64..192 {
        for y in 64..192 {
            image.put_pixel(x, y, Rgba([20, 90, 200, 255]));
        }
    }
    let engine = BorderKeyEngine::new(24);

    c.bench_function("border_key_256", |b| {
        b.iter(|| engine.remove_background(black_box(image.clone())))
    });
}

fn benchmark_resize(c: &mut Criterion) {
    let resizer = Resizer::new();
    let material = resizer.resize(&sample_image(), 256, ResampleAlgorithm::Lanczos);

    let mut group = c.benchmark_group("resize_256_to_48");
    for algorithm in ResampleAlgorithm::ALL {
        group.bench_function(algorithm.as_str(), |b| {
            b.iter(|| resizer.resize(black_box(&material), 48, algorithm))
        });
    }
    group.finish();
}

fn benchmark_pack_ico(c: &mut Criterion) {
    let frames: HashMap<u32, Vec<u8>> = ICON_SIZES
        .iter()
        .map(|&size| {
            let frame = RgbaImage::from_pixel(size, size, Rgba([10, 20, 30, 255]));
            (size, encode_png(&frame).expect("encode frame"))
        })
        .collect();

    c.bench_function("pack_ico", |b| b.iter(|| pack_ico(black_box(&frames))));
}

criterion_group!(
    benches,
    benchmark_smart_crop,
    benchmark_background_key,
    benchmark_resize,
    benchmark_pack_ico
);
criterion_main!(benches);
